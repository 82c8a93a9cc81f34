use crate::config::types::{Config, CrawlConfig, OutputConfig, SourceConfig};
use crate::record::{Category, FiscalYear};
use crate::ConfigError;
use std::collections::HashSet;
use url::Url;

/// Upper bound on `max-pages`; the ceiling exists to stop runaway pagination
const MAX_PAGES_LIMIT: u32 = 500;

/// Upper bound on `transport-retries`
const MAX_TRANSPORT_RETRIES: u32 = 10;

/// Upper bound on `retry-backoff-ms`; the wait grows linearly per attempt
const MAX_RETRY_BACKOFF_MS: u64 = 60_000;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_source_config(&config.source)?;
    validate_crawl_config(&config.crawl)?;
    if config.crawl.use_fiscal_years {
        validate_fiscal_years(&config.fiscal_years)?;
    }
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates source configuration
fn validate_source_config(config: &SourceConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url must use HTTP or HTTPS, got '{}'",
            config.base_url
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    if config.request_timeout_ms == 0 {
        return Err(ConfigError::Validation(
            "request-timeout-ms must be > 0".to_string(),
        ));
    }

    if config.transport_retries > MAX_TRANSPORT_RETRIES {
        return Err(ConfigError::Validation(format!(
            "transport-retries must be at most {}, got {}",
            MAX_TRANSPORT_RETRIES, config.transport_retries
        )));
    }

    if config.retry_backoff_ms > MAX_RETRY_BACKOFF_MS {
        return Err(ConfigError::Validation(format!(
            "retry-backoff-ms must be at most {}, got {}",
            MAX_RETRY_BACKOFF_MS, config.retry_backoff_ms
        )));
    }

    Ok(())
}

/// Validates traversal configuration
fn validate_crawl_config(config: &CrawlConfig) -> Result<(), ConfigError> {
    if config.categories.is_empty() {
        return Err(ConfigError::Validation(
            "at least one category must be configured".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for key in &config.categories {
        let category =
            Category::from_key(key).ok_or_else(|| ConfigError::UnknownCategory(key.clone()))?;
        if !seen.insert(category) {
            return Err(ConfigError::Validation(format!(
                "category '{}' is listed more than once",
                key
            )));
        }
    }

    if config.max_pages < 1 || config.max_pages > MAX_PAGES_LIMIT {
        return Err(ConfigError::Validation(format!(
            "max-pages must be between 1 and {}, got {}",
            MAX_PAGES_LIMIT, config.max_pages
        )));
    }

    Ok(())
}

/// Validates the fiscal-year table
fn validate_fiscal_years(years: &[FiscalYear]) -> Result<(), ConfigError> {
    if years.is_empty() {
        return Err(ConfigError::Validation(
            "use-fiscal-years is set but no fiscal years are configured".to_string(),
        ));
    }

    let mut values = HashSet::new();
    for year in years {
        if year.value.trim().is_empty() || year.label.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "fiscal year entries need a value and a label, got {:?}",
                year
            )));
        }

        // Synthetic ids are joined with underscores
        if year.value.contains('_') {
            return Err(ConfigError::Validation(format!(
                "fiscal year value '{}' cannot contain '_'",
                year.value
            )));
        }

        if !values.insert(year.value.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate fiscal year value '{}'",
                year.value
            )));
        }
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.json_path.trim().is_empty() {
        return Err(ConfigError::Validation(
            "json-path cannot be empty".to_string(),
        ));
    }

    if matches!(&config.database_path, Some(p) if p.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "database-path cannot be empty when set".to_string(),
        ));
    }

    if matches!(&config.summary_path, Some(p) if p.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "summary-path cannot be empty when set".to_string(),
        ));
    }

    Ok(())
}
