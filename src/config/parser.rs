use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads, parses and validates a crawler configuration file
///
/// Missing sections and keys take their defaults, so an empty file is a
/// valid configuration for the full historical crawl.
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use ciaa_crawler::config::load_config;
///
/// let config = load_config(Path::new("crawler.toml")).unwrap();
/// println!("Categories: {:?}", config.categories());
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses and validates configuration text
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Computes the SHA-256 digest of a configuration file, hex encoded
///
/// Recorded with each import run so a stored data set can be traced back to
/// the configuration that produced it.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read(path)?;
    Ok(hash_bytes(&content))
}

/// Loads a configuration together with the digest of the exact bytes parsed
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config = parse_config(&content)?;
    Ok((config, hash_bytes(content.as_bytes())))
}

/// Computes the digest of an in-memory configuration
///
/// Used when command-line overrides change what the file described, so the
/// recorded hash still identifies the configuration that actually ran.
pub fn effective_config_hash(config: &Config) -> Result<String, ConfigError> {
    let content = toml::to_string(config)?;
    Ok(hash_bytes(content.as_bytes()))
}

fn hash_bytes(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}
