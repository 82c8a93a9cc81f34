//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the HTTP client with the static user agent and timeout
//! - GET requests for one listing page
//! - Error classification into [`FetchError`]
//! - Optional bounded retry for transport failures
//! - Continuation ("has next page") detection on the fetched markup

use crate::config::SourceConfig;
use crate::crawler::parser::has_next_page;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Transport-level failure of a single fetch
///
/// Never escapes the coordinator; a failed fetch ends pagination for the
/// current (category, fiscal year) pair.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("failed to read body: {0}")]
    Body(String),

    #[error("request failed: {0}")]
    Request(String),
}

impl FetchError {
    /// Returns true for failures worth another attempt: timeouts, connect
    /// errors and server errors
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout | Self::Connect(_) => true,
            Self::Status(code) => (500..600).contains(code),
            Self::Body(_) | Self::Request(_) => false,
        }
    }

    fn from_reqwest(e: &reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_connect() {
            Self::Connect(e.to_string())
        } else if e.is_body() || e.is_decode() {
            Self::Body(e.to_string())
        } else {
            Self::Request(e.to_string())
        }
    }
}

/// Result of a fetch operation
#[derive(Debug)]
pub enum FetchResult {
    /// Successfully fetched the page
    Success {
        /// Final URL after redirects; relative links resolve against it
        final_url: Url,
        /// HTTP status code
        status_code: u16,
        /// Page body content
        body: String,
        /// Whether the page carries a next-page control
        has_next_page: bool,
    },

    /// Any transport or HTTP failure
    Failed {
        /// Classified error
        error: FetchError,
        /// Number of attempts made, including the first
        attempts: u32,
    },
}

impl FetchResult {
    /// Returns true if the fetch succeeded
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Continuation signal from the pagination control; false on failure
    pub fn has_next_page(&self) -> bool {
        match self {
            Self::Success { has_next_page, .. } => *has_next_page,
            Self::Failed { .. } => false,
        }
    }

    /// Page markup; a failed fetch reads as an empty page
    pub fn body(&self) -> &str {
        match self {
            Self::Success { body, .. } => body,
            Self::Failed { .. } => "",
        }
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The source configuration (user agent and timeout)
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use ciaa_crawler::config::SourceConfig;
/// use ciaa_crawler::crawler::build_http_client;
///
/// let client = build_http_client(&SourceConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &SourceConfig) -> Result<Client, reqwest::Error> {
    let timeout = config.request_timeout();

    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches one listing page, single attempt
///
/// | Condition | Result |
/// |-----------|--------|
/// | 2xx | `Success`, pagination detected from the body |
/// | non-2xx | `Failed(Status)` |
/// | Timeout | `Failed(Timeout)` |
/// | Connection refused / DNS | `Failed(Connect)` |
/// | Body read error | `Failed(Body)` |
pub async fn fetch_page(client: &Client, url: &Url) -> FetchResult {
    tracing::debug!("GET {}", url);

    let response = match client.get(url.as_str()).send().await {
        Ok(response) => response,
        Err(e) => {
            return FetchResult::Failed {
                error: FetchError::from_reqwest(&e),
                attempts: 1,
            }
        }
    };

    let status = response.status();
    let final_url = response.url().clone();

    if !status.is_success() {
        return FetchResult::Failed {
            error: FetchError::Status(status.as_u16()),
            attempts: 1,
        };
    }

    match response.text().await {
        Ok(body) => {
            let has_next_page = has_next_page(&body);
            FetchResult::Success {
                final_url,
                status_code: status.as_u16(),
                body,
                has_next_page,
            }
        }
        Err(e) => FetchResult::Failed {
            error: FetchError::from_reqwest(&e),
            attempts: 1,
        },
    }
}

/// Fetches a page, retrying transient failures up to `retries` extra times
///
/// Backoff grows linearly with the attempt number. Permanent failures (4xx,
/// malformed requests) and successful-but-empty pages are never retried.
pub async fn fetch_page_with_retry(
    client: &Client,
    url: &Url,
    retries: u32,
    backoff: Duration,
) -> FetchResult {
    let mut attempt = 1;

    loop {
        match fetch_page(client, url).await {
            FetchResult::Failed { error, .. } if error.is_transient() && attempt <= retries => {
                let wait = backoff * attempt;
                tracing::warn!(
                    "Attempt {} for {} failed ({}), retrying in {:?}",
                    attempt,
                    url,
                    error,
                    wait
                );
                tokio::time::sleep(wait).await;
                attempt += 1;
            }
            FetchResult::Failed { error, .. } => {
                return FetchResult::Failed {
                    error,
                    attempts: attempt,
                }
            }
            success => return success,
        }
    }
}
