use async_trait::async_trait;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, REFERER};
use std::time::Duration;
use thiserror::Error;

use crate::config::{ConfigError, HttpConfig};

/// Why a page could not be fetched
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("HTTP status {0}")]
    HttpStatus(u16),

    #[error("request timed out")]
    Timeout,

    #[error("transport error: {0}")]
    Transport(String),
}

impl FetchError {
    /// A 404 means pagination ran off the end of the listing
    pub fn is_natural_end(&self) -> bool {
        matches!(self, FetchError::HttpStatus(404))
    }
}

/// Issues one request per page or cursor
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch `url` with the given query parameters and return the body
    async fn fetch(&self, url: &str, query: &[(String, String)]) -> Result<String, FetchError>;
}

/// Fetcher backed by a reqwest client
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Build a client carrying the configured identity headers
    pub fn new(config: &HttpConfig) -> Result<Self, crate::Error> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, header_value("Accept", &config.accept)?);
        if let Some(referer) = config.referer.as_deref() {
            headers.insert(REFERER, header_value("Referer", referer)?);
        }

        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str, query: &[(String, String)]) -> Result<String, FetchError> {
        ::log::debug!("GET {} {:?}", url, query);

        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(classify_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        response.text().await.map_err(classify_error)
    }
}

fn header_value(name: &'static str, value: &str) -> Result<HeaderValue, ConfigError> {
    HeaderValue::from_str(value).map_err(|_| ConfigError::InvalidHeader {
        name,
        value: value.to_string(),
    })
}

fn classify_error(error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout
    } else if let Some(status) = error.status() {
        FetchError::HttpStatus(status.as_u16())
    } else {
        FetchError::Transport(error.to_string())
    }
}
