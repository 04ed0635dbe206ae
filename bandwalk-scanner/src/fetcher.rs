use crate::error::{Result, ScanError};
use crate::result::FetchedPage;
use async_trait::async_trait;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderMap};
use reqwest::Client;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::debug;
use url::Url;

/// Retrieves the raw content of a page.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedPage>;
}

/// Looks up the size of a page without downloading it.
#[async_trait]
pub trait SizeProbe: Send + Sync {
    async fn probe_size(&self, url: &str) -> Result<u64>;
}

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        Self::with_timeout(10)
    }

    pub fn with_timeout(timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("bandwalk/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(timeout_secs.div_ceil(2)))
            .pool_max_idle_per_host(8)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;

        Ok(Self { client })
    }

    fn parse(url: &str) -> Result<Url> {
        let parsed = Url::parse(url).map_err(|e| ScanError::InvalidUrl(format!("{}: {}", url, e)))?;
        match parsed.scheme() {
            "http" | "https" => Ok(parsed),
            _ => Err(ScanError::InvalidUrl(url.to_string())),
        }
    }

    fn header_length(headers: &HeaderMap) -> Option<u64> {
        headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok())
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage> {
        debug!("Fetching {}", url);

        let target = Self::parse(url)?;
        let start = Instant::now();
        let response = self.client.get(target).send().await?;
        let response_time = start.elapsed();

        let status_code = response.status().as_u16();
        if !response.status().is_success() {
            return Err(ScanError::Status {
                url: url.to_string(),
                status: status_code,
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let announced = Self::header_length(response.headers());

        let body = response.text().await?;
        let size = announced.unwrap_or(body.len() as u64);

        Ok(FetchedPage {
            url: url.to_string(),
            status_code,
            content_type,
            size,
            response_time,
            body,
        })
    }
}

#[async_trait]
impl SizeProbe for HttpFetcher {
    async fn probe_size(&self, url: &str) -> Result<u64> {
        let response = self.client.head(Self::parse(url)?).send().await?;
        if !response.status().is_success() {
            return Err(ScanError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }
        Self::header_length(response.headers())
            .ok_or_else(|| ScanError::MissingContentLength(url.to_string()))
    }
}

/// A fixed set of pages served from memory, keyed by complete URL.
///
/// Useful for dry runs and tests; unknown URLs fail like a 404 would.
#[derive(Debug, Clone, Default)]
pub struct MemorySite {
    pages: HashMap<String, String>,
}

impl MemorySite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.pages.insert(url.into(), body.into());
        self
    }

    pub fn insert(&mut self, url: impl Into<String>, body: impl Into<String>) {
        self.pages.insert(url.into(), body.into());
    }
}

#[async_trait]
impl Fetcher for MemorySite {
    async fn fetch(&self, url: &str) -> Result<FetchedPage> {
        self.pages
            .get(url)
            .map(|body| FetchedPage::from_body(url, body.clone()))
            .ok_or_else(|| ScanError::NotFound(url.to_string()))
    }
}

#[async_trait]
impl SizeProbe for MemorySite {
    async fn probe_size(&self, url: &str) -> Result<u64> {
        self.pages
            .get(url)
            .map(|body| body.len() as u64)
            .ok_or_else(|| ScanError::NotFound(url.to_string()))
    }
}
