use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A successfully downloaded page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchedPage {
    pub url: String,
    pub status_code: u16,
    pub content_type: Option<String>,
    /// Bytes as announced by `content-length`, or the body length when the
    /// header is absent.
    pub size: u64,
    pub response_time: Duration,
    pub body: String,
}

impl FetchedPage {
    /// Builds a page from a body alone, as used by in-memory fetchers.
    pub fn from_body(url: impl Into<String>, body: impl Into<String>) -> Self {
        let body = body.into();
        Self {
            url: url.into(),
            status_code: 200,
            content_type: Some("text/html".to_string()),
            size: body.len() as u64,
            response_time: Duration::from_secs(0),
            body,
        }
    }
}
