use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Unexpected status {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Missing content-length for {0}")]
    MissingContentLength(String),

    #[error("No page registered for {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, ScanError>;
