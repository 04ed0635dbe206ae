pub mod error;
pub mod fetcher;
pub mod keys;
pub mod links;
pub mod result;

pub use error::ScanError;
pub use fetcher::{Fetcher, HttpFetcher, MemorySite, SizeProbe};
pub use keys::{complete_url, url_key, DEFAULT_BASE_URL};
pub use links::{Link, LinkExtractor, WikiLinkExtractor};
pub use result::FetchedPage;
