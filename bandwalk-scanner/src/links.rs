use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::debug;

static LINK_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());

/// An outgoing hyperlink found on `source`, with `target` exactly as written
/// in the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub source: String,
    pub target: String,
}

pub trait LinkExtractor: Send + Sync {
    fn extract_links(&self, source: &str, html: &str) -> Vec<Link>;
}

/// Collects every anchor pointing into the `/wiki/` namespace.
#[derive(Debug, Clone)]
pub struct WikiLinkExtractor {
    include_special: bool,
}

impl WikiLinkExtractor {
    pub fn new() -> Self {
        Self {
            include_special: true,
        }
    }

    /// Drop namespaced pages such as `File:`, `Help:` or `Special:`.
    pub fn without_special_pages(mut self) -> Self {
        self.include_special = false;
        self
    }

    fn accepts(&self, href: &str) -> bool {
        if !href.contains("/wiki/") {
            return false;
        }
        if self.include_special {
            return true;
        }
        let page = href.rsplit("/wiki/").next().unwrap_or_default();
        !page.contains(':')
    }
}

impl Default for WikiLinkExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkExtractor for WikiLinkExtractor {
    fn extract_links(&self, source: &str, html: &str) -> Vec<Link> {
        let document = Html::parse_document(html);

        let links: Vec<Link> = document
            .select(&LINK_SELECTOR)
            .filter_map(|element| element.value().attr("href"))
            .filter(|href| self.accepts(href))
            .map(|href| Link {
                source: source.to_string(),
                target: href.to_string(),
            })
            .collect();

        debug!("Found {} wiki links on {}", links.len(), source);
        links
    }
}
