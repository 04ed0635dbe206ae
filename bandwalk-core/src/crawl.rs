use crate::arm::{Arm, ArmParams};
use crate::bandit::{Bandit, EPSILON};
use crate::crawler::{Budget, Crawler};
use crate::error::{CrawlError, Result};
use crate::estimator::{Estimator, LogisticEstimator};
use crate::graph::{Axis, GraphLog};
use crate::oracle::{EmbeddingTable, RelevanceOracle};
use crate::report::CrawlReport;
use crate::store::ContentStore;
use bandwalk_scanner::{Fetcher, HttpFetcher, LinkExtractor, SizeProbe, WikiLinkExtractor};
use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use url::Url;

/// Which bandit drives the crawl.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyKind {
    /// The classifier alone.
    Single,
    /// Epsilon-greedy: classifier against skipping the page.
    Lefty,
    /// Explore-then-commit: classifier against the sibling connector.
    Commit,
    /// Sibling against child connector, choosing the next page itself.
    Genealogist,
}

impl PolicyKind {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "single" | "classy" => Some(PolicyKind::Single),
            "lefty" | "epsilon-greedy" => Some(PolicyKind::Lefty),
            "commit" | "crampy" | "explore-then-commit" => Some(PolicyKind::Commit),
            "genealogist" => Some(PolicyKind::Genealogist),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyKind::Single => "single",
            PolicyKind::Lefty => "lefty",
            PolicyKind::Commit => "commit",
            PolicyKind::Genealogist => "genealogist",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            PolicyKind::Single => "classifier only, always downloads",
            PolicyKind::Lefty => "epsilon-greedy between the classifier and skipping the page",
            PolicyKind::Commit => "explores classifier and sibling connector, then commits to the better one",
            PolicyKind::Genealogist => "follows the most linked sibling or child of the last page",
        }
    }

    pub fn all() -> &'static [PolicyKind] {
        &[
            PolicyKind::Single,
            PolicyKind::Lefty,
            PolicyKind::Commit,
            PolicyKind::Genealogist,
        ]
    }
}

/// Options for configuring a crawl operation
#[derive(Debug, Clone)]
pub struct CrawlOptions {
    pub url: String,
    pub subject: String,
    pub policy: PolicyKind,
    pub budget: Budget,
    pub params: ArmParams,
    pub epsilon: f64,
    /// Fixed seed for reproducible runs.
    pub seed: Option<u64>,
    /// Directory to store downloaded pages in; kept in memory otherwise.
    pub repo: Option<PathBuf>,
    /// JSON embedding table for the relevance feature.
    pub embeddings: Option<PathBuf>,
    pub timeout_secs: u64,
    pub skip_special: bool,
    pub show_progress_bars: bool,
}

impl CrawlOptions {
    pub fn new(url: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            subject: subject.into(),
            policy: PolicyKind::Single,
            budget: Budget::default(),
            params: ArmParams::default(),
            epsilon: EPSILON,
            seed: None,
            repo: None,
            embeddings: None,
            timeout_secs: 10,
            skip_special: false,
            show_progress_bars: false,
        }
    }
}

/// The I/O a crawl runs against.
pub struct CrawlServices {
    pub fetcher: Arc<dyn Fetcher>,
    pub probe: Arc<dyn SizeProbe>,
    pub oracle: Arc<dyn RelevanceOracle>,
    pub extractor: Arc<dyn LinkExtractor>,
    pub store: ContentStore,
}

/// Snapshot handed to progress callbacks after every page.
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlProgress {
    pub pages: usize,
    pub downloaded: usize,
    pub bytes: u64,
    pub max_bytes: u64,
    pub last_url: Option<String>,
}

/// Callback for reporting crawl progress
pub type CrawlProgressCallback = Arc<dyn Fn(CrawlProgress) + Send + Sync>;

/// Scheme, host and port of `url`; site-relative links are completed
/// against it.
pub fn base_url_of(url: &str) -> Result<String> {
    let parsed = Url::parse(url).map_err(|e| CrawlError::InvalidUrl(format!("{}: {}", url, e)))?;
    let origin = parsed.origin();
    if !origin.is_tuple() {
        return Err(CrawlError::InvalidUrl(url.to_string()));
    }
    Ok(origin.ascii_serialization())
}

fn estimator(rng: &mut StdRng) -> Box<dyn Estimator> {
    Box::new(LogisticEstimator::new(rng))
}

/// Assembles the arms `kind` pits against each other.
pub fn build_bandit(
    kind: PolicyKind,
    options: &CrawlOptions,
    probe: Arc<dyn SizeProbe>,
    oracle: Arc<dyn RelevanceOracle>,
    mut rng: StdRng,
) -> Bandit {
    let params = options.params;
    match kind {
        PolicyKind::Single => {
            let classifier = Arm::classifier(estimator(&mut rng), probe, oracle, params);
            Bandit::single(classifier, rng)
        }
        PolicyKind::Lefty => {
            let classifier = Arm::classifier(estimator(&mut rng), probe, oracle, params);
            Bandit::epsilon_greedy(classifier, options.epsilon, rng)
        }
        PolicyKind::Commit => {
            let classifier = Arm::classifier(estimator(&mut rng), probe.clone(), oracle, params);
            let sibling = Arm::connector(estimator(&mut rng), probe, Axis::Sibling, params);
            Bandit::explore_then_commit(classifier, sibling, options.budget.max_pages as f64, rng)
        }
        PolicyKind::Genealogist => {
            let sibling = Arm::connector(estimator(&mut rng), probe.clone(), Axis::Sibling, params);
            let child = Arm::connector(estimator(&mut rng), probe, Axis::Child, params);
            Bandit::genealogist(sibling, child, options.epsilon, rng)
        }
    }
}

/// Runs a crawl against the given services and returns its report.
pub async fn crawl_with(
    options: &CrawlOptions,
    services: CrawlServices,
    progress_callback: Option<CrawlProgressCallback>,
) -> Result<CrawlReport> {
    let started_at = Utc::now();
    let base_url = base_url_of(&options.url)?;
    let rng = match options.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let CrawlServices {
        fetcher,
        probe,
        oracle,
        extractor,
        store,
    } = services;

    let log = GraphLog::new(options.subject.clone(), fetcher, extractor)
        .with_base_url(base_url)
        .with_store(store);
    let bandit = build_bandit(options.policy, options, probe, oracle, rng);

    info!(
        "Crawling {} for {:?} with the {} policy",
        options.url,
        options.subject,
        options.policy.as_str()
    );
    let mut crawler = Crawler::new(&options.url, options.subject.clone(), log, bandit).await;

    let max_bytes = options.budget.max_size;
    let termination = crawler
        .run(&options.budget, |log| {
            if let Some(ref callback) = progress_callback {
                callback(CrawlProgress {
                    pages: log.length(),
                    downloaded: log.downloaded_count(),
                    bytes: log.size(),
                    max_bytes,
                    last_url: log.last_url().map(str::to_string),
                });
            }
        })
        .await?;

    Ok(CrawlReport::new(
        &crawler,
        &options.url,
        options.budget,
        termination,
        started_at,
    ))
}

/// Execute a crawl over HTTP with the given options
pub async fn execute_crawl(
    options: CrawlOptions,
    progress_callback: Option<CrawlProgressCallback>,
) -> Result<CrawlReport> {
    let http = Arc::new(HttpFetcher::with_timeout(options.timeout_secs)?);

    let oracle = match options.embeddings {
        Some(ref path) => EmbeddingTable::from_json_file(path)?,
        None => {
            warn!("No embeddings given, the relevance feature is always 0");
            EmbeddingTable::new()
        }
    };

    let extractor = if options.skip_special {
        WikiLinkExtractor::new().without_special_pages()
    } else {
        WikiLinkExtractor::new()
    };

    let store = match options.repo {
        Some(ref root) => ContentStore::directory(root),
        None => ContentStore::in_memory(),
    };

    // Byte progress bar (only if enabled)
    let progress_bar = if options.show_progress_bars {
        let pb = ProgressBar::new(options.budget.max_size);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.cyan} [{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        pb.set_message("starting...");
        Some(pb)
    } else {
        None
    };

    let bar = progress_bar.clone();
    let callback: CrawlProgressCallback = Arc::new(move |progress: CrawlProgress| {
        if let Some(ref pb) = bar {
            pb.set_position(progress.bytes.min(progress.max_bytes));
            pb.set_message(format!("{} pages", progress.pages));
        }
        if let Some(ref cb) = progress_callback {
            cb(progress);
        }
    });

    let services = CrawlServices {
        fetcher: http.clone(),
        probe: http,
        oracle: Arc::new(oracle),
        extractor: Arc::new(extractor),
        store,
    };
    let report = crawl_with(&options, services, Some(callback)).await?;

    if let Some(ref pb) = progress_bar {
        pb.finish_with_message(format!(
            "Crawl complete! {} pages, {} downloaded",
            report.pages, report.downloaded
        ));
    }

    Ok(report)
}
