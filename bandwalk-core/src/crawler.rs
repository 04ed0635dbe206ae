// Crawl driver: pop and process until the budget is met or the frontier runs dry

use crate::arm::{Metric, MAX_SIZE};
use crate::bandit::Bandit;
use crate::error::{CrawlError, GraphError};
use crate::graph::{GraphLog, NodeProps};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

pub const MAX_PAGES: usize = 100;

/// When to stop: whichever limit is reached first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Budget {
    /// Pages considered, downloaded or not.
    pub max_pages: usize,
    /// Total downloaded bytes.
    pub max_size: u64,
}

impl Default for Budget {
    fn default() -> Self {
        Self {
            max_pages: MAX_PAGES,
            max_size: MAX_SIZE,
        }
    }
}

impl Budget {
    pub fn is_met(&self, log: &GraphLog) -> bool {
        log.length() >= self.max_pages || log.size() >= self.max_size
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    Budget,
    FrontierExhausted,
}

pub struct Crawler {
    current_url: String,
    subject: String,
    log: GraphLog,
    bandit: Bandit,
}

impl Crawler {
    /// Downloads `url0` into `log` and seeds the frontier with its links.
    pub async fn new(url0: &str, subject: impl Into<String>, mut log: GraphLog, bandit: Bandit) -> Self {
        log.add_node(url0, true, NodeProps::default()).await;
        Self {
            current_url: url0.to_string(),
            subject: subject.into(),
            log,
            bandit,
        }
    }

    pub fn current_url(&self) -> &str {
        &self.current_url
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn log(&self) -> &GraphLog {
        &self.log
    }

    pub fn bandit(&self) -> &Bandit {
        &self.bandit
    }

    /// Asks the bandit for the next page to visit.
    pub async fn pop(&mut self) -> Result<&str, GraphError> {
        self.current_url = self.bandit.pop(&mut self.log).await?;
        Ok(&self.current_url)
    }

    /// Lets the bandit act on the current page and rewards it if the page
    /// was downloaded. Returns the reward, if any.
    ///
    /// Must follow a successful [`pop`](Self::pop); the current page must not
    /// be logged yet.
    pub async fn process(&mut self) -> Result<Option<f64>, CrawlError> {
        self.bandit
            .action(&self.current_url, &self.subject, &mut self.log)
            .await;

        let Some(node) = self.log.node(&self.current_url) else {
            return Ok(None);
        };
        if !node.is_downloaded() {
            debug!("{} not downloaded, no reward", node.key);
            return Ok(None);
        }
        let metric = Metric {
            size: node.size.unwrap_or_default(),
        };
        let Some(content) = self.log.content(node)? else {
            return Ok(None);
        };

        let reward = self
            .bandit
            .reward(&self.current_url, &self.subject, &content, metric);
        self.log.record_reward(&self.current_url, reward)?;
        Ok(Some(reward))
    }

    pub fn done(&self, budget: &Budget) -> bool {
        info!(
            "Downloaded {} of {} bytes ({} pages)",
            self.log.size(),
            budget.max_size,
            self.log.length()
        );
        budget.is_met(&self.log)
    }

    /// Runs until `budget` is met or the frontier is exhausted, calling
    /// `on_step` after every processed page.
    pub async fn run(
        &mut self,
        budget: &Budget,
        mut on_step: impl FnMut(&GraphLog),
    ) -> Result<Termination, CrawlError> {
        loop {
            if self.done(budget) {
                return Ok(Termination::Budget);
            }
            match self.pop().await {
                Ok(_) => {}
                Err(GraphError::EmptyQueue) => {
                    warn!(
                        "Frontier exhausted after {} pages, budget not met",
                        self.log.length()
                    );
                    return Ok(Termination::FrontierExhausted);
                }
                Err(e) => return Err(e.into()),
            }
            self.process().await?;
            on_step(&self.log);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arm::{Arm, ArmParams};
    use crate::estimator::LogisticEstimator;
    use crate::oracle::EmbeddingTable;
    use bandwalk_scanner::{MemorySite, WikiLinkExtractor};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::Arc;

    const BASE: &str = "http://wiki.test";

    fn url(name: &str) -> String {
        format!("{}/wiki/{}", BASE, name)
    }

    fn site() -> MemorySite {
        MemorySite::new()
            .with_page(
                url("Root"),
                r#"<a href="/wiki/A">A</a><a href="/wiki/B">B</a><a href="/wiki/Missing">?</a>"#,
            )
            .with_page(url("A"), "graphs and more graphs")
            .with_page(url("B"), r#"graphs <a href="/wiki/A">A</a>"#)
    }

    async fn crawler(bandit: Bandit) -> Crawler {
        let site = site();
        let log = GraphLog::new("graphs", Arc::new(site), Arc::new(WikiLinkExtractor::new()))
            .with_base_url(BASE);
        Crawler::new(&url("Root"), "graphs", log, bandit).await
    }

    fn classifier() -> Arm {
        Arm::classifier(
            Box::new(LogisticEstimator::zeroed()),
            Arc::new(site()),
            Arc::new(EmbeddingTable::new()),
            ArmParams::default(),
        )
    }

    #[tokio::test]
    async fn test_new_downloads_start_page() {
        let crawler = crawler(Bandit::single(classifier(), StdRng::seed_from_u64(1))).await;
        assert_eq!(crawler.log().length(), 1);
        assert_eq!(crawler.log().downloaded_count(), 1);
        assert_eq!(crawler.log().frontier_len(), 3);
        assert_eq!(crawler.current_url(), url("Root"));
    }

    #[tokio::test]
    async fn test_process_rewards_downloaded_page() {
        let mut crawler = crawler(Bandit::single(classifier(), StdRng::seed_from_u64(1))).await;

        assert_eq!(crawler.pop().await.unwrap(), url("A"));
        let reward = crawler.process().await.unwrap().unwrap();

        let expected = 2.0 / 100.0 - 22.0 / MAX_SIZE as f64;
        assert!((reward - expected).abs() < 1e-12);
        assert_eq!(crawler.log().node(&url("A")).unwrap().reward, Some(reward));
    }

    #[tokio::test]
    async fn test_process_skips_reward_for_failed_fetch() {
        let mut crawler = crawler(Bandit::single(classifier(), StdRng::seed_from_u64(1))).await;

        crawler.pop().await.unwrap();
        crawler.process().await.unwrap();
        crawler.pop().await.unwrap();
        crawler.process().await.unwrap();

        assert_eq!(crawler.pop().await.unwrap(), url("Missing"));
        assert_eq!(crawler.process().await.unwrap(), None);
        assert_eq!(crawler.log().node(&url("Missing")).unwrap().reward, None);
    }

    #[tokio::test]
    async fn test_run_stops_on_page_budget() {
        let mut crawler = crawler(Bandit::single(classifier(), StdRng::seed_from_u64(1))).await;
        let budget = Budget {
            max_pages: 2,
            max_size: MAX_SIZE,
        };

        let mut steps = 0;
        let termination = crawler.run(&budget, |_| steps += 1).await.unwrap();

        assert_eq!(termination, Termination::Budget);
        assert_eq!(steps, 1);
        assert_eq!(crawler.log().length(), 2);
    }

    #[tokio::test]
    async fn test_run_reports_exhausted_frontier() {
        let mut crawler = crawler(Bandit::epsilon_greedy(
            classifier(),
            0.0,
            StdRng::seed_from_u64(1),
        ))
        .await;

        let termination = crawler.run(&Budget::default(), |_| {}).await.unwrap();

        assert_eq!(termination, Termination::FrontierExhausted);
        assert_eq!(crawler.log().length(), 4);
    }

    #[tokio::test]
    async fn test_run_stops_on_size_budget() {
        let mut crawler = crawler(Bandit::single(classifier(), StdRng::seed_from_u64(1))).await;
        let budget = Budget {
            max_pages: 100,
            max_size: 1,
        };

        let termination = crawler.run(&budget, |_| {}).await.unwrap();
        assert_eq!(termination, Termination::Budget);
        assert_eq!(crawler.log().length(), 1);
    }
}
