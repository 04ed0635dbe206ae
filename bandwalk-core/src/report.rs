// Final crawl snapshot and its renderings

use crate::crawler::{Budget, Crawler, Termination};
use crate::error::{CrawlError, Result};
use crate::graph::{Edge, Node};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    Text,
    Json,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArmSummary {
    pub name: String,
    pub runs: usize,
    pub mean_reward: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlReport {
    pub run_id: Uuid,
    pub subject: String,
    pub start_url: String,
    pub policy: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub termination: Termination,
    pub budget: Budget,
    pub budget_met: bool,
    pub pages: usize,
    pub downloaded: usize,
    pub total_size: u64,
    pub arms: Vec<ArmSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner: Option<String>,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl CrawlReport {
    pub fn new(
        crawler: &Crawler,
        start_url: &str,
        budget: Budget,
        termination: Termination,
        started_at: DateTime<Utc>,
    ) -> Self {
        let log = crawler.log();
        let bandit = crawler.bandit();
        let arms = bandit
            .arms()
            .iter()
            .zip(bandit.stats())
            .map(|(arm, stats)| ArmSummary {
                name: arm.name(),
                runs: stats.runs,
                mean_reward: stats.mean,
            })
            .collect();

        Self {
            run_id: Uuid::new_v4(),
            subject: crawler.subject().to_string(),
            start_url: start_url.to_string(),
            policy: bandit.policy().name().to_string(),
            started_at,
            finished_at: Utc::now(),
            termination,
            budget,
            budget_met: termination == Termination::Budget,
            pages: log.length(),
            downloaded: log.downloaded_count(),
            total_size: log.size(),
            arms,
            winner: bandit.winner().map(|i| bandit.arms()[i].name()),
            nodes: log.nodes().to_vec(),
            edges: log.edges().cloned().collect(),
        }
    }

    pub fn render(&self, format: ReportFormat) -> Result<String> {
        match format {
            ReportFormat::Text => Ok(generate_crawl_report(self)),
            ReportFormat::Json => Ok(serde_json::to_string_pretty(self)?),
        }
    }
}

/// Human readable summary followed by one line per logged page.
pub fn generate_crawl_report(report: &CrawlReport) -> String {
    let mut out = String::new();
    out.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");
    out.push_str("# Summary:\n");
    out.push_str(&format!("  Subject: {}\n", report.subject));
    out.push_str(&format!("  Policy: {}\n", report.policy));
    out.push_str(&format!(
        "  Pages considered: {} of {}\n",
        report.pages, report.budget.max_pages
    ));
    out.push_str(&format!("  Pages downloaded: {}\n", report.downloaded));
    out.push_str(&format!(
        "  Bytes downloaded: {} of {}\n",
        report.total_size, report.budget.max_size
    ));
    out.push_str(&format!("  Links found: {}\n", report.edges.len()));
    let ending = match report.termination {
        Termination::Budget => "budget met",
        Termination::FrontierExhausted => "frontier exhausted before budget was met",
    };
    out.push_str(&format!("  Stopped: {}\n", ending));

    out.push_str("\n# Arms:\n");
    for arm in &report.arms {
        out.push_str(&format!(
            "  {:<20} runs {:>4}  mean reward {:+.4}\n",
            arm.name, arm.runs, arm.mean_reward
        ));
    }
    if let Some(ref winner) = report.winner {
        out.push_str(&format!("  Committed to {}\n", winner));
    }

    out.push_str("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");
    out.push_str("## Pages\n");
    for node in &report.nodes {
        let size = node
            .size
            .map(|s| format!("{:>9}", s))
            .unwrap_or_else(|| format!("{:>9}", "-"));
        let estimate = node
            .estimate
            .map(|e| format!("{:+.3}", e))
            .unwrap_or_else(|| "-".to_string());
        let reward = node
            .reward
            .map(|r| format!("{:+.3}", r))
            .unwrap_or_else(|| "-".to_string());
        out.push_str(&format!(
            "  {} {}  est {}  reward {}\n",
            size, node.key, estimate, reward
        ));
    }

    out
}

pub fn write_report(report: &CrawlReport, format: ReportFormat, path: &Path) -> Result<()> {
    let rendered = report.render(format)?;
    let mut file = File::create(path).map_err(|source| CrawlError::Report {
        path: path.to_path_buf(),
        source,
    })?;
    file.write_all(rendered.as_bytes())
        .map_err(|source| CrawlError::Report {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(())
}
