use crate::graph::Axis;
use bandwalk_scanner::ScanError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Frontier exhausted: no unvisited candidate left")]
    EmptyQueue,

    #[error("No unvisited {axis} candidate for {key:?}")]
    NoCandidate { key: String, axis: Axis },

    #[error("Reward already recorded for {0:?}")]
    RewardAlreadySet(String),

    #[error("No node logged for {0:?}")]
    UnknownNode(String),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No stored content at {0}")]
    Missing(PathBuf),
}

#[derive(Error, Debug)]
pub enum OracleError {
    #[error("{0:?} is not in the vocabulary")]
    Unknown(String),

    #[error("Vector dimensions differ: {0} vs {1}")]
    DimensionMismatch(usize, usize),

    #[error("Failed to read embeddings from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed embeddings: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum CrawlError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Oracle(#[from] OracleError),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Failed to write report to {path}: {source}")]
    Report {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CrawlError>;
