pub mod arm;
pub mod bandit;
pub mod crawl;
pub mod crawler;
pub mod error;
pub mod estimator;
pub mod graph;
pub mod oracle;
pub mod report;
pub mod store;

pub use arm::{Arm, ArmParams, Metric, MAX_SIZE};
pub use bandit::{ArmStats, Bandit, Policy, EPSILON};
pub use crawl::{
    base_url_of, build_bandit, crawl_with, execute_crawl, CrawlOptions, CrawlProgress,
    CrawlProgressCallback, CrawlServices, PolicyKind,
};
pub use crawler::{Budget, Crawler, Termination, MAX_PAGES};
pub use error::{CrawlError, GraphError, OracleError, StoreError};
pub use estimator::{Estimator, Features, LogisticEstimator};
pub use graph::{Axis, DegreeStats, Edge, GraphLog, Node, NodeProps};
pub use oracle::{EmbeddingTable, RelevanceOracle};
pub use report::{generate_crawl_report, write_report, CrawlReport, ReportFormat};
pub use store::ContentStore;
