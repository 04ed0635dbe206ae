#[path = "handlers.rs"]
pub mod handlers;

#[path = "commands.rs"]
pub mod commands;

pub use commands::{command_argument_builder, CLAP_STYLING};
pub use handlers::{
    crawl_options_from_matches, expand_path, parse_byte_size, parse_learning_rate, parse_policy,
    parse_probability,
};

// Re-export crawl functionality from bandwalk-core
pub use bandwalk_core::crawl::{execute_crawl, CrawlOptions, PolicyKind};
pub use bandwalk_core::report::{generate_crawl_report, CrawlReport, ReportFormat};
