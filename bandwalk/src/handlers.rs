use bandwalk_core::crawl::{execute_crawl, CrawlOptions, PolicyKind};
use bandwalk_core::report::{write_report, ReportFormat};
use bandwalk_core::{ArmParams, Budget, Termination};
use clap::ArgMatches;
use colored::Colorize;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use url::Url;

pub const LOG_ENV: &str = "BANDWALK_LOG";

/// Exit status when the frontier ran dry before the budget was met.
pub const EXIT_FRONTIER_EXHAUSTED: i32 = 2;

pub fn print_banner() {
    println!("{}", "bandwalk".bright_cyan().bold());
    println!(
        "{}\n",
        "bandit-guided walks through a wiki neighborhood".bright_black()
    );
}

/// Installs the fmt subscriber, filtered by `BANDWALK_LOG` (default `info`,
/// `warn` when quiet).
pub fn init_tracing(quiet: bool) {
    let default = if quiet { "warn" } else { "info" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

// Helper functions for argument parsing

/// Parses a byte count such as `1000000`, `500k`, `2MB` or `1g` (powers of
/// 1000).
pub fn parse_byte_size(value: &str) -> Result<u64, String> {
    let trimmed = value.trim().to_lowercase();
    let digits_end = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let (number, unit) = trimmed.split_at(digits_end);

    let number: u64 = number
        .parse()
        .map_err(|_| format!("Invalid size '{}': expected a number", value))?;
    let multiplier = match unit.trim() {
        "" | "b" => 1,
        "k" | "kb" => 1_000,
        "m" | "mb" => 1_000_000,
        "g" | "gb" => 1_000_000_000,
        other => return Err(format!("Invalid size unit '{}' in '{}'", other, value)),
    };

    number
        .checked_mul(multiplier)
        .ok_or_else(|| format!("Size '{}' is too large", value))
}

pub fn parse_policy(value: &str) -> Result<PolicyKind, String> {
    PolicyKind::from_str(value).ok_or_else(|| {
        let names: Vec<&str> = PolicyKind::all().iter().map(|p| p.as_str()).collect();
        format!("Unknown policy '{}', expected one of: {}", value, names.join(", "))
    })
}

/// Parses a probability in `[0, 1]`.
pub fn parse_probability(value: &str) -> Result<f64, String> {
    let p: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("Invalid probability '{}'", value))?;
    if !(0.0..=1.0).contains(&p) {
        return Err(format!("Probability {} is outside [0, 1]", p));
    }
    Ok(p)
}

pub fn parse_learning_rate(value: &str) -> Result<f64, String> {
    let lr: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("Invalid learning rate '{}'", value))?;
    if !lr.is_finite() || lr <= 0.0 {
        return Err(format!("Learning rate must be positive, got {}", lr));
    }
    Ok(lr)
}

/// Expands `~` and environment variables in a user-supplied path.
pub fn expand_path(path: &str) -> Result<PathBuf, String> {
    shellexpand::full(path)
        .map(|expanded| PathBuf::from(expanded.as_ref()))
        .map_err(|e| format!("Could not expand path '{}': {}", path, e))
}

/// Builds crawl options from the `crawl` subcommand's arguments.
pub fn crawl_options_from_matches(sub_matches: &ArgMatches) -> Result<CrawlOptions, String> {
    let url = sub_matches
        .get_one::<Url>("url")
        .ok_or("A start --url is required")?;
    let subject = sub_matches
        .get_one::<String>("subject")
        .ok_or("A --subject is required")?;

    let mut options = CrawlOptions::new(url.as_str(), subject.as_str());
    if let Some(policy) = sub_matches.get_one::<PolicyKind>("policy") {
        options.policy = *policy;
    }

    let defaults = Budget::default();
    options.budget = Budget {
        max_pages: sub_matches
            .get_one::<usize>("max-pages")
            .copied()
            .unwrap_or(defaults.max_pages),
        max_size: sub_matches
            .get_one::<u64>("max-size")
            .copied()
            .unwrap_or(defaults.max_size),
    };

    let params = ArmParams::default();
    options.params = ArmParams {
        max_size: options.budget.max_size,
        lr: sub_matches
            .get_one::<f64>("lr")
            .copied()
            .unwrap_or(params.lr),
    };
    if let Some(epsilon) = sub_matches.get_one::<f64>("epsilon") {
        options.epsilon = *epsilon;
    }
    options.seed = sub_matches.get_one::<u64>("seed").copied();
    options.repo = sub_matches
        .get_one::<String>("repo")
        .map(|p| expand_path(p))
        .transpose()?;
    options.embeddings = sub_matches
        .get_one::<String>("embeddings")
        .map(|p| expand_path(p))
        .transpose()?;
    if let Some(timeout) = sub_matches.get_one::<u64>("timeout") {
        options.timeout_secs = *timeout;
    }
    options.skip_special = sub_matches.get_flag("skip-special");

    Ok(options)
}

pub async fn handle_crawl(sub_matches: &ArgMatches, quiet: bool) {
    let mut options = match crawl_options_from_matches(sub_matches) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("{} {}", "✗".red().bold(), e);
            std::process::exit(1);
        }
    };
    options.show_progress_bars = !quiet;
    debug!("Crawl options: {:?}", options);

    let format = sub_matches
        .get_one::<String>("format")
        .and_then(|f| ReportFormat::from_str(f))
        .unwrap_or(ReportFormat::Text);
    let output = sub_matches.get_one::<PathBuf>("output");

    if !quiet {
        println!("{} Crawling {}", "→".blue(), options.url.bright_white());
        println!("Subject: {}", options.subject);
        println!(
            "Policy: {} ({})",
            options.policy.as_str(),
            options.policy.description()
        );
        println!(
            "Budget: {} pages / {} bytes\n",
            options.budget.max_pages, options.budget.max_size
        );
    }

    let report = match execute_crawl(options, None).await {
        Ok(report) => report,
        Err(e) => {
            eprintln!("{} Crawl failed: {}", "✗".red().bold(), e);
            std::process::exit(1);
        }
    };

    match output {
        Some(path) => {
            if let Err(e) = write_report(&report, format, path) {
                eprintln!("{} {}", "✗".red().bold(), e);
                std::process::exit(1);
            }
            println!(
                "{} Report saved to {}",
                "✓".green().bold(),
                path.display().to_string().bright_white()
            );
        }
        None => match report.render(format) {
            Ok(rendered) => print!("{}", rendered),
            Err(e) => {
                eprintln!("{} {}", "✗".red().bold(), e);
                std::process::exit(1);
            }
        },
    }

    if report.termination == Termination::FrontierExhausted {
        eprintln!(
            "{} Frontier exhausted after {} pages, budget not met",
            "⚠".yellow().bold(),
            report.pages
        );
        std::process::exit(EXIT_FRONTIER_EXHAUSTED);
    }
}

pub fn handle_policies() {
    println!("{}", "Available policies:".bright_white().bold());
    for policy in PolicyKind::all() {
        println!(
            "  {:<12} {}",
            policy.as_str().bright_cyan(),
            policy.description()
        );
    }
}
