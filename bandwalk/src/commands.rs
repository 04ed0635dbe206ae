use crate::handlers::{parse_byte_size, parse_learning_rate, parse_policy, parse_probability};
use clap::{arg, command};
use url::Url;

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);

pub fn command_argument_builder() -> clap::Command {
    clap::Command::new("bandwalk")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("bandwalk")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress banner, progress bar and non-essential output").required(false))
        .subcommand_required(false)
        .subcommand(
            command!("crawl")
                .about(
                    "Explore the neighborhood of a start page, letting a bandit policy decide \
                which link to follow next.",
                )
                .arg(
                    arg!(-u --"url" <URL>)
                        .required(true)
                        .help("The page to start from")
                        .value_parser(clap::value_parser!(Url)),
                )
                .arg(
                    arg!(-s --"subject" <SUBJECT>)
                        .required(true)
                        .help("The subject to gather content about"),
                )
                .arg(
                    arg!(-p --"policy" <POLICY>)
                        .required(false)
                        .help("Bandit policy: single, lefty, commit, genealogist")
                        .value_parser(parse_policy)
                        .default_value("single"),
                )
                .arg(
                    arg!(--"max-pages" <PAGES>)
                        .required(false)
                        .help("Stop after this many pages were considered")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("100"),
                )
                .arg(
                    arg!(--"max-size" <BYTES>)
                        .required(false)
                        .help("Stop after this many bytes were downloaded (e.g. 500k, 2M)")
                        .value_parser(parse_byte_size)
                        .default_value("1000000"),
                )
                .arg(
                    arg!(--"epsilon" <P>)
                        .required(false)
                        .help("Exploration probability of the epsilon-greedy policies")
                        .value_parser(parse_probability)
                        .default_value("0.1"),
                )
                .arg(
                    arg!(--"lr" <RATE>)
                        .required(false)
                        .help("Learning rate of the arms' estimators")
                        .value_parser(parse_learning_rate)
                        .default_value("0.1"),
                )
                .arg(
                    arg!(--"seed" <SEED>)
                        .required(false)
                        .help("Seed for reproducible runs")
                        .value_parser(clap::value_parser!(u64)),
                )
                .arg(
                    arg!(-r --"repo" <PATH>)
                        .required(false)
                        .help("Directory to store downloaded pages in (default: keep in memory)"),
                )
                .arg(
                    arg!(-e --"embeddings" <PATH>)
                        .required(false)
                        .help("JSON embedding table used to score relevance"),
                )
                .arg(
                    arg!(--"timeout" <SECONDS>)
                        .required(false)
                        .help("Request timeout in seconds")
                        .value_parser(clap::value_parser!(u64))
                        .default_value("10"),
                )
                .arg(
                    arg!(--"skip-special")
                        .required(false)
                        .help("Ignore namespaced pages such as File:, Help: or Special:")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Save report to file (default: display to screen)")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Report format: text, json")
                        .value_parser(["text", "json"])
                        .default_value("text"),
                ),
        )
        .subcommand(command!("policies").about("List the available bandit policies"))
}
