use bandwalk::commands::command_argument_builder;
use bandwalk::handlers::{handle_crawl, handle_policies, init_tracing, print_banner};

#[tokio::main]
async fn main() {
    let cmd = command_argument_builder();
    let chosen_command = cmd.get_matches();
    let quiet = chosen_command.get_flag("quiet");

    // Show banner unless --quiet flag is set
    if !quiet {
        print_banner();
    }

    match chosen_command.subcommand() {
        Some(("crawl", primary_command)) => {
            init_tracing(quiet);
            handle_crawl(primary_command, quiet).await
        }
        Some(("policies", _)) => handle_policies(),
        _ => {
            // No subcommand provided, just show the banner and usage
            let _ = command_argument_builder().print_help();
        }
    }
}
