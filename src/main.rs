//! Archer Fetcher CLI application
//!
//! Command-line interface for reading Archer GRC application records with
//! cached field metadata and display-name translation.

use std::process;

use tracing::info;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::{fmt, EnvFilter};

use archer_fetcher::auth::load_dotenv;
use archer_fetcher::cli::{
    handle_auth, handle_cache, handle_fields, handle_records, Cli, CommandContext, Commands,
};
use archer_fetcher::config::AppConfig;
use archer_fetcher::constants::logging;
use archer_fetcher::errors::Result;

#[tokio::main]
async fn main() {
    let result = run().await;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Main application logic
async fn run() -> Result<()> {
    load_dotenv();

    let cli = Cli::parse_args();
    let config = AppConfig::load(cli.global.config.clone()).await?;

    init_logging(&cli, &config.logging.level);

    info!("Archer Fetcher v{} starting", env!("CARGO_PKG_VERSION"));

    let ctx = CommandContext::new(config, cli.global.quiet);
    match cli.command {
        Commands::Records(args) => {
            info!("Executing records command");
            handle_records(args, &ctx).await
        }
        Commands::Fields(args) => {
            info!("Executing fields command");
            handle_fields(args, &ctx).await
        }
        Commands::Cache(args) => {
            info!("Executing cache command");
            handle_cache(args, &ctx).await
        }
        Commands::Auth(args) => {
            info!("Executing auth command");
            handle_auth(args, &ctx).await
        }
    }
}

/// Initialize logging from CLI verbosity, falling back to the configured level
fn init_logging(cli: &Cli, configured_level: &str) {
    let level = cli
        .log_level()
        .map(|level| level.to_string().to_lowercase())
        .unwrap_or_else(|| configured_level.to_string());

    let mut filter = EnvFilter::from_default_env();
    match crate_directive(&level) {
        Some(directive) => filter = filter.add_directive(directive),
        None => {
            eprintln!("Ignoring unknown log level '{}'", level);
            if let Some(directive) = crate_directive(logging::DEFAULT_LOG_LEVEL) {
                filter = filter.add_directive(directive);
            }
        }
    }

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(cli.global.very_verbose)
        .init();

    if cli.global.very_verbose {
        info!("Very verbose logging enabled");
    } else if cli.global.verbose {
        info!("Verbose logging enabled");
    }
}

fn crate_directive(level: &str) -> Option<Directive> {
    format!("archer_fetcher={}", level).parse().ok()
}
