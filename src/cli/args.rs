//! Command-line argument definitions using clap derive macros

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::app::RecordQuery;

/// Archer Fetcher - cached, session-aware reads of Archer GRC applications
#[derive(Parser, Debug)]
#[command(name = "archer_fetcher")]
#[command(about = "Read Archer GRC application records with cached field metadata")]
#[command(version)]
#[command(long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all commands
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable very verbose output (debug level)
    #[arg(long, global = true, conflicts_with = "verbose")]
    pub very_verbose: bool,

    /// Suppress progress output and non-error logs
    #[arg(short, long, global = true, conflicts_with_all = ["verbose", "very_verbose"])]
    pub quiet: bool,

    /// Configuration file path
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Read records of an application
    Records(RecordsArgs),

    /// Show the cached field metadata of an application
    Fields(FieldsArgs),

    /// Refresh or inspect the metadata cache
    Cache(CacheArgs),

    /// Check credentials and session state
    Auth(AuthArgs),
}

/// Arguments for reading records
#[derive(Args, Debug, Clone)]
pub struct RecordsArgs {
    /// Application name or numeric id
    pub app: String,

    /// Page to read, numbered from 1
    #[arg(long, default_value = "1")]
    pub page: usize,

    /// Records per page
    #[arg(long, default_value = "100")]
    pub page_size: usize,

    /// Read every record
    #[arg(long)]
    pub all: bool,

    /// Read in batches up to this many records
    #[arg(long)]
    pub max: Option<usize>,

    /// Keep field aliases and inactive fields
    #[arg(long)]
    pub raw: bool,
}

/// Arguments for showing field metadata
#[derive(Args, Debug, Clone)]
pub struct FieldsArgs {
    /// Application name or numeric id
    pub app: String,

    /// Include inactive fields
    #[arg(long)]
    pub include_inactive: bool,
}

/// Arguments for cache management
#[derive(Args, Debug)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub action: CacheAction,
}

/// Cache management actions
#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// Refetch an application's metadata now
    Refresh {
        /// Application name or numeric id
        app: String,
    },

    /// Show the effective cache and retrieval settings
    Info,
}

/// Arguments for authentication checks
#[derive(Args, Debug)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub action: AuthAction,
}

/// Authentication actions
#[derive(Subcommand, Debug)]
pub enum AuthAction {
    /// Log in with the configured credentials
    Verify,

    /// Show which credentials are configured
    Status,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the logging level based on global arguments
    ///
    /// Returns `None` when no verbosity flag was given, leaving the level to
    /// the configuration file.
    pub fn log_level(&self) -> Option<tracing::Level> {
        if self.global.quiet {
            Some(tracing::Level::ERROR)
        } else if self.global.very_verbose {
            Some(tracing::Level::DEBUG)
        } else if self.global.verbose {
            Some(tracing::Level::INFO)
        } else {
            None
        }
    }
}

impl RecordsArgs {
    /// Reject flag combinations that select more than one read mode
    pub fn validate(&self) -> Result<(), String> {
        if self.all && self.max.is_some() {
            return Err("Cannot specify both --all and --max".to_string());
        }

        if self.page_size == 0 {
            return Err("Page size must be greater than 0".to_string());
        }

        if self.max == Some(0) {
            return Err("--max must be greater than 0".to_string());
        }

        if self.page.checked_mul(self.page_size).is_none() {
            return Err(format!(
                "Page {} of size {} is beyond the last addressable record",
                self.page, self.page_size
            ));
        }

        Ok(())
    }

    /// Query selected by the flags
    pub fn query(&self) -> RecordQuery {
        if self.all {
            RecordQuery::All
        } else if self.max.is_some() {
            RecordQuery::Paginated { max: self.max }
        } else {
            RecordQuery::Page {
                page: self.page,
                size: self.page_size,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    fn records_args(cli: Cli) -> RecordsArgs {
        match cli.command {
            Commands::Records(args) => args,
            other => panic!("expected records command, got {:?}", other),
        }
    }

    #[test]
    fn test_records_defaults_to_first_page() {
        let args = records_args(parse(&["archer_fetcher", "records", "Risk Register"]));

        assert_eq!(args.app, "Risk Register");
        assert!(args.validate().is_ok());
        assert_eq!(args.query(), RecordQuery::Page { page: 1, size: 100 });
    }

    #[test]
    fn test_records_query_selection() {
        let all = records_args(parse(&["archer_fetcher", "records", "75", "--all", "--raw"]));
        assert_eq!(all.query(), RecordQuery::All);
        assert!(all.raw);

        let capped = records_args(parse(&["archer_fetcher", "records", "75", "--max", "2500"]));
        assert_eq!(capped.query(), RecordQuery::Paginated { max: Some(2500) });

        let paged = records_args(parse(&[
            "archer_fetcher",
            "records",
            "75",
            "--page",
            "3",
            "--page-size",
            "30",
        ]));
        assert_eq!(paged.query(), RecordQuery::Page { page: 3, size: 30 });
    }

    #[test]
    fn test_records_validation() {
        let conflicting =
            records_args(parse(&["archer_fetcher", "records", "75", "--all", "--max", "10"]));
        assert!(conflicting.validate().is_err());

        let empty_page =
            records_args(parse(&["archer_fetcher", "records", "75", "--page-size", "0"]));
        assert!(empty_page.validate().is_err());

        let huge = usize::MAX.to_string();
        let far_page = records_args(parse(&[
            "archer_fetcher",
            "records",
            "75",
            "--page",
            &huge,
            "--page-size",
            "2",
        ]));
        assert!(far_page.validate().is_err());
    }

    #[test]
    fn test_cache_actions_parse() {
        let cli = parse(&["archer_fetcher", "cache", "refresh", "Risk Register"]);
        assert!(matches!(
            cli.command,
            Commands::Cache(CacheArgs {
                action: CacheAction::Refresh { .. }
            })
        ));

        let cli = parse(&["archer_fetcher", "cache", "info"]);
        assert!(matches!(
            cli.command,
            Commands::Cache(CacheArgs {
                action: CacheAction::Info
            })
        ));

        // The cache lives only as long as one process
        for action in ["invalidate", "clear"] {
            assert!(Cli::try_parse_from(["archer_fetcher", "cache", action, "75"]).is_err());
        }
    }

    #[test]
    fn test_log_level() {
        let cli_quiet = parse(&["archer_fetcher", "--quiet", "auth", "status"]);
        let cli_verbose = parse(&["archer_fetcher", "auth", "status", "--verbose"]);
        let cli_default = parse(&["archer_fetcher", "auth", "verify"]);

        assert_eq!(cli_quiet.log_level(), Some(tracing::Level::ERROR));
        assert_eq!(cli_verbose.log_level(), Some(tracing::Level::INFO));
        assert_eq!(cli_default.log_level(), None);
    }

    #[test]
    fn test_verbosity_flags_conflict() {
        assert!(Cli::try_parse_from(["archer_fetcher", "-q", "-v", "auth", "status"]).is_err());
    }
}
