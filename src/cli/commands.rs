//! Command handlers for the Archer Fetcher CLI
//!
//! Each handler builds an [`ArcherService`] from the loaded configuration,
//! resolves credentials from the environment, and prints its result. Record
//! output goes to stdout as JSON so it can be piped; everything else is
//! human-readable.

use std::sync::Arc;
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

use crate::app::clock::system_clock;
use crate::app::models::Connection;
use crate::app::{ArcherService, CachedApplication, HttpTransportFactory, RecordSet};
use crate::auth::{get_auth_status, resolve_connection};
use crate::cli::{AuthAction, AuthArgs, CacheAction, CacheArgs, FieldsArgs, RecordsArgs};
use crate::config::AppConfig;
use crate::errors::{AppError, Result};

/// State shared by every command handler
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub config: AppConfig,
    /// Suppress the spinner and summaries
    pub quiet: bool,
}

impl CommandContext {
    pub fn new(config: AppConfig, quiet: bool) -> Self {
        Self { config, quiet }
    }

    /// Build a service over HTTP from the configuration
    pub fn service(&self) -> Result<ArcherService> {
        let (client_config, service_config) = self.config.to_runtime_config()?;
        let factory = Arc::new(HttpTransportFactory::new(client_config));
        Ok(ArcherService::new(service_config, factory, system_clock()))
    }

    /// Spinner on stderr, hidden when quiet or stderr is not a terminal
    fn spinner(&self, message: impl Into<String>) -> ProgressBar {
        if self.quiet || !atty::is(atty::Stream::Stderr) {
            return ProgressBar::hidden();
        }

        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["◐", "◓", "◑", "◒"]);
        spinner.set_style(style);
        spinner.set_message(message.into());
        spinner.enable_steady_tick(Duration::from_millis(120));
        spinner
    }
}

fn connection() -> Result<Connection> {
    let connection = resolve_connection()?;
    debug!("Using connection {:?}", connection);
    Ok(connection)
}

/// Handle the records command
///
/// Prints the records as a JSON array on stdout and a one-line summary on
/// stderr.
pub async fn handle_records(args: RecordsArgs, ctx: &CommandContext) -> Result<()> {
    args.validate().map_err(AppError::generic)?;

    let start_time = Instant::now();
    let connection = connection()?;
    let service = ctx.service()?;

    let spinner = ctx.spinner(format!("Reading records of '{}'...", args.app));
    let result = service
        .get_records(&connection, &args.app, args.query(), args.raw)
        .await;
    spinner.finish_and_clear();
    let set = result?;

    println!("{}", serde_json::to_string_pretty(&set.records)?);

    if !ctx.quiet {
        eprintln!("{}", record_summary(&set, start_time.elapsed()));
    }
    info!("Records command finished in {:?}", start_time.elapsed());
    Ok(())
}

fn record_summary(set: &RecordSet, elapsed: Duration) -> String {
    let mut summary = format!(
        "📄 {} record(s) of '{}' ({} total: {})",
        set.records.len(),
        set.application.name,
        if set.total_count.is_exact_sample() {
            "sampled"
        } else {
            "approximate"
        },
        set.total_count.value()
    );

    if let Some(page) = set.page_number {
        summary.push_str(&format!(", page {}", page));
    }
    if let Some(reason) = set.stop_reason {
        if reason.is_partial() {
            summary.push_str(&format!(", partial: {:?}", reason));
        }
    }
    if set.endpoint.is_none() {
        summary.push_str(", no ContentAPI endpoint");
    }
    summary.push_str(&format!(" in {:.1}s", elapsed.as_secs_f64()));
    summary
}

/// Handle the fields command
pub async fn handle_fields(args: FieldsArgs, ctx: &CommandContext) -> Result<()> {
    let connection = connection()?;
    let service = ctx.service()?;

    let spinner = ctx.spinner(format!("Loading fields of '{}'...", args.app));
    let result = service.get_fields(&connection, &args.app).await;
    spinner.finish_and_clear();
    let entry = result?;

    print_fields(&entry, args.include_inactive);
    Ok(())
}

fn print_fields(entry: &CachedApplication, include_inactive: bool) {
    println!(
        "📋 {} (id {}, {})",
        entry.application.name,
        entry.application.id,
        entry.application.status_label()
    );
    println!(
        "Endpoint: {}",
        entry.endpoint.as_deref().unwrap_or("(unresolved)")
    );
    println!("Levels: {}", entry.levels.len());
    for level in &entry.levels {
        println!("  {} - {} ({})", level.level_id, level.name, level.alias);
    }
    if entry.is_degraded() {
        println!("⚠️  Level metadata unavailable; fields were inferred or are missing");
    }

    let mut fields: Vec<_> = entry
        .fields
        .iter()
        .filter(|field| include_inactive || field.is_active)
        .collect();
    fields.sort_by(|a, b| a.level_id.cmp(&b.level_id).then_with(|| a.name.cmp(&b.name)));

    println!();
    println!("Fields: {}", fields.len());
    for field in fields {
        let mut flags = Vec::new();
        if field.is_key {
            flags.push("key");
        }
        if field.is_required {
            flags.push("required");
        }
        if field.is_calculated {
            flags.push("calculated");
        }
        if !field.is_active {
            flags.push("inactive");
        }

        println!(
            "  {:<32} {:<32} {:<14} {}",
            field.name,
            field.alias,
            field.field_type.to_string(),
            flags.join(",")
        );
    }
}

/// Handle cache commands
///
/// The cache lives in the process, so `refresh` checks that metadata can be
/// loaded and how long it takes, and `info` shows the settings a long-lived
/// service would run with.
pub async fn handle_cache(args: CacheArgs, ctx: &CommandContext) -> Result<()> {
    match args.action {
        CacheAction::Refresh { app } => {
            let connection = connection()?;
            let service = ctx.service()?;
            let start_time = Instant::now();
            let spinner = ctx.spinner(format!("Refreshing metadata of '{}'...", app));
            let result = service.refresh_application(&connection, &app).await;
            spinner.finish_and_clear();
            let entry = result?;

            println!(
                "✅ Refreshed '{}': {} level(s), {} field(s) in {:.1}s",
                entry.application.name,
                entry.levels.len(),
                entry.fields.len(),
                start_time.elapsed().as_secs_f64()
            );
        }
        CacheAction::Info => {
            for line in cache_settings(&ctx.config) {
                println!("{}", line);
            }
        }
    }

    Ok(())
}

fn cache_settings(config: &AppConfig) -> Vec<String> {
    let cache = &config.cache;
    vec![
        "💾 Cache Settings".to_string(),
        "================".to_string(),
        format!("Application TTL: {:?}", cache.application_cache_ttl),
        format!("Field mapping TTL: {:?}", cache.field_cache_ttl),
        format!("Entries without fields: {:?}", cache.degraded_entry_ttl),
        format!("Max applications: {}", cache.max_application_cache_entries),
        format!(
            "Auto-refresh after: {:.0}% of TTL",
            cache.auto_refresh_threshold * 100.0
        ),
        format!("Sample records: {}", cache.sample_record_limit),
        format!("Batch size: {}", config.retrieval.batch_size),
        format!("Time budget: {:?}", config.retrieval.time_budget),
    ]
}

/// Handle authentication commands
pub async fn handle_auth(args: AuthArgs, ctx: &CommandContext) -> Result<()> {
    let auth_status = get_auth_status();

    match args.action {
        AuthAction::Status => {
            println!("🔐 Authentication Status");
            println!("=======================");
            println!("{}", auth_status.status_message());
            println!(
                ".env file: {}",
                if auth_status.dotenv_file_exists {
                    "found"
                } else {
                    "not found"
                }
            );
        }
        AuthAction::Verify => {
            if !auth_status.has_connection() {
                warn!("Connection settings incomplete");
                return Err(AppError::generic(auth_status.status_message()));
            }

            let connection = connection()?;
            let service = ctx.service()?;

            let spinner = ctx.spinner(format!("Logging in to {}...", connection.base_url));
            let result = service.connect(&connection).await;
            spinner.finish_and_clear();

            let status = service.auth_status(&connection).await;
            match result {
                Ok(_) => {
                    println!("✅ Credentials verified successfully");
                    if let Some(expires_at) = status.session_expires_at {
                        println!("Session valid until {}", expires_at.format("%H:%M:%S UTC"));
                    }
                }
                Err(e) => {
                    println!("❌ Credential verification failed");
                    if let Some(minutes) = status.cooldown_remaining_minutes {
                        println!("Next attempt allowed in {} minute(s)", minutes);
                    }
                    return Err(e);
                }
            }
        }
    }

    Ok(())
}
