//! jira-digest - daily Jira status digests
//!
//! Fetches the issues of each configured Jira project, aggregates them into
//! a digest (status breakdown, blocked work, schedule risks, stale backlog,
//! assignee load) and delivers it by email and Slack, once or every day.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (config, Jira unreachable, every delivery channel failed)
//!   2 - Digest delivered but one or more projects failed

mod analysis;
mod cli;
mod config;
mod delivery;
mod error;
mod jira;
mod models;
mod report;
mod reporter;
mod scheduler;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use cli::Args;
use config::{Config, DEFAULT_CONFIG_FILE};
use delivery::Dispatcher;
use indicatif::{ProgressBar, ProgressStyle};
use jira::JiraClient;
use models::DailyDigest;
use reporter::DailyReporter;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args);

    info!("jira-digest v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    let outcome = if args.schedule {
        run_scheduled(args).await
    } else {
        run_once(&args, !args.quiet).await
    };

    match outcome {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(e) => {
            error!("Run failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: write a default configuration file.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            DEFAULT_CONFIG_FILE
        );
        std::process::exit(1);
    }

    std::fs::write(path, Config::default_toml())
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", DEFAULT_CONFIG_FILE);
    println!("   Fill in the [jira] credentials and the delivery sections.");
    Ok(())
}

/// Initialize logging. RUST_LOG takes precedence over --verbose/--quiet.
fn init_logging(args: &Args) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.log_level().to_string().to_lowercase()));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Run the daily loop. Configuration is reloaded before every run.
async fn run_scheduled(args: Args) -> Result<i32> {
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);
    config.validate()?;

    let at = scheduler::parse_schedule_time(&config.schedule.time)?;
    if !args.quiet {
        println!("⏰ Daily digest scheduled at {}", at.format("%H:%M"));
        println!("   Press Ctrl-C to stop.");
    }

    scheduler::run_daily(at, args.run_now, || {
        let args = args.clone();
        async move {
            match run_once(&args, false).await? {
                0 => Ok(()),
                code => bail!("run finished with exit code {}", code),
            }
        }
    })
    .await?;

    Ok(0)
}

/// Build and deliver one digest. Returns the exit code.
async fn run_once(args: &Args, show_progress: bool) -> Result<i32> {
    let start_time = Instant::now();

    let mut config = load_config(args)?;
    config.merge_with_args(args);
    config.validate()?;

    let client = JiraClient::new(config.jira.clone()).context("Failed to build HTTP client")?;
    let mut reporter = DailyReporter::new(&client, &config.report, &config.aggregation);

    let projects = reporter
        .resolve_projects()
        .await
        .context("Failed to list Jira projects")?;
    if projects.is_empty() {
        bail!("No projects to report on");
    }

    if !args.quiet {
        println!("📥 Fetching issues for: {}", projects.join(", "));
    }

    let progress = if show_progress {
        let pb = ProgressBar::new(projects.len() as u64);
        pb.set_style(
            ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
                .progress_chars("#>-"),
        );
        reporter = reporter.with_progress(pb.clone());
        Some(pb)
    } else {
        None
    };

    let digest = reporter.build_digest(&projects, Utc::now()).await;

    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    if digest.projects.is_empty() {
        bail!("Every project failed; nothing to report");
    }

    if let Some(ref path) = args.output {
        let content = report::render(&digest, args.format, &config.slack)?;
        report::write_report(&content, path)?;
        info!("Digest written to {}", path.display());
    }

    if args.dry_run {
        println!("{}", report::render(&digest, args.format, &config.slack)?);
        println!("\n✅ Dry run complete. Nothing was sent.");
        return Ok(exit_code_for(&digest));
    }

    let dispatcher = Dispatcher::from_config(&config, args.no_email, args.no_slack)?;
    let summary = dispatcher.dispatch(&digest).await;

    if !args.quiet {
        print_summary(&digest, start_time);
        println!("   Email: {}", summary.email);
        println!("   Slack: {}", summary.slack);
    }

    if summary.nothing_configured() {
        warn!("No delivery channel configured; the digest was not sent");
    }

    if summary.all_failed() {
        eprintln!("\n⛔ Every configured delivery channel failed.");
        return Ok(1);
    }

    Ok(exit_code_for(&digest))
}

fn exit_code_for(digest: &DailyDigest) -> i32 {
    if digest.has_failures() {
        2
    } else {
        0
    }
}

fn print_summary(digest: &DailyDigest, start_time: Instant) {
    println!("\n📊 Digest Summary ({}):", digest.date);
    for project in &digest.projects {
        println!(
            "   {}: {} issues | 🚫 {} blocked | 🔄 {} in progress | ⏰ {} old backlog",
            project.project_key,
            project.total_issues,
            project.blocked_issues.len(),
            project.in_progress_issues.len(),
            project.old_backlog_issues.len()
        );
    }
    for failure in &digest.failures {
        println!("   ❌ {}: {}", failure.project_key, failure.error);
    }
    println!("   Duration: {:.1}s", start_time.elapsed().as_secs_f64());
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    if let Some(ref config_path) = args.config {
        debug!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    match Config::load_default()? {
        Some(config) => {
            debug!("Loaded default config from {}", DEFAULT_CONFIG_FILE);
            Ok(config)
        }
        None => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
    }
}
