//! Timetable Crawler CLI
//!
//! Fetches course outlines for one or more terms from a course listing file
//! produced by the discovery step.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use timetable_crawler::{
    error::{AppError, Result},
    models::{Config, Course, Term},
    pipeline::{self, TermJob},
    schedule::decode_schedule,
    services::OutlineClient,
    storage::{CheckpointStore, LocalStore},
};

/// Timetable Crawler - course listing and syllabus retrieval
#[derive(Parser, Debug)]
#[command(
    name = "timetable-crawler",
    version,
    about = "Fetches course outlines from the timetable service"
)]
struct Cli {
    /// Path to storage directory containing config and checkpoints
    #[arg(short, long, default_value = "storage")]
    storage_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch outlines for one term from a course listing file
    Outlines {
        /// Term to crawl, e.g. 114-1
        #[arg(long)]
        term: String,

        /// Course listing JSON produced by discovery
        #[arg(long)]
        input: PathBuf,
    },

    /// Fetch outlines for several terms in parallel
    Batch {
        /// Terms to crawl, e.g. 113-1,113-2,114-1
        #[arg(long, value_delimiter = ',')]
        terms: Vec<String>,

        /// Directory holding one {term}.json course listing per term
        #[arg(long)]
        input_dir: PathBuf,
    },

    /// Validate configuration
    Validate,

    /// Show checkpoint status for a term
    Info {
        /// Term to inspect, e.g. 114-1
        #[arg(long)]
        term: String,
    },
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Load a course listing and decode each course's schedule from its raw
/// source string.
fn load_courses(path: &PathBuf) -> Result<Vec<Course>> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        AppError::config(format!("Cannot read course listing {}: {e}", path.display()))
    })?;
    let mut courses: Vec<Course> = serde_json::from_str(&content)?;
    for course in &mut courses {
        course.schedule = decode_schedule(&course.raw_schedule);
    }
    Ok(courses)
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    log::info!("Timetable crawler starting...");

    let config_path = cli.storage_dir.join("config.toml");
    let config = Config::load_or_default(&config_path);
    config.validate()?;

    let store = LocalStore::new(&cli.storage_dir);

    match cli.command {
        Command::Outlines { term, input } => {
            let term: Term = term.parse()?;
            let courses = load_courses(&input)?;
            log::info!("{term}: loaded {} courses from {}", courses.len(), input.display());

            let client = OutlineClient::new(&config)?;
            let report = pipeline::run_term(&client, &store, term, courses, &config).await?;

            log::info!(
                "{term}: {} outlines fetched, {} failed, {} resumed from checkpoint",
                report.stats.succeeded,
                report.stats.failed,
                report.resumed
            );
        }

        Command::Batch { terms, input_dir } => {
            let mut jobs = Vec::new();
            for term in &terms {
                let term: Term = term.parse()?;
                let listing = input_dir.join(format!("{term}.json"));
                let courses = load_courses(&listing)?;
                log::info!("{term}: loaded {} courses", courses.len());
                jobs.push(TermJob { term, courses });
            }

            let client = OutlineClient::new(&config)?;
            let reports = pipeline::run_all(&client, &store, jobs, &config).await;

            for report in &reports {
                log::info!(
                    "{}: {}/{} outlines ({} via fallback)",
                    report.term,
                    report.stats.succeeded,
                    report.total,
                    report.stats.fallback_used
                );
            }
            if reports.len() < terms.len() {
                log::warn!("{} of {} terms did not complete", terms.len() - reports.len(), terms.len());
            }
        }

        Command::Validate => {
            log::info!("Validating configuration...");
            // Already validated above; surface the endpoints for a sanity look.
            log::info!("Base URL: {}", config.endpoints.base_url);
            log::info!("Fallback routes: {}", config.endpoints.fallback_routes.join(", "));
            log::info!("All validations passed!");
        }

        Command::Info { term } => {
            let term: Term = term.parse()?;
            match store.load(term).await? {
                Some(checkpoint) => {
                    log::info!(
                        "{term}: checkpoint with {} courses, {} with outlines, last updated {}",
                        checkpoint.metadata.total_courses,
                        checkpoint.completed(),
                        checkpoint.metadata.last_updated
                    );
                }
                None => log::info!("{term}: no checkpoint found"),
            }
        }
    }

    log::info!("Done!");

    Ok(())
}
