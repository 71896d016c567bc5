//! mediavault: local media library with thumbnails, OCR and full-text search.
//!
//! Configuration comes from the environment (and `.env`); see `Config`.

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use uuid::Uuid;

use vault_cli::{format_records, report_failure, App, OutputFormat};
use vault_core::Config;
use vault_infra::{init_telemetry, shutdown_telemetry, LogFormat};
use vault_services::IngestRequest;

#[derive(Parser)]
#[command(name = "mediavault", version, about = "Local media library with OCR search")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest files, process them and exit once every job has finished
    Ingest {
        /// Files to add
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Space-separated tags applied to every file
        #[arg(long, default_value = "")]
        tags: String,
    },
    /// Search OCR text and tags; without a query, list everything
    Search {
        /// Full-text query (SQLite FTS5 syntax)
        query: Option<String>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// Replace the tags of a media record
    Tag {
        id: Uuid,
        tags: String,
    },
    /// Print one media record as JSON
    Show {
        id: Uuid,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::from_env().context("Invalid configuration")?;
    let log_format = config.log_format.parse::<LogFormat>().unwrap_or_else(|e| {
        eprintln!("{}; falling back to pretty logs", e);
        LogFormat::Pretty
    });
    init_telemetry(log_format).map_err(|e| anyhow!("Failed to initialize tracing: {}", e))?;

    tracing::info!(
        environment = %config.environment,
        database = %config.database_url,
        workers = config.worker_count,
        "Starting mediavault"
    );

    let app = App::build(&config).await?;
    let result = run(app, cli.command).await;

    shutdown_telemetry().await;
    result
}

async fn run(app: App, command: Commands) -> Result<()> {
    match command {
        Commands::Ingest { files, tags } => {
            let total = files.len();
            let mut failed = 0usize;
            for file in files {
                let request = IngestRequest::new(&file).with_tags(tags.as_str());
                match app.library().ingest(request).await {
                    Ok(record) => println!("{}  {}  {}", record.id, record.mime, file.display()),
                    Err(e) => {
                        failed += 1;
                        eprintln!(
                            "{}",
                            report_failure(&format!("Ingest of {}", file.display()), &e)
                        );
                    }
                }
            }

            app.drain().await;
            if failed > 0 {
                return Err(anyhow!("{} of {} files could not be ingested", failed, total));
            }
            Ok(())
        }
        Commands::Search { query, format } => {
            let result = app.library().search(query.as_deref().unwrap_or("")).await;
            app.shutdown().await;
            let records = result.map_err(|e| anyhow!(report_failure("Search", &e)))?;
            print!("{}", format_records(&records, format)?);
            Ok(())
        }
        Commands::Tag { id, tags } => {
            let result = app.library().update_tags(id, &tags).await;
            app.shutdown().await;
            let record = result.map_err(|e| anyhow!(report_failure("Tag update", &e)))?;
            println!("{}  tags: {}", record.id, record.tags);
            Ok(())
        }
        Commands::Show { id } => {
            let result = app.library().get(id).await;
            app.shutdown().await;
            let record = result.map_err(|e| anyhow!(report_failure("Lookup", &e)))?;
            println!("{}", serde_json::to_string_pretty(&record)?);
            Ok(())
        }
    }
}
