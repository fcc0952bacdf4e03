use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod config;
mod error;
mod github;
mod poller;

use config::Config;
use github::RawReleasesResponse;
use poller::projector::{Outcome, ReleasesProjector};
use poller::requests::RequestQueue;
use poller::table::InMemoryTableStore;
use poller::ReleaseRow;

#[derive(Parser)]
#[command(name = "release-poller")]
#[command(about = "Poll GitHub releases into a repository releases table")]
struct Cli {
    /// Path to a TOML config file
    #[arg(short, long, env = "RELEASE_POLLER_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch every releases page of the given repositories
    Poll {
        /// Comma-separated list of owner/name repositories (overrides config)
        #[arg(short, long, value_delimiter = ',')]
        repos: Vec<String>,

        /// Page size (overrides config)
        #[arg(long)]
        per_page: Option<u32>,

        /// Output format
        #[arg(short = 'f', long, default_value = "text")]
        format: OutputFormat,
    },

    /// Project a saved releases response body without touching the network
    Project {
        /// File holding the JSON body of a releases response
        #[arg(short, long)]
        body: PathBuf,

        /// Value of the response's Link header
        #[arg(short, long)]
        link: Option<String>,

        #[arg(short = 'f', long, default_value = "text")]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Poll {
            repos,
            per_page,
            format,
        } => {
            if !repos.is_empty() {
                config.polling.repos = repos;
            }
            if let Some(per_page) = per_page {
                anyhow::ensure!(
                    (1..=100).contains(&per_page),
                    "--per-page must be between 1 and 100"
                );
                config.polling.per_page = per_page;
            }
            anyhow::ensure!(
                !config.polling.repos.is_empty(),
                "No repositories to poll, pass --repos or set polling.repos"
            );

            let client = github::GitHubClient::new(&config.github)?;
            let projector = ReleasesProjector::new(config.table.id.clone(), config.polling.per_page);
            let mut poller = poller::ReleasesPoller::new(client, projector, &config.polling);
            let summary = poller.poll(&config.polling.repos).await?;

            let rows = poller.store().rows(poller.table_id());
            match format {
                OutputFormat::Json => println!(
                    "{}",
                    serde_json::to_string_pretty(&serde_json::json!({
                        "summary": summary,
                        "rows": rows,
                    }))?
                ),
                OutputFormat::Text => {
                    print_rows(&rows);
                    println!();
                    println!(
                        "{} pages, {} rows written, {} entries skipped, {} pages failed",
                        summary.pages, summary.rows_written, summary.skipped, summary.failed_pages
                    );
                    if summary.abandoned > 0 {
                        println!("{} requests dropped at the page limit", summary.abandoned);
                    }
                }
            }
        }
        Commands::Project { body, link, format } => {
            let body = std::fs::read_to_string(&body)
                .with_context(|| format!("Failed to read {}", body.display()))?;

            let projector = ReleasesProjector::new(config.table.id.clone(), config.polling.per_page);
            let mut store = InMemoryTableStore::new();
            let mut queue = RequestQueue::new();
            let outcome = projector.handle_releases_response(
                &RawReleasesResponse::ok(body, link),
                &mut store,
                &mut queue,
            );

            let rows = store.rows(&projector.table_id);
            let continuation = match &outcome {
                Outcome::Projected { continuation, .. } => continuation.as_ref(),
                _ => None,
            };
            match format {
                OutputFormat::Json => println!(
                    "{}",
                    serde_json::to_string_pretty(&serde_json::json!({
                        "rows": rows,
                        "continuation": continuation,
                    }))?
                ),
                OutputFormat::Text => {
                    match &outcome {
                        Outcome::Failed(e) => println!("Response could not be projected: {}", e),
                        Outcome::Empty => println!("No releases"),
                        _ => print_rows(&rows),
                    }
                    if let Some(next) = continuation {
                        println!(
                            "Next: {}/{} page {} ({} per page)",
                            next.owner, next.name, next.page, next.per_page
                        );
                    } else if queue.is_empty() {
                        println!("No further pages");
                    }
                }
            }
        }
    }

    Ok(())
}

fn print_rows(rows: &[&ReleaseRow]) {
    if rows.is_empty() {
        println!("No releases found");
        return;
    }
    let mut repository = "";
    for row in rows {
        if row.repository_key != repository {
            repository = &row.repository_key;
            println!("Repository: {}", repository);
        }
        let mut flags = String::new();
        if row.draft {
            flags.push_str(" [draft]");
        }
        if row.prerelease {
            flags.push_str(" [prerelease]");
        }
        println!(
            "  - {} ({}) by {}: {}{}",
            row.tag_name,
            row.id,
            row.author,
            row.published_at
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "unpublished".to_string()),
            flags
        );
    }
}
