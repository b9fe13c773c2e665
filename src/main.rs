use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use aven_core::vault::EnvVaultProvider;
use aven_core::{AppService, Config, StatusReport, build_service};
use aven_gateway::{ChatRequest, GatewayServer};
use aven_memory::IngestionReport;
use clap::{Parser, Subcommand};
use tokio::sync::{mpsc, watch};

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";
const CHAT_QUEUE_CAPACITY: usize = 64;

#[derive(Debug, Parser)]
#[command(name = "aven", version, about = "Grounded answers over scraped Aven content")]
struct Cli {
    /// Configuration file (default: $AVEN_CONFIG or config/default.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Rebuild the vector index from the configured sources
    Ingest,
    /// Answer a single question against the current index
    Ask {
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },
    /// Serve the HTTP chat endpoint
    Serve {
        #[arg(long)]
        bind: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    /// Print index statistics, a sample record and a test search
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_subscriber();

    let config_path = resolve_config_path(cli.config, std::env::var("AVEN_CONFIG").ok());
    let mut config = Config::load(&config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;
    config.resolve_secrets(&EnvVaultProvider).await?;

    let service = Arc::new(build_service(&config)?);

    match cli.command {
        Command::Ingest => {
            let report = service
                .ingest_with_report()
                .await
                .context("ingestion failed")?;
            print_report(&report);
        }
        Command::Ask { question } => {
            service
                .initialize()
                .await
                .context("failed to attach to the vector index")?;
            let answer = service.answer_query(&question.join(" ")).await;
            println!("{answer}");
        }
        Command::Serve { bind, port } => {
            let bind = bind.unwrap_or_else(|| config.gateway.bind.clone());
            let port = port.unwrap_or(config.gateway.port);
            serve(service, &config, &bind, port).await?;
        }
        Command::Status => {
            service
                .initialize()
                .await
                .context("failed to attach to the vector index")?;
            let status = service
                .status()
                .await
                .context("failed to read index status")?;
            print_status(&status);
        }
    }

    Ok(())
}

async fn serve(
    service: Arc<AppService>,
    config: &Config,
    bind: &str,
    port: u16,
) -> anyhow::Result<()> {
    service
        .initialize()
        .await
        .context("failed to attach to the vector index")?;

    let (chat_tx, chat_rx) = mpsc::channel::<ChatRequest>(CHAT_QUEUE_CAPACITY);
    let worker = tokio::spawn(run_chat_worker(service, chat_rx));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl-c: {e:#}");
            return;
        }
        tracing::info!("received shutdown signal");
        let _ = shutdown_tx.send(true);
    });

    GatewayServer::new(bind, port, chat_tx, shutdown_rx)
        .with_rate_limit(config.gateway.rate_limit)
        .with_max_body_size(config.gateway.max_body_size)
        .serve()
        .await
        .context("gateway failed")?;

    worker.abort();
    Ok(())
}

/// Answers each queued chat request on its own task.
async fn run_chat_worker(service: Arc<AppService>, mut rx: mpsc::Receiver<ChatRequest>) {
    while let Some(request) = rx.recv().await {
        let service = Arc::clone(&service);
        tokio::spawn(async move {
            let answer = service.answer_query(&request.input).await;
            if request.reply.send(answer).is_err() {
                tracing::debug!("chat client went away before the answer was ready");
            }
        });
    }
}

fn resolve_config_path(flag: Option<PathBuf>, env: Option<String>) -> PathBuf {
    flag.or_else(|| env.filter(|p| !p.is_empty()).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

fn init_subscriber() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn print_report(report: &IngestionReport) {
    println!(
        "Indexed {} records ({} chunks) into generation {}, dimension {}",
        report.record_count, report.chunk_count, report.generation, report.dimension
    );
    println!(
        "Sources: {} fetched, {} unavailable, {} empty",
        report.sources_fetched, report.sources_unavailable, report.sources_empty
    );
    if report.skipped_embeddings > 0 {
        println!("Skipped {} chunks with empty embeddings", report.skipped_embeddings);
    }
    if report.placeholder {
        println!("No source produced content, placeholder records were indexed instead");
    }
}

fn print_status(status: &StatusReport) {
    println!("Index: {}", status.index_name);
    match status.stats {
        Some(stats) => {
            let dimension = stats
                .dimension
                .map_or_else(|| "unknown".to_owned(), |d| d.to_string());
            println!("  dimension: {dimension}");
            println!("  records:   {}", stats.record_count);
        }
        None => println!("  not created yet, run `aven ingest`"),
    }

    if let Some(record) = status.sample.first() {
        println!("Sample record {}:", record.id);
        let mut keys: Vec<&String> = record.metadata.keys().collect();
        keys.sort();
        for key in keys {
            let raw = &record.metadata[key];
            let value = raw
                .as_str()
                .map_or_else(|| raw.to_string(), |s| preview(s, 100));
            println!("  {key}: {value}");
        }
    }

    println!(
        "Test search {:?}: {} results",
        status.test_query,
        status.test_results.len()
    );
    for result in &status.test_results {
        println!(
            "  {:.4}  {}  {}",
            result.score,
            result.id,
            result.source().unwrap_or("-")
        );
    }
}

fn preview(text: &str, max_chars: usize) -> String {
    let mut out: String = text.chars().take(max_chars).collect();
    if text.chars().nth(max_chars).is_some() {
        out.push_str("...");
    }
    out
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn ask_joins_words() {
        let cli = Cli::try_parse_from(["aven", "ask", "What", "is", "Aven?"]).unwrap();
        match cli.command {
            Command::Ask { question } => assert_eq!(question.join(" "), "What is Aven?"),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn ask_requires_question() {
        assert!(Cli::try_parse_from(["aven", "ask"]).is_err());
    }

    #[test]
    fn serve_flags_and_global_config() {
        let cli = Cli::try_parse_from([
            "aven", "serve", "--port", "8080", "--config", "custom.toml",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("custom.toml")));
        match cli.command {
            Command::Serve { bind, port } => {
                assert!(bind.is_none());
                assert_eq!(port, Some(8080));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn config_path_precedence() {
        assert_eq!(
            resolve_config_path(Some("a.toml".into()), Some("b.toml".into())),
            PathBuf::from("a.toml")
        );
        assert_eq!(
            resolve_config_path(None, Some("b.toml".into())),
            PathBuf::from("b.toml")
        );
        assert_eq!(
            resolve_config_path(None, Some(String::new())),
            PathBuf::from(DEFAULT_CONFIG_PATH)
        );
        assert_eq!(
            resolve_config_path(None, None),
            PathBuf::from(DEFAULT_CONFIG_PATH)
        );
    }

    #[test]
    fn preview_truncates_on_characters() {
        assert_eq!(preview("short", 10), "short");
        assert_eq!(preview("ééééé", 2), "éé...");
    }
}
