use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use reqrag::embedder::cache::ModelCache;
use reqrag::pipeline::Pipeline;
use reqrag::server::{self, AppState};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser, Debug)]
#[command(
    name = "reqrag",
    version,
    about = "Extract, classify and prioritize requirements from project documents"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the full pipeline and write artifacts.
    Run {
        /// Input directory with documents
        #[arg(long, default_value = "data/docs")]
        input: PathBuf,

        /// Output directory
        #[arg(long, default_value = "out")]
        out: PathBuf,

        #[arg(long, default_value = "config/config.yaml")]
        config: PathBuf,

        /// High-level query context
        #[arg(long, default_value = "Project requirements")]
        query: String,
    },

    /// Load, chunk, embed and index the inputs without synthesis.
    Index {
        #[arg(long)]
        input: PathBuf,

        #[arg(long, default_value = "config/config.yaml")]
        config: PathBuf,
    },

    /// Serve the HTTP API.
    Serve {
        /// Address to bind (host:port)
        #[arg(long, env = "REQRAG_BIND", default_value = "127.0.0.1:8000")]
        addr: String,

        /// Config used when a request does not name one
        #[arg(long, default_value = "config/config.yaml")]
        config: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Run {
            input,
            out,
            config,
            query,
        } => {
            // The pipeline uses blocking HTTP clients
            let report = tokio::task::spawn_blocking(move || {
                Pipeline::from_path(&config)?.run(&input, &out, &query)
            })
            .await
            .context("pipeline worker failed")??;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Index { input, config } => {
            let summary = tokio::task::spawn_blocking(move || {
                Pipeline::from_path(&config)?.build_index(&input)
            })
            .await
            .context("index worker failed")??;
            println!(
                "Indexed {} chunks from {} files.",
                summary.chunks, summary.files
            );
        }
        Command::Serve { addr, config } => {
            let state = AppState {
                cache: ModelCache::global(),
                default_config: config,
            };
            server::serve(&addr, state).await?;
        }
    }

    Ok(())
}
