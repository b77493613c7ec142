mod config;
mod detection;
mod document;
mod error;
mod indexer;
mod ingest;
mod keywords;
mod labels;
mod nlu;
mod provisioner;
mod query;
mod search;
mod search_clients;
mod search_service;
mod storage;
mod web_server;

#[cfg(test)]
mod test_support;

use crate::config::AppConfig;
use crate::detection::HttpLabelDetector;
use crate::ingest::{IngestionAck, IngestionPipeline, UploadEvent};
use crate::keywords::{KeywordExtractor, NluSettings};
use crate::nlu::HttpIntentRecognizer;
use crate::search::Searcher;
use crate::search_clients::{elasticsearch::ElasticsearchSearcher, tantivy::TantivySearcher};
use crate::search_service::PhotoSearch;
use crate::storage::HttpObjectStore;
use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use log::info;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "photo-indexer", version, about = "Indexes photo labels and answers label searches")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Process one upload notification batch read from a JSON file
    Ingest { event: PathBuf },
    /// Run one search and print the JSON response
    Search { query: String },
}

fn build_searcher(config: &AppConfig) -> Result<Arc<dyn Searcher>> {
    let searcher: Arc<dyn Searcher> = match config.engine.as_str() {
        "elasticsearch" => Arc::new(ElasticsearchSearcher::new(config)?),
        "tantivy" => Arc::new(TantivySearcher::new(config)),
        other => bail!("unknown search engine '{}'", other),
    };
    Ok(searcher)
}

/// Runs one CLI search. A failed search prints the error body and still fails the process.
async fn search_command(search: &PhotoSearch, query: &str) -> Result<serde_json::Value> {
    match search.search(Some(query)).await {
        Ok(results) => Ok(serde_json::json!({ "results": results })),
        Err(e) => {
            log::error!("Search query failed: {}", e);
            println!("{}", serde_json::json!({ "error": "Search failed" }));
            bail!("search for '{}' failed: {}", query, e);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::new()?;

    env_logger::Builder::new()
        .filter_level(config.log_level.parse().unwrap_or(log::LevelFilter::Info))
        .init();

    info!("Starting photo-indexer with {} engine", config.engine);

    let searcher = build_searcher(&config)?;
    let timeout = config.collaborator_timeout();
    let pipeline = Arc::new(
        IngestionPipeline::new(
            Arc::new(HttpObjectStore::new(&config.storage_endpoint, timeout)?),
            Arc::new(HttpLabelDetector::new(&config.detection_endpoint, timeout)?),
            searcher.clone(),
            config.ingest_concurrency,
        )
        .with_record_timeout(config.record_timeout()),
    );
    let extractor = KeywordExtractor::new(
        Arc::new(HttpIntentRecognizer::new(&config.nlu_endpoint, timeout)?),
        NluSettings::from_config(&config),
    );
    let search = Arc::new(PhotoSearch::new(extractor, searcher));

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            web_server::start_web_server(config.web_port, pipeline, search).await?;
        }
        Command::Ingest { event } => {
            let raw = std::fs::read_to_string(&event)?;
            let event: UploadEvent = serde_json::from_str(&raw)?;
            pipeline.ingest(&event).await;
            println!("{}", serde_json::to_string(&IngestionAck::ok())?);
        }
        Command::Search { query } => {
            println!("{}", search_command(&search, &query).await?);
        }
    }

    info!("photo-indexer finished");

    Ok(())
}
