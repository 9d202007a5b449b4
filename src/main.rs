//! # Psak Din Search Server Driver
//!
//! ## Purpose
//! Main entry point for the psak din search server. Orchestrates
//! initialization of storage, corpus loading, index freshness and the web
//! server for handling search requests.
//!
//! ## Architecture Flow
//! 1. Parse command line arguments and load configuration
//! 2. Initialize logging and tracing
//! 3. Open storage and the search engine (loads the persisted index)
//! 4. Optionally load a corpus file and/or rebuild the index
//! 5. Start the web API server
//! 6. Handle shutdown signals gracefully

use clap::{Arg, Command};
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use psak_search::{
    api::ApiServer,
    config::Config,
    corpus::{CorpusLoader, JsonFileSource},
    errors::{Result, SearchError},
    search::SearchEngine,
    storage::Storage,
    AppState,
};

#[tokio::main]
async fn main() -> Result<()> {
    let matches = Command::new("psak-search-server")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Psak Din Search Team")
        .about("Full-text search engine for rabbinical court rulings")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("config.toml"),
        )
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .value_name("PORT")
                .help("Server port")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("load-corpus")
                .long("load-corpus")
                .value_name("FILE")
                .help("Load a corpus JSON file before serving"),
        )
        .arg(
            Arg::new("rebuild-index")
                .long("rebuild-index")
                .help("Rebuild the search index on startup")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("check-health")
                .long("check-health")
                .help("Run health checks and exit")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let config_path = matches.get_one::<String>("config").unwrap();
    let mut config = Config::from_file(config_path)?;

    if let Some(port) = matches.get_one::<u16>("port") {
        config.server.port = *port;
    }

    let config = Arc::new(config);

    init_logging(&config)?;

    info!("Starting Psak Din Search Engine v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded from: {}", config_path);

    let storage = Arc::new(Storage::open(config.storage.clone()).await?);

    if matches.get_flag("check-health") {
        storage.health_check().await?;
        info!("All health checks passed");
        return Ok(());
    }

    if let Some(corpus_file) = matches.get_one::<String>("load-corpus") {
        info!("Loading corpus from {}", corpus_file);
        let loader = CorpusLoader::new(config.corpus.clone());
        let count = loader
            .load_from(&JsonFileSource::new(corpus_file.clone()), &storage)
            .await?;
        info!("Loaded {} rulings", count);
    }

    let engine = Arc::new(SearchEngine::new(config.clone(), storage).await?);

    if matches.get_flag("rebuild-index") {
        info!("Rebuilding search index...");
        let stats = engine.rebuild_index().await?;
        info!(
            "Index rebuilt: {} documents, {} distinct words",
            stats.document_count, stats.vocabulary_size
        );
    }

    let app_state = AppState {
        config: config.clone(),
        engine,
    };

    let server = ApiServer::new(app_state);

    info!(
        "Psak Din Search Engine started on {}:{}",
        config.server.host, config.server.port
    );

    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("Received SIGINT, shutting down gracefully...");
        }
        res = server.run() => {
            if let Err(e) = res {
                tracing::error!("Server error: {}", e);
            }
            warn!("Server stopped unexpectedly");
        }
    }

    info!("Psak Din Search Engine shut down");
    Ok(())
}

/// Initialize logging and tracing
fn init_logging(config: &Config) -> Result<()> {
    let log_level: tracing::Level =
        config.logging.level.parse().map_err(|_| SearchError::Config {
            message: format!("Invalid log level: {}", config.logging.level),
        })?;

    let filter = tracing_subscriber::filter::LevelFilter::from_level(log_level);
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_level(true);

    if config.logging.json_format {
        tracing_subscriber::registry()
            .with(fmt_layer.json().with_filter(filter))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt_layer.with_filter(filter))
            .init();
    }

    info!("Logging initialized with level: {}", config.logging.level);
    Ok(())
}
