use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::http::HeaderValue;
use axum::routing::get;
use axum::Router;
use tower_http::cors::{self, CorsLayer};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use lovebug_common::Config;
use lovebug_ingest::fetchers::{SampleFetcher, TwitterFetcher};
use lovebug_ingest::pipeline::IngestPipeline;
use lovebug_ingest::scheduler::run_scheduler;
use lovebug_ingest::traits::SourceFetcher;
use lovebug_store::{ReportReader, ReportWriter, StoreClient};

mod registry;
mod rest;
mod ws;

use registry::ConnectionRegistry;

pub struct AppState {
    pub reader: ReportReader,
    pub registry: Arc<ConnectionRegistry>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("lovebug_api=info".parse()?)
                .add_directive("lovebug_ingest=info".parse()?)
                .add_directive("lovebug_store=info".parse()?),
        )
        .init();

    let config = Config::from_env();

    let client = StoreClient::connect(&config.database_url).await?;
    let writer = ReportWriter::new(client.clone());
    writer.run_migrations().await?;

    let registry = Arc::new(ConnectionRegistry::new());

    // Scheduled ingest: fetch → extract → upsert → broadcast, every tick.
    let fetcher: Box<dyn SourceFetcher> = match &config.twitter_bearer_token {
        Some(token) => Box::new(TwitterFetcher::new(token)),
        None => {
            warn!("TWITTER_BEARER_TOKEN not set, using offline sample fetcher");
            Box::new(SampleFetcher::new())
        }
    };
    let pipeline = IngestPipeline::new(
        fetcher,
        Box::new(writer),
        Box::new(registry.clone()),
        config.fetch_limit_per_keyword,
    );
    tokio::spawn(run_scheduler(
        pipeline,
        Duration::from_secs(config.poll_interval_secs),
    ));

    let state = Arc::new(AppState {
        reader: ReportReader::new(client),
        registry,
    });

    let cors = if config.allowed_origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(cors::Any)
            .allow_methods(cors::Any)
            .allow_headers(cors::Any)
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(cors::Any)
            .allow_headers(cors::Any)
    };

    let app = Router::new()
        // Health
        .route("/", get(rest::root))
        .route("/health", get(rest::health))
        // REST API
        .route("/api/v1/reports", get(rest::list_reports))
        .route("/api/v1/reports/{id}", get(rest::report_detail))
        .route("/api/v1/stats", get(rest::stats))
        .route("/api/v1/hotspots", get(rest::hotspots))
        .route("/api/v1/search", get(rest::search))
        .route("/api/v1/districts", get(rest::districts))
        // Live updates
        .route("/ws", get(ws::ws_handler))
        .with_state(state)
        .layer(cors)
        // Logging layer: method + path + status + latency
        .layer(
            tower_http::trace::TraceLayer::new_for_http().make_span_with(
                |request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                },
            ),
        );

    let addr = format!("{}:{}", config.host, config.port);
    info!("Lovebug Map API starting on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
