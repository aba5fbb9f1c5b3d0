//! Air Quality Service
//!
//! Serves air-quality category predictions and ingests new measurement data.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     AIR QUALITY SERVICE                      │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌──────────────┐   ┌──────────────────┐   ┌──────────────┐  │
//! │  │  HTTP API    │   │  Append          │   │  Inference   │  │
//! │  │  (Axum)      │──▶│  (CSV merge)     │   │  (ONNX)      │  │
//! │  └──────┬───────┘   └────────┬─────────┘   └──────┬───────┘  │
//! │         └────────────────────┼────────────────────┘          │
//! │                              ▼                               │
//! │                    ┌───────────────────┐                     │
//! │                    │   Object store    │                     │
//! │                    │ datasets · model  │                     │
//! │                    └───────────────────┘                     │
//! └──────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod dataset;
mod error;
mod handlers;
mod inference;
mod models;
mod store;

use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub use error::{AppError, AppResult};

use crate::inference::{InferenceEngine, LabelMap, OnnxEngine};
use crate::store::SharedStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "airq_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = config::Config::from_env().context("Failed to load configuration")?;

    tracing::info!("Air Quality Service starting...");
    tracing::info!(
        "Bucket: {}, model: {}, conditional writes: {}",
        config.store.bucket,
        config.model_key,
        config.store.conditional_writes
    );

    let store = store::build_store(&config.store)?;

    let labels = match &config.label_map_path {
        Some(path) => LabelMap::from_file(path)
            .with_context(|| format!("Failed to load label map {}", path.display()))?,
        None => LabelMap::default(),
    };
    tracing::info!("Label map: {} classes", labels.len());

    let engine: Arc<dyn InferenceEngine> =
        Arc::new(OnnxEngine::new(config.model_label_output.clone()));

    let addr = config.socket_addr();

    // Build application state
    let state = AppState {
        config: Arc::new(config),
        store,
        engine,
        labels: Arc::new(labels),
    };

    let app = create_router(state);

    tracing::info!("🚀 Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<config::Config>,
    pub store: SharedStore,
    pub engine: Arc<dyn InferenceEngine>,
    pub labels: Arc<LabelMap>,
}

/// Create the main router with all routes
fn create_router(state: AppState) -> Router {
    let upload_limit = state.config.max_upload_bytes;

    let upload_routes = Router::new()
        .route("/upload", post(handlers::upload::upload))
        .layer(DefaultBodyLimit::max(upload_limit));

    Router::new()
        .route("/", get(handlers::index::landing))
        .route("/health", get(handlers::health::check))
        .route("/predict", post(handlers::predict::predict))
        .merge(upload_routes)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
