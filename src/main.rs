// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{routing::get, Router};
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::application::artifact_store::ArtifactStore;
use crate::application::deploy_service::DeployService;
use crate::application::preview_service::PreviewService;
use crate::application::status_service::StatusService;
use crate::infrastructure::config::load_dashboard_config;
use crate::infrastructure::fs_store::FsArtifactStore;
use crate::infrastructure::pickle_validator::PickleModelValidator;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{artifact_status, dashboard_page, deploy_model, health_check};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let config = load_dashboard_config()?;
    let catalog = config.catalog()?;

    // Artifact access (infrastructure layer)
    let store: Arc<dyn ArtifactStore> = Arc::new(FsArtifactStore::new(config.artifacts.root.clone()));
    let validator = Arc::new(PickleModelValidator::new());

    // Create services (application layer)
    let preview_service = PreviewService::new(store.clone(), config.artifacts.preview_rows);
    let deploy_service = DeployService::new(store.clone(), validator);
    let status_service = StatusService::new(store);

    let state = Arc::new(AppState {
        catalog,
        page: config.page.clone(),
        preview_service,
        deploy_service,
        status_service,
    });

    // Build router (presentation layer)
    let router = Router::new()
        .route("/", get(dashboard_page))
        .route("/deploy", get(deploy_model))
        .route("/api/artifacts", get(artifact_status))
        .route("/healthz", get(health_check))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr: SocketAddr = config
        .server
        .bind
        .parse()
        .with_context(|| format!("invalid bind address {}", config.server.bind))?;
    tracing::info!(
        "Serving artifacts from {} on {}",
        config.artifacts.root.display(),
        addr
    );

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}
