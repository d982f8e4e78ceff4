//! FieldSign API Server - Backend for the document signature workflow
//!
//! Provides REST endpoints for:
//! - Document upload and owner management
//! - Signature field configuration and public link generation
//! - The public signing flow, compositing the signature into a new artifact

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

mod documents;
mod error;
mod handlers;
mod models;
mod state;
mod storage;
mod token;

use state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health))
        // Owner endpoints
        .route(
            "/api/documents",
            post(handlers::upload_document).get(handlers::list_documents),
        )
        .route(
            "/api/documents/:id",
            get(handlers::get_document).delete(handlers::delete_document),
        )
        .route("/api/documents/:id/send", post(handlers::send_document))
        .route(
            "/api/documents/:id/download",
            get(handlers::download_document),
        )
        // Public signing flow
        .route(
            "/sign/:link",
            get(handlers::get_sign_context).post(handlers::submit_signature),
        )
        .route("/sign/:link/document", get(handlers::get_sign_document_bytes))
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("fieldsign_api=info".parse()?)
                .add_directive("tower_http=debug".parse()?),
        )
        .init();

    info!("Initializing FieldSign API...");
    let state = Arc::new(AppState::new().await?);

    // CORS configuration for web clients
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3001);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting FieldSign API on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
