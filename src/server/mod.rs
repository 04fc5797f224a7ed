//! HTTP front end: the input form, the prediction endpoint and a health check.
//!
//! The [`Predictor`] is built before the router and handed to it as shared
//! immutable state; handlers never reload the artifact.

mod handlers;
pub mod page;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use thiserror::Error;
use tracing::info;

use crate::predict::Predictor;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },
    #[error("Server stopped with an error: {0}")]
    Serve(std::io::Error),
}

/// State shared by all request handlers.
#[derive(Debug)]
pub struct AppState {
    pub predictor: Predictor,
}

/// Build the axum [`Router`] with all routes.
pub fn build_router(predictor: Predictor) -> Router {
    let state = Arc::new(AppState { predictor });
    Router::new()
        .route("/", get(handlers::home))
        .route("/predict", post(handlers::predict))
        .route("/health", get(handlers::health))
        .with_state(state)
}

/// Bind `listen_addr` and serve until the process is stopped.
pub async fn serve(listen_addr: &str, predictor: Predictor) -> Result<(), ServerError> {
    let listener = tokio::net::TcpListener::bind(listen_addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: listen_addr.to_string(),
            source,
        })?;
    let bound = listener
        .local_addr()
        .map(|addr| addr.to_string())
        .unwrap_or_else(|_| listen_addr.to_string());
    info!(
        listen_addr = %bound,
        features = predictor.features().len(),
        "Prediction service listening"
    );
    axum::serve(listener, build_router(predictor))
        .await
        .map_err(ServerError::Serve)
}
