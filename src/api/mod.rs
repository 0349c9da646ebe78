//! API module - HTTP handlers and routes

pub mod handlers;

use axum::{
    routing::{get, post},
    Router,
};

use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Peer provisioning
        .route("/api/provision", post(handlers::provision_peer))
        .route("/api/peers", get(handlers::list_peers))
        .route("/api/server", get(handlers::server_config))
        // Key generation
        .route("/api/keypair", post(handlers::generate_keypair))
}
