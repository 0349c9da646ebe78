//! wg-provd - WireGuard peer provisioning service
//!
//! Hands out addresses from the interface subnet to clients that post
//! their public key, and renders ready-to-use client configuration files.

mod api;
mod config;
mod device;
mod error;
mod wg;

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::RwLock;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::wg::conf::Wg;

/// Shared service state: the whole WireGuard aggregate behind one lock, so
/// an allocation (count read + insert) is a single critical section and a
/// render never observes a half-updated store.
#[derive(Clone)]
pub struct AppState {
    pub wg: Arc<RwLock<Wg>>,
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wg_provd=info,tower_http=debug".into()),
        )
        .init();

    tracing::info!("Starting wg-provd...");

    // Load configuration
    let config = Config::load()?;

    // One-shot WireGuard config load; fatal if unreadable
    let wg = Wg::load(&config.wg.conf_path)?;
    tracing::info!(
        "Loaded {} ({} peers, pool {})",
        config.wg.conf_path,
        wg.peer_count(),
        wg.interface.address,
    );

    let state = AppState {
        wg: Arc::new(RwLock::new(wg)),
        config: Arc::new(config.clone()),
    };

    // Build application router; the landing page is optional
    let app = match config.server.static_dir.as_deref() {
        Some(dir) => api::routes().fallback_service(ServeDir::new(dir)),
        None => api::routes(),
    }
    .with_state(state)
    .layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    );

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
