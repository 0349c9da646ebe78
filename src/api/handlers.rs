//! WireGuard provisioning handlers
//!
//! Key pair generation, peer provisioning, config rendering.

use axum::{extract::State, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::wg::key::Key;
use crate::wg::keygen;
use crate::AppState;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// Health check handler
pub async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: "wg-provd".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[derive(Deserialize)]
pub struct ProvisionRequest {
    pub public_key: String,
}

/// POST /api/provision - allocate (or look up) an address for a public key
/// and return the ready-to-use client config
pub async fn provision_peer(
    State(state): State<AppState>,
    Json(req): Json<ProvisionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let key: Key = req.public_key.parse().map_err(AppError::from)?;

    // One write lock spans the lookup, the allocation and the render, so
    // concurrent requests never share an ordinal or see a half-updated
    // store.
    let (peer, client_text) = {
        let mut wg = state.wg.write().await;
        let peer = wg.get_or_create(key)?;
        let client = wg.client_config(&peer, &state.config.wg.endpoint);
        (peer, client.to_string())
    };

    tracing::info!("Provisioned {} as {}", key, peer.allowed_ips);

    if let Some(dev) = state.config.wg.device.as_deref() {
        if let Err(e) = crate::device::apply_peer(dev, &peer).await {
            tracing::warn!("Device update failed (non-fatal): {}", e);
        }
    }

    Ok(Json(serde_json::json!({
        "ok": true,
        "address": peer.allowed_ips.to_string(),
        "config": client_text,
    })))
}

/// GET /api/peers - list provisioned peers
pub async fn list_peers(State(state): State<AppState>) -> Json<serde_json::Value> {
    let wg = state.wg.read().await;
    let peers: Vec<_> = wg
        .peers()
        .map(|p| {
            serde_json::json!({
                "public_key": p.public_key.to_string(),
                "allowed_ips": p.allowed_ips.to_string(),
            })
        })
        .collect();

    Json(serde_json::json!({
        "ok": true,
        "peers": peers,
        "total": peers.len(),
    }))
}

/// GET /api/server - the server-side config rendered to text
pub async fn server_config(State(state): State<AppState>) -> String {
    state.wg.read().await.to_string()
}

/// POST /api/keypair - generate a new key pair
pub async fn generate_keypair() -> Json<serde_json::Value> {
    let keypair = keygen::generate_keypair();
    Json(serde_json::json!({
        "ok": true,
        "private_key": keypair.private_key,
        "public_key": keypair.public_key,
    }))
}
