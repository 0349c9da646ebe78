//! Curve25519 key pair generation

use rand::rngs::OsRng;
use x25519_dalek::{PublicKey, StaticSecret};

use crate::wg::key::Key;

/// A freshly generated key pair (Base64 encoded).
#[derive(Debug, Clone, serde::Serialize)]
pub struct KeyPair {
    pub private_key: String,
    pub public_key: String,
}

/// Generate a new Curve25519 key pair for WireGuard.
pub fn generate_keypair() -> KeyPair {
    let secret = StaticSecret::random_from_rng(OsRng);
    let public = PublicKey::from(&secret);

    KeyPair {
        private_key: Key::new(secret.to_bytes()).to_string(),
        public_key: Key::new(*public.as_bytes()).to_string(),
    }
}
