//! WireGuard key type
//!
//! 32-byte Curve25519 keys with standard Base64 text encoding. Private and
//! public keys share the same representation, as in WireGuard itself.

use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use x25519_dalek::{PublicKey, StaticSecret};

use crate::wg::Error;

pub const KEY_LEN: usize = 32;

/// A WireGuard key. The all-zero value acts as a "not yet assigned"
/// sentinel while parsing config files and is never a real key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Key([u8; KEY_LEN]);

impl Key {
    pub fn new(bytes: [u8; KEY_LEN]) -> Self {
        Key(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    /// True for the all-zero sentinel.
    pub fn is_null(&self) -> bool {
        self.0 == [0u8; KEY_LEN]
    }

    /// Derive the matching public key: Curve25519 base-point scalar
    /// multiplication. Total, no error path.
    pub fn public(&self) -> Key {
        let secret = StaticSecret::from(self.0);
        Key(*PublicKey::from(&secret).as_bytes())
    }
}

impl FromStr for Key {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        let bytes = BASE64
            .decode(s.trim())
            .map_err(|e| Error::InvalidKeyEncoding(e.to_string()))?;
        let bytes: [u8; KEY_LEN] = bytes.try_into().map_err(|v: Vec<u8>| {
            Error::InvalidKeyEncoding(format!("decoded {} bytes, expected {}", v.len(), KEY_LEN))
        })?;
        Ok(Key(bytes))
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&BASE64.encode(self.0))
    }
}
