//! WireGuard core: keys, CIDR arithmetic, config codec, peer store
//!
//! - `key`: 32-byte keys with Base64 text encoding and public-key derivation
//! - `addr`: unified v4/v6 CIDR type, allowed-IP sets, ordinal allocation
//! - `conf`: `[Interface]`/`[Peer]` text format parser and serializer
//! - `store`: get-or-create peer provisioning
//! - `keygen`: Curve25519 key pair generation

pub mod addr;
pub mod conf;
pub mod key;
pub mod keygen;
pub mod store;

use thiserror::Error as ThisError;

/// Errors produced by the WireGuard core. Config parse errors carry the
/// 1-based line number of the offending line.
#[derive(Debug, ThisError)]
pub enum Error {
    #[error("invalid key encoding: {0}")]
    InvalidKeyEncoding(String),

    #[error("invalid address {0:?}")]
    InvalidAddress(String),

    #[error("invalid number {0:?}")]
    InvalidNumber(String),

    #[error("line {line}: expected `key = value` assignment")]
    MalformedAssignment { line: usize },

    #[error("line {line}: unknown field {field:?}")]
    UnknownField { line: usize, field: String },

    #[error("line {line}: assignment outside of any section")]
    NoSectionActive { line: usize },

    #[error("line {line}: {source}")]
    AtLine {
        line: usize,
        source: Box<Error>,
    },

    #[error("address space exhausted")]
    AddressSpaceExhausted,

    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Attach a config line number, unless one is already attached.
    pub(crate) fn at_line(self, line: usize) -> Error {
        match self {
            e @ (Error::MalformedAssignment { .. }
            | Error::UnknownField { .. }
            | Error::NoSectionActive { .. }
            | Error::AtLine { .. }) => e,
            e => Error::AtLine {
                line,
                source: Box::new(e),
            },
        }
    }
}
