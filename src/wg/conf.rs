//! WireGuard config codec
//!
//! Parses and serializes the `[Interface]`/`[Peer]` text format. Parsing is
//! a section-scoped line state machine; the first error aborts with the
//! 1-based line number and no partial model escapes. Serialization renders
//! peers in public-key order, so output is deterministic.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::wg::addr::{Addr, AddrSet};
use crate::wg::key::Key;
use crate::wg::Error;

pub const DEFAULT_LISTEN_PORT: u16 = 51820;

/// The local endpoint: its subnet (doubling as the allocation pool), port
/// and keys. A null public key means "derive from the private key when
/// rendering".
#[derive(Debug, Clone, Default)]
pub struct Interface {
    pub address: Addr,
    pub listen_port: u16,
    pub private_key: Key,
    pub public_key: Key,
}

impl Interface {
    fn effective_public_key(&self) -> Key {
        if self.public_key.is_null() {
            self.private_key.public()
        } else {
            self.public_key
        }
    }

    /// This interface seen from the other side: the `[Peer]` block a client
    /// config uses to describe the server. AllowedIPs is the advertised
    /// subnet, endpoint left for the caller.
    pub fn peer(&self) -> Peer {
        Peer {
            public_key: self.effective_public_key(),
            allowed_ips: AddrSet::from(self.address),
            ..Peer::default()
        }
    }
}

impl fmt::Display for Interface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[Interface]")?;
        writeln!(f, "Address = {}", self.address)?;
        writeln!(f, "ListenPort = {}", self.listen_port)?;
        writeln!(f, "PrivateKey = {}", self.private_key)?;
        writeln!(f, "#PublicKey = {}", self.effective_public_key())
    }
}

/// A remote endpoint: public key plus the addresses it may use. For a
/// provisioned client this is always a single host route.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Peer {
    pub public_key: Key,
    pub allowed_ips: AddrSet,
    pub endpoint: String,
    pub persistent_keepalive: u32,
}

impl Peer {
    /// This peer seen from its own side: the `[Interface]` block of a
    /// client config, built from the allocated address.
    pub fn interface(&self, listen_port: u16) -> Interface {
        Interface {
            address: self.allowed_ips.first().copied().unwrap_or_default(),
            listen_port,
            private_key: Key::default(),
            public_key: self.public_key,
        }
    }
}

impl fmt::Display for Peer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[Peer]")?;
        writeln!(f, "PublicKey = {}", self.public_key)?;
        writeln!(f, "AllowedIPs = {}", self.allowed_ips)?;
        if !self.endpoint.is_empty() {
            writeln!(f, "EndPoint = {}", self.endpoint)?;
        }
        if self.persistent_keepalive > 0 {
            writeln!(f, "PersistentKeepalive = {}", self.persistent_keepalive)?;
        }
        Ok(())
    }
}

/// A whole WireGuard configuration: the local interface plus all known
/// peers, keyed and rendered by public key.
#[derive(Debug, Clone, Default)]
pub struct Wg {
    pub interface: Interface,
    pub(crate) peers: BTreeMap<Key, Peer>,
    /// Monotonic allocation counter; see `store.rs`. Kept explicit instead
    /// of re-derived so allocation does not depend on iteration.
    pub(crate) allocated: u64,
}

impl Wg {
    /// One-shot config file load at startup.
    pub fn load(path: impl AsRef<Path>) -> Result<Wg, Error> {
        fs::read_to_string(path.as_ref())?.parse()
    }

    /// A self-contained client configuration for one provisioned peer: the
    /// client's own `[Interface]` plus a `[Peer]` block for this server.
    pub fn client_config(&self, peer: &Peer, endpoint: &str) -> Wg {
        let mut server = self.interface.peer();
        server.endpoint = endpoint.to_string();

        let mut peers = BTreeMap::new();
        peers.insert(server.public_key, server);

        Wg {
            interface: peer.interface(DEFAULT_LISTEN_PORT),
            peers,
            allocated: 0,
        }
    }

    fn commit(&mut self, peer: Option<Peer>) {
        if let Some(peer) = peer {
            if !peer.public_key.is_null() {
                self.peers.insert(peer.public_key, peer);
            }
        }
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Section {
    None,
    Interface,
    Peer,
}

impl FromStr for Wg {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        let mut wg = Wg::default();
        let mut section = Section::None;
        let mut building: Option<Peer> = None;

        for (idx, raw) in s.lines().enumerate() {
            let line = idx + 1;

            let mut text = raw.trim();
            if let Some(pos) = text.find('#') {
                text = text[..pos].trim_end();
            }
            if text.is_empty() {
                continue;
            }

            match text {
                "[Interface]" => {
                    section = Section::Interface;
                    continue;
                }
                "[Peer]" => {
                    section = Section::Peer;
                    wg.commit(building.take());
                    building = Some(Peer::default());
                    continue;
                }
                _ => {}
            }

            let (field, value) = text
                .split_once('=')
                .ok_or(Error::MalformedAssignment { line })?;
            let field = field.trim().to_ascii_lowercase();
            let value = value.trim();

            let assigned: Result<(), Error> = match section {
                Section::None => Err(Error::NoSectionActive { line }),
                Section::Interface => match field.as_str() {
                    "address" => value.parse().map(|a| wg.interface.address = a),
                    "privatekey" => value.parse().map(|k| wg.interface.private_key = k),
                    "listenport" => value
                        .parse::<u16>()
                        .map(|p| wg.interface.listen_port = p)
                        .map_err(|_| Error::InvalidNumber(value.to_string())),
                    _ => Err(Error::UnknownField {
                        line,
                        field: field.clone(),
                    }),
                },
                Section::Peer => {
                    let peer = building.get_or_insert_with(Peer::default);
                    match field.as_str() {
                        "allowedips" => value.parse().map(|set| peer.allowed_ips = set),
                        "publickey" => value.parse().map(|k| peer.public_key = k),
                        "endpoint" => {
                            peer.endpoint = value.to_string();
                            Ok(())
                        }
                        "persistentkeepalive" => value
                            .parse::<u32>()
                            .map(|n| peer.persistent_keepalive = n)
                            .map_err(|_| Error::InvalidNumber(value.to_string())),
                        _ => Err(Error::UnknownField {
                            line,
                            field: field.clone(),
                        }),
                    }
                }
            };
            assigned.map_err(|e| e.at_line(line))?;
        }

        // Files without a trailing blank line still commit the last peer.
        wg.commit(building.take());
        wg.allocated = wg.peers.len() as u64;
        Ok(wg)
    }
}

impl fmt::Display for Wg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.interface)?;
        for peer in self.peers.values() {
            write!(f, "\n{}", peer)?;
        }
        Ok(())
    }
}
