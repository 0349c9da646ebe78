//! Peer store: the single get-or-create entry point for provisioning
//!
//! Allocation is ordinal and count-driven. Ordinal 0 of the pool is the
//! interface's own address and is never handed out; the n-th provisioned
//! peer gets ordinal n. Peers are never removed, so the counter only moves
//! forward and allocations never collide.

use crate::wg::addr::next_ip;
use crate::wg::conf::{Peer, Wg};
use crate::wg::key::Key;
use crate::wg::Error;

impl Wg {
    /// Look up a peer by public key, allocating a fresh host address inside
    /// the interface subnet for unknown keys.
    ///
    /// Idempotent: a known key returns the stored peer unchanged. A failed
    /// allocation inserts nothing. The caller must hold the aggregate's
    /// lock across the whole call so the count-read and the insert stay one
    /// critical section.
    pub fn get_or_create(&mut self, key: Key) -> Result<Peer, Error> {
        if let Some(peer) = self.peers.get(&key) {
            return Ok(peer.clone());
        }

        let (start, end) = self.interface.address.range();
        let addr = next_ip(&start, &end, u128::from(self.allocated) + 1)?;

        let peer = Peer {
            public_key: key,
            allowed_ips: addr.into(),
            ..Peer::default()
        };
        self.peers.insert(key, peer.clone());
        self.allocated += 1;
        Ok(peer)
    }

    pub fn peers(&self) -> impl Iterator<Item = &Peer> {
        self.peers.values()
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }
}
