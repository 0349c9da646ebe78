//! Device push module
//!
//! Feeds a freshly provisioned peer into a running WireGuard device by
//! writing its `[Peer]` block to a temp file and calling
//! `wg addconf <dev> <file>`. Nothing here touches the kernel directly.

use std::path::PathBuf;

use tokio::fs;
use tokio::process::Command;

use crate::wg::conf::Peer;

/// Append one peer to a running device. The device keeps its existing
/// interface settings; only the peer block is written.
pub async fn apply_peer(dev: &str, peer: &Peer) -> anyhow::Result<()> {
    let path = temp_conf_path(dev);
    fs::write(&path, peer.to_string()).await?;

    let status = Command::new("wg")
        .arg("addconf")
        .arg(dev)
        .arg(&path)
        .status()
        .await;

    let _ = fs::remove_file(&path).await;

    let status = status?;
    anyhow::ensure!(status.success(), "wg addconf {} exited with {}", dev, status);
    tracing::debug!("Pushed peer {} to device {}", peer.public_key, dev);
    Ok(())
}

fn temp_conf_path(dev: &str) -> PathBuf {
    let nonce: u32 = rand::random();
    std::env::temp_dir().join(format!("wg-peer-{}-{:08x}.conf", dev, nonce))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_paths_are_unique() {
        assert_ne!(temp_conf_path("wg0"), temp_conf_path("wg0"));
    }

    #[test]
    fn test_missing_binary_is_an_error() {
        let peer = Peer::default();
        let result = tokio_test::block_on(apply_peer("no-such-device", &peer));
        // Either `wg` is absent or the device is; both must surface as Err
        assert!(result.is_err());
    }
}
