//! Configuration module

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub wg: WgConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Directory with the static landing page; `None` disables it.
    #[serde(default)]
    pub static_dir: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WgConfig {
    /// WireGuard device to push new peers into; `None` disables the push.
    #[serde(default)]
    pub device: Option<String>,
    #[serde(default = "default_conf_path")]
    pub conf_path: String,
    /// Endpoint clients are told to connect to.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: None,
        }
    }
}

impl Default for WgConfig {
    fn default() -> Self {
        Self {
            device: None,
            conf_path: default_conf_path(),
            endpoint: default_endpoint(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8888
}

fn default_conf_path() -> String {
    "/etc/wireguard/wg0.conf".to_string()
}

fn default_endpoint() -> String {
    "example.com:51820".to_string()
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::Environment::with_prefix("WGPROVD").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg: Config = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(cfg.server.host, "127.0.0.1");
        assert_eq!(cfg.server.port, 8888);
        assert_eq!(cfg.wg.conf_path, "/etc/wireguard/wg0.conf");
        assert_eq!(cfg.wg.endpoint, "example.com:51820");
        assert!(cfg.wg.device.is_none());
    }

    #[test]
    fn test_partial_override() {
        let cfg: Config = serde_json::from_value(serde_json::json!({
            "wg": { "device": "wg0", "endpoint": "vpn.example.com:51820" }
        }))
        .unwrap();
        assert_eq!(cfg.wg.device.as_deref(), Some("wg0"));
        assert_eq!(cfg.wg.endpoint, "vpn.example.com:51820");
        assert_eq!(cfg.server.port, 8888);
    }
}
