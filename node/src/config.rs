//! Layered node configuration loading (§4.10 AMBIENT, §6).
//!
//! The donor workspace's `main.rs` never needed a config loader — it
//! hardcoded `ChainConfig::default()` — so this layering is grounded
//! instead on the general "defaults, then file, then environment"
//! convention the wider reference pack converges on. Three layers, in
//! increasing priority: [`NodeConfig::default`], an optional TOML file
//! (`POD_CONFIG_FILE`, default `pod-node.toml` if present), then
//! `POD_`-prefixed environment variables.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use pod_core::config::NodeConfig;

/// A partial, file/env-sourced configuration overlay. Every field is
/// optional so a TOML file or the environment may set only the options
/// it cares about; everything else falls back to [`NodeConfig::default`].
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ConfigOverlay {
    host: Option<String>,
    port: Option<u16>,
    roam_subnet_base: Option<String>,
    roam_ports: Option<Vec<u16>>,
    roam_interval_seconds: Option<u64>,
    announce_interval_seconds: Option<u64>,
    hmac_secret: Option<String>,
    hmac_tolerance_seconds: Option<i64>,
    db_dir: Option<String>,
    ledger_file: Option<String>,
    mempool_file: Option<String>,
    db_file: Option<String>,
    state_file: Option<String>,
    api_listen_addr: Option<String>,
    metrics_enabled: Option<bool>,
    metrics_listen_addr: Option<String>,
    pod_k: Option<u64>,
    pod_base_difficulty: Option<u32>,
}

/// Loads a [`NodeConfig`] by layering defaults, an optional TOML file,
/// and `POD_`-prefixed environment variable overrides, in that priority
/// order (later layers win).
pub fn load() -> NodeConfig {
    let mut config = NodeConfig::default();

    if let Some(overlay) = read_file_overlay() {
        apply(&mut config, overlay);
    }
    apply(&mut config, read_env_overlay());

    config
}

fn read_file_overlay() -> Option<ConfigOverlay> {
    let path = std::env::var("POD_CONFIG_FILE").unwrap_or_else(|_| "pod-node.toml".to_string());
    read_file_overlay_at(Path::new(&path))
}

fn read_file_overlay_at(path: &Path) -> Option<ConfigOverlay> {
    let contents = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&contents) {
        Ok(overlay) => Some(overlay),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring malformed config file");
            None
        }
    }
}

/// Reads `POD_`-prefixed environment variables into a [`ConfigOverlay`].
///
/// Unlike the file layer, malformed individual values (a non-numeric
/// `POD_PORT`, say) are simply skipped rather than failing the whole
/// overlay, since environment variables are typically set one at a time.
fn read_env_overlay() -> ConfigOverlay {
    ConfigOverlay {
        host: env_string("POD_HOST"),
        port: env_parsed("POD_PORT"),
        roam_subnet_base: env_string("POD_ROAM_SUBNET_BASE"),
        roam_ports: env_string("POD_ROAM_PORTS").map(|raw| {
            raw.split(',')
                .filter_map(|p| p.trim().parse::<u16>().ok())
                .collect()
        }),
        roam_interval_seconds: env_parsed("POD_ROAM_INTERVAL_SECONDS"),
        announce_interval_seconds: env_parsed("POD_ANNOUNCE_INTERVAL_SECONDS"),
        hmac_secret: env_string("POD_HMAC_SECRET"),
        hmac_tolerance_seconds: env_parsed("POD_HMAC_TOLERANCE_SECONDS"),
        db_dir: env_string("POD_DB_DIR"),
        ledger_file: env_string("POD_LEDGER_FILE"),
        mempool_file: env_string("POD_MEMPOOL_FILE"),
        db_file: env_string("POD_DB_FILE"),
        state_file: env_string("POD_STATE_FILE"),
        api_listen_addr: env_string("POD_API_LISTEN_ADDR"),
        metrics_enabled: env_parsed("POD_METRICS_ENABLED"),
        metrics_listen_addr: env_string("POD_METRICS_LISTEN_ADDR"),
        pod_k: env_parsed("POD_POD_K"),
        pod_base_difficulty: env_parsed("POD_POD_BASE_DIFFICULTY"),
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn env_parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

fn apply(config: &mut NodeConfig, overlay: ConfigOverlay) {
    if let Some(host) = overlay.host {
        config.host = host;
    }
    if let Some(port) = overlay.port {
        config.port = port;
    }
    if let Some(subnet_base) = overlay.roam_subnet_base {
        config.roam.subnet_base = subnet_base;
    }
    if let Some(ports) = overlay.roam_ports {
        config.roam.ports = ports;
    }
    if let Some(interval) = overlay.roam_interval_seconds {
        config.roam.interval_secs = interval;
    }
    if let Some(interval) = overlay.announce_interval_seconds {
        config.roam.announce_interval_secs = interval;
    }
    if let Some(secret) = overlay.hmac_secret {
        config.hmac.secret = secret;
    }
    if let Some(tolerance) = overlay.hmac_tolerance_seconds {
        config.hmac.tolerance_secs = tolerance;
    }

    let db_dir: PathBuf = overlay.db_dir.map(PathBuf::from).unwrap_or_else(|| {
        config
            .ledger
            .ledger_path
            .parent()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("db"))
    });

    if let Some(ledger_file) = overlay.ledger_file {
        config.ledger.ledger_path = db_dir.join(ledger_file);
    }
    if let Some(mempool_file) = overlay.mempool_file {
        config.ledger.mempool_path = db_dir.join(mempool_file);
    }
    if let Some(db_file) = overlay.db_file {
        config.peers.db_path = db_dir.join(db_file);
    }
    if let Some(state_file) = overlay.state_file {
        config.state_file = db_dir.join(state_file);
    }

    if let Some(addr) = overlay
        .api_listen_addr
        .and_then(|a| a.parse::<SocketAddr>().ok())
    {
        config.api.listen_addr = addr;
    }
    if let Some(enabled) = overlay.metrics_enabled {
        config.metrics.enabled = enabled;
    }
    if let Some(addr) = overlay
        .metrics_listen_addr
        .and_then(|a| a.parse::<SocketAddr>().ok())
    {
        config.metrics.listen_addr = addr;
    }
    if let Some(k) = overlay.pod_k {
        config.pod.k = k;
    }
    if let Some(base_difficulty) = overlay.pod_base_difficulty {
        config.pod.base_difficulty = base_difficulty;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_overlay_applies_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pod-node.toml");
        std::fs::write(&path, "host = \"10.0.0.9\"\nport = 9000\n").unwrap();

        let mut config = NodeConfig::default();
        let overlay = read_file_overlay_at(&path).expect("valid TOML should parse");
        apply(&mut config, overlay);

        assert_eq!(config.host, "10.0.0.9");
        assert_eq!(config.port, 9000);
    }

    #[test]
    fn malformed_file_overlay_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pod-node.toml");
        std::fs::write(&path, "not = [valid").unwrap();

        assert!(read_file_overlay_at(&path).is_none());
    }

    #[test]
    fn db_dir_override_relocates_sibling_paths() {
        let mut config = NodeConfig::default();
        let overlay = ConfigOverlay {
            db_dir: Some("/tmp/pod-db".to_string()),
            ledger_file: Some("ledger.data".to_string()),
            ..ConfigOverlay::default()
        };
        apply(&mut config, overlay);
        assert_eq!(
            config.ledger.ledger_path,
            PathBuf::from("/tmp/pod-db/ledger.data")
        );
    }
}
