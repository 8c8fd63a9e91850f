/// Server configuration.
///
/// Loaded from a TOML file; every field has a default so a partial file is
/// fine. A path named on the command line must exist and parse. The
/// implicit `monitorsys.toml` is optional and a broken one only warns.
/// Command-line flags override the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use monitorsys_protocol::{DEFAULT_PORT, DEFAULT_TICK_INTERVAL_MS};

/// Config file looked up in the working directory when none is named
pub const DEFAULT_CONFIG_PATH: &str = "monitorsys.toml";

/// Shortest accepted broadcast period
const MIN_TICK_INTERVAL_MS: u64 = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen")]
    pub listen: String,
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// Per-subscriber queue depth before a client counts as lagging
    #[serde(default = "default_subscriber_buffer")]
    pub subscriber_buffer: usize,
    #[serde(default = "default_true")]
    pub gpu_enabled: bool,
    /// Prebuilt dashboard to serve (index.html + assets/)
    #[serde(default)]
    pub frontend_dir: Option<PathBuf>,
}

fn default_listen() -> String {
    format!("0.0.0.0:{}", DEFAULT_PORT)
}

fn default_tick_interval_ms() -> u64 {
    DEFAULT_TICK_INTERVAL_MS
}

fn default_subscriber_buffer() -> usize {
    16
}

fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            tick_interval_ms: default_tick_interval_ms(),
            subscriber_buffer: default_subscriber_buffer(),
            gpu_enabled: true,
            frontend_dir: None,
        }
    }
}

impl ServerConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(MIN_TICK_INTERVAL_MS))
    }

    pub fn subscriber_buffer(&self) -> usize {
        self.subscriber_buffer.max(1)
    }
}

/// Load a ServerConfig from a TOML file on disk.
pub fn load_config(path: impl AsRef<Path>) -> anyhow::Result<ServerConfig> {
    let contents = std::fs::read_to_string(path)?;
    let config: ServerConfig = toml::from_str(&contents)?;
    Ok(config)
}

/// Resolve the startup configuration.
///
/// `explicit` is the path given by `--config` / `MONITORSYS_CONFIG`; any
/// failure to read or parse it is returned. Without one, the default path
/// is tried and falls back to `ServerConfig::default()`.
pub fn resolve_config(explicit: Option<&Path>) -> anyhow::Result<ServerConfig> {
    resolve_config_at(explicit, Path::new(DEFAULT_CONFIG_PATH))
}

fn resolve_config_at(explicit: Option<&Path>, default_path: &Path) -> anyhow::Result<ServerConfig> {
    if let Some(path) = explicit {
        let config = load_config(path).with_context(|| format!("loading config {}", path.display()))?;
        info!(path = %path.display(), "Loaded configuration from disk");
        return Ok(config);
    }

    if !default_path.exists() {
        info!(path = %default_path.display(), "No config file found, using defaults");
        return Ok(ServerConfig::default());
    }

    match load_config(default_path) {
        Ok(config) => {
            info!(path = %default_path.display(), "Loaded configuration from disk");
            Ok(config)
        }
        Err(e) => {
            warn!(
                path = %default_path.display(),
                error = %e,
                "Failed to load config file (starting with defaults)"
            );
            Ok(ServerConfig::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config: ServerConfig = toml::from_str("").unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.listen, "0.0.0.0:8000");
        assert_eq!(config.tick_interval(), Duration::from_secs(1));
    }

    #[test]
    fn partial_file_overrides_some_fields() {
        let config: ServerConfig = toml::from_str(
            r#"
            listen = "127.0.0.1:9100"
            gpu_enabled = false
            frontend_dir = "/srv/dashboard"
            "#,
        )
        .unwrap();
        assert_eq!(config.listen, "127.0.0.1:9100");
        assert!(!config.gpu_enabled);
        assert_eq!(config.frontend_dir, Some(PathBuf::from("/srv/dashboard")));
        assert_eq!(config.subscriber_buffer, 16);
    }

    #[test]
    fn degenerate_values_are_clamped() {
        let config = ServerConfig {
            tick_interval_ms: 0,
            subscriber_buffer: 0,
            ..Default::default()
        };
        assert_eq!(config.tick_interval(), Duration::from_millis(100));
        assert_eq!(config.subscriber_buffer(), 1);
    }

    #[test]
    fn load_config_reads_file() {
        let path = std::env::temp_dir().join(format!("monitorsys-config-{}.toml", std::process::id()));
        std::fs::write(&path, "tick_interval_ms = 500\n").unwrap();
        let config = load_config(&path).unwrap();
        assert_eq!(config.tick_interval(), Duration::from_millis(500));
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn load_config_rejects_malformed_toml() {
        let path = std::env::temp_dir().join(format!("monitorsys-bad-{}.toml", std::process::id()));
        std::fs::write(&path, "tick_interval_ms = \"fast\"\n").unwrap();
        assert!(load_config(&path).is_err());
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn explicit_missing_config_is_an_error() {
        let path = std::env::temp_dir().join(format!("monitorsys-absent-{}.toml", std::process::id()));
        let _ = std::fs::remove_file(&path);
        let err = resolve_config(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("monitorsys-absent"));
    }

    #[test]
    fn explicit_malformed_config_is_an_error() {
        let path = std::env::temp_dir().join(format!("monitorsys-explicit-bad-{}.toml", std::process::id()));
        std::fs::write(&path, "listen = [\n").unwrap();
        assert!(resolve_config(Some(&path)).is_err());
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn explicit_config_is_loaded() {
        let path = std::env::temp_dir().join(format!("monitorsys-explicit-{}.toml", std::process::id()));
        std::fs::write(&path, "listen = \"127.0.0.1:9200\"\n").unwrap();
        let config = resolve_config(Some(&path)).unwrap();
        assert_eq!(config.listen, "127.0.0.1:9200");
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn implicit_config_missing_or_malformed_falls_back_to_defaults() {
        let path = std::env::temp_dir().join(format!("monitorsys-implicit-{}.toml", std::process::id()));
        let _ = std::fs::remove_file(&path);
        assert_eq!(resolve_config_at(None, &path).unwrap(), ServerConfig::default());

        std::fs::write(&path, "tick_interval_ms = \"fast\"\n").unwrap();
        assert_eq!(resolve_config_at(None, &path).unwrap(), ServerConfig::default());

        std::fs::write(&path, "tick_interval_ms = 250\n").unwrap();
        assert_eq!(resolve_config_at(None, &path).unwrap().tick_interval_ms, 250);
        std::fs::remove_file(&path).unwrap();
    }
}
