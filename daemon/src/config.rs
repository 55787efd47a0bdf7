use log::warn;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::RwLock;
use warden_protocol::management::instance::ServerSettings;

use crate::auth::AuthConfig;
use crate::management::SupervisorOptions;
use crate::storage::file::{Config, FileIoWithBackup};

pub const CONFIG_FILE: &str = "server_config.json";

/// `server_config.json`: the server's launch settings plus the daemon's own knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    #[serde(flatten)]
    pub server: ServerSettings,
    pub web_host: IpAddr,
    pub web_port: u16,
    pub console_history_cap: usize,
    pub console_flush_every: usize,
    pub console_replay_limit: usize,
    pub telemetry_interval_ms: u64,
    pub tps_window_secs: u64,
    pub stop_grace_secs: u64,
    pub stop_term_secs: u64,
    pub auth: AuthConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            web_host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            web_port: 5000,
            console_history_cap: 1000,
            console_flush_every: 10,
            console_replay_limit: 100,
            telemetry_interval_ms: 2000,
            tps_window_secs: 60,
            stop_grace_secs: 30,
            stop_term_secs: 5,
            auth: AuthConfig::default(),
        }
    }
}

impl FileIoWithBackup for AppConfig {}

impl Config for AppConfig {
    type ConfigType = AppConfig;
}

impl AppConfig {
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.web_host, self.web_port)
    }

    pub fn telemetry_interval(&self) -> Duration {
        Duration::from_millis(self.telemetry_interval_ms)
    }

    pub fn supervisor_options(&self) -> SupervisorOptions {
        SupervisorOptions {
            history_capacity: self.console_history_cap.max(1),
            flush_every: self.console_flush_every.max(1),
            replay_limit: self.console_replay_limit,
            tps_window: Duration::from_secs(self.tps_window_secs),
            stop_grace: Duration::from_secs(self.stop_grace_secs),
            stop_term: Duration::from_secs(self.stop_term_secs),
        }
    }
}

/// The loaded config; settings changes are written back to the same file.
pub struct ConfigStore {
    path: Option<PathBuf>,
    current: RwLock<AppConfig>,
}

impl ConfigStore {
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        Self {
            current: RwLock::new(AppConfig::load_config_or_default(&path, AppConfig::default)),
            path: Some(path),
        }
    }

    #[cfg(test)]
    pub fn in_memory(config: AppConfig) -> Self {
        Self {
            path: None,
            current: RwLock::new(config),
        }
    }

    pub async fn snapshot(&self) -> AppConfig {
        self.current.read().await.clone()
    }

    pub async fn server_settings(&self) -> ServerSettings {
        self.current.read().await.server.clone()
    }

    /// Replaces the server settings, then persists the whole document. A failed
    /// write is logged; the in-memory settings stay authoritative.
    pub async fn update_server(&self, settings: ServerSettings) {
        let mut current = self.current.write().await;
        current.server = settings;
        if let Some(path) = &self.path {
            if let Err(err) = AppConfig::save_config(path, &*current) {
                warn!("could not save {}: {}", path.display(), err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_document_with_defaults() {
        let raw = r#"{ "serverJarPath": "server.jar", "webPort": 8080, "auth": { "jwtSecret": "s" } }"#;
        let config: AppConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(config.server.server_jar_path, "server.jar");
        assert_eq!(config.server.max_memory, "2G");
        assert_eq!(config.web_port, 8080);
        assert_eq!(config.stop_grace_secs, 30);
        assert_eq!(config.auth.jwt_secret, "s");
        assert_eq!(config.auth.session_ttl_secs, 86400);
        assert_eq!(config.bind_addr().to_string(), "0.0.0.0:8080");
    }

    #[tokio::test]
    async fn settings_update_is_written_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        let store = ConfigStore::load(&path);
        assert!(path.exists());

        let settings = ServerSettings {
            max_memory: "6G".into(),
            ..store.server_settings().await
        };
        store.update_server(settings).await;

        let saved = AppConfig::load_config(&path).unwrap();
        assert_eq!(saved.server.max_memory, "6G");
        assert_eq!(saved.auth.jwt_secret, store.snapshot().await.auth.jwt_secret);
        assert!(path.with_extension("bak").exists());
    }

    #[tokio::test]
    async fn failed_write_keeps_new_settings_in_memory() {
        let dir = tempfile::tempdir().unwrap();
        // a directory cannot be written as a file
        let store = ConfigStore::load(dir.path());

        let settings = ServerSettings {
            max_memory: "6G".into(),
            ..store.server_settings().await
        };
        store.update_server(settings).await;

        assert_eq!(store.server_settings().await.max_memory, "6G");
        assert!(dir.path().is_dir());
    }
}
