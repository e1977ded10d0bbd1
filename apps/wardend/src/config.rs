use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Daemon configuration, read once at startup from `warden.toml`.
///
/// ```toml
/// admin_id = 123456789
/// server_dir = "/srv/minecraft"
/// service_unit = "minecraft-forge.service"
/// server_address = "203.0.113.7:25565"
///
/// [sink]
/// endpoint = "https://backups.example.org/upload"
/// token = "..."
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct DaemonConfig {
    /// The one identity allowed to talk to this daemon.
    pub admin_id: i64,
    /// Root of the managed server installation (contains `world/`,
    /// `whitelist.json`, `server.properties`, `logs/`).
    pub server_dir: PathBuf,
    #[serde(default = "default_service_unit")]
    pub service_unit: String,
    #[serde(default)]
    pub backup_dir: Option<PathBuf>,
    #[serde(default = "default_server_address")]
    pub server_address: String,
    /// Seconds between the in-game warning and an actual stop/restart.
    #[serde(default = "default_stop_grace_secs")]
    pub stop_grace_secs: u64,
    #[serde(default)]
    pub socket_path: Option<PathBuf>,
    #[serde(default)]
    pub sink: Option<SinkConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SinkConfig {
    pub endpoint: String,
    #[serde(default)]
    pub token: Option<String>,
}

impl DaemonConfig {
    pub fn world_dir(&self) -> PathBuf {
        self.server_dir.join("world")
    }

    pub fn whitelist_path(&self) -> PathBuf {
        self.server_dir.join("whitelist.json")
    }

    pub fn backup_dir(&self) -> Result<PathBuf> {
        match &self.backup_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(data_dir()?.join("backups")),
        }
    }

    pub fn settings_path(&self) -> Result<PathBuf> {
        Ok(data_dir()?.join("backup_settings.json"))
    }

    pub fn command_journal_path(&self) -> Result<PathBuf> {
        Ok(data_dir()?.join("server_commands.log"))
    }
}

pub fn load() -> Result<DaemonConfig> {
    let path = match std::env::var_os("WARDEN_CONFIG") {
        Some(value) => PathBuf::from(value),
        None => config_dir()?.join("warden.toml"),
    };
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config at {}", path.display()))?;
    let config: DaemonConfig = toml::from_str(&content)
        .with_context(|| format!("failed to parse config at {}", path.display()))?;
    Ok(config)
}

fn config_dir() -> Result<PathBuf> {
    if let Some(base) = dirs::config_dir() {
        return Ok(base.join("warden"));
    }
    if let Some(home) = dirs::home_dir() {
        return Ok(home.join(".warden"));
    }
    anyhow::bail!("unable to resolve a config directory")
}

pub fn data_dir() -> Result<PathBuf> {
    if let Some(base) = dirs::data_dir() {
        return Ok(base.join("warden"));
    }
    if let Some(home) = dirs::home_dir() {
        return Ok(home.join(".warden"));
    }
    anyhow::bail!("unable to resolve a writable data directory")
}

fn default_service_unit() -> String {
    "minecraft-forge.service".to_string()
}

fn default_server_address() -> String {
    "127.0.0.1:25565".to_string()
}

fn default_stop_grace_secs() -> u64 {
    10
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_fills_in_defaults() {
        let config: DaemonConfig = toml::from_str(
            r#"
            admin_id = 42
            server_dir = "/srv/minecraft"
            "#,
        )
        .unwrap();

        assert_eq!(config.admin_id, 42);
        assert_eq!(config.service_unit, "minecraft-forge.service");
        assert_eq!(config.stop_grace_secs, 10);
        assert!(config.sink.is_none());
        assert_eq!(config.world_dir(), PathBuf::from("/srv/minecraft/world"));
    }

    #[test]
    fn sink_section_is_optional_but_parsed() {
        let config: DaemonConfig = toml::from_str(
            r#"
            admin_id = 42
            server_dir = "/srv/minecraft"
            backup_dir = "/var/backups/world"

            [sink]
            endpoint = "https://backups.example.org/upload"
            token = "secret"
            "#,
        )
        .unwrap();

        let sink = config.sink.as_ref().unwrap();
        assert_eq!(sink.endpoint, "https://backups.example.org/upload");
        assert_eq!(sink.token.as_deref(), Some("secret"));
        assert_eq!(
            config.backup_dir().unwrap(),
            PathBuf::from("/var/backups/world")
        );
    }
}
