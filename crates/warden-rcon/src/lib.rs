//! Remote console access to the managed game server.
//!
//! RCON settings are discovered from the server's own `server.properties`
//! rather than duplicated in daemon config. When RCON is disabled or
//! unreachable, commands degrade to an append-only journal on the daemon
//! host and the caller is told the command was only recorded.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use minecraft_client_rs::Client;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::task::spawn_blocking;
use tracing::warn;

pub struct RconSettings {
    pub address: String,
    pub password: String,
}

/// Parse RCON settings out of `server_dir/server.properties`. `Ok(None)`
/// when the file is absent or RCON is not enabled there.
pub async fn discover_rcon(server_dir: &Path) -> Result<Option<RconSettings>> {
    let properties_path = server_dir.join("server.properties");
    let content = match fs::read_to_string(&properties_path).await {
        Ok(value) => value,
        Err(_) => return Ok(None),
    };

    let mut enabled = false;
    let mut port: Option<u16> = None;
    let mut password: Option<String> = None;

    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let Some((key, value)) = trimmed.split_once('=') else {
            continue;
        };
        match key.trim() {
            "enable-rcon" => enabled = value.trim().eq_ignore_ascii_case("true"),
            "rcon.port" => port = value.trim().parse::<u16>().ok(),
            "rcon.password" => {
                let val = value.trim();
                if !val.is_empty() {
                    password = Some(val.to_string());
                }
            }
            _ => {}
        }
    }

    if !enabled {
        return Ok(None);
    }
    let Some(password) = password else {
        return Ok(None);
    };

    let address = format!("127.0.0.1:{}", port.unwrap_or(25575));
    Ok(Some(RconSettings { address, password }))
}

pub struct RconClient {
    address: String,
    password: String,
}

impl RconClient {
    pub fn new(address: String, password: String) -> Self {
        Self { address, password }
    }

    pub async fn execute(&self, command: &str) -> Result<String> {
        let address = self.address.clone();
        let password = self.password.clone();
        let command = command.to_string();

        // minecraft-client-rs is a blocking client.
        spawn_blocking(move || {
            let mut client =
                Client::new(address).map_err(|err| anyhow::anyhow!(err.to_string()))?;
            client
                .authenticate(password)
                .map_err(|err| anyhow::anyhow!(err.to_string()))?;
            let response = client
                .send_command(command)
                .map_err(|err| anyhow::anyhow!(err.to_string()))?;
            client
                .close()
                .map_err(|err| anyhow::anyhow!(err.to_string()))?;
            Ok::<_, anyhow::Error>(response.body)
        })
        .await
        .with_context(|| "RCON task failed")?
    }
}

/// What happened to a command handed to [`RemoteConsole::send`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Reached the server over RCON; carries the server's response text.
    Executed(String),
    /// RCON unavailable; the command sits in the local journal instead.
    Recorded,
}

pub struct RemoteConsole {
    server_dir: PathBuf,
    journal_path: PathBuf,
}

impl RemoteConsole {
    pub fn new(server_dir: PathBuf, journal_path: PathBuf) -> Self {
        Self {
            server_dir,
            journal_path,
        }
    }

    /// Relay one command line to the server. The line is passed through
    /// untouched. Errs only when even the journal cannot be written.
    pub async fn send(&self, command: &str) -> Result<Delivery> {
        match discover_rcon(&self.server_dir).await {
            Ok(Some(settings)) => {
                let client = RconClient::new(settings.address, settings.password);
                match client.execute(command).await {
                    Ok(response) => return Ok(Delivery::Executed(response)),
                    Err(err) => {
                        warn!("rcon delivery failed, recording command instead: {err}");
                    }
                }
            }
            Ok(None) => {}
            Err(err) => {
                warn!("rcon discovery failed, recording command instead: {err}");
            }
        }

        self.record(command).await?;
        Ok(Delivery::Recorded)
    }

    async fn record(&self, command: &str) -> Result<()> {
        if let Some(parent) = self.journal_path.parent() {
            fs::create_dir_all(parent)
                .await
                .context("failed to create command journal directory")?;
        }
        let line = format!("{} {}\n", Local::now().format("%Y-%m-%d %H:%M:%S"), command);
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.journal_path)
            .await
            .context("failed to open command journal")?;
        file.write_all(line.as_bytes())
            .await
            .context("failed to append to command journal")?;
        Ok(())
    }
}
