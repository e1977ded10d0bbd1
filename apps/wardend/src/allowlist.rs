use std::path::PathBuf;

use anyhow::{Context, Result};
use tokio::fs;
use tracing::warn;

use warden_core::proto::AllowListEntry;

/// The server's `whitelist.json`, kept in the game's own on-disk format so
/// the server can reload it directly. Name uniqueness is enforced here, in
/// the mutation paths, not by the file.
pub struct AllowList {
    path: PathBuf,
}

impl AllowList {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// A missing or unreadable file reads as empty; the next save recreates
    /// it.
    pub async fn load(&self) -> Vec<AllowListEntry> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(value) => value,
            Err(_) => return Vec::new(),
        };
        match serde_json::from_str(&content) {
            Ok(entries) => entries,
            Err(err) => {
                warn!("unreadable allow-list at {}: {err}", self.path.display());
                Vec::new()
            }
        }
    }

    pub async fn save(&self, entries: &[AllowListEntry]) -> Result<()> {
        let content = serde_json::to_string_pretty(entries)
            .context("failed to serialize allow-list")?;
        fs::write(&self.path, content)
            .await
            .with_context(|| format!("failed to write {}", self.path.display()))?;
        Ok(())
    }

    /// `Ok(false)` when the name is already present.
    pub async fn add(&self, name: &str) -> Result<bool> {
        let mut entries = self.load().await;
        if entries.iter().any(|entry| entry.name == name) {
            return Ok(false);
        }
        entries.push(AllowListEntry {
            uuid: String::new(),
            name: name.to_string(),
        });
        self.save(&entries).await?;
        Ok(true)
    }

    /// `Ok(false)` when no entry had that name.
    pub async fn remove(&self, name: &str) -> Result<bool> {
        let entries = self.load().await;
        let remaining: Vec<AllowListEntry> = entries
            .iter()
            .filter(|entry| entry.name != name)
            .cloned()
            .collect();
        if remaining.len() == entries.len() {
            return Ok(false);
        }
        self.save(&remaining).await?;
        Ok(true)
    }
}
