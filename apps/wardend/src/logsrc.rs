use std::path::Path;
use std::time::Duration;

use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

use crate::config::DaemonConfig;

/// Hard cap on what one tail request may return.
pub const MAX_TAIL_LINES: usize = 200;

const LOG_CMD_TIMEOUT: Duration = Duration::from_secs(10);

/// Alternate log files some server distributions write instead of
/// `logs/latest.log`.
const FALLBACK_LOGS: &[&str] = &["logs/debug.log", "server.log", "minecraft_server.log"];

/// Best-effort tail over every log source we know about, most useful
/// first. Never fails; when nothing is available the returned text explains
/// why instead.
pub async fn tail(config: &DaemonConfig, lines: usize) -> String {
    let lines = lines.clamp(1, MAX_TAIL_LINES);

    if let Some(text) = journal_tail(&config.service_unit, lines).await {
        return text;
    }

    if let Some(text) = file_tail(&config.server_dir.join("logs/latest.log"), lines).await {
        return text;
    }

    for rel in FALLBACK_LOGS {
        if let Some(text) = file_tail(&config.server_dir.join(rel), lines).await {
            return format!("logs from {rel}:\n{text}");
        }
    }

    if let Some(text) = service_status_tail(&config.service_unit, lines).await {
        return format!("service status:\n{text}");
    }

    "no logs found; the server may not have started yet, \
     or its log files are not readable from here"
        .to_string()
}

async fn journal_tail(unit: &str, lines: usize) -> Option<String> {
    let result = timeout(
        LOG_CMD_TIMEOUT,
        Command::new("journalctl")
            .args(["-u", unit, "-n", &lines.to_string(), "--no-pager"])
            .output(),
    )
    .await;

    let output = match result {
        Ok(Ok(output)) => output,
        other => {
            debug!("journalctl unavailable: {other:?}");
            return None;
        }
    };

    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if text.is_empty() || text.contains("-- No entries --") {
        return None;
    }
    Some(text)
}

async fn file_tail(path: &Path, lines: usize) -> Option<String> {
    // Server logs are not guaranteed to be valid UTF-8.
    let bytes = tokio::fs::read(path).await.ok()?;
    let content = String::from_utf8_lossy(&bytes);
    let text = tail_lines(&content, lines);
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

async fn service_status_tail(unit: &str, lines: usize) -> Option<String> {
    let shown = lines.min(20);
    let result = timeout(
        LOG_CMD_TIMEOUT,
        Command::new("systemctl")
            .args(["status", unit, "-n", &shown.to_string(), "--no-pager"])
            .output(),
    )
    .await;

    let output = match result {
        Ok(Ok(output)) => output,
        _ => return None,
    };

    // systemctl status exits 3 for an inactive unit; the output is still
    // worth showing.
    if !matches!(output.status.code(), Some(0) | Some(3)) {
        return None;
    }
    let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn tail_lines(content: &str, n: usize) -> String {
    let all: Vec<&str> = content.lines().collect();
    let start = all.len().saturating_sub(n);
    all[start..].join("\n")
}
