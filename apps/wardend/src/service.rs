use std::process::Output;
use std::time::Duration;

use anyhow::{Context, Result};
use sysinfo::{Disks, System};
use tokio::process::Command;
use tokio::time::{sleep, timeout};
use tracing::warn;

use warden_core::proto::ServiceHealth;

use crate::context::Ctx;

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

async fn systemctl(verb: &str, unit: &str) -> Result<Output> {
    Command::new("systemctl")
        .arg(verb)
        .arg(unit)
        .output()
        .await
        .with_context(|| format!("failed to run systemctl {verb} {unit}"))
}

pub fn parse_health(raw: &str) -> ServiceHealth {
    match raw.trim() {
        "active" => ServiceHealth::Running,
        "inactive" => ServiceHealth::Stopped,
        other => ServiceHealth::Unknown(other.to_string()),
    }
}

pub async fn status(unit: &str) -> ServiceHealth {
    match systemctl("is-active", unit).await {
        Ok(output) => parse_health(&String::from_utf8_lossy(&output.stdout)),
        Err(err) => ServiceHealth::Unknown(err.to_string()),
    }
}

pub async fn start(ctx: &Ctx) -> Result<()> {
    let output = systemctl("start", &ctx.config.service_unit).await?;
    ensure_ok("start", output)
}

/// Stop with an in-game heads-up first. The warning is best effort; the
/// stop happens regardless.
pub async fn stop(ctx: &Ctx) -> Result<()> {
    broadcast_warning(ctx, "server is stopping").await;
    sleep(Duration::from_secs(ctx.config.stop_grace_secs)).await;
    let output = systemctl("stop", &ctx.config.service_unit).await?;
    ensure_ok("stop", output)
}

pub async fn restart(ctx: &Ctx) -> Result<()> {
    broadcast_warning(ctx, "server is restarting").await;
    sleep(Duration::from_secs(ctx.config.stop_grace_secs)).await;
    let output = systemctl("restart", &ctx.config.service_unit).await?;
    ensure_ok("restart", output)
}

fn ensure_ok(verb: &str, output: Output) -> Result<()> {
    if output.status.success() {
        return Ok(());
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    anyhow::bail!("systemctl {verb} failed: {}", stderr.trim())
}

async fn broadcast_warning(ctx: &Ctx, what: &str) {
    let line = format!("say {} in {} seconds!", what, ctx.config.stop_grace_secs);
    if let Err(err) = ctx.console.send(&line).await {
        warn!("could not warn players: {err}");
    }
}

/// One-shot host and server report for the info command.
pub async fn info(ctx: &Ctx) -> String {
    let mut lines = Vec::new();

    lines.push(format!("server: {}", status(&ctx.config.service_unit).await));
    lines.push(format!("address: {}", ctx.config.server_address));

    match probe_output("uname", &["-r"]).await {
        Some(kernel) => lines.push(format!("kernel: {kernel}")),
        None => lines.push("kernel: unavailable".to_string()),
    }

    // Java prints its version on stderr.
    match probe("java", &["-version"]).await {
        Some(output) => {
            let text = if output.stderr.is_empty() {
                String::from_utf8_lossy(&output.stdout).to_string()
            } else {
                String::from_utf8_lossy(&output.stderr).to_string()
            };
            match text.lines().next() {
                Some(first) => lines.push(format!("java: {}", first.trim())),
                None => lines.push("java: unavailable".to_string()),
            }
        }
        None => lines.push("java: not found".to_string()),
    }

    let mut system = System::new();
    system.refresh_memory();
    lines.push(format!(
        "memory: {} used / {} total",
        gib(system.used_memory()),
        gib(system.total_memory())
    ));

    if let Some((total, available)) = disk_for(&ctx.config.server_dir) {
        lines.push(format!(
            "disk: {} free / {} total",
            gib(available),
            gib(total)
        ));
    }

    lines.push(format!(
        "allow-list entries: {}",
        ctx.allowlist.load().await.len()
    ));

    lines.join("\n")
}

async fn probe(program: &str, args: &[&str]) -> Option<Output> {
    let result = timeout(PROBE_TIMEOUT, Command::new(program).args(args).output()).await;
    match result {
        Ok(Ok(output)) => Some(output),
        _ => None,
    }
}

async fn probe_output(program: &str, args: &[&str]) -> Option<String> {
    let output = probe(program, args).await?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Figures for the filesystem that holds the server directory: the disk
/// with the longest mount point prefix wins.
fn disk_for(path: &std::path::Path) -> Option<(u64, u64)> {
    let disks = Disks::new_with_refreshed_list();
    disks
        .iter()
        .filter(|disk| path.starts_with(disk.mount_point()))
        .max_by_key(|disk| disk.mount_point().as_os_str().len())
        .map(|disk| (disk.total_space(), disk.available_space()))
}

fn gib(bytes: u64) -> String {
    format!("{:.1} GiB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
}
