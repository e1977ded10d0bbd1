use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

use warden_core::proto::{Reply, ReplyEnvelope, Request, RequestEnvelope, RequesterId};
use warden_ipc::{framing, paths, socket};

/// Send one request and wait for its reply.
pub async fn roundtrip(requester: RequesterId, request: Request) -> Result<Reply> {
    let socket_path = socket_path();
    let stream = socket::connect(&socket_path).await.with_context(|| {
        format!(
            "could not reach wardend at {} (is it running?)",
            socket_path.display()
        )
    })?;
    let mut framed = framing::framed(stream);

    let envelope = RequestEnvelope {
        id: 1,
        requester,
        payload: request,
    };
    framing::send_request(&mut framed, &envelope).await?;
    let ReplyEnvelope { payload, .. } = framing::read_reply(&mut framed).await?;
    Ok(payload)
}

fn socket_path() -> PathBuf {
    if let Some(path) = std::env::var_os("WARDEN_SOCKET") {
        return PathBuf::from(path);
    }
    paths::runtime_paths().socket_path
}

/// Which identity to speak as: explicit flag, then environment, then the
/// admin id from the daemon's own config file. The daemon still decides
/// whether that identity is allowed anything.
pub fn resolve_requester(flag: Option<RequesterId>) -> Result<RequesterId> {
    if let Some(id) = flag {
        return Ok(id);
    }
    if let Ok(value) = std::env::var("WARDEN_REQUESTER_ID") {
        return value
            .parse()
            .context("WARDEN_REQUESTER_ID is not a number");
    }
    if let Some(id) = admin_id_from_config() {
        return Ok(id);
    }
    anyhow::bail!("no requester identity; pass --requester or set WARDEN_REQUESTER_ID")
}

#[derive(Deserialize)]
struct PartialConfig {
    admin_id: RequesterId,
}

fn admin_id_from_config() -> Option<RequesterId> {
    let path = match std::env::var_os("WARDEN_CONFIG") {
        Some(value) => PathBuf::from(value),
        None => dirs::config_dir()?.join("warden").join("warden.toml"),
    };
    let content = std::fs::read_to_string(path).ok()?;
    let config: PartialConfig = toml::from_str(&content).ok()?;
    Some(config.admin_id)
}
