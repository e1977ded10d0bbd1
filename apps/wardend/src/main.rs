use std::sync::Arc;

use anyhow::{Context as _, Result};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

use warden_backup::{BackupPipeline, BackupScheduler, BackupSink, HttpSink, SettingsStore};
use warden_ipc::{paths, socket};
use warden_rcon::RemoteConsole;

mod allowlist;
mod config;
mod context;
mod daemon;
mod dispatch;
mod lock;
mod logsrc;
mod service;

use context::{now_millis, Ctx};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = config::load()?;

    let runtime = paths::runtime_paths();
    paths::ensure_dir(&runtime.runtime_dir).context("failed to create runtime directory")?;

    // single-instance lock
    let _guard = match lock::acquire_lock(&runtime.lock_path) {
        Ok(guard) => guard,
        Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
            warn!("wardend already running (lock held), exiting");
            return Ok(());
        }
        Err(err) => return Err(err).context("failed to acquire instance lock"),
    };

    let socket_path = config
        .socket_path
        .clone()
        .unwrap_or_else(|| runtime.socket_path.clone());
    if socket_path.exists() {
        if socket::socket_alive(&socket_path).await {
            warn!("wardend already running (socket alive), exiting");
            return Ok(());
        }
        socket::remove_stale_socket(&socket_path).context("failed to remove stale socket")?;
    }

    let backup_dir = config.backup_dir()?;
    tokio::fs::create_dir_all(&backup_dir)
        .await
        .context("failed to create backup directory")?;

    let sink: Option<Arc<dyn BackupSink>> = match &config.sink {
        Some(sink_config) => {
            let endpoint = Url::parse(&sink_config.endpoint)
                .context("invalid sink endpoint in config")?;
            Some(Arc::new(HttpSink::new(endpoint, sink_config.token.clone())?))
        }
        None => None,
    };

    let pipeline = Arc::new(BackupPipeline::new(
        config.world_dir(),
        backup_dir,
        sink,
    ));
    let store = SettingsStore::new(config.settings_path()?);
    let scheduler = BackupScheduler::new(Arc::clone(&pipeline), store);
    scheduler.start().await;

    let console = RemoteConsole::new(config.server_dir.clone(), config.command_journal_path()?);
    let allowlist = allowlist::AllowList::new(config.whitelist_path());

    let ctx = Arc::new(Ctx {
        config,
        pipeline,
        scheduler,
        console,
        allowlist,
        started_at_ms: now_millis(),
    });

    let listener = socket::bind(&socket_path)
        .await
        .with_context(|| format!("failed to bind {}", socket_path.display()))?;
    info!("wardend listening at {}", socket_path.display());

    tokio::select! {
        result = daemon::serve(listener, Arc::clone(&ctx)) => {
            result.context("daemon loop failed")?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted, disarming scheduler");
            ctx.scheduler.shutdown().await;
        }
    }

    Ok(())
}
