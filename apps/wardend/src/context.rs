use std::sync::Arc;

use warden_backup::{BackupPipeline, BackupScheduler};
use warden_rcon::RemoteConsole;

use crate::allowlist::AllowList;
use crate::config::DaemonConfig;

/// Everything the request handlers need, owned in one place. No ambient
/// singletons; the daemon builds exactly one of these at startup.
pub struct Ctx {
    pub config: DaemonConfig,
    pub pipeline: Arc<BackupPipeline>,
    pub scheduler: BackupScheduler,
    pub console: RemoteConsole,
    pub allowlist: AllowList,
    pub started_at_ms: u64,
}

pub type SharedCtx = Arc<Ctx>;

pub fn now_millis() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
