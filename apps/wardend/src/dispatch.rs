use tracing::warn;

use warden_backup::BackupError;
use warden_core::proto::{
    CommandDelivery, ErrorCode, Reply, ReplyEnvelope, Request, RequestEnvelope, RequesterId,
    RpcError,
};
use warden_rcon::Delivery;

use crate::context::{now_millis, Ctx};
use crate::{logsrc, service};

/// Single-admin check: exact equality, nothing else. Applies to every
/// operation, mutating or not.
pub fn authorize(requester: RequesterId, admin_id: RequesterId) -> bool {
    requester == admin_id
}

/// Decode-once boundary: authorization first, then an exhaustive match over
/// the request enum. Unauthorized requests get the same empty rejection no
/// matter what they asked for.
pub async fn handle(env: RequestEnvelope, ctx: &Ctx) -> ReplyEnvelope {
    if !authorize(env.requester, ctx.config.admin_id) {
        warn!("rejected request from {}", env.requester);
        return ReplyEnvelope {
            id: env.id,
            payload: Reply::Error(RpcError::unauthorized()),
        };
    }
    ReplyEnvelope {
        id: env.id,
        payload: dispatch(env.payload, ctx).await,
    }
}

async fn dispatch(request: Request, ctx: &Ctx) -> Reply {
    match request {
        Request::Ping {} => Reply::Pong {
            daemon_version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_ms: now_millis().saturating_sub(ctx.started_at_ms),
        },
        Request::Shutdown {} => Reply::ShutdownAck {},

        Request::ServerStatus {} => Reply::Status {
            health: service::status(&ctx.config.service_unit).await,
        },
        Request::ServerInfo {} => Reply::Info {
            report: service::info(ctx).await,
        },
        Request::StartServer {} => match service::start(ctx).await {
            Ok(()) => Reply::Started {},
            Err(err) => control_error(err),
        },
        Request::StopServer {} => match service::stop(ctx).await {
            Ok(()) => Reply::Stopped {},
            Err(err) => control_error(err),
        },
        Request::RestartServer {} => match service::restart(ctx).await {
            Ok(()) => Reply::Restarted {},
            Err(err) => control_error(err),
        },

        Request::TailLogs { lines } => Reply::Logs {
            text: logsrc::tail(&ctx.config, lines).await,
        },

        Request::ShowAllowList {} => Reply::AllowList {
            entries: ctx.allowlist.load().await,
        },
        Request::AddPlayer { name } => add_player(ctx, name).await,
        Request::RemovePlayer { name } => remove_player(ctx, name).await,

        Request::Exec { command } => relay(ctx, &command).await,
        Request::Say { text } => relay(ctx, &format!("say {text}")).await,

        Request::BackupNow {} => {
            let settings = ctx.scheduler.settings().await;
            Reply::BackupFinished {
                outcome: ctx.pipeline.run(&settings).await,
            }
        }
        Request::GetBackupSettings {} => {
            let (settings, next_fire) = ctx.scheduler.status().await;
            Reply::BackupSchedule {
                settings,
                next_fire: next_fire.map(|at| at.to_rfc3339()),
            }
        }
        Request::ConfigureBackups { settings } => match ctx.scheduler.configure(settings).await {
            Ok(next_fire) => {
                let (settings, _) = ctx.scheduler.status().await;
                Reply::BackupSchedule {
                    settings,
                    next_fire: next_fire.map(|at| at.to_rfc3339()),
                }
            }
            Err(err) => Reply::Error(backup_error(err)),
        },
    }
}

async fn add_player(ctx: &Ctx, name: String) -> Reply {
    let name = name.trim().to_string();
    if name.is_empty() {
        return Reply::Error(RpcError::new(ErrorCode::BadRequest, "player name is empty"));
    }
    match ctx.allowlist.add(&name).await {
        Ok(true) => {}
        Ok(false) => {
            return Reply::Error(RpcError::new(
                ErrorCode::BadRequest,
                format!("'{name}' is already on the allow-list"),
            ));
        }
        Err(err) => return Reply::Error(RpcError::new(ErrorCode::IoError, err.to_string())),
    }

    // Best effort: tell the running server too, then have it reload.
    let delivery = push_allowlist_change(ctx, &format!("whitelist add {name}")).await;
    Reply::PlayerAdded { name, delivery }
}

async fn remove_player(ctx: &Ctx, name: String) -> Reply {
    let name = name.trim().to_string();
    match ctx.allowlist.remove(&name).await {
        Ok(true) => {}
        Ok(false) => {
            return Reply::Error(RpcError::new(
                ErrorCode::BadRequest,
                format!("'{name}' is not on the allow-list"),
            ));
        }
        Err(err) => return Reply::Error(RpcError::new(ErrorCode::IoError, err.to_string())),
    }

    let delivery = push_allowlist_change(ctx, &format!("whitelist remove {name}")).await;
    Reply::PlayerRemoved { name, delivery }
}

async fn push_allowlist_change(ctx: &Ctx, command: &str) -> CommandDelivery {
    let delivery = match ctx.console.send(command).await {
        Ok(delivery) => delivery,
        Err(err) => {
            warn!("allow-list push failed: {err}");
            Delivery::Recorded
        }
    };
    if let Err(err) = ctx.console.send("whitelist reload").await {
        warn!("allow-list reload failed: {err}");
    }
    delivery_note(delivery)
}

/// Forward one opaque command line. The content is never interpreted or
/// sanitized here; delivery (or journal-only recording) is the console's
/// concern.
async fn relay(ctx: &Ctx, command: &str) -> Reply {
    match ctx.console.send(command).await {
        Ok(delivery) => Reply::CommandSent {
            delivery: delivery_note(delivery),
        },
        Err(err) => Reply::Error(RpcError::new(ErrorCode::IoError, err.to_string())),
    }
}

fn delivery_note(delivery: Delivery) -> CommandDelivery {
    match delivery {
        Delivery::Executed(response) => CommandDelivery::Executed { response },
        Delivery::Recorded => CommandDelivery::Recorded {},
    }
}

fn control_error(err: anyhow::Error) -> Reply {
    Reply::Error(RpcError::new(
        ErrorCode::ServiceControlFailed,
        err.to_string(),
    ))
}

fn backup_error(err: BackupError) -> RpcError {
    let code = match &err {
        BackupError::SourceMissing(_) => ErrorCode::SourceMissing,
        BackupError::ArchiveWrite(_) => ErrorCode::ArchiveWriteFailed,
        BackupError::ScheduleCompute => ErrorCode::ScheduleComputeFailed,
        BackupError::InvalidSettings(_) => ErrorCode::BadRequest,
        BackupError::Persist(_) => ErrorCode::IoError,
    };
    RpcError::new(code, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allowlist::AllowList;
    use crate::config::DaemonConfig;
    use std::path::Path;
    use std::sync::Arc;
    use warden_backup::{BackupPipeline, BackupScheduler, SettingsStore};
    use warden_core::proto::BackupSettings;
    use warden_rcon::RemoteConsole;

    const ADMIN: RequesterId = 424242;

    fn ctx(root: &Path) -> Ctx {
        let server_dir = root.join("server");
        std::fs::create_dir_all(&server_dir).unwrap();
        let config = DaemonConfig {
            admin_id: ADMIN,
            server_dir: server_dir.clone(),
            service_unit: "minecraft-forge.service".to_string(),
            backup_dir: Some(root.join("backups")),
            server_address: "127.0.0.1:25565".to_string(),
            stop_grace_secs: 0,
            socket_path: None,
            sink: None,
        };
        let pipeline = Arc::new(BackupPipeline::new(
            config.world_dir(),
            root.join("backups"),
            None,
        ));
        let scheduler = BackupScheduler::new(
            Arc::clone(&pipeline),
            SettingsStore::new(root.join("backup_settings.json")),
        );
        Ctx {
            allowlist: AllowList::new(config.whitelist_path()),
            console: RemoteConsole::new(server_dir, root.join("server_commands.log")),
            config,
            pipeline,
            scheduler,
            started_at_ms: now_millis(),
        }
    }

    fn envelope(requester: RequesterId, payload: Request) -> RequestEnvelope {
        RequestEnvelope {
            id: 1,
            requester,
            payload,
        }
    }

    #[test]
    fn authorize_is_exact_equality() {
        assert!(authorize(ADMIN, ADMIN));
        assert!(!authorize(0, ADMIN));
        assert!(!authorize(-1, ADMIN));
        assert!(!authorize(ADMIN + 1, ADMIN));
        assert!(!authorize(-ADMIN, ADMIN));
    }

    #[tokio::test]
    async fn unauthorized_requests_are_rejected_without_side_effects() {
        let tmp = tempfile::tempdir().unwrap();
        let ctx = ctx(tmp.path());

        let reply = handle(
            envelope(7, Request::AddPlayer { name: "intruder".to_string() }),
            &ctx,
        )
        .await;

        match reply.payload {
            Reply::Error(err) => assert_eq!(err.code, ErrorCode::Unauthorized),
            other => panic!("expected rejection, got {other:?}"),
        }
        assert!(!ctx.config.whitelist_path().exists());
        assert!(ctx.allowlist.load().await.is_empty());
    }

    #[tokio::test]
    async fn admin_can_mutate_the_allow_list() {
        let tmp = tempfile::tempdir().unwrap();
        let ctx = ctx(tmp.path());

        let reply = handle(
            envelope(ADMIN, Request::AddPlayer { name: "steve".to_string() }),
            &ctx,
        )
        .await;
        match reply.payload {
            Reply::PlayerAdded { name, delivery } => {
                assert_eq!(name, "steve");
                // No RCON in the test fixture, so the command is journaled.
                assert!(matches!(delivery, CommandDelivery::Recorded {}));
            }
            other => panic!("unexpected reply {other:?}"),
        }

        let reply = handle(
            envelope(ADMIN, Request::AddPlayer { name: "steve".to_string() }),
            &ctx,
        )
        .await;
        match reply.payload {
            Reply::Error(err) => assert_eq!(err.code, ErrorCode::BadRequest),
            other => panic!("duplicate should be rejected, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn relayed_commands_pass_through_untouched() {
        let tmp = tempfile::tempdir().unwrap();
        let ctx = ctx(tmp.path());

        let line = "give @a minecraft:cake 64  -- extra   spacing!";
        let reply = handle(envelope(ADMIN, Request::Exec { command: line.to_string() }), &ctx).await;
        assert!(matches!(
            reply.payload,
            Reply::CommandSent { delivery: CommandDelivery::Recorded {} }
        ));

        let journal =
            std::fs::read_to_string(tmp.path().join("server_commands.log")).unwrap();
        assert!(journal.lines().next().unwrap().ends_with(line));
    }

    #[tokio::test]
    async fn configure_round_trips_through_the_scheduler() {
        let tmp = tempfile::tempdir().unwrap();
        let ctx = ctx(tmp.path());

        let mut settings = BackupSettings::default();
        settings.enabled = true;
        let reply = handle(
            envelope(ADMIN, Request::ConfigureBackups { settings: settings.clone() }),
            &ctx,
        )
        .await;
        match reply.payload {
            Reply::BackupSchedule { settings: stored, next_fire } => {
                assert!(stored.enabled);
                assert!(next_fire.is_some());
                assert_eq!(stored, settings);
            }
            other => panic!("unexpected reply {other:?}"),
        }

        let mut bad = settings;
        bad.keep_count = 99;
        let reply = handle(envelope(ADMIN, Request::ConfigureBackups { settings: bad }), &ctx).await;
        match reply.payload {
            Reply::Error(err) => assert_eq!(err.code, ErrorCode::BadRequest),
            other => panic!("unexpected reply {other:?}"),
        }
    }

    #[tokio::test]
    async fn backup_now_reports_missing_world_as_failure() {
        let tmp = tempfile::tempdir().unwrap();
        let ctx = ctx(tmp.path());

        let reply = handle(envelope(ADMIN, Request::BackupNow {}), &ctx).await;
        match reply.payload {
            Reply::BackupFinished { outcome } => {
                assert!(!outcome.success);
                assert!(outcome.artifact.is_none());
            }
            other => panic!("unexpected reply {other:?}"),
        }
    }
}
