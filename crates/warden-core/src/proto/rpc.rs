use serde::{Deserialize, Serialize};

use super::{
    AllowListEntry, BackupOutcome, BackupSettings, CommandDelivery, RequestId, RequesterId,
    RpcError, ServiceHealth, UnixMillis,
};

/// One inbound frame. Every request carries the identity of whoever issued
/// it; authorization happens before the payload is even looked at.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestEnvelope {
    pub id: RequestId,
    pub requester: RequesterId,
    pub payload: Request,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplyEnvelope {
    pub id: RequestId,
    pub payload: Reply,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Request {
    Ping {},
    Shutdown {},

    ServerStatus {},
    ServerInfo {},
    StartServer {},
    StopServer {},
    RestartServer {},

    TailLogs { lines: usize },

    ShowAllowList {},
    AddPlayer { name: String },
    RemovePlayer { name: String },

    Exec { command: String },
    Say { text: String },

    BackupNow {},
    GetBackupSettings {},
    ConfigureBackups { settings: BackupSettings },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Reply {
    Pong {
        daemon_version: String,
        uptime_ms: UnixMillis,
    },
    ShutdownAck {},

    Status {
        health: ServiceHealth,
    },
    Info {
        report: String,
    },
    Started {},
    Stopped {},
    Restarted {},

    Logs {
        text: String,
    },

    AllowList {
        entries: Vec<AllowListEntry>,
    },
    PlayerAdded {
        name: String,
        delivery: CommandDelivery,
    },
    PlayerRemoved {
        name: String,
        delivery: CommandDelivery,
    },

    CommandSent {
        delivery: CommandDelivery,
    },

    BackupFinished {
        outcome: BackupOutcome,
    },
    /// Current schedule plus the next fire time (RFC 3339), when armed.
    BackupSchedule {
        settings: BackupSettings,
        next_fire: Option<String>,
    },

    Error(RpcError),
}
