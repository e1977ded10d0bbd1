mod error;
mod rpc;
mod types;

pub use error::{ErrorCode, RpcError};
pub use rpc::{Reply, ReplyEnvelope, Request, RequestEnvelope};
pub use types::{
    AllowListEntry, BackupInterval, BackupOutcome, BackupSettings, CommandDelivery,
    InvalidSettings, RequestId, RequesterId, ServiceHealth, TimeOfDay, UnixMillis,
    KEEP_COUNT_MAX, KEEP_COUNT_MIN,
};
