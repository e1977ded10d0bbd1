use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcError {
    pub code: ErrorCode,
    pub message: String,
}

impl RpcError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// The rejection every unauthorized request gets, regardless of what it
    /// asked for. Deliberately content-free.
    pub fn unauthorized() -> Self {
        Self::new(ErrorCode::Unauthorized, "access denied")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    Unauthorized,
    BadRequest,

    SourceMissing,
    ArchiveWriteFailed,
    UploadFailed,
    ScheduleComputeFailed,
    RemoteCommandUnavailable,

    ServiceControlFailed,
    IoError,
    Internal,
}
