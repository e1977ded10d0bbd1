use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackupError {
    #[error("world directory not found: {}", .0.display())]
    SourceMissing(PathBuf),

    #[error("failed to write archive: {0}")]
    ArchiveWrite(#[source] std::io::Error),

    #[error("could not compute a fire time for the requested schedule")]
    ScheduleCompute,

    #[error("invalid backup settings: {0}")]
    InvalidSettings(String),

    #[error("failed to persist backup settings: {0}")]
    Persist(#[source] std::io::Error),
}
