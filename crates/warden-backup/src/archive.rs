use std::fs::File;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use flate2::write::GzEncoder;
use flate2::Compression;
use tokio::task;

use crate::error::BackupError;

pub const ARTIFACT_PREFIX: &str = "world_backup_";
pub const ARTIFACT_SUFFIX: &str = ".tar.gz";

/// The root directory name inside every archive, independent of where the
/// world actually lives on disk.
const ARCHIVE_ROOT: &str = "world";

#[derive(Debug, Clone)]
pub struct BackupArtifact {
    pub path: PathBuf,
    pub created_at: DateTime<Local>,
    pub size: u64,
}

pub fn artifact_name(at: DateTime<Local>) -> String {
    format!(
        "{ARTIFACT_PREFIX}{}{ARTIFACT_SUFFIX}",
        at.format("%Y%m%d_%H%M%S")
    )
}

pub fn is_artifact_name(name: &str) -> bool {
    name.starts_with(ARTIFACT_PREFIX) && name.ends_with(ARTIFACT_SUFFIX)
}

/// Archive the full recursive contents of `source_dir` into a timestamped
/// tar.gz under `backup_dir`. The archive is written under a `.partial`
/// name and renamed into place on success, so a crash or I/O failure never
/// leaves a valid-looking artifact behind. `source_dir` is never mutated.
pub async fn build(source_dir: &Path, backup_dir: &Path) -> Result<BackupArtifact, BackupError> {
    if !source_dir.exists() {
        return Err(BackupError::SourceMissing(source_dir.to_path_buf()));
    }
    tokio::fs::create_dir_all(backup_dir)
        .await
        .map_err(BackupError::ArchiveWrite)?;

    let created_at = Local::now();
    let final_path = backup_dir.join(artifact_name(created_at));
    let partial_path = backup_dir.join(format!("{}.partial", artifact_name(created_at)));

    let source = source_dir.to_path_buf();
    let partial = partial_path.clone();
    let target = final_path.clone();
    let result = task::spawn_blocking(move || -> std::io::Result<()> {
        let file = File::create(&partial)?;
        let encoder = GzEncoder::new(file, Compression::default());
        let mut builder = tar::Builder::new(encoder);
        builder.append_dir_all(ARCHIVE_ROOT, &source)?;
        let encoder = builder.into_inner()?;
        let file = encoder.finish()?;
        file.sync_all()?;
        std::fs::rename(&partial, &target)?;
        Ok(())
    })
    .await
    .map_err(|err| BackupError::ArchiveWrite(std::io::Error::other(err)))?;

    if let Err(err) = result {
        // Don't leave a truncated tarball lying around.
        let _ = std::fs::remove_file(&partial_path);
        return Err(BackupError::ArchiveWrite(err));
    }

    let size = tokio::fs::metadata(&final_path)
        .await
        .map_err(BackupError::ArchiveWrite)?
        .len();

    Ok(BackupArtifact {
        path: final_path,
        created_at,
        size,
    })
}
