use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task;
use tracing::{info, warn};

use warden_core::proto::{BackupOutcome, BackupSettings};

use crate::archive::{self, BackupArtifact};
use crate::retention;
use crate::sink::BackupSink;

/// Archive -> retention -> best-effort upload, shared by the manual
/// "backup now" path and the scheduler. Every failure is contained in the
/// returned [`BackupOutcome`]; nothing propagates out of a scheduled run.
pub struct BackupPipeline {
    source_dir: PathBuf,
    backup_dir: PathBuf,
    sink: Option<Arc<dyn BackupSink>>,
    // Scheduled and manual runs must not write the backup directory at the
    // same time. Held for archive + retention, released before upload.
    dir_lock: Mutex<()>,
}

impl BackupPipeline {
    pub fn new(
        source_dir: PathBuf,
        backup_dir: PathBuf,
        sink: Option<Arc<dyn BackupSink>>,
    ) -> Self {
        Self {
            source_dir,
            backup_dir,
            sink,
            dir_lock: Mutex::new(()),
        }
    }

    pub async fn run(&self, settings: &BackupSettings) -> BackupOutcome {
        let artifact = {
            let _guard = self.dir_lock.lock().await;

            let artifact = match archive::build(&self.source_dir, &self.backup_dir).await {
                Ok(artifact) => artifact,
                Err(err) => {
                    warn!("backup failed: {err}");
                    return BackupOutcome {
                        success: false,
                        message: format!("backup failed: {err}"),
                        artifact: None,
                    };
                }
            };
            info!(
                "backup created: {} ({} bytes)",
                artifact.path.display(),
                artifact.size
            );

            let backup_dir = self.backup_dir.clone();
            let keep_count = settings.keep_count;
            match task::spawn_blocking(move || retention::enforce(&backup_dir, keep_count)).await {
                Ok(deleted) if !deleted.is_empty() => {
                    info!("retention: removed {} old backup(s)", deleted.len());
                }
                Ok(_) => {}
                Err(err) => warn!("retention task failed: {err}"),
            }

            artifact
        };

        self.upload(&artifact).await
    }

    async fn upload(&self, artifact: &BackupArtifact) -> BackupOutcome {
        let name = artifact
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let Some(sink) = &self.sink else {
            return BackupOutcome {
                success: true,
                message: format!("backup created: {name} (no remote sink configured)"),
                artifact: Some(artifact.path.clone()),
            };
        };

        let caption = format!(
            "world backup {}",
            artifact.created_at.format("%Y-%m-%d %H:%M:%S")
        );
        match sink.upload(&artifact.path, &caption).await {
            Ok(()) => BackupOutcome {
                success: true,
                message: format!("backup created and uploaded: {name}"),
                artifact: Some(artifact.path.clone()),
            },
            Err(err) => {
                warn!("backup upload failed: {err}");
                BackupOutcome {
                    success: true,
                    message: format!("backup created locally, upload failed: {err}"),
                    artifact: Some(artifact.path.clone()),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::SinkError;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct RecordingSink {
        uploads: AtomicUsize,
        fail: bool,
    }

    #[async_trait::async_trait]
    impl BackupSink for RecordingSink {
        async fn upload(&self, _artifact: &Path, _caption: &str) -> Result<(), SinkError> {
            self.uploads.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(SinkError::Io(std::io::Error::other("sink offline")));
            }
            Ok(())
        }
    }

    fn world_dir(root: &Path) -> PathBuf {
        let world = root.join("world");
        std::fs::create_dir_all(&world).unwrap();
        std::fs::write(world.join("level.dat"), b"level").unwrap();
        world
    }

    #[tokio::test]
    async fn missing_source_short_circuits_before_retention_and_upload() {
        let tmp = tempfile::tempdir().unwrap();
        let backups = tmp.path().join("backups");
        std::fs::create_dir_all(&backups).unwrap();
        let stale = backups.join("world_backup_20240101_000000.tar.gz");
        std::fs::write(&stale, b"old").unwrap();

        let sink = Arc::new(RecordingSink::default());
        let pipeline = BackupPipeline::new(
            tmp.path().join("missing"),
            backups.clone(),
            Some(sink.clone()),
        );

        let mut settings = BackupSettings::default();
        settings.keep_count = 1;
        let outcome = pipeline.run(&settings).await;

        assert!(!outcome.success);
        assert!(outcome.artifact.is_none());
        assert_eq!(sink.uploads.load(Ordering::SeqCst), 0);
        // Retention was never reached: the stale artifact survives even
        // though keep_count would have allowed deleting it after a new run.
        assert!(stale.exists());
    }

    #[tokio::test]
    async fn successful_run_archives_prunes_and_uploads() {
        let tmp = tempfile::tempdir().unwrap();
        let world = world_dir(tmp.path());
        let backups = tmp.path().join("backups");
        std::fs::create_dir_all(&backups).unwrap();

        // Pre-seed two artifacts older than anything the run will create.
        for (i, stamp) in ["20240101_000000", "20240102_000000"].iter().enumerate() {
            let path = backups.join(format!("world_backup_{stamp}.tar.gz"));
            let file = std::fs::File::create(&path).unwrap();
            file.set_modified(
                std::time::SystemTime::UNIX_EPOCH
                    + std::time::Duration::from_secs(1_000 + i as u64),
            )
            .unwrap();
        }

        let sink = Arc::new(RecordingSink::default());
        let pipeline = BackupPipeline::new(world, backups.clone(), Some(sink.clone()));

        let mut settings = BackupSettings::default();
        settings.keep_count = 2;
        let outcome = pipeline.run(&settings).await;

        assert!(outcome.success);
        let artifact = outcome.artifact.unwrap();
        assert!(artifact.exists());
        assert_eq!(sink.uploads.load(Ordering::SeqCst), 1);

        let remaining = std::fs::read_dir(&backups)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| {
                crate::archive::is_artifact_name(&e.file_name().to_string_lossy())
            })
            .count();
        assert_eq!(remaining, 2);
    }

    #[tokio::test]
    async fn upload_failure_is_reported_but_not_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let world = world_dir(tmp.path());
        let backups = tmp.path().join("backups");

        let sink = Arc::new(RecordingSink {
            uploads: AtomicUsize::new(0),
            fail: true,
        });
        let pipeline = BackupPipeline::new(world, backups, Some(sink.clone()));

        let outcome = pipeline.run(&BackupSettings::default()).await;

        assert!(outcome.success);
        assert!(outcome.message.contains("upload failed"));
        // The local artifact is never deleted because an upload failed.
        assert!(outcome.artifact.unwrap().exists());
        assert_eq!(sink.uploads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn no_sink_still_succeeds() {
        let tmp = tempfile::tempdir().unwrap();
        let world = world_dir(tmp.path());
        let pipeline = BackupPipeline::new(world, tmp.path().join("backups"), None);

        let outcome = pipeline.run(&BackupSettings::default()).await;
        assert!(outcome.success);
        assert!(outcome.message.contains("no remote sink"));
    }
}
