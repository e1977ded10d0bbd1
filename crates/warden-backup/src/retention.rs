use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::{info, warn};

use crate::archive::is_artifact_name;

/// Delete every artifact in `backup_dir` beyond the `keep_count` newest,
/// oldest first. Returns the paths that were actually deleted.
///
/// Ordering is newest-first by modification time with the file name as a
/// secondary key, so runs within the same mtime tick are still deterministic
/// (artifact names embed the creation timestamp). Individual deletion
/// failures are logged and skipped; retention never fails a backup.
pub fn enforce(backup_dir: &Path, keep_count: u32) -> Vec<PathBuf> {
    let entries = match std::fs::read_dir(backup_dir) {
        Ok(entries) => entries,
        Err(err) => {
            warn!("retention: cannot list {}: {err}", backup_dir.display());
            return Vec::new();
        }
    };

    let mut artifacts: Vec<(PathBuf, SystemTime, String)> = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().to_string();
            if !is_artifact_name(&name) {
                return None;
            }
            let mtime = entry
                .metadata()
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            Some((entry.path(), mtime, name))
        })
        .collect();

    artifacts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| b.2.cmp(&a.2)));

    let mut deleted = Vec::new();
    for (path, _, name) in artifacts.into_iter().skip(keep_count as usize).rev() {
        match std::fs::remove_file(&path) {
            Ok(()) => {
                info!("retention: deleted old backup {name}");
                deleted.push(path);
            }
            Err(err) => {
                warn!("retention: failed to delete {name}: {err}");
            }
        }
    }
    deleted
}
