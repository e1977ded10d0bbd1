use fs2::FileExt;
use std::{fs::File, fs::OpenOptions, path::Path};

pub struct LockGuard {
    _file: File,
}

/// Exclusive advisory lock held for the daemon's lifetime. A second
/// instance gets `WouldBlock` and bows out.
pub fn acquire_lock(path: &Path) -> std::io::Result<LockGuard> {
    let file = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .open(path)?;

    file.try_lock_exclusive()?;
    Ok(LockGuard { _file: file })
}
