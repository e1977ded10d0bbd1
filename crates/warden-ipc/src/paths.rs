use std::path::{Path, PathBuf};

pub struct RuntimePaths {
    pub runtime_dir: PathBuf,
    pub socket_path: PathBuf,
    pub lock_path: PathBuf,
}

const APP_ID: &str = "warden";

/// Where the daemon's socket and single-instance lock live. Client and
/// daemon must agree on this, which is why it sits next to the framing code.
pub fn runtime_paths() -> RuntimePaths {
    // Linux: prefer XDG_RUNTIME_DIR if present.
    if let Some(xdg) = std::env::var_os("XDG_RUNTIME_DIR") {
        return mk(PathBuf::from(xdg).join(APP_ID));
    }

    // macOS / fallback: TMPDIR.
    if let Some(tmp) = std::env::var_os("TMPDIR") {
        return mk(PathBuf::from(tmp).join(APP_ID));
    }

    mk(std::env::temp_dir().join(APP_ID))
}

fn mk(runtime_dir: PathBuf) -> RuntimePaths {
    RuntimePaths {
        socket_path: runtime_dir.join("wardend.sock"),
        lock_path: runtime_dir.join("wardend.lock"),
        runtime_dir,
    }
}

pub fn ensure_dir(p: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(p)
}
