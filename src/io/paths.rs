use std::path::{Path, PathBuf};

/// Environment variable overriding the data directory
pub const DATA_DIR_ENV: &str = "TASKFLOW_DIR";

#[derive(Debug, thiserror::Error)]
#[error("could not determine a data directory; pass --data-dir or set {DATA_DIR_ENV}")]
pub struct NoDataDir;

/// Resolve the data directory: explicit flag, then `TASKFLOW_DIR`, then the
/// platform data directory (e.g. `~/.local/share/taskflow`).
pub fn resolve_data_dir(flag: Option<&str>) -> Result<PathBuf, NoDataDir> {
    if let Some(dir) = flag {
        return Ok(PathBuf::from(dir));
    }
    if let Some(dir) = std::env::var_os(DATA_DIR_ENV).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    directories::ProjectDirs::from("", "", "taskflow")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or(NoDataDir)
}

/// Default location of the alarm sound
pub fn default_sound_path(data_dir: &Path) -> PathBuf {
    data_dir.join("sounds").join("alarm.mp3")
}
