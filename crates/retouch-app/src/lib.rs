use std::path::{Path, PathBuf};

use directories::ProjectDirs;

const APP_QUALIFIER: &str = "dev";
const APP_ORGANIZATION: &str = "retouch";
const APP_NAME: &str = "retouch";
const EXPORT_DIRNAME: &str = "exports";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("could not resolve user data directory")]
    MissingUserDataDir,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// App-local user data directory.
pub fn user_data_dir() -> Result<PathBuf> {
    let dirs = ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
        .ok_or(Error::MissingUserDataDir)?;
    Ok(dirs.data_local_dir().to_path_buf())
}

/// Default location for saved results.
pub fn export_dir() -> Result<PathBuf> {
    Ok(user_data_dir()?.join(EXPORT_DIRNAME))
}

/// File name for the variation at `cursor`/`variation`, 1-based the way the
/// front ends number them.
pub fn export_file_name(cursor: usize, variation: usize, extension: &str) -> String {
    let extension = extension.trim_start_matches('.');
    format!("retouch-step{}-v{}.{extension}", cursor + 1, variation + 1)
}

/// Write `bytes` to `path`, creating parent directories as needed.
pub fn write_export(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, bytes)?;
    Ok(())
}
