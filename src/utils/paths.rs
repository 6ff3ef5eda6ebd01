use crate::error::{PkgBridgeError, Result};
use crate::project_identity;
use directories::{ProjectDirs, UserDirs};
use std::path::{Path, PathBuf};

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from(
        project_identity::QUALIFIER,
        project_identity::ORGANIZATION,
        project_identity::APPLICATION,
    )
    .ok_or_else(|| PkgBridgeError::PathError("Could not determine project directories".to_string()))
}

pub fn expand_home(path: &Path) -> Result<PathBuf> {
    let path_str = path.to_string_lossy();

    if !path_str.starts_with('~') {
        return Ok(path.to_path_buf());
    }

    let user_dirs = UserDirs::new()
        .ok_or_else(|| PkgBridgeError::PathError("Could not determine user home directory".to_string()))?;

    let home = user_dirs.home_dir();

    if path_str == "~" {
        return Ok(home.to_path_buf());
    }

    let stripped = path_str
        .strip_prefix("~/")
        .or_else(|| path_str.strip_prefix("~\\"))
        .ok_or_else(|| PkgBridgeError::PathError(format!("Invalid path format: {}", path_str)))?;

    Ok(home.join(stripped))
}

/// Configuration directory; `PKGBRIDGE_CONFIG_DIR` wins over the platform default.
pub fn config_dir() -> Result<PathBuf> {
    if let Some(dir) = project_identity::env_get("CONFIG_DIR") {
        return expand_home(Path::new(&dir));
    }
    Ok(project_dirs()?.config_dir().to_path_buf())
}

pub fn settings_file() -> Result<PathBuf> {
    Ok(config_dir()?.join(project_identity::SETTINGS_FILE_BASENAME))
}

/// Directory holding the per-backend catalog caches.
pub fn cache_dir() -> Result<PathBuf> {
    if let Some(dir) = project_identity::env_get("CACHE_DIR") {
        return expand_home(Path::new(&dir));
    }
    Ok(project_dirs()?
        .cache_dir()
        .join(project_identity::CACHE_SUBDIR))
}
