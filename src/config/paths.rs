//! Default path helpers and symlink checks.
//! Determines OS-appropriate config/log paths and detects symlinked ancestors
//! for safety before enabling file logging.

use anyhow::{anyhow, Result};
use dirs::{config_dir, data_dir};
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::CONFIG_ENV;

/// Config file path: `$H5SHIFT_CONFIG` if set, else the OS config dir.
pub fn default_config_path() -> Result<PathBuf> {
    if let Some(explicit) = env::var_os(CONFIG_ENV) {
        return Ok(PathBuf::from(explicit));
    }
    if let Some(mut base) = config_dir() {
        base.push("h5shift");
        base.push("config.xml");
        return Ok(base);
    }
    env::var("HOME")
        .map(|h| {
            PathBuf::from(h)
                .join(".config")
                .join("h5shift")
                .join("config.xml")
        })
        .map_err(|_| anyhow!("neither a config directory nor HOME is available"))
}

/// OS-appropriate default log file path (data dir).
pub fn default_log_path() -> Result<PathBuf> {
    if let Some(mut base) = data_dir() {
        base.push("h5shift");
        // ensure dir exists (best-effort)
        let _ = fs::create_dir_all(&base);
        base.push("h5shift.log");
        return Ok(base);
    }
    env::var("HOME")
        .map(|h| {
            PathBuf::from(h)
                .join(".local")
                .join("share")
                .join("h5shift")
                .join("h5shift.log")
        })
        .map_err(|_| anyhow!("neither a data directory nor HOME is available"))
}

/// Return true if any existing ancestor of `path` is a symlink.
pub fn path_has_symlink_ancestor(path: &Path) -> io::Result<bool> {
    let mut p = path.parent();
    while let Some(anc) = p {
        if anc.exists() {
            let meta = fs::symlink_metadata(anc)?;
            if meta.file_type().is_symlink() {
                return Ok(true);
            }
        }
        p = anc.parent();
    }
    Ok(false)
}
