//! XML configuration support.
//! - Loads settings from config.xml (quick_xml).
//! - Creates a template if missing (unless H5SHIFT_CONFIG is set).
//! - Exposes helpers to ensure a default config exists.
//!
//! Notes:
//! - This module only reads/writes the config file; CLI flag precedence is
//!   applied by the app layer.
//! - Unknown XML fields fail the parse (serde deny_unknown_fields) so
//!   misconfigurations surface early.

use anyhow::{Context, Result};
use quick_xml::de::from_str as from_xml_str;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::paths::{default_config_path, default_log_path, path_has_symlink_ancestor};
use super::types::{Config, LogLevel};
use super::CONFIG_ENV;

/// Struct mirroring the XML config for deserialization.
#[derive(Debug, Deserialize)]
#[serde(rename = "config")]
#[serde(deny_unknown_fields)]
struct XmlConfig {
    #[serde(rename = "log_level")]
    log_level: Option<String>,
    #[serde(rename = "log_file")]
    log_file: Option<String>,
    #[serde(rename = "assume_yes")]
    assume_yes: Option<bool>,
}

fn xml_to_config(parsed: XmlConfig) -> Config {
    let mut cfg = Config::default();

    if let Some(s) = parsed.log_level.as_deref() {
        if let Ok(level) = s.trim().parse::<LogLevel>() {
            cfg.log_level = level;
        }
    }
    if let Some(s) = parsed.log_file.as_deref() {
        let trimmed = s.trim();
        if !trimmed.is_empty() {
            cfg.log_file = Some(PathBuf::from(trimmed));
        }
    }
    cfg.assume_yes = parsed.assume_yes.unwrap_or(false);

    cfg
}

/// Read config from XML. `$H5SHIFT_CONFIG` wins over the OS default path.
/// Returns None if the file doesn't exist or holds no meaningful settings;
/// a missing default-path file also gets a template written for next time.
pub fn load_config_from_xml() -> Option<Config> {
    let env_set = env::var_os(CONFIG_ENV).is_some();
    let cfg_path = default_config_path().ok()?;

    if !cfg_path.exists() {
        if !env_set {
            let _ = create_template_config(&cfg_path);
        }
        return None;
    }

    let content = fs::read_to_string(&cfg_path).ok()?;
    let parsed: XmlConfig = match from_xml_str(&content) {
        Ok(x) => x,
        Err(e) => {
            debug!(
                "Failed to parse config.xml at {}: {}",
                cfg_path.display(),
                e
            );
            return None;
        }
    };

    if parsed.log_level.is_none() && parsed.log_file.is_none() && parsed.assume_yes.is_none() {
        return None;
    }
    Some(xml_to_config(parsed))
}

/// Load a Config from a specific XML file path (quick_xml).
pub fn load_config_from_xml_path(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("read config xml '{}'", path.display()))?;
    let parsed: XmlConfig = from_xml_str(&contents)
        .with_context(|| format!("parse config xml '{}'", path.display()))?;
    Ok(xml_to_config(parsed))
}

/// Create default template config file and parent directory (best-effort
/// permissions, refusing symlinked ancestors).
pub fn create_template_config(path: &Path) -> Result<()> {
    if path_has_symlink_ancestor(path)? {
        return Err(anyhow::anyhow!(
            "Refusing to create config: ancestor of {} is a symlink",
            path.display()
        ));
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let _ = fs::set_permissions(parent, fs::Permissions::from_mode(0o700));
        }
    }

    let suggested_log = default_log_path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| "/path/to/h5shift.log".into());

    let content = format!(
        "<!--\n  h5shift configuration (XML)\n\n  Fields:\n    log_level   -> quiet | normal | info | debug\n    log_file    -> path to log file (optional; stdout/stderr still used)\n    assume_yes  -> skip the interactive confirmation prompt (true/false)\n\n  Notes:\n    - CLI flags override XML values.\n-->\n<config>\n  <log_level>normal</log_level>\n  <log_file>{suggested_log}</log_file>\n  <assume_yes>false</assume_yes>\n</config>\n"
    );

    fs::write(path, content)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let _ = fs::set_permissions(path, fs::Permissions::from_mode(0o600));
    }

    info!("Created template config at {}", path.display());
    Ok(())
}

/// Create default config if H5SHIFT_CONFIG not set; return created path so
/// the CLI can inform the user.
pub fn ensure_default_config_exists() -> Option<PathBuf> {
    if env::var_os(CONFIG_ENV).is_some() {
        return None;
    }

    let cfg_path = default_config_path().ok()?;
    if cfg_path.exists() {
        return None;
    }

    match create_template_config(&cfg_path) {
        Ok(()) => Some(cfg_path),
        Err(e) => {
            eprintln!(
                "Failed to create template config at {}: {}",
                cfg_path.display(),
                e
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn parses_all_fields() {
        let td = tempdir().unwrap();
        let p = td.path().join("config.xml");
        fs::write(
            &p,
            "<config>\n  <log_level>debug</log_level>\n  <log_file>/tmp/h5shift.log</log_file>\n  <assume_yes>true</assume_yes>\n</config>\n",
        )
        .unwrap();
        let cfg = load_config_from_xml_path(&p).unwrap();
        assert_eq!(cfg.log_level, LogLevel::Debug);
        assert_eq!(cfg.log_file, Some(PathBuf::from("/tmp/h5shift.log")));
        assert!(cfg.assume_yes);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let td = tempdir().unwrap();
        let p = td.path().join("config.xml");
        fs::write(&p, "<config>\n  <log_level>quiet</log_level>\n</config>\n").unwrap();
        let cfg = load_config_from_xml_path(&p).unwrap();
        assert_eq!(cfg.log_level, LogLevel::Quiet);
        assert!(!cfg.assume_yes);
    }

    #[test]
    fn unknown_field_is_a_parse_error() {
        let td = tempdir().unwrap();
        let p = td.path().join("config.xml");
        fs::write(&p, "<config>\n  <bogus>1</bogus>\n</config>\n").unwrap();
        assert!(load_config_from_xml_path(&p).is_err());
    }

    #[test]
    fn template_is_loadable() {
        let td = tempdir().unwrap();
        let p = td.path().join("nested").join("config.xml");
        create_template_config(&p).unwrap();
        let cfg = load_config_from_xml_path(&p).unwrap();
        assert_eq!(cfg.log_level, LogLevel::Normal);
    }
}
