//! Config module.
//! Provides configuration types, default paths, XML loading, and the template
//! written on first run. CLI flags override anything loaded from XML.

pub mod paths;
pub mod types;
pub mod xml;

pub use paths::{default_config_path, default_log_path, path_has_symlink_ancestor};
pub use types::{Config, LogLevel};
pub use xml::{create_template_config, ensure_default_config_exists, load_config_from_xml};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "H5SHIFT_CONFIG";
