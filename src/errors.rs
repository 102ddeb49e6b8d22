//! Typed error definitions for h5shift.
//! Provides a small set of well-known failure modes for better logs and tests.
//!
//! Per-file failures during a batch are wrapped in `TransferFailed` /
//! `LinkRewriteFailed` and collected into the final report; mapping
//! construction errors are fatal before any transfer begins.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MigrateError {
    #[error("Cannot read directory {dir}: {cause}")]
    DirectoryUnreadable { dir: PathBuf, cause: std::io::Error },

    #[error("No files found with prefix '{prefix}' in {dir}")]
    NoMatchingFiles { dir: PathBuf, prefix: String },

    #[error("Name mapping is not injective: '{name}' appears as more than one source or target")]
    UnresolvableMapping { name: String },

    #[error("Transfer failed for '{file}': {cause}")]
    TransferFailed { file: String, cause: anyhow::Error },

    #[error("Link rewrite failed in '{file}' at key '{key}': {cause}")]
    LinkRewriteFailed {
        file: String,
        key: String,
        cause: anyhow::Error,
    },

    #[error("Migration is in state '{actual}'; cannot {action}")]
    BadState {
        action: &'static str,
        actual: String,
    },

    #[error("Operation interrupted by user")]
    Interrupted,
}

impl MigrateError {
    /// Stable machine-readable code for structured log fields.
    pub fn code(&self) -> &'static str {
        match self {
            MigrateError::DirectoryUnreadable { .. } => "directory_unreadable",
            MigrateError::NoMatchingFiles { .. } => "no_matching_files",
            MigrateError::UnresolvableMapping { .. } => "unresolvable_mapping",
            MigrateError::TransferFailed { .. } => "transfer_failed",
            MigrateError::LinkRewriteFailed { .. } => "link_rewrite_failed",
            MigrateError::BadState { .. } => "bad_state",
            MigrateError::Interrupted => "interrupted",
        }
    }
}
