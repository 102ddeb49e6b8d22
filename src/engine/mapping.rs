//! Prefix resolution and the migration plan.
//!
//! Scans one directory level for names starting with a prefix and derives the
//! old -> new name mapping by replacing the *first* occurrence of the prefix.
//! A file named `{prefix}_1_{prefix}.h5` only has the leading token renamed.
//! The plan is validated (injectivity) before it can be confirmed and is
//! immutable afterwards.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::errors::MigrateError;

/// Extensions treated as hierarchical containers subject to link rewriting.
/// Everything else is a side file renamed only at the filesystem level.
const CONTAINER_EXTENSIONS: &[&str] = &["h5", "nxs"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Container,
    SideFile,
}

/// One file of the experiment set and its target name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub old_name: String,
    pub new_name: String,
    pub role: Role,
}

impl FileRecord {
    fn new(old_name: String, prefix: &str, replacement: &str) -> FileRecord {
        let new_name = old_name.replacen(prefix, replacement, 1);
        let role = role_for(&old_name);
        FileRecord {
            old_name,
            new_name,
            role,
        }
    }
}

fn role_for(name: &str) -> Role {
    let ext = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some(e) if CONTAINER_EXTENSIONS.contains(&e) => Role::Container,
        _ => Role::SideFile,
    }
}

/// Find the file names in `directory` (one level, no recursion) that start
/// with `prefix`, and derive each target name. Sorted by old name.
pub fn scan_prefix(
    directory: &Path,
    prefix: &str,
    replacement: &str,
) -> Result<Vec<FileRecord>, MigrateError> {
    debug!(dir = %directory.display(), prefix, "scanning for prefix matches");

    let mut records = Vec::new();
    for entry in WalkDir::new(directory).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| MigrateError::DirectoryUnreadable {
            dir: directory.to_path_buf(),
            cause: e
                .into_io_error()
                .unwrap_or_else(|| std::io::Error::other("walk failed")),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            continue;
        };
        if name.starts_with(prefix) {
            records.push(FileRecord::new(name.to_string(), prefix, replacement));
        }
    }
    records.sort_by(|a, b| a.old_name.cmp(&b.old_name));
    info!(matches = records.len(), prefix, "prefix scan complete");
    Ok(records)
}

/// How the batch is carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationMode {
    /// Rename every file on disk, then rewrite links inside the renamed
    /// containers.
    InPlace,
    /// Copy every file to its new name; originals are kept untouched.
    Copy,
    /// Copy, rewrite links in the copies, then discard originals that
    /// migrated cleanly.
    Move,
}

impl std::fmt::Display for MigrationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MigrationMode::InPlace => "in-place",
            MigrationMode::Copy => "copy",
            MigrationMode::Move => "move",
        };
        f.write_str(s)
    }
}

/// The validated, immutable description of one migration batch.
#[derive(Debug, Clone)]
pub struct MigrationPlan {
    directory: PathBuf,
    mode: MigrationMode,
    records: Vec<FileRecord>,
    by_old: BTreeMap<String, String>,
}

impl MigrationPlan {
    /// Scan `directory` and build a validated plan.
    ///
    /// Fatal before anything is touched: an unreadable directory, an empty
    /// match set, or a non-injective mapping (some new name colliding with
    /// another record's old or new name).
    pub fn build(
        directory: &Path,
        prefix: &str,
        replacement: &str,
        mode: MigrationMode,
    ) -> Result<MigrationPlan, MigrateError> {
        let records = scan_prefix(directory, prefix, replacement)?;
        if records.is_empty() {
            return Err(MigrateError::NoMatchingFiles {
                dir: directory.to_path_buf(),
                prefix: prefix.to_string(),
            });
        }
        Self::from_records(directory, records, mode)
    }

    /// Build a plan from explicit records (used by tests and single-file
    /// callers). Validates injectivity.
    pub fn from_records(
        directory: &Path,
        records: Vec<FileRecord>,
        mode: MigrationMode,
    ) -> Result<MigrationPlan, MigrateError> {
        let mut by_old = BTreeMap::new();
        for rec in &records {
            if by_old
                .insert(rec.old_name.clone(), rec.new_name.clone())
                .is_some()
            {
                return Err(MigrateError::UnresolvableMapping {
                    name: rec.old_name.clone(),
                });
            }
        }
        // A new name must not collide with any other record's old or new name.
        for (i, rec) in records.iter().enumerate() {
            for (j, other) in records.iter().enumerate() {
                if i == j {
                    continue;
                }
                if rec.new_name == other.old_name || rec.new_name == other.new_name {
                    return Err(MigrateError::UnresolvableMapping {
                        name: rec.new_name.clone(),
                    });
                }
            }
        }
        Ok(MigrationPlan {
            directory: directory.to_path_buf(),
            mode,
            records,
            by_old,
        })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn mode(&self) -> MigrationMode {
        self.mode
    }

    pub fn records(&self) -> &[FileRecord] {
        &self.records
    }

    /// The target name for `old_name`, if it is part of this batch.
    pub fn new_name_for(&self, old_name: &str) -> Option<&str> {
        self.by_old.get(old_name).map(String::as_str)
    }

    pub fn old_path(&self, rec: &FileRecord) -> PathBuf {
        self.directory.join(&rec.old_name)
    }

    pub fn new_path(&self, rec: &FileRecord) -> PathBuf {
        self.directory.join(&rec.new_name)
    }
}
