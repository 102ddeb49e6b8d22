//! Migration orchestration.
//!
//! Drives one confirmed plan through
//! `Planned -> Confirmed -> FilesTransferred -> LinksFixed -> Done`, with
//! `Failed` absorbing from any non-terminal state. Each phase scopes its own
//! container opens; per-file errors are collected and the batch continues with
//! the remaining files. Link fixing only ever targets successfully transferred
//! destination files (for the in-place mode the renamed file is the
//! destination).

use anyhow::{anyhow, Context, Result};
use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use tracing::{error, info, warn};

use super::mapping::{MigrationMode, MigrationPlan, Role};
use super::relink::rewrite_links;
use super::replicate::replicate;
use super::walker::collect_external_links;
use crate::container::{Mode, Store};
use crate::errors::MigrateError;
use crate::shutdown;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationState {
    Planned,
    Confirmed,
    FilesTransferred,
    LinksFixed,
    Done,
    Failed(String),
}

impl fmt::Display for MigrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigrationState::Planned => f.write_str("planned"),
            MigrationState::Confirmed => f.write_str("confirmed"),
            MigrationState::FilesTransferred => f.write_str("files-transferred"),
            MigrationState::LinksFixed => f.write_str("links-fixed"),
            MigrationState::Done => f.write_str("done"),
            MigrationState::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// One per-file failure, kept for the final report.
#[derive(Debug)]
pub struct Failure {
    pub file: String,
    pub error: anyhow::Error,
}

/// What the batch accomplished.
#[derive(Debug)]
pub struct MigrationReport {
    pub transferred: usize,
    pub links_rewritten: usize,
    pub failures: Vec<Failure>,
}

impl MigrationReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// A migration in flight. Owns the plan and every container handle it opens;
/// handles never outlive a phase.
#[derive(Debug)]
pub struct Migration {
    plan: MigrationPlan,
    downcast: bool,
    state: MigrationState,
    transferred_ok: BTreeSet<usize>,
    fully_ok: BTreeSet<usize>,
    links_rewritten: usize,
    failures: Vec<Failure>,
}

impl Migration {
    pub fn new(plan: MigrationPlan, downcast: bool) -> Migration {
        Migration {
            plan,
            downcast,
            state: MigrationState::Planned,
            transferred_ok: BTreeSet::new(),
            fully_ok: BTreeSet::new(),
            links_rewritten: 0,
            failures: Vec::new(),
        }
    }

    pub fn state(&self) -> &MigrationState {
        &self.state
    }

    pub fn plan(&self) -> &MigrationPlan {
        &self.plan
    }

    fn expect(&self, want: MigrationState, action: &'static str) -> Result<(), MigrateError> {
        if self.state != want {
            return Err(MigrateError::BadState {
                action,
                actual: self.state.to_string(),
            });
        }
        Ok(())
    }

    /// Gate the plan on an external confirmation capability. Returns whether
    /// the migration may proceed; a declined plan is absorbed into `Failed`.
    pub fn confirm_with(
        &mut self,
        gate: impl FnOnce(&MigrationPlan) -> bool,
    ) -> Result<bool, MigrateError> {
        self.expect(MigrationState::Planned, "confirm")?;
        if gate(&self.plan) {
            self.state = MigrationState::Confirmed;
            Ok(true)
        } else {
            info!("migration declined at confirmation");
            self.state = MigrationState::Failed("confirmation declined".into());
            Ok(false)
        }
    }

    /// Phase 1: rename or copy every file. One bad file does not abort the
    /// batch; its failure is recorded and the rest proceed.
    pub fn transfer_files(&mut self) -> Result<(), MigrateError> {
        self.expect(MigrationState::Confirmed, "transfer files")?;

        for (idx, rec) in self.plan.records().iter().enumerate() {
            if shutdown::is_requested() {
                self.state = MigrationState::Failed("interrupted".into());
                return Err(MigrateError::Interrupted);
            }
            let result = match (self.plan.mode(), rec.role) {
                (MigrationMode::InPlace, _) => rename_on_disk(&self.plan, idx),
                (_, Role::SideFile) => copy_on_disk(&self.plan, idx),
                (_, Role::Container) => copy_container(&self.plan, idx, self.downcast),
            };
            match result {
                Ok(()) => {
                    info!(file = %rec.old_name, dest = %rec.new_name, "file transferred");
                    self.transferred_ok.insert(idx);
                }
                Err(e) => {
                    error!(file = %rec.old_name, error = %e, "file transfer failed");
                    self.failures.push(Failure {
                        file: rec.old_name.clone(),
                        error: MigrateError::TransferFailed {
                            file: rec.old_name.clone(),
                            cause: e,
                        }
                        .into(),
                    });
                }
            }
        }

        self.state = MigrationState::FilesTransferred;
        Ok(())
    }

    /// Phase 2: rewrite external links inside every successfully transferred
    /// container. Runs strictly after phase 1 so the full mapping resolves
    /// against final on-disk names.
    pub fn fix_links(&mut self) -> Result<(), MigrateError> {
        self.expect(MigrationState::FilesTransferred, "fix links")?;

        for &idx in self.transferred_ok.clone().iter() {
            if shutdown::is_requested() {
                self.state = MigrationState::Failed("interrupted".into());
                return Err(MigrateError::Interrupted);
            }
            let rec = &self.plan.records()[idx];
            if rec.role != Role::Container {
                self.fully_ok.insert(idx);
                continue;
            }
            let path = self.plan.new_path(rec);
            match fix_links_in(&path, &self.plan) {
                Ok(count) => {
                    self.links_rewritten += count;
                    self.fully_ok.insert(idx);
                }
                Err(e) => {
                    error!(file = %rec.new_name, error = %e, "link fixing failed");
                    self.failures.push(Failure {
                        file: rec.new_name.clone(),
                        error: e,
                    });
                }
            }
        }

        self.state = MigrationState::LinksFixed;
        Ok(())
    }

    /// Terminal phase: for the move mode, discard originals that migrated
    /// cleanly; then produce the report.
    pub fn finish(mut self) -> MigrationReport {
        if self.state == MigrationState::LinksFixed {
            if self.plan.mode() == MigrationMode::Move {
                for &idx in self.fully_ok.clone().iter() {
                    let rec = &self.plan.records()[idx];
                    if rec.old_name == rec.new_name {
                        continue;
                    }
                    let old = self.plan.old_path(rec);
                    if let Err(e) = fs::remove_file(&old) {
                        warn!(file = %rec.old_name, error = %e, "could not discard original");
                        self.failures.push(Failure {
                            file: rec.old_name.clone(),
                            error: anyhow!(e).context(format!(
                                "discard original '{}'",
                                old.display()
                            )),
                        });
                    }
                }
            }
            self.state = MigrationState::Done;
        }

        info!(
            state = %self.state,
            transferred = self.transferred_ok.len(),
            links = self.links_rewritten,
            failures = self.failures.len(),
            "migration finished"
        );
        MigrationReport {
            transferred: self.transferred_ok.len(),
            links_rewritten: self.links_rewritten,
            failures: self.failures,
        }
    }

    /// Convenience driver: confirm, transfer, fix links, finish.
    /// `Ok(None)` means the confirmation gate declined.
    pub fn run(
        plan: MigrationPlan,
        downcast: bool,
        gate: impl FnOnce(&MigrationPlan) -> bool,
    ) -> Result<Option<MigrationReport>, MigrateError> {
        let mut m = Migration::new(plan, downcast);
        if !m.confirm_with(gate)? {
            return Ok(None);
        }
        m.transfer_files()?;
        m.fix_links()?;
        Ok(Some(m.finish()))
    }
}

fn rename_on_disk(plan: &MigrationPlan, idx: usize) -> Result<()> {
    let rec = &plan.records()[idx];
    let old = plan.old_path(rec);
    let new = plan.new_path(rec);
    if rec.old_name == rec.new_name {
        return Ok(());
    }
    fs::rename(&old, &new)
        .with_context(|| format!("rename '{}' -> '{}'", old.display(), new.display()))
}

fn copy_on_disk(plan: &MigrationPlan, idx: usize) -> Result<()> {
    let rec = &plan.records()[idx];
    let old = plan.old_path(rec);
    let new = plan.new_path(rec);
    fs::copy(&old, &new)
        .map(|_| ())
        .with_context(|| format!("copy '{}' -> '{}'", old.display(), new.display()))
}

/// Copy-mode container transfer: open source read-only and destination for
/// creation, replicate the full hierarchy, close both before returning.
fn copy_container(plan: &MigrationPlan, idx: usize, downcast: bool) -> Result<()> {
    let rec = &plan.records()[idx];
    let old = plan.old_path(rec);
    let new = plan.new_path(rec);

    let src = Store::open(&old, Mode::Read)
        .with_context(|| format!("open source container '{}'", old.display()))?;
    let mut dst = Store::open(&new, Mode::Create)
        .with_context(|| format!("create destination container '{}'", new.display()))?;
    replicate(&src, &mut dst, downcast)?;
    dst.close()
        .with_context(|| format!("close destination container '{}'", new.display()))?;
    Ok(())
}

/// Link-fix one container file; returns how many links were rewritten.
fn fix_links_in(path: &std::path::Path, plan: &MigrationPlan) -> Result<usize> {
    let mut store = Store::open(path, Mode::ReadWrite)
        .with_context(|| format!("open container '{}' for link fixing", path.display()))?;
    let refs = collect_external_links(&store)
        .with_context(|| format!("walk links of '{}'", path.display()))?;
    let summary = rewrite_links(&mut store, &refs, plan)?;
    store
        .close()
        .with_context(|| format!("close container '{}'", path.display()))?;
    Ok(summary.rewritten)
}
