//! External link rewriting.
//!
//! Post-pass over a container whose on-disk neighbors have already been
//! renamed or copied: every discovered link whose target file is in the name
//! mapping is deleted and recreated at the same key, pointing at the mapped
//! filename. When the link's target path textually embeds the old filename,
//! that substring is replaced too. A link whose target file is not in the
//! mapping belongs to a file outside this batch and is left untouched.

use anyhow::Result;
use tracing::{debug, info};

use super::mapping::MigrationPlan;
use super::walker::LinkReference;
use crate::container::Store;
use crate::errors::MigrateError;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RelinkSummary {
    /// Links deleted and recreated with a mapped target.
    pub rewritten: usize,
    /// Links left untouched because their target file is outside the batch.
    pub skipped: usize,
}

/// Rewrite every mapped reference in `store`. `refs` is the link set
/// discovered by the walker over this same container.
pub fn rewrite_links(
    store: &mut Store,
    refs: &[LinkReference],
    plan: &MigrationPlan,
) -> Result<RelinkSummary> {
    let mut summary = RelinkSummary::default();
    let file_name = store
        .path()
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    for link in refs {
        let Some(new_file) = plan.new_name_for(&link.target_file) else {
            debug!(
                target = %link.target_file,
                key = %link.link_key,
                "target outside batch; link left untouched"
            );
            summary.skipped += 1;
            continue;
        };

        let new_path = if link.target_path.contains(&link.target_file) {
            link.target_path.replace(&link.target_file, new_file)
        } else {
            link.target_path.clone()
        };

        let fail = |cause: crate::container::ContainerError| MigrateError::LinkRewriteFailed {
            file: file_name.clone(),
            key: link.link_key.clone(),
            cause: cause.into(),
        };

        // Delete-then-recreate at the same key. The key may already be gone
        // if a previous partial run got this far.
        if store.link_kind(&link.holding_group, &link.link_key).is_ok() {
            store
                .delete_link(&link.holding_group, &link.link_key)
                .map_err(fail)?;
        }
        store
            .create_external_link(&link.holding_group, &link.link_key, new_file, &new_path)
            .map_err(fail)?;
        debug!(
            group = %link.holding_group,
            key = %link.link_key,
            old = %link.target_file,
            new = %new_file,
            "link rewritten"
        );
        summary.rewritten += 1;
    }

    info!(
        rewritten = summary.rewritten,
        skipped = summary.skipped,
        file = %store.path().display(),
        "link rewrite pass complete"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::mapping::{FileRecord, MigrationMode, Role};
    use crate::engine::walker::collect_external_links;
    use crate::container::Mode;
    use std::path::Path;
    use tempfile::tempdir;

    fn plan_for(pairs: &[(&str, &str)]) -> MigrationPlan {
        let records = pairs
            .iter()
            .map(|(old, new)| FileRecord {
                old_name: (*old).to_string(),
                new_name: (*new).to_string(),
                role: Role::Container,
            })
            .collect();
        MigrationPlan::from_records(Path::new("."), records, MigrationMode::InPlace).unwrap()
    }

    #[test]
    fn mapped_link_is_retargeted() {
        let td = tempdir().unwrap();
        let mut s = Store::open(td.path().join("a2.h5"), Mode::Create).unwrap();
        s.create_group("/entry").unwrap();
        s.create_external_link("/entry", "data", "b.h5", "/entry/data")
            .unwrap();

        let plan = plan_for(&[("a.h5", "a2.h5"), ("b.h5", "b2.h5")]);
        let refs = collect_external_links(&s).unwrap();
        let summary = rewrite_links(&mut s, &refs, &plan).unwrap();

        assert_eq!(summary.rewritten, 1);
        let link = s.external_link("/entry", "data").unwrap();
        assert_eq!(link.target_file, "b2.h5");
        assert_eq!(link.target_path, "/entry/data");
    }

    #[test]
    fn embedded_filename_in_target_path_is_mapped() {
        let td = tempdir().unwrap();
        let mut s = Store::open(td.path().join("m.h5"), Mode::Create).unwrap();
        s.create_group("/g").unwrap();
        s.create_external_link("/g", "l", "b.h5", "/links/b.h5/data")
            .unwrap();

        let plan = plan_for(&[("b.h5", "c.h5")]);
        let refs = collect_external_links(&s).unwrap();
        rewrite_links(&mut s, &refs, &plan).unwrap();

        let link = s.external_link("/g", "l").unwrap();
        assert_eq!(link.target_file, "c.h5");
        assert_eq!(link.target_path, "/links/c.h5/data");
    }

    #[test]
    fn unmapped_link_untouched() {
        let td = tempdir().unwrap();
        let mut s = Store::open(td.path().join("m.h5"), Mode::Create).unwrap();
        s.create_group("/g").unwrap();
        s.create_external_link("/g", "cal", "calibration.h5", "/cal/table")
            .unwrap();

        let plan = plan_for(&[("b.h5", "c.h5")]);
        let refs = collect_external_links(&s).unwrap();
        let summary = rewrite_links(&mut s, &refs, &plan).unwrap();

        assert_eq!(summary.rewritten, 0);
        assert_eq!(summary.skipped, 1);
        let link = s.external_link("/g", "cal").unwrap();
        assert_eq!(link.target_file, "calibration.h5");
        assert_eq!(link.target_path, "/cal/table");
    }
}
