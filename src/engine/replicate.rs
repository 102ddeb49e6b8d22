//! Hierarchy replication.
//!
//! Reproduces a source container's group/dataset tree in a destination:
//! groups (with attributes) first via the structural descent, dataset leaves
//! through the transfer engine, and external links recreated verbatim so the
//! copy references exactly what the original referenced. Links are never
//! followed into their target file here; retargeting mapped links is the
//! rewriter's pass.
//!
//! Re-running against a populated destination is allowed: existing groups are
//! kept, attributes are reconciled last-write-wins, and links already present
//! at their key are left alone.

use anyhow::{Context, Result};
use tracing::debug;

use super::transfer::copy_dataset;
use super::walker::{collect_external_links, reachable_groups};
use crate::container::{NodeClass, Store};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReplicaSummary {
    pub groups: usize,
    pub datasets: usize,
    pub links_recreated: usize,
}

/// Copy attributes from `src` to `dst` at `path` (last write wins).
fn copy_attrs(src: &Store, dst: &mut Store, path: &str) -> Result<()> {
    for name in src.attr_names(path)? {
        let value = src.get_attr(path, &name)?;
        dst.set_attr(path, &name, value)?;
    }
    Ok(())
}

/// Replicate the whole tree of `src` into `dst`.
pub fn replicate(src: &Store, dst: &mut Store, downcast: bool) -> Result<ReplicaSummary> {
    let mut summary = ReplicaSummary::default();

    // Root first: the root group always exists, only attributes move.
    copy_attrs(src, dst, "/").context("copy root attributes")?;

    // Structural descent is preorder, so parents land before children.
    let mut nodes = Vec::new();
    src.visit(|path, class| nodes.push((path.to_string(), class)));
    for (path, class) in nodes {
        match class {
            NodeClass::Group => {
                dst.create_group(&path)
                    .with_context(|| format!("create group '{path}'"))?;
                copy_attrs(src, dst, &path)
                    .with_context(|| format!("copy attributes of '{path}'"))?;
                summary.groups += 1;
            }
            NodeClass::Dataset => {
                // Re-run tolerance: an existing dataset keeps its data.
                if dst.dataset(&path).is_ok() {
                    debug!(path, "destination dataset already present; skipping");
                    continue;
                }
                copy_dataset(src, dst, &path, downcast)
                    .with_context(|| format!("copy dataset '{path}'"))?;
                summary.datasets += 1;
            }
        }
    }

    // External links are opaque here: recreate them exactly as found so the
    // destination keeps referencing whatever the source referenced.
    for group in reachable_groups(src) {
        dst.create_group(&group)?;
    }
    for link in collect_external_links(src)? {
        let exists = dst
            .link_kind(&link.holding_group, &link.link_key)
            .is_ok();
        if exists {
            debug!(
                group = %link.holding_group,
                key = %link.link_key,
                "destination already holds this key; leaving it"
            );
            continue;
        }
        dst.create_external_link(
            &link.holding_group,
            &link.link_key,
            &link.target_file,
            &link.target_path,
        )
        .with_context(|| {
            format!(
                "recreate external link '{}/{}'",
                link.holding_group, link.link_key
            )
        })?;
        summary.links_recreated += 1;
    }

    debug!(
        groups = summary.groups,
        datasets = summary.datasets,
        links = summary.links_recreated,
        "replication complete"
    );
    Ok(summary)
}
