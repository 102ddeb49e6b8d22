//! Link graph discovery.
//!
//! The container's structural `visit` primitive only reports hard-linked
//! groups and datasets; it never sees a cross-file link. So discovery is two
//! composed passes: `visit` (plus the root, which `visit` does not report)
//! yields every reachable group, and for each of those groups the direct
//! children are enumerated and classified by link kind. Datasets are leaves
//! and are never descended into.

use std::collections::BTreeSet;

use crate::container::{ContainerError, LinkKind, NodeClass, Store};

/// An external reference found at `holding_group/link_key`, pointing into
/// `target_file` at `target_path`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkReference {
    pub holding_group: String,
    pub link_key: String,
    pub target_file: String,
    pub target_path: String,
}

/// Every group reachable from the root via hard links, root first.
pub fn reachable_groups(store: &Store) -> Vec<String> {
    let mut groups = vec!["/".to_string()];
    store.visit(|path, class| {
        if class == NodeClass::Group {
            groups.push(path.to_string());
        }
    });
    groups
}

/// Every external link in the container, with its holding group path.
///
/// Callers must not depend on ordering, only on completeness.
pub fn collect_external_links(store: &Store) -> Result<Vec<LinkReference>, ContainerError> {
    let mut refs = Vec::new();
    for group in reachable_groups(store) {
        for key in store.list_children(&group)? {
            if store.link_kind(&group, &key)? != LinkKind::External {
                continue;
            }
            let link = store.external_link(&group, &key)?;
            refs.push(LinkReference {
                holding_group: group.clone(),
                link_key: key,
                target_file: link.target_file,
                target_path: link.target_path,
            });
        }
    }
    Ok(refs)
}

/// The distinct target filenames referenced by a container's external links.
pub fn external_link_files(store: &Store) -> Result<BTreeSet<String>, ContainerError> {
    Ok(collect_external_links(store)?
        .into_iter()
        .map(|r| r.target_file)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::{ElementType, Mode};
    use tempfile::tempdir;

    #[test]
    fn finds_links_at_every_depth() {
        let td = tempdir().unwrap();
        let mut s = Store::open(td.path().join("a.h5"), Mode::Create).unwrap();
        s.create_group("/entry/instrument/detector").unwrap();
        s.create_external_link("/", "root_link", "b.h5", "/x").unwrap();
        s.create_external_link("/entry/instrument/detector", "data", "c.h5", "/entry/data")
            .unwrap();
        s.create_dataset("/entry/counts", &[2], ElementType::I32, None, None)
            .unwrap();

        let mut refs = collect_external_links(&s).unwrap();
        refs.sort_by(|a, b| a.link_key.cmp(&b.link_key));
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].holding_group, "/entry/instrument/detector");
        assert_eq!(refs[0].link_key, "data");
        assert_eq!(refs[0].target_file, "c.h5");
        assert_eq!(refs[1].holding_group, "/");
        assert_eq!(refs[1].target_file, "b.h5");
    }

    #[test]
    fn datasets_are_not_descended() {
        let td = tempdir().unwrap();
        let mut s = Store::open(td.path().join("a.h5"), Mode::Create).unwrap();
        s.create_dataset("/entry/data", &[4], ElementType::F32, None, None)
            .unwrap();
        let groups = reachable_groups(&s);
        assert_eq!(groups, vec!["/".to_string(), "/entry".to_string()]);
        assert!(collect_external_links(&s).unwrap().is_empty());
    }

    #[test]
    fn link_files_deduplicated() {
        let td = tempdir().unwrap();
        let mut s = Store::open(td.path().join("a.h5"), Mode::Create).unwrap();
        s.create_group("/one").unwrap();
        s.create_group("/two").unwrap();
        s.create_external_link("/one", "l", "shared.h5", "/p").unwrap();
        s.create_external_link("/two", "l", "shared.h5", "/q").unwrap();
        let files = external_link_files(&s).unwrap();
        assert_eq!(files.into_iter().collect::<Vec<_>>(), vec!["shared.h5"]);
    }
}
