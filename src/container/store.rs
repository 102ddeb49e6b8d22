//! On-disk container store.
//!
//! A container file is a serde-serialized node tree: groups hold attributes
//! plus a sorted child map, datasets hold attributes plus a typed flat
//! payload. External links are stored as (target_file, target_path) pairs in
//! the child map and are never resolved here; resolving them means opening a
//! different file, which is the caller's business.
//!
//! Open modes gate mutation: a `Read` handle refuses every mutating call.
//! Writable handles persist on `flush`/`close` (and best-effort on drop).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::data::{element_count, slab_ranges, AttrValue, DataBlock, ElementType};
use super::{ContainerError, DatasetDescriptor, ExternalLink, LinkKind, NodeClass};

/// Format tag written into every container file; open() refuses anything else.
pub const FORMAT_TAG: &str = "h5shift-container-v1";

/// Open mode for a container file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Existing file, no mutation allowed.
    Read,
    /// Existing file, read and write.
    ReadWrite,
    /// New (or truncated) empty file, read and write.
    Create,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum Child {
    Node(Node),
    Link(ExternalLink),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum Node {
    Group {
        attrs: BTreeMap<String, AttrValue>,
        children: BTreeMap<String, Child>,
    },
    Dataset {
        attrs: BTreeMap<String, AttrValue>,
        shape: Vec<u64>,
        element_type: ElementType,
        chunk_shape: Option<Vec<u64>>,
        max_shape: Option<Vec<Option<u64>>>,
        data: DataBlock,
    },
}

impl Node {
    fn empty_group() -> Node {
        Node::Group {
            attrs: BTreeMap::new(),
            children: BTreeMap::new(),
        }
    }

    fn attrs(&self) -> &BTreeMap<String, AttrValue> {
        match self {
            Node::Group { attrs, .. } | Node::Dataset { attrs, .. } => attrs,
        }
    }

    fn attrs_mut(&mut self) -> &mut BTreeMap<String, AttrValue> {
        match self {
            Node::Group { attrs, .. } | Node::Dataset { attrs, .. } => attrs,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct FileDoc {
    format: String,
    root: Node,
}

/// An open container file.
#[derive(Debug)]
pub struct Store {
    path: PathBuf,
    mode: Mode,
    root: Node,
    dirty: bool,
}

impl Store {
    /// Open a container file. `Create` starts from an empty root group and
    /// writes the file immediately so creation failures surface early.
    pub fn open(path: impl Into<PathBuf>, mode: Mode) -> Result<Store, ContainerError> {
        let path = path.into();
        let root = match mode {
            Mode::Create => Node::empty_group(),
            Mode::Read | Mode::ReadWrite => {
                let file = fs::File::open(&path)?;
                let doc: FileDoc = serde_json::from_reader(BufReader::new(file))
                    .map_err(|e| ContainerError::Format(format!("{}: {e}", path.display())))?;
                if doc.format != FORMAT_TAG {
                    return Err(ContainerError::Format(format!(
                        "{}: unexpected format tag '{}'",
                        path.display(),
                        doc.format
                    )));
                }
                doc.root
            }
        };
        let mut store = Store {
            path,
            mode,
            root,
            dirty: false,
        };
        if mode == Mode::Create {
            store.dirty = true;
            store.flush()?;
        }
        debug!(path = %store.path.display(), ?mode, "opened container");
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persist pending changes. No-op for clean or read-only handles.
    pub fn flush(&mut self) -> Result<(), ContainerError> {
        if !self.dirty || self.mode == Mode::Read {
            return Ok(());
        }
        let file = fs::File::create(&self.path)?;
        let doc = FileDoc {
            format: FORMAT_TAG.to_string(),
            root: self.root.clone(),
        };
        serde_json::to_writer(BufWriter::new(file), &doc)
            .map_err(|e| ContainerError::Format(format!("{}: {e}", self.path.display())))?;
        self.dirty = false;
        Ok(())
    }

    /// Flush and consume the handle.
    pub fn close(mut self) -> Result<(), ContainerError> {
        self.flush()
    }

    fn ensure_writable(&self) -> Result<(), ContainerError> {
        if self.mode == Mode::Read {
            return Err(ContainerError::ReadOnly(self.path.clone()));
        }
        Ok(())
    }

    fn components(path: &str) -> impl Iterator<Item = &str> {
        path.split('/').filter(|c| !c.is_empty())
    }

    fn resolve(&self, path: &str) -> Result<&Node, ContainerError> {
        let mut node = &self.root;
        for comp in Self::components(path) {
            let Node::Group { children, .. } = node else {
                return Err(ContainerError::NotAGroup(path.to_string()));
            };
            node = match children.get(comp) {
                Some(Child::Node(n)) => n,
                Some(Child::Link(_)) => {
                    return Err(ContainerError::CrossesExternalLink(path.to_string()))
                }
                None => return Err(ContainerError::NotFound(path.to_string())),
            };
        }
        Ok(node)
    }

    fn resolve_mut(&mut self, path: &str) -> Result<&mut Node, ContainerError> {
        let mut node = &mut self.root;
        for comp in Self::components(path) {
            let Node::Group { children, .. } = node else {
                return Err(ContainerError::NotAGroup(path.to_string()));
            };
            node = match children.get_mut(comp) {
                Some(Child::Node(n)) => n,
                Some(Child::Link(_)) => {
                    return Err(ContainerError::CrossesExternalLink(path.to_string()))
                }
                None => return Err(ContainerError::NotFound(path.to_string())),
            };
        }
        Ok(node)
    }

    fn group_children(&self, group: &str) -> Result<&BTreeMap<String, Child>, ContainerError> {
        match self.resolve(group)? {
            Node::Group { children, .. } => Ok(children),
            Node::Dataset { .. } => Err(ContainerError::NotAGroup(group.to_string())),
        }
    }

    fn group_children_mut(
        &mut self,
        group: &str,
    ) -> Result<&mut BTreeMap<String, Child>, ContainerError> {
        match self.resolve_mut(group)? {
            Node::Group { children, .. } => Ok(children),
            Node::Dataset { .. } => Err(ContainerError::NotAGroup(group.to_string())),
        }
    }

    /// Direct children of a group, sorted by name.
    pub fn list_children(&self, group: &str) -> Result<Vec<String>, ContainerError> {
        Ok(self.group_children(group)?.keys().cloned().collect())
    }

    /// Classify how `key` is linked under `group`.
    pub fn link_kind(&self, group: &str, key: &str) -> Result<LinkKind, ContainerError> {
        match self.group_children(group)?.get(key) {
            Some(Child::Node(Node::Group { .. })) => Ok(LinkKind::HardGroup),
            Some(Child::Node(Node::Dataset { .. })) => Ok(LinkKind::HardDataset),
            Some(Child::Link(_)) => Ok(LinkKind::External),
            None => Err(ContainerError::NotFound(join_path(group, key))),
        }
    }

    /// The external link stored at `group/key`.
    pub fn external_link(&self, group: &str, key: &str) -> Result<ExternalLink, ContainerError> {
        match self.group_children(group)?.get(key) {
            Some(Child::Link(link)) => Ok(link.clone()),
            Some(Child::Node(_)) => Err(ContainerError::NotFound(join_path(group, key))),
            None => Err(ContainerError::NotFound(join_path(group, key))),
        }
    }

    /// Remove the child (of any link kind) at `group/key`.
    pub fn delete_link(&mut self, group: &str, key: &str) -> Result<(), ContainerError> {
        self.ensure_writable()?;
        let children = self.group_children_mut(group)?;
        if children.remove(key).is_none() {
            return Err(ContainerError::NotFound(join_path(group, key)));
        }
        self.dirty = true;
        Ok(())
    }

    /// Store an external link at `group/key`. The key must be free.
    pub fn create_external_link(
        &mut self,
        group: &str,
        key: &str,
        target_file: &str,
        target_path: &str,
    ) -> Result<(), ContainerError> {
        self.ensure_writable()?;
        let children = self.group_children_mut(group)?;
        if children.contains_key(key) {
            return Err(ContainerError::AlreadyExists(join_path(group, key)));
        }
        children.insert(
            key.to_string(),
            Child::Link(ExternalLink {
                target_file: target_file.to_string(),
                target_path: target_path.to_string(),
            }),
        );
        self.dirty = true;
        Ok(())
    }

    /// Create a group (and any missing ancestors). Existing groups are fine;
    /// a dataset or link in the way is an error.
    pub fn create_group(&mut self, path: &str) -> Result<(), ContainerError> {
        self.ensure_writable()?;
        let mut node = &mut self.root;
        for comp in Self::components(path) {
            let Node::Group { children, .. } = node else {
                return Err(ContainerError::NotAGroup(path.to_string()));
            };
            node = match children
                .entry(comp.to_string())
                .or_insert_with(|| Child::Node(Node::empty_group()))
            {
                Child::Node(n) => n,
                Child::Link(_) => {
                    return Err(ContainerError::CrossesExternalLink(path.to_string()))
                }
            };
        }
        if !matches!(node, Node::Group { .. }) {
            return Err(ContainerError::NotAGroup(path.to_string()));
        }
        self.dirty = true;
        Ok(())
    }

    /// Create a zero-filled dataset. Missing ancestor groups are created; the
    /// final key must be free.
    pub fn create_dataset(
        &mut self,
        path: &str,
        shape: &[u64],
        element_type: ElementType,
        chunk_shape: Option<&[u64]>,
        max_shape: Option<&[Option<u64>]>,
    ) -> Result<(), ContainerError> {
        self.ensure_writable()?;
        let comps: Vec<&str> = Self::components(path).collect();
        let Some((leaf, parents)) = comps.split_last() else {
            return Err(ContainerError::AlreadyExists("/".to_string()));
        };
        let parent = parents.join("/");
        self.create_group(&parent)?;
        let children = self.group_children_mut(&parent)?;
        if children.contains_key(*leaf) {
            return Err(ContainerError::AlreadyExists(path.to_string()));
        }
        let len = element_count(shape) as usize;
        children.insert(
            leaf.to_string(),
            Child::Node(Node::Dataset {
                attrs: BTreeMap::new(),
                shape: shape.to_vec(),
                element_type,
                chunk_shape: chunk_shape.map(|c| c.to_vec()),
                max_shape: max_shape.map(|m| m.to_vec()),
                data: DataBlock::zeroed(element_type, len),
            }),
        );
        self.dirty = true;
        Ok(())
    }

    /// Descriptor of the dataset at `path`.
    pub fn dataset(&self, path: &str) -> Result<DatasetDescriptor, ContainerError> {
        match self.resolve(path)? {
            Node::Dataset {
                shape,
                element_type,
                chunk_shape,
                max_shape,
                ..
            } => Ok(DatasetDescriptor {
                path: path.to_string(),
                shape: shape.clone(),
                element_type: *element_type,
                chunk_shape: chunk_shape.clone(),
                max_shape: max_shape.clone(),
            }),
            Node::Group { .. } => Err(ContainerError::NotADataset(path.to_string())),
        }
    }

    /// Read the hyperslab `(offset, count)` of the dataset at `path`.
    pub fn read_slice(
        &self,
        path: &str,
        offset: &[u64],
        count: &[u64],
    ) -> Result<DataBlock, ContainerError> {
        match self.resolve(path)? {
            Node::Dataset { shape, data, .. } => {
                let ranges = slab_ranges(shape, offset, count)?;
                Ok(data.gather(&ranges))
            }
            Node::Group { .. } => Err(ContainerError::NotADataset(path.to_string())),
        }
    }

    /// Write `block` into the hyperslab `(offset, count)` of the dataset.
    pub fn write_slice(
        &mut self,
        path: &str,
        offset: &[u64],
        count: &[u64],
        block: &DataBlock,
    ) -> Result<(), ContainerError> {
        self.ensure_writable()?;
        match self.resolve_mut(path)? {
            Node::Dataset { shape, data, .. } => {
                let ranges = slab_ranges(shape, offset, count)?;
                block.scatter_into(data, &ranges)?;
            }
            Node::Group { .. } => return Err(ContainerError::NotADataset(path.to_string())),
        }
        self.dirty = true;
        Ok(())
    }

    /// Read the whole dataset as one block.
    pub fn read_all(&self, path: &str) -> Result<DataBlock, ContainerError> {
        match self.resolve(path)? {
            Node::Dataset { data, .. } => Ok(data.clone()),
            Node::Group { .. } => Err(ContainerError::NotADataset(path.to_string())),
        }
    }

    /// Overwrite the whole dataset with one block of matching type/length.
    pub fn write_all(&mut self, path: &str, block: &DataBlock) -> Result<(), ContainerError> {
        let desc = self.dataset(path)?;
        let offset = vec![0u64; desc.shape.len()];
        self.write_slice(path, &offset, &desc.shape, block)
    }

    /// Attribute names on the node at `path`, sorted.
    pub fn attr_names(&self, path: &str) -> Result<Vec<String>, ContainerError> {
        Ok(self.resolve(path)?.attrs().keys().cloned().collect())
    }

    pub fn get_attr(&self, path: &str, name: &str) -> Result<AttrValue, ContainerError> {
        self.resolve(path)?
            .attrs()
            .get(name)
            .cloned()
            .ok_or_else(|| ContainerError::NotFound(format!("{path}@{name}")))
    }

    /// Set an attribute (last write wins).
    pub fn set_attr(
        &mut self,
        path: &str,
        name: &str,
        value: AttrValue,
    ) -> Result<(), ContainerError> {
        self.ensure_writable()?;
        self.resolve_mut(path)?
            .attrs_mut()
            .insert(name.to_string(), value);
        self.dirty = true;
        Ok(())
    }

    /// Structural visit: every hard-linked group and dataset below the root,
    /// preorder, absolute paths. The root itself is not reported, and external
    /// links are invisible here; callers that care about them must enumerate
    /// group children and classify link kinds themselves.
    pub fn visit<F: FnMut(&str, NodeClass)>(&self, mut f: F) {
        fn walk<F: FnMut(&str, NodeClass)>(node: &Node, prefix: &str, f: &mut F) {
            let Node::Group { children, .. } = node else {
                return;
            };
            for (name, child) in children {
                let Child::Node(n) = child else {
                    continue;
                };
                let path = format!("{prefix}/{name}");
                match n {
                    Node::Group { .. } => {
                        f(&path, NodeClass::Group);
                        walk(n, &path, f);
                    }
                    Node::Dataset { .. } => f(&path, NodeClass::Dataset),
                }
            }
        }
        walk(&self.root, "", &mut f);
    }
}

impl Drop for Store {
    fn drop(&mut self) {
        if self.dirty && self.mode != Mode::Read {
            if let Err(e) = self.flush() {
                warn!(path = %self.path.display(), error = %e, "flush on drop failed");
            }
        }
    }
}

fn join_path(group: &str, key: &str) -> String {
    if group.is_empty() || group == "/" {
        format!("/{key}")
    } else {
        format!("{}/{key}", group.trim_end_matches('/'))
    }
}
