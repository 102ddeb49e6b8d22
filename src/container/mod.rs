//! Hierarchical container collaborator.
//!
//! The migration engine only ever talks to the operations defined here:
//! open/create, child listing and link classification, group/dataset creation,
//! slice I/O, attributes, and external-link management. The backing format
//! (`store`) persists a node tree via serde; the structural `visit` primitive
//! deliberately mirrors the library behavior the engine has to work around:
//! it reports hard-linked groups and datasets only and is blind to external
//! links.

mod data;
mod store;

pub use data::{element_count, slab_ranges, AttrValue, DataBlock, ElementType};
pub use store::{Mode, Store, FORMAT_TAG};

use std::path::PathBuf;
use thiserror::Error;

/// Structural class of a hard-linked node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeClass {
    Group,
    Dataset,
}

/// How a group child is linked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    HardGroup,
    HardDataset,
    External,
}

/// A reference stored inside one container that resolves into a different
/// container file.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ExternalLink {
    pub target_file: String,
    pub target_path: String,
}

/// Shape/type/layout description of a dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetDescriptor {
    pub path: String,
    pub shape: Vec<u64>,
    pub element_type: ElementType,
    pub chunk_shape: Option<Vec<u64>>,
    /// Extensibility bound per dimension; `None` in a slot means unlimited.
    pub max_shape: Option<Vec<Option<u64>>>,
}

#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("No such node: {0}")]
    NotFound(String),

    #[error("Not a group: {0}")]
    NotAGroup(String),

    #[error("Not a dataset: {0}")]
    NotADataset(String),

    #[error("Node already exists: {0}")]
    AlreadyExists(String),

    #[error("Path crosses an external link: {0}")]
    CrossesExternalLink(String),

    #[error("Container opened read-only: {0}")]
    ReadOnly(PathBuf),

    #[error("Element type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: ElementType,
        found: ElementType,
    },

    #[error("Rank mismatch: expected {expected}, found {found}")]
    RankMismatch { expected: usize, found: usize },

    #[error("Hyperslab {offset:?}+{count:?} out of bounds for shape {shape:?}")]
    OutOfBounds {
        offset: Vec<u64>,
        count: Vec<u64>,
        shape: Vec<u64>,
    },

    #[error("Slice covers {expected} elements but block holds {found}")]
    ShapeMismatch { expected: usize, found: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not a container file (bad or missing format tag): {0}")]
    Format(String),
}
