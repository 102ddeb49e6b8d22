//! The migration engine: mapping resolution, link discovery, chunk-bounded
//! dataset transfer, hierarchy replication, link rewriting, and the
//! orchestrator that sequences them per migration mode.

pub mod chunks;
pub mod mapping;
pub mod orchestrate;
pub mod relink;
pub mod replicate;
pub mod transfer;
pub mod walker;

pub use chunks::{ChunkGrid, ChunkSpan};
pub use mapping::{scan_prefix, FileRecord, MigrationMode, MigrationPlan, Role};
pub use orchestrate::{Failure, Migration, MigrationReport, MigrationState};
pub use relink::{rewrite_links, RelinkSummary};
pub use replicate::{replicate, ReplicaSummary};
pub use transfer::copy_dataset;
pub use walker::{collect_external_links, external_link_files, LinkReference};
