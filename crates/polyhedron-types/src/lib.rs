//! Shared block and project types for Polyhedron.
//!
//! This crate is the data foundation: typed IDs, blocks, projects, and the
//! key-path utility used to address nested project attributes. It has **no
//! internal polyhedron dependencies**, a pure leaf crate that the store and
//! the CLI build on.
//!
//! # Entity Overview
//!
//! ```text
//! Block (BlockId)    ← reusable content: title, desc, body
//!
//! Project (ProjectId)
//!     └── meta: time, title, desc
//!     └── block_ids: ordered references to Blocks (display order)
//!
//! Active project     ← Option<ProjectId>, owned by the project store
//! ```
//!
//! # Key Types
//!
//! |-------------------|----------------------------------------------|
//! | Type              | Purpose                                      |
//! |-------------------|----------------------------------------------|
//! | [`BlockId`]       | Opaque block key (timestamp or push key)     |
//! | [`ProjectId`]     | Opaque project key (same scheme)             |
//! | [`Block`]         | Block content snapshot                       |
//! | [`BlockField`]    | Mutable text fields of a block               |
//! | [`Project`]       | Project metadata + ordered block ids         |
//! | [`FieldPath`]     | Dot-delimited path into project attributes   |
//! |-------------------|----------------------------------------------|

pub mod block;
pub mod ids;
pub mod path;
pub mod project;

pub use block::{Block, BlockField, BlockRecord};
pub use ids::{BlockId, LocalIdGenerator, ProjectId};
pub use path::{FieldPath, PathError, lookup, set_key_value};
pub use project::{Project, ProjectMeta, ProjectRecord};

/// Current time as Unix milliseconds. Used by constructors throughout the crate.
pub fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
