//! Polyhedron state layer.
//!
//! Two peer stores mirror the editor's collections against an optional
//! realtime database:
//!
//! - [`BlockStore`] owns reusable content blocks
//! - [`ProjectStore`] owns projects (ordered block-id lists) and the
//!   active-project pointer
//!
//! [`EditorSession`] constructs both from one [`StoreConfig`] and hosts the
//! operations that span them. In `memory` mode the stores keep everything in
//! process. In `firebase` mode every mutation is written to the database and
//! the read model is rebuilt from snapshot notifications, so a mutation's
//! effect is observed through the read model rather than its return value.
//!
//! # Example
//!
//! ```no_run
//! use polyhedron_store::{EditorSession, StoreResult};
//!
//! async fn demo() -> StoreResult<()> {
//!     let session = EditorSession::local();
//!     let project = session.projects().add_project().await?;
//!     let block = session.add_block_to_project(&project).await?;
//!     assert_eq!(session.project_blocks(&project)[0].id, block);
//!     Ok(())
//! }
//! ```

pub mod blocks;
pub mod config;
pub mod constants;
pub mod db;
pub mod error;
pub mod order;
pub mod paths;
pub mod projects;
pub mod session;
pub mod state;
mod txn;

pub use blocks::{BlockBackend, BlockStore, LocalBlocks, RemoteBlocks};
pub use config::{ConfigError, Mode, StoreConfig};
pub use db::{DbError, DbPath, MemoryDatabase, RealtimeDb, Snapshot, Subscription};
pub use error::{StoreError, StoreResult};
pub use projects::{LocalProjects, ProjectBackend, ProjectStore, RemoteProjects};
pub use session::{BlockMove, EditorSession, SessionState};

pub use polyhedron_types::{Block, BlockField, BlockId, FieldPath, Project, ProjectId};
