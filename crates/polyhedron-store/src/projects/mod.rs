//! Project store.
//!
//! Owns the collection of projects (each an ordered list of block ids plus
//! metadata) and the active-project pointer. Like the block store, the
//! backend is chosen once at construction:
//!
//! - [`LocalProjects`] - in-process collection
//! - [`RemoteProjects`] - mirrored against a [`RealtimeDb`] through two
//!   independent subscriptions (projects subtree and active pointer)
//!
//! List positions follow `Vec` semantics: inserting at `i` shifts the item
//! at `i` and everything after it by one; a move removes the item first and
//! then inserts it at the destination index.

mod local;
mod remote;

use std::sync::Arc;

use async_trait::async_trait;
use polyhedron_types::{BlockId, FieldPath, Project, ProjectId};
use tokio::sync::watch;

use crate::config::StoreConfig;
use crate::db::RealtimeDb;
use crate::error::{StoreError, StoreResult};
use crate::state::{Collection, CollectionReceiver, Pointer};

pub use local::LocalProjects;
pub use remote::RemoteProjects;

/// Storage strategy behind a [`ProjectStore`].
#[async_trait]
pub trait ProjectBackend: Send + Sync {
    // ========================================================================
    // Projects
    // ========================================================================

    /// Create an empty project and make it active.
    async fn add_project(&self) -> StoreResult<ProjectId>;

    /// Delete a project. Removing an absent id succeeds and changes nothing.
    ///
    /// The active pointer is left alone, even when it names this project.
    async fn remove_project(&self, id: &ProjectId) -> StoreResult<()>;

    /// Replace the text attribute at `path` (`meta.title`, `meta.desc`).
    async fn update_project_field_text(
        &self,
        id: &ProjectId,
        path: &FieldPath,
        text: &str,
    ) -> StoreResult<()>;

    // ========================================================================
    // Block lists
    // ========================================================================

    /// Insert `block_id` at `to_index`, or append when `None`.
    async fn add_block_id_to_project(
        &self,
        id: &ProjectId,
        block_id: BlockId,
        to_index: Option<usize>,
    ) -> StoreResult<()>;

    /// Remove `block_id` from one project's list.
    async fn remove_block_id_from_project(
        &self,
        id: &ProjectId,
        block_id: &BlockId,
    ) -> StoreResult<()>;

    /// Remove every occurrence of `block_id` from every project.
    async fn remove_block_id_from_all_projects(&self, block_id: &BlockId) -> StoreResult<()>;

    /// Move the block at `from_index` to `to_index`.
    async fn reorder_blocks_in_project(
        &self,
        id: &ProjectId,
        from_index: usize,
        to_index: usize,
    ) -> StoreResult<()>;

    // ========================================================================
    // Active pointer
    // ========================================================================

    /// Set or clear the active project. Not validated against the collection.
    async fn assign_active_project_id(&self, id: Option<ProjectId>) -> StoreResult<()>;

    // ========================================================================
    // Read model
    // ========================================================================

    fn collection(&self) -> &Collection<Project>;

    fn active(&self) -> &Pointer<ProjectId>;

    /// Whether both the collection and the pointer have been populated.
    fn is_initialized(&self) -> bool;
}

/// The project store.
pub struct ProjectStore {
    backend: Box<dyn ProjectBackend>,
}

impl ProjectStore {
    /// Wrap an existing backend.
    pub fn new(backend: impl ProjectBackend + 'static) -> Self {
        Self {
            backend: Box::new(backend),
        }
    }

    /// A store holding projects in process.
    pub fn local() -> Self {
        Self::new(LocalProjects::new())
    }

    /// A store mirrored against `db`.
    pub fn remote(config: &StoreConfig, db: Arc<dyn RealtimeDb>) -> StoreResult<Self> {
        Ok(Self::new(RemoteProjects::attach(config, db)?))
    }

    /// Pick the backend for the configured mode.
    pub fn open(config: &StoreConfig, db: Option<Arc<dyn RealtimeDb>>) -> StoreResult<Self> {
        if !config.mode.is_remote() {
            return Ok(Self::local());
        }
        let db = db.ok_or_else(|| StoreError::remote_unavailable("no database handle"))?;
        Self::remote(config, db)
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    pub async fn add_project(&self) -> StoreResult<ProjectId> {
        self.backend.add_project().await
    }

    pub async fn remove_project(&self, id: &ProjectId) -> StoreResult<()> {
        self.backend.remove_project(id).await
    }

    pub async fn update_project_field_text(
        &self,
        id: &ProjectId,
        path: &FieldPath,
        text: &str,
    ) -> StoreResult<()> {
        self.backend.update_project_field_text(id, path, text).await
    }

    /// Like [`Self::update_project_field_text`], with a dotted path string.
    pub async fn update_project_field_by_path(
        &self,
        id: &ProjectId,
        path: &str,
        text: &str,
    ) -> StoreResult<()> {
        let path: FieldPath = path.parse()?;
        self.update_project_field_text(id, &path, text).await
    }

    pub async fn add_block_id_to_project(
        &self,
        id: &ProjectId,
        block_id: BlockId,
        to_index: Option<usize>,
    ) -> StoreResult<()> {
        self.backend.add_block_id_to_project(id, block_id, to_index).await
    }

    pub async fn remove_block_id_from_project(
        &self,
        id: &ProjectId,
        block_id: &BlockId,
    ) -> StoreResult<()> {
        self.backend.remove_block_id_from_project(id, block_id).await
    }

    pub async fn remove_block_id_from_all_projects(&self, block_id: &BlockId) -> StoreResult<()> {
        self.backend.remove_block_id_from_all_projects(block_id).await
    }

    pub async fn reorder_blocks_in_project(
        &self,
        id: &ProjectId,
        from_index: usize,
        to_index: usize,
    ) -> StoreResult<()> {
        self.backend
            .reorder_blocks_in_project(id, from_index, to_index)
            .await
    }

    pub async fn assign_active_project_id(&self, id: Option<ProjectId>) -> StoreResult<()> {
        self.backend.assign_active_project_id(id).await
    }

    // ========================================================================
    // Read model
    // ========================================================================

    /// Current projects in collection order.
    pub fn projects(&self) -> Arc<Vec<Project>> {
        self.backend.collection().snapshot()
    }

    pub fn project(&self, id: &ProjectId) -> Option<Project> {
        self.projects().iter().find(|p| &p.id == id).cloned()
    }

    pub fn active_project_id(&self) -> Option<ProjectId> {
        self.backend.active().get()
    }

    /// The active project, if the pointer names one in the collection.
    pub fn active_project(&self) -> Option<Project> {
        self.active_project_id().and_then(|id| self.project(&id))
    }

    /// Observe each replacement of the collection.
    pub fn subscribe(&self) -> CollectionReceiver<Project> {
        self.backend.collection().subscribe()
    }

    /// Observe changes of the active pointer.
    pub fn subscribe_active(&self) -> watch::Receiver<Option<ProjectId>> {
        self.backend.active().subscribe()
    }

    pub fn is_initialized(&self) -> bool {
        self.backend.is_initialized()
    }
}
