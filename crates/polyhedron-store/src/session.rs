//! Editor session: the composition root owning both stores.
//!
//! The stores are independent peers. Anything that spans them (deleting a
//! block everywhere, creating a block straight into a project, resolving a
//! project's ids to blocks) lives here.

use std::sync::Arc;

use polyhedron_types::{Block, BlockId, Project, ProjectId};
use serde::{Deserialize, Serialize};

use crate::blocks::BlockStore;
use crate::config::{Mode, StoreConfig};
use crate::db::RealtimeDb;
use crate::error::{StoreError, StoreResult};
use crate::projects::ProjectStore;

/// Outcome of a drag-and-drop onto a project's block list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockMove {
    /// A block dragged in from the library, inserted at `to_index`.
    FromLibrary { block_id: BlockId, to_index: usize },
    /// A block dragged within the project.
    WithinProject { from_index: usize, to_index: usize },
}

/// Point-in-time view of everything a session holds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SessionState {
    pub mode: Mode,
    pub blocks: Vec<Block>,
    pub projects: Vec<Project>,
    pub active_project: Option<ProjectId>,
}

/// Both stores, constructed once from one configuration.
pub struct EditorSession {
    config: StoreConfig,
    blocks: BlockStore,
    projects: ProjectStore,
}

impl EditorSession {
    /// Build both stores for the configured mode.
    ///
    /// Remote mode needs a database handle; without one this fails with
    /// `RemoteUnavailable`. The handle is shared by every subscription.
    pub fn open(config: &StoreConfig, db: Option<Arc<dyn RealtimeDb>>) -> StoreResult<Self> {
        if config.mode.is_remote() && db.is_none() {
            return Err(StoreError::remote_unavailable("remote mode without a database handle"));
        }
        let blocks = BlockStore::open(config, db.clone())?;
        let projects = ProjectStore::open(config, db)?;
        tracing::info!(mode = %config.mode, user = ?config.user_id, "opened editor session");
        Ok(Self {
            config: config.clone(),
            blocks,
            projects,
        })
    }

    /// A session with both stores in process.
    pub fn local() -> Self {
        Self {
            config: StoreConfig::default(),
            blocks: BlockStore::local(),
            projects: ProjectStore::local(),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn blocks(&self) -> &BlockStore {
        &self.blocks
    }

    pub fn projects(&self) -> &ProjectStore {
        &self.projects
    }

    pub fn is_initialized(&self) -> bool {
        self.blocks.is_initialized() && self.projects.is_initialized()
    }

    // ========================================================================
    // Cross-store operations
    // ========================================================================

    /// Delete a block and every reference to it.
    pub async fn delete_block(&self, id: &BlockId) -> StoreResult<()> {
        self.blocks.remove_block(id).await?;
        self.projects.remove_block_id_from_all_projects(id).await?;
        tracing::debug!(block_id = %id, "deleted block");
        Ok(())
    }

    /// Create an empty block and append it to `project`.
    pub async fn add_block_to_project(&self, project: &ProjectId) -> StoreResult<BlockId> {
        if self.projects.project(project).is_none() {
            return Err(StoreError::ProjectNotFound(project.clone()));
        }
        let id = self.blocks.add_block().await?;
        self.projects
            .add_block_id_to_project(project, id.clone(), None)
            .await?;
        Ok(id)
    }

    /// Apply a drag-and-drop result to `project`.
    pub async fn apply_move(&self, project: &ProjectId, change: BlockMove) -> StoreResult<()> {
        match change {
            BlockMove::FromLibrary { block_id, to_index } => {
                self.projects
                    .add_block_id_to_project(project, block_id, Some(to_index))
                    .await
            }
            BlockMove::WithinProject {
                from_index,
                to_index,
            } => {
                self.projects
                    .reorder_blocks_in_project(project, from_index, to_index)
                    .await
            }
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// A project's blocks in display order.
    ///
    /// Ids with no block in the collection are skipped; duplicates repeat.
    pub fn project_blocks(&self, project: &ProjectId) -> Vec<Block> {
        let Some(project) = self.projects.project(project) else {
            return Vec::new();
        };
        let blocks = self.blocks.blocks();
        project
            .block_ids
            .iter()
            .filter_map(|id| blocks.iter().find(|b| &b.id == id).cloned())
            .collect()
    }

    pub fn active_project(&self) -> Option<Project> {
        self.projects.active_project()
    }

    /// Copy of the current read models.
    pub fn state(&self) -> SessionState {
        SessionState {
            mode: self.config.mode,
            blocks: self.blocks.blocks().as_ref().clone(),
            projects: self.projects.projects().as_ref().clone(),
            active_project: self.projects.active_project_id(),
        }
    }
}
