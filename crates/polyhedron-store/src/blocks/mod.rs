//! Block store.
//!
//! Owns the collection of content blocks. The storage strategy is picked once
//! at construction:
//!
//! - [`LocalBlocks`] - in-process collection, ids from the local clock
//! - [`RemoteBlocks`] - mirrored against a [`RealtimeDb`]; the read model is
//!   rebuilt from whole-collection snapshots
//!
//! The block store never touches project lists. Cascading a removal into
//! projects is the caller's job (see `EditorSession::delete_block`).

mod local;
mod remote;

use std::sync::Arc;

use async_trait::async_trait;
use polyhedron_types::{Block, BlockField, BlockId, PathError};

use crate::config::StoreConfig;
use crate::db::RealtimeDb;
use crate::error::{StoreError, StoreResult};
use crate::state::{Collection, CollectionReceiver};

pub use local::LocalBlocks;
pub use remote::RemoteBlocks;

/// Storage strategy behind a [`BlockStore`].
#[async_trait]
pub trait BlockBackend: Send + Sync {
    /// Create a block with empty text fields and return its id.
    async fn add_block(&self) -> StoreResult<BlockId>;

    /// Delete a block. Removing an absent id succeeds and changes nothing.
    async fn remove_block(&self, id: &BlockId) -> StoreResult<()>;

    /// Replace one text field of an existing block.
    async fn update_block_field_text(
        &self,
        id: &BlockId,
        field: BlockField,
        text: &str,
    ) -> StoreResult<()>;

    /// The read model.
    fn collection(&self) -> &Collection<Block>;

    /// Whether the read model has been populated at least once.
    fn is_initialized(&self) -> bool;
}

/// The block store.
pub struct BlockStore {
    backend: Box<dyn BlockBackend>,
}

impl BlockStore {
    /// Wrap an existing backend.
    pub fn new(backend: impl BlockBackend + 'static) -> Self {
        Self {
            backend: Box::new(backend),
        }
    }

    /// A store holding blocks in process.
    pub fn local() -> Self {
        Self::new(LocalBlocks::new())
    }

    /// A store mirrored against `db`.
    pub fn remote(config: &StoreConfig, db: Arc<dyn RealtimeDb>) -> StoreResult<Self> {
        Ok(Self::new(RemoteBlocks::attach(config, db)?))
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

    pub async fn add_block(&self) -> StoreResult<BlockId> {
        self.backend.add_block().await
    }

    pub async fn remove_block(&self, id: &BlockId) -> StoreResult<()> {
        self.backend.remove_block(id).await
    }

    pub async fn update_block_field_text(
        &self,
        id: &BlockId,
        field: BlockField,
        text: &str,
    ) -> StoreResult<()> {
        self.backend.update_block_field_text(id, field, text).await
    }

    /// Like [`Self::update_block_field_text`], with the field given by name.
    pub async fn update_block_field_by_name(
        &self,
        id: &BlockId,
        field: &str,
        text: &str,
    ) -> StoreResult<()> {
        let field = BlockField::from_str(field).ok_or_else(|| PathError::Missing(field.to_string()))?;
        self.update_block_field_text(id, field, text).await
    }

    // ========================================================================
    // Read model
    // ========================================================================

    /// Current blocks in collection order.
    pub fn blocks(&self) -> Arc<Vec<Block>> {
        self.backend.collection().snapshot()
    }

    pub fn block(&self, id: &BlockId) -> Option<Block> {
        self.blocks().iter().find(|b| &b.id == id).cloned()
    }

    pub fn contains(&self, id: &BlockId) -> bool {
        self.blocks().iter().any(|b| &b.id == id)
    }

    /// Observe each replacement of the collection.
    pub fn subscribe(&self) -> CollectionReceiver<Block> {
        self.backend.collection().subscribe()
    }

    pub fn is_initialized(&self) -> bool {
        self.backend.is_initialized()
    }
}
