//! In-process block backend.

use async_trait::async_trait;
use polyhedron_types::{Block, BlockField, BlockId, LocalIdGenerator};

use super::BlockBackend;
use crate::error::{StoreError, StoreResult};
use crate::state::Collection;

/// Blocks held in process, in insertion order.
///
/// Ids are stringified creation timestamps, bumped so that two adds within
/// one millisecond still get distinct ids.
#[derive(Default)]
pub struct LocalBlocks {
    ids: LocalIdGenerator,
    blocks: Collection<Block>,
}

impl LocalBlocks {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlockBackend for LocalBlocks {
    async fn add_block(&self) -> StoreResult<BlockId> {
        let (time, key) = self.ids.next_key();
        let id = BlockId::new(key);
        let block = Block::empty(id.clone(), time);
        self.blocks.try_update(|blocks| {
            blocks.push(block);
            Ok(())
        })?;
        tracing::debug!(block_id = %id, "added block");
        Ok(id)
    }

    async fn remove_block(&self, id: &BlockId) -> StoreResult<()> {
        self.blocks.try_update(|blocks| {
            blocks.retain(|b| &b.id != id);
            Ok(())
        })?;
        tracing::debug!(block_id = %id, "removed block");
        Ok(())
    }

    async fn update_block_field_text(
        &self,
        id: &BlockId,
        field: BlockField,
        text: &str,
    ) -> StoreResult<()> {
        self.blocks.try_update(|blocks| {
            let block = blocks
                .iter_mut()
                .find(|b| &b.id == id)
                .ok_or_else(|| StoreError::BlockNotFound(id.clone()))?;
            block.set_field(field, text);
            Ok(())
        })?;
        tracing::debug!(block_id = %id, %field, "updated block field");
        Ok(())
    }

    fn collection(&self) -> &Collection<Block> {
        &self.blocks
    }

    fn is_initialized(&self) -> bool {
        true
    }
}
