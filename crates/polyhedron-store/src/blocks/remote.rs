//! Block backend mirrored against the realtime database.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use polyhedron_types::{Block, BlockField, BlockId, BlockRecord};
use serde_json::Value;

use super::BlockBackend;
use crate::config::StoreConfig;
use crate::db::{DbPath, Listener, RealtimeDb, Snapshot, Subscription};
use crate::error::{StoreError, StoreResult};
use crate::paths::BlockPaths;
use crate::state::Collection;
use crate::txn::try_transaction;

/// Blocks stored in the database, mirrored into a local read model.
///
/// One standing subscription on the block collection replaces the read model
/// with every snapshot (last snapshot wins, no merge). Mutations write to the
/// database and return; their effect shows up when the snapshot arrives.
pub struct RemoteBlocks {
    db: Arc<dyn RealtimeDb>,
    paths: Option<BlockPaths>,
    blocks: Collection<Block>,
    initialized: Arc<AtomicBool>,
    _subscription: Option<Subscription>,
}

impl RemoteBlocks {
    /// Resolve the collection path and start mirroring it.
    pub fn attach(config: &StoreConfig, db: Arc<dyn RealtimeDb>) -> StoreResult<Self> {
        let blocks = Collection::new();
        let initialized = Arc::new(AtomicBool::new(false));
        let paths = BlockPaths::new(config, config.user_id.as_deref())?;

        let subscription = match &paths {
            Some(paths) => {
                let sink = blocks.clone();
                let flag = Arc::clone(&initialized);
                let listener: Listener = Arc::new(move |snapshot: Snapshot| {
                    sink.replace(decode_blocks(&snapshot));
                    flag.store(true, Ordering::SeqCst);
                });
                tracing::debug!(path = %paths.collection(), "attaching block listener");
                Some(db.subscribe(paths.collection(), listener)?)
            }
            None => {
                tracing::warn!("blocks are namespaced per user but no user is signed in; block store is inert");
                None
            }
        };

        Ok(Self {
            db,
            paths,
            blocks,
            initialized,
            _subscription: subscription,
        })
    }

    fn paths(&self) -> StoreResult<&BlockPaths> {
        self.paths
            .as_ref()
            .ok_or_else(|| StoreError::remote_unavailable("no signed-in user"))
    }

    /// Location of one block; an id that is not a single key names no block.
    fn block_path(&self, id: &BlockId) -> StoreResult<Option<DbPath>> {
        match self.paths()?.block(id) {
            Ok(path) => Ok(Some(path)),
            Err(e) => {
                tracing::debug!(block_id = %id, error = %e, "id does not name a block");
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl BlockBackend for RemoteBlocks {
    async fn add_block(&self) -> StoreResult<BlockId> {
        let paths = self.paths()?;
        let record = serde_json::to_value(BlockRecord::empty(polyhedron_types::now_millis()))?;
        let key = self
            .db
            .push(paths.collection(), record)
            .await
            .inspect_err(|e| tracing::debug!(error = %e, "add_block failed"))?;
        tracing::debug!(block_id = %key, "pushed block");
        Ok(BlockId::new(key))
    }

    async fn remove_block(&self, id: &BlockId) -> StoreResult<()> {
        let Some(path) = self.block_path(id)? else {
            return Ok(());
        };
        self.db
            .remove(&path)
            .await
            .inspect_err(|e| tracing::debug!(block_id = %id, error = %e, "remove_block failed"))?;
        tracing::debug!(block_id = %id, "removed block");
        Ok(())
    }

    async fn update_block_field_text(
        &self,
        id: &BlockId,
        field: BlockField,
        text: &str,
    ) -> StoreResult<()> {
        let path = self
            .block_path(id)?
            .ok_or_else(|| StoreError::BlockNotFound(id.clone()))?;
        let missing = id.clone();
        let text = text.to_string();

        // Checked inside the transaction so an unknown id never gets a
        // partial record.
        try_transaction(self.db.as_ref(), &path, move |current| {
            let Value::Object(mut record) = current else {
                return Err(StoreError::BlockNotFound(missing.clone()));
            };
            record.insert(field.as_str().to_string(), Value::String(text.clone()));
            Ok(Some(Value::Object(record)))
        })
        .await
        .inspect_err(|e| tracing::debug!(block_id = %id, error = %e, "update_block_field_text failed"))?;
        tracing::debug!(block_id = %id, %field, "updated block field");
        Ok(())
    }

    fn collection(&self) -> &Collection<Block> {
        &self.blocks
    }

    fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }
}

/// Rebuild the block list from a collection snapshot, in database key order.
fn decode_blocks(snapshot: &Snapshot) -> Vec<Block> {
    snapshot
        .children()
        .into_iter()
        .filter_map(|(key, value)| {
            match serde_json::from_value::<BlockRecord>(value.clone()) {
                Ok(record) => Some(record.into_block(BlockId::new(key))),
                Err(e) => {
                    tracing::warn!(block_id = key, error = %e, "skipping undecodable block");
                    None
                }
            }
        })
        .collect()
}
