//! Fallible database transactions.
//!
//! [`RealtimeDb::transaction`] only knows "commit this value" or "abort".
//! Store edits also need to say *why* they aborted (unknown project, index
//! out of range), so the update closure reports failures through a shared
//! slot that is inspected once the transaction settles.

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

use crate::db::{DbPath, RealtimeDb};
use crate::error::{StoreError, StoreResult};

/// Run `update` as a transaction at `path`.
///
/// `update` returns `Ok(Some(value))` to commit, `Ok(None)` to abort as a
/// no-op, and `Err` to abort with that error. The closure may run more than
/// once; only the outcome of the final attempt counts. Returns whether the
/// transaction committed.
pub async fn try_transaction<F>(db: &dyn RealtimeDb, path: &DbPath, mut update: F) -> StoreResult<bool>
where
    F: FnMut(Value) -> StoreResult<Option<Value>> + Send + 'static,
{
    let failure: Arc<Mutex<Option<StoreError>>> = Arc::default();
    let slot = Arc::clone(&failure);

    let committed = db
        .transaction(
            path,
            Box::new(move |current| match update(current) {
                Ok(next) => {
                    *slot.lock() = None;
                    next
                }
                Err(e) => {
                    *slot.lock() = Some(e);
                    None
                }
            }),
        )
        .await?;

    match failure.lock().take() {
        Some(e) => Err(e),
        None => Ok(committed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryDatabase;
    use serde_json::json;

    #[tokio::test]
    async fn test_commit_abort_and_failure() {
        let db = MemoryDatabase::new();
        let path = DbPath::parse("n").unwrap();

        let committed = try_transaction(&db, &path, |_| Ok(Some(json!(1)))).await.unwrap();
        assert!(committed);

        let committed = try_transaction(&db, &path, |_| Ok(None)).await.unwrap();
        assert!(!committed);

        let err = try_transaction(&db, &path, |_| Err(StoreError::out_of_bounds(4, 1)))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::IndexOutOfBounds { index: 4, len: 1 }));
        assert_eq!(db.get(&path).await.unwrap(), json!(1));
    }

    #[tokio::test]
    async fn test_offline_is_remote_unavailable() {
        let db = MemoryDatabase::new();
        db.set_online(false);
        let err = try_transaction(&db, &DbPath::root(), |_| Ok(None)).await.unwrap_err();
        assert!(matches!(err, StoreError::RemoteUnavailable(_)));
    }
}
