//! In-memory realtime database.
//!
//! Used for testing and by the CLI (optionally persisted to a JSON file).
//! Behaves like the remote database as far as the stores can tell: JSON tree,
//! push keys, `Null` removes, empty objects vanish, arrays are stored as
//! index-keyed objects, and listeners receive whole-value snapshots only when
//! their value actually changed.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde_json::{Map, Value};

use super::{
    DbError, DbPath, DbResult, Listener, PushIdGenerator, RealtimeDb, Snapshot, Subscription,
    TransactionFn,
};

/// A registered listener and the last value it was sent.
struct Registration {
    path: DbPath,
    listener: Listener,
    last: Value,
}

struct Inner {
    /// Whole tree; `Null` when empty.
    tree: RwLock<Value>,
    listeners: Mutex<BTreeMap<u64, Registration>>,
    next_listener: AtomicU64,
    keys: PushIdGenerator,
    online: AtomicBool,
}

/// In-memory realtime database.
///
/// Thread-safe via internal locks. Cloning shares the same tree. All data is
/// lost when the last clone drops unless exported first.
#[derive(Clone)]
pub struct MemoryDatabase {
    inner: Arc<Inner>,
}

impl Default for MemoryDatabase {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDatabase {
    /// Create an empty, online database.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                tree: RwLock::new(Value::Null),
                listeners: Mutex::new(BTreeMap::new()),
                next_listener: AtomicU64::new(0),
                keys: PushIdGenerator::new(),
                online: AtomicBool::new(true),
            }),
        }
    }

    /// Create a database holding `tree`.
    pub fn with_tree(tree: Value) -> Self {
        let db = Self::new();
        *db.inner.tree.write() = normalize(tree);
        db
    }

    /// Take the database offline (every read and write fails) or back online.
    pub fn set_online(&self, online: bool) {
        tracing::debug!(online, "memory database connectivity changed");
        self.inner.online.store(online, Ordering::SeqCst);
    }

    /// Whether reads and writes currently succeed.
    pub fn is_online(&self) -> bool {
        self.inner.online.load(Ordering::SeqCst)
    }

    /// Copy of the whole tree.
    pub fn export(&self) -> Value {
        self.inner.tree.read().clone()
    }

    /// Replace the whole tree, notifying every listener whose value changed.
    pub fn import(&self, tree: Value) {
        let mut guard = self.inner.tree.write();
        *guard = normalize(tree);
        self.inner.notify(&guard, &DbPath::root());
    }

    /// Number of live subscriptions.
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.lock().len()
    }

    fn ensure_online(&self) -> DbResult<()> {
        if self.is_online() {
            Ok(())
        } else {
            Err(DbError::Offline)
        }
    }

    fn write(&self, path: &DbPath, value: Value) {
        let mut tree = self.inner.tree.write();
        write_at(&mut tree, path.segments(), normalize(value));
        tracing::trace!(path = %path, "memory database write");
        self.inner.notify(&tree, path);
    }
}

impl Inner {
    /// Deliver snapshots to listeners affected by a write at `changed`.
    ///
    /// Called with the tree lock held so deliveries arrive in write order.
    fn notify(&self, tree: &Value, changed: &DbPath) {
        let mut deliveries = Vec::new();
        {
            let mut listeners = self.listeners.lock();
            for registration in listeners.values_mut() {
                if !registration.path.overlaps(changed) {
                    continue;
                }
                let current = read_at(tree, &registration.path);
                if current != registration.last {
                    registration.last = current.clone();
                    deliveries.push((
                        registration.listener.clone(),
                        Snapshot {
                            path: registration.path.clone(),
                            value: current,
                        },
                    ));
                }
            }
        }
        for (listener, snapshot) in deliveries {
            tracing::trace!(path = %snapshot.path, "delivering snapshot");
            listener(snapshot);
        }
    }

    fn unsubscribe(&self, id: u64) {
        self.listeners.lock().remove(&id);
    }
}

#[async_trait]
impl RealtimeDb for MemoryDatabase {
    async fn get(&self, path: &DbPath) -> DbResult<Value> {
        self.ensure_online()?;
        Ok(read_at(&self.inner.tree.read(), path))
    }

    fn subscribe(&self, path: &DbPath, listener: Listener) -> DbResult<Subscription> {
        let tree = self.inner.tree.read();
        let current = read_at(&tree, path);
        let id = self.inner.next_listener.fetch_add(1, Ordering::SeqCst);
        self.inner.listeners.lock().insert(
            id,
            Registration {
                path: path.clone(),
                listener: listener.clone(),
                last: current.clone(),
            },
        );
        tracing::debug!(path = %path, id, "subscribed");

        // Initial value, delivered under the read lock so no write can
        // overtake it.
        listener(Snapshot {
            path: path.clone(),
            value: current,
        });
        drop(tree);

        let inner: Weak<Inner> = Arc::downgrade(&self.inner);
        Ok(Subscription::new(path.clone(), move || {
            if let Some(inner) = inner.upgrade() {
                inner.unsubscribe(id);
            }
        }))
    }

    async fn set(&self, path: &DbPath, value: Value) -> DbResult<()> {
        self.ensure_online()?;
        self.write(path, value);
        Ok(())
    }

    async fn push(&self, path: &DbPath, value: Value) -> DbResult<String> {
        self.ensure_online()?;
        let key = self.inner.keys.generate();
        self.write(&path.key(&key)?, value);
        Ok(key)
    }

    async fn transaction(&self, path: &DbPath, mut update: TransactionFn) -> DbResult<bool> {
        self.ensure_online()?;
        let mut tree = self.inner.tree.write();
        let current = read_at(&tree, path);
        match update(current) {
            Some(next) => {
                write_at(&mut tree, path.segments(), normalize(next));
                tracing::trace!(path = %path, "transaction committed");
                self.inner.notify(&tree, path);
                Ok(true)
            }
            None => {
                tracing::trace!(path = %path, "transaction aborted");
                Ok(false)
            }
        }
    }

    fn push_key(&self) -> String {
        self.inner.keys.generate()
    }
}

// ============================================================================
// Tree helpers
// ============================================================================

/// Clone of the value at `path`, `Null` when absent.
fn read_at(tree: &Value, path: &DbPath) -> Value {
    polyhedron_types::lookup(tree, path.segments())
        .cloned()
        .unwrap_or(Value::Null)
}

/// Store `value` (already normalized) at `segments`, creating parents on
/// write and pruning emptied parents on removal.
fn write_at(node: &mut Value, segments: &[String], value: Value) {
    let Some((head, rest)) = segments.split_first() else {
        *node = value;
        return;
    };

    if value.is_null() {
        if let Some(map) = node.as_object_mut() {
            if let Some(child) = map.get_mut(head) {
                write_at(child, rest, Value::Null);
                if child.is_null() {
                    map.remove(head);
                }
            }
            if map.is_empty() {
                *node = Value::Null;
            }
        }
        return;
    }

    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    if let Value::Object(map) = node {
        let child = map.entry(head.clone()).or_insert(Value::Null);
        write_at(child, rest, value);
    }
}

/// Database storage form: no nulls, no empty objects, arrays as
/// index-keyed objects.
fn normalize(value: Value) -> Value {
    let map: Map<String, Value> = match value {
        Value::Object(map) => map
            .into_iter()
            .map(|(k, v)| (k, normalize(v)))
            .filter(|(_, v)| !v.is_null())
            .collect(),
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(i, v)| (i.to_string(), normalize(v)))
            .filter(|(_, v)| !v.is_null())
            .collect(),
        scalar => return scalar,
    };
    if map.is_empty() {
        Value::Null
    } else {
        Value::Object(map)
    }
}
