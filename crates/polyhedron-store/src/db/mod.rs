//! Realtime database abstraction.
//!
//! This module is the seam between the stores and a remote JSON-tree
//! database with push keys, path-scoped reads and writes, transactions, and
//! whole-value subscriptions. Key components:
//!
//! - [`RealtimeDb`] - Core trait for database operations
//! - [`MemoryDatabase`] - In-process implementation (testing, CLI)
//! - [`Subscription`] - Scoped listener registration, unsubscribes on drop
//! - [`PushIdGenerator`] - Time-ordered child keys
//!
//! ## Design Decisions
//!
//! - **Whole-value snapshots**: a listener always receives the complete
//!   current value at its path, never a delta. Consumers rebuild their state
//!   from each snapshot (last snapshot wins).
//! - **Callback delivery**: snapshots are delivered by invoking the listener
//!   from the database's notification mechanism. Listeners must not call
//!   back into the database.
//! - **Transactions for list rewrites**: read-modify-write of ordered lists
//!   goes through [`RealtimeDb::transaction`] so no writer observes a
//!   half-rewritten list.

mod error;
mod memory;
mod push_id;

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

pub use error::{DbError, DbResult};
pub use memory::MemoryDatabase;
pub use push_id::PushIdGenerator;

/// Characters a path segment may not contain.
const FORBIDDEN_KEY_CHARS: &[char] = &['.', '#', '$', '[', ']'];

// ============================================================================
// Paths
// ============================================================================

/// A `/`-separated location in the database tree.
///
/// The empty path is the root. Empty segments are dropped during parsing
/// (`"a//b"` is `a/b`), matching how the database normalizes paths.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct DbPath {
    segments: Vec<String>,
}

impl DbPath {
    /// The root of the tree.
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a `/`-separated path, validating every segment.
    pub fn parse(path: &str) -> DbResult<Self> {
        Self::root().child(path)
    }

    /// Descend by one or more `/`-separated segments.
    pub fn child(&self, path: impl AsRef<str>) -> DbResult<Self> {
        let mut segments = self.segments.clone();
        for segment in path.as_ref().split('/').filter(|s| !s.is_empty()) {
            if segment.contains(FORBIDDEN_KEY_CHARS) {
                return Err(DbError::InvalidPath(format!(
                    "segment '{segment}' contains one of {FORBIDDEN_KEY_CHARS:?}"
                )));
            }
            segments.push(segment.to_string());
        }
        Ok(Self { segments })
    }

    /// Descend by exactly one key.
    ///
    /// Unlike [`DbPath::child`], `/` is not a separator here: a key that is
    /// empty or contains `/` is rejected instead of addressing some other
    /// location.
    pub fn key(&self, key: &str) -> DbResult<Self> {
        validate_key(key)?;
        let mut segments = self.segments.clone();
        segments.push(key.to_string());
        Ok(Self { segments })
    }

    /// Path segments from the root.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Whether `self` equals `other` or contains it.
    pub fn is_ancestor_of(&self, other: &DbPath) -> bool {
        other.segments.starts_with(&self.segments)
    }

    /// Whether a write at one path can change the value at the other.
    pub fn overlaps(&self, other: &DbPath) -> bool {
        self.is_ancestor_of(other) || other.is_ancestor_of(self)
    }
}

impl fmt::Display for DbPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.segments.join("/"))
    }
}

impl fmt::Debug for DbPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DbPath({self})")
    }
}

/// Check that `key` names a single child location.
pub fn validate_key(key: &str) -> DbResult<()> {
    if key.is_empty() {
        return Err(DbError::InvalidPath("empty key".into()));
    }
    if key.contains('/') || key.contains(FORBIDDEN_KEY_CHARS) {
        return Err(DbError::InvalidPath(format!(
            "key '{key}' contains '/' or one of {FORBIDDEN_KEY_CHARS:?}"
        )));
    }
    Ok(())
}

// ============================================================================
// Snapshots
// ============================================================================

/// The complete value at a path at one moment.
#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot {
    /// Where the value was read.
    pub path: DbPath,
    /// The value (`Null` when nothing is stored there).
    pub value: Value,
}

impl Snapshot {
    /// Whether anything is stored at the path.
    pub fn exists(&self) -> bool {
        !self.value.is_null()
    }

    /// Child entries in database key order.
    pub fn children(&self) -> Vec<(&str, &Value)> {
        ordered_children(&self.value)
    }
}

/// Child entries of an object in database key order.
///
/// Non-objects have no children.
pub fn ordered_children(value: &Value) -> Vec<(&str, &Value)> {
    let mut children: Vec<(&str, &Value)> = match value.as_object() {
        Some(map) => map.iter().map(|(k, v)| (k.as_str(), v)).collect(),
        None => Vec::new(),
    };
    children.sort_by(|a, b| compare_keys(a.0, b.0));
    children
}

/// Database key order: 32-bit integer keys first (numerically), then the
/// rest lexicographically.
pub fn compare_keys(a: &str, b: &str) -> Ordering {
    match (integer_key(a), integer_key(b)) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

fn integer_key(key: &str) -> Option<i32> {
    // "01" and "+1" are strings, not integers, to the database
    let canonical = key == "0"
        || (!key.starts_with('0') && !key.starts_with('+') && !key.starts_with("-0"));
    if !canonical {
        return None;
    }
    key.parse::<i32>().ok()
}

// ============================================================================
// Subscriptions
// ============================================================================

/// Callback receiving every snapshot for a subscribed path.
pub type Listener = Arc<dyn Fn(Snapshot) + Send + Sync>;

/// A live listener registration.
///
/// Dropping the subscription unsubscribes the listener. Owners hold it for
/// exactly as long as they want notifications, so teardown happens on every
/// exit path, including early returns and panics.
pub struct Subscription {
    path: DbPath,
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    /// Wrap a registration; `cancel` runs once when the subscription drops.
    pub fn new(path: DbPath, cancel: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            path,
            cancel: Some(Box::new(cancel)),
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            tracing::debug!(path = %self.path, "unsubscribing");
            cancel();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("path", &self.path).finish()
    }
}

// ============================================================================
// Operations
// ============================================================================

/// Update function for [`RealtimeDb::transaction`].
///
/// Receives the current value (`Null` when absent) and returns the value to
/// commit, or `None` to abort without writing. May be invoked more than once
/// if the implementation retries on contention.
pub type TransactionFn = Box<dyn FnMut(Value) -> Option<Value> + Send>;

/// Core realtime database operations.
///
/// Writing `Null` anywhere removes that location; parents left empty are
/// removed with it. Every write notifies the listeners whose subscribed value
/// changed.
#[async_trait]
pub trait RealtimeDb: Send + Sync {
    // ========================================================================
    // Reading
    // ========================================================================

    /// Read the current value at a path.
    async fn get(&self, path: &DbPath) -> DbResult<Value>;

    /// Register a listener for the value at `path`.
    ///
    /// The listener is called immediately with the current value, then again
    /// whenever that value changes.
    fn subscribe(&self, path: &DbPath, listener: Listener) -> DbResult<Subscription>;

    // ========================================================================
    // Writing
    // ========================================================================

    /// Replace the value at a path.
    async fn set(&self, path: &DbPath, value: Value) -> DbResult<()>;

    /// Append a child under a fresh push key and return the key.
    async fn push(&self, path: &DbPath, value: Value) -> DbResult<String>;

    /// Atomically read-modify-write the value at a path.
    ///
    /// Returns `true` if the update committed.
    async fn transaction(&self, path: &DbPath, update: TransactionFn) -> DbResult<bool>;

    /// Generate a push key without writing anything.
    fn push_key(&self) -> String;

    // ========================================================================
    // Convenience methods (default implementations)
    // ========================================================================

    /// Remove a whole subtree.
    async fn remove(&self, path: &DbPath) -> DbResult<()> {
        self.set(path, Value::Null).await
    }

    /// Check if anything is stored at a path.
    async fn exists(&self, path: &DbPath) -> DbResult<bool> {
        Ok(!self.get(path).await?.is_null())
    }
}
