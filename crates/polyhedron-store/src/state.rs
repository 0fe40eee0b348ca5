//! Observable read models.
//!
//! Stores publish their state through `tokio::sync::watch` channels. A
//! [`Collection`] holds an `Arc<Vec<T>>` that is replaced wholesale on every
//! change (copy-on-write), so readers keep a consistent snapshot for as long
//! as they like without blocking writers. A [`Pointer`] holds an optional
//! single value such as the active project id.

use std::sync::Arc;

use tokio::sync::watch;

use crate::error::StoreResult;

/// Receiver side of a [`Collection`].
pub type CollectionReceiver<T> = watch::Receiver<Arc<Vec<T>>>;

/// Ordered collection published through a watch channel.
pub struct Collection<T> {
    tx: Arc<watch::Sender<Arc<Vec<T>>>>,
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            tx: Arc::clone(&self.tx),
        }
    }
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Collection<T> {
    /// An empty collection.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Arc::new(Vec::new()));
        Self { tx: Arc::new(tx) }
    }

    /// Current contents.
    pub fn snapshot(&self) -> Arc<Vec<T>> {
        Arc::clone(&self.tx.borrow())
    }

    /// Observe every replacement of the contents.
    pub fn subscribe(&self) -> CollectionReceiver<T> {
        self.tx.subscribe()
    }

    pub fn len(&self) -> usize {
        self.tx.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tx.borrow().is_empty()
    }
}

impl<T: Clone + PartialEq> Collection<T> {
    /// Replace the contents, notifying only when they differ.
    pub fn replace(&self, items: Vec<T>) {
        self.tx.send_if_modified(|current| {
            if **current == items {
                return false;
            }
            *current = Arc::new(items);
            true
        });
    }

    /// Apply a fallible edit to a copy of the contents.
    ///
    /// The copy is published only when `edit` succeeds and changed
    /// something. Concurrent edits are serialized by the channel lock.
    pub fn try_update<R>(&self, edit: impl FnOnce(&mut Vec<T>) -> StoreResult<R>) -> StoreResult<R> {
        let mut outcome = None;
        self.tx.send_if_modified(|current| {
            let mut next = current.as_ref().clone();
            match edit(&mut next) {
                Ok(value) => {
                    outcome = Some(Ok(value));
                    if next == **current {
                        false
                    } else {
                        *current = Arc::new(next);
                        true
                    }
                }
                Err(e) => {
                    outcome = Some(Err(e));
                    false
                }
            }
        });
        match outcome {
            Some(result) => result,
            // send_if_modified always runs its closure
            None => unreachable!("collection edit closure did not run"),
        }
    }
}

/// Optional single value published through a watch channel.
pub struct Pointer<T> {
    tx: Arc<watch::Sender<Option<T>>>,
}

impl<T> Clone for Pointer<T> {
    fn clone(&self) -> Self {
        Self {
            tx: Arc::clone(&self.tx),
        }
    }
}

impl<T> Default for Pointer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Pointer<T> {
    /// An unset pointer.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<T>> {
        self.tx.subscribe()
    }
}

impl<T: Clone + PartialEq> Pointer<T> {
    pub fn get(&self) -> Option<T> {
        self.tx.borrow().clone()
    }

    /// Set or clear the value, notifying only on change.
    pub fn set(&self, value: Option<T>) {
        self.tx.send_if_modified(|current| {
            if *current == value {
                return false;
            }
            *current = value;
            true
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;

    #[test]
    fn test_replace_notifies_only_on_change() {
        let items = Collection::new();
        let mut rx = items.subscribe();
        items.replace(vec![1, 2]);
        assert!(rx.has_changed().unwrap());
        rx.mark_unchanged();
        items.replace(vec![1, 2]);
        assert!(!rx.has_changed().unwrap());
        assert_eq!(*items.snapshot(), vec![1, 2]);
    }

    #[test]
    fn test_failed_update_publishes_nothing() {
        let items = Collection::new();
        items.replace(vec![1]);
        let mut rx = items.subscribe();
        rx.mark_unchanged();

        let result: StoreResult<()> = items.try_update(|v| {
            v.push(2);
            Err(StoreError::out_of_bounds(9, 1))
        });
        assert!(result.is_err());
        assert!(!rx.has_changed().unwrap());
        assert_eq!(*items.snapshot(), vec![1]);
    }

    #[test]
    fn test_snapshot_is_stable_across_updates() {
        let items = Collection::new();
        items.replace(vec!["a"]);
        let before = items.snapshot();
        items.try_update(|v| {
            v.push("b");
            Ok(())
        })
        .unwrap();
        assert_eq!(*before, vec!["a"]);
        assert_eq!(*items.snapshot(), vec!["a", "b"]);
    }

    #[test]
    fn test_pointer() {
        let active = Pointer::new();
        let mut rx = active.subscribe();
        assert_eq!(active.get(), None::<String>);
        active.set(Some("p".to_string()));
        assert!(rx.has_changed().unwrap());
        rx.mark_unchanged();
        active.set(Some("p".to_string()));
        assert!(!rx.has_changed().unwrap());
        active.set(None);
        assert_eq!(active.get(), None);
    }
}
