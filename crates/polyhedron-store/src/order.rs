//! Ordered-list edits shared by the local and remote project backends.

use crate::error::{StoreError, StoreResult};

/// Insert `item` at `to_index` (default: the end).
///
/// Items at or after the index shift by one.
pub fn insert_at<T>(list: &mut Vec<T>, item: T, to_index: Option<usize>) -> StoreResult<()> {
    let len = list.len();
    let index = to_index.unwrap_or(len);
    if index > len {
        return Err(StoreError::out_of_bounds(index, len));
    }
    list.insert(index, item);
    Ok(())
}

/// Move the item at `from` so it ends up at `to`.
///
/// `to` is interpreted against the list with the item already removed.
pub fn move_item<T>(list: &mut Vec<T>, from: usize, to: usize) -> StoreResult<()> {
    let len = list.len();
    if from >= len {
        return Err(StoreError::out_of_bounds(from, len));
    }
    if to >= len {
        return Err(StoreError::out_of_bounds(to, len));
    }
    let item = list.remove(from);
    list.insert(to, item);
    Ok(())
}

/// Remove every item equal to `target`; returns how many were removed.
pub fn remove_all<T: PartialEq>(list: &mut Vec<T>, target: &T) -> usize {
    let before = list.len();
    list.retain(|item| item != target);
    before - list.len()
}
