//! Project types.
//!
//! A project is an ordered composition of block references plus its own
//! metadata. The order of `block_ids` is the display order; duplicates are
//! allowed and dangling ids are tolerated until the caller cascades a block
//! removal.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::{BlockId, ProjectId};
use crate::path::{FieldPath, PathError, lookup, set_key_value};

/// Project metadata group.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectMeta {
    /// Creation time (Unix milliseconds).
    pub time: u64,
    pub title: String,
    pub desc: String,
}

impl ProjectMeta {
    /// Empty metadata stamped with `time`.
    pub fn empty(time: u64) -> Self {
        Self {
            time,
            ..Default::default()
        }
    }
}

/// A project: metadata plus ordered block references.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub meta: ProjectMeta,
    #[serde(rename = "blockIds")]
    pub block_ids: Vec<BlockId>,
}

impl Project {
    /// A project with empty metadata and no blocks.
    pub fn empty(id: ProjectId, time: u64) -> Self {
        Self {
            id,
            meta: ProjectMeta::empty(time),
            block_ids: Vec::new(),
        }
    }

    /// Whether any position in the list references `block_id`.
    pub fn contains_block(&self, block_id: &BlockId) -> bool {
        self.block_ids.iter().any(|id| id == block_id)
    }

    /// Check that `path` addresses a text attribute of the project schema.
    ///
    /// Resolved against an empty project record, so identity and the block
    /// list are never addressable: only `meta.title` and `meta.desc` pass.
    pub fn validate_text_path(path: &FieldPath) -> Result<(), PathError> {
        let template = serde_json::to_value(ProjectRecord::default())
            .map_err(|_| PathError::Missing(path.to_string()))?;
        match lookup(&template, path.segments()) {
            Some(Value::String(_)) => Ok(()),
            Some(_) => Err(PathError::NotText(path.to_string())),
            None => Err(PathError::Missing(path.to_string())),
        }
    }

    /// Replace the text attribute at `path`, leaving everything else intact.
    pub fn set_text(&mut self, path: &FieldPath, text: &str) -> Result<(), PathError> {
        Self::validate_text_path(path)?;
        let not_text = |_| PathError::NotText(path.to_string());

        let mut value = serde_json::to_value(&*self).map_err(not_text)?;
        set_key_value(&mut value, path.segments(), Value::String(text.to_string()))?;
        *self = serde_json::from_value(value).map_err(not_text)?;
        Ok(())
    }
}

/// Project as stored under `projects/<id>` in the realtime database.
///
/// `block_ids` is keyed by push key; the store orders the children when it
/// rebuilds the list. An empty list is omitted, matching how the database
/// drops empty objects.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectRecord {
    pub meta: ProjectMeta,
    #[serde(rename = "blockIds", skip_serializing_if = "BTreeMap::is_empty")]
    pub block_ids: BTreeMap<String, BlockId>,
}

impl ProjectRecord {
    /// A new record with empty metadata and no blocks.
    pub fn empty(time: u64) -> Self {
        Self {
            meta: ProjectMeta::empty(time),
            block_ids: BTreeMap::new(),
        }
    }
}
