//! Block content types.
//!
//! A [`Block`] is a reusable unit of content. Its identity lives outside the
//! record on the wire (the database key), so the stored form is a separate
//! [`BlockRecord`] that the store pairs with its key on read.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::EnumString;

use crate::ids::BlockId;

/// A block of content.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Unique within the block collection.
    pub id: BlockId,
    /// Creation time (Unix milliseconds).
    pub time: u64,
    pub title: String,
    pub desc: String,
    pub body: String,
}

impl Block {
    /// A block with empty text fields.
    pub fn empty(id: BlockId, time: u64) -> Self {
        Self {
            id,
            time,
            title: String::new(),
            desc: String::new(),
            body: String::new(),
        }
    }

    /// Read one text field.
    pub fn field(&self, field: BlockField) -> &str {
        match field {
            BlockField::Title => &self.title,
            BlockField::Desc => &self.desc,
            BlockField::Body => &self.body,
        }
    }

    /// Replace one text field.
    pub fn set_field(&mut self, field: BlockField, text: impl Into<String>) {
        let slot = match field {
            BlockField::Title => &mut self.title,
            BlockField::Desc => &mut self.desc,
            BlockField::Body => &mut self.body,
        };
        *slot = text.into();
    }

    /// Stored form of this block (without its key).
    pub fn to_record(&self) -> BlockRecord {
        BlockRecord {
            time: self.time,
            title: self.title.clone(),
            desc: self.desc.clone(),
            body: self.body.clone(),
        }
    }
}

/// Mutable text fields of a block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum BlockField {
    Title,
    #[strum(serialize = "desc", serialize = "description")]
    Desc,
    Body,
}

impl BlockField {
    /// Every mutable field, in display order.
    pub const ALL: [BlockField; 3] = [BlockField::Title, BlockField::Desc, BlockField::Body];

    /// Parse from string (case-insensitive, "description" accepted for desc).
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        <Self as FromStr>::from_str(s).ok()
    }

    /// Wire name of the field (also its remote path segment).
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockField::Title => "title",
            BlockField::Desc => "desc",
            BlockField::Body => "body",
        }
    }
}

impl std::fmt::Display for BlockField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Block as stored under `blocks/<id>` in the realtime database.
///
/// Every field defaults so partially written records still decode.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockRecord {
    pub time: u64,
    pub title: String,
    pub desc: String,
    pub body: String,
}

impl BlockRecord {
    /// An empty record stamped with `time`.
    pub fn empty(time: u64) -> Self {
        Self {
            time,
            ..Default::default()
        }
    }

    /// Pair the record with its database key.
    pub fn into_block(self, id: BlockId) -> Block {
        Block {
            id,
            time: self.time,
            title: self.title,
            desc: self.desc,
            body: self.body,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_parsing() {
        assert_eq!(BlockField::from_str("title"), Some(BlockField::Title));
        assert_eq!(BlockField::from_str("DESC"), Some(BlockField::Desc));
        assert_eq!(BlockField::from_str("description"), Some(BlockField::Desc));
        assert_eq!(BlockField::from_str("body"), Some(BlockField::Body));
        assert_eq!(BlockField::from_str("time"), None);
        assert_eq!(BlockField::from_str("id"), None);
    }

    #[test]
    fn test_set_field_touches_only_that_field() {
        let mut block = Block::empty(BlockId::new("1"), 1);
        block.set_field(BlockField::Desc, "about");
        assert_eq!(block.field(BlockField::Desc), "about");
        assert_eq!(block.title, "");
        assert_eq!(block.body, "");
        assert_eq!(block.time, 1);
    }

    #[test]
    fn test_record_wire_shape() {
        let record = BlockRecord::empty(42);
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"time": 42, "title": "", "desc": "", "body": ""})
        );
    }

    #[test]
    fn test_partial_record_decodes_with_defaults() {
        let record: BlockRecord = serde_json::from_value(serde_json::json!({"title": "t"})).unwrap();
        let block = record.into_block(BlockId::new("k"));
        assert_eq!(block.title, "t");
        assert_eq!(block.time, 0);
        assert_eq!(block.body, "");
    }
}
