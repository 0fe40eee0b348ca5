//! Typed identifiers for blocks and projects.
//!
//! Both ID types wrap an opaque string. Locally they are stringified
//! millisecond timestamps; in remote mode they are the push keys assigned by
//! the realtime database. Nothing outside the generators should interpret
//! their contents.

use std::borrow::Borrow;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// A block identifier.
#[derive(Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(String);

/// A project identifier.
#[derive(Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(String);

// ── Shared behavior ─────────────────────────────────────────────────────────

macro_rules! impl_string_id {
    ($T:ident, $name:literal) => {
        impl $T {
            /// Wrap an existing key.
            pub fn new(key: impl Into<String>) -> Self {
                Self(key.into())
            }

            /// The key as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $T {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $T {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $T {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl Borrow<str> for $T {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl PartialEq<str> for $T {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $T {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }

        impl fmt::Display for $T {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl fmt::Debug for $T {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", $name, self.0)
            }
        }
    };
}

impl_string_id!(BlockId, "BlockId");
impl_string_id!(ProjectId, "ProjectId");

// ── Local generation ────────────────────────────────────────────────────────

/// Timestamp-derived identity for local (memory) mode.
///
/// Returns the current time in milliseconds, bumped past the previously
/// issued value so that two calls within the same millisecond still produce
/// distinct ids. The stamp doubles as the entity's creation time.
#[derive(Debug, Default)]
pub struct LocalIdGenerator {
    last: AtomicU64,
}

impl LocalIdGenerator {
    /// Create a generator that has issued nothing yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Next strictly increasing millisecond stamp.
    pub fn next_stamp(&self) -> u64 {
        let now = crate::now_millis();
        let prev = self
            .last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or(now);
        now.max(prev + 1)
    }

    /// Next stamp together with its stringified key.
    pub fn next_key(&self) -> (u64, String) {
        let stamp = self.next_stamp();
        (stamp, stamp.to_string())
    }
}

// ============================================================================
// Tests
// ============================================================================
