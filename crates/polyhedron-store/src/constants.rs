//! Store configuration constants.
//!
//! Centralizes the wire path segments and configuration defaults.

/// Schema version used when the configuration does not name one.
pub const DEFAULT_SCHEMA_VERSION: &str = "1";

/// Environment variable overriding the configured mode.
pub const ENV_MODE: &str = "POLYHEDRON_MODE";

/// Environment variable overriding the configured user.
pub const ENV_USER: &str = "POLYHEDRON_USER";

/// Top-level segment holding per-version data.
pub const VERSION_SEGMENT: &str = "version";

/// Segment holding per-user data under a version.
pub const USERS_SEGMENT: &str = "users";

/// Block collection segment.
pub const BLOCKS_SEGMENT: &str = "blocks";

/// Project collection segment.
pub const PROJECTS_SEGMENT: &str = "projects";

/// Active project pointer segment.
pub const ACTIVE_PROJECT_SEGMENT: &str = "activeProject";

/// Project metadata group segment.
pub const META_SEGMENT: &str = "meta";

/// Ordered block reference list segment.
pub const BLOCK_IDS_SEGMENT: &str = "blockIds";
