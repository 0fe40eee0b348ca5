//! Database locations for the block collection and a user's projects.
//!
//! Ids and user ids are always single keys: an id that is empty or contains
//! `/` never resolves, so it cannot address a parent collection or a field of
//! another record.

use polyhedron_types::{BlockId, ProjectId};

use crate::config::StoreConfig;
use crate::constants::{
    ACTIVE_PROJECT_SEGMENT, BLOCKS_SEGMENT, PROJECTS_SEGMENT, USERS_SEGMENT, VERSION_SEGMENT,
};
use crate::db::{DbPath, DbResult};

/// `version/<v>/users/<uid>`.
fn user_root(config: &StoreConfig, user_id: &str) -> DbResult<DbPath> {
    DbPath::root()
        .key(VERSION_SEGMENT)?
        .key(&config.schema_version)?
        .key(USERS_SEGMENT)?
        .key(user_id)
}

/// Locations of the block collection.
#[derive(Clone, Debug)]
pub struct BlockPaths {
    root: DbPath,
}

impl BlockPaths {
    /// Resolve the block collection.
    ///
    /// Shared top-level collection by default. When blocks are namespaced per
    /// user and there is no user, there is nowhere to read or write: `None`.
    pub fn new(config: &StoreConfig, user_id: Option<&str>) -> DbResult<Option<Self>> {
        let root = match (config.namespace_blocks, user_id) {
            (false, _) => DbPath::root().key(BLOCKS_SEGMENT)?,
            (true, Some(uid)) => user_root(config, uid)?.key(BLOCKS_SEGMENT)?,
            (true, None) => return Ok(None),
        };
        Ok(Some(Self { root }))
    }

    pub fn collection(&self) -> &DbPath {
        &self.root
    }

    pub fn block(&self, id: &BlockId) -> DbResult<DbPath> {
        self.root.key(id.as_str())
    }
}

/// Locations of one user's projects and active pointer.
#[derive(Clone, Debug)]
pub struct ProjectPaths {
    user_root: DbPath,
}

impl ProjectPaths {
    pub fn new(config: &StoreConfig, user_id: &str) -> DbResult<Self> {
        Ok(Self {
            user_root: user_root(config, user_id)?,
        })
    }

    pub fn collection(&self) -> DbResult<DbPath> {
        self.user_root.key(PROJECTS_SEGMENT)
    }

    pub fn project(&self, id: &ProjectId) -> DbResult<DbPath> {
        self.collection()?.key(id.as_str())
    }

    pub fn active_project(&self) -> DbResult<DbPath> {
        self.user_root.key(ACTIVE_PROJECT_SEGMENT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_block_collection() {
        let paths = BlockPaths::new(&StoreConfig::default(), None).unwrap().unwrap();
        assert_eq!(paths.collection().to_string(), "/blocks");
        assert_eq!(
            paths.block(&BlockId::new("b1")).unwrap().to_string(),
            "/blocks/b1"
        );
    }

    #[test]
    fn test_namespaced_blocks() {
        let config = StoreConfig {
            namespace_blocks: true,
            schema_version: "2".into(),
            ..StoreConfig::remote("u1")
        };
        let paths = BlockPaths::new(&config, Some("u1")).unwrap().unwrap();
        assert_eq!(paths.collection().to_string(), "/version/2/users/u1/blocks");
        assert!(BlockPaths::new(&config, None).unwrap().is_none());
    }

    #[test]
    fn test_project_layout() {
        let paths = ProjectPaths::new(&StoreConfig::remote("u1"), "u1").unwrap();
        assert_eq!(
            paths.project(&ProjectId::new("p1")).unwrap().to_string(),
            "/version/1/users/u1/projects/p1"
        );
        assert_eq!(
            paths.active_project().unwrap().to_string(),
            "/version/1/users/u1/activeProject"
        );
    }

    #[test]
    fn test_ids_never_escape_their_collection() {
        let blocks = BlockPaths::new(&StoreConfig::default(), None).unwrap().unwrap();
        let projects = ProjectPaths::new(&StoreConfig::remote("u1"), "u1").unwrap();
        for bad in ["", "/", "b1/title", "../x"] {
            assert!(blocks.block(&BlockId::new(bad)).is_err(), "{bad:?}");
            assert!(projects.project(&ProjectId::new(bad)).is_err(), "{bad:?}");
        }
    }

    #[test]
    fn test_user_id_must_be_a_single_key() {
        for bad in ["a.b", "", "a/b"] {
            assert!(ProjectPaths::new(&StoreConfig::default(), bad).is_err(), "{bad:?}");
        }
    }
}
