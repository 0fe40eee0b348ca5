//! Project backend mirrored against the realtime database.
//!
//! Layout under `version/<v>/users/<uid>`:
//!
//! ```text
//! projects/<projectId>/meta/{time,title,desc}
//! projects/<projectId>/blockIds/<pushKey> -> blockId
//! activeProject -> projectId
//! ```
//!
//! Block lists are objects keyed by push key; display order is key order.
//! Appends add one child under a fresh key. Every edit that changes
//! positions rewrites the whole list inside one transaction with fresh,
//! ordered keys, so listeners never observe a half-rewritten list.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use polyhedron_types::{
    BlockId, FieldPath, Project, ProjectId, ProjectRecord, now_millis, set_key_value,
};
use serde_json::Value;

use super::ProjectBackend;
use crate::config::StoreConfig;
use crate::constants::{BLOCK_IDS_SEGMENT, META_SEGMENT};
use crate::db::{DbPath, Listener, RealtimeDb, Snapshot, Subscription, compare_keys};
use crate::error::{StoreError, StoreResult};
use crate::order::{insert_at, move_item};
use crate::paths::ProjectPaths;
use crate::state::{Collection, Pointer};
use crate::txn::try_transaction;

/// Projects stored in the database, mirrored into a local read model.
pub struct RemoteProjects {
    db: Arc<dyn RealtimeDb>,
    paths: Option<ProjectPaths>,
    projects: Collection<Project>,
    active: Pointer<ProjectId>,
    projects_ready: Arc<AtomicBool>,
    active_ready: Arc<AtomicBool>,
    _subscriptions: Vec<Subscription>,
}

impl RemoteProjects {
    /// Start mirroring the signed-in user's projects and active pointer.
    ///
    /// Without a user the backend is inert: the read model stays empty and
    /// every mutation fails with `RemoteUnavailable`.
    pub fn attach(config: &StoreConfig, db: Arc<dyn RealtimeDb>) -> StoreResult<Self> {
        let mut backend = Self {
            db,
            paths: None,
            projects: Collection::new(),
            active: Pointer::new(),
            projects_ready: Arc::new(AtomicBool::new(false)),
            active_ready: Arc::new(AtomicBool::new(false)),
            _subscriptions: Vec::new(),
        };

        let Some(user_id) = config.user_id.as_deref() else {
            tracing::warn!("no signed-in user; remote project store is inert");
            return Ok(backend);
        };
        let paths = ProjectPaths::new(config, user_id)?;

        let sink = backend.projects.clone();
        let flag = Arc::clone(&backend.projects_ready);
        let on_projects: Listener = Arc::new(move |snapshot: Snapshot| {
            sink.replace(decode_projects(&snapshot));
            flag.store(true, Ordering::SeqCst);
        });

        let pointer = backend.active.clone();
        let flag = Arc::clone(&backend.active_ready);
        let on_active: Listener = Arc::new(move |snapshot: Snapshot| {
            pointer.set(decode_active(&snapshot.value));
            flag.store(true, Ordering::SeqCst);
        });

        let projects_path = paths.collection()?;
        let active_path = paths.active_project()?;
        tracing::debug!(projects = %projects_path, active = %active_path, "attaching project listeners");
        backend._subscriptions = vec![
            backend.db.subscribe(&projects_path, on_projects)?,
            backend.db.subscribe(&active_path, on_active)?,
        ];
        backend.paths = Some(paths);
        Ok(backend)
    }

    fn paths(&self) -> StoreResult<&ProjectPaths> {
        self.paths
            .as_ref()
            .ok_or_else(|| StoreError::remote_unavailable("no signed-in user"))
    }

    /// Location of one project; an id that is not a single key names no
    /// project.
    fn project_path(&self, id: &ProjectId) -> StoreResult<Option<DbPath>> {
        match self.paths()?.project(id) {
            Ok(path) => Ok(Some(path)),
            Err(e) => {
                tracing::debug!(project_id = %id, error = %e, "id does not name a project");
                Ok(None)
            }
        }
    }

    fn existing_project_path(&self, id: &ProjectId) -> StoreResult<DbPath> {
        self.project_path(id)?
            .ok_or_else(|| StoreError::ProjectNotFound(id.clone()))
    }

    /// Rewrite a project's block list in one transaction.
    ///
    /// `edit` works on the ids in display order; the result is stored under
    /// fresh push keys generated in order. Nothing is written when the edit
    /// leaves the order as it was.
    async fn rewrite_block_ids<F>(&self, id: &ProjectId, mut edit: F) -> StoreResult<()>
    where
        F: FnMut(&mut Vec<BlockId>) -> StoreResult<()> + Send + 'static,
    {
        let path = self.existing_project_path(id)?;
        let db = Arc::clone(&self.db);
        let missing = id.clone();
        try_transaction(self.db.as_ref(), &path, move |current| {
            let mut record = decode_record(&missing, current)?;
            let before = ordered_block_ids(&record);
            let mut ids = before.clone();
            edit(&mut ids)?;
            if ids == before {
                return Ok(None);
            }
            record.block_ids = ids.into_iter().map(|b| (db.push_key(), b)).collect();
            Ok(Some(serde_json::to_value(&record)?))
        })
        .await?;
        Ok(())
    }
}

#[async_trait]
impl ProjectBackend for RemoteProjects {
    async fn add_project(&self) -> StoreResult<ProjectId> {
        let paths = self.paths()?;
        let record = serde_json::to_value(ProjectRecord::empty(now_millis()))?;
        let key = self
            .db
            .push(&paths.collection()?, record)
            .await
            .inspect_err(|e| tracing::debug!(error = %e, "add_project failed"))?;
        self.db
            .set(&paths.active_project()?, Value::String(key.clone()))
            .await
            .inspect_err(|e| tracing::debug!(error = %e, "activating new project failed"))?;
        tracing::debug!(project_id = %key, "pushed project");
        Ok(ProjectId::new(key))
    }

    async fn remove_project(&self, id: &ProjectId) -> StoreResult<()> {
        let Some(path) = self.project_path(id)? else {
            return Ok(());
        };
        self.db
            .remove(&path)
            .await
            .inspect_err(|e| tracing::debug!(project_id = %id, error = %e, "remove_project failed"))?;
        tracing::debug!(project_id = %id, "removed project");
        Ok(())
    }

    async fn update_project_field_text(
        &self,
        id: &ProjectId,
        path: &FieldPath,
        text: &str,
    ) -> StoreResult<()> {
        Project::validate_text_path(path)?;
        let project_path = self.existing_project_path(id)?;
        let missing = id.clone();
        let segments = path.segments().to_vec();
        let text = text.to_string();

        try_transaction(self.db.as_ref(), &project_path, move |current| {
            let record = decode_record(&missing, current)?;
            let mut value = serde_json::to_value(&record)?;
            set_key_value(&mut value, &segments, Value::String(text.clone()))?;
            Ok(Some(value))
        })
        .await
        .inspect_err(|e| tracing::debug!(project_id = %id, error = %e, "update_project_field_text failed"))?;
        tracing::debug!(project_id = %id, %path, "updated project field");
        Ok(())
    }

    async fn add_block_id_to_project(
        &self,
        id: &ProjectId,
        block_id: BlockId,
        to_index: Option<usize>,
    ) -> StoreResult<()> {
        let logged = block_id.clone();
        let result = match to_index {
            // Append: one new child under a key that sorts after the rest.
            None => {
                let path = self.existing_project_path(id)?;
                let key = self.db.push_key();
                let missing = id.clone();
                try_transaction(self.db.as_ref(), &path, move |current| {
                    let mut record = decode_record(&missing, current)?;
                    record.block_ids.insert(key.clone(), block_id.clone());
                    Ok(Some(serde_json::to_value(&record)?))
                })
                .await
                .map(|_| ())
            }
            Some(index) => {
                self.rewrite_block_ids(id, move |ids| insert_at(ids, block_id.clone(), Some(index)))
                    .await
            }
        };
        result.inspect_err(|e| tracing::debug!(project_id = %id, error = %e, "add_block_id_to_project failed"))?;
        tracing::debug!(project_id = %id, block_id = %logged, ?to_index, "linked block");
        Ok(())
    }

    async fn remove_block_id_from_project(
        &self,
        id: &ProjectId,
        block_id: &BlockId,
    ) -> StoreResult<()> {
        let path = self.existing_project_path(id)?;
        let missing = id.clone();
        let target = block_id.clone();

        // First occurrence in display order; other keys are untouched.
        try_transaction(self.db.as_ref(), &path, move |current| {
            let mut record = decode_record(&missing, current)?;
            let first = ordered_entries(&record)
                .into_iter()
                .find(|(_, b)| *b == target)
                .map(|(key, _)| key);
            match first {
                Some(key) => {
                    record.block_ids.remove(&key);
                    Ok(Some(serde_json::to_value(&record)?))
                }
                None => Ok(None),
            }
        })
        .await
        .inspect_err(|e| tracing::debug!(project_id = %id, error = %e, "remove_block_id_from_project failed"))?;
        tracing::debug!(project_id = %id, %block_id, "unlinked block");
        Ok(())
    }

    async fn remove_block_id_from_all_projects(&self, block_id: &BlockId) -> StoreResult<()> {
        let path = self.paths()?.collection()?;
        let target = block_id.clone();

        // Raw values so projects this client cannot decode are left intact.
        let committed = try_transaction(self.db.as_ref(), &path, move |current| {
            let Value::Object(mut projects) = current else {
                return Ok(None);
            };
            let mut removed = 0;
            for project in projects.values_mut() {
                if let Some(Value::Object(ids)) = project.get_mut(BLOCK_IDS_SEGMENT) {
                    let before = ids.len();
                    ids.retain(|_, v| v.as_str() != Some(target.as_str()));
                    removed += before - ids.len();
                }
            }
            Ok((removed > 0).then_some(Value::Object(projects)))
        })
        .await
        .inspect_err(|e| tracing::debug!(%block_id, error = %e, "remove_block_id_from_all_projects failed"))?;
        tracing::debug!(%block_id, committed, "unlinked block from all projects");
        Ok(())
    }

    async fn reorder_blocks_in_project(
        &self,
        id: &ProjectId,
        from_index: usize,
        to_index: usize,
    ) -> StoreResult<()> {
        self.rewrite_block_ids(id, move |ids| move_item(ids, from_index, to_index))
            .await
            .inspect_err(|e| tracing::debug!(project_id = %id, error = %e, "reorder_blocks_in_project failed"))?;
        tracing::debug!(project_id = %id, from_index, to_index, "reordered blocks");
        Ok(())
    }

    async fn assign_active_project_id(&self, id: Option<ProjectId>) -> StoreResult<()> {
        let path = self.paths()?.active_project()?;
        let value = id
            .as_ref()
            .map(|p| Value::String(p.to_string()))
            .unwrap_or(Value::Null);
        self.db
            .set(&path, value)
            .await
            .inspect_err(|e| tracing::debug!(error = %e, "assign_active_project_id failed"))?;
        tracing::debug!(project_id = ?id, "assigned active project");
        Ok(())
    }

    fn collection(&self) -> &Collection<Project> {
        &self.projects
    }

    fn active(&self) -> &Pointer<ProjectId> {
        &self.active
    }

    fn is_initialized(&self) -> bool {
        self.projects_ready.load(Ordering::SeqCst) && self.active_ready.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Decoding
// ============================================================================

/// Decode a stored project.
///
/// Every stored project has a `meta` group; anything else at the location
/// (nothing, a scalar, an unrelated object) means the project does not exist.
fn decode_record(id: &ProjectId, value: Value) -> StoreResult<ProjectRecord> {
    let has_meta = value
        .get(META_SEGMENT)
        .is_some_and(Value::is_object);
    if !has_meta {
        return Err(StoreError::ProjectNotFound(id.clone()));
    }
    Ok(serde_json::from_value(value)?)
}

/// `(push key, block id)` pairs in display order.
fn ordered_entries(record: &ProjectRecord) -> Vec<(String, BlockId)> {
    let mut entries: Vec<(String, BlockId)> = record
        .block_ids
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    entries.sort_by(|a, b| compare_keys(&a.0, &b.0));
    entries
}

fn ordered_block_ids(record: &ProjectRecord) -> Vec<BlockId> {
    ordered_entries(record).into_iter().map(|(_, b)| b).collect()
}

/// Rebuild the project list from a snapshot of the projects subtree.
fn decode_projects(snapshot: &Snapshot) -> Vec<Project> {
    snapshot
        .children()
        .into_iter()
        .filter_map(|(key, value)| {
            match serde_json::from_value::<ProjectRecord>(value.clone()) {
                Ok(record) => Some(Project {
                    id: ProjectId::new(key),
                    block_ids: ordered_block_ids(&record),
                    meta: record.meta,
                }),
                Err(e) => {
                    tracing::warn!(project_id = key, error = %e, "skipping undecodable project");
                    None
                }
            }
        })
        .collect()
}

/// A missing pointer and the empty string both mean "no active project".
fn decode_active(value: &Value) -> Option<ProjectId> {
    match value {
        Value::String(id) if !id.is_empty() => Some(ProjectId::new(id.as_str())),
        Value::Null | Value::String(_) => None,
        other => {
            tracing::warn!(value = %other, "ignoring non-string active project");
            None
        }
    }
}
