//! In-process project backend.

use async_trait::async_trait;
use polyhedron_types::{BlockId, FieldPath, LocalIdGenerator, Project, ProjectId};

use super::ProjectBackend;
use crate::error::{StoreError, StoreResult};
use crate::order::{insert_at, move_item, remove_all};
use crate::state::{Collection, Pointer};

/// Projects held in process, in insertion order.
#[derive(Default)]
pub struct LocalProjects {
    ids: LocalIdGenerator,
    projects: Collection<Project>,
    active: Pointer<ProjectId>,
}

impl LocalProjects {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `edit` to one project, failing when it does not exist.
    fn edit_project<R>(
        &self,
        id: &ProjectId,
        edit: impl FnOnce(&mut Project) -> StoreResult<R>,
    ) -> StoreResult<R> {
        self.projects.try_update(|projects| {
            let project = projects
                .iter_mut()
                .find(|p| &p.id == id)
                .ok_or_else(|| StoreError::ProjectNotFound(id.clone()))?;
            edit(project)
        })
    }
}

#[async_trait]
impl ProjectBackend for LocalProjects {
    async fn add_project(&self) -> StoreResult<ProjectId> {
        let (time, key) = self.ids.next_key();
        let id = ProjectId::new(key);
        let project = Project::empty(id.clone(), time);
        self.projects.try_update(|projects| {
            projects.push(project);
            Ok(())
        })?;
        self.active.set(Some(id.clone()));
        tracing::debug!(project_id = %id, "added project");
        Ok(id)
    }

    async fn remove_project(&self, id: &ProjectId) -> StoreResult<()> {
        self.projects.try_update(|projects| {
            projects.retain(|p| &p.id != id);
            Ok(())
        })?;
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
        self.edit_project(id, |project| Ok(project.set_text(path, text)?))?;
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
        self.edit_project(id, |project| insert_at(&mut project.block_ids, block_id, to_index))?;
        tracing::debug!(project_id = %id, block_id = %logged, ?to_index, "linked block");
        Ok(())
    }

    async fn remove_block_id_from_project(
        &self,
        id: &ProjectId,
        block_id: &BlockId,
    ) -> StoreResult<()> {
        let removed = self.edit_project(id, |project| Ok(remove_all(&mut project.block_ids, block_id)))?;
        tracing::debug!(project_id = %id, %block_id, removed, "unlinked block");
        Ok(())
    }

    async fn remove_block_id_from_all_projects(&self, block_id: &BlockId) -> StoreResult<()> {
        let removed = self.projects.try_update(|projects| {
            Ok(projects
                .iter_mut()
                .map(|p| remove_all(&mut p.block_ids, block_id))
                .sum::<usize>())
        })?;
        tracing::debug!(%block_id, removed, "unlinked block from all projects");
        Ok(())
    }

    async fn reorder_blocks_in_project(
        &self,
        id: &ProjectId,
        from_index: usize,
        to_index: usize,
    ) -> StoreResult<()> {
        self.edit_project(id, |project| move_item(&mut project.block_ids, from_index, to_index))?;
        tracing::debug!(project_id = %id, from_index, to_index, "reordered blocks");
        Ok(())
    }

    async fn assign_active_project_id(&self, id: Option<ProjectId>) -> StoreResult<()> {
        tracing::debug!(project_id = ?id, "assigned active project");
        self.active.set(id);
        Ok(())
    }

    fn collection(&self) -> &Collection<Project> {
        &self.projects
    }

    fn active(&self) -> &Pointer<ProjectId> {
        &self.active
    }

    fn is_initialized(&self) -> bool {
        true
    }
}
