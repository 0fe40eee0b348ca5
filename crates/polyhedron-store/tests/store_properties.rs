//! Store behavior that must hold identically in both modes.
//!
//! Every test runs against a local session and a remote session backed by a
//! `MemoryDatabase`. Prior states are randomized from a fixed seed so
//! failures reproduce.

use std::sync::Arc;

use polyhedron_store::{
    BlockId, EditorSession, MemoryDatabase, ProjectId, RealtimeDb, StoreConfig, StoreError,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// ============================================================================
// Shared test setup
// ============================================================================

fn local_session() -> EditorSession {
    EditorSession::open(&StoreConfig::default(), None).unwrap()
}

fn remote_session(db: &MemoryDatabase) -> EditorSession {
    let db: Arc<dyn RealtimeDb> = Arc::new(db.clone());
    EditorSession::open(&StoreConfig::remote("tester"), Some(db)).unwrap()
}

/// One local and one remote session, labelled for assertion messages.
fn sessions() -> Vec<(&'static str, EditorSession)> {
    vec![
        ("memory", local_session()),
        ("firebase", remote_session(&MemoryDatabase::new())),
    ]
}

/// Populate a session with a random mix of blocks and projects.
async fn random_prior_state(session: &EditorSession, rng: &mut StdRng) {
    let mut blocks = Vec::new();
    for _ in 0..rng.gen_range(0..6) {
        let id = session.blocks().add_block().await.unwrap();
        session
            .blocks()
            .update_block_field_by_name(&id, "title", &format!("t{}", rng.gen_range(0..100)))
            .await
            .unwrap();
        blocks.push(id);
    }
    for _ in 0..rng.gen_range(0..4) {
        let project = session.projects().add_project().await.unwrap();
        if blocks.is_empty() {
            continue;
        }
        for _ in 0..rng.gen_range(0..5) {
            let block = blocks[rng.gen_range(0..blocks.len())].clone();
            session
                .projects()
                .add_block_id_to_project(&project, block, None)
                .await
                .unwrap();
        }
    }
}

/// A project holding the given ids, in order.
async fn project_with(session: &EditorSession, ids: &[&str]) -> ProjectId {
    let project = session.projects().add_project().await.unwrap();
    for id in ids {
        session
            .projects()
            .add_block_id_to_project(&project, BlockId::new(*id), None)
            .await
            .unwrap();
    }
    project
}

fn block_ids(session: &EditorSession, project: &ProjectId) -> Vec<String> {
    session
        .projects()
        .project(project)
        .map(|p| p.block_ids.iter().map(|b| b.to_string()).collect())
        .unwrap_or_default()
}

// ============================================================================
// Properties
// ============================================================================

#[tokio::test]
async fn test_add_then_remove_block_restores_collection() {
    let mut rng = StdRng::seed_from_u64(7);
    for round in 0..8 {
        for (mode, session) in sessions() {
            random_prior_state(&session, &mut rng).await;
            let before = session.blocks().blocks();

            let id = session.blocks().add_block().await.unwrap();
            assert!(session.blocks().contains(&id), "{mode} round {round}");
            session.blocks().remove_block(&id).await.unwrap();

            assert_eq!(session.blocks().blocks(), before, "{mode} round {round}");
        }
    }
}

#[tokio::test]
async fn test_insert_at_index_and_append() {
    for (mode, session) in sessions() {
        let p = project_with(&session, &["A", "B", "C"]).await;
        session
            .projects()
            .add_block_id_to_project(&p, BlockId::new("X"), Some(1))
            .await
            .unwrap();
        assert_eq!(block_ids(&session, &p), ["A", "X", "B", "C"], "{mode}");

        let q = project_with(&session, &["A", "B", "C"]).await;
        session
            .projects()
            .add_block_id_to_project(&q, BlockId::new("X"), None)
            .await
            .unwrap();
        assert_eq!(block_ids(&session, &q), ["A", "B", "C", "X"], "{mode}");
    }
}

#[tokio::test]
async fn test_insert_index_zero_prepends() {
    for (mode, session) in sessions() {
        let p = project_with(&session, &["A", "B"]).await;
        session
            .projects()
            .add_block_id_to_project(&p, BlockId::new("X"), Some(0))
            .await
            .unwrap();
        assert_eq!(block_ids(&session, &p), ["X", "A", "B"], "{mode}");
    }
}

#[tokio::test]
async fn test_move_within_project() {
    for (mode, session) in sessions() {
        let p = project_with(&session, &["A", "B", "C", "D"]).await;
        session.projects().reorder_blocks_in_project(&p, 0, 2).await.unwrap();
        assert_eq!(block_ids(&session, &p), ["B", "C", "A", "D"], "{mode}");
    }
}

#[tokio::test]
async fn test_cascade_delete_leaves_no_references() {
    let mut rng = StdRng::seed_from_u64(11);
    for round in 0..6 {
        for (mode, session) in sessions() {
            random_prior_state(&session, &mut rng).await;
            let x = session.blocks().add_block().await.unwrap();
            for _ in 0..3 {
                let p = session.projects().add_project().await.unwrap();
                for _ in 0..rng.gen_range(1..4) {
                    session
                        .projects()
                        .add_block_id_to_project(&p, x.clone(), None)
                        .await
                        .unwrap();
                }
            }

            session.blocks().remove_block(&x).await.unwrap();
            session
                .projects()
                .remove_block_id_from_all_projects(&x)
                .await
                .unwrap();

            assert!(!session.blocks().contains(&x), "{mode} round {round}");
            for project in session.projects().projects().iter() {
                assert!(!project.contains_block(&x), "{mode} round {round}: {project:?}");
            }
        }
    }
}

#[tokio::test]
async fn test_field_path_update_changes_only_that_field() {
    for (mode, session) in sessions() {
        let p = project_with(&session, &["A", "B"]).await;
        session
            .projects()
            .update_project_field_by_path(&p, "meta.desc", "kept")
            .await
            .unwrap();
        let before = session.projects().project(&p).unwrap();

        session
            .projects()
            .update_project_field_by_path(&p, "meta.title", "Hello")
            .await
            .unwrap();

        let after = session.projects().project(&p).unwrap();
        assert_eq!(after.meta.title, "Hello", "{mode}");
        assert_eq!(after.meta.desc, before.meta.desc, "{mode}");
        assert_eq!(after.meta.time, before.meta.time, "{mode}");
        assert_eq!(after.block_ids, before.block_ids, "{mode}");
        assert_eq!(after.id, before.id, "{mode}");
    }
}

#[tokio::test]
async fn test_remove_project_twice_equals_once() {
    let mut rng = StdRng::seed_from_u64(3);
    for (mode, session) in sessions() {
        random_prior_state(&session, &mut rng).await;
        let p = session.projects().add_project().await.unwrap();

        session.projects().remove_project(&p).await.unwrap();
        let once = session.state();
        session.projects().remove_project(&p).await.unwrap();
        assert_eq!(session.state(), once, "{mode}");
        assert!(session.projects().project(&p).is_none(), "{mode}");
    }
}

// ============================================================================
// Error semantics
// ============================================================================

#[tokio::test]
async fn test_out_of_range_indices_are_rejected() {
    for (mode, session) in sessions() {
        let p = project_with(&session, &["A", "B"]).await;
        let projects = session.projects();

        let err = projects
            .add_block_id_to_project(&p, BlockId::new("X"), Some(3))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::IndexOutOfBounds { index: 3, len: 2 }), "{mode}");

        let err = projects.reorder_blocks_in_project(&p, 2, 0).await.unwrap_err();
        assert!(matches!(err, StoreError::IndexOutOfBounds { .. }), "{mode}");
        let err = projects.reorder_blocks_in_project(&p, 0, 2).await.unwrap_err();
        assert!(matches!(err, StoreError::IndexOutOfBounds { .. }), "{mode}");

        assert_eq!(block_ids(&session, &p), ["A", "B"], "{mode}");
    }
}

#[tokio::test]
async fn test_unknown_ids_are_not_found() {
    for (mode, session) in sessions() {
        let ghost_block = BlockId::new("ghost");
        let ghost_project = ProjectId::new("ghost");

        let err = session
            .blocks()
            .update_block_field_by_name(&ghost_block, "body", "x")
            .await
            .unwrap_err();
        assert!(err.is_not_found(), "{mode}: {err}");

        let err = session
            .projects()
            .update_project_field_by_path(&ghost_project, "meta.title", "x")
            .await
            .unwrap_err();
        assert!(err.is_not_found(), "{mode}: {err}");

        let err = session
            .projects()
            .remove_block_id_from_project(&ghost_project, &ghost_block)
            .await
            .unwrap_err();
        assert!(err.is_not_found(), "{mode}: {err}");

        assert!(session.blocks().blocks().is_empty(), "{mode}");
        assert!(session.projects().projects().is_empty(), "{mode}");
    }
}

#[tokio::test]
async fn test_malformed_ids_are_absent() {
    let mut rng = StdRng::seed_from_u64(11);
    for (mode, session) in sessions() {
        random_prior_state(&session, &mut rng).await;
        let block = session.blocks().add_block().await.unwrap();
        let project = project_with(&session, &[block.as_str()]).await;
        let before = session.state();

        let block_field = format!("{block}/title");
        let project_field = format!("{project}/meta");
        for bad in ["", "/", block_field.as_str(), project_field.as_str()] {
            session.blocks().remove_block(&BlockId::new(bad)).await.unwrap();
            session.projects().remove_project(&ProjectId::new(bad)).await.unwrap();

            let err = session
                .blocks()
                .update_block_field_by_name(&BlockId::new(bad), "title", "x")
                .await
                .unwrap_err();
            assert!(err.is_not_found(), "{mode} {bad:?}: {err}");

            let err = session
                .projects()
                .add_block_id_to_project(&ProjectId::new(bad), block.clone(), None)
                .await
                .unwrap_err();
            assert!(err.is_not_found(), "{mode} {bad:?}: {err}");

            let err = session
                .projects()
                .update_project_field_by_path(&ProjectId::new(bad), "meta.title", "x")
                .await
                .unwrap_err();
            assert!(err.is_not_found(), "{mode} {bad:?}: {err}");
        }

        assert_eq!(session.state(), before, "{mode}");
    }
}

#[tokio::test]
async fn test_invalid_paths_and_fields() {
    for (mode, session) in sessions() {
        let p = session.projects().add_project().await.unwrap();
        for bad in ["", "meta", "meta.time", "blockIds", "id", "meta..title", "title"] {
            let err = session
                .projects()
                .update_project_field_by_path(&p, bad, "x")
                .await
                .unwrap_err();
            assert!(matches!(err, StoreError::InvalidPath(_)), "{mode} '{bad}': {err}");
        }

        let b = session.blocks().add_block().await.unwrap();
        let err = session
            .blocks()
            .update_block_field_by_name(&b, "time", "0")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidPath(_)), "{mode}");
    }
}

#[tokio::test]
async fn test_active_pointer_semantics() {
    for (mode, session) in sessions() {
        let projects = session.projects();
        assert_eq!(projects.active_project_id(), None, "{mode}");

        let p1 = projects.add_project().await.unwrap();
        let p2 = projects.add_project().await.unwrap();
        assert_eq!(projects.active_project_id(), Some(p2.clone()), "{mode}");

        projects.assign_active_project_id(Some(p1.clone())).await.unwrap();
        assert_eq!(session.active_project().map(|p| p.id), Some(p1.clone()), "{mode}");

        // Removal leaves a stale pointer; it resolves to no project.
        projects.remove_project(&p1).await.unwrap();
        assert_eq!(projects.active_project_id(), Some(p1), "{mode}");
        assert!(session.active_project().is_none(), "{mode}");

        // Not validated against the collection.
        projects
            .assign_active_project_id(Some(ProjectId::new("elsewhere")))
            .await
            .unwrap();
        assert_eq!(projects.active_project_id(), Some(ProjectId::new("elsewhere")), "{mode}");

        projects.assign_active_project_id(None).await.unwrap();
        assert_eq!(projects.active_project_id(), None, "{mode}");
    }
}

#[tokio::test]
async fn test_read_model_observers_see_changes() {
    for (mode, session) in sessions() {
        let mut blocks_rx = session.blocks().subscribe();
        let mut active_rx = session.projects().subscribe_active();
        blocks_rx.mark_unchanged();
        active_rx.mark_unchanged();

        let id = session.blocks().add_block().await.unwrap();
        assert!(blocks_rx.has_changed().unwrap(), "{mode}");
        assert_eq!(blocks_rx.borrow_and_update()[0].id, id, "{mode}");

        let p = session.projects().add_project().await.unwrap();
        assert!(active_rx.has_changed().unwrap(), "{mode}");
        assert_eq!(*active_rx.borrow_and_update(), Some(p), "{mode}");
    }
}
