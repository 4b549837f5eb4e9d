//! Contract tests that every `ProjectRepository`/`FeatureRepository`/
//! `TaskRepository` implementation must pass: lifecycle CRUD, optimistic
//! concurrency, and filter/search behaviour (spec.md §4.2). Exercised
//! against `SqliteStore` by `sqlite_integration.rs`; a future in-memory
//! backend can reuse this module unchanged.

use orchestrator_core::error::OrchestratorError;
use orchestrator_core::models::{
    EntityFilter, NewProject, NewTask, Priority, StatusName, UpdateProject, UpdateTask,
};
use orchestrator_core::repository::{HealthCheck, ProjectRepository, TaskRepository};

pub async fn run_project_contract<R: ProjectRepository + HealthCheck>(repo: &R) {
    HealthCheck::health_check(repo).await.expect("healthy repository");

    let created = repo
        .create(NewProject {
            name: "Contract Project".into(),
            description: Some("exercised by the repository contract".into()),
            summary: None,
            status: StatusName::new("pending").unwrap(),
            tags: vec!["contract".into()],
        })
        .await
        .unwrap();
    assert_eq!(created.version, 1);
    assert!(created.tags.contains("contract"));

    let fetched = repo.get_by_id(created.id).await.unwrap().unwrap();
    assert_eq!(fetched.name, "Contract Project");

    let updated = repo
        .update(
            created.id,
            created.version,
            UpdateProject {
                name: Some("Renamed Project".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.name, "Renamed Project");
    assert_eq!(updated.version, 2);

    let stale = repo
        .update(created.id, created.version, UpdateProject::default())
        .await;
    assert!(matches!(stale, Err(OrchestratorError::Conflict(_))));

    let missing = repo.get_by_id(uuid::Uuid::new_v4()).await.unwrap();
    assert!(missing.is_none());

    let deleted = repo.delete(created.id).await.unwrap();
    assert!(deleted);
    assert!(repo.get_by_id(created.id).await.unwrap().is_none());
}

pub async fn run_task_contract<R: TaskRepository>(repo: &R) {
    let task = repo
        .create(NewTask {
            feature_id: None,
            project_id: None,
            title: "Contract task".into(),
            summary: None,
            status: StatusName::new("pending").unwrap(),
            priority: Priority::Medium,
            complexity: 4,
            tags: vec![],
        })
        .await
        .unwrap();

    let renamed = repo
        .update(
            task.id,
            task.version,
            UpdateTask {
                priority: Some(Priority::High),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(renamed.priority, Priority::High);
    assert_eq!(renamed.version, 2);

    let advanced = repo.set_status(task.id, renamed.version, "in_progress").await.unwrap();
    assert_eq!(advanced.status.as_str(), "in_progress");

    let not_found = repo.set_status(uuid::Uuid::new_v4(), 1, "in_progress").await;
    assert!(matches!(not_found, Err(OrchestratorError::NotFound { .. })));

    let filtered = repo
        .find_by_filters(EntityFilter {
            status_in: vec![StatusName::new("in_progress").unwrap()],
            limit: 10,
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(filtered.iter().any(|t| t.id == task.id));
}
