//! Completion Cascade (`spec.md` §4.6): on a container (Feature or
//! Project) reaching a terminal status, partitions its child tasks into
//! a retained set (case-insensitive tag match against
//! `completion_cleanup.retain_tags`) and a deleted set, then best-effort
//! deletes each task's dependencies, sections, and row.
//!
//! Grounded in `fwindolf-beads-rs`'s `EpicStatus`/child-enumeration idiom
//! composed with the teacher's `tracing::warn!`-and-continue best-effort
//! loop from `database/src/sqlite.rs::cleanup_timed_out_tasks`.

use uuid::Uuid;

use orchestrator_core::error::Result;
use orchestrator_core::models::{tags_contain_ci, EntityFilter, EntityType, Task};
use orchestrator_core::repository::{DependencyRepository, SectionRepository, TaskRepository};
use orchestrator_core::workflow_config::WorkflowConfigSnapshot;

/// Outcome of one Completion Cascade evaluation. `reason` is always
/// populated, even when `performed` is `false` ("cleanup disabled",
/// "`<status>` is not a terminal status", "No child tasks").
#[derive(Debug, Clone, PartialEq)]
pub struct CascadeReport {
    pub performed: bool,
    pub tasks_deleted: u64,
    pub tasks_retained: u64,
    pub sections_deleted: u64,
    pub dependencies_deleted: u64,
    pub retained_task_ids: Vec<Uuid>,
    pub reason: String,
}

impl CascadeReport {
    fn not_performed(reason: impl Into<String>) -> Self {
        Self {
            performed: false,
            tasks_deleted: 0,
            tasks_retained: 0,
            sections_deleted: 0,
            dependencies_deleted: 0,
            retained_task_ids: Vec::new(),
            reason: reason.into(),
        }
    }
}

pub async fn run_completion_cascade<T, S, D>(
    entity_type: EntityType,
    entity_id: Uuid,
    new_status: &str,
    tasks: &T,
    sections: &S,
    dependencies: &D,
    config: &WorkflowConfigSnapshot,
) -> Result<CascadeReport>
where
    T: TaskRepository,
    S: SectionRepository,
    D: DependencyRepository,
{
    if !config.completion_cleanup().enabled {
        return Ok(CascadeReport::not_performed("cleanup disabled"));
    }
    if !config.is_terminal_status(new_status, entity_type) {
        return Ok(CascadeReport::not_performed(format!(
            "'{new_status}' is not a terminal status"
        )));
    }

    let children: Vec<Task> = match entity_type {
        EntityType::Feature => tasks.list_children(entity_id).await?,
        EntityType::Project => {
            tasks
                .find_by_filters(EntityFilter {
                    project_id: Some(entity_id),
                    limit: 1000,
                    ..Default::default()
                })
                .await?
        }
        EntityType::Task => return Ok(CascadeReport::not_performed("tasks are not cascade containers")),
    };

    if children.is_empty() {
        return Ok(CascadeReport::not_performed("No child tasks"));
    }

    let retain_tags = &config.completion_cleanup().retain_tags;
    let (retained, to_delete): (Vec<Task>, Vec<Task>) = children
        .into_iter()
        .partition(|task| retain_tags.iter().any(|tag| tags_contain_ci(&task.tags, tag)));

    let mut tasks_deleted = 0u64;
    let mut sections_deleted = 0u64;
    let mut dependencies_deleted = 0u64;

    for task in &to_delete {
        match delete_task_with_children(task.id, tasks, sections, dependencies).await {
            Ok((sections_removed, dependencies_removed)) => {
                tasks_deleted += 1;
                sections_deleted += sections_removed;
                dependencies_deleted += dependencies_removed;
            }
            Err(error) => {
                tracing::warn!(
                    task_id = %task.id,
                    %error,
                    "completion cascade failed to delete task; continuing"
                );
            }
        }
    }

    Ok(CascadeReport {
        performed: true,
        tasks_deleted,
        tasks_retained: retained.len() as u64,
        sections_deleted,
        dependencies_deleted,
        retained_task_ids: retained.iter().map(|t| t.id).collect(),
        reason: "completed".to_string(),
    })
}

async fn delete_task_with_children<T, S, D>(
    task_id: Uuid,
    tasks: &T,
    sections: &S,
    dependencies: &D,
) -> Result<(u64, u64)>
where
    T: TaskRepository,
    S: SectionRepository,
    D: DependencyRepository,
{
    let dependencies_removed = dependencies.delete_all_for_task(task_id).await?;
    let sections_removed = sections.delete_for_entity(EntityType::Task, task_id).await?;
    tasks.delete(task_id).await?;
    Ok((sections_removed, dependencies_removed))
}
