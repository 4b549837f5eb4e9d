//! Custom assertion helpers for testing, generalized from the teacher's
//! `Task`/`TaskState` assertions onto `Task`/`StatusName`/`Priority` and a
//! `Dependency`-aware unblock check.
//!
//! Provides specialized assertions for:
//! - Entity equality with clear error messages, ignoring timestamps
//! - Flexible partial matching via `TaskMatcher`
//! - Tag and ordering assertions

use orchestrator_core::models::{Dependency, Priority, StatusName, Task};
use uuid::Uuid;

/// Assert tasks are equal ignoring `created_at`/`updated_at`.
pub fn assert_task_equals(actual: &Task, expected: &Task) {
    assert_eq!(actual.id, expected.id, "Task IDs don't match");
    assert_eq!(actual.title, expected.title, "Task titles don't match");
    assert_eq!(actual.status, expected.status, "Task statuses don't match");
    assert_eq!(actual.priority, expected.priority, "Task priorities don't match");
    assert_eq!(actual.complexity, expected.complexity, "Task complexities don't match");
    assert_eq!(actual.tags, expected.tags, "Task tags don't match");
    assert_eq!(actual.version, expected.version, "Task versions don't match");
}

/// Assert task matches partial criteria.
pub fn assert_task_matches(task: &Task, matcher: &TaskMatcher) {
    if let Some(expected_id) = matcher.id {
        assert_eq!(task.id, expected_id, "Task ID doesn't match expected");
    }
    if let Some(ref expected_title) = matcher.title {
        assert_eq!(&task.title, expected_title, "Task title doesn't match expected");
    }
    if let Some(ref expected_status) = matcher.status {
        assert_eq!(&task.status, expected_status, "Task status doesn't match expected");
    }
    if let Some(expected_priority) = matcher.priority {
        assert_eq!(task.priority, expected_priority, "Task priority doesn't match expected");
    }
}

/// Assert the task list contains a task with the given title.
pub fn assert_contains_task_with_title(tasks: &[Task], title: &str) {
    assert!(
        tasks.iter().any(|t| t.title == title),
        "Expected to find task titled '{}' in task list, but it wasn't found. Available titles: {:?}",
        title,
        tasks.iter().map(|t| &t.title).collect::<Vec<_>>()
    );
}

/// Assert tasks are sorted by `created_at` ascending, the order
/// `TaskRepository::list_candidates` and the Recommendation Engine's
/// tie-break both rely on.
pub fn assert_tasks_sorted_by_created_at(tasks: &[Task]) {
    for window in tasks.windows(2) {
        assert!(
            window[0].created_at <= window[1].created_at,
            "Tasks are not sorted by created_at ascending: '{}' ({}) comes before '{}' ({})",
            window[0].title,
            window[0].created_at,
            window[1].title,
            window[1].created_at
        );
    }
}

/// Assert `dependencies` contains an edge `from -> to` of the given type.
pub fn assert_has_dependency(dependencies: &[Dependency], from: Uuid, to: Uuid) {
    assert!(
        dependencies
            .iter()
            .any(|d| d.from_task_id == from && d.to_task_id == to),
        "Expected a dependency edge {from} -> {to}, but none was found among {} edges",
        dependencies.len()
    );
}

/// Flexible task matcher for partial assertions.
#[derive(Debug, Default)]
pub struct TaskMatcher {
    pub id: Option<Uuid>,
    pub title: Option<String>,
    pub status: Option<StatusName>,
    pub priority: Option<Priority>,
}

impl TaskMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_status(mut self, status: &str) -> Self {
        self.status = Some(StatusName::new(status).unwrap());
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::TaskBuilder;
    use crate::repository::InMemoryStore;
    use orchestrator_core::repository::TaskRepository;

    #[tokio::test]
    async fn matcher_checks_only_the_fields_it_was_given() {
        let store = InMemoryStore::new();
        let task = store
            .create(TaskBuilder::new().with_title("Ship it").with_priority(Priority::High).build())
            .await
            .unwrap();

        assert_task_matches(&task, &TaskMatcher::new().with_title("Ship it"));
        assert_task_matches(&task, &TaskMatcher::new().with_priority(Priority::High));
    }

    #[test]
    fn contains_task_with_title_reports_missing_title() {
        let tasks: Vec<Task> = vec![];
        let result = std::panic::catch_unwind(|| assert_contains_task_with_title(&tasks, "anything"));
        assert!(result.is_err());
    }
}
