//! Recommendation Engine (`spec.md` §4.5): `getNextTasks`'s candidate
//! selection, blocking filter, ranking, and batch-mode classification.
//!
//! Grounded in the teacher's `TaskRepository::discover_work` signature
//! (`task-core/src/repository.rs`), generalized from a single-queue poll
//! to scope-aware candidate fetch plus role-based blocking resolution.
//! The mode classification itself has no direct teacher precedent and is
//! written fresh, in the teacher's plain `match` idiom.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use orchestrator_core::error::Result;
use orchestrator_core::models::{EntityFilter, EntityType, Priority, Role, Scope, StatusName, Task};
use orchestrator_core::repository::{DependencyRepository, TaskRepository};

use crate::Engine;

/// A projected, display-ready task returned by `getNextTasks`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskBrief {
    pub id: Uuid,
    pub title: String,
    pub status: StatusName,
    pub priority: Priority,
    pub complexity: u8,
    pub tags: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
    /// Only populated when `include_details` was requested.
    pub summary: Option<String>,
}

fn project_brief(task: &Task, include_details: bool) -> TaskBrief {
    TaskBrief {
        id: task.id,
        title: task.title.clone(),
        status: task.status.clone(),
        priority: task.priority,
        complexity: task.complexity,
        tags: task.tags.clone(),
        created_at: task.created_at,
        summary: if include_details { task.summary.clone() } else { None },
    }
}

/// Batch-shape classification from `spec.md` §4.5, computed from the
/// number of tasks returned, how many are already in flight (work or
/// review role), and how many unblocked candidates existed before
/// truncation to `limit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationMode {
    /// Two or more tasks returned, nothing currently in flight: safe to
    /// work the whole batch in parallel.
    ParallelBatch,
    /// One or more tasks returned while other work is already in flight:
    /// pick up alongside what's in progress.
    IncrementalBatch,
    /// Exactly one task returned and nothing else in flight.
    Sequential,
    /// Nothing returned, but other tasks are in flight: wait on them.
    Waiting,
    /// Nothing returned, nothing in flight, but pending tasks exist:
    /// they're all blocked.
    Blocked,
    /// Nothing returned, nothing in flight, nothing pending.
    Complete,
}

fn classify_mode(returned: usize, in_flight: usize, pending: usize) -> RecommendationMode {
    if returned >= 1 && in_flight >= 1 {
        RecommendationMode::IncrementalBatch
    } else if returned >= 2 {
        RecommendationMode::ParallelBatch
    } else if returned == 1 {
        RecommendationMode::Sequential
    } else if in_flight > 0 {
        RecommendationMode::Waiting
    } else if pending > 0 {
        RecommendationMode::Blocked
    } else {
        RecommendationMode::Complete
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NextTasksResult {
    pub tasks: Vec<TaskBrief>,
    /// Count of unblocked candidates before truncation to `limit`.
    pub unblocked_candidates: usize,
    /// Count of queue-role candidates before the blocking filter.
    pub total_candidates: usize,
    pub mode: RecommendationMode,
    /// Populated only when `tasks` is empty, explaining why.
    pub diagnostic: Option<String>,
}

const DEFAULT_LIMIT: u32 = 5;

impl<P, F, T, S, D, G, RT> Engine<P, F, T, S, D, G, RT>
where
    T: TaskRepository,
    D: DependencyRepository,
{
    /// `getNextTasks(scope, limit, includeDetails)`: candidate fetch,
    /// blocking filter, priority-desc/complexity-asc/created-asc sort,
    /// truncation, then projection and mode classification.
    pub async fn get_next_tasks(
        &self,
        scope: Scope,
        limit: Option<u32>,
        include_details: bool,
    ) -> Result<NextTasksResult> {
        let config = self.config.load();
        let (project_id, feature_id) = match scope {
            Scope::Catalog => (None, None),
            Scope::Project(id) => (Some(id), None),
            Scope::Feature(id) => (None, Some(id)),
        };

        let queue_statuses: Vec<String> = config
            .statuses_for_role(&Role::Queue, EntityType::Task)
            .into_iter()
            .collect();
        let candidates = self
            .tasks
            .list_candidates(project_id, feature_id, &queue_statuses)
            .await?;
        let total_candidates = candidates.len();

        let mut unblocked = Vec::with_capacity(candidates.len());
        for task in candidates {
            if self.is_unblocked(task.id).await? {
                unblocked.push(task);
            }
        }
        let unblocked_candidates = unblocked.len();

        unblocked.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then(a.complexity.cmp(&b.complexity))
                .then(a.created_at.cmp(&b.created_at))
        });

        let effective_limit = limit.unwrap_or(DEFAULT_LIMIT) as usize;
        let truncated: Vec<Task> = unblocked.into_iter().take(effective_limit).collect();

        let mut in_flight_statuses: Vec<String> = config
            .statuses_for_role(&Role::Work, EntityType::Task)
            .into_iter()
            .collect();
        in_flight_statuses.extend(config.statuses_for_role(&Role::Review, EntityType::Task));

        let in_flight = if in_flight_statuses.is_empty() {
            0
        } else {
            let status_in = in_flight_statuses
                .into_iter()
                .map(StatusName::new)
                .collect::<Result<Vec<_>>>()?;
            self.tasks
                .find_by_filters(EntityFilter {
                    project_id,
                    feature_id,
                    status_in,
                    limit: 1000,
                    ..Default::default()
                })
                .await?
                .len()
        };

        let mode = classify_mode(truncated.len(), in_flight, total_candidates);
        let diagnostic = if truncated.is_empty() {
            Some(
                if total_candidates == 0 {
                    if in_flight > 0 {
                        "all tasks are in flight or terminal".to_string()
                    } else {
                        "nothing pending".to_string()
                    }
                } else {
                    "all pending tasks are blocked".to_string()
                },
            )
        } else {
            None
        };

        Ok(NextTasksResult {
            tasks: truncated.iter().map(|t| project_brief(t, include_details)).collect(),
            unblocked_candidates,
            total_candidates,
            mode,
            diagnostic,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_classification_matches_spec_table() {
        assert_eq!(classify_mode(3, 0, 3), RecommendationMode::ParallelBatch);
        assert_eq!(classify_mode(2, 1, 5), RecommendationMode::IncrementalBatch);
        assert_eq!(classify_mode(1, 0, 1), RecommendationMode::Sequential);
        assert_eq!(classify_mode(1, 2, 3), RecommendationMode::IncrementalBatch);
        assert_eq!(classify_mode(0, 2, 2), RecommendationMode::Waiting);
        assert_eq!(classify_mode(0, 0, 4), RecommendationMode::Blocked);
        assert_eq!(classify_mode(0, 0, 0), RecommendationMode::Complete);
    }
}
