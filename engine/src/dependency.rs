//! Dependency Engine (`spec.md` §4.4): batch creation patterns and the
//! blocking-resolution algorithm that decides whether a BLOCKS edge's
//! target is still blocked.
//!
//! Grounded in `other_examples/fwindolf-beads-rs`'s dependency-graph
//! batch helpers, composed with the teacher's whole-method-transaction
//! style from `database/src/sqlite.rs`.

use std::fmt;

use uuid::Uuid;

use orchestrator_core::error::Result;
use orchestrator_core::models::{Dependency, DependencyType, EntityType, NewDependency, Role, UnblockAt};
use orchestrator_core::repository::{DependencyRepository, TaskRepository};
use orchestrator_core::workflow_config::WorkflowConfigSnapshot;

use crate::Engine;

/// Named batch shapes from `spec.md` §4.4: all expand to a flat
/// `Vec<NewDependency>` and are submitted through the same
/// `DependencyRepository::create_batch` transaction.
#[derive(Debug, Clone)]
pub enum DependencyPattern {
    /// `a -> b -> c -> ...`: each task blocks the next.
    Linear(Vec<Uuid>),
    /// `source -> [targets...]`: one task blocks several others.
    FanOut { source: Uuid, targets: Vec<Uuid> },
    /// `[sources...] -> target`: several tasks each block one.
    FanIn { sources: Vec<Uuid>, target: Uuid },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyValidationError(pub String);

impl fmt::Display for DependencyValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for DependencyValidationError {}

impl DependencyPattern {
    /// Expand into individual BLOCKS edges, defaulting `unblockAt` to
    /// `terminal` on every edge. Rejects patterns with fewer than two
    /// distinct participants.
    pub fn expand(self) -> std::result::Result<Vec<NewDependency>, DependencyValidationError> {
        let edges: Vec<(Uuid, Uuid)> = match self {
            DependencyPattern::Linear(ids) => {
                if ids.len() < 2 {
                    return Err(DependencyValidationError(
                        "a linear pattern needs at least two tasks".to_string(),
                    ));
                }
                ids.windows(2).map(|pair| (pair[0], pair[1])).collect()
            }
            DependencyPattern::FanOut { source, targets } => {
                if targets.is_empty() {
                    return Err(DependencyValidationError(
                        "a fan-out pattern needs at least one target".to_string(),
                    ));
                }
                targets.into_iter().map(|target| (source, target)).collect()
            }
            DependencyPattern::FanIn { sources, target } => {
                if sources.is_empty() {
                    return Err(DependencyValidationError(
                        "a fan-in pattern needs at least one source".to_string(),
                    ));
                }
                sources.into_iter().map(|source| (source, target)).collect()
            }
        };

        Ok(edges
            .into_iter()
            .map(|(from_task_id, to_task_id)| NewDependency {
                from_task_id,
                to_task_id,
                dep_type: DependencyType::Blocks,
                unblock_at: Some(UnblockAt::Terminal),
            })
            .collect())
    }
}

/// The role a blocker must reach, per-edge: `unblockAt` if set, else
/// `terminal` (the BLOCKS-edge default per invariant in `spec.md` §4.1).
fn required_role(dep: &Dependency) -> Role {
    dep.unblock_at.unwrap_or_default().as_role()
}

/// `roleForStatus`-backed resolution of whether `status` satisfies
/// `required`. Returns `false` when the status has no role mapping at
/// all (an unmapped status can never satisfy a required role).
fn satisfies(status: &str, required: &Role, entity_type: EntityType, config: &WorkflowConfigSnapshot) -> bool {
    config
        .role_for_status(status, entity_type)
        .map(|role| role.meets_or_exceeds(required))
        .unwrap_or(false)
}

/// Legacy fallback from `spec.md` §4.4: when the Status Progression
/// Service's config is unavailable, a blocker only counts as resolved
/// once its status is one of the two hardcoded terminal names, ignoring
/// `unblockAt` entirely.
fn satisfies_legacy(status: &str) -> bool {
    matches!(status, "completed" | "cancelled")
}

impl<P, F, T, S, D, G, RT> Engine<P, F, T, S, D, G, RT>
where
    T: TaskRepository,
    D: DependencyRepository,
{
    /// Expand and submit a named batch pattern in one transaction,
    /// deferring cycle rejection to `DependencyRepository::create_batch`
    /// (which checks the provisional graph as it accepts each edge).
    pub async fn create_dependency_batch(
        &self,
        pattern: DependencyPattern,
    ) -> std::result::Result<Vec<Dependency>, BatchCreationError> {
        let edges = pattern.expand().map_err(BatchCreationError::Validation)?;
        self.dependencies
            .create_batch(edges)
            .await
            .map_err(BatchCreationError::Repository)
    }

    /// Whether `task_id` is currently unblocked: every inbound BLOCKS
    /// edge's source must have reached at least the edge's required
    /// role. A task with no inbound BLOCKS edges is trivially unblocked.
    pub async fn is_unblocked(&self, task_id: Uuid) -> Result<bool> {
        let config = self.config.load();
        let inbound = self.dependencies.find_by_to_task_id(task_id).await?;
        for dep in inbound.iter().filter(|d| d.dep_type == DependencyType::Blocks) {
            let Some(blocker) = self.tasks.get_by_id(dep.from_task_id).await? else {
                // A dangling edge (blocker deleted without cleaning up the
                // edge) cannot be resolved in the blocker's favor.
                return Ok(false);
            };
            if !satisfies(blocker.status.as_str(), &required_role(dep), EntityType::Task, &config) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Same resolution, but without the workflow config: every blocker
    /// must be `completed` or `cancelled` regardless of `unblockAt`. Used
    /// when the Status Progression Service's config cannot be loaded.
    pub async fn is_unblocked_legacy(&self, task_id: Uuid) -> Result<bool> {
        let inbound = self.dependencies.find_by_to_task_id(task_id).await?;
        for dep in inbound.iter().filter(|d| d.dep_type == DependencyType::Blocks) {
            let Some(blocker) = self.tasks.get_by_id(dep.from_task_id).await? else {
                return Ok(false);
            };
            if !satisfies_legacy(blocker.status.as_str()) {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

#[derive(Debug)]
pub enum BatchCreationError {
    Validation(DependencyValidationError),
    Repository(orchestrator_core::error::OrchestratorError),
}

impl fmt::Display for BatchCreationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchCreationError::Validation(e) => write!(f, "{e}"),
            BatchCreationError::Repository(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for BatchCreationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_pattern_expands_to_chained_edges() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        let edges = DependencyPattern::Linear(vec![a, b, c]).expand().unwrap();
        assert_eq!(edges.len(), 2);
        assert_eq!(edges[0].from_task_id, a);
        assert_eq!(edges[0].to_task_id, b);
        assert_eq!(edges[1].from_task_id, b);
        assert_eq!(edges[1].to_task_id, c);
    }

    #[test]
    fn fan_out_expands_one_to_many() {
        let source = Uuid::new_v4();
        let t1 = Uuid::new_v4();
        let t2 = Uuid::new_v4();
        let edges = DependencyPattern::FanOut {
            source,
            targets: vec![t1, t2],
        }
        .expand()
        .unwrap();
        assert_eq!(edges.len(), 2);
        assert!(edges.iter().all(|e| e.from_task_id == source));
    }

    #[test]
    fn linear_pattern_rejects_single_task() {
        let result = DependencyPattern::Linear(vec![Uuid::new_v4()]).expand();
        assert!(result.is_err());
    }

    #[test]
    fn legacy_fallback_ignores_unblock_at() {
        assert!(satisfies_legacy("completed"));
        assert!(satisfies_legacy("cancelled"));
        assert!(!satisfies_legacy("in-review"));
    }
}
