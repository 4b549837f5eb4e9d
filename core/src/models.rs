//! Domain model for the task-orchestration backend: Project, Feature, Task,
//! Section, Dependency, RoleTransition, and the small set of value types
//! (Role, Priority, StatusName, Trigger) shared across them.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{OrchestratorError, Result};

/// A validated, non-empty status name. Unlike the teacher's closed
/// `TaskState` enum, the legal set of statuses is defined at runtime by
/// `WorkflowConfig`, so this is a newtype around `String` rather than a
/// fixed enum.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusName(String);

impl StatusName {
    pub fn new(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(OrchestratorError::empty_field("status"));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StatusName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<StatusName> for String {
    fn from(s: StatusName) -> Self {
        s.0
    }
}

/// A coarse lifecycle classification used by the scheduling algorithms.
/// The four built-in orderable roles plus `Blocked` are closed per
/// `spec.md` §4.1; `Custom` covers any additional role name a workflow
/// document may declare, which carries no built-in ordering.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Queue,
    Work,
    Review,
    Blocked,
    Terminal,
    #[serde(untagged)]
    Custom(String),
}

impl Role {
    /// Ordinal used by the blocking-resolution algorithm's
    /// `queue < work < review < terminal` ordering. `Blocked` and
    /// `Custom` roles are not part of that ordering and return `None`.
    pub fn order(&self) -> Option<u8> {
        match self {
            Role::Queue => Some(0),
            Role::Work => Some(1),
            Role::Review => Some(2),
            Role::Terminal => Some(3),
            Role::Blocked | Role::Custom(_) => None,
        }
    }

    /// `self >= other` in the blocking-resolution ordering. Roles outside
    /// the ordering (`Blocked`, `Custom`) never satisfy this.
    pub fn meets_or_exceeds(&self, other: &Role) -> bool {
        match (self.order(), other.order()) {
            (Some(a), Some(b)) => a >= b,
            _ => false,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Queue => write!(f, "queue"),
            Role::Work => write!(f, "work"),
            Role::Review => write!(f, "review"),
            Role::Blocked => write!(f, "blocked"),
            Role::Terminal => write!(f, "terminal"),
            Role::Custom(name) => write!(f, "{name}"),
        }
    }
}

impl Role {
    pub fn parse(name: &str) -> Role {
        match name {
            "queue" => Role::Queue,
            "work" => Role::Work,
            "review" => Role::Review,
            "blocked" => Role::Blocked,
            "terminal" => Role::Terminal,
            other => Role::Custom(other.to_string()),
        }
    }
}

/// Scheduling priority. Ordered `Low < Medium < High` so the
/// Recommendation Engine can sort candidates `priority DESC`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::Low => write!(f, "LOW"),
            Priority::Medium => write!(f, "MEDIUM"),
            Priority::High => write!(f, "HIGH"),
        }
    }
}

/// The trigger taxonomy from `spec.md` §4.3 naming why a transition was
/// requested; `Reopen` is the only trigger legal from a terminal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    Start,
    Complete,
    Cancel,
    Block,
    Resume,
    Reopen,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Trigger::Start => "start",
            Trigger::Complete => "complete",
            Trigger::Cancel => "cancel",
            Trigger::Block => "block",
            Trigger::Resume => "resume",
            Trigger::Reopen => "reopen",
        };
        write!(f, "{s}")
    }
}

/// Which kind of container or leaf entity a `Section`, `Dependency` (for
/// role-transition purposes), or `RoleTransition` event is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Project,
    Feature,
    Task,
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntityType::Project => "project",
            EntityType::Feature => "feature",
            EntityType::Task => "task",
        };
        write!(f, "{s}")
    }
}

impl EntityType {
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "project" => Ok(EntityType::Project),
            "feature" => Ok(EntityType::Feature),
            "task" => Ok(EntityType::Task),
            other => Err(OrchestratorError::validation(format!(
                "unknown entity type: {other}"
            ))),
        }
    }
}

fn normalize_tags(tags: impl IntoIterator<Item = String>) -> BTreeSet<String> {
    tags.into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

/// True if `tags` contains a case-insensitive match for `needle`.
pub fn tags_contain_ci(tags: &BTreeSet<String>, needle: &str) -> bool {
    let needle = needle.to_lowercase();
    tags.iter().any(|t| t.to_lowercase() == needle)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub summary: Option<String>,
    pub status: StatusName,
    pub tags: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProject {
    pub name: String,
    pub description: Option<String>,
    pub summary: Option<String>,
    pub status: StatusName,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateProject {
    pub name: Option<String>,
    pub description: Option<String>,
    pub summary: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl NewProject {
    pub fn normalized_tags(&self) -> BTreeSet<String> {
        normalize_tags(self.tags.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub id: Uuid,
    pub project_id: Option<Uuid>,
    pub name: String,
    pub summary: Option<String>,
    pub status: StatusName,
    pub priority: Priority,
    pub tags: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewFeature {
    pub project_id: Option<Uuid>,
    pub name: String,
    pub summary: Option<String>,
    pub status: StatusName,
    pub priority: Priority,
    pub tags: Vec<String>,
}

impl NewFeature {
    pub fn normalized_tags(&self) -> BTreeSet<String> {
        normalize_tags(self.tags.clone())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateFeature {
    pub name: Option<String>,
    pub summary: Option<String>,
    pub priority: Option<Priority>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub feature_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
    pub title: String,
    pub summary: Option<String>,
    pub status: StatusName,
    pub priority: Priority,
    pub complexity: u8,
    pub tags: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTask {
    pub feature_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
    pub title: String,
    pub summary: Option<String>,
    pub status: StatusName,
    pub priority: Priority,
    pub complexity: u8,
    pub tags: Vec<String>,
}

impl NewTask {
    pub fn normalized_tags(&self) -> BTreeSet<String> {
        normalize_tags(self.tags.clone())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateTask {
    pub title: Option<String>,
    pub summary: Option<String>,
    pub priority: Option<Priority>,
    pub complexity: Option<u8>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub id: Uuid,
    pub entity_type: EntityType,
    pub entity_id: Uuid,
    pub title: String,
    pub usage_description: Option<String>,
    pub content: String,
    pub content_format: String,
    pub ordinal: i32,
    pub tags: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSection {
    pub entity_type: EntityType,
    pub entity_id: Uuid,
    pub title: String,
    pub usage_description: Option<String>,
    pub content: String,
    pub content_format: String,
    pub ordinal: i32,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyType {
    Blocks,
    RelatesTo,
    IsBlockedBy,
}

impl fmt::Display for DependencyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DependencyType::Blocks => "BLOCKS",
            DependencyType::RelatesTo => "RELATES_TO",
            DependencyType::IsBlockedBy => "IS_BLOCKED_BY",
        };
        write!(f, "{s}")
    }
}

impl DependencyType {
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "BLOCKS" => Ok(DependencyType::Blocks),
            "RELATES_TO" => Ok(DependencyType::RelatesTo),
            "IS_BLOCKED_BY" => Ok(DependencyType::IsBlockedBy),
            other => Err(OrchestratorError::validation(format!(
                "unknown dependency type: {other}"
            ))),
        }
    }
}

/// The role a BLOCKS edge's source task must reach before the target
/// becomes eligible. A strict subset of `Role` — `blocked` is excluded
/// per `spec.md` §4.4 ("not `blocked`").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnblockAt {
    Queue,
    Work,
    Review,
    Terminal,
}

impl Default for UnblockAt {
    fn default() -> Self {
        UnblockAt::Terminal
    }
}

impl UnblockAt {
    pub fn as_role(&self) -> Role {
        match self {
            UnblockAt::Queue => Role::Queue,
            UnblockAt::Work => Role::Work,
            UnblockAt::Review => Role::Review,
            UnblockAt::Terminal => Role::Terminal,
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "queue" => Ok(UnblockAt::Queue),
            "work" => Ok(UnblockAt::Work),
            "review" => Ok(UnblockAt::Review),
            "terminal" => Ok(UnblockAt::Terminal),
            "blocked" => Err(OrchestratorError::validation(
                "unblockAt cannot be 'blocked'",
            )),
            other => Err(OrchestratorError::validation(format!(
                "unknown unblockAt role: {other}"
            ))),
        }
    }
}

impl fmt::Display for UnblockAt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_role())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dependency {
    pub id: Uuid,
    pub from_task_id: Uuid,
    pub to_task_id: Uuid,
    pub dep_type: DependencyType,
    pub unblock_at: Option<UnblockAt>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDependency {
    pub from_task_id: Uuid,
    pub to_task_id: Uuid,
    pub dep_type: DependencyType,
    pub unblock_at: Option<UnblockAt>,
}

impl NewDependency {
    /// Structural validation independent of any existing graph state:
    /// self-edges are rejected and `unblockAt` is only legal on BLOCKS
    /// edges (defaulting to `terminal` when unspecified).
    pub fn validated(mut self) -> Result<Self> {
        if self.from_task_id == self.to_task_id {
            return Err(OrchestratorError::validation(
                "a dependency cannot reference the same task as both ends",
            ));
        }
        match self.dep_type {
            DependencyType::Blocks => {
                if self.unblock_at.is_none() {
                    self.unblock_at = Some(UnblockAt::default());
                }
            }
            _ => {
                if self.unblock_at.is_some() {
                    return Err(OrchestratorError::validation(
                        "unblockAt is only valid on BLOCKS dependencies",
                    ));
                }
            }
        }
        Ok(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleTransition {
    pub id: Uuid,
    pub entity_id: Uuid,
    pub entity_type: EntityType,
    pub from_role: Option<Role>,
    pub to_role: Role,
    pub from_status: StatusName,
    pub to_status: StatusName,
    pub trigger: Trigger,
    pub timestamp: DateTime<Utc>,
}

/// A scope for `getNextTasks` / `query_container`: the whole catalog, or
/// narrowed to one project or feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Scope {
    Catalog,
    Project(Uuid),
    Feature(Uuid),
}

/// Multi-value include/exclude + tag + text filter shared by
/// `findByFilters` across every versioned entity, per `spec.md` §4.2.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityFilter {
    pub project_id: Option<Uuid>,
    pub feature_id: Option<Uuid>,
    pub status_in: Vec<StatusName>,
    pub status_not_in: Vec<StatusName>,
    pub priority_in: Vec<Priority>,
    pub tags: Vec<String>,
    pub match_all_tags: bool,
    pub text_query: Option<String>,
    pub limit: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_name_rejects_blank() {
        assert!(StatusName::new("  ").is_err());
        assert!(StatusName::new("pending").is_ok());
    }

    #[test]
    fn role_ordering_matches_spec() {
        assert!(Role::Work.meets_or_exceeds(&Role::Queue));
        assert!(Role::Terminal.meets_or_exceeds(&Role::Review));
        assert!(!Role::Queue.meets_or_exceeds(&Role::Work));
        assert!(!Role::Blocked.meets_or_exceeds(&Role::Queue));
        assert!(!Role::Queue.meets_or_exceeds(&Role::Blocked));
    }

    #[test]
    fn priority_orders_low_to_high() {
        assert!(Priority::High > Priority::Medium);
        assert!(Priority::Medium > Priority::Low);
    }

    #[test]
    fn new_dependency_defaults_unblock_at_to_terminal() {
        let dep = NewDependency {
            from_task_id: Uuid::new_v4(),
            to_task_id: Uuid::new_v4(),
            dep_type: DependencyType::Blocks,
            unblock_at: None,
        }
        .validated()
        .unwrap();
        assert_eq!(dep.unblock_at, Some(UnblockAt::Terminal));
    }

    #[test]
    fn new_dependency_rejects_self_edge() {
        let id = Uuid::new_v4();
        let dep = NewDependency {
            from_task_id: id,
            to_task_id: id,
            dep_type: DependencyType::Blocks,
            unblock_at: None,
        };
        assert!(dep.validated().is_err());
    }

    #[test]
    fn new_dependency_rejects_unblock_at_on_non_blocks() {
        let dep = NewDependency {
            from_task_id: Uuid::new_v4(),
            to_task_id: Uuid::new_v4(),
            dep_type: DependencyType::RelatesTo,
            unblock_at: Some(UnblockAt::Work),
        };
        assert!(dep.validated().is_err());
    }

    #[test]
    fn tag_match_is_case_insensitive() {
        let tags: BTreeSet<String> = ["Bug".to_string()].into_iter().collect();
        assert!(tags_contain_ci(&tags, "bug"));
        assert!(tags_contain_ci(&tags, "BUG"));
        assert!(!tags_contain_ci(&tags, "feature"));
    }
}
