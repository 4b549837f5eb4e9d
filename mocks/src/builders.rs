//! Fluent builders for constructing test data, generalized from the
//! teacher's `TaskBuilder` (id/code/name/state chain) to this domain's
//! `New*` input structs across Project/Feature/Task/Dependency.

use chrono::Utc;
use orchestrator_core::models::{
    DependencyType, EntityFilter, NewDependency, NewFeature, NewProject, NewSection, NewTask,
    Priority, StatusName, UnblockAt,
};
use uuid::Uuid;

/// Builder for `NewTask`, defaulting to a medium-priority, complexity-3
/// pending task with no parent.
pub struct TaskBuilder {
    task: NewTask,
}

impl Default for TaskBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskBuilder {
    pub fn new() -> Self {
        Self {
            task: NewTask {
                feature_id: None,
                project_id: None,
                title: "Untitled task".to_string(),
                summary: None,
                status: StatusName::new("pending").unwrap(),
                priority: Priority::Medium,
                complexity: 3,
                tags: Vec::new(),
            },
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.task.title = title.into();
        self
    }

    pub fn with_status(mut self, status: &str) -> Self {
        self.task.status = StatusName::new(status).unwrap();
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.task.priority = priority;
        self
    }

    pub fn with_complexity(mut self, complexity: u8) -> Self {
        self.task.complexity = complexity;
        self
    }

    pub fn with_feature(mut self, feature_id: Uuid) -> Self {
        self.task.feature_id = Some(feature_id);
        self
    }

    pub fn with_project(mut self, project_id: Uuid) -> Self {
        self.task.project_id = Some(project_id);
        self
    }

    pub fn with_tags(mut self, tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.task.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn build(self) -> NewTask {
        self.task
    }
}

/// Builder for `NewProject`.
pub struct ProjectBuilder {
    project: NewProject,
}

impl Default for ProjectBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ProjectBuilder {
    pub fn new() -> Self {
        Self {
            project: NewProject {
                name: "Untitled project".to_string(),
                description: None,
                summary: None,
                status: StatusName::new("pending").unwrap(),
                tags: Vec::new(),
            },
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.project.name = name.into();
        self
    }

    pub fn with_status(mut self, status: &str) -> Self {
        self.project.status = StatusName::new(status).unwrap();
        self
    }

    pub fn with_tags(mut self, tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.project.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn build(self) -> NewProject {
        self.project
    }
}

/// Builder for `NewFeature`.
pub struct FeatureBuilder {
    feature: NewFeature,
}

impl Default for FeatureBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureBuilder {
    pub fn new() -> Self {
        Self {
            feature: NewFeature {
                project_id: None,
                name: "Untitled feature".to_string(),
                summary: None,
                status: StatusName::new("pending").unwrap(),
                priority: Priority::Medium,
                tags: Vec::new(),
            },
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.feature.name = name.into();
        self
    }

    pub fn with_project(mut self, project_id: Uuid) -> Self {
        self.feature.project_id = Some(project_id);
        self
    }

    pub fn with_status(mut self, status: &str) -> Self {
        self.feature.status = StatusName::new(status).unwrap();
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.feature.priority = priority;
        self
    }

    pub fn build(self) -> NewFeature {
        self.feature
    }
}

/// Builder for a BLOCKS `NewDependency` (the dependency type exercised by
/// almost every scheduling test); other types can be set with
/// `with_type`.
pub struct DependencyBuilder {
    dep: NewDependency,
}

impl DependencyBuilder {
    pub fn blocks(from_task_id: Uuid, to_task_id: Uuid) -> Self {
        Self {
            dep: NewDependency {
                from_task_id,
                to_task_id,
                dep_type: DependencyType::Blocks,
                unblock_at: None,
            },
        }
    }

    pub fn with_type(mut self, dep_type: DependencyType) -> Self {
        self.dep.dep_type = dep_type;
        self
    }

    pub fn with_unblock_at(mut self, unblock_at: UnblockAt) -> Self {
        self.dep.unblock_at = Some(unblock_at);
        self
    }

    pub fn build(self) -> NewDependency {
        self.dep
    }
}

/// Builder for a `NewSection`.
pub struct SectionBuilder {
    section: NewSection,
}

impl SectionBuilder {
    pub fn new(entity_type: orchestrator_core::models::EntityType, entity_id: Uuid) -> Self {
        Self {
            section: NewSection {
                entity_type,
                entity_id,
                title: "Untitled section".to_string(),
                usage_description: None,
                content: String::new(),
                content_format: "markdown".to_string(),
                ordinal: 0,
                tags: Vec::new(),
            },
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.section.title = title.into();
        self
    }

    pub fn with_ordinal(mut self, ordinal: i32) -> Self {
        self.section.ordinal = ordinal;
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.section.content = content.into();
        self
    }

    pub fn build(self) -> NewSection {
        self.section
    }
}

/// Builder for `EntityFilter`, defaulting to an unbounded filter with the
/// teacher's conventional `limit = 20`.
pub struct EntityFilterBuilder {
    filter: EntityFilter,
}

impl Default for EntityFilterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityFilterBuilder {
    pub fn new() -> Self {
        Self {
            filter: EntityFilter {
                limit: 20,
                ..Default::default()
            },
        }
    }

    pub fn with_project(mut self, project_id: Uuid) -> Self {
        self.filter.project_id = Some(project_id);
        self
    }

    pub fn with_status_in(mut self, statuses: impl IntoIterator<Item = &'static str>) -> Self {
        self.filter.status_in = statuses.into_iter().map(|s| StatusName::new(s).unwrap()).collect();
        self
    }

    pub fn with_tags(mut self, tags: impl IntoIterator<Item = impl Into<String>>, match_all: bool) -> Self {
        self.filter.tags = tags.into_iter().map(Into::into).collect();
        self.filter.match_all_tags = match_all;
        self
    }

    pub fn with_text_query(mut self, query: impl Into<String>) -> Self {
        self.filter.text_query = Some(query.into());
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.filter.limit = limit;
        self
    }

    pub fn build(self) -> EntityFilter {
        self.filter
    }
}

/// Convenience matching the teacher's free function `create_new_task`.
pub fn create_new_task() -> NewTask {
    TaskBuilder::new().build()
}

/// A `NewTask` timestamped in the name so bulk-create tests get unique
/// titles without manual bookkeeping.
pub fn create_uniquely_named_task() -> NewTask {
    TaskBuilder::new()
        .with_title(format!("Task {}", Uuid::new_v4()))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_builder_applies_overrides() {
        let task = TaskBuilder::new()
            .with_title("Design the scheduler")
            .with_priority(Priority::High)
            .with_complexity(7)
            .build();
        assert_eq!(task.title, "Design the scheduler");
        assert_eq!(task.priority, Priority::High);
        assert_eq!(task.complexity, 7);
    }

    #[test]
    fn dependency_builder_defaults_to_blocks_with_no_unblock_at() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let dep = DependencyBuilder::blocks(a, b).build();
        assert_eq!(dep.dep_type, DependencyType::Blocks);
        assert_eq!(dep.unblock_at, None);
    }

    #[test]
    fn filter_builder_composes_status_and_tags() {
        let filter = EntityFilterBuilder::new()
            .with_status_in(["pending"])
            .with_tags(["backend"], false)
            .build();
        assert_eq!(filter.status_in.len(), 1);
        assert_eq!(filter.tags, vec!["backend".to_string()]);
    }

    #[test]
    fn uses_current_time_consistently() {
        assert!(Utc::now().timestamp() > 0);
    }
}
