//! In-memory implementation of every `orchestrator_core::repository`
//! trait, generalized from the teacher's `MockTaskRepository` (error
//! injection, call-history tracking, thread-safe `parking_lot::Mutex`
//! state) to the Project/Feature/Task/Section/Tag/Dependency/
//! RoleTransition entity model.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use uuid::Uuid;

use orchestrator_core::error::{OrchestratorError, Result};
use orchestrator_core::models::{
    Dependency, DependencyType, EntityFilter, EntityType, Feature, NewDependency, NewFeature,
    NewProject, NewSection, NewTask, Project, RoleTransition, Section, StatusName, Task,
    UpdateFeature, UpdateProject, UpdateTask,
};
use orchestrator_core::repository::{
    DependencyRepository, FeatureRepository, HealthCheck, ProjectRepository, RepositoryStats,
    RoleTransitionRepository, SectionRepository, TagRepository, TaskRepository,
};

fn normalize(tags: Vec<String>) -> BTreeSet<String> {
    tags.into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Thread-safe, fully in-memory implementation of every repository
/// trait, backed by `parking_lot::Mutex<HashMap<...>>` state and
/// supporting error injection + call-history tracking for verification,
/// mirroring the teacher's `MockTaskRepository` shape across seven
/// entity kinds instead of one.
pub struct InMemoryStore {
    projects: Mutex<HashMap<Uuid, Project>>,
    features: Mutex<HashMap<Uuid, Feature>>,
    tasks: Mutex<HashMap<Uuid, Task>>,
    sections: Mutex<HashMap<Uuid, Section>>,
    dependencies: Mutex<HashMap<Uuid, Dependency>>,
    role_transitions: Mutex<Vec<RoleTransition>>,
    tags: Mutex<HashMap<(EntityType, Uuid), BTreeSet<String>>>,
    error_injection: Mutex<Option<OrchestratorError>>,
    call_history: Mutex<Vec<String>>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            projects: Mutex::new(HashMap::new()),
            features: Mutex::new(HashMap::new()),
            tasks: Mutex::new(HashMap::new()),
            sections: Mutex::new(HashMap::new()),
            dependencies: Mutex::new(HashMap::new()),
            role_transitions: Mutex::new(Vec::new()),
            tags: Mutex::new(HashMap::new()),
            error_injection: Mutex::new(None),
            call_history: Mutex::new(Vec::new()),
        }
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Inject an error to be returned (and consumed) by the next call.
    pub fn inject_error(&self, error: OrchestratorError) {
        *self.error_injection.lock() = Some(error);
    }

    pub fn clear_error(&self) {
        *self.error_injection.lock() = None;
    }

    pub fn call_history(&self) -> Vec<String> {
        self.call_history.lock().clone()
    }

    pub fn clear_history(&self) {
        self.call_history.lock().clear();
    }

    pub fn assert_called(&self, method: &str) {
        let history = self.call_history.lock();
        assert!(
            history.iter().any(|call| call.contains(method)),
            "Method '{method}' was not called. Call history: {history:?}"
        );
    }

    fn record(&self, call: impl Into<String>) {
        self.call_history.lock().push(call.into());
    }

    fn check_error_injection(&self) -> Result<()> {
        if let Some(error) = self.error_injection.lock().take() {
            return Err(error);
        }
        Ok(())
    }

    fn tags_for(&self, entity_type: EntityType, id: Uuid) -> BTreeSet<String> {
        self.tags.lock().get(&(entity_type, id)).cloned().unwrap_or_default()
    }

    fn set_tags_locked(&self, entity_type: EntityType, id: Uuid, tags: BTreeSet<String>) {
        self.tags.lock().insert((entity_type, id), tags);
    }
}

fn matches_filter(
    filter: &EntityFilter,
    project_id: Option<Uuid>,
    feature_id: Option<Uuid>,
    status: &StatusName,
    tags: &BTreeSet<String>,
    searchable_text: &str,
) -> bool {
    if let Some(pid) = filter.project_id {
        if project_id != Some(pid) {
            return false;
        }
    }
    if let Some(fid) = filter.feature_id {
        if feature_id != Some(fid) {
            return false;
        }
    }
    if !filter.status_in.is_empty() && !filter.status_in.contains(status) {
        return false;
    }
    if filter.status_not_in.contains(status) {
        return false;
    }
    if !filter.tags.is_empty() {
        let matched = if filter.match_all_tags {
            filter.tags.iter().all(|t| tags.contains(t))
        } else {
            filter.tags.iter().any(|t| tags.contains(t))
        };
        if !matched {
            return false;
        }
    }
    if let Some(query) = &filter.text_query {
        let terms: Vec<&str> = query.split_whitespace().collect();
        if terms.is_empty() {
            return false;
        }
        let haystack = searchable_text.to_lowercase();
        if !terms.iter().all(|t| haystack.contains(&t.to_lowercase())) {
            return false;
        }
    }
    true
}

#[async_trait]
impl ProjectRepository for InMemoryStore {
    async fn create(&self, project: NewProject) -> Result<Project> {
        self.record(format!("project.create({})", project.name));
        self.check_error_injection()?;

        let now = Utc::now();
        let entity = Project {
            id: Uuid::new_v4(),
            name: project.name,
            description: project.description,
            summary: project.summary,
            status: project.status,
            tags: project.normalized_tags(),
            created_at: now,
            updated_at: now,
            version: 1,
        };
        self.set_tags_locked(EntityType::Project, entity.id, entity.tags.clone());
        self.projects.lock().insert(entity.id, entity.clone());
        Ok(entity)
    }

    async fn update(&self, id: Uuid, version: i32, updates: UpdateProject) -> Result<Project> {
        self.record(format!("project.update({id})"));
        self.check_error_injection()?;

        let mut projects = self.projects.lock();
        let project = projects
            .get_mut(&id)
            .ok_or_else(|| OrchestratorError::not_found("Project", id.to_string()))?;
        if project.version != version {
            return Err(OrchestratorError::conflict(format!(
                "project {id} has version {} but caller expected {version}",
                project.version
            )));
        }
        if let Some(name) = updates.name {
            project.name = name;
        }
        if let Some(description) = updates.description {
            project.description = Some(description);
        }
        if let Some(summary) = updates.summary {
            project.summary = Some(summary);
        }
        if let Some(tags) = updates.tags {
            project.tags = normalize(tags);
            self.set_tags_locked(EntityType::Project, id, project.tags.clone());
        }
        project.version += 1;
        project.updated_at = Utc::now();
        Ok(project.clone())
    }

    async fn set_status(&self, id: Uuid, version: i32, status: &str) -> Result<Project> {
        self.record(format!("project.set_status({id}, {status})"));
        self.check_error_injection()?;

        let mut projects = self.projects.lock();
        let project = projects
            .get_mut(&id)
            .ok_or_else(|| OrchestratorError::not_found("Project", id.to_string()))?;
        if project.version != version {
            return Err(OrchestratorError::conflict(format!(
                "project {id} has version {} but caller expected {version}",
                project.version
            )));
        }
        project.status = StatusName::new(status)?;
        project.version += 1;
        project.updated_at = Utc::now();
        Ok(project.clone())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Project>> {
        self.record(format!("project.get_by_id({id})"));
        self.check_error_injection()?;
        Ok(self.projects.lock().get(&id).cloned())
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        self.record(format!("project.delete({id})"));
        self.check_error_injection()?;
        self.tags.lock().remove(&(EntityType::Project, id));
        Ok(self.projects.lock().remove(&id).is_some())
    }

    async fn find_by_filters(&self, filter: EntityFilter) -> Result<Vec<Project>> {
        self.record("project.find_by_filters");
        self.check_error_injection()?;
        let projects = self.projects.lock();
        let mut result: Vec<Project> = projects
            .values()
            .filter(|p| {
                let text = format!("{} {}", p.name, p.description.clone().unwrap_or_default());
                matches_filter(&filter, None, None, &p.status, &p.tags, &text)
            })
            .cloned()
            .collect();
        result.sort_by_key(|p| p.created_at);
        if filter.limit > 0 {
            result.truncate(filter.limit as usize);
        }
        Ok(result)
    }

    async fn search(&self, query: &str, limit: u32) -> Result<Vec<Project>> {
        self.find_by_filters(EntityFilter {
            text_query: Some(query.to_string()),
            limit,
            ..Default::default()
        })
        .await
    }
}

#[async_trait]
impl FeatureRepository for InMemoryStore {
    async fn create(&self, feature: NewFeature) -> Result<Feature> {
        self.record(format!("feature.create({})", feature.name));
        self.check_error_injection()?;

        if let Some(project_id) = feature.project_id {
            if !self.projects.lock().contains_key(&project_id) {
                return Err(OrchestratorError::validation(format!(
                    "feature references unknown project {project_id}"
                )));
            }
        }

        let now = Utc::now();
        let entity = Feature {
            id: Uuid::new_v4(),
            project_id: feature.project_id,
            name: feature.name,
            summary: feature.summary,
            status: feature.status,
            priority: feature.priority,
            tags: feature.normalized_tags(),
            created_at: now,
            updated_at: now,
            version: 1,
        };
        self.set_tags_locked(EntityType::Feature, entity.id, entity.tags.clone());
        self.features.lock().insert(entity.id, entity.clone());
        Ok(entity)
    }

    async fn update(&self, id: Uuid, version: i32, updates: UpdateFeature) -> Result<Feature> {
        self.record(format!("feature.update({id})"));
        self.check_error_injection()?;

        let mut features = self.features.lock();
        let feature = features
            .get_mut(&id)
            .ok_or_else(|| OrchestratorError::not_found("Feature", id.to_string()))?;
        if feature.version != version {
            return Err(OrchestratorError::conflict(format!(
                "feature {id} has version {} but caller expected {version}",
                feature.version
            )));
        }
        if let Some(name) = updates.name {
            feature.name = name;
        }
        if let Some(summary) = updates.summary {
            feature.summary = Some(summary);
        }
        if let Some(priority) = updates.priority {
            feature.priority = priority;
        }
        if let Some(tags) = updates.tags {
            feature.tags = normalize(tags);
            self.set_tags_locked(EntityType::Feature, id, feature.tags.clone());
        }
        feature.version += 1;
        feature.updated_at = Utc::now();
        Ok(feature.clone())
    }

    async fn set_status(&self, id: Uuid, version: i32, status: &str) -> Result<Feature> {
        self.record(format!("feature.set_status({id}, {status})"));
        self.check_error_injection()?;

        let mut features = self.features.lock();
        let feature = features
            .get_mut(&id)
            .ok_or_else(|| OrchestratorError::not_found("Feature", id.to_string()))?;
        if feature.version != version {
            return Err(OrchestratorError::conflict(format!(
                "feature {id} has version {} but caller expected {version}",
                feature.version
            )));
        }
        feature.status = StatusName::new(status)?;
        feature.version += 1;
        feature.updated_at = Utc::now();
        Ok(feature.clone())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Feature>> {
        self.record(format!("feature.get_by_id({id})"));
        self.check_error_injection()?;
        Ok(self.features.lock().get(&id).cloned())
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        self.record(format!("feature.delete({id})"));
        self.check_error_injection()?;
        self.tags.lock().remove(&(EntityType::Feature, id));
        Ok(self.features.lock().remove(&id).is_some())
    }

    async fn find_by_filters(&self, filter: EntityFilter) -> Result<Vec<Feature>> {
        self.record("feature.find_by_filters");
        self.check_error_injection()?;
        let features = self.features.lock();
        let mut result: Vec<Feature> = features
            .values()
            .filter(|f| {
                let text = format!("{} {}", f.name, f.summary.clone().unwrap_or_default());
                matches_filter(&filter, f.project_id, None, &f.status, &f.tags, &text)
            })
            .cloned()
            .collect();
        result.sort_by_key(|f| f.created_at);
        if filter.limit > 0 {
            result.truncate(filter.limit as usize);
        }
        Ok(result)
    }

    async fn search(&self, query: &str, limit: u32) -> Result<Vec<Feature>> {
        self.find_by_filters(EntityFilter {
            text_query: Some(query.to_string()),
            limit,
            ..Default::default()
        })
        .await
    }

    async fn list_children(&self, project_id: Uuid) -> Result<Vec<Feature>> {
        self.record(format!("feature.list_children({project_id})"));
        self.check_error_injection()?;
        let mut result: Vec<Feature> = self
            .features
            .lock()
            .values()
            .filter(|f| f.project_id == Some(project_id))
            .cloned()
            .collect();
        result.sort_by_key(|f| f.created_at);
        Ok(result)
    }
}

#[async_trait]
impl TaskRepository for InMemoryStore {
    async fn create(&self, task: NewTask) -> Result<Task> {
        self.record(format!("task.create({})", task.title));
        self.check_error_injection()?;

        if let Some(feature_id) = task.feature_id {
            let features = self.features.lock();
            let feature = features
                .get(&feature_id)
                .ok_or_else(|| OrchestratorError::validation(format!("task references unknown feature {feature_id}")))?;
            if let (Some(feature_project), Some(task_project)) = (feature.project_id, task.project_id) {
                if feature_project != task_project {
                    return Err(OrchestratorError::validation(
                        "task's project_id does not match its feature's project_id",
                    ));
                }
            }
        }
        if let Some(project_id) = task.project_id {
            if !self.projects.lock().contains_key(&project_id) {
                return Err(OrchestratorError::validation(format!(
                    "task references unknown project {project_id}"
                )));
            }
        }

        let now = Utc::now();
        let entity = Task {
            id: Uuid::new_v4(),
            feature_id: task.feature_id,
            project_id: task.project_id,
            title: task.title,
            summary: task.summary,
            status: task.status,
            priority: task.priority,
            complexity: task.complexity,
            tags: task.normalized_tags(),
            created_at: now,
            updated_at: now,
            version: 1,
        };
        self.set_tags_locked(EntityType::Task, entity.id, entity.tags.clone());
        self.tasks.lock().insert(entity.id, entity.clone());
        Ok(entity)
    }

    async fn update(&self, id: Uuid, version: i32, updates: UpdateTask) -> Result<Task> {
        self.record(format!("task.update({id})"));
        self.check_error_injection()?;

        let mut tasks = self.tasks.lock();
        let task = tasks
            .get_mut(&id)
            .ok_or_else(|| OrchestratorError::not_found("Task", id.to_string()))?;
        if task.version != version {
            return Err(OrchestratorError::conflict(format!(
                "task {id} has version {} but caller expected {version}",
                task.version
            )));
        }
        if let Some(title) = updates.title {
            task.title = title;
        }
        if let Some(summary) = updates.summary {
            task.summary = Some(summary);
        }
        if let Some(priority) = updates.priority {
            task.priority = priority;
        }
        if let Some(complexity) = updates.complexity {
            task.complexity = complexity;
        }
        if let Some(tags) = updates.tags {
            task.tags = normalize(tags);
            self.set_tags_locked(EntityType::Task, id, task.tags.clone());
        }
        task.version += 1;
        task.updated_at = Utc::now();
        Ok(task.clone())
    }

    async fn set_status(&self, id: Uuid, version: i32, status: &str) -> Result<Task> {
        self.record(format!("task.set_status({id}, {status})"));
        self.check_error_injection()?;

        let mut tasks = self.tasks.lock();
        let task = tasks
            .get_mut(&id)
            .ok_or_else(|| OrchestratorError::not_found("Task", id.to_string()))?;
        if task.version != version {
            return Err(OrchestratorError::conflict(format!(
                "task {id} has version {} but caller expected {version}",
                task.version
            )));
        }
        task.status = StatusName::new(status)?;
        task.version += 1;
        task.updated_at = Utc::now();
        Ok(task.clone())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Task>> {
        self.record(format!("task.get_by_id({id})"));
        self.check_error_injection()?;
        Ok(self.tasks.lock().get(&id).cloned())
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        self.record(format!("task.delete({id})"));
        self.check_error_injection()?;
        self.tags.lock().remove(&(EntityType::Task, id));
        Ok(self.tasks.lock().remove(&id).is_some())
    }

    async fn find_by_filters(&self, filter: EntityFilter) -> Result<Vec<Task>> {
        self.record("task.find_by_filters");
        self.check_error_injection()?;
        let tasks = self.tasks.lock();
        let mut result: Vec<Task> = tasks
            .values()
            .filter(|t| {
                let text = format!("{} {}", t.title, t.summary.clone().unwrap_or_default());
                matches_filter(&filter, t.project_id, t.feature_id, &t.status, &t.tags, &text)
            })
            .cloned()
            .collect();
        result.sort_by_key(|t| t.created_at);
        if filter.limit > 0 {
            result.truncate(filter.limit as usize);
        }
        Ok(result)
    }

    async fn search(&self, query: &str, limit: u32) -> Result<Vec<Task>> {
        self.find_by_filters(EntityFilter {
            text_query: Some(query.to_string()),
            limit,
            ..Default::default()
        })
        .await
    }

    async fn list_children(&self, feature_id: Uuid) -> Result<Vec<Task>> {
        self.record(format!("task.list_children({feature_id})"));
        self.check_error_injection()?;
        let mut result: Vec<Task> = self
            .tasks
            .lock()
            .values()
            .filter(|t| t.feature_id == Some(feature_id))
            .cloned()
            .collect();
        result.sort_by_key(|t| t.created_at);
        Ok(result)
    }

    async fn list_candidates(
        &self,
        project_id: Option<Uuid>,
        feature_id: Option<Uuid>,
        queue_statuses: &[String],
    ) -> Result<Vec<Task>> {
        self.record("task.list_candidates");
        self.check_error_injection()?;
        if queue_statuses.is_empty() {
            return Ok(Vec::new());
        }
        let mut result: Vec<Task> = self
            .tasks
            .lock()
            .values()
            .filter(|t| {
                if let Some(pid) = project_id {
                    if t.project_id != Some(pid) {
                        return false;
                    }
                }
                if let Some(fid) = feature_id {
                    if t.feature_id != Some(fid) {
                        return false;
                    }
                }
                queue_statuses.iter().any(|s| s == t.status.as_str())
            })
            .cloned()
            .collect();
        result.sort_by_key(|t| t.created_at);
        Ok(result)
    }
}

#[async_trait]
impl SectionRepository for InMemoryStore {
    async fn create(&self, section: NewSection) -> Result<Section> {
        self.record(format!("section.create({})", section.title));
        self.check_error_injection()?;

        let existing_ordinals: Vec<i32> = self
            .sections
            .lock()
            .values()
            .filter(|s| s.entity_type == section.entity_type && s.entity_id == section.entity_id)
            .map(|s| s.ordinal)
            .collect();
        if existing_ordinals.contains(&section.ordinal) {
            return Err(OrchestratorError::conflict(format!(
                "ordinal {} already in use for this entity",
                section.ordinal
            )));
        }

        let now = Utc::now();
        let entity = Section {
            id: Uuid::new_v4(),
            entity_type: section.entity_type,
            entity_id: section.entity_id,
            title: section.title,
            usage_description: section.usage_description,
            content: section.content,
            content_format: section.content_format,
            ordinal: section.ordinal,
            tags: normalize(section.tags),
            created_at: now,
            updated_at: now,
            version: 1,
        };
        self.sections.lock().insert(entity.id, entity.clone());
        Ok(entity)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Section>> {
        self.record(format!("section.get_by_id({id})"));
        self.check_error_injection()?;
        Ok(self.sections.lock().get(&id).cloned())
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        self.record(format!("section.delete({id})"));
        self.check_error_injection()?;
        Ok(self.sections.lock().remove(&id).is_some())
    }

    async fn list_for_entity(&self, entity_type: EntityType, entity_id: Uuid) -> Result<Vec<Section>> {
        self.record("section.list_for_entity");
        self.check_error_injection()?;
        let mut result: Vec<Section> = self
            .sections
            .lock()
            .values()
            .filter(|s| s.entity_type == entity_type && s.entity_id == entity_id)
            .cloned()
            .collect();
        result.sort_by_key(|s| s.ordinal);
        Ok(result)
    }

    async fn delete_for_entity(&self, entity_type: EntityType, entity_id: Uuid) -> Result<u64> {
        self.record("section.delete_for_entity");
        self.check_error_injection()?;
        let mut sections = self.sections.lock();
        let ids: Vec<Uuid> = sections
            .values()
            .filter(|s| s.entity_type == entity_type && s.entity_id == entity_id)
            .map(|s| s.id)
            .collect();
        for id in &ids {
            sections.remove(id);
        }
        Ok(ids.len() as u64)
    }

    async fn reorder(
        &self,
        entity_type: EntityType,
        entity_id: Uuid,
        ordered_ids: Vec<Uuid>,
    ) -> Result<Vec<Section>> {
        self.record("section.reorder");
        self.check_error_injection()?;
        let mut sections = self.sections.lock();
        for (ordinal, id) in ordered_ids.iter().enumerate() {
            let section = sections
                .get_mut(id)
                .ok_or_else(|| OrchestratorError::not_found("Section", id.to_string()))?;
            if section.entity_type != entity_type || section.entity_id != entity_id {
                return Err(OrchestratorError::validation(
                    "reorder references a section outside the given entity",
                ));
            }
            section.ordinal = ordinal as i32;
            section.updated_at = Utc::now();
        }
        let mut result: Vec<Section> = sections
            .values()
            .filter(|s| s.entity_type == entity_type && s.entity_id == entity_id)
            .cloned()
            .collect();
        result.sort_by_key(|s| s.ordinal);
        Ok(result)
    }
}

#[async_trait]
impl TagRepository for InMemoryStore {
    async fn set_tags(&self, entity_type: EntityType, entity_id: Uuid, tags: Vec<String>) -> Result<()> {
        self.record("tags.set_tags");
        self.check_error_injection()?;
        self.set_tags_locked(entity_type, entity_id, normalize(tags));
        Ok(())
    }

    async fn find_by_tag(&self, entity_type: EntityType, tag: &str) -> Result<Vec<Uuid>> {
        self.record("tags.find_by_tag");
        self.check_error_injection()?;
        Ok(self
            .tags
            .lock()
            .iter()
            .filter(|((et, _), tags)| *et == entity_type && tags.contains(tag))
            .map(|((_, id), _)| *id)
            .collect())
    }

    async fn find_by_tags(&self, entity_type: EntityType, tags: &[String], match_all: bool) -> Result<Vec<Uuid>> {
        self.record("tags.find_by_tags");
        self.check_error_injection()?;
        Ok(self
            .tags
            .lock()
            .iter()
            .filter(|((et, _), entity_tags)| {
                if *et != entity_type {
                    return false;
                }
                if match_all {
                    tags.iter().all(|t| entity_tags.contains(t))
                } else {
                    tags.iter().any(|t| entity_tags.contains(t))
                }
            })
            .map(|((_, id), _)| *id)
            .collect())
    }

    async fn all_tags(&self, entity_type: EntityType) -> Result<Vec<String>> {
        self.record("tags.all_tags");
        self.check_error_injection()?;
        let mut all: BTreeSet<String> = BTreeSet::new();
        for ((et, _), tags) in self.tags.lock().iter() {
            if *et == entity_type {
                all.extend(tags.iter().cloned());
            }
        }
        Ok(all.into_iter().collect())
    }

    async fn count_by_tag(&self, entity_type: EntityType, tag: &str) -> Result<u64> {
        self.record("tags.count_by_tag");
        self.check_error_injection()?;
        Ok(self
            .tags
            .lock()
            .iter()
            .filter(|((et, _), tags)| *et == entity_type && tags.contains(tag))
            .count() as u64)
    }
}

#[async_trait]
impl DependencyRepository for InMemoryStore {
    async fn create(&self, dep: NewDependency) -> Result<Dependency> {
        self.record("dependency.create");
        self.check_error_injection()?;
        let dep = dep.validated()?;

        if dep.dep_type == DependencyType::Blocks && self.has_cyclic_dependency(dep.from_task_id, dep.to_task_id).await? {
            return Err(OrchestratorError::conflict(
                "this dependency would close a cycle",
            ));
        }

        let dependencies = self.dependencies.lock();
        if dependencies.values().any(|d| {
            d.from_task_id == dep.from_task_id && d.to_task_id == dep.to_task_id && d.dep_type == dep.dep_type
        }) {
            return Err(OrchestratorError::conflict(
                "this dependency triple already exists",
            ));
        }
        drop(dependencies);

        let entity = Dependency {
            id: Uuid::new_v4(),
            from_task_id: dep.from_task_id,
            to_task_id: dep.to_task_id,
            dep_type: dep.dep_type,
            unblock_at: dep.unblock_at,
        };
        self.dependencies.lock().insert(entity.id, entity.clone());
        Ok(entity)
    }

    async fn create_batch(&self, deps: Vec<NewDependency>) -> Result<Vec<Dependency>> {
        self.record("dependency.create_batch");
        self.check_error_injection()?;

        let mut provisional: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        {
            let existing = self.dependencies.lock();
            for dep in existing.values().filter(|d| d.dep_type == DependencyType::Blocks) {
                provisional.entry(dep.from_task_id).or_default().push(dep.to_task_id);
            }
        }

        let mut created = Vec::with_capacity(deps.len());
        for dep in deps {
            let dep = dep.validated()?;
            if dep.dep_type == DependencyType::Blocks
                && provisional_reaches(&provisional, dep.to_task_id, dep.from_task_id)
            {
                return Err(OrchestratorError::conflict(
                    "this batch would close a cycle",
                ));
            }
            let entity = Dependency {
                id: Uuid::new_v4(),
                from_task_id: dep.from_task_id,
                to_task_id: dep.to_task_id,
                dep_type: dep.dep_type,
                unblock_at: dep.unblock_at,
            };
            if dep.dep_type == DependencyType::Blocks {
                provisional.entry(entity.from_task_id).or_default().push(entity.to_task_id);
            }
            self.dependencies.lock().insert(entity.id, entity.clone());
            created.push(entity);
        }
        Ok(created)
    }

    async fn has_cyclic_dependency(&self, from: Uuid, to: Uuid) -> Result<bool> {
        self.record("dependency.has_cyclic_dependency");
        self.check_error_injection()?;
        let dependencies = self.dependencies.lock();
        let mut stack = vec![to];
        let mut visited = std::collections::HashSet::new();
        while let Some(current) = stack.pop() {
            if current == from {
                return Ok(true);
            }
            if !visited.insert(current) {
                continue;
            }
            for dep in dependencies.values().filter(|d| d.dep_type == DependencyType::Blocks && d.from_task_id == current) {
                stack.push(dep.to_task_id);
            }
        }
        Ok(false)
    }

    async fn find_by_to_task_id(&self, task_id: Uuid) -> Result<Vec<Dependency>> {
        self.record("dependency.find_by_to_task_id");
        self.check_error_injection()?;
        Ok(self.dependencies.lock().values().filter(|d| d.to_task_id == task_id).cloned().collect())
    }

    async fn find_by_from_task_id(&self, task_id: Uuid) -> Result<Vec<Dependency>> {
        self.record("dependency.find_by_from_task_id");
        self.check_error_injection()?;
        Ok(self.dependencies.lock().values().filter(|d| d.from_task_id == task_id).cloned().collect())
    }

    async fn find_by_task_id(&self, task_id: Uuid) -> Result<Vec<Dependency>> {
        self.record("dependency.find_by_task_id");
        self.check_error_injection()?;
        Ok(self
            .dependencies
            .lock()
            .values()
            .filter(|d| d.from_task_id == task_id || d.to_task_id == task_id)
            .cloned()
            .collect())
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        self.record(format!("dependency.delete({id})"));
        self.check_error_injection()?;
        Ok(self.dependencies.lock().remove(&id).is_some())
    }

    async fn delete_by_tasks(
        &self,
        from_task_id: Uuid,
        to_task_id: Uuid,
        dep_type: Option<DependencyType>,
    ) -> Result<u64> {
        self.record("dependency.delete_by_tasks");
        self.check_error_injection()?;
        let mut dependencies = self.dependencies.lock();
        let ids: Vec<Uuid> = dependencies
            .values()
            .filter(|d| {
                d.from_task_id == from_task_id
                    && d.to_task_id == to_task_id
                    && dep_type.map(|t| t == d.dep_type).unwrap_or(true)
            })
            .map(|d| d.id)
            .collect();
        for id in &ids {
            dependencies.remove(id);
        }
        Ok(ids.len() as u64)
    }

    async fn delete_all_for_task(&self, task_id: Uuid) -> Result<u64> {
        self.record(format!("dependency.delete_all_for_task({task_id})"));
        self.check_error_injection()?;
        let mut dependencies = self.dependencies.lock();
        let ids: Vec<Uuid> = dependencies
            .values()
            .filter(|d| d.from_task_id == task_id || d.to_task_id == task_id)
            .map(|d| d.id)
            .collect();
        for id in &ids {
            dependencies.remove(id);
        }
        Ok(ids.len() as u64)
    }
}

/// Reachability check over an in-progress adjacency map, mirroring the
/// Storage Layer's `provisional_reaches` used during batch creation so a
/// batch cannot close a cycle against itself before any edge commits.
fn provisional_reaches(adjacency: &HashMap<Uuid, Vec<Uuid>>, from: Uuid, target: Uuid) -> bool {
    let mut stack = vec![from];
    let mut visited = std::collections::HashSet::new();
    while let Some(current) = stack.pop() {
        if current == target {
            return true;
        }
        if !visited.insert(current) {
            continue;
        }
        if let Some(next) = adjacency.get(&current) {
            stack.extend(next.iter().copied());
        }
    }
    false
}

#[async_trait]
impl RoleTransitionRepository for InMemoryStore {
    async fn create(&self, event: RoleTransition) -> Result<RoleTransition> {
        self.record("role_transition.create");
        self.check_error_injection()?;
        self.role_transitions.lock().push(event.clone());
        Ok(event)
    }

    async fn find_by_entity_id(&self, entity_id: Uuid) -> Result<Vec<RoleTransition>> {
        self.record("role_transition.find_by_entity_id");
        self.check_error_injection()?;
        let mut result: Vec<RoleTransition> = self
            .role_transitions
            .lock()
            .iter()
            .filter(|e| e.entity_id == entity_id)
            .cloned()
            .collect();
        result.sort_by_key(|e| e.timestamp);
        Ok(result)
    }
}

#[async_trait]
impl HealthCheck for InMemoryStore {
    async fn health_check(&self) -> Result<()> {
        self.record("health_check");
        self.check_error_injection()?;
        Ok(())
    }

    async fn get_stats(&self) -> Result<RepositoryStats> {
        self.record("get_stats");
        self.check_error_injection()?;
        Ok(RepositoryStats {
            total_projects: self.projects.lock().len() as u64,
            total_features: self.features.lock().len() as u64,
            total_tasks: self.tasks.lock().len() as u64,
            total_dependencies: self.dependencies.lock().len() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orchestrator_core::models::Priority;

    fn sample_task(store: &InMemoryStore) -> Task {
        futures_lite_block_on(store.create(NewTask {
            feature_id: None,
            project_id: None,
            title: "Sample".into(),
            summary: None,
            status: StatusName::new("pending").unwrap(),
            priority: Priority::Medium,
            complexity: 3,
            tags: vec![],
        }))
        .unwrap()
    }

    fn futures_lite_block_on<F: std::future::Future>(fut: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
            .block_on(fut)
    }

    #[test]
    fn optimistic_lock_rejects_stale_version() {
        let store = InMemoryStore::new();
        let task = sample_task(&store);
        let stale_version = task.version - 1;
        let result = futures_lite_block_on(TaskRepository::set_status(
            &store,
            task.id,
            stale_version,
            "in-progress",
        ));
        assert!(result.is_err());
        assert!(result.unwrap_err().is_conflict());
    }
}
