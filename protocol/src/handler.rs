//! Tool dispatcher: the seven wire operations from `spec.md` §6, each
//! deserializing a generic JSON params blob into a typed request and
//! delegating to `orchestrator-engine` or directly to a `core::repository`
//! trait.
//!
//! Generalizes the teacher's `McpTaskHandler<R, M, W>` shape from three
//! repositories to the engine's seven, and from eight hardcoded methods
//! to a single `dispatch(operation, params)` entry point matching the
//! data-driven tool surface this domain exposes.

use std::collections::BTreeMap;

use orchestrator_core::models::{
    EntityType, NewDependency, NewFeature, NewProject, NewSection, NewTask, Priority, Role,
    Scope, StatusName, Trigger, UpdateFeature, UpdateProject, UpdateTask,
};
use orchestrator_core::repository::{
    DependencyRepository, FeatureRepository, ProjectRepository, RoleTransitionRepository,
    SectionRepository, TagRepository, TaskRepository,
};
use orchestrator_core::workflow_config::WorkflowConfigSnapshot;
use orchestrator_engine::{DependencyPattern, Engine};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::ToolError;
use crate::serialization::{deserialize_params, to_data_value};

/// Dispatches every wire operation against one `Engine` built from the
/// seven repository trait implementations wired up by `orchestrator-server`.
pub struct ToolHandler<P, F, T, S, D, G, RT> {
    engine: Engine<P, F, T, S, D, G, RT>,
}

impl<P, F, T, S, D, G, RT> ToolHandler<P, F, T, S, D, G, RT>
where
    P: ProjectRepository,
    F: FeatureRepository,
    T: TaskRepository,
    S: SectionRepository,
    D: DependencyRepository,
    G: TagRepository,
    RT: RoleTransitionRepository,
{
    pub fn new(engine: Engine<P, F, T, S, D, G, RT>) -> Self {
        Self { engine }
    }

    /// Every wire request funnels through here: `operation` names one of
    /// the seven tool operations, `params` is its raw JSON body.
    pub async fn dispatch(&self, operation: &str, params: Value) -> Result<Value, ToolError> {
        match operation {
            "manage_project" => self.manage_project(params).await,
            "manage_feature" => self.manage_feature(params).await,
            "manage_task" => self.manage_task(params).await,
            "query_container" => self.query_container(params).await,
            "manage_dependencies" => self.manage_dependencies(params).await,
            "get_next_task" => self.get_next_task(params).await,
            "request_transition" => self.request_transition(params).await,
            "manage_notes" => self.manage_notes(params).await,
            other => Err(ToolError::UnknownOperation(other.to_string())),
        }
    }

    // -- manage_project|feature|task ---------------------------------------

    async fn manage_project(&self, params: Value) -> Result<Value, ToolError> {
        let request: ManageProjectRequest = deserialize_params(params)?;
        match request {
            ManageProjectRequest::Create { project } => {
                let created = self.engine.projects.create(project).await?;
                to_data_value(&created)
            }
            ManageProjectRequest::Update { id, version, update } => {
                let updated = self.engine.projects.update(id, version, update).await?;
                to_data_value(&updated)
            }
            ManageProjectRequest::Delete { id } => {
                let deleted = self.engine.projects.delete(id).await?;
                to_data_value(&json!({ "id": id, "deleted": deleted }))
            }
        }
    }

    async fn manage_feature(&self, params: Value) -> Result<Value, ToolError> {
        let request: ManageFeatureRequest = deserialize_params(params)?;
        match request {
            ManageFeatureRequest::Create { feature } => {
                let created = self.engine.features.create(feature).await?;
                to_data_value(&created)
            }
            ManageFeatureRequest::Update { id, version, update } => {
                let updated = self.engine.features.update(id, version, update).await?;
                to_data_value(&updated)
            }
            ManageFeatureRequest::Delete { id } => {
                let deleted = self.engine.features.delete(id).await?;
                to_data_value(&json!({ "id": id, "deleted": deleted }))
            }
        }
    }

    async fn manage_task(&self, params: Value) -> Result<Value, ToolError> {
        let request: ManageTaskRequest = deserialize_params(params)?;
        match request {
            ManageTaskRequest::Create { task } => {
                let created = self.engine.tasks.create(task).await?;
                to_data_value(&created)
            }
            ManageTaskRequest::Update { id, version, update } => {
                let updated = self.engine.tasks.update(id, version, update).await?;
                to_data_value(&updated)
            }
            ManageTaskRequest::Delete { id } => {
                let deleted = self.engine.tasks.delete(id).await?;
                to_data_value(&json!({ "id": id, "deleted": deleted }))
            }
        }
    }

    // -- query_container -----------------------------------------------------

    async fn query_container(&self, params: Value) -> Result<Value, ToolError> {
        let request: QueryContainerRequest = deserialize_params(params)?;
        let config = self.engine.config.load();
        match request.entity_type {
            EntityType::Project => self.query_projects(request, &config).await,
            EntityType::Feature => self.query_features(request, &config).await,
            EntityType::Task => self.query_tasks(request, &config).await,
        }
    }

    async fn query_projects(
        &self,
        request: QueryContainerRequest,
        config: &WorkflowConfigSnapshot,
    ) -> Result<Value, ToolError> {
        match request.action {
            QueryAction::Get => {
                let id = request.id.ok_or_else(|| ToolError::MalformedRequest("'id' is required for get".into()))?;
                let found = self.engine.projects.get_by_id(id).await?;
                to_data_value(&found)
            }
            QueryAction::Search => {
                let query = request
                    .query
                    .ok_or_else(|| ToolError::MalformedRequest("'query' is required for search".into()))?;
                let found = self
                    .engine
                    .projects
                    .search(&query, request.filter.limit.unwrap_or(50))
                    .await?;
                to_data_value(&found)
            }
            QueryAction::List => {
                let filter = build_entity_filter(request.filter, EntityType::Project, config)?;
                let found = self.engine.projects.find_by_filters(filter).await?;
                to_data_value(&found)
            }
            QueryAction::Overview => {
                let filter = build_entity_filter(request.filter, EntityType::Project, config)?;
                let found = self.engine.projects.find_by_filters(filter).await?;
                to_data_value(&overview(&found, |p| p.status.as_str()))
            }
        }
    }

    async fn query_features(
        &self,
        request: QueryContainerRequest,
        config: &WorkflowConfigSnapshot,
    ) -> Result<Value, ToolError> {
        match request.action {
            QueryAction::Get => {
                let id = request.id.ok_or_else(|| ToolError::MalformedRequest("'id' is required for get".into()))?;
                let found = self.engine.features.get_by_id(id).await?;
                to_data_value(&found)
            }
            QueryAction::Search => {
                let query = request
                    .query
                    .ok_or_else(|| ToolError::MalformedRequest("'query' is required for search".into()))?;
                let found = self
                    .engine
                    .features
                    .search(&query, request.filter.limit.unwrap_or(50))
                    .await?;
                to_data_value(&found)
            }
            QueryAction::List => {
                let filter = build_entity_filter(request.filter, EntityType::Feature, config)?;
                let found = self.engine.features.find_by_filters(filter).await?;
                to_data_value(&found)
            }
            QueryAction::Overview => {
                let filter = build_entity_filter(request.filter, EntityType::Feature, config)?;
                let found = self.engine.features.find_by_filters(filter).await?;
                to_data_value(&overview(&found, |f| f.status.as_str()))
            }
        }
    }

    async fn query_tasks(
        &self,
        request: QueryContainerRequest,
        config: &WorkflowConfigSnapshot,
    ) -> Result<Value, ToolError> {
        match request.action {
            QueryAction::Get => {
                let id = request.id.ok_or_else(|| ToolError::MalformedRequest("'id' is required for get".into()))?;
                let found = self.engine.tasks.get_by_id(id).await?;
                to_data_value(&found)
            }
            QueryAction::Search => {
                let query = request
                    .query
                    .ok_or_else(|| ToolError::MalformedRequest("'query' is required for search".into()))?;
                let found = self.engine.tasks.search(&query, request.filter.limit.unwrap_or(50)).await?;
                to_data_value(&found)
            }
            QueryAction::List => {
                let filter = build_entity_filter(request.filter, EntityType::Task, config)?;
                let found = self.engine.tasks.find_by_filters(filter).await?;
                to_data_value(&found)
            }
            QueryAction::Overview => {
                let filter = build_entity_filter(request.filter, EntityType::Task, config)?;
                let found = self.engine.tasks.find_by_filters(filter).await?;
                to_data_value(&overview(&found, |t| t.status.as_str()))
            }
        }
    }

    // -- manage_dependencies -------------------------------------------------

    async fn manage_dependencies(&self, params: Value) -> Result<Value, ToolError> {
        let request: ManageDependenciesRequest = deserialize_params(params)?;
        match request {
            ManageDependenciesRequest::Create(create) => {
                let edges = create.into_new_dependencies()?;
                if edges.len() == 1 {
                    let created = self
                        .engine
                        .dependencies
                        .create(edges.into_iter().next().unwrap())
                        .await?;
                    to_data_value(&created)
                } else {
                    let created = self.engine.dependencies.create_batch(edges).await?;
                    to_data_value(&created)
                }
            }
            ManageDependenciesRequest::Delete(ManageDependenciesDeleteRequest::ById { id }) => {
                let deleted = self.engine.dependencies.delete(id).await?;
                to_data_value(&json!({ "id": id, "deleted": deleted }))
            }
            ManageDependenciesRequest::Delete(ManageDependenciesDeleteRequest::ByTasks {
                from_task_id,
                to_task_id,
                dep_type,
            }) => {
                let deleted = self
                    .engine
                    .dependencies
                    .delete_by_tasks(from_task_id, to_task_id, dep_type)
                    .await?;
                to_data_value(&json!({ "deleted": deleted }))
            }
        }
    }

    // -- get_next_task --------------------------------------------------------

    async fn get_next_task(&self, params: Value) -> Result<Value, ToolError> {
        let request: GetNextTaskRequest = deserialize_params(params)?;
        let scope = match (request.project_id, request.feature_id) {
            (Some(project_id), _) => Scope::Project(project_id),
            (None, Some(feature_id)) => Scope::Feature(feature_id),
            (None, None) => Scope::Catalog,
        };
        let result = self
            .engine
            .get_next_tasks(scope, request.limit, request.include_details)
            .await?;
        to_data_value(&json!({
            "tasks": result.tasks,
            "totalCandidates": result.total_candidates,
            "unblockedCandidates": result.unblocked_candidates,
            "mode": result.mode,
            "diagnostic": result.diagnostic,
        }))
    }

    // -- request_transition ---------------------------------------------------

    async fn request_transition(&self, params: Value) -> Result<Value, ToolError> {
        let request: RequestTransitionRequest = deserialize_params(params)?;
        match request.entity_type {
            EntityType::Task => {
                let task = self.engine.tasks.get_by_id(request.entity_id).await?.ok_or_else(|| {
                    orchestrator_core::error::OrchestratorError::not_found("Task", request.entity_id.to_string())
                })?;
                let outcome = self
                    .engine
                    .transition_task(&task, &request.new_status, request.trigger)
                    .await?;
                to_data_value(&transition_response(
                    &outcome.entity,
                    outcome.new_role,
                    outcome.role_transition_recorded,
                    outcome.cascade_report,
                ))
            }
            EntityType::Feature => {
                let feature = self.engine.features.get_by_id(request.entity_id).await?.ok_or_else(|| {
                    orchestrator_core::error::OrchestratorError::not_found("Feature", request.entity_id.to_string())
                })?;
                let outcome = self
                    .engine
                    .transition_feature(&feature, &request.new_status, request.trigger)
                    .await?;
                to_data_value(&transition_response(
                    &outcome.entity,
                    outcome.new_role,
                    outcome.role_transition_recorded,
                    outcome.cascade_report,
                ))
            }
            EntityType::Project => {
                let project = self.engine.projects.get_by_id(request.entity_id).await?.ok_or_else(|| {
                    orchestrator_core::error::OrchestratorError::not_found("Project", request.entity_id.to_string())
                })?;
                let outcome = self
                    .engine
                    .transition_project(&project, &request.new_status, request.trigger)
                    .await?;
                to_data_value(&transition_response(
                    &outcome.entity,
                    outcome.new_role,
                    outcome.role_transition_recorded,
                    outcome.cascade_report,
                ))
            }
        }
    }

    // -- manage_notes ----------------------------------------------------------

    async fn manage_notes(&self, params: Value) -> Result<Value, ToolError> {
        let request: ManageNotesRequest = deserialize_params(params)?;
        match request {
            ManageNotesRequest::Create { section } => {
                let created = self.engine.sections.create(section).await?;
                to_data_value(&created)
            }
            ManageNotesRequest::Get { id } => {
                let found = self.engine.sections.get_by_id(id).await?;
                to_data_value(&found)
            }
            ManageNotesRequest::List { entity_type, entity_id } => {
                let found = self.engine.sections.list_for_entity(entity_type, entity_id).await?;
                to_data_value(&found)
            }
            ManageNotesRequest::Delete { id } => {
                let deleted = self.engine.sections.delete(id).await?;
                to_data_value(&json!({ "id": id, "deleted": deleted }))
            }
            ManageNotesRequest::Reorder {
                entity_type,
                entity_id,
                ordered_ids,
            } => {
                let reordered = self.engine.sections.reorder(entity_type, entity_id, ordered_ids).await?;
                to_data_value(&reordered)
            }
        }
    }
}

fn transition_response<Ent: serde::Serialize>(
    entity: &Ent,
    new_role: Option<Role>,
    role_transition_recorded: bool,
    cascade_report: Option<orchestrator_engine::CascadeReport>,
) -> Value {
    json!({
        "entity": entity,
        "newRole": new_role,
        "roleTransitionRecorded": role_transition_recorded,
        "cascade": cascade_report.map(|report| json!({
            "performed": report.performed,
            "tasksDeleted": report.tasks_deleted,
            "tasksRetained": report.tasks_retained,
            "sectionsDeleted": report.sections_deleted,
            "dependenciesDeleted": report.dependencies_deleted,
            "retainedTaskIds": report.retained_task_ids,
            "reason": report.reason,
        })),
    })
}

fn overview<'a, E>(entities: &'a [E], status_of: impl Fn(&'a E) -> &'a str) -> Value {
    let mut count_by_status: BTreeMap<String, u64> = BTreeMap::new();
    for entity in entities {
        *count_by_status.entry(status_of(entity).to_string()).or_insert(0) += 1;
    }
    json!({
        "total": entities.len(),
        "countByStatus": count_by_status,
    })
}

/// Resolves `role` (via the workflow config's status set for
/// `entity_type`) or an explicit `status` list into `EntityFilter`'s
/// `status_in`, then carries the remaining filter fields through as-is.
fn build_entity_filter(
    filter: QueryFilter,
    entity_type: EntityType,
    config: &WorkflowConfigSnapshot,
) -> Result<orchestrator_core::models::EntityFilter, ToolError> {
    let status_in: Vec<StatusName> = if let Some(role) = &filter.role {
        config
            .statuses_for_role(role, entity_type)
            .into_iter()
            .map(StatusName::new)
            .collect::<Result<Vec<_>, _>>()?
    } else {
        filter
            .status
            .into_iter()
            .map(StatusName::new)
            .collect::<Result<Vec<_>, _>>()?
    };
    let status_not_in: Vec<StatusName> = filter
        .status_not_in
        .into_iter()
        .map(StatusName::new)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(orchestrator_core::models::EntityFilter {
        project_id: filter.project_id,
        feature_id: filter.feature_id,
        status_in,
        status_not_in,
        priority_in: filter.priority,
        tags: filter.tags,
        match_all_tags: filter.match_all_tags,
        text_query: filter.text_query,
        limit: filter.limit.unwrap_or(50).min(1000),
    })
}

// -- wire request shapes ---------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum ManageProjectRequest {
    Create { project: NewProject },
    Update { id: Uuid, version: i32, update: UpdateProject },
    Delete { id: Uuid },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum ManageFeatureRequest {
    Create { feature: NewFeature },
    Update { id: Uuid, version: i32, update: UpdateFeature },
    Delete { id: Uuid },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum ManageTaskRequest {
    Create { task: NewTask },
    Update { id: Uuid, version: i32, update: UpdateTask },
    Delete { id: Uuid },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum QueryAction {
    Get,
    List,
    Search,
    Overview,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct QueryFilter {
    #[serde(alias = "projectId")]
    project_id: Option<Uuid>,
    #[serde(alias = "featureId")]
    feature_id: Option<Uuid>,
    role: Option<Role>,
    status: Vec<String>,
    #[serde(alias = "statusNotIn")]
    status_not_in: Vec<String>,
    priority: Vec<Priority>,
    tags: Vec<String>,
    #[serde(alias = "matchAllTags")]
    match_all_tags: bool,
    #[serde(alias = "textQuery")]
    text_query: Option<String>,
    limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct QueryContainerRequest {
    action: QueryAction,
    #[serde(alias = "entityType")]
    entity_type: EntityType,
    #[serde(default)]
    id: Option<Uuid>,
    #[serde(default)]
    query: Option<String>,
    #[serde(flatten)]
    filter: QueryFilter,
}

#[derive(Debug, Deserialize)]
struct DependencyEntry {
    #[serde(alias = "fromTaskId")]
    from_task_id: Uuid,
    #[serde(alias = "toTaskId")]
    to_task_id: Uuid,
    #[serde(rename = "type", default)]
    dep_type: Option<orchestrator_core::models::DependencyType>,
    #[serde(default, alias = "unblockAt")]
    unblock_at: Option<orchestrator_core::models::UnblockAt>,
}

/// The three shapes `manage_dependencies`'s `create` action accepts,
/// tried in order most-structured first (`serde(untagged)` picks the
/// first variant that deserializes successfully).
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CreateDependenciesRequest {
    Pattern {
        pattern: PatternName,
        #[serde(default, alias = "taskIds")]
        task_ids: Vec<Uuid>,
        #[serde(default)]
        source: Option<Uuid>,
        #[serde(default)]
        targets: Vec<Uuid>,
        #[serde(default)]
        target: Option<Uuid>,
        #[serde(default)]
        sources: Vec<Uuid>,
        #[serde(default, alias = "unblockAt")]
        unblock_at: Option<orchestrator_core::models::UnblockAt>,
    },
    List {
        dependencies: Vec<DependencyEntry>,
        #[serde(default, alias = "unblockAt")]
        unblock_at: Option<orchestrator_core::models::UnblockAt>,
    },
    Legacy {
        #[serde(alias = "fromTaskId")]
        from_task_id: Uuid,
        #[serde(alias = "toTaskId")]
        to_task_id: Uuid,
        #[serde(rename = "type", default)]
        dep_type: Option<orchestrator_core::models::DependencyType>,
        #[serde(default, alias = "unblockAt")]
        unblock_at: Option<orchestrator_core::models::UnblockAt>,
    },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum PatternName {
    Linear,
    FanOut,
    FanIn,
}

impl CreateDependenciesRequest {
    fn into_new_dependencies(self) -> Result<Vec<NewDependency>, ToolError> {
        match self {
            CreateDependenciesRequest::Legacy {
                from_task_id,
                to_task_id,
                dep_type,
                unblock_at,
            } => {
                let dep_type = dep_type.unwrap_or(orchestrator_core::models::DependencyType::Blocks);
                let dep = NewDependency {
                    from_task_id,
                    to_task_id,
                    dep_type,
                    unblock_at,
                }
                .validated()?;
                Ok(vec![dep])
            }
            CreateDependenciesRequest::List { dependencies, unblock_at } => dependencies
                .into_iter()
                .map(|entry| {
                    let dep_type = entry.dep_type.unwrap_or(orchestrator_core::models::DependencyType::Blocks);
                    NewDependency {
                        from_task_id: entry.from_task_id,
                        to_task_id: entry.to_task_id,
                        dep_type,
                        unblock_at: entry.unblock_at.or(unblock_at),
                    }
                    .validated()
                    .map_err(ToolError::from)
                })
                .collect(),
            CreateDependenciesRequest::Pattern {
                pattern,
                task_ids,
                source,
                targets,
                target,
                sources,
                unblock_at,
            } => {
                let shape = match pattern {
                    PatternName::Linear => DependencyPattern::Linear(task_ids),
                    PatternName::FanOut => DependencyPattern::FanOut {
                        source: source
                            .ok_or_else(|| ToolError::MalformedRequest("fan-out pattern requires 'source'".into()))?,
                        targets,
                    },
                    PatternName::FanIn => DependencyPattern::FanIn {
                        sources,
                        target: target
                            .ok_or_else(|| ToolError::MalformedRequest("fan-in pattern requires 'target'".into()))?,
                    },
                };
                let edges = shape.expand().map_err(|e| ToolError::MalformedRequest(e.to_string()))?;
                Ok(edges
                    .into_iter()
                    .map(|mut edge| {
                        if unblock_at.is_some() {
                            edge.unblock_at = unblock_at;
                        }
                        edge
                    })
                    .collect())
            }
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ManageDependenciesDeleteRequest {
    ById {
        id: Uuid,
    },
    ByTasks {
        #[serde(alias = "fromTaskId")]
        from_task_id: Uuid,
        #[serde(alias = "toTaskId")]
        to_task_id: Uuid,
        #[serde(rename = "type", default)]
        dep_type: Option<orchestrator_core::models::DependencyType>,
    },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum ManageDependenciesRequest {
    Create(CreateDependenciesRequest),
    Delete(ManageDependenciesDeleteRequest),
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct GetNextTaskRequest {
    #[serde(alias = "projectId")]
    project_id: Option<Uuid>,
    #[serde(alias = "featureId")]
    feature_id: Option<Uuid>,
    limit: Option<u32>,
    #[serde(alias = "includeDetails")]
    include_details: bool,
}

#[derive(Debug, Deserialize)]
struct RequestTransitionRequest {
    #[serde(alias = "entityId")]
    entity_id: Uuid,
    #[serde(alias = "entityType")]
    entity_type: EntityType,
    trigger: Trigger,
    #[serde(alias = "newStatus")]
    new_status: String,
    #[serde(default)]
    #[allow(dead_code)]
    notes: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum ManageNotesRequest {
    Create {
        section: NewSection,
    },
    Get {
        id: Uuid,
    },
    List {
        #[serde(alias = "entityType")]
        entity_type: EntityType,
        #[serde(alias = "entityId")]
        entity_id: Uuid,
    },
    Delete {
        id: Uuid,
    },
    Reorder {
        #[serde(alias = "entityType")]
        entity_type: EntityType,
        #[serde(alias = "entityId")]
        entity_id: Uuid,
        #[serde(alias = "orderedIds")]
        ordered_ids: Vec<Uuid>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_dependency_shape_parses() {
        let value = json!({
            "action": "create",
            "from_task_id": Uuid::new_v4(),
            "to_task_id": Uuid::new_v4(),
        });
        let request: ManageDependenciesRequest = deserialize_params(value).unwrap();
        match request {
            ManageDependenciesRequest::Create(create) => {
                let edges = create.into_new_dependencies().unwrap();
                assert_eq!(edges.len(), 1);
                assert_eq!(edges[0].unblock_at, Some(orchestrator_core::models::UnblockAt::Terminal));
            }
            _ => panic!("expected create"),
        }
    }

    #[test]
    fn linear_pattern_shape_parses() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        let value = json!({
            "action": "create",
            "pattern": "linear",
            "task_ids": [a, b, c],
        });
        let request: ManageDependenciesRequest = deserialize_params(value).unwrap();
        match request {
            ManageDependenciesRequest::Create(create) => {
                let edges = create.into_new_dependencies().unwrap();
                assert_eq!(edges.len(), 2);
            }
            _ => panic!("expected create"),
        }
    }

    #[test]
    fn delete_by_id_shape_parses() {
        let id = Uuid::new_v4();
        let value = json!({ "action": "delete", "id": id });
        let request: ManageDependenciesRequest = deserialize_params(value).unwrap();
        assert!(matches!(
            request,
            ManageDependenciesRequest::Delete(ManageDependenciesDeleteRequest::ById { .. })
        ));
    }

    #[test]
    fn query_container_request_parses_role_filter() {
        let value = json!({
            "action": "list",
            "entity_type": "task",
            "role": "queue",
        });
        let request: QueryContainerRequest = deserialize_params(value).unwrap();
        assert!(matches!(request.action, QueryAction::List));
        assert_eq!(request.filter.role, Some(Role::Queue));
    }
}
