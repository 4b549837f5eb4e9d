//! SQLite implementations of every Storage Layer trait from
//! `orchestrator_core::repository` (spec.md §4.2). One struct,
//! `SqliteStore`, holds the connection pool; each trait is implemented
//! against it so that cross-entity operations (the Completion Cascade,
//! dependency cycle checks) can share a single pool without threading
//! multiple repository handles through callers.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::Utc;
use orchestrator_core::error::{OrchestratorError, Result};
use orchestrator_core::models::{
    Dependency, DependencyType, EntityFilter, EntityType, Feature, NewDependency, NewFeature,
    NewProject, NewSection, NewTask, Project, RoleTransition, Section, Task, UpdateFeature,
    UpdateProject, UpdateTask,
};
use orchestrator_core::repository::{
    DependencyRepository, FeatureRepository, HealthCheck, ProjectRepository, RepositoryStats,
    RoleTransitionRepository, SectionRepository, TagRepository, TaskRepository,
};
use sqlx::{migrate::MigrateDatabase, Row, Sqlite, SqlitePool};
use uuid::Uuid;

use crate::common::{
    build_search_vector, clamp_limit, parse_dep_type, parse_priority, parse_unblock_at,
    priority_to_string, push_entity_filter, sqlx_error_to_orchestrator_error, status_name,
};

/// Shared handle to the embedded SQLite database. Every repository
/// trait in this crate is implemented against this one struct.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Connect to `database_url` (a file path or `:memory:`), creating
    /// the database file if it does not already exist. WAL mode is
    /// enabled for file-backed databases to allow concurrent readers
    /// alongside the single writer per spec.md §6.
    pub async fn new(database_url: &str) -> Result<Self> {
        let db_url = if database_url.starts_with(":memory:") || database_url.starts_with("sqlite://")
        {
            database_url.to_string()
        } else {
            format!("sqlite://{database_url}")
        };

        if !db_url.contains(":memory:") && !Sqlite::database_exists(&db_url).await.unwrap_or(false)
        {
            Sqlite::create_database(&db_url)
                .await
                .map_err(|e| OrchestratorError::Database(format!("failed to create database: {e}")))?;
        }

        let connect_options = if db_url.contains(":memory:") {
            sqlx::sqlite::SqliteConnectOptions::new()
                .filename(&db_url)
                .create_if_missing(true)
                .journal_mode(sqlx::sqlite::SqliteJournalMode::Memory)
                .busy_timeout(std::time::Duration::from_secs(5))
                .foreign_keys(true)
        } else {
            sqlx::sqlite::SqliteConnectOptions::new()
                .filename(db_url.replace("sqlite://", ""))
                .create_if_missing(true)
                .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
                .busy_timeout(std::time::Duration::from_secs(5))
                .foreign_keys(true)
        };

        // A bare in-memory database is private per connection; cap the
        // pool at one connection so every query sees the same database.
        let pool = if db_url.contains(":memory:") {
            sqlx::sqlite::SqlitePoolOptions::new()
                .max_connections(1)
                .connect_with(connect_options)
                .await
        } else {
            SqlitePool::connect_with(connect_options).await
        }
        .map_err(sqlx_error_to_orchestrator_error)?;

        Ok(Self { pool })
    }

    /// Apply all pending schema migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations/sqlite")
            .run(&self.pool)
            .await
            .map_err(|e| OrchestratorError::Database(format!("migration failed: {e}")))?;
        tracing::info!("database migrations completed successfully");
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn tags_for(&self, entity_type: EntityType, entity_id: Uuid) -> Result<BTreeSet<String>> {
        let rows = sqlx::query("SELECT tag FROM tags WHERE entity_type = ? AND entity_id = ?")
            .bind(entity_type.to_string())
            .bind(entity_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(sqlx_error_to_orchestrator_error)?;
        Ok(rows.into_iter().map(|r| r.get::<String, _>("tag")).collect())
    }

    /// Replace the tag set for an entity: delete-then-insert within one
    /// transaction (spec.md §4.2 "Tag updates... replace the set").
    async fn replace_tags<'e, E>(
        executor: E,
        entity_type: EntityType,
        entity_id: Uuid,
        tags: &BTreeSet<String>,
    ) -> Result<()>
    where
        E: sqlx::Executor<'e, Database = Sqlite> + Copy,
    {
        sqlx::query("DELETE FROM tags WHERE entity_type = ? AND entity_id = ?")
            .bind(entity_type.to_string())
            .bind(entity_id.to_string())
            .execute(executor)
            .await
            .map_err(sqlx_error_to_orchestrator_error)?;

        let now = Utc::now();
        for tag in tags {
            sqlx::query("INSERT OR IGNORE INTO tags (entity_type, entity_id, tag, created_at) VALUES (?, ?, ?, ?)")
                .bind(entity_type.to_string())
                .bind(entity_id.to_string())
                .bind(tag)
                .bind(now)
                .execute(executor)
                .await
                .map_err(sqlx_error_to_orchestrator_error)?;
        }
        Ok(())
    }

    fn row_to_project(row: &sqlx::sqlite::SqliteRow, tags: BTreeSet<String>) -> Result<Project> {
        Ok(Project {
            id: Uuid::parse_str(&row.get::<String, _>("id"))
                .map_err(|e| OrchestratorError::Database(format!("invalid uuid: {e}")))?,
            name: row.get("name"),
            description: row.get("description"),
            summary: row.get("summary"),
            status: status_name(&row.get::<String, _>("status"))?,
            tags,
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
            version: row.get("version"),
        })
    }

    fn row_to_feature(row: &sqlx::sqlite::SqliteRow, tags: BTreeSet<String>) -> Result<Feature> {
        let project_id: Option<String> = row.get("project_id");
        Ok(Feature {
            id: Uuid::parse_str(&row.get::<String, _>("id"))
                .map_err(|e| OrchestratorError::Database(format!("invalid uuid: {e}")))?,
            project_id: project_id
                .map(|s| Uuid::parse_str(&s))
                .transpose()
                .map_err(|e| OrchestratorError::Database(format!("invalid uuid: {e}")))?,
            name: row.get("name"),
            summary: row.get("summary"),
            status: status_name(&row.get::<String, _>("status"))?,
            priority: parse_priority(&row.get::<String, _>("priority"))?,
            tags,
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
            version: row.get("version"),
        })
    }

    fn row_to_task(row: &sqlx::sqlite::SqliteRow, tags: BTreeSet<String>) -> Result<Task> {
        let feature_id: Option<String> = row.get("feature_id");
        let project_id: Option<String> = row.get("project_id");
        Ok(Task {
            id: Uuid::parse_str(&row.get::<String, _>("id"))
                .map_err(|e| OrchestratorError::Database(format!("invalid uuid: {e}")))?,
            feature_id: feature_id
                .map(|s| Uuid::parse_str(&s))
                .transpose()
                .map_err(|e| OrchestratorError::Database(format!("invalid uuid: {e}")))?,
            project_id: project_id
                .map(|s| Uuid::parse_str(&s))
                .transpose()
                .map_err(|e| OrchestratorError::Database(format!("invalid uuid: {e}")))?,
            title: row.get("title"),
            summary: row.get("summary"),
            status: status_name(&row.get::<String, _>("status"))?,
            priority: parse_priority(&row.get::<String, _>("priority"))?,
            complexity: row.get::<i64, _>("complexity") as u8,
            tags,
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
            version: row.get("version"),
        })
    }

    fn row_to_section(row: &sqlx::sqlite::SqliteRow, tags: BTreeSet<String>) -> Result<Section> {
        Ok(Section {
            id: Uuid::parse_str(&row.get::<String, _>("id"))
                .map_err(|e| OrchestratorError::Database(format!("invalid uuid: {e}")))?,
            entity_type: EntityType::parse(&row.get::<String, _>("entity_type"))?,
            entity_id: Uuid::parse_str(&row.get::<String, _>("entity_id"))
                .map_err(|e| OrchestratorError::Database(format!("invalid uuid: {e}")))?,
            title: row.get("title"),
            usage_description: row.get("usage_description"),
            content: row.get("content"),
            content_format: row.get("content_format"),
            ordinal: row.get("ordinal"),
            tags,
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
            version: row.get("version"),
        })
    }

    fn row_to_dependency(row: &sqlx::sqlite::SqliteRow) -> Result<Dependency> {
        Ok(Dependency {
            id: Uuid::parse_str(&row.get::<String, _>("id"))
                .map_err(|e| OrchestratorError::Database(format!("invalid uuid: {e}")))?,
            from_task_id: Uuid::parse_str(&row.get::<String, _>("from_task_id"))
                .map_err(|e| OrchestratorError::Database(format!("invalid uuid: {e}")))?,
            to_task_id: Uuid::parse_str(&row.get::<String, _>("to_task_id"))
                .map_err(|e| OrchestratorError::Database(format!("invalid uuid: {e}")))?,
            dep_type: parse_dep_type(&row.get::<String, _>("dep_type"))?,
            unblock_at: parse_unblock_at(row.get::<Option<String>, _>("unblock_at").as_deref())?,
        })
    }

    fn row_to_role_transition(row: &sqlx::sqlite::SqliteRow) -> Result<RoleTransition> {
        use orchestrator_core::models::{Role, Trigger};
        let from_role: Option<String> = row.get("from_role");
        let trigger_str: String = row.get("trigger");
        let trigger = match trigger_str.as_str() {
            "start" => Trigger::Start,
            "complete" => Trigger::Complete,
            "cancel" => Trigger::Cancel,
            "block" => Trigger::Block,
            "resume" => Trigger::Resume,
            "reopen" => Trigger::Reopen,
            other => {
                return Err(OrchestratorError::Database(format!(
                    "invalid trigger in database: {other}"
                )))
            }
        };
        Ok(RoleTransition {
            id: Uuid::parse_str(&row.get::<String, _>("id"))
                .map_err(|e| OrchestratorError::Database(format!("invalid uuid: {e}")))?,
            entity_id: Uuid::parse_str(&row.get::<String, _>("entity_id"))
                .map_err(|e| OrchestratorError::Database(format!("invalid uuid: {e}")))?,
            entity_type: EntityType::parse(&row.get::<String, _>("entity_type"))?,
            from_role: from_role.map(|r| Role::parse(&r)),
            to_role: Role::parse(&row.get::<String, _>("to_role")),
            from_status: status_name(&row.get::<String, _>("from_status"))?,
            to_status: status_name(&row.get::<String, _>("to_status"))?,
            trigger,
            timestamp: row.get("timestamp"),
        })
    }
}

#[async_trait]
impl ProjectRepository for SqliteStore {
    async fn create(&self, project: NewProject) -> Result<Project> {
        orchestrator_core::validation::Validator::validate_new_project(&project)?;
        let id = Uuid::new_v4();
        let now = Utc::now();
        let tags = project.normalized_tags();
        let search_vector = build_search_vector(
            &[&project.name, project.description.as_deref().unwrap_or(""), project.summary.as_deref().unwrap_or("")],
            &tags,
        );

        let mut tx = self.pool.begin().await.map_err(sqlx_error_to_orchestrator_error)?;
        sqlx::query(
            "INSERT INTO projects (id, name, description, summary, status, search_vector, created_at, updated_at, version) VALUES (?, ?, ?, ?, ?, ?, ?, ?, 1)",
        )
        .bind(id.to_string())
        .bind(&project.name)
        .bind(&project.description)
        .bind(&project.summary)
        .bind(project.status.as_str())
        .bind(&search_vector)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(sqlx_error_to_orchestrator_error)?;

        Self::replace_tags(&mut *tx, EntityType::Project, id, &tags).await?;
        tx.commit().await.map_err(sqlx_error_to_orchestrator_error)?;

        Ok(Project {
            id,
            name: project.name,
            description: project.description,
            summary: project.summary,
            status: project.status,
            tags,
            created_at: now,
            updated_at: now,
            version: 1,
        })
    }

    async fn update(&self, id: Uuid, version: i32, updates: UpdateProject) -> Result<Project> {
        let mut tx = self.pool.begin().await.map_err(sqlx_error_to_orchestrator_error)?;
        let now = Utc::now();

        let mut qb: sqlx::QueryBuilder<Sqlite> = sqlx::QueryBuilder::new("UPDATE projects SET ");
        let mut set_any = false;
        if let Some(name) = &updates.name {
            orchestrator_core::validation::Validator::validate_name(name)?;
            qb.push("name = ");
            qb.push_bind(name.clone());
            set_any = true;
        }
        if let Some(description) = &updates.description {
            if set_any {
                qb.push(", ");
            }
            qb.push("description = ");
            qb.push_bind(description.clone());
            set_any = true;
        }
        if let Some(summary) = &updates.summary {
            if set_any {
                qb.push(", ");
            }
            qb.push("summary = ");
            qb.push_bind(summary.clone());
            set_any = true;
        }
        if set_any {
            qb.push(", ");
        }
        qb.push("updated_at = ");
        qb.push_bind(now);
        qb.push(", version = version + 1 WHERE id = ");
        qb.push_bind(id.to_string());
        qb.push(" AND version = ");
        qb.push_bind(version);

        let result = qb.build().execute(&mut *tx).await.map_err(sqlx_error_to_orchestrator_error)?;

        if result.rows_affected() == 0 {
            let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM projects WHERE id = ?)")
                .bind(id.to_string())
                .fetch_one(&mut *tx)
                .await
                .map_err(sqlx_error_to_orchestrator_error)?;
            return Err(if exists {
                OrchestratorError::conflict(format!("project {id} version mismatch"))
            } else {
                OrchestratorError::not_found("Project", id.to_string())
            });
        }

        if let Some(tags) = &updates.tags {
            let tag_set: BTreeSet<String> = tags.iter().map(|t| t.trim().to_string()).filter(|t| !t.is_empty()).collect();
            Self::replace_tags(&mut *tx, EntityType::Project, id, &tag_set).await?;
        }

        let row = sqlx::query("SELECT * FROM projects WHERE id = ?")
            .bind(id.to_string())
            .fetch_one(&mut *tx)
            .await
            .map_err(sqlx_error_to_orchestrator_error)?;
        let tags = Self::tags_for_tx(&mut tx, EntityType::Project, id).await?;
        let project = Self::row_to_project(&row, tags)?;

        // Refresh the search vector now that text fields may have changed.
        let new_vector = build_search_vector(
            &[&project.name, project.description.as_deref().unwrap_or(""), project.summary.as_deref().unwrap_or("")],
            &project.tags,
        );
        sqlx::query("UPDATE projects SET search_vector = ? WHERE id = ?")
            .bind(new_vector)
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(sqlx_error_to_orchestrator_error)?;

        tx.commit().await.map_err(sqlx_error_to_orchestrator_error)?;
        Ok(project)
    }

    async fn set_status(&self, id: Uuid, version: i32, status: &str) -> Result<Project> {
        let mut tx = self.pool.begin().await.map_err(sqlx_error_to_orchestrator_error)?;
        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE projects SET status = ?, updated_at = ?, version = version + 1 WHERE id = ? AND version = ?",
        )
        .bind(status)
        .bind(now)
        .bind(id.to_string())
        .bind(version)
        .execute(&mut *tx)
        .await
        .map_err(sqlx_error_to_orchestrator_error)?;

        if result.rows_affected() == 0 {
            let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM projects WHERE id = ?)")
                .bind(id.to_string())
                .fetch_one(&mut *tx)
                .await
                .map_err(sqlx_error_to_orchestrator_error)?;
            return Err(if exists {
                OrchestratorError::conflict(format!("project {id} version mismatch"))
            } else {
                OrchestratorError::not_found("Project", id.to_string())
            });
        }

        let row = sqlx::query("SELECT * FROM projects WHERE id = ?")
            .bind(id.to_string())
            .fetch_one(&mut *tx)
            .await
            .map_err(sqlx_error_to_orchestrator_error)?;
        let tags = Self::tags_for_tx(&mut tx, EntityType::Project, id).await?;
        tx.commit().await.map_err(sqlx_error_to_orchestrator_error)?;
        Self::row_to_project(&row, tags)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Project>> {
        let row = sqlx::query("SELECT * FROM projects WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(sqlx_error_to_orchestrator_error)?;
        match row {
            Some(row) => {
                let tags = self.tags_for(EntityType::Project, id).await?;
                Ok(Some(Self::row_to_project(&row, tags)?))
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let mut tx = self.pool.begin().await.map_err(sqlx_error_to_orchestrator_error)?;
        sqlx::query("DELETE FROM tags WHERE entity_type = ? AND entity_id = ?")
            .bind(EntityType::Project.to_string())
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(sqlx_error_to_orchestrator_error)?;
        let result = sqlx::query("DELETE FROM projects WHERE id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(sqlx_error_to_orchestrator_error)?;
        tx.commit().await.map_err(sqlx_error_to_orchestrator_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_by_filters(&self, filter: EntityFilter) -> Result<Vec<Project>> {
        let mut qb: sqlx::QueryBuilder<Sqlite> = sqlx::QueryBuilder::new("SELECT * FROM projects");
        push_entity_filter(&mut qb, EntityType::Project, &filter, false);
        qb.push(" ORDER BY updated_at DESC LIMIT ");
        qb.push_bind(clamp_limit(filter.limit));

        let rows = qb.build().fetch_all(&self.pool).await.map_err(sqlx_error_to_orchestrator_error)?;
        let mut projects = Vec::with_capacity(rows.len());
        for row in rows {
            let id = Uuid::parse_str(&row.get::<String, _>("id"))
                .map_err(|e| OrchestratorError::Database(format!("invalid uuid: {e}")))?;
            let tags = self.tags_for(EntityType::Project, id).await?;
            projects.push(Self::row_to_project(&row, tags)?);
        }
        Ok(projects)
    }

    async fn search(&self, query: &str, limit: u32) -> Result<Vec<Project>> {
        let filter = EntityFilter {
            text_query: Some(query.to_string()),
            limit,
            ..Default::default()
        };
        self.find_by_filters(filter).await
    }
}

impl SqliteStore {
    async fn tags_for_tx(
        tx: &mut sqlx::Transaction<'_, Sqlite>,
        entity_type: EntityType,
        entity_id: Uuid,
    ) -> Result<BTreeSet<String>> {
        let rows = sqlx::query("SELECT tag FROM tags WHERE entity_type = ? AND entity_id = ?")
            .bind(entity_type.to_string())
            .bind(entity_id.to_string())
            .fetch_all(&mut **tx)
            .await
            .map_err(sqlx_error_to_orchestrator_error)?;
        Ok(rows.into_iter().map(|r| r.get::<String, _>("tag")).collect())
    }
}

#[async_trait]
impl FeatureRepository for SqliteStore {
    async fn create(&self, feature: NewFeature) -> Result<Feature> {
        orchestrator_core::validation::Validator::validate_name(&feature.name)?;
        if let Some(project_id) = feature.project_id {
            let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM projects WHERE id = ?)")
                .bind(project_id.to_string())
                .fetch_one(&self.pool)
                .await
                .map_err(sqlx_error_to_orchestrator_error)?;
            if !exists {
                return Err(OrchestratorError::validation(format!(
                    "project {project_id} does not exist"
                )));
            }
        }

        let id = Uuid::new_v4();
        let now = Utc::now();
        let tags = feature.normalized_tags();
        let search_vector = build_search_vector(&[&feature.name, feature.summary.as_deref().unwrap_or("")], &tags);

        let mut tx = self.pool.begin().await.map_err(sqlx_error_to_orchestrator_error)?;
        sqlx::query(
            "INSERT INTO features (id, project_id, name, summary, status, priority, search_vector, created_at, updated_at, version) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 1)",
        )
        .bind(id.to_string())
        .bind(feature.project_id.map(|p| p.to_string()))
        .bind(&feature.name)
        .bind(&feature.summary)
        .bind(feature.status.as_str())
        .bind(priority_to_string(feature.priority))
        .bind(&search_vector)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(sqlx_error_to_orchestrator_error)?;

        Self::replace_tags(&mut *tx, EntityType::Feature, id, &tags).await?;
        tx.commit().await.map_err(sqlx_error_to_orchestrator_error)?;

        Ok(Feature {
            id,
            project_id: feature.project_id,
            name: feature.name,
            summary: feature.summary,
            status: feature.status,
            priority: feature.priority,
            tags,
            created_at: now,
            updated_at: now,
            version: 1,
        })
    }

    async fn update(&self, id: Uuid, version: i32, updates: UpdateFeature) -> Result<Feature> {
        let mut tx = self.pool.begin().await.map_err(sqlx_error_to_orchestrator_error)?;
        let now = Utc::now();

        let mut qb: sqlx::QueryBuilder<Sqlite> = sqlx::QueryBuilder::new("UPDATE features SET ");
        let mut set_any = false;
        if let Some(name) = &updates.name {
            orchestrator_core::validation::Validator::validate_name(name)?;
            qb.push("name = ");
            qb.push_bind(name.clone());
            set_any = true;
        }
        if let Some(summary) = &updates.summary {
            if set_any {
                qb.push(", ");
            }
            qb.push("summary = ");
            qb.push_bind(summary.clone());
            set_any = true;
        }
        if let Some(priority) = updates.priority {
            if set_any {
                qb.push(", ");
            }
            qb.push("priority = ");
            qb.push_bind(priority_to_string(priority));
            set_any = true;
        }
        if set_any {
            qb.push(", ");
        }
        qb.push("updated_at = ");
        qb.push_bind(now);
        qb.push(", version = version + 1 WHERE id = ");
        qb.push_bind(id.to_string());
        qb.push(" AND version = ");
        qb.push_bind(version);

        let result = qb.build().execute(&mut *tx).await.map_err(sqlx_error_to_orchestrator_error)?;
        if result.rows_affected() == 0 {
            let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM features WHERE id = ?)")
                .bind(id.to_string())
                .fetch_one(&mut *tx)
                .await
                .map_err(sqlx_error_to_orchestrator_error)?;
            return Err(if exists {
                OrchestratorError::conflict(format!("feature {id} version mismatch"))
            } else {
                OrchestratorError::not_found("Feature", id.to_string())
            });
        }

        if let Some(tags) = &updates.tags {
            let tag_set: BTreeSet<String> = tags.iter().map(|t| t.trim().to_string()).filter(|t| !t.is_empty()).collect();
            Self::replace_tags(&mut *tx, EntityType::Feature, id, &tag_set).await?;
        }

        let row = sqlx::query("SELECT * FROM features WHERE id = ?")
            .bind(id.to_string())
            .fetch_one(&mut *tx)
            .await
            .map_err(sqlx_error_to_orchestrator_error)?;
        let tags = Self::tags_for_tx(&mut tx, EntityType::Feature, id).await?;
        let feature = Self::row_to_feature(&row, tags)?;

        let new_vector = build_search_vector(&[&feature.name, feature.summary.as_deref().unwrap_or("")], &feature.tags);
        sqlx::query("UPDATE features SET search_vector = ? WHERE id = ?")
            .bind(new_vector)
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(sqlx_error_to_orchestrator_error)?;

        tx.commit().await.map_err(sqlx_error_to_orchestrator_error)?;
        Ok(feature)
    }

    async fn set_status(&self, id: Uuid, version: i32, status: &str) -> Result<Feature> {
        let mut tx = self.pool.begin().await.map_err(sqlx_error_to_orchestrator_error)?;
        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE features SET status = ?, updated_at = ?, version = version + 1 WHERE id = ? AND version = ?",
        )
        .bind(status)
        .bind(now)
        .bind(id.to_string())
        .bind(version)
        .execute(&mut *tx)
        .await
        .map_err(sqlx_error_to_orchestrator_error)?;

        if result.rows_affected() == 0 {
            let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM features WHERE id = ?)")
                .bind(id.to_string())
                .fetch_one(&mut *tx)
                .await
                .map_err(sqlx_error_to_orchestrator_error)?;
            return Err(if exists {
                OrchestratorError::conflict(format!("feature {id} version mismatch"))
            } else {
                OrchestratorError::not_found("Feature", id.to_string())
            });
        }

        let row = sqlx::query("SELECT * FROM features WHERE id = ?")
            .bind(id.to_string())
            .fetch_one(&mut *tx)
            .await
            .map_err(sqlx_error_to_orchestrator_error)?;
        let tags = Self::tags_for_tx(&mut tx, EntityType::Feature, id).await?;
        tx.commit().await.map_err(sqlx_error_to_orchestrator_error)?;
        Self::row_to_feature(&row, tags)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Feature>> {
        let row = sqlx::query("SELECT * FROM features WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(sqlx_error_to_orchestrator_error)?;
        match row {
            Some(row) => {
                let tags = self.tags_for(EntityType::Feature, id).await?;
                Ok(Some(Self::row_to_feature(&row, tags)?))
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let mut tx = self.pool.begin().await.map_err(sqlx_error_to_orchestrator_error)?;
        sqlx::query("DELETE FROM tags WHERE entity_type = ? AND entity_id = ?")
            .bind(EntityType::Feature.to_string())
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(sqlx_error_to_orchestrator_error)?;
        let result = sqlx::query("DELETE FROM features WHERE id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(sqlx_error_to_orchestrator_error)?;
        tx.commit().await.map_err(sqlx_error_to_orchestrator_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_by_filters(&self, filter: EntityFilter) -> Result<Vec<Feature>> {
        let mut qb: sqlx::QueryBuilder<Sqlite> = sqlx::QueryBuilder::new("SELECT * FROM features");
        let mut has_conditions = false;
        if let Some(project_id) = filter.project_id {
            qb.push(" WHERE project_id = ");
            qb.push_bind(project_id.to_string());
            has_conditions = true;
        }
        push_entity_filter(&mut qb, EntityType::Feature, &filter, has_conditions);
        qb.push(" ORDER BY updated_at DESC LIMIT ");
        qb.push_bind(clamp_limit(filter.limit));

        let rows = qb.build().fetch_all(&self.pool).await.map_err(sqlx_error_to_orchestrator_error)?;
        let mut features = Vec::with_capacity(rows.len());
        for row in rows {
            let id = Uuid::parse_str(&row.get::<String, _>("id"))
                .map_err(|e| OrchestratorError::Database(format!("invalid uuid: {e}")))?;
            let tags = self.tags_for(EntityType::Feature, id).await?;
            features.push(Self::row_to_feature(&row, tags)?);
        }
        Ok(features)
    }

    async fn search(&self, query: &str, limit: u32) -> Result<Vec<Feature>> {
        let filter = EntityFilter {
            text_query: Some(query.to_string()),
            limit,
            ..Default::default()
        };
        self.find_by_filters(filter).await
    }

    async fn list_children(&self, project_id: Uuid) -> Result<Vec<Feature>> {
        self.find_by_filters(EntityFilter {
            project_id: Some(project_id),
            limit: 1000,
            ..Default::default()
        })
        .await
    }
}

#[async_trait]
impl TaskRepository for SqliteStore {
    async fn create(&self, task: NewTask) -> Result<Task> {
        orchestrator_core::validation::Validator::validate_new_task(&task)?;

        if let Some(feature_id) = task.feature_id {
            let feature_row = sqlx::query("SELECT project_id FROM features WHERE id = ?")
                .bind(feature_id.to_string())
                .fetch_optional(&self.pool)
                .await
                .map_err(sqlx_error_to_orchestrator_error)?;
            match feature_row {
                None => {
                    return Err(OrchestratorError::validation(format!(
                        "feature {feature_id} does not exist"
                    )))
                }
                Some(row) => {
                    let feature_project_id: Option<String> = row.get("project_id");
                    if let (Some(feature_project_id), Some(task_project_id)) =
                        (feature_project_id, task.project_id)
                    {
                        if feature_project_id != task_project_id.to_string() {
                            return Err(OrchestratorError::validation(
                                "task's projectId must equal its feature's projectId",
                            ));
                        }
                    }
                }
            }
        }
        if let Some(project_id) = task.project_id {
            let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM projects WHERE id = ?)")
                .bind(project_id.to_string())
                .fetch_one(&self.pool)
                .await
                .map_err(sqlx_error_to_orchestrator_error)?;
            if !exists {
                return Err(OrchestratorError::validation(format!(
                    "project {project_id} does not exist"
                )));
            }
        }

        let id = Uuid::new_v4();
        let now = Utc::now();
        let tags = task.normalized_tags();
        let search_vector = build_search_vector(&[&task.title, task.summary.as_deref().unwrap_or("")], &tags);

        let mut tx = self.pool.begin().await.map_err(sqlx_error_to_orchestrator_error)?;
        sqlx::query(
            "INSERT INTO tasks (id, feature_id, project_id, title, summary, status, priority, complexity, search_vector, created_at, updated_at, version) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 1)",
        )
        .bind(id.to_string())
        .bind(task.feature_id.map(|p| p.to_string()))
        .bind(task.project_id.map(|p| p.to_string()))
        .bind(&task.title)
        .bind(&task.summary)
        .bind(task.status.as_str())
        .bind(priority_to_string(task.priority))
        .bind(task.complexity as i64)
        .bind(&search_vector)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(sqlx_error_to_orchestrator_error)?;

        Self::replace_tags(&mut *tx, EntityType::Task, id, &tags).await?;
        tx.commit().await.map_err(sqlx_error_to_orchestrator_error)?;

        Ok(Task {
            id,
            feature_id: task.feature_id,
            project_id: task.project_id,
            title: task.title,
            summary: task.summary,
            status: task.status,
            priority: task.priority,
            complexity: task.complexity,
            tags,
            created_at: now,
            updated_at: now,
            version: 1,
        })
    }

    async fn update(&self, id: Uuid, version: i32, updates: UpdateTask) -> Result<Task> {
        let mut tx = self.pool.begin().await.map_err(sqlx_error_to_orchestrator_error)?;
        let now = Utc::now();

        let mut qb: sqlx::QueryBuilder<Sqlite> = sqlx::QueryBuilder::new("UPDATE tasks SET ");
        let mut set_any = false;
        if let Some(title) = &updates.title {
            orchestrator_core::validation::Validator::validate_name(title)?;
            qb.push("title = ");
            qb.push_bind(title.clone());
            set_any = true;
        }
        if let Some(summary) = &updates.summary {
            if set_any {
                qb.push(", ");
            }
            qb.push("summary = ");
            qb.push_bind(summary.clone());
            set_any = true;
        }
        if let Some(priority) = updates.priority {
            if set_any {
                qb.push(", ");
            }
            qb.push("priority = ");
            qb.push_bind(priority_to_string(priority));
            set_any = true;
        }
        if let Some(complexity) = updates.complexity {
            orchestrator_core::validation::Validator::validate_complexity(complexity)?;
            if set_any {
                qb.push(", ");
            }
            qb.push("complexity = ");
            qb.push_bind(complexity as i64);
            set_any = true;
        }
        if set_any {
            qb.push(", ");
        }
        qb.push("updated_at = ");
        qb.push_bind(now);
        qb.push(", version = version + 1 WHERE id = ");
        qb.push_bind(id.to_string());
        qb.push(" AND version = ");
        qb.push_bind(version);

        let result = qb.build().execute(&mut *tx).await.map_err(sqlx_error_to_orchestrator_error)?;
        if result.rows_affected() == 0 {
            let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM tasks WHERE id = ?)")
                .bind(id.to_string())
                .fetch_one(&mut *tx)
                .await
                .map_err(sqlx_error_to_orchestrator_error)?;
            return Err(if exists {
                OrchestratorError::conflict(format!("task {id} version mismatch"))
            } else {
                OrchestratorError::not_found("Task", id.to_string())
            });
        }

        if let Some(tags) = &updates.tags {
            let tag_set: BTreeSet<String> = tags.iter().map(|t| t.trim().to_string()).filter(|t| !t.is_empty()).collect();
            Self::replace_tags(&mut *tx, EntityType::Task, id, &tag_set).await?;
        }

        let row = sqlx::query("SELECT * FROM tasks WHERE id = ?")
            .bind(id.to_string())
            .fetch_one(&mut *tx)
            .await
            .map_err(sqlx_error_to_orchestrator_error)?;
        let tags = Self::tags_for_tx(&mut tx, EntityType::Task, id).await?;
        let task = Self::row_to_task(&row, tags)?;

        let new_vector = build_search_vector(&[&task.title, task.summary.as_deref().unwrap_or("")], &task.tags);
        sqlx::query("UPDATE tasks SET search_vector = ? WHERE id = ?")
            .bind(new_vector)
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(sqlx_error_to_orchestrator_error)?;

        tx.commit().await.map_err(sqlx_error_to_orchestrator_error)?;
        Ok(task)
    }

    async fn set_status(&self, id: Uuid, version: i32, status: &str) -> Result<Task> {
        let mut tx = self.pool.begin().await.map_err(sqlx_error_to_orchestrator_error)?;
        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE tasks SET status = ?, updated_at = ?, version = version + 1 WHERE id = ? AND version = ?",
        )
        .bind(status)
        .bind(now)
        .bind(id.to_string())
        .bind(version)
        .execute(&mut *tx)
        .await
        .map_err(sqlx_error_to_orchestrator_error)?;

        if result.rows_affected() == 0 {
            let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM tasks WHERE id = ?)")
                .bind(id.to_string())
                .fetch_one(&mut *tx)
                .await
                .map_err(sqlx_error_to_orchestrator_error)?;
            return Err(if exists {
                OrchestratorError::conflict(format!("task {id} version mismatch"))
            } else {
                OrchestratorError::not_found("Task", id.to_string())
            });
        }

        let row = sqlx::query("SELECT * FROM tasks WHERE id = ?")
            .bind(id.to_string())
            .fetch_one(&mut *tx)
            .await
            .map_err(sqlx_error_to_orchestrator_error)?;
        let tags = Self::tags_for_tx(&mut tx, EntityType::Task, id).await?;
        tx.commit().await.map_err(sqlx_error_to_orchestrator_error)?;
        Self::row_to_task(&row, tags)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Task>> {
        let row = sqlx::query("SELECT * FROM tasks WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(sqlx_error_to_orchestrator_error)?;
        match row {
            Some(row) => {
                let tags = self.tags_for(EntityType::Task, id).await?;
                Ok(Some(Self::row_to_task(&row, tags)?))
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let mut tx = self.pool.begin().await.map_err(sqlx_error_to_orchestrator_error)?;
        sqlx::query("DELETE FROM tags WHERE entity_type = ? AND entity_id = ?")
            .bind(EntityType::Task.to_string())
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(sqlx_error_to_orchestrator_error)?;
        let result = sqlx::query("DELETE FROM tasks WHERE id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(sqlx_error_to_orchestrator_error)?;
        tx.commit().await.map_err(sqlx_error_to_orchestrator_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_by_filters(&self, filter: EntityFilter) -> Result<Vec<Task>> {
        let mut qb: sqlx::QueryBuilder<Sqlite> = sqlx::QueryBuilder::new("SELECT * FROM tasks");
        let mut has_conditions = false;
        if let Some(project_id) = filter.project_id {
            qb.push(" WHERE project_id = ");
            qb.push_bind(project_id.to_string());
            has_conditions = true;
        }
        if let Some(feature_id) = filter.feature_id {
            qb.push(if has_conditions { " AND " } else { " WHERE " });
            qb.push("feature_id = ");
            qb.push_bind(feature_id.to_string());
            has_conditions = true;
        }
        push_entity_filter(&mut qb, EntityType::Task, &filter, has_conditions);
        qb.push(" ORDER BY updated_at DESC LIMIT ");
        qb.push_bind(clamp_limit(filter.limit));

        let rows = qb.build().fetch_all(&self.pool).await.map_err(sqlx_error_to_orchestrator_error)?;
        let mut tasks = Vec::with_capacity(rows.len());
        for row in rows {
            let id = Uuid::parse_str(&row.get::<String, _>("id"))
                .map_err(|e| OrchestratorError::Database(format!("invalid uuid: {e}")))?;
            let tags = self.tags_for(EntityType::Task, id).await?;
            tasks.push(Self::row_to_task(&row, tags)?);
        }
        Ok(tasks)
    }

    async fn search(&self, query: &str, limit: u32) -> Result<Vec<Task>> {
        let filter = EntityFilter {
            text_query: Some(query.to_string()),
            limit,
            ..Default::default()
        };
        self.find_by_filters(filter).await
    }

    async fn list_children(&self, feature_id: Uuid) -> Result<Vec<Task>> {
        self.find_by_filters(EntityFilter {
            feature_id: Some(feature_id),
            limit: 1000,
            ..Default::default()
        })
        .await
    }

    async fn list_candidates(
        &self,
        project_id: Option<Uuid>,
        feature_id: Option<Uuid>,
        queue_statuses: &[String],
    ) -> Result<Vec<Task>> {
        if queue_statuses.is_empty() {
            return Ok(Vec::new());
        }
        let filter = EntityFilter {
            project_id,
            feature_id,
            status_in: queue_statuses
                .iter()
                .map(|s| orchestrator_core::models::StatusName::new(s.clone()))
                .collect::<Result<Vec<_>>>()?,
            limit: 1000,
            ..Default::default()
        };
        self.find_by_filters(filter).await
    }
}

#[async_trait]
impl SectionRepository for SqliteStore {
    async fn create(&self, section: NewSection) -> Result<Section> {
        orchestrator_core::validation::Validator::validate_name(&section.title)?;
        let id = Uuid::new_v4();
        let now = Utc::now();
        let tags: BTreeSet<String> = section.tags.iter().map(|t| t.trim().to_string()).filter(|t| !t.is_empty()).collect();
        let search_vector = build_search_vector(&[&section.title, &section.content], &tags);

        let mut tx = self.pool.begin().await.map_err(sqlx_error_to_orchestrator_error)?;
        let result = sqlx::query(
            "INSERT INTO sections (id, entity_type, entity_id, title, usage_description, content, content_format, ordinal, search_vector, created_at, updated_at, version) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 1)",
        )
        .bind(id.to_string())
        .bind(section.entity_type.to_string())
        .bind(section.entity_id.to_string())
        .bind(&section.title)
        .bind(&section.usage_description)
        .bind(&section.content)
        .bind(&section.content_format)
        .bind(section.ordinal)
        .bind(&search_vector)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await;

        if let Err(e) = result {
            let mapped = sqlx_error_to_orchestrator_error(e);
            return Err(if mapped.is_conflict() {
                OrchestratorError::conflict(format!(
                    "ordinal {} already in use for this entity",
                    section.ordinal
                ))
            } else {
                mapped
            });
        }

        for tag in &tags {
            sqlx::query("INSERT OR IGNORE INTO tags (entity_type, entity_id, tag, created_at) VALUES ('section', ?, ?, ?)")
                .bind(id.to_string())
                .bind(tag)
                .bind(now)
                .execute(&mut *tx)
                .await
                .map_err(sqlx_error_to_orchestrator_error)?;
        }

        tx.commit().await.map_err(sqlx_error_to_orchestrator_error)?;

        Ok(Section {
            id,
            entity_type: section.entity_type,
            entity_id: section.entity_id,
            title: section.title,
            usage_description: section.usage_description,
            content: section.content,
            content_format: section.content_format,
            ordinal: section.ordinal,
            tags,
            created_at: now,
            updated_at: now,
            version: 1,
        })
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Section>> {
        let row = sqlx::query("SELECT * FROM sections WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(sqlx_error_to_orchestrator_error)?;
        match row {
            Some(row) => {
                let tags = self.section_tags(id).await?;
                Ok(Some(Self::row_to_section(&row, tags)?))
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let mut tx = self.pool.begin().await.map_err(sqlx_error_to_orchestrator_error)?;
        sqlx::query("DELETE FROM tags WHERE entity_type = 'section' AND entity_id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(sqlx_error_to_orchestrator_error)?;
        let result = sqlx::query("DELETE FROM sections WHERE id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(sqlx_error_to_orchestrator_error)?;
        tx.commit().await.map_err(sqlx_error_to_orchestrator_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_for_entity(&self, entity_type: EntityType, entity_id: Uuid) -> Result<Vec<Section>> {
        let rows = sqlx::query(
            "SELECT * FROM sections WHERE entity_type = ? AND entity_id = ? ORDER BY ordinal ASC",
        )
        .bind(entity_type.to_string())
        .bind(entity_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(sqlx_error_to_orchestrator_error)?;

        let mut sections = Vec::with_capacity(rows.len());
        for row in rows {
            let id = Uuid::parse_str(&row.get::<String, _>("id"))
                .map_err(|e| OrchestratorError::Database(format!("invalid uuid: {e}")))?;
            let tags = self.section_tags(id).await?;
            sections.push(Self::row_to_section(&row, tags)?);
        }
        Ok(sections)
    }

    async fn delete_for_entity(&self, entity_type: EntityType, entity_id: Uuid) -> Result<u64> {
        let mut tx = self.pool.begin().await.map_err(sqlx_error_to_orchestrator_error)?;
        let ids: Vec<String> = sqlx::query_scalar(
            "SELECT id FROM sections WHERE entity_type = ? AND entity_id = ?",
        )
        .bind(entity_type.to_string())
        .bind(entity_id.to_string())
        .fetch_all(&mut *tx)
        .await
        .map_err(sqlx_error_to_orchestrator_error)?;

        for id in &ids {
            sqlx::query("DELETE FROM tags WHERE entity_type = 'section' AND entity_id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(sqlx_error_to_orchestrator_error)?;
        }

        let result = sqlx::query("DELETE FROM sections WHERE entity_type = ? AND entity_id = ?")
            .bind(entity_type.to_string())
            .bind(entity_id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(sqlx_error_to_orchestrator_error)?;
        tx.commit().await.map_err(sqlx_error_to_orchestrator_error)?;
        Ok(result.rows_affected())
    }

    /// Two-phase reorder: ordinals first move to negative placeholders
    /// (`-(index+1)`) so the unique `(entityType, entityId, ordinal)`
    /// constraint never collides mid-update, then to their final
    /// `0..n-1` positions (invariant 2).
    async fn reorder(
        &self,
        entity_type: EntityType,
        entity_id: Uuid,
        ordered_ids: Vec<Uuid>,
    ) -> Result<Vec<Section>> {
        let mut tx = self.pool.begin().await.map_err(sqlx_error_to_orchestrator_error)?;

        for (i, id) in ordered_ids.iter().enumerate() {
            sqlx::query("UPDATE sections SET ordinal = ? WHERE id = ? AND entity_type = ? AND entity_id = ?")
                .bind(-(i as i32 + 1))
                .bind(id.to_string())
                .bind(entity_type.to_string())
                .bind(entity_id.to_string())
                .execute(&mut *tx)
                .await
                .map_err(sqlx_error_to_orchestrator_error)?;
        }

        for (i, id) in ordered_ids.iter().enumerate() {
            sqlx::query("UPDATE sections SET ordinal = ?, version = version + 1 WHERE id = ? AND entity_type = ? AND entity_id = ?")
                .bind(i as i32)
                .bind(id.to_string())
                .bind(entity_type.to_string())
                .bind(entity_id.to_string())
                .execute(&mut *tx)
                .await
                .map_err(sqlx_error_to_orchestrator_error)?;
        }

        tx.commit().await.map_err(sqlx_error_to_orchestrator_error)?;
        self.list_for_entity(entity_type, entity_id).await
    }
}

impl SqliteStore {
    async fn section_tags(&self, section_id: Uuid) -> Result<BTreeSet<String>> {
        let rows = sqlx::query("SELECT tag FROM tags WHERE entity_type = 'section' AND entity_id = ?")
            .bind(section_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(sqlx_error_to_orchestrator_error)?;
        Ok(rows.into_iter().map(|r| r.get::<String, _>("tag")).collect())
    }
}

#[async_trait]
impl TagRepository for SqliteStore {
    async fn set_tags(&self, entity_type: EntityType, entity_id: Uuid, tags: Vec<String>) -> Result<()> {
        let tag_set: BTreeSet<String> = tags.into_iter().map(|t| t.trim().to_string()).filter(|t| !t.is_empty()).collect();
        let mut tx = self.pool.begin().await.map_err(sqlx_error_to_orchestrator_error)?;
        Self::replace_tags(&mut *tx, entity_type, entity_id, &tag_set).await?;
        tx.commit().await.map_err(sqlx_error_to_orchestrator_error)?;
        Ok(())
    }

    async fn find_by_tag(&self, entity_type: EntityType, tag: &str) -> Result<Vec<Uuid>> {
        let rows: Vec<String> = sqlx::query_scalar(
            "SELECT entity_id FROM tags WHERE entity_type = ? AND tag = ?",
        )
        .bind(entity_type.to_string())
        .bind(tag)
        .fetch_all(&self.pool)
        .await
        .map_err(sqlx_error_to_orchestrator_error)?;
        rows.into_iter()
            .map(|s| Uuid::parse_str(&s).map_err(|e| OrchestratorError::Database(format!("invalid uuid: {e}"))))
            .collect()
    }

    async fn find_by_tags(&self, entity_type: EntityType, tags: &[String], match_all: bool) -> Result<Vec<Uuid>> {
        if tags.is_empty() {
            return Ok(Vec::new());
        }
        let mut qb: sqlx::QueryBuilder<Sqlite> = sqlx::QueryBuilder::new(
            "SELECT entity_id FROM tags WHERE entity_type = ",
        );
        qb.push_bind(entity_type.to_string());
        qb.push(" AND tag IN (");
        let mut separated = qb.separated(", ");
        for t in tags {
            separated.push_bind(t.clone());
        }
        separated.push_unseparated(")");
        if match_all {
            qb.push(" GROUP BY entity_id HAVING COUNT(DISTINCT tag) = ");
            qb.push_bind(tags.len() as i64);
        } else {
            qb.push(" GROUP BY entity_id");
        }

        let rows: Vec<String> = qb.build_query_scalar().fetch_all(&self.pool).await.map_err(sqlx_error_to_orchestrator_error)?;
        rows.into_iter()
            .map(|s| Uuid::parse_str(&s).map_err(|e| OrchestratorError::Database(format!("invalid uuid: {e}"))))
            .collect()
    }

    async fn all_tags(&self, entity_type: EntityType) -> Result<Vec<String>> {
        let rows: Vec<String> = sqlx::query_scalar("SELECT DISTINCT tag FROM tags WHERE entity_type = ? ORDER BY tag")
            .bind(entity_type.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(sqlx_error_to_orchestrator_error)?;
        Ok(rows)
    }

    async fn count_by_tag(&self, entity_type: EntityType, tag: &str) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tags WHERE entity_type = ? AND tag = ?")
            .bind(entity_type.to_string())
            .bind(tag)
            .fetch_one(&self.pool)
            .await
            .map_err(sqlx_error_to_orchestrator_error)?;
        Ok(count as u64)
    }
}

#[async_trait]
impl DependencyRepository for SqliteStore {
    async fn create(&self, dep: NewDependency) -> Result<Dependency> {
        let dep = dep.validated()?;

        for task_id in [dep.from_task_id, dep.to_task_id] {
            let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM tasks WHERE id = ?)")
                .bind(task_id.to_string())
                .fetch_one(&self.pool)
                .await
                .map_err(sqlx_error_to_orchestrator_error)?;
            if !exists {
                return Err(OrchestratorError::validation(format!("task {task_id} does not exist")));
            }
        }

        if dep.dep_type == DependencyType::Blocks
            && self.has_cyclic_dependency(dep.from_task_id, dep.to_task_id).await?
        {
            return Err(OrchestratorError::conflict(format!(
                "dependency {} -> {} would create a cycle",
                dep.from_task_id, dep.to_task_id
            )));
        }

        let id = Uuid::new_v4();
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO dependencies (id, from_task_id, to_task_id, dep_type, unblock_at, created_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(id.to_string())
        .bind(dep.from_task_id.to_string())
        .bind(dep.to_task_id.to_string())
        .bind(dep.dep_type.to_string())
        .bind(dep.unblock_at.map(|u| u.to_string()))
        .bind(now)
        .execute(&self.pool)
        .await;

        if let Err(e) = result {
            let mapped = sqlx_error_to_orchestrator_error(e);
            return Err(if mapped.is_conflict() {
                OrchestratorError::validation(format!(
                    "duplicate dependency ({} -> {}, {:?})",
                    dep.from_task_id, dep.to_task_id, dep.dep_type
                ))
            } else {
                mapped
            });
        }

        Ok(Dependency {
            id,
            from_task_id: dep.from_task_id,
            to_task_id: dep.to_task_id,
            dep_type: dep.dep_type,
            unblock_at: dep.unblock_at,
        })
    }

    async fn create_batch(&self, deps: Vec<NewDependency>) -> Result<Vec<Dependency>> {
        orchestrator_core::validation::Validator::validate_batch_no_duplicates(&deps)?;

        let mut tx = self.pool.begin().await.map_err(sqlx_error_to_orchestrator_error)?;
        // Provisional adjacency built up as each edge is accepted, so a
        // batch cannot induce a cycle across its own members either
        // (spec.md §4.4 "batch create performs cycle checks against the
        // provisional graph").
        let mut provisional: std::collections::HashMap<Uuid, Vec<Uuid>> = std::collections::HashMap::new();
        let mut created = Vec::with_capacity(deps.len());

        for dep in deps {
            let dep = dep.validated()?;

            for task_id in [dep.from_task_id, dep.to_task_id] {
                let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM tasks WHERE id = ?)")
                    .bind(task_id.to_string())
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(sqlx_error_to_orchestrator_error)?;
                if !exists {
                    return Err(OrchestratorError::validation(format!("task {task_id} does not exist")));
                }
            }

            if dep.dep_type == DependencyType::Blocks {
                let db_cycle = has_cyclic_dependency_tx(&mut tx, dep.from_task_id, dep.to_task_id).await?;
                let provisional_cycle = provisional_reaches(&provisional, dep.to_task_id, dep.from_task_id);
                if db_cycle || provisional_cycle {
                    return Err(OrchestratorError::validation(format!(
                        "dependency {} -> {} would create a cycle",
                        dep.from_task_id, dep.to_task_id
                    )));
                }
            }

            let id = Uuid::new_v4();
            let now = Utc::now();
            sqlx::query(
                "INSERT INTO dependencies (id, from_task_id, to_task_id, dep_type, unblock_at, created_at) VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(id.to_string())
            .bind(dep.from_task_id.to_string())
            .bind(dep.to_task_id.to_string())
            .bind(dep.dep_type.to_string())
            .bind(dep.unblock_at.map(|u| u.to_string()))
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                let mapped = sqlx_error_to_orchestrator_error(e);
                if mapped.is_conflict() {
                    OrchestratorError::validation(format!(
                        "duplicate dependency ({} -> {}, {:?})",
                        dep.from_task_id, dep.to_task_id, dep.dep_type
                    ))
                } else {
                    mapped
                }
            })?;

            provisional.entry(dep.from_task_id).or_default().push(dep.to_task_id);
            created.push(Dependency {
                id,
                from_task_id: dep.from_task_id,
                to_task_id: dep.to_task_id,
                dep_type: dep.dep_type,
                unblock_at: dep.unblock_at,
            });
        }

        tx.commit().await.map_err(sqlx_error_to_orchestrator_error)?;
        Ok(created)
    }

    async fn has_cyclic_dependency(&self, from: Uuid, to: Uuid) -> Result<bool> {
        // DFS from `to` over outgoing BLOCKS edges; cycle exists iff
        // `from` is reachable, i.e. inserting `from -> to` would close
        // a loop back to `from` (spec.md §4.2).
        let mut visited = std::collections::HashSet::new();
        let mut stack = vec![to];
        while let Some(current) = stack.pop() {
            if current == from {
                return Ok(true);
            }
            if !visited.insert(current) {
                continue;
            }
            let next: Vec<String> = sqlx::query_scalar(
                "SELECT to_task_id FROM dependencies WHERE from_task_id = ? AND dep_type = 'BLOCKS'",
            )
            .bind(current.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(sqlx_error_to_orchestrator_error)?;
            for n in next {
                let id = Uuid::parse_str(&n).map_err(|e| OrchestratorError::Database(format!("invalid uuid: {e}")))?;
                stack.push(id);
            }
        }
        Ok(false)
    }

    async fn find_by_to_task_id(&self, task_id: Uuid) -> Result<Vec<Dependency>> {
        let rows = sqlx::query("SELECT * FROM dependencies WHERE to_task_id = ?")
            .bind(task_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(sqlx_error_to_orchestrator_error)?;
        rows.iter().map(Self::row_to_dependency).collect()
    }

    async fn find_by_from_task_id(&self, task_id: Uuid) -> Result<Vec<Dependency>> {
        let rows = sqlx::query("SELECT * FROM dependencies WHERE from_task_id = ?")
            .bind(task_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(sqlx_error_to_orchestrator_error)?;
        rows.iter().map(Self::row_to_dependency).collect()
    }

    async fn find_by_task_id(&self, task_id: Uuid) -> Result<Vec<Dependency>> {
        let rows = sqlx::query("SELECT * FROM dependencies WHERE from_task_id = ? OR to_task_id = ?")
            .bind(task_id.to_string())
            .bind(task_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(sqlx_error_to_orchestrator_error)?;
        rows.iter().map(Self::row_to_dependency).collect()
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM dependencies WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(sqlx_error_to_orchestrator_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_by_tasks(
        &self,
        from_task_id: Uuid,
        to_task_id: Uuid,
        dep_type: Option<DependencyType>,
    ) -> Result<u64> {
        let result = if let Some(dep_type) = dep_type {
            sqlx::query("DELETE FROM dependencies WHERE from_task_id = ? AND to_task_id = ? AND dep_type = ?")
                .bind(from_task_id.to_string())
                .bind(to_task_id.to_string())
                .bind(dep_type.to_string())
                .execute(&self.pool)
                .await
        } else {
            sqlx::query("DELETE FROM dependencies WHERE from_task_id = ? AND to_task_id = ?")
                .bind(from_task_id.to_string())
                .bind(to_task_id.to_string())
                .execute(&self.pool)
                .await
        }
        .map_err(sqlx_error_to_orchestrator_error)?;
        Ok(result.rows_affected())
    }

    async fn delete_all_for_task(&self, task_id: Uuid) -> Result<u64> {
        let result = sqlx::query("DELETE FROM dependencies WHERE from_task_id = ? OR to_task_id = ?")
            .bind(task_id.to_string())
            .bind(task_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(sqlx_error_to_orchestrator_error)?;
        Ok(result.rows_affected())
    }
}

async fn has_cyclic_dependency_tx(
    tx: &mut sqlx::Transaction<'_, Sqlite>,
    from: Uuid,
    to: Uuid,
) -> Result<bool> {
    let mut visited = std::collections::HashSet::new();
    let mut stack = vec![to];
    while let Some(current) = stack.pop() {
        if current == from {
            return Ok(true);
        }
        if !visited.insert(current) {
            continue;
        }
        let next: Vec<String> = sqlx::query_scalar(
            "SELECT to_task_id FROM dependencies WHERE from_task_id = ? AND dep_type = 'BLOCKS'",
        )
        .bind(current.to_string())
        .fetch_all(&mut **tx)
        .await
        .map_err(sqlx_error_to_orchestrator_error)?;
        for n in next {
            let id = Uuid::parse_str(&n).map_err(|e| OrchestratorError::Database(format!("invalid uuid: {e}")))?;
            stack.push(id);
        }
    }
    Ok(false)
}

/// Reachability check over a provisional (not-yet-committed) adjacency
/// map, used by `create_batch` to reject edges that would only become
/// cyclic once combined with earlier edges in the same batch.
fn provisional_reaches(
    adjacency: &std::collections::HashMap<Uuid, Vec<Uuid>>,
    start: Uuid,
    target: Uuid,
) -> bool {
    let mut visited = std::collections::HashSet::new();
    let mut stack = vec![start];
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
impl RoleTransitionRepository for SqliteStore {
    async fn create(&self, event: RoleTransition) -> Result<RoleTransition> {
        sqlx::query(
            "INSERT INTO role_transitions (id, entity_id, entity_type, from_role, to_role, from_status, to_status, trigger, timestamp) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(event.id.to_string())
        .bind(event.entity_id.to_string())
        .bind(event.entity_type.to_string())
        .bind(event.from_role.as_ref().map(|r| r.to_string()))
        .bind(event.to_role.to_string())
        .bind(event.from_status.as_str())
        .bind(event.to_status.as_str())
        .bind(event.trigger.to_string())
        .bind(event.timestamp)
        .execute(&self.pool)
        .await
        .map_err(sqlx_error_to_orchestrator_error)?;
        Ok(event)
    }

    async fn find_by_entity_id(&self, entity_id: Uuid) -> Result<Vec<RoleTransition>> {
        let rows = sqlx::query(
            "SELECT * FROM role_transitions WHERE entity_id = ? ORDER BY timestamp ASC",
        )
        .bind(entity_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(sqlx_error_to_orchestrator_error)?;
        rows.iter().map(Self::row_to_role_transition).collect()
    }
}

#[async_trait]
impl HealthCheck for SqliteStore {
    async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(sqlx_error_to_orchestrator_error)?;
        Ok(())
    }

    async fn get_stats(&self) -> Result<RepositoryStats> {
        let (total_projects, total_features, total_tasks, total_dependencies) = tokio::join!(
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM projects").fetch_one(&self.pool),
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM features").fetch_one(&self.pool),
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM tasks").fetch_one(&self.pool),
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM dependencies").fetch_one(&self.pool),
        );
        Ok(RepositoryStats {
            total_projects: total_projects.map_err(sqlx_error_to_orchestrator_error)? as u64,
            total_features: total_features.map_err(sqlx_error_to_orchestrator_error)? as u64,
            total_tasks: total_tasks.map_err(sqlx_error_to_orchestrator_error)? as u64,
            total_dependencies: total_dependencies.map_err(sqlx_error_to_orchestrator_error)? as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orchestrator_core::models::{Priority, StatusName};

    async fn test_store() -> SqliteStore {
        let timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let store = SqliteStore::new(&format!(":memory:test_{timestamp}")).await.unwrap();
        store.migrate().await.unwrap();
        store
    }

    fn sample_task(title: &str) -> NewTask {
        NewTask {
            feature_id: None,
            project_id: None,
            title: title.to_string(),
            summary: None,
            status: StatusName::new("pending").unwrap(),
            priority: Priority::Medium,
            complexity: 3,
            tags: vec![],
        }
    }

    #[tokio::test]
    async fn create_and_get_project_round_trips() {
        let store = test_store().await;
        let created = store
            .create(NewProject {
                name: "Orchestrator".into(),
                description: None,
                summary: None,
                status: StatusName::new("pending").unwrap(),
                tags: vec!["infra".into()],
            })
            .await
            .unwrap();
        let fetched = ProjectRepository::get_by_id(&store, created.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "Orchestrator");
        assert!(fetched.tags.contains("infra"));
        assert_eq!(fetched.version, 1);
    }

    #[tokio::test]
    async fn optimistic_lock_rejects_stale_version() {
        let store = test_store().await;
        let task = store.create(sample_task("Original")).await.unwrap();

        let updated = TaskRepository::update(
            &store,
            task.id,
            task.version,
            UpdateTask {
                title: Some("Updated".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.version, 2);

        let stale = TaskRepository::update(
            &store,
            task.id,
            task.version,
            UpdateTask {
                title: Some("Conflicting".into()),
                ..Default::default()
            },
        )
        .await;
        assert!(matches!(stale, Err(OrchestratorError::Conflict(_))));

        let current = TaskRepository::get_by_id(&store, task.id).await.unwrap().unwrap();
        assert_eq!(current.title, "Updated");
    }

    #[tokio::test]
    async fn dependency_cycle_is_rejected() {
        let store = test_store().await;
        let t1 = store.create(sample_task("T1")).await.unwrap();
        let t2 = store.create(sample_task("T2")).await.unwrap();
        let t3 = store.create(sample_task("T3")).await.unwrap();

        DependencyRepository::create(
            &store,
            NewDependency {
                from_task_id: t1.id,
                to_task_id: t2.id,
                dep_type: DependencyType::Blocks,
                unblock_at: None,
            },
        )
        .await
        .unwrap();
        DependencyRepository::create(
            &store,
            NewDependency {
                from_task_id: t2.id,
                to_task_id: t3.id,
                dep_type: DependencyType::Blocks,
                unblock_at: None,
            },
        )
        .await
        .unwrap();

        let cyclic = DependencyRepository::create(
            &store,
            NewDependency {
                from_task_id: t3.id,
                to_task_id: t1.id,
                dep_type: DependencyType::Blocks,
                unblock_at: None,
            },
        )
        .await;
        assert!(cyclic.is_err());

        let edges = DependencyRepository::find_by_task_id(&store, t1.id).await.unwrap();
        assert_eq!(edges.len(), 1);
    }

    #[tokio::test]
    async fn section_reorder_yields_contiguous_ordinals() {
        let store = test_store().await;
        let project = store
            .create(NewProject {
                name: "P".into(),
                description: None,
                summary: None,
                status: StatusName::new("pending").unwrap(),
                tags: vec![],
            })
            .await
            .unwrap();

        let mut ids = vec![];
        for i in 0..3 {
            let section = SectionRepository::create(
                &store,
                NewSection {
                    entity_type: EntityType::Project,
                    entity_id: project.id,
                    title: format!("Section {i}"),
                    usage_description: None,
                    content: "content".into(),
                    content_format: "text".into(),
                    ordinal: i,
                    tags: vec![],
                },
            )
            .await
            .unwrap();
            ids.push(section.id);
        }

        let reordered = ids.clone().into_iter().rev().collect::<Vec<_>>();
        let result = SectionRepository::reorder(&store, EntityType::Project, project.id, reordered.clone())
            .await
            .unwrap();
        let ordinals: Vec<i32> = result.iter().map(|s| s.ordinal).collect();
        assert_eq!(ordinals, vec![0, 1, 2]);
        assert_eq!(result[0].id, reordered[0]);
    }

    #[tokio::test]
    async fn search_is_and_of_whitespace_split_terms() {
        let store = test_store().await;
        store.create(sample_task("alpha beta")).await.unwrap();
        store.create(sample_task("alpha")).await.unwrap();
        store.create(sample_task("beta gamma")).await.unwrap();

        let results = TaskRepository::search(&store, "alpha beta", 10).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "alpha beta");

        let blank = TaskRepository::search(&store, "   ", 10).await.unwrap();
        assert!(blank.is_empty());
    }
}
