//! Row <-> model conversions, sqlx error mapping, and the shared
//! search-vector / filter-query builders used by every `Sqlite*Repository`.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use orchestrator_core::error::{OrchestratorError, Result};
use orchestrator_core::models::{
    DependencyType, EntityFilter, EntityType, Priority, StatusName, UnblockAt,
};
use sqlx::{sqlite::SqliteRow, Row};

/// Lowercased concatenation of the searchable text fields plus tags,
/// denormalized onto each entity row per spec.md §4.2's "search vector".
pub fn build_search_vector(parts: &[&str], tags: &BTreeSet<String>) -> String {
    let mut vector = parts
        .iter()
        .filter(|p| !p.is_empty())
        .cloned()
        .collect::<Vec<_>>()
        .join(" ");
    if !tags.is_empty() {
        vector.push(' ');
        vector.push_str(&tags.iter().cloned().collect::<Vec<_>>().join(" "));
    }
    vector.to_lowercase()
}

pub fn parse_priority(s: &str) -> Result<Priority> {
    match s {
        "LOW" => Ok(Priority::Low),
        "MEDIUM" => Ok(Priority::Medium),
        "HIGH" => Ok(Priority::High),
        other => Err(OrchestratorError::Database(format!(
            "invalid priority in database: {other}"
        ))),
    }
}

pub fn priority_to_string(p: Priority) -> &'static str {
    match p {
        Priority::Low => "LOW",
        Priority::Medium => "MEDIUM",
        Priority::High => "HIGH",
    }
}

pub fn parse_dep_type(s: &str) -> Result<DependencyType> {
    DependencyType::parse(s)
}

pub fn parse_unblock_at(s: Option<&str>) -> Result<Option<UnblockAt>> {
    s.map(UnblockAt::parse).transpose()
}

pub fn status_name(s: &str) -> Result<StatusName> {
    StatusName::new(s)
}

/// Convert sqlx errors into the domain's `OrchestratorError`. Unique
/// constraint violations map to `Conflict` rather than `Database` --
/// they indicate a structural conflict (duplicate ordinal, duplicate
/// dependency triple), not infrastructure failure.
pub fn sqlx_error_to_orchestrator_error(err: sqlx::Error) -> OrchestratorError {
    match &err {
        sqlx::Error::Database(db_err) => {
            let message = db_err.message();
            if message.contains("UNIQUE constraint failed") {
                OrchestratorError::Conflict(format!("unique constraint violated: {message}"))
            } else if message.contains("FOREIGN KEY constraint failed") {
                OrchestratorError::Validation(format!("referenced entity does not exist: {message}"))
            } else {
                OrchestratorError::Database(format!("database constraint error: {message}"))
            }
        }
        sqlx::Error::RowNotFound => {
            OrchestratorError::Internal("unexpected RowNotFound".to_string())
        }
        sqlx::Error::PoolTimedOut => OrchestratorError::Database("connection pool timeout".into()),
        sqlx::Error::Io(io_err) => OrchestratorError::Database(format!("database I/O error: {io_err}")),
        _ => OrchestratorError::Database(format!("database operation failed: {err}")),
    }
}

pub fn get_ts(row: &SqliteRow, col: &str) -> DateTime<Utc> {
    row.get(col)
}

/// Builds the common `WHERE` suffix shared by `find_by_filters` across
/// every versioned entity: multi-value status include/exclude, priority
/// include, tag ANY/ALL match via the `tags` table, whitespace-split
/// AND-of-LIKEs over `search_vector`, ordered `updated_at DESC`, capped
/// by `limit` (spec.md §4.2).
pub fn push_entity_filter<'a>(
    qb: &mut sqlx::QueryBuilder<'a, sqlx::Sqlite>,
    entity_type: EntityType,
    filter: &'a EntityFilter,
    mut has_conditions: bool,
) -> bool {
    if !filter.status_in.is_empty() {
        qb.push(if has_conditions { " AND " } else { " WHERE " });
        has_conditions = true;
        qb.push("status IN (");
        let mut separated = qb.separated(", ");
        for s in &filter.status_in {
            separated.push_bind(s.as_str().to_string());
        }
        separated.push_unseparated(")");
    }

    if !filter.status_not_in.is_empty() {
        qb.push(if has_conditions { " AND " } else { " WHERE " });
        has_conditions = true;
        qb.push("status NOT IN (");
        let mut separated = qb.separated(", ");
        for s in &filter.status_not_in {
            separated.push_bind(s.as_str().to_string());
        }
        separated.push_unseparated(")");
    }

    if !filter.priority_in.is_empty() {
        qb.push(if has_conditions { " AND " } else { " WHERE " });
        has_conditions = true;
        qb.push("priority IN (");
        let mut separated = qb.separated(", ");
        for p in &filter.priority_in {
            separated.push_bind(priority_to_string(*p));
        }
        separated.push_unseparated(")");
    }

    if let Some(text) = filter.text_query.as_deref() {
        let words: Vec<&str> = text.split_whitespace().collect();
        if !words.is_empty() {
            qb.push(if has_conditions { " AND " } else { " WHERE " });
            has_conditions = true;
            qb.push("(");
            for (i, word) in words.iter().enumerate() {
                if i > 0 {
                    qb.push(" AND ");
                }
                qb.push("search_vector LIKE ");
                qb.push_bind(format!("%{}%", word.to_lowercase()));
            }
            qb.push(")");
        } else {
            // Purely whitespace query matches nothing (spec.md §8 boundary behaviour).
            qb.push(if has_conditions { " AND " } else { " WHERE " });
            has_conditions = true;
            qb.push("1 = 0");
        }
    }

    if !filter.tags.is_empty() {
        qb.push(if has_conditions { " AND " } else { " WHERE " });
        has_conditions = true;
        let entity_type_str = entity_type.to_string();
        if filter.match_all_tags {
            qb.push("(SELECT COUNT(DISTINCT tag) FROM tags WHERE entity_type = ");
            qb.push_bind(entity_type_str);
            qb.push(" AND entity_id = id AND tag IN (");
            let mut separated = qb.separated(", ");
            for t in &filter.tags {
                separated.push_bind(t.clone());
            }
            separated.push_unseparated("))");
            qb.push(" = ");
            qb.push_bind(filter.tags.len() as i64);
        } else {
            qb.push("EXISTS (SELECT 1 FROM tags WHERE entity_type = ");
            qb.push_bind(entity_type_str);
            qb.push(" AND entity_id = id AND tag IN (");
            let mut separated = qb.separated(", ");
            for t in &filter.tags {
                separated.push_bind(t.clone());
            }
            separated.push_unseparated("))");
        }
    }

    has_conditions
}

pub fn clamp_limit(limit: u32) -> i64 {
    const MAX_LIMIT: u32 = 1000;
    limit.min(MAX_LIMIT) as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_vector_is_lowercased_and_includes_tags() {
        let mut tags = BTreeSet::new();
        tags.insert("Backend".to_string());
        let vector = build_search_vector(&["Alpha Beta", "Some Summary"], &tags);
        assert_eq!(vector, "alpha beta some summary backend");
    }

    #[test]
    fn priority_round_trips() {
        assert_eq!(parse_priority("HIGH").unwrap(), Priority::High);
        assert_eq!(priority_to_string(Priority::Low), "LOW");
        assert!(parse_priority("bogus").is_err());
    }

    #[test]
    fn clamp_limit_caps_oversize_requests() {
        assert_eq!(clamp_limit(5), 5);
        assert_eq!(clamp_limit(100_000), 1000);
    }
}
