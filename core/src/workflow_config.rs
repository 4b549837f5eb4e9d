//! The declarative status→role document from `spec.md` §4.1, and the
//! atomically-swappable snapshot that readers take of it.
//!
//! The document itself is YAML (`status-workflow-config.yaml` /
//! `config.yaml` per §6); this module owns only the parsed shape and the
//! pure query operations (`getStatusesForRole`, `getRoleForStatus`,
//! `isTerminalStatus`). File watching and atomic publication live in
//! `orchestrator-server`, which owns the `ArcSwap` handle; everything in
//! this crate only ever reads a `WorkflowConfigSnapshot`.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{OrchestratorError, Result};
use crate::models::{EntityType, Role};

/// Per-entity-type status progression document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusProgressionEntry {
    /// `roleName -> [statusName, ...]`
    pub roles: HashMap<String, Vec<String>>,
    pub terminal_statuses: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionCleanupConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_retain_tags")]
    pub retain_tags: Vec<String>,
}

fn default_retain_tags() -> Vec<String> {
    vec![
        "bug".to_string(),
        "bugfix".to_string(),
        "fix".to_string(),
        "hotfix".to_string(),
        "critical".to_string(),
    ]
}

impl Default for CompletionCleanupConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            retain_tags: default_retain_tags(),
        }
    }
}

/// Root document shape for `config.yaml` / `status-workflow-config.yaml`.
/// The two files are merged at load time (`WorkflowConfigDocument::merge`)
/// so either may supply the sections it owns; both default independently
/// when absent, per the "missing file -> defaults" failure contract.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkflowConfigDocument {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub status_progression: HashMap<String, StatusProgressionEntry>,
    #[serde(default)]
    pub completion_cleanup: CompletionCleanupConfig,
}

impl WorkflowConfigDocument {
    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        serde_yaml::from_str(raw)
            .map_err(|e| OrchestratorError::Configuration(format!("invalid workflow config: {e}")))
    }

    /// Built-in defaults used when no config file is present at all:
    /// a single linear queue/work/review/terminal progression shared by
    /// every entity type, cleanup disabled.
    pub fn defaults() -> Self {
        let mut entry = StatusProgressionEntry::default();
        entry.roles.insert("queue".into(), vec!["pending".into()]);
        entry.roles.insert("work".into(), vec!["in-progress".into()]);
        entry.roles.insert("review".into(), vec!["in-review".into()]);
        entry
            .roles
            .insert("terminal".into(), vec!["completed".into(), "cancelled".into()]);
        entry.terminal_statuses = vec!["completed".into(), "cancelled".into()];

        let mut status_progression = HashMap::new();
        for entity_type in ["project", "feature", "task"] {
            status_progression.insert(entity_type.to_string(), entry.clone());
        }

        Self {
            version: Some("2.0.0".into()),
            status_progression,
            completion_cleanup: CompletionCleanupConfig::default(),
        }
    }

    /// Overlay `other`'s sections onto `self`, preferring `other` wherever
    /// it declares something (used to merge `status-workflow-config.yaml`
    /// over `config.yaml`'s base).
    pub fn merge(mut self, other: WorkflowConfigDocument) -> Self {
        if other.version.is_some() {
            self.version = other.version;
        }
        for (k, v) in other.status_progression {
            self.status_progression.insert(k, v);
        }
        if other.completion_cleanup.enabled || !other.completion_cleanup.retain_tags.is_empty() {
            self.completion_cleanup = other.completion_cleanup;
        }
        self
    }
}

/// An immutable, queryable snapshot built from a `WorkflowConfigDocument`.
/// Readers hold an `Arc<WorkflowConfigSnapshot>` obtained from an
/// `ArcSwap`; reloads publish a new snapshot without blocking readers.
#[derive(Debug, Clone)]
pub struct WorkflowConfigSnapshot {
    doc: WorkflowConfigDocument,
    /// (entityType, statusName) -> Role, precomputed for `getRoleForStatus`.
    status_to_role: HashMap<(String, String), Role>,
}

impl WorkflowConfigSnapshot {
    pub fn from_document(doc: WorkflowConfigDocument) -> Self {
        let mut status_to_role = HashMap::new();
        for (entity_type, entry) in &doc.status_progression {
            for (role_name, statuses) in &entry.roles {
                let role = Role::parse(role_name);
                for status in statuses {
                    status_to_role.insert((entity_type.clone(), status.clone()), role.clone());
                }
            }
        }
        Self { doc, status_to_role }
    }

    pub fn defaults() -> Self {
        Self::from_document(WorkflowConfigDocument::defaults())
    }

    pub fn document(&self) -> &WorkflowConfigDocument {
        &self.doc
    }

    pub fn completion_cleanup(&self) -> &CompletionCleanupConfig {
        &self.doc.completion_cleanup
    }

    /// `getStatusesForRole(role, entityType) -> set<status>`; empty if
    /// the entity type or role is unknown.
    pub fn statuses_for_role(&self, role: &Role, entity_type: EntityType) -> HashSet<String> {
        self.doc
            .status_progression
            .get(&entity_type.to_string())
            .and_then(|entry| entry.roles.get(&role.to_string()))
            .map(|statuses| statuses.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// `getRoleForStatus(status, entityType) -> role?`.
    pub fn role_for_status(&self, status: &str, entity_type: EntityType) -> Option<Role> {
        self.status_to_role
            .get(&(entity_type.to_string(), status.to_string()))
            .cloned()
    }

    /// `isTerminalStatus(status, entityType) -> bool`.
    pub fn is_terminal_status(&self, status: &str, entity_type: EntityType) -> bool {
        self.doc
            .status_progression
            .get(&entity_type.to_string())
            .map(|entry| entry.terminal_statuses.iter().any(|s| s == status))
            .unwrap_or(false)
    }

    /// All legal statuses for an entity type, across every role.
    pub fn all_statuses(&self, entity_type: EntityType) -> HashSet<String> {
        self.doc
            .status_progression
            .get(&entity_type.to_string())
            .map(|entry| entry.roles.values().flatten().cloned().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_round_trip_role_and_status() {
        let snapshot = WorkflowConfigSnapshot::defaults();
        assert_eq!(
            snapshot.role_for_status("pending", EntityType::Task),
            Some(Role::Queue)
        );
        assert!(snapshot
            .statuses_for_role(&Role::Queue, EntityType::Task)
            .contains("pending"));
        assert!(snapshot.is_terminal_status("completed", EntityType::Task));
        assert!(!snapshot.is_terminal_status("pending", EntityType::Task));
    }

    #[test]
    fn unknown_entity_type_yields_empty_sets() {
        let snapshot = WorkflowConfigSnapshot::defaults();
        assert!(snapshot
            .statuses_for_role(&Role::Queue, EntityType::Project)
            .contains("pending"));
        assert_eq!(snapshot.role_for_status("bogus", EntityType::Task), None);
    }

    #[test]
    fn malformed_yaml_is_a_configuration_error() {
        let err = WorkflowConfigDocument::from_yaml_str("not: [valid: yaml: at all").unwrap_err();
        assert!(matches!(err, OrchestratorError::Configuration(_)));
    }

    #[test]
    fn merge_prefers_overlay_sections() {
        let base = WorkflowConfigDocument::defaults();
        let mut overlay = WorkflowConfigDocument::default();
        overlay.completion_cleanup.enabled = true;
        let merged = base.merge(overlay);
        assert!(merged.completion_cleanup.enabled);
        assert!(merged.status_progression.contains_key("task"));
    }
}
