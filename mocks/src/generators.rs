//! Random test data generators using the `fake` crate, generalized from
//! the teacher's `task_core::Task` generators onto `NewTask` and
//! `EntityFilter`.
//!
//! Provides realistic random data including:
//! - Task titles and summaries
//! - Tag pools
//! - Status/priority sampling
//! - Property-based testing strategies

use fake::faker::lorem::en::{Paragraph, Sentence};
use fake::Fake;
use proptest::prelude::*;
use rand::Rng;

use orchestrator_core::models::{EntityFilter, NewTask, Priority, StatusName};

/// A realistic task title.
pub fn generate_task_title() -> String {
    Sentence(3..8).fake()
}

/// A realistic task summary.
pub fn generate_task_summary() -> String {
    Paragraph(2..5).fake()
}

/// A tag drawn from a small realistic pool, mirroring the teacher's
/// `generate_agent_name` pool shape.
pub fn generate_tag() -> String {
    let tags = [
        "backend", "frontend", "infra", "bug", "docs", "security", "performance", "testing",
    ];
    tags[rand::thread_rng().gen_range(0..tags.len())].to_string()
}

/// A random built-in status drawn from the default workflow config's
/// known statuses.
pub fn generate_status() -> StatusName {
    let statuses = ["pending", "in-progress", "in-review", "completed", "cancelled"];
    let status = statuses[rand::thread_rng().gen_range(0..statuses.len())];
    StatusName::new(status).unwrap()
}

/// A random priority, uniformly over the three variants.
pub fn generate_priority() -> Priority {
    match rand::thread_rng().gen_range(0..3) {
        0 => Priority::Low,
        1 => Priority::Medium,
        _ => Priority::High,
    }
}

/// A `NewTask` with realistic random title/summary/status/priority/tags.
pub fn generate_random_new_task() -> NewTask {
    NewTask {
        feature_id: None,
        project_id: None,
        title: generate_task_title(),
        summary: Some(generate_task_summary()),
        status: generate_status(),
        priority: generate_priority(),
        complexity: rand::thread_rng().gen_range(1..=10),
        tags: vec![generate_tag()],
    }
}

/// Configurable task generator, mirroring the teacher's `TaskGenerator`.
pub struct TaskGenerator {
    pub default_status: String,
    pub tag_pool: Vec<String>,
}

impl Default for TaskGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskGenerator {
    pub fn new() -> Self {
        Self {
            default_status: "pending".to_string(),
            tag_pool: vec!["backend".to_string(), "frontend".to_string(), "infra".to_string()],
        }
    }

    pub fn generate(&self) -> NewTask {
        let tag = &self.tag_pool[rand::thread_rng().gen_range(0..self.tag_pool.len())];
        NewTask {
            feature_id: None,
            project_id: None,
            title: generate_task_title(),
            summary: Some(generate_task_summary()),
            status: StatusName::new(&self.default_status).unwrap(),
            priority: generate_priority(),
            complexity: rand::thread_rng().gen_range(1..=10),
            tags: vec![tag.clone()],
        }
    }
}

/// Proptest strategy for generating valid task titles.
pub fn task_title_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z ]{5,50}"
}

/// Proptest strategy over the default workflow config's known statuses.
pub fn status_strategy() -> impl Strategy<Value = StatusName> {
    prop_oneof![
        Just(StatusName::new("pending").unwrap()),
        Just(StatusName::new("in-progress").unwrap()),
        Just(StatusName::new("in-review").unwrap()),
        Just(StatusName::new("completed").unwrap()),
        Just(StatusName::new("cancelled").unwrap()),
    ]
}

/// Proptest strategy over priorities.
pub fn priority_strategy() -> impl Strategy<Value = Priority> {
    prop_oneof![Just(Priority::Low), Just(Priority::Medium), Just(Priority::High)]
}

/// Proptest strategy for generating complete `NewTask` values.
pub fn new_task_strategy() -> impl Strategy<Value = NewTask> {
    (
        task_title_strategy(),
        status_strategy(),
        priority_strategy(),
        1u8..=10,
    )
        .prop_map(|(title, status, priority, complexity)| NewTask {
            feature_id: None,
            project_id: None,
            title,
            summary: None,
            status,
            priority,
            complexity,
            tags: vec![],
        })
}

/// Proptest strategy for generating `EntityFilter` values.
pub fn entity_filter_strategy() -> impl Strategy<Value = EntityFilter> {
    (proptest::option::of(status_strategy()), 1u32..100).prop_map(|(status, limit)| EntityFilter {
        status_in: status.into_iter().collect(),
        limit,
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_task_has_valid_complexity_range() {
        for _ in 0..20 {
            let task = generate_random_new_task();
            assert!((1..=10).contains(&task.complexity));
        }
    }

    proptest! {
        #[test]
        fn new_task_strategy_always_produces_nonempty_titles(task in new_task_strategy()) {
            prop_assert!(!task.title.is_empty());
        }
    }
}
