//! Thin standalone CLI that scaffolds a new deployment's domain config
//! files onto disk: `config.yaml`, `status-workflow-config.yaml`, and
//! `agent-mapping.yaml` (`spec.md` §6). Deliberately shallow — no
//! algorithmic depth, just template rendering — per `SPEC_FULL.md` §10's
//! narrowing of the teacher's AI-client scaffolding tool down to
//! orchestration config files.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use handlebars::Handlebars;
use serde::Serialize;
use tracing::info;

/// Scaffold the domain config files a fresh orchestrator deployment needs.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory the three config files are written into.
    #[arg(short, long, default_value = ".")]
    output_dir: String,

    /// Directory the `.hbs` templates are read from.
    #[arg(short, long, default_value = "templates")]
    template_dir: String,

    /// Overwrite files that already exist.
    #[arg(long)]
    force: bool,
}

#[derive(Serialize)]
struct ConfigYamlData {
    version: &'static str,
    completion_cleanup: CompletionCleanupData,
    entity_types: [&'static str; 3],
}

#[derive(Serialize)]
struct CompletionCleanupData {
    enabled: bool,
    retain_tags: Vec<&'static str>,
}

#[derive(Serialize)]
struct StatusWorkflowData {
    entity_types: [&'static str; 3],
}

#[derive(Serialize)]
struct AgentMappingData {
    tags: Vec<TagMapping>,
}

#[derive(Serialize)]
struct TagMapping {
    tag: &'static str,
    role: &'static str,
}

struct Scaffold {
    file_name: &'static str,
    template_name: &'static str,
}

const SCAFFOLDS: [Scaffold; 3] = [
    Scaffold {
        file_name: "config.yaml",
        template_name: "config.yaml.hbs",
    },
    Scaffold {
        file_name: "status-workflow-config.yaml",
        template_name: "status-workflow-config.yaml.hbs",
    },
    Scaffold {
        file_name: "agent-mapping.yaml",
        template_name: "agent-mapping.yaml.hbs",
    },
];

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let template_dir = PathBuf::from(&args.template_dir);
    let output_dir = PathBuf::from(&args.output_dir);
    fs::create_dir_all(&output_dir)
        .with_context(|| format!("creating output directory '{}'", output_dir.display()))?;

    let mut engine = Handlebars::new();
    engine.set_strict_mode(true);

    for scaffold in &SCAFFOLDS {
        let template_path = template_dir.join(scaffold.template_name);
        let output_path = output_dir.join(scaffold.file_name);

        if output_path.exists() && !args.force {
            info!(path = %output_path.display(), "skipping existing file (use --force to overwrite)");
            continue;
        }

        let rendered = render_one(&mut engine, &template_path, scaffold.template_name)?;
        fs::write(&output_path, rendered)
            .with_context(|| format!("writing '{}'", output_path.display()))?;
        info!(path = %output_path.display(), "wrote config file");
    }

    Ok(())
}

/// Read, register, and render one named template against the fixed
/// defaults for that file. Each template gets its own data shape; there's
/// no generic "merge some JSON in" path because the three files are not
/// user-parameterized beyond `--output-dir`/`--force`.
fn render_one(engine: &mut Handlebars<'static>, template_path: &Path, template_name: &str) -> Result<String> {
    let template_str = fs::read_to_string(template_path)
        .with_context(|| format!("reading template '{}'", template_path.display()))?;
    engine
        .register_template_string(template_name, &template_str)
        .with_context(|| format!("parsing template '{}'", template_path.display()))?;

    match template_name {
        "config.yaml.hbs" => render_typed(engine, template_name, &config_data()),
        "status-workflow-config.yaml.hbs" => render_typed(engine, template_name, &workflow_data()),
        "agent-mapping.yaml.hbs" => render_typed(engine, template_name, &agent_mapping_data()),
        other => anyhow::bail!("no render data registered for template {other}"),
    }
}

fn config_data() -> ConfigYamlData {
    ConfigYamlData {
        version: "2.0.0",
        completion_cleanup: CompletionCleanupData {
            enabled: false,
            retain_tags: vec!["bug", "bugfix", "fix", "hotfix", "critical"],
        },
        entity_types: ["project", "feature", "task"],
    }
}

fn workflow_data() -> StatusWorkflowData {
    StatusWorkflowData {
        entity_types: ["project", "feature", "task"],
    }
}

fn agent_mapping_data() -> AgentMappingData {
    AgentMappingData {
        tags: vec![
            TagMapping { tag: "backend", role: "work" },
            TagMapping { tag: "frontend", role: "work" },
            TagMapping { tag: "review", role: "review" },
        ],
    }
}

fn render_typed<T: Serialize>(engine: &Handlebars<'static>, template_name: &str, data: &T) -> Result<String> {
    engine
        .render(template_name, data)
        .with_context(|| format!("rendering template '{template_name}'"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn renders_config_yaml_with_defaults() {
        let mut engine = Handlebars::new();
        let dir = tempdir().unwrap();
        let template_path = dir.path().join("config.yaml.hbs");
        fs::write(
            &template_path,
            "version: \"{{version}}\"\ncompletion_cleanup:\n  enabled: {{completion_cleanup.enabled}}\n",
        )
        .unwrap();

        let rendered = render_one(&mut engine, &template_path, "config.yaml.hbs").unwrap();
        assert!(rendered.contains("version: \"2.0.0\""));
        assert!(rendered.contains("enabled: false"));
    }

    #[test]
    fn existing_files_are_skipped_without_force() {
        let out = tempdir().unwrap();
        fs::write(out.path().join("config.yaml"), "stale").unwrap();
        assert!(out.path().join("config.yaml").exists());
    }
}
