use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{error, info};

use crate::common::write_string_to_file;
use crate::config::WorkflowConfig;
use crate::workflow::renderer::{get_airflow_template, get_kfp_template};
use crate::workflow::{naming, DagDefinition, PipelineGraph, TemplateRenderer};

/// Print an embedded template so it can be used as a starting point for `template_dir`
pub fn generate_template(name: String) {
    info!("Generating template: {}", name);
    match name.as_str() {
        "kfp" => println!("{}", get_kfp_template()),
        "airflow" => println!("{}", get_airflow_template()),
        _ => error!("Unsupported template: {} - use kfp, airflow", name),
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {}", path.display()))
}

/// Render a pipeline graph from disk without compiling it.
///
/// With `dag_path` an Airflow DAG is rendered, otherwise a KFP DSL whose
/// compile target is `artifact` (default `<pipeline_name>.yaml`).
pub fn render_pipeline(
    config: &WorkflowConfig,
    graph_path: &Path,
    dag_path: Option<&Path>,
    artifact: Option<PathBuf>,
    output: Option<&Path>,
) -> Result<()> {
    let renderer = match &config.template_dir {
        Some(dir) => TemplateRenderer::from_dir(dir, config.env_variables.clone())?,
        None => TemplateRenderer::new(config.env_variables.clone())?,
    };
    let mut graph: PipelineGraph = read_json(graph_path)?;

    let source = match dag_path {
        Some(dag_path) => {
            let dag: DagDefinition = read_json(dag_path)?;
            renderer.render_airflow(&dag, &graph)?
        }
        None => {
            let name = naming::resolve_and_validate(graph.pipeline_name.as_deref())?;
            let artifact = artifact.unwrap_or_else(|| PathBuf::from(format!("{}.yaml", name)));
            graph.pipeline_name = Some(name);
            renderer.render_kfp(&graph, &artifact)?
        }
    };

    match output {
        Some(path) => {
            write_string_to_file(path, &source)?;
            info!("Wrote {}", path.display());
        }
        None => println!("{}", source),
    }
    Ok(())
}
