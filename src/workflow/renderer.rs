//! Pipeline source generation
//!
//! Fills the `kfp` (Kubeflow Pipelines DSL) and `airflow` (DAG module)
//! templates from a [`PipelineGraph`]. Rendering is a pure transform: the
//! same graph, environment and templates always give the same text.

use std::collections::BTreeMap;
use std::path::Path;

use handlebars::Handlebars;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::dag::DagDefinition;
use super::graph::{step_variable, GraphEdge, GraphNode, PipelineGraph, PipelineParameter};
use super::naming;
use crate::common::get_handlebars;
use crate::errors::{WorkflowError, WorkflowResult};

pub const KFP_TEMPLATE: &str = "kfp";
pub const AIRFLOW_TEMPLATE: &str = "airflow";

pub fn get_kfp_template() -> &'static str {
    include_str!("kfp_template.hbs")
}

pub fn get_airflow_template() -> &'static str {
    include_str!("airflow_template.hbs")
}

/// Container environment variable injected into every generated step.
///
/// `value_from` is a Kubernetes client expression (e.g. a secret key
/// reference) and takes precedence over `value`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvVarSpec {
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub value_from: Option<String>,
}

impl EnvVarSpec {
    pub fn value(value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
            value_from: None,
        }
    }

    pub fn value_from(expression: impl Into<String>) -> Self {
        Self {
            value: None,
            value_from: Some(expression.into()),
        }
    }
}

#[derive(Serialize)]
struct EnvVarContext<'a> {
    name: &'a str,
    value: &'a str,
    value_from: Option<&'a str>,
}

#[derive(Serialize)]
struct NodeContext<'a> {
    id: &'a str,
    var_name: String,
    node_type: &'a str,
    label: &'a str,
    image: &'a str,
    command: &'a str,
    args: &'a str,
    input_params: &'a str,
    output_params: &'a str,
    upstream: Vec<String>,
}

#[derive(Serialize)]
struct KfpContext<'a> {
    pipeline_name: &'a str,
    pipeline_description: &'a str,
    artifact_path: String,
    parameters: &'a [PipelineParameter],
    nodes: Vec<NodeContext<'a>>,
    env_variables: Vec<EnvVarContext<'a>>,
}

#[derive(Serialize)]
struct AirflowContext<'a> {
    dag: &'a DagDefinition,
    pipeline_name: Option<&'a str>,
    nodes: Vec<NodeContext<'a>>,
    edges: &'a [GraphEdge],
    env_variables: Vec<EnvVarContext<'a>>,
}

pub struct TemplateRenderer {
    handlebars: Handlebars<'static>,
    env_variables: BTreeMap<String, EnvVarSpec>,
}

impl TemplateRenderer {
    /// Renderer using the templates embedded in the binary
    pub fn new(env_variables: BTreeMap<String, EnvVarSpec>) -> WorkflowResult<Self> {
        Self::with_templates(get_kfp_template(), get_airflow_template(), env_variables)
    }

    /// Renderer loading `kfp_template.hbs` and `airflow_template.hbs` from `dir`
    pub fn from_dir(dir: &Path, env_variables: BTreeMap<String, EnvVarSpec>) -> WorkflowResult<Self> {
        let read = |name: &str| {
            let path = dir.join(format!("{}_template.hbs", name));
            std::fs::read_to_string(&path).map_err(|e| {
                WorkflowError::template(name, format!("cannot read {}: {}", path.display(), e))
            })
        };
        let kfp = read(KFP_TEMPLATE)?;
        let airflow = read(AIRFLOW_TEMPLATE)?;
        Self::with_templates(&kfp, &airflow, env_variables)
    }

    pub fn with_templates(
        kfp: &str,
        airflow: &str,
        env_variables: BTreeMap<String, EnvVarSpec>,
    ) -> WorkflowResult<Self> {
        let mut handlebars = get_handlebars();
        handlebars
            .register_template_string(KFP_TEMPLATE, kfp)
            .map_err(|e| WorkflowError::template(KFP_TEMPLATE, e))?;
        handlebars
            .register_template_string(AIRFLOW_TEMPLATE, airflow)
            .map_err(|e| WorkflowError::template(AIRFLOW_TEMPLATE, e))?;

        Ok(Self {
            handlebars,
            env_variables,
        })
    }

    pub fn env_variables(&self) -> &BTreeMap<String, EnvVarSpec> {
        &self.env_variables
    }

    /// Render the Kubeflow Pipelines DSL for `graph`.
    ///
    /// A missing or blank pipeline name is replaced by a generated one; the
    /// final name must be identifier-safe. The rendered program compiles
    /// itself to `artifact_path` when executed.
    pub fn render_kfp(&self, graph: &PipelineGraph, artifact_path: &Path) -> WorkflowResult<String> {
        let pipeline_name = naming::resolve_and_validate(graph.pipeline_name.as_deref())?;
        graph.validate_structure()?;

        let context = KfpContext {
            pipeline_name: &pipeline_name,
            pipeline_description: graph.pipeline_description.as_deref().unwrap_or_default(),
            artifact_path: artifact_path.to_string_lossy().replace('\\', "/"),
            parameters: &graph.parameters,
            nodes: node_contexts(graph)?,
            env_variables: self.env_contexts(),
        };

        let source = self
            .handlebars
            .render(KFP_TEMPLATE, &context)
            .map_err(|e| WorkflowError::template(KFP_TEMPLATE, e))?;
        debug!(
            "Rendered KFP pipeline '{}': {} nodes, {} bytes",
            pipeline_name,
            graph.nodes.len(),
            source.len()
        );
        Ok(source)
    }

    /// Render an Airflow DAG module for `graph` scheduled by `dag`
    pub fn render_airflow(&self, dag: &DagDefinition, graph: &PipelineGraph) -> WorkflowResult<String> {
        naming::validate_name(&dag.dag_id)?;
        graph.validate_structure()?;

        let context = AirflowContext {
            dag,
            pipeline_name: graph.pipeline_name.as_deref(),
            nodes: node_contexts(graph)?,
            edges: &graph.edges,
            env_variables: self.env_contexts(),
        };

        let source = self
            .handlebars
            .render(AIRFLOW_TEMPLATE, &context)
            .map_err(|e| WorkflowError::template(AIRFLOW_TEMPLATE, e))?;
        debug!(
            "Rendered Airflow DAG '{}': {} nodes, {} bytes",
            dag.dag_id,
            graph.nodes.len(),
            source.len()
        );
        Ok(source)
    }

    fn env_contexts(&self) -> Vec<EnvVarContext<'_>> {
        self.env_variables
            .iter()
            .map(|(name, spec)| EnvVarContext {
                name,
                value: spec.value.as_deref().unwrap_or_default(),
                value_from: spec.value_from.as_deref(),
            })
            .collect()
    }
}

fn node_contexts(graph: &PipelineGraph) -> WorkflowResult<Vec<NodeContext<'_>>> {
    Ok(graph
        .execution_order()?
        .into_iter()
        .map(|node| node_context(graph, node))
        .collect())
}

fn node_context<'a>(graph: &'a PipelineGraph, node: &'a GraphNode) -> NodeContext<'a> {
    let attributes = node.attributes();
    NodeContext {
        id: &node.id,
        var_name: step_variable(&node.id),
        node_type: &node.node_type,
        label: &node.label,
        image: &attributes.image,
        command: &attributes.command,
        args: &attributes.args,
        input_params: &attributes.input_params,
        output_params: &attributes.output_params,
        upstream: graph
            .upstream_of(&node.id)
            .into_iter()
            .map(step_variable)
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::dag::DagDate;
    use crate::workflow::graph::tests::{edge, graph, node};
    use serde_json::json;
    use std::path::PathBuf;

    fn env() -> BTreeMap<String, EnvVarSpec> {
        let mut env = BTreeMap::new();
        env.insert("MLFLOW_BUCKET_NAME".to_string(), EnvVarSpec::value("mlflow"));
        env.insert(
            "AWS_ACCESS_KEY_ID".to_string(),
            EnvVarSpec::value_from("client.V1EnvVarSource(secret_key_ref=client.V1SecretKeySelector(name='minio30creds', key='AWS_ACCESS_KEY_ID'))"),
        );
        env
    }

    fn renderer() -> TemplateRenderer {
        TemplateRenderer::new(env()).unwrap()
    }

    fn two_step_graph(name: Option<&str>) -> PipelineGraph {
        let mut g = graph(
            vec![node("train"), node("load")],
            vec![edge("load", "train")],
        );
        g.pipeline_name = name.map(str::to_string);
        g.pipeline_description = Some("Train the \"iris\" model".to_string());
        g
    }

    #[test]
    fn test_kfp_contains_name_unmodified() {
        let source = renderer()
            .render_kfp(&two_step_graph(Some("Iris_Training_2")), &PathBuf::from("/work/Iris_Training_2.yaml"))
            .unwrap();

        assert!(source.contains("def Iris_Training_2("));
        assert!(source.contains("name=\"Iris_Training_2\""));
        assert!(source.contains("compile(Iris_Training_2, \"/work/Iris_Training_2.yaml\")"));
        assert!(source.contains("description=\"Train the \\\"iris\\\" model\""));
    }

    #[test]
    fn test_kfp_orders_steps_and_links_dependencies() {
        let source = renderer()
            .render_kfp(&two_step_graph(Some("iris")), &PathBuf::from("iris.yaml"))
            .unwrap();

        let load = source.find("step_load = dsl.ContainerOp(").unwrap();
        let train = source.find("step_train = dsl.ContainerOp(").unwrap();
        assert!(load < train);
        assert!(source.contains("step_train.after(step_load)"));
        assert!(!source.contains("step_load.after("));
        assert!(source.contains("command=[\"python\", \"main.py\"],"));
        assert!(source.contains("image=\"python:3.10\""));
    }

    #[test]
    fn test_kfp_injects_env_variables() {
        let source = renderer()
            .render_kfp(&two_step_graph(Some("iris")), &PathBuf::from("iris.yaml"))
            .unwrap();

        assert!(source.contains(
            "step_load.add_env_variable(client.V1EnvVar(name=\"MLFLOW_BUCKET_NAME\", value=\"mlflow\"))"
        ));
        assert!(source.contains("name=\"AWS_ACCESS_KEY_ID\", value_from=client.V1EnvVarSource("));
    }

    #[test]
    fn test_kfp_parameters_become_python_arguments() {
        let mut g = two_step_graph(Some("iris"));
        g.parameters = vec![
            PipelineParameter {
                name: "data-path".to_string(),
                value: json!("s3://bucket/iris.csv"),
                base_type: "String".to_string(),
            },
            PipelineParameter {
                name: "epochs".to_string(),
                value: json!(10),
                base_type: "Integer".to_string(),
            },
            PipelineParameter {
                name: "seed".to_string(),
                value: serde_json::Value::Null,
                base_type: "Integer".to_string(),
            },
        ];
        let source = renderer().render_kfp(&g, &PathBuf::from("iris.yaml")).unwrap();
        assert!(source.contains("def iris(data_path=\"s3://bucket/iris.csv\", epochs=10, seed=None):"));
    }

    #[test]
    fn test_kfp_generates_missing_name() {
        let source = renderer()
            .render_kfp(&two_step_graph(None), &PathBuf::from("x.yaml"))
            .unwrap();
        let line = source.lines().find(|l| l.starts_with("def ")).unwrap();
        let name = &line[4..line.find('(').unwrap()];
        assert_eq!(name.len(), naming::GENERATED_NAME_LENGTH);
        assert!(name.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_render_is_idempotent() {
        let r = renderer();
        let g = two_step_graph(Some("iris"));
        let first = r.render_kfp(&g, &PathBuf::from("/out/iris.yaml")).unwrap();
        let second = r.render_kfp(&g, &PathBuf::from("/out/iris.yaml")).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_invalid_name_rejected_before_rendering() {
        let err = renderer()
            .render_kfp(&two_step_graph(Some("my pipeline!")), &PathBuf::from("x.yaml"))
            .unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidName(name) if name == "my pipeline!"));
    }

    #[test]
    fn test_invalid_graph_rejected() {
        let mut g = two_step_graph(Some("iris"));
        g.edges.push(edge("train", "train"));
        let err = renderer().render_kfp(&g, &PathBuf::from("x.yaml")).unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidGraph(_)));
    }

    #[test]
    fn test_empty_graph_renders_valid_body() {
        let mut g = graph(vec![], vec![]);
        g.pipeline_name = Some("empty".to_string());
        let source = renderer().render_kfp(&g, &PathBuf::from("x.yaml")).unwrap();
        assert!(source.contains("def empty():"));
        assert!(source.contains("    pass"));
        assert!(!source.contains("ContainerOp("));
    }

    #[test]
    fn test_missing_template_variable_is_template_error() {
        let r = TemplateRenderer::with_templates("{{no_such_field}}", "{{dag.dag_id}}", env()).unwrap();
        let err = r
            .render_kfp(&two_step_graph(Some("iris")), &PathBuf::from("x.yaml"))
            .unwrap_err();
        match err {
            WorkflowError::TemplateRender { template, .. } => assert_eq!(template, KFP_TEMPLATE),
            other => panic!("expected TemplateRender, got {other:?}"),
        }
    }

    #[test]
    fn test_malformed_template_fails_at_construction() {
        let result = TemplateRenderer::with_templates("{{#each nodes}}", "", env());
        assert!(matches!(result, Err(WorkflowError::TemplateRender { .. })));
    }

    #[test]
    fn test_templates_loaded_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("kfp_template.hbs"), "pipeline {{pipeline_name}}").unwrap();
        std::fs::write(dir.path().join("airflow_template.hbs"), "dag {{dag.dag_id}}").unwrap();

        let r = TemplateRenderer::from_dir(dir.path(), BTreeMap::new()).unwrap();
        let source = r
            .render_kfp(&two_step_graph(Some("iris")), &PathBuf::from("x.yaml"))
            .unwrap();
        assert_eq!(source, "pipeline iris");

        let missing = tempfile::tempdir().unwrap();
        assert!(TemplateRenderer::from_dir(missing.path(), BTreeMap::new()).is_err());
    }

    #[test]
    fn test_airflow_dag() {
        let dag = DagDefinition {
            dag_id: "daily_iris".to_string(),
            schedule: "@daily".to_string(),
            owner: "ml-team".to_string(),
            retry_delay: "timedelta(minutes=5)".to_string(),
            start_date: Some(DagDate {
                year: "2024".to_string(),
                month: "1".to_string(),
                day: "15".to_string(),
            }),
            tags: vec!["ml".to_string(), "iris".to_string()],
            ..Default::default()
        };
        let source = renderer()
            .render_airflow(&dag, &two_step_graph(Some("iris")))
            .unwrap();

        assert!(source.contains("dag_id=\"daily_iris\""));
        assert!(source.contains("schedule=\"@daily\""));
        assert!(source.contains("\"owner\": \"ml-team\""));
        assert!(source.contains("\"retries\": 1,"));
        assert!(source.contains("\"retry_delay\": timedelta(minutes=5),"));
        assert!(source.contains("start_date=datetime(2024, 1, 15),"));
        assert!(source.contains("tags=[\"ml\", \"iris\"],"));
        assert!(source.contains("step_load >> step_train"));
        assert!(!source.contains("catchup="));
    }

    #[test]
    fn test_airflow_rejects_unsafe_dag_id() {
        let dag = DagDefinition {
            dag_id: "../etc/passwd".to_string(),
            ..Default::default()
        };
        let err = renderer()
            .render_airflow(&dag, &two_step_graph(Some("iris")))
            .unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidName(_)));
    }
}
