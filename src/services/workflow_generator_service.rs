use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::WorkflowConfig;
use crate::errors::WorkflowResult;
use crate::kfp::PipelinePackage;
use crate::workflow::{naming, DagDefinition, DefinitionCompiler, PipelineGraph, TemplateRenderer};

/// Graph echoed back with its resolved name and the compiled artifact
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GeneratedPipeline {
    #[serde(flatten)]
    pub graph: PipelineGraph,
    #[schema(value_type = String)]
    pub pipeline_package_path: PathBuf,
}

impl GeneratedPipeline {
    pub fn pipeline_name(&self) -> &str {
        self.graph.pipeline_name.as_deref().unwrap_or_default()
    }

    pub fn package(&self) -> PipelinePackage {
        PipelinePackage {
            pipeline_name: self.pipeline_name().to_string(),
            pipeline_package_path: self.pipeline_package_path.clone(),
            description: self.graph.pipeline_description.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GeneratedDag {
    #[serde(flatten)]
    pub dag: DagDefinition,
    #[schema(value_type = String)]
    pub dag_file_path: PathBuf,
}

fn absolute(path: PathBuf) -> std::io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path)
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

async fn remove_work_dir(work_dir: &Path) {
    match tokio::fs::remove_dir_all(work_dir).await {
        Ok(()) => debug!("Removed work directory {}", work_dir.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove work directory {}: {}", work_dir.display(), e),
    }
}

/// Renders graphs into pipeline sources and compiles KFP pipelines.
///
/// Each call works in its own `<output_dir>/<uuid>/` directory so concurrent
/// requests for the same name never share files. Successful outputs stay on
/// disk for the caller until [`WorkflowGeneratorService::discard`]; a failed
/// compile removes its directory.
#[derive(Clone)]
pub struct WorkflowGeneratorService {
    renderer: Arc<TemplateRenderer>,
    compiler: DefinitionCompiler,
    output_dir: PathBuf,
}

impl WorkflowGeneratorService {
    pub fn new(
        renderer: Arc<TemplateRenderer>,
        compiler: DefinitionCompiler,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            renderer,
            compiler,
            output_dir: output_dir.into(),
        }
    }

    pub fn from_config(config: &WorkflowConfig) -> WorkflowResult<Self> {
        let renderer = match &config.template_dir {
            Some(dir) => TemplateRenderer::from_dir(dir, config.env_variables.clone())?,
            None => TemplateRenderer::new(config.env_variables.clone())?,
        };
        let compiler = DefinitionCompiler::new(&config.interpreter)
            .with_args(config.interpreter_args.clone())
            .with_timeout(config.compile_timeout());

        Ok(Self::new(Arc::new(renderer), compiler, &config.output_dir))
    }

    pub fn renderer(&self) -> &TemplateRenderer {
        &self.renderer
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn work_dir(&self) -> std::io::Result<PathBuf> {
        absolute(self.output_dir.join(Uuid::new_v4().to_string()))
    }

    /// Render the KFP DSL for `graph`, run it, and return the compiled package
    pub async fn make_kfp_pipeline(&self, mut graph: PipelineGraph) -> WorkflowResult<GeneratedPipeline> {
        let pipeline_name = naming::resolve_and_validate(graph.pipeline_name.as_deref())?;
        graph.pipeline_name = Some(pipeline_name.clone());

        let work_dir = self.work_dir()?;
        let source_path = work_dir.join(format!("{}.py", pipeline_name));
        let artifact_path = work_dir.join(format!("{}.yaml", pipeline_name));

        let source = self.renderer.render_kfp(&graph, &artifact_path)?;
        let package_path = match self
            .compiler
            .compile(&source, &source_path, &artifact_path)
            .await
        {
            Ok(path) => path,
            Err(err) => {
                remove_work_dir(&work_dir).await;
                return Err(err);
            }
        };

        info!(
            "Generated KFP pipeline '{}' at {}",
            pipeline_name,
            package_path.display()
        );
        Ok(GeneratedPipeline {
            graph,
            pipeline_package_path: package_path,
        })
    }

    /// Remove the working directory of a generated pipeline.
    ///
    /// Paths outside `output_dir` are left alone.
    pub async fn discard(&self, generated: &GeneratedPipeline) {
        let Some(work_dir) = generated.pipeline_package_path.parent() else {
            return;
        };
        match absolute(self.output_dir.clone()) {
            Ok(output_dir) if work_dir.parent() == Some(output_dir.as_path()) => {
                remove_work_dir(work_dir).await
            }
            _ => warn!("Not removing {}: outside the output directory", work_dir.display()),
        }
    }

    /// Render and write an Airflow DAG module; it is not executed
    pub async fn make_airflow_dag(
        &self,
        dag: DagDefinition,
        graph: PipelineGraph,
    ) -> WorkflowResult<GeneratedDag> {
        let source = self.renderer.render_airflow(&dag, &graph)?;

        let work_dir = self.work_dir()?;
        tokio::fs::create_dir_all(&work_dir).await?;
        let dag_file_path = work_dir.join(format!("{}.py", dag.dag_id));
        tokio::fs::write(&dag_file_path, source).await?;

        info!(
            "Generated Airflow DAG '{}' at {}",
            dag.dag_id,
            dag_file_path.display()
        );
        Ok(GeneratedDag { dag, dag_file_path })
    }
}
