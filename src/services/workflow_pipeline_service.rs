use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{info, warn};

use super::pipeline_service::{PipelineCreateRequest, PipelineService};
use super::workflow_generator_service::WorkflowGeneratorService;
use crate::database::entities::pipelines;
use crate::errors::{GatewayResult, PipelineError};
use crate::kfp::PipelineUploader;
use crate::workflow::PipelineGraph;

/// Generate, upload and register a pipeline in one step.
///
/// Each step short-circuits the rest: generation failures surface as
/// workflow errors, upload failures as upstream errors, and persistence
/// failures as `CreateFailed` carrying the record that was attempted.
/// The compiled package is removed once the upload has been attempted.
#[derive(Clone)]
pub struct WorkflowPipelineService {
    generator: WorkflowGeneratorService,
    uploader: Arc<dyn PipelineUploader>,
    registry: PipelineService,
}

impl WorkflowPipelineService {
    pub fn new(
        generator: WorkflowGeneratorService,
        uploader: Arc<dyn PipelineUploader>,
        registry: PipelineService,
    ) -> Self {
        Self {
            generator,
            uploader,
            registry,
        }
    }

    pub async fn make_pipeline(&self, graph: PipelineGraph) -> GatewayResult<pipelines::Model> {
        let generated = self.generator.make_kfp_pipeline(graph).await?;
        let uploaded = self.uploader.upload_pipeline(&generated.package()).await;
        self.generator.discard(&generated).await;
        let uploaded = uploaded?;

        let version = uploaded.default_version.clone().unwrap_or_default();
        let graph = generated.graph;
        let request = PipelineCreateRequest {
            pipeline_id: uploaded.id.clone(),
            pipeline_name: uploaded.name.clone(),
            pipeline_description: uploaded.description.clone().or(graph.pipeline_description),
            version_name: Some(version.name).filter(|name| !name.is_empty()),
            version_description: version.description,
            nodes: serde_json::to_value(&graph.nodes).unwrap_or(Value::Null),
            edges: serde_json::to_value(&graph.edges).unwrap_or(Value::Null),
            position: json!(graph.position),
            zoom: graph.zoom,
            created_at: None,
            updated_at: None,
        };
        let record = attempted_record(&request);

        match self.registry.create(request).await {
            Ok(model) => {
                info!(
                    "Pipeline '{}' uploaded and registered as {}",
                    model.pipeline_name, model.pipeline_id
                );
                Ok(model)
            }
            Err(err) => {
                warn!("Registering uploaded pipeline {} failed: {}", uploaded.id, err);
                Err(PipelineError::with_record(err, record).into())
            }
        }
    }
}

fn attempted_record(request: &PipelineCreateRequest) -> Value {
    json!({
        "pipeline_id": request.pipeline_id,
        "pipeline_name": request.pipeline_name,
        "pipeline_description": request.pipeline_description,
        "version_info": {
            "name": request.version_name,
            "description": request.version_description,
        },
        "nodes": request.nodes,
        "edges": request.edges,
        "position": request.position,
        "zoom": request.zoom,
    })
}
