use axum::{extract::State, response::Json};
use serde::Deserialize;
use utoipa::ToSchema;

use super::pipelines::PipelineRecord;
use crate::common::envelope::{ApiResponse, PIPELINE_MODULE_CODE, WORKFLOW_MODULE_CODE};
use crate::errors::GatewayResult;
use crate::server::app::AppState;
use crate::server::middleware::{Validate, ValidatedJson, ValidationError};
use crate::workflow::{DagDefinition, PipelineGraph};

const MAX_NAME_LENGTH: usize = 100;

impl Validate for PipelineGraph {
    fn validate(&self) -> Result<(), ValidationError> {
        if let Some(name) = &self.pipeline_name {
            if name.len() > MAX_NAME_LENGTH {
                return Err(ValidationError::field(
                    "pipeline_name",
                    format!("Pipeline name too long (max {} chars)", MAX_NAME_LENGTH),
                ));
            }
        }
        if self.position.len() != 2 {
            return Err(ValidationError::field(
                "position",
                "Canvas position must be [x, y]",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AirflowRequest {
    pub dag_info: DagDefinition,
    pub pipeline_info: PipelineGraph,
}

impl Validate for AirflowRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.dag_info.dag_id.trim().is_empty() {
            return Err(ValidationError::field("dag_info.dag_id", "DAG id cannot be empty"));
        }
        if self.dag_info.dag_id.len() > MAX_NAME_LENGTH {
            return Err(ValidationError::field(
                "dag_info.dag_id",
                format!("DAG id too long (max {} chars)", MAX_NAME_LENGTH),
            ));
        }
        self.pipeline_info.validate()
    }
}

#[utoipa::path(
    post,
    path = "/workflow/kfp",
    tag = "workflow",
    request_body = PipelineGraph,
    responses((status = 200, description = "Envelope with the graph (resolved name) and compiled package path", body = ApiResponse))
)]
pub async fn make_kfp_pipeline(
    State(state): State<AppState>,
    ValidatedJson(graph): ValidatedJson<PipelineGraph>,
) -> GatewayResult<Json<ApiResponse>> {
    let generated = state.generator.make_kfp_pipeline(graph).await?;
    Ok(Json(ApiResponse::from_result(WORKFLOW_MODULE_CODE, generated)))
}

#[utoipa::path(
    post,
    path = "/workflow/airflow",
    tag = "workflow",
    request_body = AirflowRequest,
    responses((status = 200, description = "Envelope with the DAG definition and written file path", body = ApiResponse))
)]
pub async fn make_airflow_dag(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<AirflowRequest>,
) -> GatewayResult<Json<ApiResponse>> {
    let generated = state
        .generator
        .make_airflow_dag(request.dag_info, request.pipeline_info)
        .await?;
    Ok(Json(ApiResponse::from_result(WORKFLOW_MODULE_CODE, generated)))
}

/// Generate, upload to Kubeflow Pipelines, and register in one call
#[utoipa::path(
    post,
    path = "/workflow/pipeline",
    tag = "workflow",
    request_body = PipelineGraph,
    responses((status = 200, description = "Envelope with the stored PipelineRecord", body = ApiResponse))
)]
pub async fn make_pipeline(
    State(state): State<AppState>,
    ValidatedJson(graph): ValidatedJson<PipelineGraph>,
) -> GatewayResult<Json<ApiResponse>> {
    let model = state.workflow_pipelines.make_pipeline(graph).await?;
    Ok(Json(ApiResponse::from_result(
        PIPELINE_MODULE_CODE,
        PipelineRecord::from(model),
    )))
}
