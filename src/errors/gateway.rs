//! Request-boundary error
//!
//! [`GatewayError`] is the only error type handlers return. It is rendered
//! into the standard envelope here and nowhere else; the HTTP status of the
//! response is always 200, the failure is carried in the envelope `code`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{error, warn};

use super::{PipelineError, UpstreamApiError, WorkflowError};
use crate::common::envelope::{
    compose_code, ApiResponse, PIPELINE_MODULE_CODE, SERVICE_CODE, WORKFLOW_MODULE_CODE,
};

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    #[error(transparent)]
    Upstream(#[from] UpstreamApiError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// Body could not be read or deserialized
    #[error("Invalid Request: {0}")]
    InvalidRequest(String),
}

impl GatewayError {
    pub fn to_response(&self) -> ApiResponse {
        match self {
            GatewayError::Workflow(err) => workflow_response(err),
            GatewayError::Upstream(err) => {
                ApiResponse::new(err.code(), err.reason.clone(), err.message.clone())
            }
            GatewayError::Pipeline(err) => pipeline_response(err),
            GatewayError::InvalidRequest(_) => ApiResponse::new(
                compose_code(SERVICE_CODE, 422),
                self.to_string(),
                json!({ "body": Value::Null }),
            ),
        }
    }
}

fn workflow_response(err: &WorkflowError) -> ApiResponse {
    let code = compose_code(WORKFLOW_MODULE_CODE, err.status_code());
    match err {
        WorkflowError::InvalidName(name) => ApiResponse::new(
            code,
            "Only alphabetic characters, numbers, and underscores are allowed in the name.",
            json!({ "current_name": name }),
        ),
        WorkflowError::InvalidGraph(reason) => {
            ApiResponse::new(code, err.to_string(), json!({ "reason": reason }))
        }
        WorkflowError::TemplateRender { template, reason } => {
            ApiResponse::new(code, reason.clone(), json!([template, reason]))
        }
        WorkflowError::Compile {
            artifact,
            exit_code,
            stderr,
        } => ApiResponse::new(
            code,
            err.to_string(),
            json!({
                "artifact_path": artifact.display().to_string(),
                "exit_code": exit_code,
                "stderr": stderr,
            }),
        ),
        WorkflowError::CompileTimeout { artifact, .. } => ApiResponse::new(
            code,
            err.to_string(),
            json!({
                "artifact_path": artifact.display().to_string(),
                "exit_code": Value::Null,
                "stderr": "",
            }),
        ),
        WorkflowError::Io(_) => ApiResponse::new(code, err.to_string(), Value::Null),
    }
}

fn pipeline_response(err: &PipelineError) -> ApiResponse {
    let code = compose_code(PIPELINE_MODULE_CODE, err.status_code());
    match err {
        PipelineError::AlreadyExists(id) => ApiResponse::new(
            code,
            "Pipeline already exists",
            json!({ "current_pipeline": id }),
        ),
        PipelineError::CreateFailed { record, .. } => ApiResponse::new(
            code,
            err.to_string(),
            json!({ "current_pipeline": record }),
        ),
        PipelineError::Validation(message) => {
            ApiResponse::new(code, message.clone(), Value::Null)
        }
        PipelineError::Database(_) => ApiResponse::new(code, err.to_string(), Value::Null),
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let response = self.to_response();
        if response.code % 1000 >= 500 {
            error!(code = response.code, "Request failed: {}", self);
        } else {
            warn!(code = response.code, "Request rejected: {}", self);
        }

        (StatusCode::OK, Json(response)).into_response()
    }
}
