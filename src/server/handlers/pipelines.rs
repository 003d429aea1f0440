use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::common::envelope::{ApiResponse, PIPELINE_MODULE_CODE};
use crate::database::entities::pipelines;
use crate::errors::{GatewayError, GatewayResult};
use crate::server::app::AppState;
use crate::server::middleware::{Validate, ValidatedJson, ValidationError};
use crate::services::pipeline_service::{PipelineCreateRequest, DEFAULT_PAGE_SIZE, MAX_SKIP};

/// Where the stored pipeline id comes from
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "id_source", rename_all = "snake_case")]
pub enum PipelineIdentity {
    /// The server assigns a new UUID
    #[default]
    Generated,
    /// Echo an id already assigned by Kubeflow Pipelines
    Upstream { pipeline_id: String },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PipelineVersion {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePipelineRequest {
    #[serde(default)]
    pub identity: PipelineIdentity,
    pub pipeline_name: String,
    #[serde(default)]
    pub pipeline_description: Option<String>,
    #[serde(default)]
    pub version_info: Option<PipelineVersion>,
    #[schema(value_type = Vec<Object>)]
    pub nodes: Value,
    #[schema(value_type = Vec<Object>)]
    pub edges: Value,
    #[schema(value_type = Vec<f64>)]
    pub position: Value,
    pub zoom: i32,
}

impl Validate for CreatePipelineRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.pipeline_name.trim().is_empty() {
            return Err(ValidationError::field("pipeline_name", "Pipeline name cannot be empty"));
        }
        if self.pipeline_name.chars().any(|c| c.is_control()) {
            return Err(ValidationError::field(
                "pipeline_name",
                "Pipeline name cannot contain control characters",
            ));
        }
        if let PipelineIdentity::Upstream { pipeline_id } = &self.identity {
            if pipeline_id.trim().is_empty() {
                return Err(ValidationError::field(
                    "identity.pipeline_id",
                    "Upstream pipeline id cannot be empty",
                ));
            }
        }
        for (field, value) in [("nodes", &self.nodes), ("edges", &self.edges)] {
            if !value.is_array() {
                return Err(ValidationError::field(field, "must be a JSON array"));
            }
        }
        Ok(())
    }
}

impl CreatePipelineRequest {
    pub fn into_create_request(self) -> PipelineCreateRequest {
        let pipeline_id = match self.identity {
            PipelineIdentity::Generated => Uuid::new_v4().to_string(),
            PipelineIdentity::Upstream { pipeline_id } => pipeline_id,
        };
        let version = self.version_info.unwrap_or_default();

        PipelineCreateRequest {
            pipeline_id,
            pipeline_name: self.pipeline_name,
            pipeline_description: self.pipeline_description,
            version_name: version.name,
            version_description: version.description,
            nodes: self.nodes,
            edges: self.edges,
            position: self.position,
            zoom: self.zoom,
            created_at: None,
            updated_at: None,
        }
    }
}

/// Stored pipeline as returned by the registry endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PipelineRecord {
    pub pipeline_id: String,
    pub pipeline_name: String,
    pub pipeline_description: Option<String>,
    pub version_info: PipelineVersion,
    #[schema(value_type = Vec<Object>)]
    pub nodes: Value,
    #[schema(value_type = Vec<Object>)]
    pub edges: Value,
    #[schema(value_type = Vec<f64>)]
    pub position: Value,
    pub zoom: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<pipelines::Model> for PipelineRecord {
    fn from(model: pipelines::Model) -> Self {
        Self {
            pipeline_id: model.pipeline_id,
            pipeline_name: model.pipeline_name,
            pipeline_description: model.pipeline_description,
            version_info: PipelineVersion {
                id: None,
                name: model.version_name,
                description: model.version_description,
            },
            nodes: model.nodes,
            edges: model.edges,
            position: model.position,
            zoom: model.zoom,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListPipelinesQuery {
    /// Exact name to filter on; blank means no filter
    pub pipeline_name: Option<String>,
    pub skip: Option<u64>,
    /// Page size, capped at 1000
    pub limit: Option<u64>,
}

impl Validate for ListPipelinesQuery {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.skip.is_some_and(|skip| skip > MAX_SKIP) {
            return Err(ValidationError::field(
                "skip",
                format!("must not exceed {}", MAX_SKIP),
            ));
        }
        Ok(())
    }
}

#[utoipa::path(
    post,
    path = "/pipeline",
    tag = "pipeline",
    request_body = CreatePipelineRequest,
    responses((status = 200, description = "Envelope with the stored PipelineRecord", body = ApiResponse))
)]
pub async fn create_pipeline(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreatePipelineRequest>,
) -> GatewayResult<Json<ApiResponse>> {
    let model = state
        .pipelines
        .create(payload.into_create_request())
        .await?;

    Ok(Json(ApiResponse::from_result(
        PIPELINE_MODULE_CODE,
        PipelineRecord::from(model),
    )))
}

#[utoipa::path(
    get,
    path = "/pipeline",
    tag = "pipeline",
    params(ListPipelinesQuery),
    responses((status = 200, description = "Envelope with a page of PipelineRecords", body = ApiResponse))
)]
pub async fn list_pipelines(
    State(state): State<AppState>,
    query: Result<Query<ListPipelinesQuery>, QueryRejection>,
) -> GatewayResult<Json<ApiResponse>> {
    let Query(query) = query.map_err(|e| GatewayError::InvalidRequest(e.body_text()))?;
    query.validate()?;

    let records: Vec<PipelineRecord> = state
        .pipelines
        .list(
            query.pipeline_name.as_deref(),
            query.skip.unwrap_or(0),
            query.limit.unwrap_or(DEFAULT_PAGE_SIZE),
        )
        .await?
        .into_iter()
        .map(PipelineRecord::from)
        .collect();

    Ok(Json(ApiResponse::from_result(PIPELINE_MODULE_CODE, records)))
}

#[utoipa::path(
    get,
    path = "/pipeline/{pipeline_id}",
    tag = "pipeline",
    params(("pipeline_id" = String, Path, description = "Pipeline id")),
    responses((status = 200, description = "Envelope with the PipelineRecord, or null when absent", body = ApiResponse))
)]
pub async fn get_pipeline(
    State(state): State<AppState>,
    Path(pipeline_id): Path<String>,
) -> GatewayResult<Json<ApiResponse>> {
    let record = state
        .pipelines
        .get_by_id(&pipeline_id)
        .await?
        .map(PipelineRecord::from);

    Ok(Json(ApiResponse::from_result(PIPELINE_MODULE_CODE, record)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(identity: Value) -> Value {
        json!({
            "identity": identity,
            "pipeline_name": "iris",
            "nodes": [],
            "edges": [],
            "position": [0, 0],
            "zoom": 1
        })
    }

    #[test]
    fn test_identity_defaults_to_generated() {
        let mut value = body(Value::Null);
        value.as_object_mut().unwrap().remove("identity");
        let request: CreatePipelineRequest = serde_json::from_value(value).unwrap();
        assert_eq!(request.identity, PipelineIdentity::Generated);

        let create = request.into_create_request();
        assert!(Uuid::parse_str(&create.pipeline_id).is_ok());
    }

    #[test]
    fn test_upstream_identity_is_kept() {
        let request: CreatePipelineRequest = serde_json::from_value(body(
            json!({"id_source": "upstream", "pipeline_id": "kfp-42"}),
        ))
        .unwrap();
        assert!(request.validate().is_ok());
        assert_eq!(request.into_create_request().pipeline_id, "kfp-42");
    }

    #[test]
    fn test_upstream_identity_requires_id() {
        let missing = serde_json::from_value::<CreatePipelineRequest>(body(
            json!({"id_source": "upstream"}),
        ));
        assert!(missing.is_err());

        let blank: CreatePipelineRequest = serde_json::from_value(body(
            json!({"id_source": "upstream", "pipeline_id": " "}),
        ))
        .unwrap();
        assert!(blank.validate().is_err());
    }

    #[test]
    fn test_record_reconstructs_version_info() {
        let now = Utc::now();
        let record = PipelineRecord::from(pipelines::Model {
            pipeline_id: "p1".to_string(),
            pipeline_name: "iris".to_string(),
            pipeline_description: None,
            version_name: Some("v1".to_string()),
            version_description: Some("first".to_string()),
            nodes: json!([]),
            edges: json!([]),
            position: json!([0, 0]),
            zoom: 1,
            created_at: now,
            updated_at: now,
        });
        let value = serde_json::to_value(record).unwrap();
        assert_eq!(value["version_info"], json!({"name": "v1", "description": "first"}));
    }

    #[test]
    fn test_list_query_rejects_unbindable_skip() {
        let query = ListPipelinesQuery {
            pipeline_name: None,
            skip: Some(u64::MAX),
            limit: None,
        };
        let err = query.validate().unwrap_err();
        assert_eq!(err.field.as_deref(), Some("skip"));

        let query = ListPipelinesQuery {
            pipeline_name: None,
            skip: Some(MAX_SKIP),
            limit: Some(u64::MAX),
        };
        assert!(query.validate().is_ok());
    }
}
