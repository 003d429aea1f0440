use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use serde_json::Value;
use tracing::{debug, info};

use crate::database::entities::pipelines;
use crate::errors::{PipelineError, PipelineResult};

pub const DEFAULT_PAGE_SIZE: u64 = 100;
pub const MAX_PAGE_SIZE: u64 = 1000;
/// Largest offset the store can bind
pub const MAX_SKIP: u64 = i64::MAX as u64;

/// Pipeline to be stored in the registry
#[derive(Clone, Debug)]
pub struct PipelineCreateRequest {
    pub pipeline_id: String,
    pub pipeline_name: String,
    pub pipeline_description: Option<String>,
    pub version_name: Option<String>,
    pub version_description: Option<String>,
    pub nodes: Value,
    pub edges: Value,
    pub position: Value,
    pub zoom: i32,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Registry of pipelines uploaded to Kubeflow Pipelines.
///
/// Records are created once and never updated or deleted through this service.
#[derive(Clone)]
pub struct PipelineService {
    db: DatabaseConnection,
}

impl PipelineService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn validate(request: &PipelineCreateRequest) -> PipelineResult<()> {
        if request.pipeline_id.trim().is_empty() {
            return Err(PipelineError::Validation(
                "pipeline_id cannot be empty".to_string(),
            ));
        }
        if request.pipeline_name.trim().is_empty() {
            return Err(PipelineError::Validation(
                "pipeline_name cannot be empty".to_string(),
            ));
        }
        for (field, value) in [("nodes", &request.nodes), ("edges", &request.edges)] {
            if !value.is_array() {
                return Err(PipelineError::Validation(format!(
                    "{} must be a JSON array",
                    field
                )));
            }
        }
        Ok(())
    }

    /// Store a new pipeline.
    ///
    /// The existence check only gives an early answer; the primary key is
    /// what rejects a concurrent duplicate.
    pub async fn create(&self, request: PipelineCreateRequest) -> PipelineResult<pipelines::Model> {
        Self::validate(&request)?;

        if self.get_by_id(&request.pipeline_id).await?.is_some() {
            return Err(PipelineError::AlreadyExists(request.pipeline_id));
        }

        let now = Utc::now();
        let created_at = request.created_at.unwrap_or(now);
        let pipeline = pipelines::ActiveModel {
            pipeline_id: Set(request.pipeline_id.clone()),
            pipeline_name: Set(request.pipeline_name),
            pipeline_description: Set(request.pipeline_description),
            version_name: Set(request.version_name),
            version_description: Set(request.version_description),
            nodes: Set(request.nodes),
            edges: Set(request.edges),
            position: Set(request.position),
            zoom: Set(request.zoom),
            created_at: Set(created_at),
            updated_at: Set(request.updated_at.unwrap_or(created_at)),
        };

        let model = pipeline
            .insert(&self.db)
            .await
            .map_err(|e| PipelineError::from_insert_error(&request.pipeline_id, e))?;

        info!(
            "Registered pipeline {} ('{}')",
            model.pipeline_id, model.pipeline_name
        );
        Ok(model)
    }

    pub async fn get_by_id(&self, pipeline_id: &str) -> PipelineResult<Option<pipelines::Model>> {
        let pipeline = pipelines::Entity::find_by_id(pipeline_id.to_string())
            .one(&self.db)
            .await?;

        Ok(pipeline)
    }

    /// Page through stored pipelines, oldest first.
    ///
    /// A blank `pipeline_name` means no filter. `limit` is capped at
    /// [`MAX_PAGE_SIZE`]; `skip` above [`MAX_SKIP`] is rejected.
    pub async fn list(
        &self,
        pipeline_name: Option<&str>,
        skip: u64,
        limit: u64,
    ) -> PipelineResult<Vec<pipelines::Model>> {
        if skip > MAX_SKIP {
            return Err(PipelineError::Validation(format!(
                "skip must not exceed {}",
                MAX_SKIP
            )));
        }
        let limit = limit.min(MAX_PAGE_SIZE);

        let mut query = pipelines::Entity::find();
        if let Some(name) = pipeline_name.filter(|name| !name.trim().is_empty()) {
            query = query.filter(pipelines::Column::PipelineName.eq(name));
        }

        let pipelines = query
            .order_by_asc(pipelines::Column::CreatedAt)
            .order_by_asc(pipelines::Column::PipelineId)
            .offset(skip)
            .limit(limit)
            .all(&self.db)
            .await?;

        debug!(
            "Listed {} pipelines (name={:?}, skip={}, limit={})",
            pipelines.len(),
            pipeline_name,
            skip,
            limit
        );
        Ok(pipelines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{establish_connection, get_database_url, setup_database, MEMORY_DATABASE};
    use serde_json::json;

    async fn service() -> PipelineService {
        let db = establish_connection(&get_database_url(Some(MEMORY_DATABASE)))
            .await
            .unwrap();
        setup_database(&db).await.unwrap();
        PipelineService::new(db)
    }

    fn request(id: &str, name: &str) -> PipelineCreateRequest {
        PipelineCreateRequest {
            pipeline_id: id.to_string(),
            pipeline_name: name.to_string(),
            pipeline_description: None,
            version_name: None,
            version_description: None,
            nodes: json!([{"id": "n1"}]),
            edges: json!([]),
            position: json!([0, 0]),
            zoom: 1,
            created_at: None,
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_create_sets_timestamps() {
        let service = service().await;
        let model = service.create(request("p1", "iris")).await.unwrap();
        assert_eq!(model.created_at, model.updated_at);
        assert_eq!(model.nodes, json!([{"id": "n1"}]));
    }

    #[tokio::test]
    async fn test_create_rejects_blank_name() {
        let service = service().await;
        let err = service.create(request("p1", "  ")).await.unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)));
    }

    #[tokio::test]
    async fn test_create_rejects_non_array_nodes() {
        let service = service().await;
        let mut req = request("p1", "iris");
        req.nodes = json!({"id": "n1"});
        let err = service.create(req).await.unwrap_err();
        assert!(matches!(err, PipelineError::Validation(msg) if msg.contains("nodes")));
    }

    #[tokio::test]
    async fn test_duplicate_id_already_exists() {
        let service = service().await;
        service.create(request("p1", "iris")).await.unwrap();
        let err = service.create(request("p1", "other")).await.unwrap_err();
        assert!(matches!(err, PipelineError::AlreadyExists(id) if id == "p1"));
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let service = service().await;
        assert!(service.get_by_id("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_bounds_paging_values() {
        let service = service().await;
        service.create(request("p1", "iris")).await.unwrap();

        let err = service.list(None, u64::MAX, 1).await.unwrap_err();
        assert!(matches!(err, PipelineError::Validation(msg) if msg.contains("skip")));

        let page = service.list(None, 0, u64::MAX).await.unwrap();
        assert_eq!(page.len(), 1);

        let past_end = service.list(None, MAX_SKIP, 10).await.unwrap();
        assert!(past_end.is_empty());
    }
}
