use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    http::{HeaderValue, Uri},
    response::Json,
    routing::{get, post},
    Router,
};
use sea_orm::DatabaseConnection;
use serde_json::Value;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use super::handlers::{health, pipelines, workflow};
use super::middleware::logging_layer;
use crate::common::envelope::{compose_code, ApiResponse, SERVICE_CODE};
use crate::config::{AppConfig, WorkflowConfig};
use crate::kfp::{PipelinePackage, PipelineUploader};
use crate::services::{
    GeneratedDag, GeneratedPipeline, PipelineService, WorkflowGeneratorService,
    WorkflowPipelineService,
};
use crate::workflow::{
    graph::{EdgeData, NodeAttributes, NodeData, NodePosition, NodeToolbar},
    DagDate, DagDefinition, GraphEdge, GraphNode, PipelineGraph, PipelineParameter,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        health::root,
        health::health_check,
        health::info,
        workflow::make_kfp_pipeline,
        workflow::make_airflow_dag,
        workflow::make_pipeline,
        pipelines::create_pipeline,
        pipelines::list_pipelines,
        pipelines::get_pipeline,
    ),
    components(schemas(
        ApiResponse,
        health::ServiceInfo,
        PipelineGraph,
        GraphNode,
        GraphEdge,
        NodePosition,
        NodeToolbar,
        NodeAttributes,
        NodeData,
        EdgeData,
        PipelineParameter,
        DagDefinition,
        DagDate,
        workflow::AirflowRequest,
        GeneratedPipeline,
        GeneratedDag,
        PipelinePackage,
        pipelines::CreatePipelineRequest,
        pipelines::PipelineIdentity,
        pipelines::PipelineVersion,
        pipelines::PipelineRecord,
    )),
    tags(
        (name = "workflow", description = "Pipeline definition generation"),
        (name = "pipeline", description = "Pipeline registry"),
        (name = "service", description = "Service status"),
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub generator: WorkflowGeneratorService,
    pub pipelines: PipelineService,
    pub workflow_pipelines: WorkflowPipelineService,
}

impl AppState {
    pub fn new(
        db: DatabaseConnection,
        workflow: &WorkflowConfig,
        uploader: Arc<dyn PipelineUploader>,
    ) -> Result<Self> {
        let generator = WorkflowGeneratorService::from_config(workflow)
            .context("Failed to load pipeline templates")?;
        let pipelines = PipelineService::new(db);
        let workflow_pipelines =
            WorkflowPipelineService::new(generator.clone(), uploader, pipelines.clone());

        Ok(Self {
            generator,
            pipelines,
            workflow_pipelines,
        })
    }
}

pub async fn create_app(
    db: DatabaseConnection,
    config: AppConfig,
    uploader: Arc<dyn PipelineUploader>,
) -> Result<Router> {
    let cors = match config.server.cors_origin.as_deref() {
        Some(origin) => CorsLayer::new()
            .allow_origin(
                origin
                    .parse::<HeaderValue>()
                    .with_context(|| format!("Invalid CORS origin '{}'", origin))?,
            )
            .allow_methods(Any)
            .allow_headers(Any),
        None => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    };

    let state = AppState::new(db, &config.workflow, uploader)?;

    let app = Router::new()
        .route("/", get(health::root))
        .route("/health", get(health::health_check))
        .route("/info", get(health::info))
        .nest("/workflow", workflow_routes())
        .route(
            "/pipeline",
            get(pipelines::list_pipelines).post(pipelines::create_pipeline),
        )
        .route("/pipeline/:pipeline_id", get(pipelines::get_pipeline))
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .fallback(not_found)
        .layer(ServiceBuilder::new().layer(logging_layer()).layer(cors))
        .with_state(state);

    Ok(app)
}

fn workflow_routes() -> Router<AppState> {
    Router::new()
        .route("/kfp", post(workflow::make_kfp_pipeline))
        .route("/airflow", post(workflow::make_airflow_dag))
        .route("/pipeline", post(workflow::make_pipeline))
}

async fn not_found(uri: Uri) -> Json<ApiResponse> {
    warn!("No route for {}", uri);
    Json(ApiResponse::new(
        compose_code(SERVICE_CODE, 404),
        "Not Found",
        Value::String(uri.path().to_string()),
    ))
}
