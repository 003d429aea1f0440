use axum::response::Json;
use serde::Serialize;
use serde_json::{json, Value};
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct ServiceInfo {
    pub title: String,
    pub description: String,
    pub version: String,
}

fn service_info() -> ServiceInfo {
    ServiceInfo {
        title: "Workflow Gateway".to_string(),
        description: env!("CARGO_PKG_DESCRIPTION").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }
}

#[utoipa::path(
    get,
    path = "/",
    tag = "service",
    responses((status = 200, description = "Service title, description and version", body = ServiceInfo))
)]
pub async fn root() -> Json<ServiceInfo> {
    Json(service_info())
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "service",
    responses((status = 200, description = "Service is up"))
)]
pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "UP" }))
}

#[utoipa::path(
    get,
    path = "/info",
    tag = "service",
    responses((status = 200, description = "Build information"))
)]
pub async fn info() -> Json<Value> {
    Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "description": env!("CARGO_PKG_DESCRIPTION"),
    }))
}
