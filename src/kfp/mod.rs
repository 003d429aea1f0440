//! Kubeflow Pipelines collaborator
//!
//! The gateway only needs one KFP operation: uploading a compiled pipeline
//! package. It is exposed as the [`PipelineUploader`] trait so the HTTP layer
//! can be exercised with a stub.

pub mod client;

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::errors::UpstreamApiError;

pub use client::KfpClient;

/// Compiled pipeline ready for upload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PipelinePackage {
    pub pipeline_name: String,
    #[schema(value_type = String)]
    pub pipeline_package_path: PathBuf,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineVersionInfo {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Pipeline as registered by Kubeflow Pipelines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadedPipeline {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub default_version: Option<PipelineVersionInfo>,
}

#[async_trait]
pub trait PipelineUploader: Send + Sync {
    async fn upload_pipeline(
        &self,
        package: &PipelinePackage,
    ) -> Result<UploadedPipeline, UpstreamApiError>;
}
