//! HTTP client for the Kubeflow Pipelines v1beta1 API

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use super::{PipelinePackage, PipelineUploader, UploadedPipeline};
use crate::common::envelope::KFP_MODULE_CODE;
use crate::config::KubeflowConfig;
use crate::errors::UpstreamApiError;

const UPLOAD_PATH: &str = "/apis/v1beta1/pipelines/upload";

fn transport_error(err: impl std::fmt::Display) -> UpstreamApiError {
    let status = StatusCode::SERVICE_UNAVAILABLE;
    UpstreamApiError::new(
        KFP_MODULE_CODE,
        status.as_u16(),
        status.canonical_reason().unwrap_or("Service Unavailable"),
        err.to_string(),
    )
}

#[derive(Debug, Clone)]
pub struct KfpClient {
    /// Base URL of the pipelines API (e.g. "http://ml-pipeline.kubeflow:8888")
    base_url: String,
    token: Option<String>,
    client: Client,
}

impl KfpClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
            client,
        }
    }

    /// Build from configuration, applying the request timeout and bearer token
    pub fn from_config(config: &KubeflowConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        let mut kfp = Self::with_client(&config.pipelines_endpoint, client);
        kfp.token = config.token.clone();
        Ok(kfp)
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, UpstreamApiError> {
        let status = response.status();

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(UpstreamApiError::from_body(
                KFP_MODULE_CODE,
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown"),
                &body,
            ));
        }

        response.json().await.map_err(|e| {
            let status = StatusCode::BAD_GATEWAY;
            UpstreamApiError::new(
                KFP_MODULE_CODE,
                status.as_u16(),
                status.canonical_reason().unwrap_or("Bad Gateway"),
                format!("Failed to parse JSON response: {}", e),
            )
        })
    }
}

#[async_trait]
impl PipelineUploader for KfpClient {
    async fn upload_pipeline(
        &self,
        package: &PipelinePackage,
    ) -> Result<UploadedPipeline, UpstreamApiError> {
        let bytes = tokio::fs::read(&package.pipeline_package_path)
            .await
            .map_err(|e| {
                UpstreamApiError::new(
                    KFP_MODULE_CODE,
                    500,
                    "Internal Server Error",
                    format!(
                        "Cannot read {}: {}",
                        package.pipeline_package_path.display(),
                        e
                    ),
                )
            })?;
        let file_name = package
            .pipeline_package_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("{}.yaml", package.pipeline_name));
        debug!(
            "Uploading {} ({} bytes) to {}",
            file_name,
            bytes.len(),
            self.base_url
        );

        let form = Form::new().part("uploadfile", Part::bytes(bytes).file_name(file_name));
        let mut request = self
            .client
            .post(format!("{}{}", self.base_url, UPLOAD_PATH))
            .query(&[
                ("name", package.pipeline_name.as_str()),
                ("description", package.description.as_deref().unwrap_or_default()),
            ])
            .multipart(form);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(transport_error)?;
        let uploaded: UploadedPipeline = self.handle_response(response).await?;
        info!("Uploaded pipeline '{}' as {}", uploaded.name, uploaded.id);
        Ok(uploaded)
    }
}
