//! Application configuration
//!
//! `application.yaml` maps profile names (`local`, `dev`, `prod`, ...) to a
//! full configuration. The profile comes from `--profile` or `APP_ENV`.
//! Every field has a default, so a missing file or a partial profile is fine.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::workflow::EnvVarSpec;

pub const DEFAULT_CONFIG_FILE: &str = "application.yaml";
pub const DEFAULT_PROFILE: &str = "local";

const MINIO_ENDPOINT: &str = "http://minio-service.kubeflow.svc.cluster.local:9000";
const MLFLOW_TRACKING_URI: &str = "http://mlflow-server-service.mlflow-system.svc.cluster.local:5000";
const MINIO_CREDENTIALS_SECRET: &str = "minio30creds";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub workflow: WorkflowConfig,
    pub kubeflow: KubeflowConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origin: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origin: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite file, or `:memory:`
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "workflow-gateway.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Root of the per-request working directories
    pub output_dir: PathBuf,
    pub interpreter: String,
    pub interpreter_args: Vec<String>,
    /// `null` lets the compiler run without a bound
    pub compile_timeout_secs: Option<u64>,
    /// Directory holding `kfp_template.hbs` / `airflow_template.hbs` overrides
    pub template_dir: Option<PathBuf>,
    /// Environment injected into every generated step
    pub env_variables: BTreeMap<String, EnvVarSpec>,
}

impl WorkflowConfig {
    pub fn compile_timeout(&self) -> Option<Duration> {
        self.compile_timeout_secs.map(Duration::from_secs)
    }
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            interpreter: "python3".to_string(),
            interpreter_args: Vec::new(),
            compile_timeout_secs: Some(300),
            template_dir: None,
            env_variables: default_env_variables(),
        }
    }
}

fn secret_key_ref(key: &str) -> EnvVarSpec {
    EnvVarSpec::value_from(format!(
        "client.V1EnvVarSource(secret_key_ref=client.V1SecretKeySelector(name='{}', key='{}'))",
        MINIO_CREDENTIALS_SECRET, key
    ))
}

/// MinIO and MLflow settings every generated training step needs
pub fn default_env_variables() -> BTreeMap<String, EnvVarSpec> {
    let mut env = BTreeMap::new();
    env.insert("AWS_ENDPOINT_URL".to_string(), EnvVarSpec::value(MINIO_ENDPOINT));
    env.insert("MLFLOW_S3_ENDPOINT_URL".to_string(), EnvVarSpec::value(MINIO_ENDPOINT));
    env.insert("MLFLOW_TRACKING_URI".to_string(), EnvVarSpec::value(MLFLOW_TRACKING_URI));
    env.insert("EXPERIMENT_NAME".to_string(), EnvVarSpec::value("yswhan-dtc-sample"));
    env.insert("MODEL_NAME".to_string(), EnvVarSpec::value("yswhan-dtc-sample"));
    env.insert("MLFLOW_BUCKET_NAME".to_string(), EnvVarSpec::value("mlflow"));
    env.insert("AWS_ACCESS_KEY_ID".to_string(), secret_key_ref("AWS_ACCESS_KEY_ID"));
    env.insert("AWS_SECRET_ACCESS_KEY".to_string(), secret_key_ref("AWS_SECRET_ACCESS_KEY"));
    env
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KubeflowConfig {
    pub pipelines_endpoint: String,
    pub namespace: String,
    pub token: Option<String>,
    pub request_timeout_secs: u64,
}

impl Default for KubeflowConfig {
    fn default() -> Self {
        Self {
            pipelines_endpoint: "http://ml-pipeline.kubeflow.svc.cluster.local:8888".to_string(),
            namespace: "kubeflow".to_string(),
            token: None,
            request_timeout_secs: 30,
        }
    }
}

impl AppConfig {
    /// Parse the profile named `profile` out of a multi-profile YAML document
    pub fn from_yaml(yaml: &str, profile: &str) -> anyhow::Result<Self> {
        let mut profiles: BTreeMap<String, AppConfig> =
            serde_yaml::from_str(yaml).context("Failed to parse configuration")?;
        match profiles.remove(profile) {
            Some(config) => Ok(config),
            None => {
                warn!(
                    "Profile '{}' not found (available: {}), using defaults",
                    profile,
                    profiles.keys().cloned().collect::<Vec<_>>().join(", ")
                );
                Ok(Self::default())
            }
        }
    }

    /// Load `path`; a missing file yields the built-in defaults
    pub fn load(path: &Path, profile: &str) -> anyhow::Result<Self> {
        if !path.exists() {
            info!("No configuration at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let yaml = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config = Self::from_yaml(&yaml, profile)
            .with_context(|| format!("Invalid configuration in {}", path.display()))?;
        info!("Loaded profile '{}' from {}", profile, path.display());
        Ok(config)
    }
}
