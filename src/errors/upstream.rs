//! Failures reported by external systems
//!
//! Every call into an external collaborator (the Kubeflow Pipelines API in
//! this crate) converts its failure into an [`UpstreamApiError`] at the
//! client boundary. The envelope code is `{module_code}{status}`.

use serde_json::Value;
use thiserror::Error;

use crate::common::envelope::compose_code;

#[derive(Error, Debug, Clone)]
#[error("Upstream call failed with status {status}: {reason}")]
pub struct UpstreamApiError {
    /// Module code of the collaborator that failed (e.g. 101 for Kubeflow Pipelines)
    pub module_code: u16,
    /// HTTP status reported by the collaborator
    pub status: u16,
    /// Status reason phrase
    pub reason: String,
    /// The `message` field of the upstream error body
    pub message: Value,
}

impl UpstreamApiError {
    pub fn new(
        module_code: u16,
        status: u16,
        reason: impl Into<String>,
        message: impl Into<Value>,
    ) -> Self {
        Self {
            module_code,
            status,
            reason: reason.into(),
            message: message.into(),
        }
    }

    /// Build from an upstream status and raw body.
    ///
    /// The body's `message` field is used when the body is a JSON object,
    /// otherwise the raw text is kept.
    pub fn from_body(module_code: u16, status: u16, reason: impl Into<String>, body: &str) -> Self {
        let message = match serde_json::from_str::<Value>(body) {
            Ok(Value::Object(map)) => map
                .get("message")
                .cloned()
                .unwrap_or(Value::Object(map)),
            _ => Value::String(body.to_string()),
        };

        Self::new(module_code, status, reason, message)
    }

    /// Envelope code: module code concatenated with the upstream status
    pub fn code(&self) -> i64 {
        compose_code(self.module_code, self.status)
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }
}
