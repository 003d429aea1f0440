//! The `{code, message, result}` response envelope shared by every endpoint.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// Request-level failures (malformed bodies, unknown routes)
pub const SERVICE_CODE: u16 = 100;
/// Kubeflow Pipelines upload collaborator
pub const KFP_MODULE_CODE: u16 = 101;
/// Workflow generator (renderer + compiler)
pub const WORKFLOW_MODULE_CODE: u16 = 106;
/// Pipeline registry
pub const PIPELINE_MODULE_CODE: u16 = 107;

pub const SUCCESS_MESSAGE: &str = "API response success";

/// Concatenate a module code and an HTTP status into an envelope code.
///
/// `compose_code(106, 400) == 106400`
pub fn compose_code(module_code: u16, status: u16) -> i64 {
    format!("{}{}", module_code, status)
        .parse()
        .unwrap_or(i64::from(module_code) * 1000 + i64::from(status))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse {
    pub code: i64,
    pub message: String,
    #[schema(value_type = Object)]
    pub result: Value,
}

impl ApiResponse {
    pub fn new(code: i64, message: impl Into<String>, result: Value) -> Self {
        Self {
            code,
            message: message.into(),
            result,
        }
    }

    /// Success envelope for `module_code`
    pub fn from_result(module_code: u16, result: impl Serialize) -> Self {
        let result = serde_json::to_value(result).unwrap_or(Value::Null);
        Self::new(compose_code(module_code, 200), SUCCESS_MESSAGE, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_compose_code() {
        assert_eq!(compose_code(106, 400), 106400);
        assert_eq!(compose_code(101, 404), 101404);
        assert_eq!(compose_code(100, 422), 100422);
    }

    #[test]
    fn test_success_envelope() {
        let response = ApiResponse::from_result(PIPELINE_MODULE_CODE, vec!["a", "b"]);
        assert_eq!(response.code, 107200);
        assert_eq!(response.message, "API response success");
        assert_eq!(response.result, json!(["a", "b"]));
    }

    #[test]
    fn test_none_result_serializes_as_null() {
        let response = ApiResponse::from_result(PIPELINE_MODULE_CODE, Option::<String>::None);
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"code": 107200, "message": "API response success", "result": null})
        );
    }
}
