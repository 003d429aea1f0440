//! Pipeline registry error types
//!
//! # Examples
//!
//! ```rust
//! use workflow_gateway::errors::PipelineError;
//!
//! let err = PipelineError::AlreadyExists("4f1c".to_string());
//! assert_eq!(err.error_code(), "CONFLICT");
//! ```

use serde_json::Value;
use thiserror::Error;

use crate::common::db_errors::DbErrorKind;

#[derive(Error, Debug)]
pub enum PipelineError {
    /// A record with the same pipeline id is already stored
    #[error("Pipeline '{0}' already exists")]
    AlreadyExists(String),

    /// Persisting a pipeline failed; carries the attempted record
    #[error("CreatePipeline failed : {message}")]
    CreateFailed {
        /// Record that was being stored
        record: Value,
        /// Underlying cause
        message: String,
    },

    /// Request failed validation
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Database operation failed
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

impl PipelineError {
    /// Map a database error raised while inserting `pipeline_id`.
    ///
    /// Unique violations on the primary key become `AlreadyExists`.
    pub fn from_insert_error(pipeline_id: &str, err: sea_orm::DbErr) -> Self {
        match DbErrorKind::from_db_err(&err) {
            DbErrorKind::UniqueViolation => PipelineError::AlreadyExists(pipeline_id.to_string()),
            _ => PipelineError::Database(err),
        }
    }

    /// Re-wrap an error with the record that was being persisted
    pub fn with_record(self, record: Value) -> Self {
        match self {
            PipelineError::CreateFailed { message, .. } => {
                PipelineError::CreateFailed { record, message }
            }
            other => PipelineError::CreateFailed {
                record,
                message: other.to_string(),
            },
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            PipelineError::AlreadyExists(_) => 409,
            PipelineError::Validation(_) => 422,
            PipelineError::CreateFailed { .. } => 500,
            PipelineError::Database(err) => DbErrorKind::from_db_err(err).http_status_code(),
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            PipelineError::AlreadyExists(_) => "CONFLICT",
            PipelineError::Validation(_) => "VALIDATION_FAILED",
            PipelineError::CreateFailed { .. } => "CREATE_FAILED",
            PipelineError::Database(_) => "DATABASE_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unique_violation_maps_to_already_exists() {
        let err = sea_orm::DbErr::Exec(sea_orm::RuntimeErr::Internal(
            "UNIQUE constraint failed: pipeline.pipeline_id".to_string(),
        ));
        let err = PipelineError::from_insert_error("abc", err);
        assert!(matches!(err, PipelineError::AlreadyExists(ref id) if id == "abc"));
        assert_eq!(err.status_code(), 409);
    }

    #[test]
    fn test_other_db_errors_stay_database_errors() {
        let err = sea_orm::DbErr::Custom("disk I/O error".to_string());
        let err = PipelineError::from_insert_error("abc", err);
        assert!(matches!(err, PipelineError::Database(_)));
    }

    #[test]
    fn test_with_record_keeps_cause() {
        let err = PipelineError::AlreadyExists("abc".to_string())
            .with_record(json!({"pipeline_id": "abc"}));
        match err {
            PipelineError::CreateFailed { record, message } => {
                assert_eq!(record["pipeline_id"], "abc");
                assert_eq!(message, "Pipeline 'abc' already exists");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
