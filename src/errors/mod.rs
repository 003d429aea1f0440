//! Domain-specific error types for the workflow gateway
//!
//! # Error Categories
//!
//! - **WorkflowError**: name validation, graph validation, template rendering, compilation
//! - **UpstreamApiError**: failures reported by external systems (Kubeflow Pipelines)
//! - **PipelineError**: pipeline registry persistence
//! - **GatewayError**: request-boundary wrapper rendered into the response envelope
//!
//! # Examples
//!
//! ```rust
//! use workflow_gateway::errors::{GatewayError, WorkflowError};
//!
//! let err: GatewayError = WorkflowError::InvalidName("bad name".to_string()).into();
//! assert_eq!(err.to_response().code, 106422);
//! ```

pub mod gateway;
pub mod pipeline;
pub mod upstream;
pub mod workflow;

pub use gateway::GatewayError;
pub use pipeline::PipelineError;
pub use upstream::UpstreamApiError;
pub use workflow::WorkflowError;

/// Result type alias for generator and compiler operations
pub type WorkflowResult<T> = Result<T, WorkflowError>;

/// Result type alias for registry operations
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Result type alias for request handlers and orchestration
pub type GatewayResult<T> = Result<T, GatewayError>;
