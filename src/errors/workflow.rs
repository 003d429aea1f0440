//! Pipeline generation error types
//!
//! Errors raised while turning a submitted graph into pipeline source and
//! while running that source to obtain a compiled artifact.
//!
//! # Examples
//!
//! ```rust
//! use workflow_gateway::errors::WorkflowError;
//!
//! let err = WorkflowError::InvalidName("my pipeline!".to_string());
//! assert!(err.is_client_error());
//! assert_eq!(err.error_code(), "INVALID_NAME");
//! ```

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by the template renderer and the definition compiler
#[derive(Error, Debug)]
pub enum WorkflowError {
    /// Pipeline or DAG name contains something other than letters, digits and underscores
    #[error("Invalid name '{0}': only alphabetic characters, numbers, and underscores are allowed")]
    InvalidName(String),

    /// Graph structure cannot be turned into a pipeline
    #[error("Invalid pipeline graph: {0}")]
    InvalidGraph(String),

    /// Template lookup, parsing or rendering failed
    #[error("Template '{template}' failed: {reason}")]
    TemplateRender {
        /// Template name (`kfp`, `airflow`)
        template: String,
        /// Message reported by the template engine
        reason: String,
    },

    /// The compiler process finished without producing the expected artifact
    #[error("Compilation produced no artifact at {}", artifact.display())]
    Compile {
        /// Path the rendered source was expected to write
        artifact: PathBuf,
        /// Exit code of the interpreter, if it ran to completion
        exit_code: Option<i32>,
        /// Captured standard error (or the launch failure)
        stderr: String,
    },

    /// The compiler process exceeded the configured timeout and was killed
    #[error("Compilation timed out after {timeout_secs}s")]
    CompileTimeout {
        /// Path the rendered source was expected to write
        artifact: PathBuf,
        /// Configured bound
        timeout_secs: u64,
    },

    /// Filesystem failure while preparing the working directory or source file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkflowError {
    pub fn template(template: impl Into<String>, reason: impl ToString) -> Self {
        WorkflowError::TemplateRender {
            template: template.into(),
            reason: reason.to_string(),
        }
    }

    /// Check if this error was caused by the submitted request
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            WorkflowError::InvalidName(_) | WorkflowError::InvalidGraph(_)
        )
    }

    /// Check if this error came out of the compiler step
    pub fn is_compile_error(&self) -> bool {
        matches!(
            self,
            WorkflowError::Compile { .. } | WorkflowError::CompileTimeout { .. }
        )
    }

    /// HTTP status folded into the envelope code
    pub fn status_code(&self) -> u16 {
        match self {
            WorkflowError::InvalidName(_) | WorkflowError::InvalidGraph(_) => 422,
            WorkflowError::TemplateRender { .. } => 400,
            WorkflowError::Compile { .. }
            | WorkflowError::CompileTimeout { .. }
            | WorkflowError::Io(_) => 500,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            WorkflowError::InvalidName(_) => "INVALID_NAME",
            WorkflowError::InvalidGraph(_) => "INVALID_GRAPH",
            WorkflowError::TemplateRender { .. } => "TEMPLATE_ERROR",
            WorkflowError::Compile { .. } | WorkflowError::CompileTimeout { .. } => {
                "COMPILE_FAILED"
            }
            WorkflowError::Io(_) => "IO_ERROR",
        }
    }
}
