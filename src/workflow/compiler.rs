//! Runs rendered pipeline source to obtain the compiled artifact
//!
//! The rendered program writes the artifact itself; the compiler only
//! writes the source, runs `<interpreter> <args...> <source>` and then checks
//! that the artifact exists. Artifact existence is the success signal, the
//! exit status and stderr are only reported.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::errors::{WorkflowError, WorkflowResult};

#[derive(Debug, Clone)]
pub struct DefinitionCompiler {
    interpreter: String,
    interpreter_args: Vec<String>,
    timeout: Option<Duration>,
}

impl DefinitionCompiler {
    pub fn new(interpreter: impl Into<String>) -> Self {
        Self {
            interpreter: interpreter.into(),
            interpreter_args: Vec::new(),
            timeout: None,
        }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.interpreter_args = args;
        self
    }

    /// Bound on a single interpreter run; `None` waits indefinitely
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn interpreter(&self) -> &str {
        &self.interpreter
    }

    /// Write `source` to `source_path`, run it, and return `artifact_path`
    /// once the run has produced it.
    pub async fn compile(
        &self,
        source: &str,
        source_path: &Path,
        artifact_path: &Path,
    ) -> WorkflowResult<PathBuf> {
        if let Some(parent) = source_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(source_path, source).await?;
        debug!("Wrote {} bytes to {}", source.len(), source_path.display());

        let mut command = Command::new(&self.interpreter);
        command
            .args(&self.interpreter_args)
            .arg(source_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let run = command.output();
        let output = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, run).await {
                Ok(output) => output,
                Err(_) => {
                    warn!(
                        "Compiler for {} exceeded {}s, killed",
                        source_path.display(),
                        limit.as_secs()
                    );
                    return Err(WorkflowError::CompileTimeout {
                        artifact: artifact_path.to_path_buf(),
                        timeout_secs: limit.as_secs(),
                    });
                }
            },
            None => run.await,
        };

        let (exit_code, stderr) = match output {
            Ok(output) => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                if !stdout.trim().is_empty() {
                    debug!("Compiler stdout: {}", stdout.trim());
                }
                (
                    output.status.code(),
                    String::from_utf8_lossy(&output.stderr).into_owned(),
                )
            }
            Err(e) => {
                warn!("Failed to launch '{}': {}", self.interpreter, e);
                (None, format!("failed to launch '{}': {}", self.interpreter, e))
            }
        };

        if tokio::fs::try_exists(artifact_path).await.unwrap_or(false) {
            if exit_code != Some(0) {
                warn!(
                    "Compiler exited with {:?} but produced {}",
                    exit_code,
                    artifact_path.display()
                );
            }
            info!("Compiled {}", artifact_path.display());
            return Ok(artifact_path.to_path_buf());
        }

        warn!(
            "No artifact at {} (exit code {:?}): {}",
            artifact_path.display(),
            exit_code,
            stderr.trim()
        );
        Err(WorkflowError::Compile {
            artifact: artifact_path.to_path_buf(),
            exit_code,
            stderr,
        })
    }
}
