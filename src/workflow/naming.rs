//! Pipeline and DAG name handling

use once_cell::sync::Lazy;
use rand::{distributions::Alphanumeric, Rng};
use regex::Regex;

use crate::errors::{WorkflowError, WorkflowResult};

pub const GENERATED_NAME_LENGTH: usize = 12;

static IDENTIFIER_SAFE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9_]+$").expect("Invalid regex pattern for identifier-safe names")
});

/// Random 12-character alphanumeric name
pub fn generate_name() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(GENERATED_NAME_LENGTH)
        .map(char::from)
        .collect()
}

/// Name to use for a pipeline: the submitted one, or a generated one when absent or blank
pub fn resolve_name(name: Option<&str>) -> String {
    match name {
        Some(name) if !name.trim().is_empty() => name.to_string(),
        _ => generate_name(),
    }
}

/// Letters, digits and underscores only
pub fn is_identifier_safe(name: &str) -> bool {
    IDENTIFIER_SAFE.is_match(name)
}

pub fn validate_name(name: &str) -> WorkflowResult<()> {
    if is_identifier_safe(name) {
        Ok(())
    } else {
        Err(WorkflowError::InvalidName(name.to_string()))
    }
}

/// Resolve then validate in one step
pub fn resolve_and_validate(name: Option<&str>) -> WorkflowResult<String> {
    let name = resolve_name(name);
    validate_name(&name)?;
    Ok(name)
}
