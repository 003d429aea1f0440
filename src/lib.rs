//! Workflow gateway
//!
//! REST service that turns pipeline graphs drawn in a visual editor into
//! Kubeflow Pipelines and Airflow definitions, uploads compiled pipelines to
//! Kubeflow Pipelines, and keeps a registry of what was uploaded. Every
//! endpoint answers with the `{code, message, result}` envelope.

pub mod common;
pub mod config;
pub mod database;
pub mod errors;
pub mod generate_commands;
pub mod kfp;
pub mod server;
pub mod services;
pub mod workflow;
