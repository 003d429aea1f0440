//! Pipeline definition generator
//!
//! Turns a graph submitted by the visual editor into Kubeflow Pipelines or
//! Airflow source ([`renderer`]) and runs the KFP source to obtain a compiled
//! artifact ([`compiler`]).

pub mod compiler;
pub mod dag;
pub mod graph;
pub mod naming;
pub mod renderer;

pub use compiler::DefinitionCompiler;
pub use dag::{DagDate, DagDefinition};
pub use graph::{GraphEdge, GraphNode, PipelineGraph, PipelineParameter};
pub use renderer::{EnvVarSpec, TemplateRenderer};
