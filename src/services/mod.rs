pub mod pipeline_service;
pub mod workflow_generator_service;
pub mod workflow_pipeline_service;

pub use pipeline_service::{PipelineCreateRequest, PipelineService};
pub use workflow_generator_service::{GeneratedDag, GeneratedPipeline, WorkflowGeneratorService};
pub use workflow_pipeline_service::WorkflowPipelineService;
