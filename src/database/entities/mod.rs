pub mod pipelines;

pub use pipelines::{
    ActiveModel as PipelineActiveModel, Column as PipelineColumn, Entity as Pipelines,
    Model as PipelineModel,
};
