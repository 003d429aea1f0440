use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A pipeline registered with Kubeflow Pipelines, with the editor graph it was built from
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "pipeline")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub pipeline_id: String,
    pub pipeline_name: String,
    pub pipeline_description: Option<String>,
    pub version_name: Option<String>,
    pub version_description: Option<String>,
    pub nodes: Json,
    pub edges: Json,
    pub position: Json,
    pub zoom: i32,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
