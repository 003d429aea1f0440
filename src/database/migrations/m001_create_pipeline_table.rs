use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Pipeline::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Pipeline::PipelineId)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Pipeline::PipelineName).string().not_null())
                    .col(ColumnDef::new(Pipeline::PipelineDescription).string())
                    .col(ColumnDef::new(Pipeline::VersionName).string())
                    .col(ColumnDef::new(Pipeline::VersionDescription).string())
                    .col(ColumnDef::new(Pipeline::Nodes).json().not_null())
                    .col(ColumnDef::new(Pipeline::Edges).json().not_null())
                    .col(ColumnDef::new(Pipeline::Position).json().not_null())
                    .col(ColumnDef::new(Pipeline::Zoom).integer().not_null().default(1))
                    .col(ColumnDef::new(Pipeline::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Pipeline::UpdatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_pipeline_name")
                    .table(Pipeline::Table)
                    .col(Pipeline::PipelineName)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Pipeline::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Pipeline {
    Table,
    PipelineId,
    PipelineName,
    PipelineDescription,
    VersionName,
    VersionDescription,
    Nodes,
    Edges,
    Position,
    Zoom,
    CreatedAt,
    UpdatedAt,
}
