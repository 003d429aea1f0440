pub mod app;
pub mod handlers;
pub mod middleware;

use std::sync::Arc;

use clap::Subcommand;

#[derive(Subcommand, Debug)]
pub enum MigrateDirection {
    Up,
    Down,
    Fresh,
}

use crate::config::AppConfig;
use crate::database::{connection::*, migrations::Migrator};
use crate::kfp::KfpClient;
use anyhow::Result;
use sea_orm_migration::prelude::*;
use tracing::info;

pub async fn start_server(config: AppConfig) -> Result<()> {
    let database_url = get_database_url(Some(&config.database.path));
    let db = establish_connection(&database_url).await?;

    Migrator::up(&db, None).await?;
    info!("Database migrations completed");

    let uploader = Arc::new(KfpClient::from_config(&config.kubeflow)?);
    info!(
        "Uploading pipelines to {}",
        config.kubeflow.pipelines_endpoint
    );

    let address = format!("{}:{}", config.server.host, config.server.port);
    let app = app::create_app(db, config, uploader).await?;

    log_routes();

    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!("Server running on http://{}", address);

    axum::serve(listener, app).await?;

    Ok(())
}

fn log_routes() {
    info!("API Endpoints:");
    info!("  /health                     - Health check");
    info!("  /docs                       - Swagger UI documentation");
    info!("  /workflow/kfp               - Render and compile a Kubeflow pipeline");
    info!("  /workflow/airflow           - Render an Airflow DAG");
    info!("  /workflow/pipeline          - Compile, upload and register a pipeline");
    info!("  /pipeline                   - Pipeline registry");
}

pub async fn migrate_database(database_path: &str, direction: MigrateDirection) -> Result<()> {
    let database_url = get_database_url(Some(database_path));
    let db = establish_connection(&database_url).await?;

    match direction {
        MigrateDirection::Up => {
            info!("Running migrations up");
            Migrator::up(&db, None).await?;
        }
        MigrateDirection::Down => {
            info!("Running migrations down");
            Migrator::down(&db, None).await?;
        }
        MigrateDirection::Fresh => {
            info!("Running fresh migrations (down then up)");
            Migrator::down(&db, None).await?;
            Migrator::up(&db, None).await?;
        }
    }

    info!("Database migration completed");
    Ok(())
}
