use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use workflow_gateway::config::{AppConfig, DEFAULT_CONFIG_FILE, DEFAULT_PROFILE};
use workflow_gateway::{generate_commands, server};

#[derive(Parser)]
#[clap(author, version, about)]
struct Cli {
    #[clap(short, long, global = true)]
    log_level: Option<String>,
    /// Multi-profile YAML configuration
    #[clap(short, long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
    /// Configuration profile
    #[clap(long, global = true, env = "APP_ENV", default_value = DEFAULT_PROFILE)]
    profile: String,
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Serve {
        #[clap(short, long, env = "PORT")]
        port: Option<u16>,
        #[clap(short, long)]
        database: Option<String>,
        #[clap(long)]
        cors_origin: Option<String>,
    },
    Db {
        #[clap(subcommand)]
        command: DbCommands,
    },
    /// Render a pipeline graph (JSON) without compiling it
    Render {
        /// PipelineGraph JSON file
        graph: PathBuf,
        /// DagDefinition JSON file; renders an Airflow DAG instead of a KFP pipeline
        #[clap(long)]
        dag: Option<PathBuf>,
        /// Artifact path embedded in the KFP pipeline (default `<pipeline_name>.yaml`)
        #[clap(long)]
        artifact: Option<PathBuf>,
        /// Write to this file instead of stdout
        #[clap(short, long)]
        output: Option<PathBuf>,
    },
    /// Print an embedded template (kfp, airflow)
    Template { name: String },
}

#[derive(Subcommand, Debug)]
enum DbCommands {
    Init {
        #[clap(short, long)]
        database: Option<String>,
    },
    Migrate {
        #[clap(subcommand)]
        direction: server::MigrateDirection,
        #[clap(short, long)]
        database: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    setup_logging(&args.log_level);

    let mut config = AppConfig::load(&args.config, &args.profile)?;

    match args.command {
        Commands::Serve {
            port,
            database,
            cors_origin,
        } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(database) = database {
                config.database.path = database;
            }
            if cors_origin.is_some() {
                config.server.cors_origin = cors_origin;
            }
            info!("Starting server on port {}", config.server.port);
            server::start_server(config).await?;
        }
        Commands::Db { command } => match command {
            DbCommands::Init { database } => {
                let database = database.unwrap_or(config.database.path);
                info!("Initializing database: {}", database);
                server::migrate_database(&database, server::MigrateDirection::Up).await?;
            }
            DbCommands::Migrate {
                direction,
                database,
            } => {
                let database = database.unwrap_or(config.database.path);
                info!("Running database migration: {:?}", direction);
                server::migrate_database(&database, direction).await?;
            }
        },
        Commands::Render {
            graph,
            dag,
            artifact,
            output,
        } => {
            info!("Rendering pipeline: {}", graph.display());
            generate_commands::render_pipeline(
                &config.workflow,
                &graph,
                dag.as_deref(),
                artifact,
                output.as_deref(),
            )?;
        }
        Commands::Template { name } => {
            generate_commands::generate_template(name);
        }
    }

    Ok(())
}

fn setup_logging(log_level: &Option<String>) {
    let log_level = match log_level
        .as_ref()
        .unwrap_or(&"info".to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(format!("handlebars=off,{}", log_level)))
        .without_time()
        .init();
}
