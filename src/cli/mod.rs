use clap::{Parser, Subcommand};
use sqlx::PgPool;

use crate::app::{app, AppState};
use crate::auth::{create_token, Claims};
use crate::config;
use crate::database::DatabaseManager;

#[derive(Parser)]
#[command(name = "jobly")]
#[command(about = "Jobly API - companies, jobs and users over PostgreSQL")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    #[command(about = "Run the HTTP server (default)")]
    Serve {
        #[arg(long, help = "Port to listen on (overrides JOBLY_PORT / PORT)")]
        port: Option<u16>,
    },

    #[command(about = "Create the companies, jobs, users and applications tables")]
    Schema,

    #[command(about = "Mint a signed token for an operator")]
    Token {
        #[arg(help = "Username to put in the token")]
        username: String,
        #[arg(long, help = "Grant admin rights")]
        admin: bool,
    },
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command.unwrap_or(Commands::Serve { port: None }) {
        Commands::Serve { port } => serve(port).await,
        Commands::Schema => {
            let pool = connect().await?;
            DatabaseManager::apply_schema(&pool).await?;
            println!("schema applied");
            Ok(())
        }
        Commands::Token { username, admin } => {
            let token = create_token(&Claims::new(username, admin))?;
            println!("{}", token);
            Ok(())
        }
    }
}

async fn connect() -> anyhow::Result<PgPool> {
    Ok(DatabaseManager::connect(&config::config().database).await?)
}

async fn serve(port: Option<u16>) -> anyhow::Result<()> {
    let config = config::config();
    tracing::info!("Starting Jobly API in {:?} mode", config.environment);

    let pool = connect().await?;
    DatabaseManager::health_check(&pool).await?;
    let router = app(AppState::new(pool));

    let bind_addr = format!("0.0.0.0:{}", port.unwrap_or(config.api.port));
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("listening on http://{}", bind_addr);

    axum::serve(listener, router).await?;
    Ok(())
}
