//! recipe-api - Recipe and tag REST backend

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use recipe_api::{
    api::{self, AppState},
    config::Config,
    db::{self, redact_url},
    models::CreateUserInput,
    startup,
};

#[derive(Parser)]
#[command(name = "recipe-api")]
#[command(about = "Recipe and tag REST backend")]
#[command(version)]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(long, global = true, default_value = "config.yml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server (default)
    Serve,
    /// Block until the database accepts connections, then exit
    WaitForDb,
    /// Create an administrator account
    CreateSuperuser(SuperuserArgs),
}

#[derive(Args)]
struct SuperuserArgs {
    #[arg(long)]
    email: String,
    #[arg(long)]
    password: String,
    #[arg(long)]
    name: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "recipe_api=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config = Config::load_with_env(&cli.config)?;
    tracing::info!(path = %cli.config.display(), "Configuration loaded");

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config).await,
        Commands::WaitForDb => wait_for_db(&config).await,
        Commands::CreateSuperuser(args) => create_superuser(config, args).await,
    }
}

/// Run the startup gate, printing each notice to stdout
async fn wait_for_db(config: &Config) -> Result<()> {
    let ready = startup::wait_for_database(config, &mut std::io::stdout()).await?;

    tracing::debug!(attempts = ready.attempts, "Database ready");
    Ok(())
}

async fn serve(config: Config) -> Result<()> {
    tracing::info!("Starting recipe-api...");

    if config.startup.wait_for_database {
        wait_for_db(&config).await?;
    }

    let pool = db::create_pool(&config.database).await?;
    tracing::info!(
        driver = ?config.database.driver,
        url = %redact_url(&config.database.url),
        "Database connected"
    );

    let applied = db::migrations::run_migrations(&pool).await?;
    tracing::info!(applied, "Database migrations completed");

    let state = AppState::new(pool, &config.auth);
    let app = api::build_router(state, &config.server.cors_origin);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

async fn create_superuser(config: Config, args: SuperuserArgs) -> Result<()> {
    let pool = db::create_pool(&config.database).await?;
    db::migrations::run_migrations(&pool).await?;

    let state = AppState::new(pool, &config.auth);
    let user = state
        .user_service
        .create_superuser(CreateUserInput {
            email: Some(args.email),
            password: Some(args.password),
            name: args.name,
        })
        .await?;

    println!("Superuser created: {}", user.email);
    Ok(())
}
