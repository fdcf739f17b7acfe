use adunni_storefront::{app_state::AppState, bootstrap, config, db, routes};
use anyhow::Result;
use diesel_migrations::{EmbeddedMigrations, embed_migrations};

/// Migrations embedded into the binary so deploys only ship one artifact
const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

#[tokio::main]
async fn main() -> Result<()> {
    bootstrap::init_tracing();
    bootstrap::init_env();

    let config = config::load()?;

    tracing::info!("Running migrations...");
    let migrations_count = db::run_migrations_blocking(MIGRATIONS, &config.database.url).await?;
    tracing::info!("Run {} new migrations successfully", migrations_count);

    tracing::info!("Bootstrapping...");
    let port = config.server.port;
    let state = AppState::init(config).await?;
    let app = routes::app(state);

    bootstrap::bootstrap("Storefront", app, port).await
}
