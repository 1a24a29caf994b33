//! Roast import server
//!
//! Accepts roaster-logger exports over HTTP and stores the decomposed rows.

use std::sync::Arc;

use roast_backend::{connect_database, create_app, init_tracing, store::PgRoastStore, AppState, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing("roast_server=debug,roast_backend=debug,tower_http=debug,sqlx=warn");

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::load()?;

    tracing::info!("Starting Roast Import Server");
    tracing::info!("Environment: {}", config.environment);
    tracing::info!("Storing temperatures in {}", config.import.target_unit);

    let db_pool = connect_database(&config).await?;

    // Create application state
    let state = AppState {
        store: Arc::new(PgRoastStore::new(db_pool)),
        config: Arc::new(config.clone()),
    };

    // Build application
    let app = create_app(state);

    // Start server
    let addr = config.bind_addr();
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
