//! Backfill derived milestone and phase fields for historical roasts

use std::sync::Arc;

use roast_backend::{
    connect_database, init_tracing, services::BackfillService, store::PgRoastStore, Config,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing("roast_backfill=info,roast_backend=info,sqlx=warn");

    dotenvy::dotenv().ok();
    let config = Config::load()?;

    tracing::info!(
        environment = %config.environment,
        batch_size = config.backfill.batch_size,
        "Starting milestone backfill"
    );

    let db_pool = connect_database(&config).await?;
    let service = BackfillService::new(Arc::new(PgRoastStore::new(db_pool)), config.backfill.batch_size);
    let report = service.backfill_null_milestones().await?;

    for item in &report.errors {
        tracing::warn!(roast_id = %item.roast_id, "{}", item.message);
    }
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
