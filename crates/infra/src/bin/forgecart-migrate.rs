//! Apply the catalog schema to the database named by `DATABASE_URL`.

use anyhow::Context;
use tracing::info;

use forgecart_infra::{CatalogConfig, PostgresCatalogStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CatalogConfig::from_env().context("loading catalog configuration")?;
    forgecart_observability::init(config.log_format);

    let store = PostgresCatalogStore::connect(&config)
        .await
        .context("connecting to the catalog database")?;
    store.migrate().await.context("applying catalog schema")?;

    info!(
        max_connections = config.db_max_connections,
        "catalog schema is up to date"
    );
    Ok(())
}
