use anyhow::Context as _;

use crate::cli::{utils::output_success, OutputFormat};
use crate::config::AppConfig;
use crate::store::postgres;

pub async fn handle(output_format: OutputFormat) -> anyhow::Result<()> {
    let config = AppConfig::from_env();
    if config.database.url == "memory" {
        anyhow::bail!("DATABASE_URL points at the in-memory store; nothing to migrate");
    }

    let pool = postgres::connect(&config.database)
        .await
        .context("failed to connect to PostgreSQL")?;
    postgres::run_migrations(&pool).await?;
    pool.close().await;

    output_success(&output_format, "Schema is up to date", None)
}
