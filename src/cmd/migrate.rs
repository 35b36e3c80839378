use sqlx::{migrate::Migrator, postgres::PgPoolOptions};

use crate::{
    conf::{settings, StoreBackend},
    prelude::{AppError, Result},
};

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

pub async fn apply() -> Result<()> {
    if settings.store_backend != StoreBackend::Postgres {
        tracing::info!("document store needs no migrations, tables are created on open");
        return Ok(());
    }
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&settings.database_url)
        .await?;
    tracing::debug!("connected to db");
    let mut tx = pool.begin().await?;
    MIGRATOR
        .run(&mut *tx)
        .await
        .map_err(|e| AppError::internal("migration failed", e))?;
    tx.commit().await?;
    tracing::info!("migrations applied successfully");
    Ok(())
}
