use sqlx::{PgPool, postgres::PgPoolOptions};
use tracing::info;

use crate::adapters::persistence::rls;

pub async fn init_db(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
        .map_err(|e| {
            anyhow::anyhow!("Postgres connection failed (check DATABASE_URL/password): {e}")
        })?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    // The row-security policies are regenerated from the shared predicate on
    // every startup so they can never drift from the application filter.
    rls::apply_policies(&pool).await?;

    info!("Connected to database!");
    Ok(pool)
}
