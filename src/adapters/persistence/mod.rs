use sqlx::{PgPool, Postgres, Transaction};

use crate::{app_error::AppError, application::security::SecurityContext};

pub mod invoice;
pub mod membership;
pub mod payment;
pub mod plan;
pub mod rls;
pub mod subscription;
pub mod tenant;

#[derive(Clone)]
pub struct PostgresPersistence {
    pool: PgPool,
}

impl PostgresPersistence {
    pub fn new(pool: PgPool) -> Self {
        PostgresPersistence { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Opens a transaction carrying the caller's security context as
    /// transaction-local session settings. The row-security policies read
    /// these; because `set_config(..., true)` is transaction-scoped, a pooled
    /// connection can never leak one request's context into the next.
    pub(crate) async fn begin_scoped(
        &self,
        ctx: &SecurityContext,
    ) -> Result<Transaction<'static, Postgres>, AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::from)?;
        sqlx::query("SELECT set_config('app.tenant_id', $1, true), set_config('app.admin', $2, true)")
            .bind(ctx.tenant_id.map(|t| t.to_string()).unwrap_or_default())
            .bind(if ctx.is_admin { "true" } else { "false" })
            .execute(&mut *tx)
            .await
            .map_err(AppError::from)?;
        Ok(tx)
    }

    /// Opens a transaction with the admin flag set. Reserved for the context
    /// resolver's membership lookup, which necessarily runs before a tenant
    /// scope exists (it is what establishes one).
    pub(crate) async fn begin_trusted(
        &self,
    ) -> Result<Transaction<'static, Postgres>, AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::from)?;
        sqlx::query("SELECT set_config('app.tenant_id', '', true), set_config('app.admin', 'true', true)")
            .execute(&mut *tx)
            .await
            .map_err(AppError::from)?;
        Ok(tx)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => AppError::NotFound,
            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();
                // Lost check-then-act races land here: the uniqueness
                // constraints on subscriptions(tenant_id, status) and
                // payments(invoice_id, idempotency_key) are the final
                // arbiter, surfaced as a domain Conflict.
                if msg.contains("duplicate key") || msg.contains("unique constraint") {
                    AppError::Conflict("A record with this value already exists".into())
                }
                // PostgreSQL foreign key violation
                else if msg.contains("foreign key") || msg.contains("violates foreign key") {
                    AppError::Validation("Referenced record not found".into())
                }
                // PostgreSQL not-null violation
                else if msg.contains("null value") && msg.contains("violates not-null") {
                    AppError::Validation("Required field is missing".into())
                }
                // Row-security rejections read the same as absence.
                else if msg.contains("row-level security") {
                    AppError::NotFound
                } else {
                    tracing::error!(error = ?err, "Database error");
                    AppError::Database("Database operation failed".into())
                }
            }
            _ => {
                tracing::error!(error = ?err, "Database error");
                AppError::Database("Database operation failed".into())
            }
        }
    }
}
