use async_trait::async_trait;
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::{PostgresPersistence, rls},
    app_error::{AppError, AppResult},
    application::security::SecurityContext,
    application::use_cases::billing::{CreateInvoiceInput, InvoiceRepo},
    domain::entities::invoice::{Invoice, InvoiceStatus},
};

pub(crate) fn row_to_invoice(row: &sqlx::postgres::PgRow) -> Invoice {
    Invoice {
        id: row.get("id"),
        tenant_id: row.get("tenant_id"),
        subscription_id: row.get("subscription_id"),
        amount_cents: row.get("amount_cents"),
        currency: row.get("currency"),
        status: InvoiceStatus::from_str(row.get::<&str, _>("status")),
        period_start: row.get("period_start"),
        period_end: row.get("period_end"),
        issued_at: row.get("issued_at"),
        paid_at: row.get("paid_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

pub(crate) const SELECT_COLS: &str = "id, tenant_id, subscription_id, amount_cents, currency, \
     status, period_start, period_end, issued_at, paid_at, created_at, updated_at";

#[async_trait]
impl InvoiceRepo for PostgresPersistence {
    async fn get_by_id(&self, ctx: &SecurityContext, id: Uuid) -> AppResult<Option<Invoice>> {
        let mut tx = self.begin_scoped(ctx).await?;
        let row = sqlx::query(&format!(
            "SELECT {} FROM invoices WHERE id = $1 AND {}",
            SELECT_COLS,
            rls::scope_clause(2)
        ))
        .bind(id)
        .bind(ctx.is_admin)
        .bind(ctx.tenant_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(AppError::from)?;
        tx.commit().await.map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_invoice))
    }

    async fn list(&self, ctx: &SecurityContext) -> AppResult<Vec<Invoice>> {
        let mut tx = self.begin_scoped(ctx).await?;
        let rows = sqlx::query(&format!(
            "SELECT {} FROM invoices WHERE {} ORDER BY issued_at DESC",
            SELECT_COLS,
            rls::scope_clause(1)
        ))
        .bind(ctx.is_admin)
        .bind(ctx.tenant_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(AppError::from)?;
        tx.commit().await.map_err(AppError::from)?;
        Ok(rows.iter().map(row_to_invoice).collect())
    }

    async fn create(
        &self,
        ctx: &SecurityContext,
        input: &CreateInvoiceInput,
    ) -> AppResult<Invoice> {
        let id = Uuid::new_v4();
        let mut tx = self.begin_scoped(ctx).await?;
        // period_start doubles as the issuance instant; amount_cents is the
        // caller-supplied snapshot of the plan price and never changes.
        let row = sqlx::query(&format!(
            "INSERT INTO invoices (id, tenant_id, subscription_id, amount_cents, currency, period_start) \
             VALUES ($1, $2, $3, $4, $5, now()) RETURNING {}",
            SELECT_COLS
        ))
        .bind(id)
        .bind(input.tenant_id)
        .bind(input.subscription_id)
        .bind(input.amount_cents)
        .bind(&input.currency)
        .fetch_one(&mut *tx)
        .await
        .map_err(AppError::from)?;
        tx.commit().await.map_err(AppError::from)?;
        Ok(row_to_invoice(&row))
    }
}
