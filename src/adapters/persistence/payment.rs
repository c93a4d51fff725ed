use async_trait::async_trait;
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::{PostgresPersistence, invoice, rls},
    app_error::{AppError, AppResult},
    application::security::SecurityContext,
    application::use_cases::billing::PaymentRepo,
    domain::entities::{
        invoice::Invoice,
        payment::{Payment, PaymentStatus},
    },
};

fn row_to_payment(row: &sqlx::postgres::PgRow) -> Payment {
    Payment {
        id: row.get("id"),
        invoice_id: row.get("invoice_id"),
        tenant_id: row.get("tenant_id"),
        amount_cents: row.get("amount_cents"),
        status: PaymentStatus::from_str(row.get::<&str, _>("status")),
        idempotency_key: row.get("idempotency_key"),
        provider_ref: row.get("provider_ref"),
        created_at: row.get("created_at"),
    }
}

const SELECT_COLS: &str =
    "id, invoice_id, tenant_id, amount_cents, status, idempotency_key, provider_ref, created_at";

#[async_trait]
impl PaymentRepo for PostgresPersistence {
    async fn get_by_key(
        &self,
        ctx: &SecurityContext,
        invoice_id: Uuid,
        idempotency_key: &str,
    ) -> AppResult<Option<Payment>> {
        let mut tx = self.begin_scoped(ctx).await?;
        let row = sqlx::query(&format!(
            "SELECT {} FROM payments WHERE invoice_id = $1 AND idempotency_key = $2 AND {}",
            SELECT_COLS,
            rls::scope_clause(3)
        ))
        .bind(invoice_id)
        .bind(idempotency_key)
        .bind(ctx.is_admin)
        .bind(ctx.tenant_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(AppError::from)?;
        tx.commit().await.map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_payment))
    }

    async fn latest_for_invoice(
        &self,
        ctx: &SecurityContext,
        invoice_id: Uuid,
    ) -> AppResult<Option<Payment>> {
        let mut tx = self.begin_scoped(ctx).await?;
        let row = sqlx::query(&format!(
            "SELECT {} FROM payments WHERE invoice_id = $1 AND {} \
             ORDER BY created_at DESC LIMIT 1",
            SELECT_COLS,
            rls::scope_clause(2)
        ))
        .bind(invoice_id)
        .bind(ctx.is_admin)
        .bind(ctx.tenant_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(AppError::from)?;
        tx.commit().await.map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_payment))
    }

    async fn list_by_invoice(
        &self,
        ctx: &SecurityContext,
        invoice_id: Uuid,
    ) -> AppResult<Vec<Payment>> {
        let mut tx = self.begin_scoped(ctx).await?;
        let rows = sqlx::query(&format!(
            "SELECT {} FROM payments WHERE invoice_id = $1 AND {} ORDER BY created_at",
            SELECT_COLS,
            rls::scope_clause(2)
        ))
        .bind(invoice_id)
        .bind(ctx.is_admin)
        .bind(ctx.tenant_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(AppError::from)?;
        tx.commit().await.map_err(AppError::from)?;
        Ok(rows.iter().map(row_to_payment).collect())
    }

    async fn record_failure(
        &self,
        ctx: &SecurityContext,
        invoice: &Invoice,
        amount_cents: i32,
        idempotency_key: Option<&str>,
    ) -> AppResult<Payment> {
        let id = Uuid::new_v4();
        let mut tx = self.begin_scoped(ctx).await?;
        let row = sqlx::query(&format!(
            "INSERT INTO payments (id, invoice_id, tenant_id, amount_cents, status, idempotency_key) \
             VALUES ($1, $2, $3, $4, 'failed', $5) RETURNING {}",
            SELECT_COLS
        ))
        .bind(id)
        .bind(invoice.id)
        .bind(invoice.tenant_id)
        .bind(amount_cents)
        .bind(idempotency_key)
        .fetch_one(&mut *tx)
        .await
        .map_err(AppError::from)?;
        tx.commit().await.map_err(AppError::from)?;
        Ok(row_to_payment(&row))
    }

    async fn record_success(
        &self,
        ctx: &SecurityContext,
        invoice: &Invoice,
        amount_cents: i32,
        idempotency_key: Option<&str>,
    ) -> AppResult<(Invoice, Payment)> {
        let id = Uuid::new_v4();
        let mut tx = self.begin_scoped(ctx).await?;

        let payment_row = sqlx::query(&format!(
            "INSERT INTO payments (id, invoice_id, tenant_id, amount_cents, status, idempotency_key) \
             VALUES ($1, $2, $3, $4, 'succeeded', $5) RETURNING {}",
            SELECT_COLS
        ))
        .bind(id)
        .bind(invoice.id)
        .bind(invoice.tenant_id)
        .bind(amount_cents)
        .bind(idempotency_key)
        .fetch_one(&mut *tx)
        .await
        .map_err(AppError::from)?;

        // Guarded flip: only a DUE invoice transitions. If a concurrent
        // request paid it first, the whole transaction rolls back and the
        // caller sees the same Conflict the pre-check would have produced.
        let invoice_row = sqlx::query(&format!(
            "UPDATE invoices SET status = 'paid', paid_at = now(), updated_at = now() \
             WHERE id = $1 AND status = 'due' RETURNING {}",
            invoice::SELECT_COLS
        ))
        .bind(invoice.id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(AppError::from)?;

        let Some(invoice_row) = invoice_row else {
            tx.rollback().await.map_err(AppError::from)?;
            return Err(AppError::Conflict("Invoice already paid".into()));
        };

        tx.commit().await.map_err(AppError::from)?;
        Ok((
            invoice::row_to_invoice(&invoice_row),
            row_to_payment(&payment_row),
        ))
    }
}
