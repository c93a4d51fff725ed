use async_trait::async_trait;
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::{PostgresPersistence, rls},
    app_error::{AppError, AppResult},
    application::security::SecurityContext,
    application::use_cases::subscription::{CreateSubscriptionInput, SubscriptionRepo},
    domain::entities::subscription::{Subscription, SubscriptionStatus},
};

fn row_to_subscription(row: &sqlx::postgres::PgRow) -> Subscription {
    Subscription {
        id: row.get("id"),
        tenant_id: row.get("tenant_id"),
        plan_id: row.get("plan_id"),
        status: SubscriptionStatus::from_str(row.get::<&str, _>("status")),
        started_at: row.get("started_at"),
        current_period_end: row.get("current_period_end"),
        cancel_at_period_end: row.get("cancel_at_period_end"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

const SELECT_COLS: &str = "id, tenant_id, plan_id, status, started_at, current_period_end, \
     cancel_at_period_end, created_at, updated_at";

#[async_trait]
impl SubscriptionRepo for PostgresPersistence {
    async fn get_by_id(&self, ctx: &SecurityContext, id: Uuid) -> AppResult<Option<Subscription>> {
        let mut tx = self.begin_scoped(ctx).await?;
        let row = sqlx::query(&format!(
            "SELECT {} FROM subscriptions WHERE id = $1 AND {}",
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
        Ok(row.as_ref().map(row_to_subscription))
    }

    async fn list(&self, ctx: &SecurityContext) -> AppResult<Vec<Subscription>> {
        let mut tx = self.begin_scoped(ctx).await?;
        let rows = sqlx::query(&format!(
            "SELECT {} FROM subscriptions WHERE {} ORDER BY created_at DESC",
            SELECT_COLS,
            rls::scope_clause(1)
        ))
        .bind(ctx.is_admin)
        .bind(ctx.tenant_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(AppError::from)?;
        tx.commit().await.map_err(AppError::from)?;
        Ok(rows.iter().map(row_to_subscription).collect())
    }

    async fn find_active_by_tenant(
        &self,
        ctx: &SecurityContext,
        tenant_id: Uuid,
    ) -> AppResult<Option<Subscription>> {
        let mut tx = self.begin_scoped(ctx).await?;
        let row = sqlx::query(&format!(
            "SELECT {} FROM subscriptions WHERE tenant_id = $1 AND status = 'active' AND {}",
            SELECT_COLS,
            rls::scope_clause(2)
        ))
        .bind(tenant_id)
        .bind(ctx.is_admin)
        .bind(ctx.tenant_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(AppError::from)?;
        tx.commit().await.map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_subscription))
    }

    async fn create(
        &self,
        ctx: &SecurityContext,
        input: &CreateSubscriptionInput,
    ) -> AppResult<Subscription> {
        let id = Uuid::new_v4();
        let mut tx = self.begin_scoped(ctx).await?;
        // UNIQUE(tenant_id, status) decides the race; the use-case pre-check
        // only exists for the friendlier error message.
        let row = sqlx::query(&format!(
            "INSERT INTO subscriptions (id, tenant_id, plan_id, status) \
             VALUES ($1, $2, $3, $4) RETURNING {}",
            SELECT_COLS
        ))
        .bind(id)
        .bind(input.tenant_id)
        .bind(input.plan_id)
        .bind(input.status.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(AppError::from)?;
        tx.commit().await.map_err(AppError::from)?;
        Ok(row_to_subscription(&row))
    }

    async fn update_plan(
        &self,
        ctx: &SecurityContext,
        id: Uuid,
        plan_id: Uuid,
    ) -> AppResult<Subscription> {
        let mut tx = self.begin_scoped(ctx).await?;
        let row = sqlx::query(&format!(
            "UPDATE subscriptions SET plan_id = $2, updated_at = now() \
             WHERE id = $1 AND {} RETURNING {}",
            rls::scope_clause(3),
            SELECT_COLS
        ))
        .bind(id)
        .bind(plan_id)
        .bind(ctx.is_admin)
        .bind(ctx.tenant_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(AppError::from)?
        .ok_or(AppError::NotFound)?;
        tx.commit().await.map_err(AppError::from)?;
        Ok(row_to_subscription(&row))
    }

    async fn update_status(
        &self,
        ctx: &SecurityContext,
        id: Uuid,
        status: SubscriptionStatus,
    ) -> AppResult<Subscription> {
        let mut tx = self.begin_scoped(ctx).await?;
        let row = sqlx::query(&format!(
            "UPDATE subscriptions SET status = $2, updated_at = now() \
             WHERE id = $1 AND {} RETURNING {}",
            rls::scope_clause(3),
            SELECT_COLS
        ))
        .bind(id)
        .bind(status.as_str())
        .bind(ctx.is_admin)
        .bind(ctx.tenant_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(AppError::from)?
        .ok_or(AppError::NotFound)?;
        tx.commit().await.map_err(AppError::from)?;
        Ok(row_to_subscription(&row))
    }
}
