use async_trait::async_trait;
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::{PostgresPersistence, rls},
    app_error::{AppError, AppResult},
    application::security::SecurityContext,
    application::use_cases::membership::{CreateMembershipInput, MembershipRepo},
    domain::entities::membership::{Membership, Role},
};

fn row_to_membership(row: &sqlx::postgres::PgRow) -> Membership {
    Membership {
        id: row.get("id"),
        tenant_id: row.get("tenant_id"),
        user_id: row.get("user_id"),
        email: row.get("email"),
        role: Role::from_str(row.get::<&str, _>("role")),
        created_at: row.get("created_at"),
    }
}

const SELECT_COLS: &str = "id, tenant_id, user_id, email, role, created_at";

#[async_trait]
impl MembershipRepo for PostgresPersistence {
    async fn get_by_user(&self, user_id: Uuid) -> AppResult<Option<Membership>> {
        // Trusted lookup: this is what the security context is derived from,
        // so it cannot itself be tenant-scoped.
        let mut tx = self.begin_trusted().await?;
        let row = sqlx::query(&format!(
            "SELECT {} FROM memberships WHERE user_id = $1",
            SELECT_COLS
        ))
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(AppError::from)?;
        tx.commit().await.map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_membership))
    }

    async fn list_by_tenant(
        &self,
        ctx: &SecurityContext,
        tenant_id: Uuid,
    ) -> AppResult<Vec<Membership>> {
        let mut tx = self.begin_scoped(ctx).await?;
        let rows = sqlx::query(&format!(
            "SELECT {} FROM memberships WHERE tenant_id = $1 AND {} ORDER BY created_at",
            SELECT_COLS,
            rls::scope_clause(2)
        ))
        .bind(tenant_id)
        .bind(ctx.is_admin)
        .bind(ctx.tenant_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(AppError::from)?;
        tx.commit().await.map_err(AppError::from)?;
        Ok(rows.iter().map(row_to_membership).collect())
    }

    async fn count_by_tenant(&self, ctx: &SecurityContext, tenant_id: Uuid) -> AppResult<i64> {
        let mut tx = self.begin_scoped(ctx).await?;
        let count: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM memberships WHERE tenant_id = $1 AND {}",
            rls::scope_clause(2)
        ))
        .bind(tenant_id)
        .bind(ctx.is_admin)
        .bind(ctx.tenant_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(AppError::from)?;
        tx.commit().await.map_err(AppError::from)?;
        Ok(count)
    }

    async fn create(
        &self,
        ctx: &SecurityContext,
        input: &CreateMembershipInput,
    ) -> AppResult<Membership> {
        let id = Uuid::new_v4();
        let mut tx = self.begin_scoped(ctx).await?;
        let row = sqlx::query(&format!(
            "INSERT INTO memberships (id, tenant_id, user_id, email, role) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            SELECT_COLS
        ))
        .bind(id)
        .bind(input.tenant_id)
        .bind(input.user_id)
        .bind(&input.email)
        .bind(input.role.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(AppError::from)?;
        tx.commit().await.map_err(AppError::from)?;
        Ok(row_to_membership(&row))
    }
}
