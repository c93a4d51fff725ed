use async_trait::async_trait;
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::security::SecurityContext,
    application::use_cases::tenant::{CreateTenantInput, TenantRepo},
    domain::entities::tenant::Tenant,
};

fn row_to_tenant(row: &sqlx::postgres::PgRow) -> Tenant {
    Tenant {
        id: row.get("id"),
        name: row.get("name"),
        active: row.get("active"),
        created_at: row.get("created_at"),
    }
}

const SELECT_COLS: &str = "id, name, active, created_at";

// The tenants table itself is not row-secured: it carries no tenant_id and
// holds nothing but names. Read scoping happens in the use case.
#[async_trait]
impl TenantRepo for PostgresPersistence {
    async fn get_by_id(&self, _ctx: &SecurityContext, id: Uuid) -> AppResult<Option<Tenant>> {
        let row = sqlx::query(&format!("SELECT {} FROM tenants WHERE id = $1", SELECT_COLS))
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_tenant))
    }

    async fn list(&self, _ctx: &SecurityContext) -> AppResult<Vec<Tenant>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM tenants ORDER BY name",
            SELECT_COLS
        ))
        .fetch_all(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(rows.iter().map(row_to_tenant).collect())
    }

    async fn create(&self, _ctx: &SecurityContext, input: &CreateTenantInput) -> AppResult<Tenant> {
        let id = Uuid::new_v4();
        let row = sqlx::query(&format!(
            "INSERT INTO tenants (id, name) VALUES ($1, $2) RETURNING {}",
            SELECT_COLS
        ))
        .bind(id)
        .bind(&input.name)
        .fetch_one(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(row_to_tenant(&row))
    }
}
