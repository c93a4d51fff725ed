use async_trait::async_trait;
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::plan::{CreatePlanInput, PlanRepo, UpdatePlanInput},
    domain::entities::plan::{BillingInterval, Plan},
};

fn row_to_plan(row: &sqlx::postgres::PgRow) -> Plan {
    Plan {
        id: row.get("id"),
        name: row.get("name"),
        description: row.get("description"),
        price_cents: row.get("price_cents"),
        interval: BillingInterval::from_str(row.get::<&str, _>("interval")),
        max_seats: row.get("max_seats"),
        features: row.get("features"),
        active: row.get("active"),
        created_at: row.get("created_at"),
    }
}

const SELECT_COLS: &str =
    "id, name, description, price_cents, interval, max_seats, features, active, created_at";

// Plans are the global catalog; no tenant scoping applies.
#[async_trait]
impl PlanRepo for PostgresPersistence {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Plan>> {
        let row = sqlx::query(&format!("SELECT {} FROM plans WHERE id = $1", SELECT_COLS))
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_plan))
    }

    async fn list(&self, active_only: bool) -> AppResult<Vec<Plan>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM plans WHERE active OR NOT $1 ORDER BY price_cents, name",
            SELECT_COLS
        ))
        .bind(active_only)
        .fetch_all(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(rows.iter().map(row_to_plan).collect())
    }

    async fn create(&self, input: &CreatePlanInput) -> AppResult<Plan> {
        let id = Uuid::new_v4();
        let row = sqlx::query(&format!(
            "INSERT INTO plans (id, name, description, price_cents, interval, max_seats, features, active) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {}",
            SELECT_COLS
        ))
        .bind(id)
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.price_cents)
        .bind(input.interval.as_str())
        .bind(input.max_seats)
        .bind(&input.features)
        .bind(input.active)
        .fetch_one(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(row_to_plan(&row))
    }

    async fn update(&self, id: Uuid, input: &UpdatePlanInput) -> AppResult<Plan> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE plans SET
                description = COALESCE($2, description),
                price_cents = COALESCE($3, price_cents),
                interval = COALESCE($4, interval),
                max_seats = COALESCE($5, max_seats),
                features = COALESCE($6, features),
                active = COALESCE($7, active)
            WHERE id = $1
            RETURNING {}
            "#,
            SELECT_COLS
        ))
        .bind(id)
        .bind(input.description.as_deref())
        .bind(input.price_cents)
        .bind(input.interval.map(|i| i.as_str()))
        .bind(input.max_seats)
        .bind(input.features.as_ref())
        .bind(input.active)
        .fetch_one(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(row_to_plan(&row))
    }
}
