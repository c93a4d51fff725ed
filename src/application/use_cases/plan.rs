use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::security::{Action, SecurityContext},
    domain::entities::plan::{BillingInterval, Plan},
};

#[derive(Debug, Clone)]
pub struct CreatePlanInput {
    pub name: String,
    pub description: String,
    pub price_cents: i32,
    pub interval: BillingInterval,
    pub max_seats: i32,
    pub features: serde_json::Value,
    pub active: bool,
}

#[derive(Debug, Clone, Default)]
pub struct UpdatePlanInput {
    pub description: Option<String>,
    pub price_cents: Option<i32>,
    pub interval: Option<BillingInterval>,
    pub max_seats: Option<i32>,
    pub features: Option<serde_json::Value>,
    pub active: Option<bool>,
}

#[async_trait]
pub trait PlanRepo: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Plan>>;
    async fn list(&self, active_only: bool) -> AppResult<Vec<Plan>>;
    async fn create(&self, input: &CreatePlanInput) -> AppResult<Plan>;
    async fn update(&self, id: Uuid, input: &UpdatePlanInput) -> AppResult<Plan>;
}

#[derive(Clone)]
pub struct PlanUseCases {
    plan_repo: Arc<dyn PlanRepo>,
}

impl PlanUseCases {
    pub fn new(plan_repo: Arc<dyn PlanRepo>) -> Self {
        Self { plan_repo }
    }

    /// The catalog is global: any authenticated caller may browse active
    /// plans, admins also see inactive ones.
    pub async fn list(&self, ctx: &SecurityContext) -> AppResult<Vec<Plan>> {
        if !ctx.is_authenticated() {
            return Err(AppError::InvalidCredentials);
        }
        self.plan_repo.list(!ctx.is_admin).await
    }

    pub async fn get(&self, ctx: &SecurityContext, id: Uuid) -> AppResult<Plan> {
        if !ctx.is_authenticated() {
            return Err(AppError::InvalidCredentials);
        }
        let plan = self
            .plan_repo
            .get_by_id(id)
            .await?
            .ok_or(AppError::NotFound)?;
        if !plan.active && !ctx.is_admin {
            return Err(AppError::NotFound);
        }
        Ok(plan)
    }

    pub async fn create(&self, ctx: &SecurityContext, input: CreatePlanInput) -> AppResult<Plan> {
        if !ctx.is_authenticated() {
            return Err(AppError::InvalidCredentials);
        }
        if !ctx.can(Action::ManagePlans) {
            return Err(AppError::Forbidden);
        }
        if input.name.trim().is_empty() {
            return Err(AppError::Validation("Plan name is required".into()));
        }
        if input.price_cents < 0 {
            return Err(AppError::Validation("price_cents must not be negative".into()));
        }
        if input.max_seats < 0 {
            return Err(AppError::Validation("max_seats must not be negative".into()));
        }
        self.plan_repo.create(&input).await
    }

    pub async fn update(
        &self,
        ctx: &SecurityContext,
        id: Uuid,
        input: UpdatePlanInput,
    ) -> AppResult<Plan> {
        if !ctx.is_authenticated() {
            return Err(AppError::InvalidCredentials);
        }
        if !ctx.can(Action::ManagePlans) {
            return Err(AppError::Forbidden);
        }
        if input.price_cents.is_some_and(|p| p < 0) {
            return Err(AppError::Validation("price_cents must not be negative".into()));
        }
        if input.max_seats.is_some_and(|m| m < 0) {
            return Err(AppError::Validation("max_seats must not be negative".into()));
        }
        self.plan_repo.update(id, &input).await
    }
}
