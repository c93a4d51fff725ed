use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::security::{Action, SecurityContext},
    domain::entities::subscription::{Subscription, SubscriptionStatus},
};

use super::plan::PlanRepo;

#[derive(Debug, Clone)]
pub struct CreateSubscriptionInput {
    pub tenant_id: Uuid,
    pub plan_id: Uuid,
    pub status: SubscriptionStatus,
}

#[async_trait]
pub trait SubscriptionRepo: Send + Sync {
    async fn get_by_id(&self, ctx: &SecurityContext, id: Uuid) -> AppResult<Option<Subscription>>;
    async fn list(&self, ctx: &SecurityContext) -> AppResult<Vec<Subscription>>;
    async fn find_active_by_tenant(
        &self,
        ctx: &SecurityContext,
        tenant_id: Uuid,
    ) -> AppResult<Option<Subscription>>;
    async fn create(
        &self,
        ctx: &SecurityContext,
        input: &CreateSubscriptionInput,
    ) -> AppResult<Subscription>;
    async fn update_plan(
        &self,
        ctx: &SecurityContext,
        id: Uuid,
        plan_id: Uuid,
    ) -> AppResult<Subscription>;
    async fn update_status(
        &self,
        ctx: &SecurityContext,
        id: Uuid,
        status: SubscriptionStatus,
    ) -> AppResult<Subscription>;
}

#[derive(Clone)]
pub struct SubscriptionUseCases {
    subscription_repo: Arc<dyn SubscriptionRepo>,
    plan_repo: Arc<dyn PlanRepo>,
}

impl SubscriptionUseCases {
    pub fn new(subscription_repo: Arc<dyn SubscriptionRepo>, plan_repo: Arc<dyn PlanRepo>) -> Self {
        Self {
            subscription_repo,
            plan_repo,
        }
    }

    /// Creates a subscription for a tenant. Non-admins may only create for
    /// their own tenant. The existence pre-check produces a friendly
    /// `Conflict`; the UNIQUE(tenant_id, status) constraint remains the
    /// final arbiter if two requests race past the check.
    pub async fn create(
        &self,
        ctx: &SecurityContext,
        tenant_id: Option<Uuid>,
        plan_id: Uuid,
        status: Option<SubscriptionStatus>,
    ) -> AppResult<Subscription> {
        if !ctx.is_authenticated() {
            return Err(AppError::InvalidCredentials);
        }
        if !ctx.can(Action::CreateSubscription) {
            return Err(AppError::Forbidden);
        }

        let tenant_id = match (ctx.is_admin, tenant_id, ctx.tenant_id) {
            (true, Some(requested), _) => requested,
            (true, None, _) => {
                return Err(AppError::Validation("Tenant is required".into()));
            }
            (false, Some(requested), Some(own)) if requested == own => own,
            (false, None, Some(own)) => own,
            (false, Some(_), _) => return Err(AppError::Forbidden),
            (false, None, None) => {
                return Err(AppError::Validation("Tenant is required".into()));
            }
        };

        let plan = self
            .plan_repo
            .get_by_id(plan_id)
            .await?
            .ok_or_else(|| AppError::Validation("Invalid plan_id".into()))?;
        if !plan.active {
            return Err(AppError::Validation("Plan is not active".into()));
        }

        let status = status.unwrap_or(SubscriptionStatus::Active);
        if status == SubscriptionStatus::Active
            && self
                .subscription_repo
                .find_active_by_tenant(ctx, tenant_id)
                .await?
                .is_some()
        {
            return Err(AppError::Conflict(
                "This tenant already has an active subscription".into(),
            ));
        }

        self.subscription_repo
            .create(
                ctx,
                &CreateSubscriptionInput {
                    tenant_id,
                    plan_id,
                    status,
                },
            )
            .await
    }

    /// Swaps the plan in place. Already-issued invoices keep their snapshot.
    pub async fn change_plan(
        &self,
        ctx: &SecurityContext,
        id: Uuid,
        plan_id: Uuid,
    ) -> AppResult<Subscription> {
        if !ctx.is_authenticated() {
            return Err(AppError::InvalidCredentials);
        }
        if !ctx.can(Action::ChangePlan) {
            return Err(AppError::Forbidden);
        }
        let subscription = self
            .subscription_repo
            .get_by_id(ctx, id)
            .await?
            .ok_or(AppError::NotFound)?;
        if !ctx.owns(subscription.tenant_id) {
            return Err(AppError::Forbidden);
        }
        let plan = self
            .plan_repo
            .get_by_id(plan_id)
            .await?
            .ok_or_else(|| AppError::Validation("Invalid plan_id".into()))?;
        if !plan.active {
            return Err(AppError::Validation("Plan is not active".into()));
        }
        self.subscription_repo.update_plan(ctx, id, plan_id).await
    }

    /// Restricted to tenant admins and platform admins. No transition graph:
    /// the UNIQUE(tenant_id, status) constraint is the only guard, and a
    /// collision on ACTIVE comes back as `Conflict`.
    pub async fn change_status(
        &self,
        ctx: &SecurityContext,
        id: Uuid,
        status: SubscriptionStatus,
    ) -> AppResult<Subscription> {
        if !ctx.is_authenticated() {
            return Err(AppError::InvalidCredentials);
        }
        if !ctx.can(Action::ChangeStatus) {
            return Err(AppError::Forbidden);
        }
        let subscription = self
            .subscription_repo
            .get_by_id(ctx, id)
            .await?
            .ok_or(AppError::NotFound)?;
        if !ctx.owns(subscription.tenant_id) {
            return Err(AppError::Forbidden);
        }
        self.subscription_repo.update_status(ctx, id, status).await
    }

    pub async fn get(&self, ctx: &SecurityContext, id: Uuid) -> AppResult<Subscription> {
        let subscription = self
            .subscription_repo
            .get_by_id(ctx, id)
            .await?
            .ok_or(AppError::NotFound)?;
        if !ctx.owns(subscription.tenant_id) {
            // Isolation misses read as absence, never as "exists elsewhere".
            return Err(AppError::NotFound);
        }
        Ok(subscription)
    }

    pub async fn list(&self, ctx: &SecurityContext) -> AppResult<Vec<Subscription>> {
        if !ctx.is_admin && ctx.tenant_id.is_none() {
            return Ok(Vec::new());
        }
        self.subscription_repo.list(ctx).await
    }
}
