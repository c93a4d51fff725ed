use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::security::{Action, SecurityContext},
    domain::entities::membership::{Membership, Role},
};

use super::{plan::PlanRepo, subscription::SubscriptionRepo, tenant::TenantRepo};

#[derive(Debug, Clone)]
pub struct CreateMembershipInput {
    pub tenant_id: Uuid,
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
}

#[async_trait]
pub trait MembershipRepo: Send + Sync {
    /// Resolver lookup: runs outside tenant scoping because it is what
    /// establishes the tenant scope in the first place.
    async fn get_by_user(&self, user_id: Uuid) -> AppResult<Option<Membership>>;
    async fn list_by_tenant(
        &self,
        ctx: &SecurityContext,
        tenant_id: Uuid,
    ) -> AppResult<Vec<Membership>>;
    async fn count_by_tenant(&self, ctx: &SecurityContext, tenant_id: Uuid) -> AppResult<i64>;
    async fn create(
        &self,
        ctx: &SecurityContext,
        input: &CreateMembershipInput,
    ) -> AppResult<Membership>;
}

#[derive(Clone)]
pub struct MembershipUseCases {
    membership_repo: Arc<dyn MembershipRepo>,
    tenant_repo: Arc<dyn TenantRepo>,
    subscription_repo: Arc<dyn SubscriptionRepo>,
    plan_repo: Arc<dyn PlanRepo>,
}

impl MembershipUseCases {
    pub fn new(
        membership_repo: Arc<dyn MembershipRepo>,
        tenant_repo: Arc<dyn TenantRepo>,
        subscription_repo: Arc<dyn SubscriptionRepo>,
        plan_repo: Arc<dyn PlanRepo>,
    ) -> Self {
        Self {
            membership_repo,
            tenant_repo,
            subscription_repo,
            plan_repo,
        }
    }

    /// Derives the per-request security context from an authenticated
    /// principal. Platform admins bypass tenant scoping and carry no tenant;
    /// principals without a membership get an authenticated but tenant-less
    /// context (list operations come back empty, detail reads as absent).
    pub async fn resolve_context(&self, user_id: Uuid) -> AppResult<SecurityContext> {
        match self.membership_repo.get_by_user(user_id).await? {
            Some(membership) if membership.role == Role::PlatformAdmin => {
                Ok(SecurityContext::admin(user_id))
            }
            Some(membership) => Ok(SecurityContext::member(
                user_id,
                membership.tenant_id,
                membership.role,
            )),
            None => Ok(SecurityContext {
                principal: Some(user_id),
                tenant_id: None,
                role: None,
                is_admin: false,
            }),
        }
    }

    /// Registers a member into a tenant, gated by the seat limit of the
    /// tenant's active plan. Platform admins bypass the gate; everyone else
    /// is refused once the member count has reached `max_seats`.
    pub async fn register(
        &self,
        ctx: &SecurityContext,
        input: CreateMembershipInput,
    ) -> AppResult<Membership> {
        if !ctx.is_authenticated() {
            return Err(AppError::InvalidCredentials);
        }
        if !ctx.can(Action::AddMember) {
            return Err(AppError::Forbidden);
        }
        if !ctx.owns(input.tenant_id) {
            return Err(AppError::Forbidden);
        }
        if input.email.trim().is_empty() {
            return Err(AppError::Validation("email is required".into()));
        }
        if input.role == Role::PlatformAdmin && !ctx.is_admin {
            return Err(AppError::Forbidden);
        }

        let tenant = self
            .tenant_repo
            .get_by_id(ctx, input.tenant_id)
            .await?
            .ok_or_else(|| AppError::Validation("Invalid tenant_id".into()))?;

        if !ctx.is_admin {
            self.enforce_seat_limit(ctx, tenant.id).await?;
        }

        // UNIQUE(user_id, tenant_id) turns duplicate registrations into
        // Conflict at the persistence boundary.
        self.membership_repo.create(ctx, &input).await
    }

    pub async fn me(&self, ctx: &SecurityContext) -> AppResult<Membership> {
        let user_id = ctx.principal.ok_or(AppError::InvalidCredentials)?;
        self.membership_repo
            .get_by_user(user_id)
            .await?
            .ok_or(AppError::NotFound)
    }

    pub async fn list_for_tenant(
        &self,
        ctx: &SecurityContext,
        tenant_id: Uuid,
    ) -> AppResult<Vec<Membership>> {
        if !ctx.owns(tenant_id) {
            return Ok(Vec::new());
        }
        self.membership_repo.list_by_tenant(ctx, tenant_id).await
    }

    async fn enforce_seat_limit(&self, ctx: &SecurityContext, tenant_id: Uuid) -> AppResult<()> {
        let Some(subscription) = self
            .subscription_repo
            .find_active_by_tenant(ctx, tenant_id)
            .await?
        else {
            // No active subscription means no plan to enforce.
            return Ok(());
        };
        let Some(plan) = self.plan_repo.get_by_id(subscription.plan_id).await? else {
            return Ok(());
        };
        if plan.max_seats <= 0 {
            return Ok(());
        }
        let current = self.membership_repo.count_by_tenant(ctx, tenant_id).await?;
        if current >= plan.max_seats as i64 {
            tracing::info!(
                tenant_id = %tenant_id,
                max_seats = plan.max_seats,
                current,
                "Seat limit reached, refusing registration"
            );
            return Err(AppError::Forbidden);
        }
        Ok(())
    }
}
