use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::security::{Action, SecurityContext},
    domain::entities::tenant::Tenant,
};

#[derive(Debug, Clone)]
pub struct CreateTenantInput {
    pub name: String,
}

#[async_trait]
pub trait TenantRepo: Send + Sync {
    async fn get_by_id(&self, ctx: &SecurityContext, id: Uuid) -> AppResult<Option<Tenant>>;
    async fn list(&self, ctx: &SecurityContext) -> AppResult<Vec<Tenant>>;
    async fn create(&self, ctx: &SecurityContext, input: &CreateTenantInput) -> AppResult<Tenant>;
}

#[derive(Clone)]
pub struct TenantUseCases {
    tenant_repo: Arc<dyn TenantRepo>,
}

impl TenantUseCases {
    pub fn new(tenant_repo: Arc<dyn TenantRepo>) -> Self {
        Self { tenant_repo }
    }

    /// Tenants are created by platform admins only; the name is globally
    /// unique and duplicate names surface as `Conflict` from the constraint.
    pub async fn create(
        &self,
        ctx: &SecurityContext,
        input: CreateTenantInput,
    ) -> AppResult<Tenant> {
        if !ctx.is_authenticated() {
            return Err(AppError::InvalidCredentials);
        }
        if !ctx.can(Action::ManageTenants) {
            return Err(AppError::Forbidden);
        }
        let name = input.name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("Tenant name is required".into()));
        }
        self.tenant_repo
            .create(
                ctx,
                &CreateTenantInput {
                    name: name.to_string(),
                },
            )
            .await
    }

    pub async fn get(&self, ctx: &SecurityContext, id: Uuid) -> AppResult<Tenant> {
        // Members may read their own tenant; everything else reads as absent.
        let tenant = self
            .tenant_repo
            .get_by_id(ctx, id)
            .await?
            .ok_or(AppError::NotFound)?;
        if !ctx.owns(tenant.id) {
            return Err(AppError::NotFound);
        }
        Ok(tenant)
    }

    pub async fn list(&self, ctx: &SecurityContext) -> AppResult<Vec<Tenant>> {
        if ctx.is_admin {
            return self.tenant_repo.list(ctx).await;
        }
        // Non-admins see at most their own tenant.
        match ctx.tenant_id {
            Some(tenant_id) => Ok(self
                .tenant_repo
                .get_by_id(ctx, tenant_id)
                .await?
                .into_iter()
                .collect()),
            None => Ok(Vec::new()),
        }
    }
}
