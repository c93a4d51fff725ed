//! Request-scoped security context and the role x action decision table.
//!
//! The context is resolved once per request by the auth middleware and passed
//! explicitly into every use-case and repository call. Repositories feed it
//! into transaction-local Postgres settings so the row-security policies see
//! the same identity the application filter sees.

use uuid::Uuid;

use crate::domain::entities::membership::Role;

/// Who is calling, which tenant they belong to, and whether tenant scoping
/// is bypassed. `tenant_id` is `None` for platform admins and for anonymous
/// callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecurityContext {
    pub principal: Option<Uuid>,
    pub tenant_id: Option<Uuid>,
    pub role: Option<Role>,
    pub is_admin: bool,
}

impl SecurityContext {
    pub fn anonymous() -> Self {
        Self {
            principal: None,
            tenant_id: None,
            role: None,
            is_admin: false,
        }
    }

    pub fn admin(principal: Uuid) -> Self {
        Self {
            principal: Some(principal),
            tenant_id: None,
            role: Some(Role::PlatformAdmin),
            is_admin: true,
        }
    }

    pub fn member(principal: Uuid, tenant_id: Uuid, role: Role) -> Self {
        Self {
            principal: Some(principal),
            tenant_id: Some(tenant_id),
            role: Some(role),
            is_admin: false,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.principal.is_some()
    }

    /// Tenant-ownership predicate: admins own everything, members own rows
    /// stamped with their tenant, anonymous callers own nothing.
    pub fn owns(&self, tenant_id: Uuid) -> bool {
        self.is_admin || self.tenant_id == Some(tenant_id)
    }

    /// Single authorization entry point evaluated once per operation.
    pub fn can(&self, action: Action) -> bool {
        match self.role {
            Some(role) => allows(role, action),
            None => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    CreateSubscription,
    ChangePlan,
    ChangeStatus,
    IssueInvoice,
    PayInvoice,
    ManageTenants,
    ManagePlans,
    AddMember,
}

/// Role x action decision table. Ownership of the target tenant is checked
/// separately via [`SecurityContext::owns`]; this table only answers whether
/// the role may perform the action at all.
pub fn allows(role: Role, action: Action) -> bool {
    use Action::*;
    match role {
        Role::PlatformAdmin => true,
        Role::TenantAdmin => matches!(
            action,
            Read | CreateSubscription | ChangePlan | ChangeStatus | IssueInvoice | PayInvoice
                | AddMember
        ),
        Role::TenantUser => matches!(
            action,
            Read | CreateSubscription | ChangePlan | IssueInvoice | PayInvoice
        ),
    }
}
