use std::sync::Arc;

use crate::{
    application::use_cases::{
        billing::BillingUseCases, membership::MembershipUseCases, plan::PlanUseCases,
        subscription::SubscriptionUseCases, tenant::TenantUseCases,
    },
    infra::config::AppConfig,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub tenant_use_cases: Arc<TenantUseCases>,
    pub membership_use_cases: Arc<MembershipUseCases>,
    pub plan_use_cases: Arc<PlanUseCases>,
    pub subscription_use_cases: Arc<SubscriptionUseCases>,
    pub billing_use_cases: Arc<BillingUseCases>,
}
