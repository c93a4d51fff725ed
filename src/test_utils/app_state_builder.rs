//! Builds a fully wired [`AppState`] over the in-memory repos for
//! HTTP-level tests, plus helpers for minting auth headers.

use std::sync::Arc;

use axum::http::HeaderValue;
use secrecy::SecretString;
use time::Duration;
use uuid::Uuid;

use crate::{
    adapters::http::app_state::AppState,
    application::jwt,
    application::use_cases::{
        billing::BillingUseCases, membership::MembershipUseCases, plan::PlanUseCases,
        subscription::SubscriptionUseCases, tenant::TenantUseCases,
    },
    infra::config::AppConfig,
    test_utils::repo_mocks::{
        InMemoryBillingRepo, InMemoryMembershipRepo, InMemoryPlanRepo, InMemorySubscriptionRepo,
        InMemoryTenantRepo,
    },
};

pub const TEST_JWT_SECRET: &str = "test-jwt-secret";

pub struct TestHarness {
    pub app_state: AppState,
    pub tenants: Arc<InMemoryTenantRepo>,
    pub memberships: Arc<InMemoryMembershipRepo>,
    pub plans: Arc<InMemoryPlanRepo>,
    pub subscriptions: Arc<InMemorySubscriptionRepo>,
    pub billing: Arc<InMemoryBillingRepo>,
}

pub fn test_config() -> AppConfig {
    AppConfig {
        jwt_secret: SecretString::new(TEST_JWT_SECRET.into()),
        access_token_ttl: Duration::hours(1),
        cors_origin: HeaderValue::from_static("http://localhost:3000"),
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        database_url: "postgres://unused".to_string(),
    }
}

/// Wires every use case over fresh in-memory repos.
pub fn build_test_harness() -> TestHarness {
    let tenants = Arc::new(InMemoryTenantRepo::new());
    let memberships = Arc::new(InMemoryMembershipRepo::new());
    let plans = Arc::new(InMemoryPlanRepo::new());
    let subscriptions = Arc::new(InMemorySubscriptionRepo::new());
    let billing = Arc::new(InMemoryBillingRepo::new());

    let tenant_use_cases = TenantUseCases::new(tenants.clone());
    let membership_use_cases = MembershipUseCases::new(
        memberships.clone(),
        tenants.clone(),
        subscriptions.clone(),
        plans.clone(),
    );
    let plan_use_cases = PlanUseCases::new(plans.clone());
    let subscription_use_cases =
        SubscriptionUseCases::new(subscriptions.clone(), plans.clone());
    let billing_use_cases = BillingUseCases::new(
        billing.clone(),
        billing.clone(),
        subscriptions.clone(),
        plans.clone(),
    );

    let app_state = AppState {
        config: Arc::new(test_config()),
        tenant_use_cases: Arc::new(tenant_use_cases),
        membership_use_cases: Arc::new(membership_use_cases),
        plan_use_cases: Arc::new(plan_use_cases),
        subscription_use_cases: Arc::new(subscription_use_cases),
        billing_use_cases: Arc::new(billing_use_cases),
    };

    TestHarness {
        app_state,
        tenants,
        memberships,
        plans,
        subscriptions,
        billing,
    }
}

/// Mints a bearer token for the given user, signed with the test secret.
pub fn bearer_for(user_id: Uuid) -> String {
    let secret = SecretString::new(TEST_JWT_SECRET.into());
    let token = jwt::issue(user_id, &secret, Duration::hours(1)).unwrap();
    format!("Bearer {token}")
}
