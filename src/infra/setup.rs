use std::fs::File;
use std::sync::Arc;

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    adapters::{http::app_state::AppState, persistence::PostgresPersistence},
    application::use_cases::{
        billing::{BillingUseCases, InvoiceRepo, PaymentRepo},
        membership::{MembershipRepo, MembershipUseCases},
        plan::{PlanRepo, PlanUseCases},
        subscription::{SubscriptionRepo, SubscriptionUseCases},
        tenant::{TenantRepo, TenantUseCases},
    },
    infra::{config::AppConfig, db::init_db},
};

pub async fn init_app_state() -> anyhow::Result<AppState> {
    let config = AppConfig::from_env();

    let pool = init_db(&config.database_url).await?;
    let postgres_arc = Arc::new(PostgresPersistence::new(pool));

    let tenant_repo = postgres_arc.clone() as Arc<dyn TenantRepo>;
    let membership_repo = postgres_arc.clone() as Arc<dyn MembershipRepo>;
    let plan_repo = postgres_arc.clone() as Arc<dyn PlanRepo>;
    let subscription_repo = postgres_arc.clone() as Arc<dyn SubscriptionRepo>;
    let invoice_repo = postgres_arc.clone() as Arc<dyn InvoiceRepo>;
    let payment_repo = postgres_arc.clone() as Arc<dyn PaymentRepo>;

    let tenant_use_cases = TenantUseCases::new(tenant_repo.clone());
    let membership_use_cases = MembershipUseCases::new(
        membership_repo.clone(),
        tenant_repo.clone(),
        subscription_repo.clone(),
        plan_repo.clone(),
    );
    let plan_use_cases = PlanUseCases::new(plan_repo.clone());
    let subscription_use_cases =
        SubscriptionUseCases::new(subscription_repo.clone(), plan_repo.clone());
    let billing_use_cases = BillingUseCases::new(
        invoice_repo,
        payment_repo,
        subscription_repo,
        plan_repo,
    );

    Ok(AppState {
        config: Arc::new(config),
        tenant_use_cases: Arc::new(tenant_use_cases),
        membership_use_cases: Arc::new(membership_use_cases),
        plan_use_cases: Arc::new(plan_use_cases),
        subscription_use_cases: Arc::new(subscription_use_cases),
        billing_use_cases: Arc::new(billing_use_cases),
    })
}

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "subgate=debug,tower_http=debug".into());

    // Console (pretty logs)
    let console_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .pretty();

    // File (structured JSON logs)
    let file = File::create("app.log").expect("cannot create log file");
    let json_layer = fmt::layer()
        .json()
        .with_writer(file)
        .with_current_span(true)
        .with_span_list(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(json_layer)
        .try_init()
        .ok();
}
