//! Test data factories for creating valid test fixtures.
//!
//! Each factory function creates a complete, valid object with sensible
//! defaults. Use the closure parameter to override specific fields.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::entities::{
    invoice::{Invoice, InvoiceStatus},
    membership::{Membership, Role},
    plan::{BillingInterval, Plan},
    subscription::{Subscription, SubscriptionStatus},
    tenant::Tenant,
};

pub fn create_test_tenant(overrides: impl FnOnce(&mut Tenant)) -> Tenant {
    let mut tenant = Tenant {
        id: Uuid::new_v4(),
        name: "acme".to_string(),
        active: true,
        created_at: Some(test_datetime()),
    };
    overrides(&mut tenant);
    tenant
}

pub fn create_test_membership(
    tenant_id: Uuid,
    overrides: impl FnOnce(&mut Membership),
) -> Membership {
    let mut membership = Membership {
        id: Uuid::new_v4(),
        tenant_id,
        user_id: Uuid::new_v4(),
        email: format!("user-{}@example.com", Uuid::new_v4().simple()),
        role: Role::TenantUser,
        created_at: Some(test_datetime()),
    };
    overrides(&mut membership);
    membership
}

pub fn create_test_plan(overrides: impl FnOnce(&mut Plan)) -> Plan {
    let mut plan = Plan {
        id: Uuid::new_v4(),
        name: format!("basic-{}", Uuid::new_v4().simple()),
        description: "A basic plan".to_string(),
        price_cents: 999,
        interval: BillingInterval::Monthly,
        max_seats: 5,
        features: serde_json::json!({}),
        active: true,
        created_at: Some(test_datetime()),
    };
    overrides(&mut plan);
    plan
}

pub fn create_test_subscription(
    tenant_id: Uuid,
    plan_id: Uuid,
    overrides: impl FnOnce(&mut Subscription),
) -> Subscription {
    let now = test_datetime();
    let mut subscription = Subscription {
        id: Uuid::new_v4(),
        tenant_id,
        plan_id,
        status: SubscriptionStatus::Active,
        started_at: Some(now),
        current_period_end: None,
        cancel_at_period_end: false,
        created_at: Some(now),
        updated_at: Some(now),
    };
    overrides(&mut subscription);
    subscription
}

pub fn create_test_invoice(
    tenant_id: Uuid,
    subscription_id: Uuid,
    overrides: impl FnOnce(&mut Invoice),
) -> Invoice {
    let now = test_datetime();
    let mut invoice = Invoice {
        id: Uuid::new_v4(),
        tenant_id,
        subscription_id,
        amount_cents: 999,
        currency: "USD".to_string(),
        status: InvoiceStatus::Due,
        period_start: Some(now),
        period_end: None,
        issued_at: Some(now),
        paid_at: None,
        created_at: Some(now),
        updated_at: Some(now),
    };
    overrides(&mut invoice);
    invoice
}

/// Returns a consistent test datetime (2024-01-15 12:00:00 UTC).
fn test_datetime() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-01-15T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}
