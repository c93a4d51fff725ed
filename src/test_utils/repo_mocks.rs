//! In-memory mock implementations of the repository traits.
//!
//! The mocks mirror the Postgres adapters closely enough for use-case tests:
//! they apply the same tenant filter the real repos apply, and they emulate
//! the uniqueness constraints that act as the final arbiter of races
//! (one subscription per (tenant, status), one payment per
//! (invoice, idempotency_key)), surfacing violations as `Conflict` just like
//! the `From<sqlx::Error>` translation does.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::security::SecurityContext,
    application::use_cases::{
        billing::{CreateInvoiceInput, InvoiceRepo, PaymentRepo},
        membership::{CreateMembershipInput, MembershipRepo},
        plan::{CreatePlanInput, PlanRepo, UpdatePlanInput},
        subscription::{CreateSubscriptionInput, SubscriptionRepo},
        tenant::{CreateTenantInput, TenantRepo},
    },
    domain::entities::{
        invoice::{Invoice, InvoiceStatus},
        membership::Membership,
        payment::{Payment, PaymentStatus},
        plan::Plan,
        subscription::{Subscription, SubscriptionStatus},
        tenant::Tenant,
    },
};

fn visible(ctx: &SecurityContext, tenant_id: Uuid) -> bool {
    ctx.is_admin || ctx.tenant_id == Some(tenant_id)
}

// ============================================================================
// InMemoryTenantRepo
// ============================================================================

#[derive(Default)]
pub struct InMemoryTenantRepo {
    pub tenants: Mutex<HashMap<Uuid, Tenant>>,
}

impl InMemoryTenantRepo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a tenant directly, bypassing authorization.
    pub fn insert(&self, tenant: Tenant) -> Tenant {
        self.tenants
            .lock()
            .unwrap()
            .insert(tenant.id, tenant.clone());
        tenant
    }
}

#[async_trait]
impl TenantRepo for InMemoryTenantRepo {
    async fn get_by_id(&self, _ctx: &SecurityContext, id: Uuid) -> AppResult<Option<Tenant>> {
        Ok(self.tenants.lock().unwrap().get(&id).cloned())
    }

    async fn list(&self, _ctx: &SecurityContext) -> AppResult<Vec<Tenant>> {
        let mut all: Vec<Tenant> = self.tenants.lock().unwrap().values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(all)
    }

    async fn create(&self, _ctx: &SecurityContext, input: &CreateTenantInput) -> AppResult<Tenant> {
        let mut tenants = self.tenants.lock().unwrap();
        if tenants.values().any(|t| t.name == input.name) {
            return Err(AppError::Conflict(
                "A record with this value already exists".into(),
            ));
        }
        let tenant = Tenant {
            id: Uuid::new_v4(),
            name: input.name.clone(),
            active: true,
            created_at: Some(Utc::now()),
        };
        tenants.insert(tenant.id, tenant.clone());
        Ok(tenant)
    }
}

// ============================================================================
// InMemoryMembershipRepo
// ============================================================================

#[derive(Default)]
pub struct InMemoryMembershipRepo {
    pub memberships: Mutex<HashMap<Uuid, Membership>>,
}

impl InMemoryMembershipRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, membership: Membership) -> Membership {
        self.memberships
            .lock()
            .unwrap()
            .insert(membership.id, membership.clone());
        membership
    }
}

#[async_trait]
impl MembershipRepo for InMemoryMembershipRepo {
    async fn get_by_user(&self, user_id: Uuid) -> AppResult<Option<Membership>> {
        Ok(self
            .memberships
            .lock()
            .unwrap()
            .values()
            .find(|m| m.user_id == user_id)
            .cloned())
    }

    async fn list_by_tenant(
        &self,
        ctx: &SecurityContext,
        tenant_id: Uuid,
    ) -> AppResult<Vec<Membership>> {
        if !visible(ctx, tenant_id) {
            return Ok(Vec::new());
        }
        Ok(self
            .memberships
            .lock()
            .unwrap()
            .values()
            .filter(|m| m.tenant_id == tenant_id)
            .cloned()
            .collect())
    }

    async fn count_by_tenant(&self, ctx: &SecurityContext, tenant_id: Uuid) -> AppResult<i64> {
        if !visible(ctx, tenant_id) {
            return Ok(0);
        }
        Ok(self
            .memberships
            .lock()
            .unwrap()
            .values()
            .filter(|m| m.tenant_id == tenant_id)
            .count() as i64)
    }

    async fn create(
        &self,
        _ctx: &SecurityContext,
        input: &CreateMembershipInput,
    ) -> AppResult<Membership> {
        let mut memberships = self.memberships.lock().unwrap();
        if memberships
            .values()
            .any(|m| m.user_id == input.user_id && m.tenant_id == input.tenant_id)
        {
            return Err(AppError::Conflict(
                "A record with this value already exists".into(),
            ));
        }
        let membership = Membership {
            id: Uuid::new_v4(),
            tenant_id: input.tenant_id,
            user_id: input.user_id,
            email: input.email.clone(),
            role: input.role,
            created_at: Some(Utc::now()),
        };
        memberships.insert(membership.id, membership.clone());
        Ok(membership)
    }
}

// ============================================================================
// InMemoryPlanRepo
// ============================================================================

#[derive(Default)]
pub struct InMemoryPlanRepo {
    pub plans: Mutex<HashMap<Uuid, Plan>>,
}

impl InMemoryPlanRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, plan: Plan) -> Plan {
        self.plans.lock().unwrap().insert(plan.id, plan.clone());
        plan
    }
}

#[async_trait]
impl PlanRepo for InMemoryPlanRepo {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Plan>> {
        Ok(self.plans.lock().unwrap().get(&id).cloned())
    }

    async fn list(&self, active_only: bool) -> AppResult<Vec<Plan>> {
        let mut plans: Vec<Plan> = self
            .plans
            .lock()
            .unwrap()
            .values()
            .filter(|p| !active_only || p.active)
            .cloned()
            .collect();
        plans.sort_by(|a, b| a.price_cents.cmp(&b.price_cents).then(a.name.cmp(&b.name)));
        Ok(plans)
    }

    async fn create(&self, input: &CreatePlanInput) -> AppResult<Plan> {
        let mut plans = self.plans.lock().unwrap();
        if plans.values().any(|p| p.name == input.name) {
            return Err(AppError::Conflict(
                "A record with this value already exists".into(),
            ));
        }
        let plan = Plan {
            id: Uuid::new_v4(),
            name: input.name.clone(),
            description: input.description.clone(),
            price_cents: input.price_cents,
            interval: input.interval,
            max_seats: input.max_seats,
            features: input.features.clone(),
            active: input.active,
            created_at: Some(Utc::now()),
        };
        plans.insert(plan.id, plan.clone());
        Ok(plan)
    }

    async fn update(&self, id: Uuid, input: &UpdatePlanInput) -> AppResult<Plan> {
        let mut plans = self.plans.lock().unwrap();
        let plan = plans.get_mut(&id).ok_or(AppError::NotFound)?;
        if let Some(description) = &input.description {
            plan.description = description.clone();
        }
        if let Some(price_cents) = input.price_cents {
            plan.price_cents = price_cents;
        }
        if let Some(interval) = input.interval {
            plan.interval = interval;
        }
        if let Some(max_seats) = input.max_seats {
            plan.max_seats = max_seats;
        }
        if let Some(features) = &input.features {
            plan.features = features.clone();
        }
        if let Some(active) = input.active {
            plan.active = active;
        }
        Ok(plan.clone())
    }
}

// ============================================================================
// InMemorySubscriptionRepo
// ============================================================================

#[derive(Default)]
pub struct InMemorySubscriptionRepo {
    pub subscriptions: Mutex<HashMap<Uuid, Subscription>>,
}

impl InMemorySubscriptionRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, subscription: Subscription) -> Subscription {
        self.subscriptions
            .lock()
            .unwrap()
            .insert(subscription.id, subscription.clone());
        subscription
    }

    pub fn count_for_tenant(&self, tenant_id: Uuid) -> usize {
        self.subscriptions
            .lock()
            .unwrap()
            .values()
            .filter(|s| s.tenant_id == tenant_id)
            .count()
    }

    fn unique_violation(
        subscriptions: &HashMap<Uuid, Subscription>,
        tenant_id: Uuid,
        status: SubscriptionStatus,
        exclude: Option<Uuid>,
    ) -> bool {
        subscriptions.values().any(|s| {
            s.tenant_id == tenant_id && s.status == status && Some(s.id) != exclude
        })
    }
}

#[async_trait]
impl SubscriptionRepo for InMemorySubscriptionRepo {
    async fn get_by_id(&self, ctx: &SecurityContext, id: Uuid) -> AppResult<Option<Subscription>> {
        Ok(self
            .subscriptions
            .lock()
            .unwrap()
            .get(&id)
            .filter(|s| visible(ctx, s.tenant_id))
            .cloned())
    }

    async fn list(&self, ctx: &SecurityContext) -> AppResult<Vec<Subscription>> {
        Ok(self
            .subscriptions
            .lock()
            .unwrap()
            .values()
            .filter(|s| visible(ctx, s.tenant_id))
            .cloned()
            .collect())
    }

    async fn find_active_by_tenant(
        &self,
        ctx: &SecurityContext,
        tenant_id: Uuid,
    ) -> AppResult<Option<Subscription>> {
        if !visible(ctx, tenant_id) {
            return Ok(None);
        }
        Ok(self
            .subscriptions
            .lock()
            .unwrap()
            .values()
            .find(|s| s.tenant_id == tenant_id && s.status == SubscriptionStatus::Active)
            .cloned())
    }

    async fn create(
        &self,
        _ctx: &SecurityContext,
        input: &CreateSubscriptionInput,
    ) -> AppResult<Subscription> {
        let mut subscriptions = self.subscriptions.lock().unwrap();
        if Self::unique_violation(&subscriptions, input.tenant_id, input.status, None) {
            return Err(AppError::Conflict(
                "A record with this value already exists".into(),
            ));
        }
        let now = Utc::now();
        let subscription = Subscription {
            id: Uuid::new_v4(),
            tenant_id: input.tenant_id,
            plan_id: input.plan_id,
            status: input.status,
            started_at: Some(now),
            current_period_end: None,
            cancel_at_period_end: false,
            created_at: Some(now),
            updated_at: Some(now),
        };
        subscriptions.insert(subscription.id, subscription.clone());
        Ok(subscription)
    }

    async fn update_plan(
        &self,
        ctx: &SecurityContext,
        id: Uuid,
        plan_id: Uuid,
    ) -> AppResult<Subscription> {
        let mut subscriptions = self.subscriptions.lock().unwrap();
        let subscription = subscriptions
            .get_mut(&id)
            .filter(|s| visible(ctx, s.tenant_id))
            .ok_or(AppError::NotFound)?;
        subscription.plan_id = plan_id;
        subscription.updated_at = Some(Utc::now());
        Ok(subscription.clone())
    }

    async fn update_status(
        &self,
        ctx: &SecurityContext,
        id: Uuid,
        status: SubscriptionStatus,
    ) -> AppResult<Subscription> {
        let mut subscriptions = self.subscriptions.lock().unwrap();
        let current = subscriptions
            .get(&id)
            .filter(|s| visible(ctx, s.tenant_id))
            .cloned()
            .ok_or(AppError::NotFound)?;
        if Self::unique_violation(&subscriptions, current.tenant_id, status, Some(id)) {
            return Err(AppError::Conflict(
                "A record with this value already exists".into(),
            ));
        }
        let subscription = subscriptions.get_mut(&id).unwrap();
        subscription.status = status;
        subscription.updated_at = Some(Utc::now());
        Ok(subscription.clone())
    }
}

// ============================================================================
// InMemoryBillingRepo (invoices + payments, one store for atomic updates)
// ============================================================================

#[derive(Default)]
pub struct InMemoryBillingRepo {
    pub invoices: Mutex<HashMap<Uuid, Invoice>>,
    pub payments: Mutex<Vec<Payment>>,
}

impl InMemoryBillingRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_invoice(&self, invoice: Invoice) -> Invoice {
        self.invoices
            .lock()
            .unwrap()
            .insert(invoice.id, invoice.clone());
        invoice
    }

    fn push_payment(
        payments: &mut Vec<Payment>,
        invoice: &Invoice,
        amount_cents: i32,
        status: PaymentStatus,
        idempotency_key: Option<&str>,
    ) -> AppResult<Payment> {
        if idempotency_key.is_some_and(|key| {
            payments
                .iter()
                .any(|p| p.invoice_id == invoice.id && p.idempotency_key.as_deref() == Some(key))
        }) {
            return Err(AppError::Conflict(
                "A record with this value already exists".into(),
            ));
        }
        let payment = Payment {
            id: Uuid::new_v4(),
            invoice_id: invoice.id,
            tenant_id: invoice.tenant_id,
            amount_cents,
            status,
            idempotency_key: idempotency_key.map(str::to_string),
            provider_ref: "mock_txn".to_string(),
            created_at: Some(Utc::now()),
        };
        payments.push(payment.clone());
        Ok(payment)
    }
}

#[async_trait]
impl InvoiceRepo for InMemoryBillingRepo {
    async fn get_by_id(&self, ctx: &SecurityContext, id: Uuid) -> AppResult<Option<Invoice>> {
        Ok(self
            .invoices
            .lock()
            .unwrap()
            .get(&id)
            .filter(|i| visible(ctx, i.tenant_id))
            .cloned())
    }

    async fn list(&self, ctx: &SecurityContext) -> AppResult<Vec<Invoice>> {
        Ok(self
            .invoices
            .lock()
            .unwrap()
            .values()
            .filter(|i| visible(ctx, i.tenant_id))
            .cloned()
            .collect())
    }

    async fn create(
        &self,
        _ctx: &SecurityContext,
        input: &CreateInvoiceInput,
    ) -> AppResult<Invoice> {
        let now = Utc::now();
        let invoice = Invoice {
            id: Uuid::new_v4(),
            tenant_id: input.tenant_id,
            subscription_id: input.subscription_id,
            amount_cents: input.amount_cents,
            currency: input.currency.clone(),
            status: InvoiceStatus::Due,
            period_start: Some(now),
            period_end: None,
            issued_at: Some(now),
            paid_at: None,
            created_at: Some(now),
            updated_at: Some(now),
        };
        self.invoices
            .lock()
            .unwrap()
            .insert(invoice.id, invoice.clone());
        Ok(invoice)
    }
}

#[async_trait]
impl PaymentRepo for InMemoryBillingRepo {
    async fn get_by_key(
        &self,
        ctx: &SecurityContext,
        invoice_id: Uuid,
        idempotency_key: &str,
    ) -> AppResult<Option<Payment>> {
        Ok(self
            .payments
            .lock()
            .unwrap()
            .iter()
            .find(|p| {
                p.invoice_id == invoice_id
                    && p.idempotency_key.as_deref() == Some(idempotency_key)
                    && visible(ctx, p.tenant_id)
            })
            .cloned())
    }

    async fn latest_for_invoice(
        &self,
        ctx: &SecurityContext,
        invoice_id: Uuid,
    ) -> AppResult<Option<Payment>> {
        Ok(self
            .payments
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.invoice_id == invoice_id && visible(ctx, p.tenant_id))
            .next_back()
            .cloned())
    }

    async fn list_by_invoice(
        &self,
        ctx: &SecurityContext,
        invoice_id: Uuid,
    ) -> AppResult<Vec<Payment>> {
        Ok(self
            .payments
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.invoice_id == invoice_id && visible(ctx, p.tenant_id))
            .cloned()
            .collect())
    }

    async fn record_failure(
        &self,
        _ctx: &SecurityContext,
        invoice: &Invoice,
        amount_cents: i32,
        idempotency_key: Option<&str>,
    ) -> AppResult<Payment> {
        let mut payments = self.payments.lock().unwrap();
        Self::push_payment(
            &mut payments,
            invoice,
            amount_cents,
            PaymentStatus::Failed,
            idempotency_key,
        )
    }

    async fn record_success(
        &self,
        _ctx: &SecurityContext,
        invoice: &Invoice,
        amount_cents: i32,
        idempotency_key: Option<&str>,
    ) -> AppResult<(Invoice, Payment)> {
        // Payment insert and invoice flip happen under one lock, mirroring
        // the single transaction of the Postgres adapter (whose guarded
        // UPDATE only flips a DUE invoice and rolls back otherwise).
        let mut payments = self.payments.lock().unwrap();
        let mut invoices = self.invoices.lock().unwrap();
        let stored = invoices.get_mut(&invoice.id).ok_or(AppError::NotFound)?;
        if stored.status != InvoiceStatus::Due {
            return Err(AppError::Conflict("Invoice already paid".into()));
        }
        let payment = Self::push_payment(
            &mut payments,
            invoice,
            amount_cents,
            PaymentStatus::Succeeded,
            idempotency_key,
        )?;
        let now = Utc::now();
        stored.status = InvoiceStatus::Paid;
        stored.paid_at = Some(now);
        stored.updated_at = Some(now);
        Ok((stored.clone(), payment))
    }
}
