use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::security::{Action, SecurityContext},
    domain::entities::{
        invoice::{Invoice, InvoiceStatus},
        payment::Payment,
    },
};

use super::{plan::PlanRepo, subscription::SubscriptionRepo};

pub const DEFAULT_CURRENCY: &str = "USD";

#[derive(Debug, Clone)]
pub struct CreateInvoiceInput {
    pub tenant_id: Uuid,
    pub subscription_id: Uuid,
    pub amount_cents: i32,
    pub currency: String,
}

#[derive(Debug, Clone, Default)]
pub struct PayInput {
    pub amount_cents: Option<i32>,
    pub idempotency_key: Option<String>,
    pub simulate: Option<String>,
}

#[derive(Debug, Clone)]
pub struct WebhookInput {
    pub event_type: String,
    pub invoice_id: Uuid,
    pub amount_cents: Option<i32>,
}

/// Result of a pay call. `replayed` marks an idempotent replay: the prior
/// payment is returned unchanged and nothing was written.
#[derive(Debug, Clone)]
pub struct PayOutcome {
    pub invoice: Invoice,
    pub payment: Payment,
    pub replayed: bool,
}

/// Result of a webhook notification; both sides are optional because a
/// degenerate payload still gets a 200.
#[derive(Debug, Clone)]
pub struct WebhookOutcome {
    pub invoice: Option<Invoice>,
    pub payment: Option<Payment>,
}

#[async_trait]
pub trait InvoiceRepo: Send + Sync {
    async fn get_by_id(&self, ctx: &SecurityContext, id: Uuid) -> AppResult<Option<Invoice>>;
    async fn list(&self, ctx: &SecurityContext) -> AppResult<Vec<Invoice>>;
    async fn create(&self, ctx: &SecurityContext, input: &CreateInvoiceInput)
    -> AppResult<Invoice>;
}

#[async_trait]
pub trait PaymentRepo: Send + Sync {
    async fn get_by_key(
        &self,
        ctx: &SecurityContext,
        invoice_id: Uuid,
        idempotency_key: &str,
    ) -> AppResult<Option<Payment>>;
    async fn latest_for_invoice(
        &self,
        ctx: &SecurityContext,
        invoice_id: Uuid,
    ) -> AppResult<Option<Payment>>;
    async fn list_by_invoice(
        &self,
        ctx: &SecurityContext,
        invoice_id: Uuid,
    ) -> AppResult<Vec<Payment>>;
    /// Records a FAILED attempt. The invoice row is not touched.
    async fn record_failure(
        &self,
        ctx: &SecurityContext,
        invoice: &Invoice,
        amount_cents: i32,
        idempotency_key: Option<&str>,
    ) -> AppResult<Payment>;
    /// Records a SUCCEEDED payment and flips the invoice to PAID, stamping
    /// `paid_at`, as one atomic unit.
    async fn record_success(
        &self,
        ctx: &SecurityContext,
        invoice: &Invoice,
        amount_cents: i32,
        idempotency_key: Option<&str>,
    ) -> AppResult<(Invoice, Payment)>;
}

#[derive(Clone)]
pub struct BillingUseCases {
    invoice_repo: Arc<dyn InvoiceRepo>,
    payment_repo: Arc<dyn PaymentRepo>,
    subscription_repo: Arc<dyn SubscriptionRepo>,
    plan_repo: Arc<dyn PlanRepo>,
}

impl BillingUseCases {
    pub fn new(
        invoice_repo: Arc<dyn InvoiceRepo>,
        payment_repo: Arc<dyn PaymentRepo>,
        subscription_repo: Arc<dyn SubscriptionRepo>,
        plan_repo: Arc<dyn PlanRepo>,
    ) -> Self {
        Self {
            invoice_repo,
            payment_repo,
            subscription_repo,
            plan_repo,
        }
    }

    /// Issues an invoice against a subscription, freezing the plan price at
    /// this moment. Later plan changes do not touch it.
    pub async fn issue(&self, ctx: &SecurityContext, subscription_id: Uuid) -> AppResult<Invoice> {
        if !ctx.is_authenticated() {
            return Err(AppError::InvalidCredentials);
        }
        if !ctx.can(Action::IssueInvoice) {
            return Err(AppError::Forbidden);
        }
        let subscription = self
            .subscription_repo
            .get_by_id(ctx, subscription_id)
            .await?
            .ok_or(AppError::NotFound)?;
        if !ctx.owns(subscription.tenant_id) {
            return Err(AppError::Forbidden);
        }
        let plan = self
            .plan_repo
            .get_by_id(subscription.plan_id)
            .await?
            .ok_or_else(|| AppError::Validation("Subscription has no plan".into()))?;

        self.invoice_repo
            .create(
                ctx,
                &CreateInvoiceInput {
                    tenant_id: subscription.tenant_id,
                    subscription_id: subscription.id,
                    amount_cents: plan.price_cents,
                    currency: DEFAULT_CURRENCY.to_string(),
                },
            )
            .await
    }

    /// Processes a payment attempt against an invoice.
    ///
    /// Order matters: an already-PAID invoice is a Conflict before anything
    /// else; a matching idempotency key replays the prior attempt with zero
    /// side effects; only then is a new payment row written.
    pub async fn pay(
        &self,
        ctx: &SecurityContext,
        invoice_id: Uuid,
        input: PayInput,
    ) -> AppResult<PayOutcome> {
        if !ctx.is_authenticated() {
            return Err(AppError::InvalidCredentials);
        }
        if !ctx.can(Action::PayInvoice) {
            return Err(AppError::Forbidden);
        }
        let invoice = self
            .invoice_repo
            .get_by_id(ctx, invoice_id)
            .await?
            .ok_or(AppError::NotFound)?;
        if !ctx.owns(invoice.tenant_id) {
            return Err(AppError::NotFound);
        }

        if invoice.status == InvoiceStatus::Paid {
            return Err(AppError::Conflict("Invoice already paid".into()));
        }

        if let Some(key) = input.idempotency_key.as_deref() {
            if let Some(prior) = self.payment_repo.get_by_key(ctx, invoice.id, key).await? {
                tracing::debug!(
                    invoice_id = %invoice.id,
                    idempotency_key = key,
                    "Replaying prior payment attempt"
                );
                return Ok(PayOutcome {
                    invoice,
                    payment: prior,
                    replayed: true,
                });
            }
        }

        let amount_cents = input.amount_cents.unwrap_or(invoice.amount_cents);
        if amount_cents < 0 {
            return Err(AppError::Validation("amount_cents must not be negative".into()));
        }

        if input.simulate.as_deref() == Some("fail") {
            self.payment_repo
                .record_failure(
                    ctx,
                    &invoice,
                    amount_cents,
                    input.idempotency_key.as_deref(),
                )
                .await?;
            return Err(AppError::PaymentRequired("Simulated payment failure".into()));
        }

        let (invoice, payment) = self
            .payment_repo
            .record_success(
                ctx,
                &invoice,
                amount_cents,
                input.idempotency_key.as_deref(),
            )
            .await?;
        Ok(PayOutcome {
            invoice,
            payment,
            replayed: false,
        })
    }

    /// Reconciles an out-of-band provider notification against invoice
    /// state. Always succeeds at the HTTP level; degenerate input yields an
    /// empty outcome.
    pub async fn webhook(
        &self,
        ctx: &SecurityContext,
        input: WebhookInput,
    ) -> AppResult<WebhookOutcome> {
        if !ctx.is_authenticated() {
            return Err(AppError::InvalidCredentials);
        }
        let Some(invoice) = self.invoice_repo.get_by_id(ctx, input.invoice_id).await? else {
            tracing::warn!(
                invoice_id = %input.invoice_id,
                event_type = %input.event_type,
                "Webhook for unknown invoice, ignoring"
            );
            return Ok(WebhookOutcome {
                invoice: None,
                payment: None,
            });
        };
        let amount_cents = input.amount_cents.unwrap_or(invoice.amount_cents);

        match input.event_type.as_str() {
            "failed" => {
                // A failure notification never un-pays a paid invoice and
                // never blocks a later success; it only leaves a trace.
                let payment = self
                    .payment_repo
                    .record_failure(ctx, &invoice, amount_cents, None)
                    .await?;
                Ok(WebhookOutcome {
                    invoice: Some(invoice),
                    payment: Some(payment),
                })
            }
            "succeeded" => {
                if invoice.status == InvoiceStatus::Paid {
                    // Replay: one transition already happened, return the
                    // most recent payment instead of writing another.
                    let payment = self.payment_repo.latest_for_invoice(ctx, invoice.id).await?;
                    return Ok(WebhookOutcome {
                        invoice: Some(invoice),
                        payment,
                    });
                }
                if invoice.status == InvoiceStatus::Void {
                    // VOID is terminal; a late success notification for a
                    // voided invoice is degenerate input.
                    return Ok(WebhookOutcome {
                        invoice: Some(invoice),
                        payment: None,
                    });
                }
                let (invoice, payment) = self
                    .payment_repo
                    .record_success(ctx, &invoice, amount_cents, None)
                    .await?;
                Ok(WebhookOutcome {
                    invoice: Some(invoice),
                    payment: Some(payment),
                })
            }
            other => {
                tracing::warn!(event_type = other, "Unknown webhook event type, ignoring");
                Ok(WebhookOutcome {
                    invoice: Some(invoice),
                    payment: None,
                })
            }
        }
    }

    pub async fn get(&self, ctx: &SecurityContext, id: Uuid) -> AppResult<Invoice> {
        let invoice = self
            .invoice_repo
            .get_by_id(ctx, id)
            .await?
            .ok_or(AppError::NotFound)?;
        if !ctx.owns(invoice.tenant_id) {
            return Err(AppError::NotFound);
        }
        Ok(invoice)
    }

    pub async fn list(&self, ctx: &SecurityContext) -> AppResult<Vec<Invoice>> {
        if !ctx.is_admin && ctx.tenant_id.is_none() {
            return Ok(Vec::new());
        }
        self.invoice_repo.list(ctx).await
    }

    pub async fn payments_for_invoice(
        &self,
        ctx: &SecurityContext,
        invoice_id: Uuid,
    ) -> AppResult<Vec<Payment>> {
        // Visibility check doubles as the isolation filter.
        self.get(ctx, invoice_id).await?;
        self.payment_repo.list_by_invoice(ctx, invoice_id).await
    }
}
