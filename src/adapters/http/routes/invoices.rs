//! Invoice and payment routes: issue, pay (idempotent), provider webhook.

use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    adapters::http::app_state::AppState,
    app_error::AppResult,
    application::security::SecurityContext,
    application::use_cases::billing::{PayInput, WebhookInput},
    domain::entities::{
        invoice::{Invoice, InvoiceStatus},
        payment::{Payment, PaymentStatus},
    },
};

// ============================================================================
// Types
// ============================================================================

#[derive(Deserialize)]
struct CreateInvoicePayload {
    subscription_id: Uuid,
}

#[derive(Deserialize, Default)]
struct PayPayload {
    amount_cents: Option<i32>,
    idempotency_key: Option<String>,
    simulate: Option<String>,
}

#[derive(Deserialize)]
struct WebhookPayload {
    event_type: String,
    invoice_id: Uuid,
    amount_cents: Option<i32>,
}

#[derive(Serialize)]
struct InvoiceResponse {
    id: Uuid,
    tenant_id: Uuid,
    subscription_id: Uuid,
    amount_cents: i32,
    currency: String,
    status: InvoiceStatus,
    period_start: Option<i64>,
    period_end: Option<i64>,
    issued_at: Option<i64>,
    paid_at: Option<i64>,
}

#[derive(Serialize)]
struct PaymentResponse {
    id: Uuid,
    invoice_id: Uuid,
    amount_cents: i32,
    status: PaymentStatus,
    idempotency_key: Option<String>,
    provider_ref: String,
    created_at: Option<i64>,
}

#[derive(Serialize)]
struct PayResponse {
    invoice: InvoiceResponse,
    payment: PaymentResponse,
}

#[derive(Serialize)]
struct WebhookResponse {
    invoice: Option<InvoiceResponse>,
    payment: Option<PaymentResponse>,
}

fn invoice_response(invoice: Invoice) -> InvoiceResponse {
    InvoiceResponse {
        id: invoice.id,
        tenant_id: invoice.tenant_id,
        subscription_id: invoice.subscription_id,
        amount_cents: invoice.amount_cents,
        currency: invoice.currency,
        status: invoice.status,
        period_start: invoice.period_start.map(|dt| dt.timestamp()),
        period_end: invoice.period_end.map(|dt| dt.timestamp()),
        issued_at: invoice.issued_at.map(|dt| dt.timestamp()),
        paid_at: invoice.paid_at.map(|dt| dt.timestamp()),
    }
}

fn payment_response(payment: Payment) -> PaymentResponse {
    PaymentResponse {
        id: payment.id,
        invoice_id: payment.invoice_id,
        amount_cents: payment.amount_cents,
        status: payment.status,
        idempotency_key: payment.idempotency_key,
        provider_ref: payment.provider_ref,
        created_at: payment.created_at.map(|dt| dt.timestamp()),
    }
}

/// HeaderMap lookups are case-insensitive, so any casing of the
/// `Idempotency-Key` header lands here.
fn idempotency_key_header(headers: &HeaderMap) -> Option<String> {
    headers
        .get("idempotency-key")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/invoices
/// Issues an invoice against a subscription, freezing the current plan price.
async fn create_invoice(
    State(app_state): State<AppState>,
    Extension(ctx): Extension<SecurityContext>,
    Json(payload): Json<CreateInvoicePayload>,
) -> AppResult<impl IntoResponse> {
    let invoice = app_state
        .billing_use_cases
        .issue(&ctx, payload.subscription_id)
        .await?;
    Ok((StatusCode::CREATED, Json(invoice_response(invoice))))
}

/// GET /api/invoices
async fn list_invoices(
    State(app_state): State<AppState>,
    Extension(ctx): Extension<SecurityContext>,
) -> AppResult<impl IntoResponse> {
    let invoices = app_state.billing_use_cases.list(&ctx).await?;
    let response: Vec<InvoiceResponse> = invoices.into_iter().map(invoice_response).collect();
    Ok(Json(response))
}

/// GET /api/invoices/{id}
async fn get_invoice(
    State(app_state): State<AppState>,
    Extension(ctx): Extension<SecurityContext>,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let invoice = app_state.billing_use_cases.get(&ctx, id).await?;
    Ok(Json(invoice_response(invoice)))
}

/// GET /api/invoices/{id}/payments
async fn list_payments(
    State(app_state): State<AppState>,
    Extension(ctx): Extension<SecurityContext>,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let payments = app_state
        .billing_use_cases
        .payments_for_invoice(&ctx, id)
        .await?;
    let response: Vec<PaymentResponse> = payments.into_iter().map(payment_response).collect();
    Ok(Json(response))
}

/// POST /api/invoices/{id}/pay
/// Pays an invoice. The idempotency key comes from the body or the
/// `Idempotency-Key` header; a replayed key answers 202 with the prior
/// result, a simulated failure answers 402, an already-paid invoice 400.
async fn pay_invoice(
    State(app_state): State<AppState>,
    Extension(ctx): Extension<SecurityContext>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(payload): Json<PayPayload>,
) -> AppResult<impl IntoResponse> {
    let idempotency_key = payload
        .idempotency_key
        .or_else(|| idempotency_key_header(&headers));

    let outcome = app_state
        .billing_use_cases
        .pay(
            &ctx,
            id,
            PayInput {
                amount_cents: payload.amount_cents,
                idempotency_key,
                simulate: payload.simulate,
            },
        )
        .await?;

    let status = if outcome.replayed {
        StatusCode::ACCEPTED
    } else {
        StatusCode::OK
    };
    Ok((
        status,
        Json(PayResponse {
            invoice: invoice_response(outcome.invoice),
            payment: payment_response(outcome.payment),
        }),
    ))
}

/// POST /api/invoices/webhook
/// Asynchronous provider notification. Always answers 200; the payment in
/// the payload may be null on degenerate input.
async fn webhook(
    State(app_state): State<AppState>,
    Extension(ctx): Extension<SecurityContext>,
    Json(payload): Json<WebhookPayload>,
) -> AppResult<impl IntoResponse> {
    let outcome = app_state
        .billing_use_cases
        .webhook(
            &ctx,
            WebhookInput {
                event_type: payload.event_type,
                invoice_id: payload.invoice_id,
                amount_cents: payload.amount_cents,
            },
        )
        .await?;
    Ok(Json(WebhookResponse {
        invoice: outcome.invoice.map(invoice_response),
        payment: outcome.payment.map(payment_response),
    }))
}

// ============================================================================
// Router
// ============================================================================

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_invoice).get(list_invoices))
        .route("/webhook", post(webhook))
        .route("/{id}", get(get_invoice))
        .route("/{id}/payments", get(list_payments))
        .route("/{id}/pay", post(pay_invoice))
}
