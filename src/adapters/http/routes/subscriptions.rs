//! Subscription lifecycle routes: create, change plan, change status.

use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    adapters::http::app_state::AppState,
    app_error::AppResult,
    application::security::SecurityContext,
    domain::entities::subscription::{Subscription, SubscriptionStatus},
};

// ============================================================================
// Types
// ============================================================================

#[derive(Deserialize)]
struct CreateSubscriptionPayload {
    tenant_id: Option<Uuid>,
    plan_id: Uuid,
    status: Option<SubscriptionStatus>,
}

#[derive(Deserialize)]
struct ChangePlanPayload {
    plan_id: Uuid,
}

#[derive(Deserialize)]
struct ChangeStatusPayload {
    status: SubscriptionStatus,
}

#[derive(Serialize)]
pub(crate) struct SubscriptionResponse {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub plan_id: Uuid,
    pub status: SubscriptionStatus,
    pub started_at: Option<i64>,
    pub current_period_end: Option<i64>,
    pub cancel_at_period_end: bool,
    pub created_at: Option<i64>,
}

pub(crate) fn to_response(subscription: Subscription) -> SubscriptionResponse {
    SubscriptionResponse {
        id: subscription.id,
        tenant_id: subscription.tenant_id,
        plan_id: subscription.plan_id,
        status: subscription.status,
        started_at: subscription.started_at.map(|dt| dt.timestamp()),
        current_period_end: subscription.current_period_end.map(|dt| dt.timestamp()),
        cancel_at_period_end: subscription.cancel_at_period_end,
        created_at: subscription.created_at.map(|dt| dt.timestamp()),
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/subscriptions
/// Creates a subscription. Rejected with a Conflict when the tenant already
/// has an ACTIVE one.
async fn create_subscription(
    State(app_state): State<AppState>,
    Extension(ctx): Extension<SecurityContext>,
    Json(payload): Json<CreateSubscriptionPayload>,
) -> AppResult<impl IntoResponse> {
    let subscription = app_state
        .subscription_use_cases
        .create(&ctx, payload.tenant_id, payload.plan_id, payload.status)
        .await?;
    Ok((StatusCode::CREATED, Json(to_response(subscription))))
}

/// GET /api/subscriptions
async fn list_subscriptions(
    State(app_state): State<AppState>,
    Extension(ctx): Extension<SecurityContext>,
) -> AppResult<impl IntoResponse> {
    let subscriptions = app_state.subscription_use_cases.list(&ctx).await?;
    let response: Vec<SubscriptionResponse> =
        subscriptions.into_iter().map(to_response).collect();
    Ok(Json(response))
}

/// GET /api/subscriptions/{id}
async fn get_subscription(
    State(app_state): State<AppState>,
    Extension(ctx): Extension<SecurityContext>,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let subscription = app_state.subscription_use_cases.get(&ctx, id).await?;
    Ok(Json(to_response(subscription)))
}

/// POST /api/subscriptions/{id}/change-plan
/// Swaps the plan in place; already-issued invoices keep their snapshot.
async fn change_plan(
    State(app_state): State<AppState>,
    Extension(ctx): Extension<SecurityContext>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ChangePlanPayload>,
) -> AppResult<impl IntoResponse> {
    let subscription = app_state
        .subscription_use_cases
        .change_plan(&ctx, id, payload.plan_id)
        .await?;
    Ok(Json(to_response(subscription)))
}

/// POST /api/subscriptions/{id}/change-status
/// Tenant admin / platform admin only.
async fn change_status(
    State(app_state): State<AppState>,
    Extension(ctx): Extension<SecurityContext>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ChangeStatusPayload>,
) -> AppResult<impl IntoResponse> {
    let subscription = app_state
        .subscription_use_cases
        .change_status(&ctx, id, payload.status)
        .await?;
    Ok(Json(to_response(subscription)))
}

// ============================================================================
// Router
// ============================================================================

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_subscription).get(list_subscriptions))
        .route("/{id}", get(get_subscription))
        .route("/{id}/change-plan", post(change_plan))
        .route("/{id}/change-status", post(change_status))
}
