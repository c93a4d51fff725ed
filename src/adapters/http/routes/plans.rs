//! Plan catalog routes: browsing for everyone authenticated, mutation for
//! platform admins.

use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    adapters::http::app_state::AppState,
    app_error::AppResult,
    application::security::SecurityContext,
    application::use_cases::plan::{CreatePlanInput, UpdatePlanInput},
    domain::entities::plan::{BillingInterval, Plan},
};

// ============================================================================
// Types
// ============================================================================

#[derive(Deserialize)]
struct CreatePlanPayload {
    name: String,
    description: Option<String>,
    price_cents: i32,
    interval: BillingInterval,
    max_seats: i32,
    features: Option<serde_json::Value>,
    active: Option<bool>,
}

#[derive(Deserialize, Default)]
struct UpdatePlanPayload {
    description: Option<String>,
    price_cents: Option<i32>,
    interval: Option<BillingInterval>,
    max_seats: Option<i32>,
    features: Option<serde_json::Value>,
    active: Option<bool>,
}

#[derive(Serialize)]
struct PlanResponse {
    id: Uuid,
    name: String,
    description: String,
    price_cents: i32,
    interval: BillingInterval,
    max_seats: i32,
    features: serde_json::Value,
    active: bool,
    created_at: Option<i64>,
}

fn to_response(plan: Plan) -> PlanResponse {
    PlanResponse {
        id: plan.id,
        name: plan.name,
        description: plan.description,
        price_cents: plan.price_cents,
        interval: plan.interval,
        max_seats: plan.max_seats,
        features: plan.features,
        active: plan.active,
        created_at: plan.created_at.map(|dt| dt.timestamp()),
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/plans
async fn list_plans(
    State(app_state): State<AppState>,
    Extension(ctx): Extension<SecurityContext>,
) -> AppResult<impl IntoResponse> {
    let plans = app_state.plan_use_cases.list(&ctx).await?;
    let response: Vec<PlanResponse> = plans.into_iter().map(to_response).collect();
    Ok(Json(response))
}

/// GET /api/plans/{id}
async fn get_plan(
    State(app_state): State<AppState>,
    Extension(ctx): Extension<SecurityContext>,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let plan = app_state.plan_use_cases.get(&ctx, id).await?;
    Ok(Json(to_response(plan)))
}

/// POST /api/plans
/// Adds a catalog entry (platform admin only).
async fn create_plan(
    State(app_state): State<AppState>,
    Extension(ctx): Extension<SecurityContext>,
    Json(payload): Json<CreatePlanPayload>,
) -> AppResult<impl IntoResponse> {
    let plan = app_state
        .plan_use_cases
        .create(
            &ctx,
            CreatePlanInput {
                name: payload.name,
                description: payload.description.unwrap_or_default(),
                price_cents: payload.price_cents,
                interval: payload.interval,
                max_seats: payload.max_seats,
                features: payload.features.unwrap_or_else(|| serde_json::json!({})),
                active: payload.active.unwrap_or(true),
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(to_response(plan))))
}

/// PATCH /api/plans/{id}
async fn update_plan(
    State(app_state): State<AppState>,
    Extension(ctx): Extension<SecurityContext>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePlanPayload>,
) -> AppResult<impl IntoResponse> {
    let plan = app_state
        .plan_use_cases
        .update(
            &ctx,
            id,
            UpdatePlanInput {
                description: payload.description,
                price_cents: payload.price_cents,
                interval: payload.interval,
                max_seats: payload.max_seats,
                features: payload.features,
                active: payload.active,
            },
        )
        .await?;
    Ok(Json(to_response(plan)))
}

// ============================================================================
// Router
// ============================================================================

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_plans).post(create_plan))
        .route("/{id}", get(get_plan).patch(update_plan))
}
