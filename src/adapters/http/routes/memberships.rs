//! Membership routes: member registration (seat-limit gated), member
//! listing, and the caller's own profile.

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
    application::use_cases::membership::CreateMembershipInput,
    domain::entities::membership::{Membership, Role},
};

// ============================================================================
// Types
// ============================================================================

#[derive(Deserialize)]
struct RegisterMemberPayload {
    user_id: Uuid,
    email: String,
    role: Option<Role>,
}

#[derive(Serialize)]
struct MembershipResponse {
    id: Uuid,
    tenant_id: Uuid,
    user_id: Uuid,
    email: String,
    role: Role,
    created_at: Option<i64>,
}

fn to_response(membership: Membership) -> MembershipResponse {
    MembershipResponse {
        id: membership.id,
        tenant_id: membership.tenant_id,
        user_id: membership.user_id,
        email: membership.email,
        role: membership.role,
        created_at: membership.created_at.map(|dt| dt.timestamp()),
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/tenants/{tenant_id}/members
/// Registers a member into the tenant. Refused once the active plan's seat
/// limit is reached (platform admins bypass the gate).
async fn register_member(
    State(app_state): State<AppState>,
    Extension(ctx): Extension<SecurityContext>,
    Path(tenant_id): Path<Uuid>,
    Json(payload): Json<RegisterMemberPayload>,
) -> AppResult<impl IntoResponse> {
    let membership = app_state
        .membership_use_cases
        .register(
            &ctx,
            CreateMembershipInput {
                tenant_id,
                user_id: payload.user_id,
                email: payload.email,
                role: payload.role.unwrap_or(Role::TenantUser),
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(to_response(membership))))
}

/// GET /api/tenants/{tenant_id}/members
async fn list_members(
    State(app_state): State<AppState>,
    Extension(ctx): Extension<SecurityContext>,
    Path(tenant_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let members = app_state
        .membership_use_cases
        .list_for_tenant(&ctx, tenant_id)
        .await?;
    let response: Vec<MembershipResponse> = members.into_iter().map(to_response).collect();
    Ok(Json(response))
}

/// GET /api/me
/// The caller's own membership profile.
async fn me(
    State(app_state): State<AppState>,
    Extension(ctx): Extension<SecurityContext>,
) -> AppResult<impl IntoResponse> {
    let membership = app_state.membership_use_cases.me(&ctx).await?;
    Ok(Json(to_response(membership)))
}

// ============================================================================
// Routers
// ============================================================================

/// Nested under /tenants. The segment is named `{id}` to line up with the
/// sibling tenant-detail route.
pub(crate) fn router() -> Router<AppState> {
    Router::new().route(
        "/{id}/members",
        axum::routing::post(register_member).get(list_members),
    )
}

/// Mounted at the API root.
pub(crate) fn me_router() -> Router<AppState> {
    Router::new().route("/me", get(me))
}
