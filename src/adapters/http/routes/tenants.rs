//! Tenant administration routes: create, list, detail.

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
    application::use_cases::tenant::CreateTenantInput,
    domain::entities::tenant::Tenant,
};

// ============================================================================
// Types
// ============================================================================

#[derive(Deserialize)]
struct CreateTenantPayload {
    name: String,
}

#[derive(Serialize)]
pub(crate) struct TenantResponse {
    pub id: Uuid,
    pub name: String,
    pub active: bool,
    pub created_at: Option<i64>,
}

pub(crate) fn to_response(tenant: Tenant) -> TenantResponse {
    TenantResponse {
        id: tenant.id,
        name: tenant.name,
        active: tenant.active,
        created_at: tenant.created_at.map(|dt| dt.timestamp()),
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/tenants
/// Creates a tenant (platform admin only).
async fn create_tenant(
    State(app_state): State<AppState>,
    Extension(ctx): Extension<SecurityContext>,
    Json(payload): Json<CreateTenantPayload>,
) -> AppResult<impl IntoResponse> {
    let tenant = app_state
        .tenant_use_cases
        .create(&ctx, CreateTenantInput { name: payload.name })
        .await?;
    Ok((StatusCode::CREATED, Json(to_response(tenant))))
}

/// GET /api/tenants
/// Lists tenants: all of them for platform admins, the caller's own
/// otherwise.
async fn list_tenants(
    State(app_state): State<AppState>,
    Extension(ctx): Extension<SecurityContext>,
) -> AppResult<impl IntoResponse> {
    let tenants = app_state.tenant_use_cases.list(&ctx).await?;
    let response: Vec<TenantResponse> = tenants.into_iter().map(to_response).collect();
    Ok(Json(response))
}

/// GET /api/tenants/{id}
async fn get_tenant(
    State(app_state): State<AppState>,
    Extension(ctx): Extension<SecurityContext>,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let tenant = app_state.tenant_use_cases.get(&ctx, id).await?;
    Ok(Json(to_response(tenant)))
}

// ============================================================================
// Router
// ============================================================================

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_tenant).get(list_tenants))
        .route("/{id}", get(get_tenant))
}

#[cfg(test)]
mod tests {
    use axum_test::TestServer;
    use serde_json::json;

    use crate::domain::entities::membership::Role;
    use crate::infra::app::create_app;
    use crate::test_utils::app_state_builder::{bearer_for, build_test_harness};
    use crate::test_utils::factories::{create_test_membership, create_test_tenant};

    #[tokio::test]
    async fn only_platform_admins_create_tenants() {
        let harness = build_test_harness();
        let home = harness.tenants.insert(create_test_tenant(|_| {}));
        let admin = harness
            .memberships
            .insert(create_test_membership(home.id, |m| {
                m.role = Role::PlatformAdmin;
            }));
        let member = harness
            .memberships
            .insert(create_test_membership(home.id, |m| {
                m.role = Role::TenantAdmin;
            }));
        let server = TestServer::new(create_app(harness.app_state.clone())).unwrap();

        let res = server
            .post("/api/tenants")
            .add_header("authorization", bearer_for(member.user_id))
            .json(&json!({ "name": "newco" }))
            .await;
        assert_eq!(res.status_code(), 403);

        let res = server
            .post("/api/tenants")
            .add_header("authorization", bearer_for(admin.user_id))
            .json(&json!({ "name": "newco" }))
            .await;
        assert_eq!(res.status_code(), 201);
        assert_eq!(res.json::<serde_json::Value>()["name"], "newco");

        // Duplicate names collide on the unique constraint.
        let res = server
            .post("/api/tenants")
            .add_header("authorization", bearer_for(admin.user_id))
            .json(&json!({ "name": "newco" }))
            .await;
        assert_eq!(res.status_code(), 400);
        assert_eq!(res.json::<serde_json::Value>()["code"], "CONFLICT");
    }

    #[tokio::test]
    async fn members_see_only_their_own_tenant() {
        let harness = build_test_harness();
        let tenant_a = harness.tenants.insert(create_test_tenant(|_| {}));
        let tenant_b = harness.tenants.insert(create_test_tenant(|t| {
            t.name = "other-corp".to_string();
        }));
        let member = harness
            .memberships
            .insert(create_test_membership(tenant_a.id, |_| {}));
        let server = TestServer::new(create_app(harness.app_state.clone())).unwrap();
        let auth = bearer_for(member.user_id);

        let res = server
            .get("/api/tenants")
            .add_header("authorization", auth.clone())
            .await;
        let listed = res.json::<serde_json::Value>();
        assert_eq!(listed.as_array().unwrap().len(), 1);
        assert_eq!(listed[0]["id"], tenant_a.id.to_string());

        let res = server
            .get(&format!("/api/tenants/{}", tenant_b.id))
            .add_header("authorization", auth)
            .await;
        assert_eq!(res.status_code(), 404);
    }
}
