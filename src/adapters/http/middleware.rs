use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::{
    adapters::http::app_state::AppState,
    app_error::AppError,
    application::{jwt, security::SecurityContext},
};

/// Resolves the caller's security context once per request and attaches it
/// to the request extensions. Everything downstream reads the context from
/// there; nothing re-derives it.
///
/// A missing Authorization header yields an anonymous context rather than an
/// error: which operations require authentication is the use cases'
/// decision, not the transport's.
pub async fn security_context_middleware(
    State(app_state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let ctx = match bearer_token(&request) {
        Some(token) => {
            let claims = jwt::verify(token, &app_state.config.jwt_secret)?;
            let user_id =
                Uuid::parse_str(&claims.sub).map_err(|_| AppError::InvalidCredentials)?;
            let ctx = app_state
                .membership_use_cases
                .resolve_context(user_id)
                .await?;
            tracing::debug!(
                principal = %user_id,
                tenant_id = ?ctx.tenant_id,
                is_admin = ctx.is_admin,
                "Resolved security context"
            );
            ctx
        }
        None => SecurityContext::anonymous(),
    };

    request.extensions_mut().insert(ctx);

    Ok(next.run(request).await)
}

fn bearer_token(req: &Request) -> Option<&str> {
    req.headers()
        .get(axum::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}
