pub mod invoices;
pub mod memberships;
pub mod plans;
pub mod subscriptions;
pub mod tenants;

use axum::Router;

use crate::adapters::http::app_state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/tenants", tenants::router().merge(memberships::router()))
        .nest("/plans", plans::router())
        .nest("/subscriptions", subscriptions::router())
        .nest("/invoices", invoices::router())
        .merge(memberships::me_router())
}
