use crate::state::AppState;
use axum::Router;

mod claims;
pub mod dto;
pub mod handlers;
pub mod password;
pub mod repo;
pub mod repo_types;
pub mod services;
pub mod session;

/// Account pages under `prefix`: this app's own routes first, then login/logout.
pub fn router(prefix: &str) -> Router<AppState> {
    Router::new()
        .merge(handlers::account_routes(prefix))
        .merge(handlers::auth_routes(prefix))
}
