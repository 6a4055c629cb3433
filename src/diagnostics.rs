//! Debug-only introspection, mounted under `/__debug__` when `APP_DEBUG` is set.

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;
use tracing::error;

use crate::{
    app::{route_table, RouteInfo},
    state::AppState,
};

pub const MOUNT: &str = "/__debug__";

#[derive(Debug, Serialize)]
pub struct Overview {
    pub version: &'static str,
    pub debug: bool,
    pub accounts_prefix: String,
    pub store: &'static str,
    pub users: i64,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(MOUNT, get(overview))
        .route(&format!("{MOUNT}/"), get(overview))
        .route(&format!("{MOUNT}/routes"), get(routes))
}

pub async fn overview(
    State(state): State<AppState>,
) -> Result<Json<Overview>, (StatusCode, String)> {
    let users = state.store.count().await.map_err(|e| {
        error!(error = %e, "count users failed");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;
    Ok(Json(Overview {
        version: env!("CARGO_PKG_VERSION"),
        debug: state.config.debug,
        accounts_prefix: state.config.accounts_prefix.clone(),
        store: state.store.backend(),
        users,
    }))
}

pub async fn routes(State(state): State<AppState>) -> Json<Vec<RouteInfo>> {
    Json(route_table(&state.config))
}
