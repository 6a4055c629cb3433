use axum::Router;
use serde::Serialize;
use tower_http::trace::TraceLayer;

use crate::{accounts, config::AppConfig, diagnostics, pages, state::AppState};

#[derive(Debug, Clone, Serialize)]
pub struct RouteInfo {
    pub method: &'static str,
    pub path: String,
    pub auth: bool,
}

/// The routing table as `build_app` mounts it, in registration order.
pub fn route_table(config: &AppConfig) -> Vec<RouteInfo> {
    let route = |method, path: String, auth| RouteInfo { method, path, auth };
    let mut table = vec![
        route("GET", "/".into(), false),
        route("GET", "/test".into(), false),
        route("GET, POST", config.account_path("signup"), false),
        route("GET", config.account_path("dashboard"), true),
        route("GET, POST", config.account_path("login"), false),
        route("GET, POST", config.account_path("logout"), false),
    ];
    if config.debug {
        table.push(route("GET", format!("{}/", diagnostics::MOUNT), false));
        table.push(route("GET", format!("{}/routes", diagnostics::MOUNT), false));
    }
    table
}

pub fn build_app(state: AppState) -> Router {
    let config = state.config.clone();

    // axum panics on overlapping registrations, so the auth include can
    // never shadow an application route under the same prefix
    let mut router = Router::new()
        .merge(pages::router())
        .merge(accounts::router(&config.accounts_prefix));

    if config.debug {
        tracing::warn!(mount = diagnostics::MOUNT, "debug diagnostics enabled");
        router = router.merge(diagnostics::router());
    }

    router.with_state(state).layer(
        TraceLayer::new_for_http()
            .make_span_with(|req: &axum::http::Request<_>| {
                let method = req.method().clone();
                let uri = req.uri().clone();
                tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
            })
            .on_response(
                |res: &axum::http::Response<_>,
                 _latency: std::time::Duration,
                 span: &tracing::Span| {
                    let status = res.status();
                    span.record("status", tracing::field::display(status));
                    if status.is_server_error() {
                        tracing::error!(%status, "response");
                    } else {
                        tracing::info!(%status, "response");
                    }
                },
            ),
    )
}

pub async fn serve(app: Router, config: &AppConfig) -> anyhow::Result<()> {
    let addr = config.bind_addr()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
