use axum::{extract::State, response::Html, routing::get, Router};

use crate::{state::AppState, views};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/test", get(test))
}

pub async fn index(State(state): State<AppState>) -> Html<String> {
    Html(views::index_page(&state.config))
}

pub async fn test() -> Html<&'static str> {
    Html(views::TEST_FRAGMENT)
}
