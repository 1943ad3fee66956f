//! Browser chat widget served at `/`.

use axum::response::Html;

const HOME_PAGE: &str = include_str!("../assets/home.html");

/// Handler for `GET /`.
pub async fn index() -> Html<&'static str> {
    Html(HOME_PAGE)
}
