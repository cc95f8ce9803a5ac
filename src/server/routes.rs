//! Router definition for the share endpoint

use crate::share::{handlers, ShareAppState};
use axum::{
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};

/// Build the router. Every GET path reaches the download handler, which does
/// its own secret matching. HEAD is refused explicitly since axum would
/// otherwise run the GET handler for it and burn a download.
pub fn create_share_router(state: &ShareAppState) -> Router {
    Router::new()
        .route(
            "/",
            get(handlers::download_handler).head(method_not_allowed),
        )
        .route(
            "/*path",
            get(handlers::download_handler).head(method_not_allowed),
        )
        .with_state(state.clone())
}

async fn method_not_allowed() -> impl IntoResponse {
    (StatusCode::METHOD_NOT_ALLOWED, [(header::ALLOW, "GET")])
}
