use std::net::SocketAddr;
use std::path::Path;

use axum::{
    body::Body,
    extract::connect_info::MockConnectInfo,
    http::{Method, Request},
    Router,
};
use http_body_util::BodyExt;

use httpshare::common::DownloadSession;
use httpshare::server::routes;
use httpshare::share::ShareAppState;

use super::SECRET;

//===========
// App Factory
//===========
pub fn create_share_test_app(source: &Path, max_downloads: u64) -> (Router, ShareAppState) {
    let session = DownloadSession::new(SECRET, source, max_downloads, false);
    let state = ShareAppState::new(session);
    let app = routes::create_share_router(&state)
        .layer(MockConnectInfo(SocketAddr::from(([192, 168, 1, 50], 51000))));
    (app, state)
}

//=================
// Request Builders
//=================
pub fn build_request(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .expect("Failed to build request")
}

pub fn build_get(uri: &str) -> Request<Body> {
    build_request(Method::GET, uri)
}

pub fn secret_uri() -> String {
    format!("/{}", SECRET)
}

//================
// Response Helpers
//================
pub async fn extract_bytes(response: axum::response::Response) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .expect("Failed to collect body")
        .to_bytes()
        .to_vec()
}

pub async fn extract_text(response: axum::response::Response) -> String {
    String::from_utf8(extract_bytes(response).await).expect("body should be utf-8")
}
