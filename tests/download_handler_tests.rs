mod common;

use axum::http::{header, Method, StatusCode};
use common::share_http::{
    build_get, build_request, create_share_test_app, extract_bytes, extract_text, secret_uri,
};
use common::{sample_bytes, setup_temp_dir, write_file, SECRET};
use httpshare::common::{SessionState, TransferState};
use tower::ServiceExt;

#[tokio::test]
async fn matching_path_streams_file_with_headers() {
    let temp_dir = setup_temp_dir();
    let payload = sample_bytes(300_000);
    let source = write_file(&temp_dir, "report.bin", &payload);
    let (app, state) = create_share_test_app(&source, 3);

    let response = app.oneshot(build_get(&secret_uri())).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers().clone();
    assert_eq!(headers[header::CONTENT_TYPE], "application/octet-stream");
    assert_eq!(
        headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"report.bin\""
    );
    assert_eq!(headers[header::CONTENT_LENGTH], payload.len().to_string().as_str());
    assert!(headers.contains_key(header::LAST_MODIFIED));

    let body = extract_bytes(response).await;
    assert_eq!(body, payload);
    assert_eq!(state.session.served_count(), 1);
    assert_eq!(state.transfer_count(), 0, "finished body releases its guard");
}

#[tokio::test]
async fn any_path_ending_with_secret_is_accepted() {
    let temp_dir = setup_temp_dir();
    let source = write_file(&temp_dir, "a.txt", b"hello");
    let (app, state) = create_share_test_app(&source, 0);

    for uri in [
        format!("/{}", SECRET),
        format!("/nested/path/{}", SECRET),
        format!("/x{}", SECRET),
        format!("/{}?utm=1", SECRET),
    ] {
        let response = app.clone().oneshot(build_get(&uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "uri {uri}");
        assert_eq!(extract_bytes(response).await, b"hello");
    }

    assert_eq!(state.session.served_count(), 4);
}

#[tokio::test]
async fn wrong_path_is_forbidden_and_not_counted() {
    let temp_dir = setup_temp_dir();
    let source = write_file(&temp_dir, "a.txt", b"hello");
    let (app, state) = create_share_test_app(&source, 1);

    for uri in ["/", "/calm-heron", &format!("/{}/", SECRET), "/favicon.ico"] {
        let response = app.clone().oneshot(build_get(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "uri {uri}");
        assert_eq!(extract_text(response).await, "Read access forbidden");
    }

    assert_eq!(state.session.served_count(), 0);
    assert_eq!(state.session.state(), SessionState::Active);
}

#[tokio::test]
async fn missing_source_is_not_found_and_not_counted() {
    let temp_dir = setup_temp_dir();
    let source = temp_dir.path().join("vanished.bin");
    let (app, state) = create_share_test_app(&source, 1);

    let response = app.oneshot(build_get(&secret_uri())).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(extract_text(response).await, "File not found");
    assert_eq!(state.session.served_count(), 0);
    assert_eq!(state.session.state(), SessionState::Active);
}

#[tokio::test]
async fn source_removed_mid_session_yields_not_found() {
    let temp_dir = setup_temp_dir();
    let source = write_file(&temp_dir, "a.txt", b"hello");
    let (app, state) = create_share_test_app(&source, 3);

    let first = app.clone().oneshot(build_get(&secret_uri())).await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    extract_bytes(first).await;

    std::fs::remove_file(&source).expect("remove source");

    let second = app.oneshot(build_get(&secret_uri())).await.unwrap();
    assert_eq!(second.status(), StatusCode::NOT_FOUND);
    assert_eq!(state.session.served_count(), 1);
}

#[tokio::test]
async fn requests_after_quota_are_refused() {
    let temp_dir = setup_temp_dir();
    let source = write_file(&temp_dir, "a.txt", b"hello");
    let (app, state) = create_share_test_app(&source, 2);

    for expected in 1..=2 {
        let response = app.clone().oneshot(build_get(&secret_uri())).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        extract_bytes(response).await;
        assert_eq!(state.session.served_count(), expected);
    }
    assert_eq!(state.session.state(), SessionState::Exhausted);
    assert!(state.session.is_exhausted());

    let late = app.oneshot(build_get(&secret_uri())).await.unwrap();
    assert_eq!(late.status(), StatusCode::GONE);
    assert_eq!(state.session.served_count(), 2);
}

#[tokio::test]
async fn unlimited_share_never_exhausts() {
    let temp_dir = setup_temp_dir();
    let source = write_file(&temp_dir, "a.txt", b"hello");
    let (app, state) = create_share_test_app(&source, 0);

    for _ in 0..5 {
        let response = app.clone().oneshot(build_get(&secret_uri())).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        extract_bytes(response).await;
    }

    assert_eq!(state.session.served_count(), 5);
    assert_eq!(state.session.state(), SessionState::Active);
}

#[tokio::test]
async fn non_get_methods_never_touch_the_session() {
    let temp_dir = setup_temp_dir();
    let source = write_file(&temp_dir, "a.txt", b"hello");
    let (app, state) = create_share_test_app(&source, 1);

    for method in [Method::POST, Method::PUT, Method::DELETE, Method::HEAD] {
        let response = app
            .clone()
            .oneshot(build_request(method.clone(), &secret_uri()))
            .await
            .unwrap();
        assert_eq!(
            response.status(),
            StatusCode::METHOD_NOT_ALLOWED,
            "method {method}"
        );
    }

    assert_eq!(state.session.served_count(), 0);
}

#[tokio::test]
async fn concurrent_requests_start_at_most_quota_transfers() {
    let temp_dir = setup_temp_dir();
    let source = write_file(&temp_dir, "a.bin", &sample_bytes(64 * 1024));
    let (app, state) = create_share_test_app(&source, 3);

    let tasks: Vec<_> = (0..12)
        .map(|_| {
            let app = app.clone();
            tokio::spawn(async move {
                let response = app.oneshot(build_get(&secret_uri())).await.unwrap();
                let status = response.status();
                extract_bytes(response).await;
                status
            })
        })
        .collect();

    let mut ok = 0;
    let mut gone = 0;
    for task in tasks {
        match task.await.expect("request task") {
            StatusCode::OK => ok += 1,
            StatusCode::GONE => gone += 1,
            other => panic!("unexpected status {other}"),
        }
    }

    assert_eq!(ok, 3);
    assert_eq!(gone, 9);
    assert_eq!(state.session.served_count(), 3);
}

#[tokio::test]
async fn unread_body_stays_in_flight_until_dropped() {
    let temp_dir = setup_temp_dir();
    let source = write_file(&temp_dir, "a.bin", &sample_bytes(1024));
    let (app, state) = create_share_test_app(&source, 1);

    let response = app.oneshot(build_get(&secret_uri())).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(state.session.served_count(), 1, "counted at send start");
    assert_eq!(state.transfer_count(), 1);

    drop(response);
    assert_eq!(state.transfer_count(), 0);
}
