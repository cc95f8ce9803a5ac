//! HTTP handler gating and streaming the shared file.

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header, HeaderMap, HeaderValue, StatusCode, Uri},
    response::Response,
};
use futures::Stream;
use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio_util::io::ReaderStream;

use crate::common::{AppError, DownloadTicket};

use super::{ActiveTransfer, ShareAppState};

/// Serve the shared file to any GET whose path ends with the secret.
///
/// The "Sending file" line is logged once the file is open and a slot was
/// granted, right before the body starts. Rejected paths are logged as
/// `Incorrect URL`.
pub async fn download_handler(
    State(state): State<ShareAppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    uri: Uri,
) -> Result<Response, AppError> {
    let path = uri.path();
    if !state.session.matches_path(path) {
        tracing::warn!("Incorrect URL: {}", path);
        return Err(AppError::Forbidden);
    }

    let source = state.session.source();
    let file = tokio::fs::File::open(source).await.map_err(|err| {
        tracing::warn!(path = %source.display(), error = %err, "shared file unavailable");
        AppError::NotFound
    })?;
    let metadata = file.metadata().await.map_err(|err| {
        tracing::warn!(path = %source.display(), error = %err, "failed to stat shared file");
        AppError::NotFound
    })?;

    // Headers are built before a slot is taken so a bad header never burns quota.
    let headers = download_headers(state.file_name(), &metadata)?;

    // Registered before the slot: the last slot wakes the shutdown drain,
    // which must already see this body in flight.
    let transfer = state.track_transfer();
    let ticket = state.session.begin_download().map_err(|err| {
        tracing::warn!("Refusing download for {}: {}", addr.ip(), err);
        AppError::Gone
    })?;
    log_sending(&ticket, &addr);

    let body = TrackedStream {
        inner: ReaderStream::new(file),
        _transfer: transfer,
    };

    let mut response = Response::new(Body::from_stream(body));
    *response.status_mut() = StatusCode::OK;
    *response.headers_mut() = headers;
    Ok(response)
}

/// Body stream that counts as an active transfer until hyper drops it.
struct TrackedStream<S> {
    inner: S,
    _transfer: ActiveTransfer,
}

impl<S: Stream + Unpin> Stream for TrackedStream<S> {
    type Item = S::Item;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.get_mut().inner).poll_next(cx)
    }
}

fn log_sending(ticket: &DownloadTicket, addr: &SocketAddr) {
    if ticket.max_downloads > 0 {
        tracing::info!(
            "Sending file [{}/{}] to {}",
            ticket.number,
            ticket.max_downloads,
            addr.ip()
        );
    } else {
        tracing::info!("Sending file to {}", addr.ip());
    }
}

fn download_headers(file_name: &str, metadata: &std::fs::Metadata) -> Result<HeaderMap, AppError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/octet-stream"),
    );
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&content_disposition(file_name))
            .map_err(|e| AppError::Internal(format!("invalid content-disposition: {e}")))?,
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(metadata.len()));

    if let Ok(modified) = metadata.modified() {
        let date = httpdate::fmt_http_date(modified);
        headers.insert(
            header::LAST_MODIFIED,
            HeaderValue::from_str(&date)
                .map_err(|e| AppError::Internal(format!("invalid last-modified: {e}")))?,
        );
    }

    Ok(headers)
}

/// `attachment; filename="<name>"` with characters unsafe in a quoted
/// header value replaced by `_`.
fn content_disposition(file_name: &str) -> String {
    let safe: String = file_name
        .chars()
        .map(|c| {
            if c == ' ' || (c.is_ascii_graphic() && c != '"' && c != '\\') {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("attachment; filename=\"{}\"", safe)
}
