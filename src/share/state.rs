use crate::common::{DownloadSession, TransferState};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Share-specific application state
/// Passed to the download handler via Axum State extractor
#[derive(Clone)]
pub struct ShareAppState {
    pub session: DownloadSession,
    file_name: Arc<str>,
    active_transfers: Arc<AtomicUsize>,
}

impl ShareAppState {
    pub fn new(session: DownloadSession) -> Self {
        let file_name = session
            .source()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "download".to_string());

        Self {
            session,
            file_name: Arc::from(file_name),
            active_transfers: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Basename advertised in `Content-Disposition`.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Counts a body stream as in flight until the guard drops.
    pub fn track_transfer(&self) -> ActiveTransfer {
        self.active_transfers.fetch_add(1, Ordering::SeqCst);
        ActiveTransfer {
            counter: self.active_transfers.clone(),
        }
    }
}

/// Held by a streaming response body.
pub struct ActiveTransfer {
    counter: Arc<AtomicUsize>,
}

impl Drop for ActiveTransfer {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl TransferState for ShareAppState {
    fn transfer_count(&self) -> usize {
        self.active_transfers.load(Ordering::SeqCst)
    }

    async fn cleanup(&self) {
        if self.session.delete_source_on_close() {
            let path = self.session.source();
            println!("Deleting the temporary file {}", path.display());
            if let Err(err) = tokio::fs::remove_file(path).await {
                tracing::warn!(path = %path.display(), error = %err, "failed to remove temporary archive");
            }
        }
        self.session.mark_stopped();
    }

    fn session(&self) -> &DownloadSession {
        &self.session
    }
}
