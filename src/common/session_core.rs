use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;

/// Lifecycle of a share.
///
/// `Active -> Exhausted -> Stopped` in bounded mode. Unlimited shares go
/// straight from `Active` to `Stopped` when interrupted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Active,
    Exhausted,
    Stopped,
}

/// Why a download could not be started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DownloadError {
    #[error("download quota exhausted")]
    Exhausted,
    #[error("session stopped")]
    Stopped,
}

/// Slot handed out by [`DownloadSession::begin_download`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadTicket {
    /// 1-based position of this download.
    pub number: u64,
    /// 0 for unlimited.
    pub max_downloads: u64,
}

impl DownloadTicket {
    /// Whether this ticket consumed the last slot of a bounded share.
    pub fn is_last(&self) -> bool {
        self.max_downloads > 0 && self.number == self.max_downloads
    }
}

#[derive(Debug)]
struct Progress {
    served: u64,
    state: SessionState,
}

/// Shared record of one share: what is served, under which path, and how
/// many times it has been handed out.
///
/// Cloning is shallow; all clones observe the same counter and state.
#[derive(Debug, Clone)]
pub struct DownloadSession {
    secret: Arc<str>,
    source: Arc<Path>,
    max_downloads: u64,
    delete_source_on_close: bool,
    progress: Arc<Mutex<Progress>>,
    exhausted: CancellationToken,
}

impl DownloadSession {
    pub fn new(
        secret: impl Into<String>,
        source: impl Into<PathBuf>,
        max_downloads: u64,
        delete_source_on_close: bool,
    ) -> Self {
        let secret: String = secret.into();
        let source: PathBuf = source.into();

        tracing::debug!(
            secret = %secret,
            source = %source.display(),
            max_downloads,
            "Created download session"
        );

        Self {
            secret: Arc::from(secret),
            source: Arc::from(source),
            max_downloads,
            delete_source_on_close,
            progress: Arc::new(Mutex::new(Progress {
                served: 0,
                state: SessionState::Active,
            })),
            exhausted: CancellationToken::new(),
        }
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn max_downloads(&self) -> u64 {
        self.max_downloads
    }

    pub fn is_unlimited(&self) -> bool {
        self.max_downloads == 0
    }

    pub fn delete_source_on_close(&self) -> bool {
        self.delete_source_on_close
    }

    pub fn served_count(&self) -> u64 {
        self.lock("served_count").served
    }

    pub fn state(&self) -> SessionState {
        self.lock("state").state
    }

    /// Any request path ending with the secret is accepted.
    pub fn matches_path(&self, path: &str) -> bool {
        path.ends_with(&*self.secret)
    }

    /// Reserves the next download slot.
    ///
    /// Taking the last slot of a bounded share moves the session to
    /// `Exhausted` and fires the exhaustion signal. The signal only wakes
    /// whoever awaits [`exhausted`](Self::exhausted); nothing here blocks.
    pub fn begin_download(&self) -> Result<DownloadTicket, DownloadError> {
        let mut progress = self.lock("begin_download");

        match progress.state {
            SessionState::Active => {}
            SessionState::Exhausted => return Err(DownloadError::Exhausted),
            SessionState::Stopped => return Err(DownloadError::Stopped),
        }

        progress.served += 1;
        let ticket = DownloadTicket {
            number: progress.served,
            max_downloads: self.max_downloads,
        };

        if ticket.is_last() {
            progress.state = SessionState::Exhausted;
            tracing::debug!("Download quota reached ({})", self.max_downloads);
            self.exhausted.cancel();
        }

        Ok(ticket)
    }

    /// Resolves once the quota has been used up. Never resolves for
    /// unlimited shares.
    pub async fn exhausted(&self) {
        self.exhausted.cancelled().await
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted.is_cancelled()
    }

    /// Final transition once the listener is closed and cleanup ran.
    pub fn mark_stopped(&self) {
        let mut progress = self.lock("mark_stopped");
        progress.state = SessionState::Stopped;
    }

    fn lock(&self, op: &str) -> MutexGuard<'_, Progress> {
        match self.progress.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::error!("Session lock poisoned during {}, recovering", op);
                poisoned.into_inner()
            }
        }
    }
}
