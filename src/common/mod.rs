pub mod config;
pub mod errors;
pub mod session_core;

pub use config::{AppConfig, ConfigOverrides};
pub use errors::AppError;
pub use session_core::{DownloadError, DownloadSession, DownloadTicket, SessionState};

/// Application state the runtime drives through shutdown.
#[async_trait::async_trait]
pub trait TransferState: Clone + Send + Sync + 'static {
    /// Response bodies still streaming.
    fn transfer_count(&self) -> usize;
    async fn cleanup(&self);
    fn session(&self) -> &DownloadSession;
}
