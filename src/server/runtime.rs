//! Runtime lifecycle: supervise the share, shut down, clean up.

use crate::common::TransferState;
use crate::transport::local::LocalServer;
use anyhow::Result;
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;

const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The download quota was used up.
    Exhausted,
    /// Stopped by an operator signal.
    Interrupted,
}

/// Installs the Ctrl+C and SIGTERM handlers right away and returns a future
/// resolving on the first of them.
///
/// Signals delivered before the future is first polled are kept, so the
/// handlers must be installed before any work that leaves files behind.
#[cfg(unix)]
pub fn shutdown_signal() -> impl Future<Output = ()> + Send + 'static {
    use tokio::signal::unix::{signal, SignalKind};

    let interrupt = signal(SignalKind::interrupt());
    let terminate = signal(SignalKind::terminate());

    async move {
        let interrupt = async {
            match interrupt {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(err) => {
                    tracing::error!("Failed to listen for Ctrl+C: {}", err);
                    std::future::pending::<()>().await;
                }
            }
        };
        let terminate = async {
            match terminate {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(err) => {
                    tracing::error!("Failed to install SIGTERM handler: {}", err);
                    std::future::pending::<()>().await;
                }
            }
        };

        tokio::select! {
            _ = interrupt => {},
            _ = terminate => {},
        }
    }
}

#[cfg(not(unix))]
pub fn shutdown_signal() -> impl Future<Output = ()> + Send + 'static {
    async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
    }
}

/// Wait until the quota is exhausted or `interrupt` fires, then stop the
/// server and clean up.
///
/// Runs on its own task: request handlers only fire the exhaustion signal
/// and never stop the server from inside their own call stack. Returns only
/// after the server task ended, so every accepted body has been written.
pub async fn run_session<S, F>(server: LocalServer, state: S, interrupt: F) -> Result<SessionEnd>
where
    S: TransferState,
    F: Future<Output = ()>,
{
    let end = tokio::select! {
        _ = state.session().exhausted() => {
            tracing::info!("Disconnecting");
            SessionEnd::Exhausted
        }
        _ = interrupt => {
            tracing::info!("Interrupt received - initiating graceful shutdown");
            SessionEnd::Interrupted
        }
    };

    shutdown(server, state).await?;

    Ok(end)
}

//==========
// SHUTDOWN
//==========

#[derive(Debug, PartialEq, Eq)]
enum ShutdownResult {
    Completed,
    Forced,
}

/// Stop accepting new connections, drain/force transfers, and cleanup state.
async fn shutdown<S: TransferState>(server: LocalServer, state: S) -> Result<()> {
    let LocalServer { handle, task, .. } = server;

    // Stop accepting; open connections finish their responses
    handle.graceful_shutdown(None);
    tracing::info!("Server stopped accepting new connections");

    let result = match wait_for_transfers(&state).await {
        ShutdownResult::Completed => wait_for_server(task).await,
        ShutdownResult::Forced => {
            task.abort();
            ShutdownResult::Forced
        }
    };

    match result {
        ShutdownResult::Completed => {
            tracing::debug!("All transfers completed");
        }
        ShutdownResult::Forced => {
            let remaining = state.transfer_count();
            tracing::warn!("Forced shutdown with {} transfer(s) in flight", remaining);
        }
    }

    state.cleanup().await;
    tracing::info!("Server shutdown complete");

    Ok(())
}

/// Wait for in-flight bodies to finish, or force quit on Ctrl+C.
async fn wait_for_transfers<S: TransferState>(state: &S) -> ShutdownResult {
    // Nothing in flight
    if state.transfer_count() == 0 {
        return ShutdownResult::Completed;
    }

    let mut last_count = state.transfer_count();
    tracing::info!(
        "{} transfer(s) remaining - Press Ctrl+C to force quit",
        last_count
    );

    loop {
        tokio::select! {
            // Ctrl+C during drain = force quit
            result = tokio::signal::ctrl_c() => {
                if result.is_ok() {
                    tracing::info!("Force shutdown requested");
                    return ShutdownResult::Forced;
                }
            }

            _ = tokio::time::sleep(DRAIN_POLL_INTERVAL) => {
                let current_count = state.transfer_count();

                if current_count == 0 {
                    return ShutdownResult::Completed;
                }

                if current_count != last_count {
                    tracing::info!("{} transfer(s) remaining...", current_count);
                    last_count = current_count;
                }
            }
        }
    }
}

/// A finished body stream can still sit in the connection's write buffer;
/// the server task only ends once its connections are flushed and closed.
async fn wait_for_server(mut task: JoinHandle<()>) -> ShutdownResult {
    tokio::select! {
        joined = &mut task => {
            if let Err(err) = joined {
                tracing::error!("Server task failed: {}", err);
            }
            ShutdownResult::Completed
        }
        Ok(()) = tokio::signal::ctrl_c() => {
            tracing::info!("Force shutdown requested");
            task.abort();
            ShutdownResult::Forced
        }
    }
}
