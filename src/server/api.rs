use super::{routes, runtime};
use crate::common::{AppConfig, DownloadSession, TransferState};
use crate::output::Spinner;
use crate::share::{
    generate_link_name, prepare_source, Archiver, ShareAppState, SharedSource,
};
use crate::transport::local::{advertised_ip, bind_listener, start_local_server};
use crate::ui::{clipboard, generate_qr, ClipboardSink};
use crate::utils::to_human_size;
use anyhow::{Context, Result};
use std::future::Future;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

use super::SessionEnd;

/// What to share and how, resolved from CLI and config.
pub struct ShareRequest {
    pub source: PathBuf,
    pub config: AppConfig,
}

/// Bind, prepare the source, serve until the quota is used up or the process
/// is interrupted, then clean up.
pub async fn start_share_server(request: ShareRequest) -> Result<SessionEnd> {
    let ShareRequest { source, config } = request;

    // Installed before anything touches the temp dir so Ctrl+C always
    // reaches the cleanup path
    let interrupt = runtime::shutdown_signal();
    tokio::pin!(interrupt);

    // Bind first: a busy port must not leave an archive behind
    let listener = bind_listener(config.bind, config.port)?;

    let link_name = generate_link_name(config.resolved_words_dir().as_deref());

    let Some(shared) =
        prepare_until_interrupted(source.clone(), config.archiver, &mut interrupt).await?
    else {
        return Ok(SessionEnd::Interrupted);
    };

    let session = DownloadSession::new(
        link_name.clone(),
        shared.path.clone(),
        config.downloads,
        shared.temporary,
    );
    let state = ShareAppState::new(session);
    let app = routes::create_share_router(&state);

    let server = match start_local_server(app, listener) {
        Ok(server) => server,
        Err(err) => {
            // Nothing served yet; drop the archive we just made
            state.cleanup().await;
            return Err(err);
        }
    };

    let url = format!(
        "http://{}:{}/{}",
        advertised_ip(config.bind),
        server.port,
        link_name
    );
    print_banner(&shared, &config, &url);

    if config.show_qr {
        match generate_qr(&url) {
            Ok(qr) => println!("{}", qr),
            Err(err) => tracing::warn!("Could not render QR code: {:#}", err),
        }
    }

    let sink = if config.clipboard {
        ClipboardSink::detect()
    } else {
        ClipboardSink::disabled()
    };
    if clipboard::publish_link(&sink, &url).await {
        println!("The share URL was copied to the clipboard.");
    }

    runtime::run_session(server, state, interrupt).await
}

/// Prepares `source` on a blocking thread. Returns `None` when `interrupt`
/// fires first; the archive being written is then discarded.
pub(crate) async fn prepare_until_interrupted<F>(
    source: PathBuf,
    archiver: Archiver,
    interrupt: F,
) -> Result<Option<SharedSource>>
where
    F: Future<Output = ()>,
{
    let is_dir = source.is_dir();
    let spinner = is_dir.then(|| Spinner::start(&format!("Compressing {}...", source.display())));
    let cancel = CancellationToken::new();
    let worker_cancel = cancel.clone();
    let mut work =
        tokio::task::spawn_blocking(move || prepare_source(&source, archiver, &worker_cancel));

    tokio::select! {
        biased;

        _ = interrupt => {
            cancel.cancel();
            if let Some(spinner) = &spinner {
                spinner.fail("Compression interrupted");
            }
            // A cancelled worker removes its partial archive itself; one that
            // finished first hands back a complete archive to discard
            if let Ok(Ok(shared)) = work.await {
                if shared.temporary {
                    discard_archive(&shared.path);
                }
            }
            tracing::info!("Interrupted before the share started");
            Ok(None)
        }

        joined = &mut work => {
            let prepared = joined.context("Archive task failed")?;
            match (&prepared, &spinner) {
                (Ok(shared), Some(spinner)) => {
                    spinner.succeed(&format!("Archive ready: {}", shared.path.display()));
                }
                (Err(_), Some(spinner)) => spinner.fail("Failed to compress directory"),
                _ => {}
            }
            prepared.map(Some)
        }
    }
}

fn discard_archive(path: &Path) {
    if !path.exists() {
        return;
    }
    println!("Deleting the temporary file {}", path.display());
    if let Err(err) = std::fs::remove_file(path) {
        tracing::warn!(path = %path.display(), error = %err, "failed to remove temporary archive");
    }
}

fn print_banner(shared: &SharedSource, config: &AppConfig, url: &str) {
    let size = to_human_size(shared.size);
    if config.downloads > 0 {
        println!(
            "Sharing {} times the file {} - {}",
            config.downloads,
            shared.path.display(),
            size
        );
    } else {
        println!(
            "Sharing unlimited times the file {} - {}",
            shared.path.display(),
            size
        );
        println!("NOTE: The server can be stopped by pressing CTRL+C");
    }
    println!("Your download link is: {}", url);
}
