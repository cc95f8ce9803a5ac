//! Best-effort clipboard publishing of the share link.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Somewhere the share link can be handed to the operator.
#[async_trait]
pub trait LinkSink: Send + Sync {
    fn is_available(&self) -> bool;
    async fn publish(&self, url: &str) -> Result<()>;
}

/// Clipboard helpers tried in order, with the args that make them read stdin.
const CANDIDATES: &[(&str, &[&str])] = &[
    ("wl-copy", &[]),
    ("xclip", &["-selection", "clipboard"]),
    ("xsel", &["--clipboard", "--input"]),
    ("pbcopy", &[]),
    ("clip.exe", &[]),
];

/// Pipes the link into the first clipboard tool found on `PATH`.
pub struct ClipboardSink {
    command: Option<(PathBuf, &'static [&'static str])>,
}

impl ClipboardSink {
    pub fn detect() -> Self {
        let command = CANDIDATES.iter().find_map(|(name, args)| {
            which::which(name).ok().map(|path| (path, *args))
        });
        if let Some((path, _)) = &command {
            tracing::debug!("Clipboard helper: {}", path.display());
        }
        Self { command }
    }

    /// A sink that never publishes.
    pub fn disabled() -> Self {
        Self { command: None }
    }
}

#[async_trait]
impl LinkSink for ClipboardSink {
    fn is_available(&self) -> bool {
        self.command.is_some()
    }

    async fn publish(&self, url: &str) -> Result<()> {
        let Some((program, args)) = &self.command else {
            bail!("no clipboard helper available");
        };

        let mut child = Command::new(program)
            .args(*args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("Failed to start {}", program.display()))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(url.as_bytes())
                .await
                .context("Failed to write link to clipboard helper")?;
        }

        let status = child
            .wait()
            .await
            .context("Clipboard helper did not exit")?;
        if !status.success() {
            bail!("{} exited with {}", program.display(), status);
        }
        Ok(())
    }
}

/// Hand the link to `sink` if it can take it. Failures are not reported to
/// the operator.
pub async fn publish_link(sink: &dyn LinkSink, url: &str) -> bool {
    if !sink.is_available() {
        return false;
    }
    match sink.publish(url).await {
        Ok(()) => true,
        Err(err) => {
            tracing::debug!("Clipboard publish failed: {:#}", err);
            false
        }
    }
}
