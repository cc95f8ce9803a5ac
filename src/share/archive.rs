//! Turns a shared directory into a single temporary archive.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use walkdir::WalkDir;
use zip::write::FileOptions;

/// Compression format used when the shared path is a directory.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Archiver {
    #[default]
    Gz,
    Tar,
    Bzip2,
    Lzma,
    Zip,
}

impl Archiver {
    pub fn extension(self) -> &'static str {
        match self {
            Archiver::Gz => ".tar.gz",
            Archiver::Tar => ".tar",
            Archiver::Bzip2 => ".tar.bz2",
            Archiver::Lzma => ".tar.xz",
            Archiver::Zip => ".zip",
        }
    }
}

/// The file a share actually serves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedSource {
    pub path: PathBuf,
    pub size: u64,
    /// Set when `path` is an archive created for this share.
    pub temporary: bool,
}

/// Resolves the user-supplied path into a servable file, archiving
/// directories into the system temp directory.
///
/// Blocking. Archiving stops between entries once `cancel` fires.
pub fn prepare_source(
    path: &Path,
    archiver: Archiver,
    cancel: &CancellationToken,
) -> Result<SharedSource> {
    let path = std::fs::canonicalize(path)
        .with_context(|| format!("Unable to locate the file / directory: {}", path.display()))?;

    if path.is_dir() {
        let archive = create_archive(&path, archiver, &std::env::temp_dir(), cancel)?;
        let size = std::fs::metadata(&archive)
            .with_context(|| format!("Failed to stat archive {}", archive.display()))?
            .len();
        return Ok(SharedSource {
            path: archive,
            size,
            temporary: true,
        });
    }

    let size = std::fs::metadata(&path)
        .with_context(|| format!("Failed to stat {}", path.display()))?
        .len();
    Ok(SharedSource {
        path,
        size,
        temporary: false,
    })
}

/// Archive destination: `<out_dir>/<basename><extension>`.
pub fn archive_path(src_dir: &Path, archiver: Archiver, out_dir: &Path) -> PathBuf {
    let base = src_dir
        .file_name()
        .and_then(|x| x.to_str())
        .unwrap_or("share");
    out_dir.join(format!("{}{}", base, archiver.extension()))
}

/// Compresses `src_dir` into `out_dir`, replacing any previous archive of the
/// same name. Returns the archive path.
///
/// A cancelled or failed run leaves no file behind.
pub fn create_archive(
    src_dir: &Path,
    archiver: Archiver,
    out_dir: &Path,
    cancel: &CancellationToken,
) -> Result<PathBuf> {
    let target = archive_path(src_dir, archiver, out_dir);
    if target.is_file() {
        std::fs::remove_file(&target)
            .with_context(|| format!("Failed to remove stale archive {}", target.display()))?;
    }

    tracing::info!(
        "Compressing the directory {} to {}",
        src_dir.display(),
        target.display()
    );

    let file = File::create(&target)
        .with_context(|| format!("Failed to create archive {}", target.display()))?;

    let written = match archiver {
        Archiver::Gz => write_tar(
            src_dir,
            flate2::write::GzEncoder::new(file, flate2::Compression::default()),
            cancel,
        )
        .and_then(|enc| enc.finish().context("Failed to finish gzip stream")),
        Archiver::Tar => write_tar(src_dir, file, cancel),
        Archiver::Bzip2 => write_tar(
            src_dir,
            bzip2::write::BzEncoder::new(file, bzip2::Compression::default()),
            cancel,
        )
        .and_then(|enc| enc.finish().context("Failed to finish bzip2 stream")),
        Archiver::Lzma => write_tar(src_dir, xz2::write::XzEncoder::new(file, 6), cancel)
            .and_then(|enc| enc.finish().context("Failed to finish xz stream")),
        Archiver::Zip => write_zip(src_dir, file, cancel),
    };

    if let Err(err) = written {
        if let Err(rm_err) = std::fs::remove_file(&target) {
            tracing::warn!(path = %target.display(), error = %rm_err, "failed to remove partial archive");
        }
        return Err(err);
    }

    Ok(target)
}

fn ensure_not_cancelled(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        bail!("Archiving interrupted");
    }
    Ok(())
}

/// Writes the directory contents at the archive root and hands the
/// underlying writer back for finalisation.
fn write_tar<W: Write>(src_dir: &Path, writer: W, cancel: &CancellationToken) -> Result<W> {
    let mut builder = tar::Builder::new(writer);

    for entry in WalkDir::new(src_dir).min_depth(1).sort_by_file_name() {
        ensure_not_cancelled(cancel)?;
        let entry = entry.with_context(|| format!("Failed to read {}", src_dir.display()))?;
        let path = entry.path();
        let rel = path.strip_prefix(src_dir).unwrap_or(path);

        let added = if path.is_dir() {
            builder.append_dir(rel, path)
        } else {
            builder.append_path_with_name(path, rel)
        };
        added.with_context(|| format!("Failed to add {} to tar", path.display()))?;
    }

    builder.into_inner().context("Failed to finalize tar archive")
}

fn write_zip(src_dir: &Path, file: File, cancel: &CancellationToken) -> Result<File> {
    let mut writer = zip::ZipWriter::new(file);
    let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    for entry in WalkDir::new(src_dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file())
    {
        ensure_not_cancelled(cancel)?;
        let source_path = entry.path();
        let rel = source_path.strip_prefix(src_dir).unwrap_or(source_path);
        let entry_name = rel.to_string_lossy().replace('\\', "/");

        let mut source = File::open(source_path)
            .with_context(|| format!("Failed to open {}", source_path.display()))?;
        writer
            .start_file(entry_name, options)
            .with_context(|| format!("Failed to start zip entry {}", rel.display()))?;
        io::copy(&mut source, &mut writer)
            .with_context(|| format!("Failed to add {} to zip", source_path.display()))?;
    }

    writer.finish().context("Failed to finalize zip archive")
}
