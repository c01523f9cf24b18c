use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use engine_logging::{engine_debug, engine_info, engine_warn};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use zip::result::ZipError;
use zip::ZipArchive;

use crate::ProgressSink;

const WRITE_BUFFER_BYTES: usize = 64 * 1024;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("cannot open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid or corrupt zip {path}: {source}")]
    Zip {
        path: PathBuf,
        #[source]
        source: ZipError,
    },
    #[error("cannot read entry {index} of {path}: {source}")]
    Entry {
        path: PathBuf,
        index: usize,
        #[source]
        source: ZipError,
    },
    #[error("cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("archive path has no file name: {0}")]
    NoBaseName(PathBuf),
    #[error("extraction cancelled")]
    Cancelled,
    #[error("extraction task stopped unexpectedly: {0}")]
    Task(String),
}

/// File name of the archive without its extension, e.g. `acme` for `/x/acme.zip`.
pub fn archive_base_name(archive_path: &Path) -> Option<String> {
    archive_path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|stem| !stem.is_empty())
}

/// Sibling directory of the archive named after its base name.
pub fn extraction_root(archive_path: &Path) -> Result<PathBuf, ArchiveError> {
    let base_name = archive_base_name(archive_path)
        .ok_or_else(|| ArchiveError::NoBaseName(archive_path.to_path_buf()))?;
    let parent = archive_path.parent().unwrap_or_else(|| Path::new(""));
    Ok(parent.join(base_name))
}

/// Unpacks every entry of the zip at `archive_path` into [`extraction_root`].
///
/// Entries are processed in archive order. Existing files are overwritten and
/// existing directories reused, so extracting the same archive twice yields the
/// same tree. Entries whose names would escape the root are skipped.
pub fn extract_archive(
    archive_path: &Path,
    sink: &dyn ProgressSink,
    cancel: &CancellationToken,
) -> Result<PathBuf, ArchiveError> {
    let root = extraction_root(archive_path)?;
    fs::create_dir_all(&root).map_err(|source| ArchiveError::Write {
        path: root.clone(),
        source,
    })?;

    let file = File::open(archive_path).map_err(|source| ArchiveError::Open {
        path: archive_path.to_path_buf(),
        source,
    })?;
    let mut archive = ZipArchive::new(file).map_err(|source| ArchiveError::Zip {
        path: archive_path.to_path_buf(),
        source,
    })?;

    engine_info!(
        "Extracting {} entries from {:?} into {:?}",
        archive.len(),
        archive_path,
        root
    );

    for index in 0..archive.len() {
        if cancel.is_cancelled() {
            return Err(ArchiveError::Cancelled);
        }

        let mut entry = archive.by_index(index).map_err(|source| ArchiveError::Entry {
            path: archive_path.to_path_buf(),
            index,
            source,
        })?;

        let Some(relative) = entry.enclosed_name().map(|p| p.to_path_buf()) else {
            engine_warn!("Skipping archive entry with unsafe path: {}", entry.name());
            sink.status(format!("Skipping unsafe archive entry {}", entry.name()));
            continue;
        };
        let output_path = root.join(&relative);
        sink.status(format!(
            "Extracting archive file...{}",
            output_path.display()
        ));

        if entry.is_dir() {
            fs::create_dir_all(&output_path).map_err(|source| ArchiveError::Write {
                path: output_path.clone(),
                source,
            })?;
            continue;
        }

        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent).map_err(|source| ArchiveError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let write_err = |source| ArchiveError::Write {
            path: output_path.clone(),
            source,
        };
        let outfile = File::create(&output_path).map_err(write_err)?;
        let mut writer = BufWriter::with_capacity(WRITE_BUFFER_BYTES, outfile);
        let written = io::copy(&mut entry, &mut writer).map_err(write_err)?;
        writer.flush().map_err(write_err)?;
        engine_debug!("Extracted {:?} ({} bytes)", relative, written);
    }

    Ok(root)
}
