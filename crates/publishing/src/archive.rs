//! Mosaic archive building.
//!
//! Granules are streamed from disk into a zip file next to the staging
//! directory. Entries and archives past 4 GiB or 65535 entries are written
//! in zip64 form.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use zip::write::FileOptions;
use zip::CompressionMethod;

use crate::error::{PublishError, Result};

/// Entries at least this large get zip64 headers; leaves room for deflate
/// expanding incompressible data.
const LARGE_ENTRY_THRESHOLD: u64 = 0xF000_0000;

fn archive_error(e: impl std::fmt::Display) -> PublishError {
    PublishError::Archive(e.to_string())
}

/// Entry name of `path` below `root`, with `/` separators.
fn entry_name(root: &Path, path: &Path) -> Result<String> {
    let relative = path.strip_prefix(root).map_err(archive_error)?;
    Ok(relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/"))
}

/// Zip every file below `dir` into `target`, in sorted order.
///
/// Blocking; returns the entry names.
pub fn write_archive(dir: &Path, target: &Path) -> Result<Vec<String>> {
    let mut zip = zip::ZipWriter::new(BufWriter::new(File::create(target)?));
    let mut names = Vec::new();

    for entry in walkdir::WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(archive_error)?;
        if !entry.file_type().is_file() {
            continue;
        }

        let name = entry_name(dir, entry.path())?;
        let size = entry.metadata().map_err(archive_error)?.len();
        let options = FileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .large_file(size >= LARGE_ENTRY_THRESHOLD);

        debug!(entry = %name, size, "Adding archive entry");
        zip.start_file(name.as_str(), options).map_err(archive_error)?;
        std::io::copy(&mut File::open(entry.path())?, &mut zip)?;
        names.push(name);
    }

    zip.finish().map_err(archive_error)?.flush()?;
    Ok(names)
}

/// Zip `dir` into `target` on the blocking pool.
pub async fn zip_directory(dir: PathBuf, target: PathBuf) -> Result<Vec<String>> {
    let path = target.clone();
    let names = tokio::task::spawn_blocking(move || write_archive(&dir, &target))
        .await
        .map_err(archive_error)??;

    let size = tokio::fs::metadata(&path).await?.len();
    info!(archive = %path.display(), entries = names.len(), size, "Built mosaic archive");
    Ok(names)
}
