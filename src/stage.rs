use ignore::WalkBuilder;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use zip::ZipWriter;
use zip::write::FileOptions;

use crate::closure::ReachableSet;
use crate::error::{Result, ShrinkError};
use crate::names::class_file_path;

pub const MANIFEST_PATH: &str = "META-INF/MANIFEST.MF";
const MANIFEST: &str = concat!(
    "Manifest-Version: 1.0\r\n",
    "Created-By: jar-shrinker ",
    env!("CARGO_PKG_VERSION"),
    "\r\n\r\n"
);

/// Copies every class of `classes` from `root` into a fresh `staging` tree.
/// Returns the number of files copied.
pub fn stage_classes(root: &Path, classes: &ReachableSet, staging: &Path) -> Result<usize> {
    if staging.exists() {
        std::fs::remove_dir_all(staging).map_err(|e| ShrinkError::staging(staging, e))?;
    }
    std::fs::create_dir_all(staging).map_err(|e| ShrinkError::staging(staging, e))?;

    let mut copied = 0usize;
    for name in classes.iter() {
        let from = class_file_path(root, name);
        let to = class_file_path(staging, name);
        if let Some(parent) = to.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ShrinkError::staging(parent, e))?;
        }
        std::fs::copy(&from, &to).map_err(|e| ShrinkError::staging(&from, e))?;
        copied += 1;
    }

    info!("Staged {copied} classes into {}", staging.display());
    Ok(copied)
}

/// Writes every file under `staging` into a deflated jar at `output`,
/// preceded by a minimal manifest. Returns the number of entries written.
pub fn pack_dir(staging: &Path, output: &Path) -> Result<usize> {
    if let Some(parent) = output.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| ShrinkError::packing(output, e))?;
    }

    let mut files = staged_files(staging);
    files.sort();

    let file = File::create(output).map_err(|e| ShrinkError::packing(output, e))?;
    let mut zip = ZipWriter::new(file);
    let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    zip.start_file(MANIFEST_PATH, options)
        .map_err(|e| ShrinkError::packing(output, e))?;
    zip.write_all(MANIFEST.as_bytes())
        .map_err(|e| ShrinkError::packing(output, e))?;

    let mut written = 1usize;
    for relative in files {
        let entry_name = relative.to_string_lossy().replace('\\', "/");
        if entry_name == MANIFEST_PATH {
            continue;
        }
        debug!("Packing {entry_name}");
        let bytes = std::fs::read(staging.join(&relative))
            .map_err(|e| ShrinkError::packing(output, e))?;
        zip.start_file(entry_name, options)
            .map_err(|e| ShrinkError::packing(output, e))?;
        zip.write_all(&bytes)
            .map_err(|e| ShrinkError::packing(output, e))?;
        written += 1;
    }

    zip.finish().map_err(|e| ShrinkError::packing(output, e))?;
    info!("Packed {written} entries into {}", output.display());
    Ok(written)
}

fn staged_files(staging: &Path) -> Vec<PathBuf> {
    WalkBuilder::new(staging)
        .standard_filters(false)
        .build()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_some_and(|t| t.is_file()))
        .filter_map(|entry| {
            entry
                .path()
                .strip_prefix(staging)
                .ok()
                .map(Path::to_path_buf)
        })
        .collect()
}
