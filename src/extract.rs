use ignore::WalkBuilder;
use memmap2::Mmap;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use zip::ZipArchive;

use crate::error::{Result, ShrinkError};
use crate::names::binary_name_from_relative;

pub const EXTRACTION_DIR: &str = "unzip";

#[derive(Debug, Clone)]
pub struct Extraction {
    pub archive_hash: String,
    pub root: PathBuf,
    pub reused: bool,
    pub class_files: usize,
}

/// Extracts `archive_path` under `workspace/<hash>/unzip`, or reuses an
/// existing extraction of identical bytes.
pub fn extract_archive(archive_path: &Path, workspace: &Path) -> Result<Extraction> {
    if !archive_path.is_file() {
        return Err(ShrinkError::ArchiveNotFound {
            path: archive_path.to_path_buf(),
        });
    }

    let file = File::open(archive_path).map_err(|source| ShrinkError::ArchiveUnreadable {
        path: archive_path.to_path_buf(),
        source,
    })?;
    // SAFETY: The file is opened read-only and outlives the mapping, which is
    // dropped at the end of this function.
    let mmap = unsafe { Mmap::map(&file) }.map_err(|source| ShrinkError::ArchiveUnreadable {
        path: archive_path.to_path_buf(),
        source,
    })?;

    let archive_hash = hash_bytes(&mmap);
    let root = workspace.join(&archive_hash).join(EXTRACTION_DIR);

    if root.is_dir() {
        info!("Extracted classes exist, reusing {}", root.display());
        let class_files = count_class_files(&root);
        return Ok(Extraction {
            archive_hash,
            root,
            reused: true,
            class_files,
        });
    }

    info!("Extracting {} ...", archive_path.display());
    let partial = root.with_extension("partial");
    if partial.exists() {
        std::fs::remove_dir_all(&partial).map_err(|e| ShrinkError::extraction(&partial, e))?;
    }
    std::fs::create_dir_all(&partial).map_err(|e| ShrinkError::extraction(&partial, e))?;

    let mut archive = ZipArchive::new(Cursor::new(&mmap[..]))
        .map_err(|e| ShrinkError::extraction(archive_path, e))?;
    unpack(&mut archive, &partial).map_err(|e| ShrinkError::extraction(archive_path, e))?;

    std::fs::rename(&partial, &root).map_err(|e| ShrinkError::extraction(&root, e))?;

    let class_files = count_class_files(&root);
    info!("Extracted {class_files} class files to {}", root.display());
    Ok(Extraction {
        archive_hash,
        root,
        reused: false,
        class_files,
    })
}

fn unpack(archive: &mut ZipArchive<Cursor<&[u8]>>, dest: &Path) -> zip::result::ZipResult<()> {
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let Some(relative) = entry.enclosed_name().map(Path::to_path_buf) else {
            warn!("Skipping archive entry outside extraction root: {}", entry.name());
            continue;
        };
        let target = dest.join(relative);

        if entry.is_dir() {
            std::fs::create_dir_all(&target)?;
            continue;
        }
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&target)?;
        std::io::copy(&mut entry, &mut out)?;
    }
    Ok(())
}

pub fn hash_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

fn count_class_files(root: &Path) -> usize {
    WalkBuilder::new(root)
        .standard_filters(false)
        .build()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_some_and(|t| t.is_file()))
        .filter_map(|entry| {
            let relative = entry.path().strip_prefix(root).ok()?;
            binary_name_from_relative(relative)
        })
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::{SystemTime, UNIX_EPOCH};
    use zip::write::FileOptions;

    fn temp_dir(name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!(
            "jar_shrinker_extract_{}_{}_{}",
            std::process::id(),
            nanos,
            name
        ))
    }

    fn write_jar(path: &Path, entries: &[(&str, &[u8])]) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        let mut zip = zip::ZipWriter::new(file);
        let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);
        for (name, content) in entries {
            zip.start_file(*name, options)?;
            zip.write_all(content)?;
        }
        zip.finish()?;
        Ok(())
    }

    #[test]
    fn extracts_once_and_reuses_identical_archive() -> anyhow::Result<()> {
        let base = temp_dir("reuse");
        let jar = base.join("demo.jar");
        write_jar(
            &jar,
            &[
                ("org/example/A.class", b"a"),
                ("org/example/A$Inner.class", b"b"),
                ("META-INF/MANIFEST.MF", b"Manifest-Version: 1.0\n"),
            ],
        )?;
        let workspace = base.join("workspace");

        let first = extract_archive(&jar, &workspace)?;
        assert!(!first.reused);
        assert_eq!(first.class_files, 2);
        assert_eq!(std::fs::read(first.root.join("org/example/A$Inner.class"))?, b"b");
        assert!(!first.root.with_extension("partial").exists());

        let copy = base.join("copy.jar");
        std::fs::copy(&jar, &copy)?;
        let second = extract_archive(&copy, &workspace)?;
        assert!(second.reused);
        assert_eq!(second.root, first.root);
        assert_eq!(second.archive_hash, first.archive_hash);

        let _ = std::fs::remove_dir_all(base);
        Ok(())
    }

    #[test]
    fn missing_archive_is_named_failure() {
        let base = temp_dir("missing");
        let err = extract_archive(&base.join("nope.jar"), &base).unwrap_err();
        assert!(matches!(err, ShrinkError::ArchiveNotFound { .. }));
    }

    #[test]
    fn corrupt_archive_fails_extraction() -> anyhow::Result<()> {
        let base = temp_dir("corrupt");
        std::fs::create_dir_all(&base)?;
        let jar = base.join("bad.jar");
        std::fs::write(&jar, b"not a zip at all")?;

        let err = extract_archive(&jar, &base.join("workspace")).unwrap_err();
        assert!(matches!(err, ShrinkError::Extraction { .. }));

        let _ = std::fs::remove_dir_all(base);
        Ok(())
    }

    #[test]
    fn hash_bytes_is_hex_sha256() {
        assert_eq!(
            hash_bytes(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
