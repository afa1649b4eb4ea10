use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};

use crate::cli::Cli;
use crate::extract::EXTRACTION_DIR;

pub const WORKSPACE_ENV: &str = "JAR_SHRINKER_HOME";
pub const STAGING_DIR: &str = "stage";
const PARTIAL_DIR: &str = "unzip.partial";

pub fn resolve_workspace(cli: &Cli) -> Result<PathBuf> {
    if let Some(p) = cli.workspace.clone() {
        return Ok(p);
    }

    if let Ok(p) = env::var(WORKSPACE_ENV)
        && !p.trim().is_empty()
    {
        return Ok(PathBuf::from(p));
    }

    default_workspace()
}

/// Staging tree for one archive, next to its extraction root.
pub fn staging_root(workspace: &Path, archive_hash: &str) -> PathBuf {
    workspace.join(archive_hash).join(STAGING_DIR)
}

pub fn output_archive_path(output_dir: &Path, name: &str) -> PathBuf {
    output_dir.join(name)
}

pub fn clear_workspace(workspace: &Path) -> Result<bool> {
    if !workspace.exists() {
        return Ok(false);
    }
    if !looks_like_workspace(workspace)? {
        anyhow::bail!(
            "Refusing to remove {}: not a jar-shrinker workspace",
            workspace.display()
        );
    }
    std::fs::remove_dir_all(workspace)
        .with_context(|| format!("Failed to remove workspace: {}", workspace.display()))?;
    Ok(true)
}

/// A workspace only holds `<sha256-hex>/{unzip,unzip.partial,stage}` trees.
fn looks_like_workspace(workspace: &Path) -> Result<bool> {
    if !workspace.is_dir() {
        return Ok(false);
    }
    for entry in std::fs::read_dir(workspace)
        .with_context(|| format!("Failed to read workspace: {}", workspace.display()))?
    {
        let entry = entry?;
        let name = entry.file_name();
        let is_hash = name
            .to_str()
            .is_some_and(|s| s.len() == 64 && s.bytes().all(|b| b.is_ascii_hexdigit()));
        if !is_hash || !entry.file_type()?.is_dir() {
            return Ok(false);
        }
        for child in std::fs::read_dir(entry.path())? {
            let child = child?.file_name();
            let known = [EXTRACTION_DIR, PARTIAL_DIR, STAGING_DIR]
                .iter()
                .any(|k| child.as_os_str() == std::ffi::OsStr::new(k));
            if !known {
                return Ok(false);
            }
        }
    }
    Ok(true)
}

fn default_workspace() -> Result<PathBuf> {
    let base = dirs::data_local_dir()
        .or_else(dirs::cache_dir)
        .or_else(dirs::home_dir)
        .ok_or_else(|| anyhow::anyhow!("Failed to resolve data directory"))?;
    Ok(base.join("jar-shrinker"))
}
