use anyhow::{Context, Result};
use clap::Parser;
use jar_shrinker::cli::{Cli, Commands, OutputFormat};
use jar_shrinker::closure::{FailedClass, ReachableSet, resolve};
use jar_shrinker::config::{
    clear_workspace, output_archive_path, resolve_workspace, staging_root,
};
use jar_shrinker::extract::extract_archive;
use jar_shrinker::pool::decode_class_refs;
use jar_shrinker::stage::{pack_dir, stage_classes};
use serde::Serialize;
use std::path::Path;
use std::time::Instant;
use tracing::info;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match cli.command.clone() {
        Commands::Shrink {
            classes,
            jar,
            output,
            name,
            format,
        } => {
            let workspace = resolve_workspace(&cli)?;
            let result = shrink(&workspace, &jar, &classes, &output, &name)?;
            write_output(&result, format)?;
        }
        Commands::Closure {
            classes,
            jar,
            format,
        } => {
            let workspace = resolve_workspace(&cli)?;
            let result = closure(&workspace, &jar, &classes)?;
            write_output(&result, format)?;
        }
        Commands::Refs { class_file } => {
            let bytes = std::fs::read(&class_file)
                .with_context(|| format!("Failed to read class file: {}", class_file.display()))?;
            let refs = decode_class_refs(&bytes)
                .with_context(|| format!("Failed to decode class file: {}", class_file.display()))?;
            for name in refs {
                println!("{name}");
            }
        }
        Commands::Clear => {
            let workspace = resolve_workspace(&cli)?;
            let removed = clear_workspace(&workspace)?;
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "workspace": workspace.to_string_lossy(),
                    "removed": removed,
                }))?
            );
        }
    }

    Ok(())
}

fn init_logging(verbose: bool, quiet: bool) {
    use tracing_subscriber::{EnvFilter, fmt};

    let default = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[derive(Debug, Serialize)]
struct ClosureResult {
    jar_path: String,
    extraction_root: String,
    extraction_reused: bool,
    entry_classes: Vec<String>,
    reachable_classes: usize,
    pruned_references: usize,
    failed_classes: Vec<FailedClass>,
    duration_ms: u64,
    classes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    output_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    packed_entries: Option<usize>,
}

impl ClosureResult {
    fn new(jar: &Path, root: &Path, reused: bool, entries: &[String], set: &ReachableSet) -> Self {
        Self {
            jar_path: jar.to_string_lossy().to_string(),
            extraction_root: root.to_string_lossy().to_string(),
            extraction_reused: reused,
            entry_classes: entries.to_vec(),
            reachable_classes: set.len(),
            pruned_references: set.pruned.len(),
            failed_classes: set.failed.clone(),
            duration_ms: 0,
            classes: set.iter().map(str::to_string).collect(),
            output_path: None,
            packed_entries: None,
        }
    }
}

fn closure(workspace: &Path, jar: &Path, entries: &[String]) -> Result<ClosureResult> {
    let start = Instant::now();
    let extraction = extract_archive(jar, workspace)?;

    info!("Searching classes ...");
    let set = resolve(entries, &extraction.root);

    let mut result = ClosureResult::new(jar, &extraction.root, extraction.reused, entries, &set);
    result.duration_ms = start.elapsed().as_millis() as u64;
    Ok(result)
}

fn shrink(
    workspace: &Path,
    jar: &Path,
    entries: &[String],
    output_dir: &Path,
    name: &str,
) -> Result<ClosureResult> {
    let start = Instant::now();
    let extraction = extract_archive(jar, workspace)?;

    info!("Searching classes ...");
    let set = resolve(entries, &extraction.root);
    if set.is_empty() {
        anyhow::bail!(
            "None of the entry classes exist in {} ({})",
            jar.display(),
            entries.join(", ")
        );
    }

    info!("Packing classes ...");
    let staging = staging_root(workspace, &extraction.archive_hash);
    stage_classes(&extraction.root, &set, &staging)?;
    let output_path = output_archive_path(output_dir, name);
    let packed = pack_dir(&staging, &output_path)?;

    let mut result = ClosureResult::new(jar, &extraction.root, extraction.reused, entries, &set);
    result.output_path = Some(output_path.to_string_lossy().to_string());
    result.packed_entries = Some(packed);
    result.duration_ms = start.elapsed().as_millis() as u64;
    Ok(result)
}

fn write_output(result: &ClosureResult, format: OutputFormat) -> Result<()> {
    let content = match format {
        OutputFormat::Json => serde_json::to_string_pretty(result)?,
        OutputFormat::Text => {
            let mut out = String::new();
            out.push_str(&format!("jar_path: {}\n", result.jar_path));
            out.push_str(&format!("reachable_classes: {}\n", result.reachable_classes));
            out.push_str(&format!("pruned_references: {}\n", result.pruned_references));
            if let Some(path) = result.output_path.as_deref() {
                out.push_str(&format!("output_path: {path}\n"));
            }
            out.push_str(&format!("duration_ms: {}\n", result.duration_ms));
            for failed in &result.failed_classes {
                out.push_str(&format!("! {}: {}\n", failed.class_name, failed.reason));
            }
            for class in &result.classes {
                out.push_str(&format!("- {class}\n"));
            }
            out
        }
    };

    print!("{content}");
    if !content.ends_with('\n') {
        println!();
    }
    Ok(())
}
