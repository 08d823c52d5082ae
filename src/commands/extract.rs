use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

use crate::commands::with_store;
use crate::config::Config;
use crate::extractor::{generate_stats, ExtractOptions, Extractor, SortField};
use crate::pack::{self, PackFormat};
use crate::reconcile::{self, ReconcileOptions};

#[derive(Debug, Clone, Default)]
pub struct ExtractArgs {
    /// Paths to scan instead of `config.input`
    pub paths: Vec<PathBuf>,
    pub namespace: Option<String>,
    pub sort_by: Option<SortField>,
    pub no_dedupe: bool,
    /// Write the occurrences as an artifact in this format
    pub format: Option<PackFormat>,
    pub output: Option<PathBuf>,
    pub create_missing: bool,
    pub mark_unused: bool,
    pub language: Option<String>,
    pub group: Option<String>,
    pub fail_on_warnings: bool,
}

pub fn run(config: &Config, args: ExtractArgs) -> Result<()> {
    println!("=== transvault extract ===\n");

    let paths = if args.paths.is_empty() {
        config.input_paths()
    } else {
        args.paths.clone()
    };

    let mut options: ExtractOptions = config.extract_options();
    options.namespace = args.namespace.clone();
    if let Some(sort_by) = args.sort_by {
        options.sort_by = sort_by;
    }
    if args.no_dedupe {
        options.deduplicate = false;
    }

    println!("Configuration:");
    println!("  Input: {:?}", paths);
    println!("  Sort by: {:?}", options.sort_by);
    println!("  Deduplicate: {}", options.deduplicate);
    println!();

    let extractor = Extractor::new(&config.extractor_config())
        .context("Failed to compile extraction patterns")?;
    let report = extractor.extract(&paths, &options);

    if report.occurrences.is_empty() {
        println!("No translation keys found.");
    } else {
        println!("Extracted keys:");
        println!("{}", "-".repeat(60));
        for occ in &report.occurrences {
            match &occ.file {
                Some(file) => println!("  {}  ({}:{})", occ.key, file, occ.line),
                None => println!("  {}", occ.key),
            }
        }
        println!("{}", "-".repeat(60));
    }

    let stats = generate_stats(&report.occurrences);
    println!("\nExtraction Summary:");
    println!("  Files processed: {}", report.files_scanned);
    println!("  Occurrences: {}", stats.total);
    println!("  Unique keys: {}", stats.unique_keys);
    println!("  Namespaces: {}", stats.namespaces);
    for (kind, count) in &stats.by_type {
        println!("  {}: {}", kind, count);
    }
    if !report.warnings.is_empty() {
        println!("  Warnings: {}", report.warnings.len());
        for warning in &report.warnings {
            eprintln!("  Warning: {}", warning);
        }
    }

    if let Some(format) = args.format {
        let artifact = pack::export_occurrences(&report.occurrences, format)?;
        let dir = args.output.clone().unwrap_or_else(|| PathBuf::from("."));
        let written = write_artifact(&dir, &artifact.filename, &artifact.bytes)?;
        println!("\nWrote {}", written.display());
    }

    if args.create_missing || args.mark_unused {
        let language = args
            .language
            .clone()
            .unwrap_or_else(|| config.default_language.clone());
        let reconcile_options = ReconcileOptions {
            group: args.group.clone(),
            create_missing: args.create_missing,
            mark_unused: args.mark_unused,
        };
        let outcome = with_store(config, |store| {
            Ok(reconcile::reconcile(
                store,
                &language,
                &report.occurrences,
                &reconcile_options,
            )?)
        })?;

        println!("\nReconciled with store ({}):", language);
        println!("  Created: {}", outcome.created);
        println!("  Marked unused: {}", outcome.marked_unused);
        if outcome.restored > 0 {
            println!("  Restored: {}", outcome.restored);
        }
    }

    println!("\nDone!");

    if args.fail_on_warnings && !report.warnings.is_empty() {
        bail!(
            "{} warning(s) encountered (--fail-on-warnings enabled)",
            report.warnings.len()
        );
    }

    Ok(())
}

/// Write an artifact into `dir`, creating it if needed
pub fn write_artifact(dir: &Path, filename: &str, bytes: &[u8]) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
    let path = dir.join(filename);
    std::fs::write(&path, bytes).with_context(|| format!("Failed to write: {}", path.display()))?;
    Ok(path)
}
