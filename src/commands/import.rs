use anyhow::{Context, Result};
use std::path::Path;

use crate::commands::with_store;
use crate::config::Config;
use crate::pack::{self, PackFormat};

/// Format from the file extension (`.json`, `.php`)
pub fn infer_format(path: &Path) -> Option<PackFormat> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(|ext| ext.parse().ok())
}

pub fn run(
    config: &Config,
    language: &str,
    file: &Path,
    format: Option<PackFormat>,
    overwrite: bool,
) -> Result<()> {
    println!("=== transvault import ===\n");

    let format = match format.or_else(|| infer_format(file)) {
        Some(format) => format,
        None => anyhow::bail!(
            "Cannot infer pack format from {}; pass --format",
            file.display()
        ),
    };
    let bytes =
        std::fs::read(file).with_context(|| format!("Failed to read pack: {}", file.display()))?;

    let (report, lang) = with_store(config, |store| {
        let report = pack::import_pack(store, language, &bytes, format, overwrite)
            .with_context(|| format!("Failed to import {}", file.display()))?;
        Ok((report, store.language(language)?.clone()))
    })?;

    println!("  Created: {}", report.created);
    if report.pending > 0 {
        println!("  Pending: {}", report.pending);
    }
    println!("  Updated: {}", report.updated);
    println!("  Skipped: {}", report.skipped);
    if report.skipped > 0 && !overwrite {
        println!("  (use --overwrite to replace existing values)");
    }
    println!(
        "\n{}: {}/{} strings ({:.1}%)",
        lang.code, lang.translated_strings, lang.total_strings, lang.completion_percentage
    );

    Ok(())
}
