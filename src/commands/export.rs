use anyhow::Result;
use std::path::PathBuf;

use crate::commands::extract::write_artifact;
use crate::commands::open_store;
use crate::config::Config;
use crate::pack::{self, PackFormat};

pub fn run(
    config: &Config,
    language: &str,
    format: PackFormat,
    output: Option<PathBuf>,
    completed_only: bool,
) -> Result<()> {
    println!("=== transvault export ===\n");

    let store = open_store(config)?;
    let mut options = config.export_options();
    options.completed_only |= completed_only;

    let artifact = pack::export_language(&store, language, format, &options)?;
    let dir = output.unwrap_or_else(|| PathBuf::from("."));
    let path = write_artifact(&dir, &artifact.filename, &artifact.bytes)?;

    let lang = store.language(language)?;
    println!("  Language: {} ({})", lang.name, lang.code);
    println!("  Format: {}", format);
    println!("  Completed only: {}", options.completed_only);
    println!("  Written: {}", path.display());
    if format == PackFormat::SourceLiteral {
        println!("  Note: source-literal packs are key scaffolds; values are left empty.");
    }

    println!("\nDone!");
    Ok(())
}
