use anyhow::Result;

use crate::commands::open_store;
use crate::config::Config;
use crate::repository::{TranslationFilter, TranslationRepository};
use crate::translation::TranslationStatus;

const STATUSES: [TranslationStatus; 5] = [
    TranslationStatus::Pending,
    TranslationStatus::Translated,
    TranslationStatus::Reviewed,
    TranslationStatus::Approved,
    TranslationStatus::Rejected,
];

pub fn run(config: &Config, language: Option<String>) -> Result<()> {
    println!("=== transvault status ===\n");

    let store = open_store(config)?;

    match language {
        None => {
            println!(
                "{:<8} {:<20} {:>8} {:>10} {:>8}",
                "code", "name", "strings", "completed", "percent"
            );
            for lang in store.registry().list() {
                let mut flags = Vec::new();
                if lang.is_default {
                    flags.push("default");
                }
                if lang.is_fallback {
                    flags.push("fallback");
                }
                if !lang.is_active {
                    flags.push("inactive");
                }
                println!(
                    "{:<8} {:<20} {:>8} {:>10} {:>7.1}%  {}",
                    lang.code,
                    lang.name,
                    lang.total_strings,
                    lang.translated_strings,
                    lang.completion_percentage,
                    flags.join(", ")
                );
            }
        }
        Some(code) => {
            let lang = store.language(&code)?;
            println!("Language: {} ({})", lang.name, lang.code);
            println!(
                "  Completed: {}/{} ({:.1}%)",
                lang.translated_strings, lang.total_strings, lang.completion_percentage
            );

            let base = TranslationFilter::language(lang.id);
            println!("\nBy status:");
            for status in STATUSES {
                let count = store
                    .repository()
                    .count(&base.clone().with_status(status));
                println!("  {:<12} {}", status.as_str(), count);
            }

            let needs_review = TranslationFilter {
                needs_review: Some(true),
                ..base.clone()
            };
            println!("  {:<12} {}", "needs review", store.repository().count(&needs_review));

            let top = store.most_used(&code, 5)?;
            if !top.is_empty() {
                println!("\nMost used:");
                for t in top {
                    println!("  {}.{}  ({} uses)", t.group, t.key, t.usage_count);
                }
            }
        }
    }

    Ok(())
}
