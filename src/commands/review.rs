use anyhow::Result;

use crate::commands::with_store;
use crate::config::Config;
use crate::store::BulkAction;
use crate::translation::TranslationId;

pub fn run(
    config: &Config,
    action: BulkAction,
    ids: &[u64],
    reviewer: &str,
    comment: Option<&str>,
) -> Result<()> {
    let ids: Vec<TranslationId> = ids.iter().copied().map(TranslationId).collect();
    let outcome = with_store(config, |store| {
        Ok(store.apply_bulk(&ids, action, reviewer, comment)?)
    })?;

    println!("{:?}: {} succeeded", action, outcome.success_count());
    for (id, error) in &outcome.failed {
        eprintln!("  #{}: {}", id, error);
    }
    if outcome.failure_count() > 0 {
        println!("{} failed", outcome.failure_count());
    }
    Ok(())
}
