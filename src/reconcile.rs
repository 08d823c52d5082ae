//! Reconcile extracted keys with the stored translations of one language.
//!
//! `create_missing` adds a pending record (value = key) for every extracted key
//! the language does not have yet. `mark_unused` tags stored records whose key
//! was not extracted with `metadata.marked_unused`; nothing is deleted.

use chrono::Utc;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::info;

use crate::error::Result;
use crate::extractor::{split_key, KeyOccurrence};
use crate::repository::{TranslationFilter, TranslationRepository};
use crate::store::TranslationStore;
use crate::translation::{Translation, TranslationId};

const MARKED_UNUSED: &str = "marked_unused";
const MARKED_UNUSED_AT: &str = "marked_unused_at";

#[derive(Debug, Clone, Default)]
pub struct ReconcileOptions {
    /// Group every key is stored under. When unset, a dotted key
    /// `auth.failed` is stored as group `auth`, key `failed`.
    pub group: Option<String>,
    pub create_missing: bool,
    pub mark_unused: bool,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub created: usize,
    pub marked_unused: usize,
    /// Previously unused records that were extracted again
    pub restored: usize,
    pub unchanged: usize,
}

/// (group, key) a raw extracted key is stored under
pub fn storage_key(raw: &str, group: Option<&str>) -> (String, String) {
    match group {
        Some(group) => (group.to_string(), raw.to_string()),
        None => {
            let (namespace, key) = split_key(raw);
            (namespace.to_string(), key.to_string())
        }
    }
}

pub fn is_marked_unused(t: &Translation) -> bool {
    t.metadata
        .get(MARKED_UNUSED)
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

pub fn reconcile<R: TranslationRepository>(
    store: &mut TranslationStore<R>,
    language: &str,
    occurrences: &[KeyOccurrence],
    options: &ReconcileOptions,
) -> Result<ReconcileReport> {
    let language_id = store.language_id_for(language)?;
    let extracted: BTreeMap<(String, String), &str> = occurrences
        .iter()
        .map(|occ| (storage_key(&occ.key, options.group.as_deref()), occ.key.as_str()))
        .collect();

    let report = store.batch(|store| {
        let mut report = ReconcileReport::default();
        let now = Utc::now();

        for ((group, key), raw) in &extracted {
            match store.repository().find(language_id, group, key) {
                Some(mut existing) if is_marked_unused(&existing) => {
                    existing.metadata.remove(MARKED_UNUSED);
                    existing.metadata.remove(MARKED_UNUSED_AT);
                    existing.updated_at = now;
                    store.put(existing)?;
                    report.restored += 1;
                }
                Some(_) => report.unchanged += 1,
                None if options.create_missing => {
                    let mut t = Translation::new(TranslationId(0), language_id, group, key, now);
                    t.value = Some(key.clone());
                    t.metadata
                        .insert("extracted_key".to_string(), Value::from(*raw));
                    store.put(t)?;
                    report.created += 1;
                }
                None => {}
            }
        }

        if options.mark_unused {
            let mut filter = TranslationFilter::language(language_id);
            if let Some(group) = &options.group {
                filter = filter.with_group(group);
            }
            let stale: Vec<Translation> = store
                .list(&filter)
                .into_iter()
                .filter(|t| !extracted.contains_key(&(t.group.clone(), t.key.clone())))
                .filter(|t| !is_marked_unused(t))
                .collect();
            for mut t in stale {
                t.metadata.insert(MARKED_UNUSED.to_string(), Value::Bool(true));
                t.metadata
                    .insert(MARKED_UNUSED_AT.to_string(), Value::from(now.to_rfc3339()));
                t.updated_at = now;
                store.put(t)?;
                report.marked_unused += 1;
            }
        }

        Ok(report)
    })?;

    info!(
        "Reconciled {} key(s) for {}: {} created, {} marked unused, {} restored",
        extracted.len(),
        language,
        report.created,
        report.marked_unused,
        report.restored
    );
    Ok(report)
}
