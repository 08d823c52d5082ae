pub mod export;
pub mod extract;
pub mod import;
pub mod language;
pub mod review;
pub mod status;
pub mod translate;

use anyhow::{Context, Result};

use crate::config::Config;
use crate::language::LanguageRegistry;
use crate::repository::JsonFileRepository;
use crate::store::TranslationStore;

pub type FileStore = TranslationStore<JsonFileRepository>;

/// Open the durable store under `config.store_path` for reading.
///
/// A missing language file seeds the registry with the configured default language.
pub fn open_store(config: &Config) -> Result<FileStore> {
    let languages_path = config.languages_path();
    let registry = LanguageRegistry::load(&languages_path)
        .with_context(|| format!("Failed to load languages: {}", languages_path.display()))?;
    build_store(config, registry)
}

/// Run `f` against the store and persist the registry afterwards.
///
/// The language file stays exclusively locked from load to save, so
/// concurrent runs apply their registry changes one after another.
pub fn with_store<T>(config: &Config, f: impl FnOnce(&mut FileStore) -> Result<T>) -> Result<T> {
    let languages_path = config.languages_path();
    let (lock, registry) = LanguageRegistry::load_exclusive(&languages_path)
        .with_context(|| format!("Failed to load languages: {}", languages_path.display()))?;

    let mut store = build_store(config, registry)?;
    let value = f(&mut store)?;
    store
        .registry()
        .save_locked(&lock)
        .with_context(|| format!("Failed to save languages: {}", languages_path.display()))?;
    Ok(value)
}

fn build_store(config: &Config, registry: Option<LanguageRegistry>) -> Result<FileStore> {
    let registry = registry.unwrap_or_else(|| LanguageRegistry::seeded(&config.default_language));

    let translations_path = config.translations_path();
    let repo = JsonFileRepository::open(&translations_path).with_context(|| {
        format!(
            "Failed to open translation store: {}",
            translations_path.display()
        )
    })?;

    let mut store = TranslationStore::new(repo, registry);
    let ids: Vec<_> = store.registry().list().iter().map(|lang| lang.id).collect();
    for id in ids {
        store.recompute_stats(id)?;
    }
    Ok(store)
}
