use anyhow::{bail, Result};

use crate::commands::{open_store, with_store};
use crate::config::Config;
use crate::translation::TranslationAttributes;

/// Create or update one value
pub fn set(
    config: &Config,
    language: &str,
    group: &str,
    key: &str,
    value: &str,
    context: Option<String>,
    translator: Option<String>,
) -> Result<()> {
    let attrs = TranslationAttributes {
        context,
        translator_id: translator,
        ..TranslationAttributes::default()
    };
    let t = with_store(config, |store| Ok(store.upsert(language, group, key, value, attrs)?))?;
    println!("#{} {}.{} [{}] = {}", t.id, t.group, t.key, t.status, value);
    Ok(())
}

/// Resolve a key through the fallback chain and print it
pub fn get(
    config: &Config,
    language: &str,
    group: &str,
    key: &str,
    count: Option<u64>,
    fallbacks: &[String],
) -> Result<()> {
    let mut store = open_store(config)?;
    store.language(language)?;

    let found = if fallbacks.is_empty() {
        store.translate(key, language, group)
    } else {
        store.resolve(key, language, group, fallbacks)
    };
    let Some(t) = found else {
        bail!("No translation for {}.{} in {}", group, key, language);
    };

    let text = match count {
        Some(n) => store.plural_form_for(&t, n),
        None => t.value.clone(),
    };
    println!("{}", text.unwrap_or_default());
    if t.language_id != store.language(language)?.id {
        eprintln!("(from {})", store.code_of(t.language_id));
    }
    Ok(())
}
