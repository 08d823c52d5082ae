//! Language registry: the set of languages a catalog is translated into.
//!
//! The registry owns the default/fallback flags and the per-language
//! completion statistics. The translation store reports every mutation back
//! through [`StatsObserver`], so the registry never reaches into the store.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::Path;
use tracing::debug;

use crate::error::{Result, TranslationError};
use crate::fs::FileLock;

/// Stable identifier of a language record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LanguageId(pub u32);

impl fmt::Display for LanguageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A language a catalog is translated into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Language {
    pub id: LanguageId,
    /// Short identifier (e.g., "en")
    pub code: String,
    /// Full locale tag (e.g., "en-US")
    pub locale: String,
    /// English display name
    pub name: String,
    /// Name of the language in the language itself
    pub native_name: String,
    #[serde(default)]
    pub is_rtl: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub is_fallback: bool,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default)]
    pub total_strings: usize,
    #[serde(default)]
    pub translated_strings: usize,
    #[serde(default)]
    pub completion_percentage: f64,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

fn default_true() -> bool {
    true
}

/// Input for registering a new language.
#[derive(Debug, Clone, Default)]
pub struct NewLanguage {
    pub code: String,
    pub locale: String,
    pub name: String,
    pub native_name: String,
    pub is_rtl: bool,
    pub sort_order: i32,
}

impl NewLanguage {
    pub fn new(code: &str, locale: &str, name: &str, native_name: &str) -> Self {
        Self {
            code: code.to_string(),
            locale: locale.to_string(),
            name: name.to_string(),
            native_name: native_name.to_string(),
            ..Self::default()
        }
    }

    pub fn rtl(mut self) -> Self {
        self.is_rtl = true;
        self
    }
}

impl Language {
    /// Recompute the aggregate counters and the derived percentage
    pub fn apply_stats(&mut self, total: usize, translated: usize) {
        self.total_strings = total;
        self.translated_strings = translated;
        self.completion_percentage = if total == 0 {
            0.0
        } else {
            translated as f64 / total as f64 * 100.0
        };
    }
}

/// Receives aggregate counts after the translations of a language change.
pub trait StatsObserver {
    fn update_stats(&mut self, language: LanguageId, total: usize, translated: usize) -> Result<()>;
}

/// Ordered collection of languages with single-default/single-fallback rules.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LanguageRegistry {
    languages: Vec<Language>,
    #[serde(default)]
    next_id: u32,
}

impl LanguageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry seeded with a single language that is both default and fallback.
    pub fn seeded(default_code: &str) -> Self {
        let mut registry = Self::new();
        // A fresh registry cannot hold a duplicate code
        if let Ok(id) = registry.add(new_language_for(default_code)) {
            let _ = registry.set_default(id);
            let _ = registry.set_fallback(id);
        }
        registry
    }

    /// Register a language. The first language added becomes default and fallback.
    pub fn add(&mut self, new: NewLanguage) -> Result<LanguageId> {
        if self.by_code(&new.code).is_some() {
            return Err(TranslationError::policy(
                format!("language '{}'", new.code),
                "code already registered",
            ));
        }
        self.next_id += 1;
        let id = LanguageId(self.next_id);
        let first = self.languages.is_empty();
        self.languages.push(Language {
            id,
            code: new.code,
            locale: new.locale,
            name: new.name,
            native_name: new.native_name,
            is_rtl: new.is_rtl,
            is_active: true,
            is_default: first,
            is_fallback: first,
            sort_order: new.sort_order,
            total_strings: 0,
            translated_strings: 0,
            completion_percentage: 0.0,
            metadata: Map::new(),
        });
        Ok(id)
    }

    pub fn get(&self, id: LanguageId) -> Option<&Language> {
        self.languages.iter().find(|lang| lang.id == id)
    }

    pub fn by_code(&self, code: &str) -> Option<&Language> {
        self.languages.iter().find(|lang| lang.code == code)
    }

    /// Look up by code, failing with `NotFound`
    pub fn require(&self, code: &str) -> Result<&Language> {
        self.by_code(code)
            .ok_or_else(|| TranslationError::not_found("language", code))
    }

    fn get_mut(&mut self, id: LanguageId) -> Result<&mut Language> {
        self.languages
            .iter_mut()
            .find(|lang| lang.id == id)
            .ok_or_else(|| TranslationError::not_found("language", id))
    }

    /// All languages ordered by `sort_order`, then code
    pub fn list(&self) -> Vec<&Language> {
        let mut all: Vec<&Language> = self.languages.iter().collect();
        all.sort_by(|a, b| a.sort_order.cmp(&b.sort_order).then_with(|| a.code.cmp(&b.code)));
        all
    }

    pub fn default_language(&self) -> Option<&Language> {
        self.languages.iter().find(|lang| lang.is_default)
    }

    pub fn fallback_language(&self) -> Option<&Language> {
        self.languages.iter().find(|lang| lang.is_fallback)
    }

    /// Codes to consult after `code` when it lacks a usable translation.
    pub fn fallback_chain(&self, code: &str) -> Vec<String> {
        let mut chain = Vec::new();
        for lang in [self.fallback_language(), self.default_language()]
            .into_iter()
            .flatten()
        {
            if lang.code != code && !chain.contains(&lang.code) {
                chain.push(lang.code.clone());
            }
        }
        chain
    }

    /// Make `id` the only default language (and activate it).
    pub fn set_default(&mut self, id: LanguageId) -> Result<()> {
        self.get_mut(id)?;
        for lang in &mut self.languages {
            lang.is_default = lang.id == id;
            if lang.is_default {
                lang.is_active = true;
            }
        }
        debug!("Default language set to {}", id);
        Ok(())
    }

    /// Make `id` the only fallback language.
    pub fn set_fallback(&mut self, id: LanguageId) -> Result<()> {
        self.get_mut(id)?;
        for lang in &mut self.languages {
            lang.is_fallback = lang.id == id;
        }
        debug!("Fallback language set to {}", id);
        Ok(())
    }

    /// Flip `is_active`; the active default language cannot be deactivated.
    pub fn toggle_active(&mut self, id: LanguageId) -> Result<bool> {
        let lang = self.get_mut(id)?;
        if lang.is_default && lang.is_active {
            return Err(TranslationError::policy(
                format!("language '{}'", lang.code),
                "the default language cannot be deactivated",
            ));
        }
        lang.is_active = !lang.is_active;
        Ok(lang.is_active)
    }

    /// Fails unless `id` exists and is neither the default nor the fallback
    pub fn ensure_removable(&self, id: LanguageId) -> Result<&Language> {
        let lang = self
            .get(id)
            .ok_or_else(|| TranslationError::not_found("language", id))?;
        if lang.is_default || lang.is_fallback {
            return Err(TranslationError::policy(
                format!("language '{}'", lang.code),
                "the default or fallback language cannot be deleted",
            ));
        }
        Ok(lang)
    }

    /// Remove a language record. Translations are removed by the store.
    pub fn remove(&mut self, id: LanguageId) -> Result<Language> {
        self.ensure_removable(id)?;
        let idx = self
            .languages
            .iter()
            .position(|lang| lang.id == id)
            .ok_or_else(|| TranslationError::not_found("language", id))?;
        Ok(self.languages.remove(idx))
    }

    /// Load a registry saved with [`LanguageRegistry::save_locked`]
    pub fn load(path: &Path) -> Result<Option<Self>> {
        match crate::fs::read_locked(path)? {
            Some(content) if !content.trim().is_empty() => Ok(Some(serde_json::from_str(&content)?)),
            _ => Ok(None),
        }
    }

    /// Load the registry at `path` under an exclusive lock.
    ///
    /// Keep the returned lock until [`save_locked`](Self::save_locked) so no
    /// other process changes the file in between.
    pub fn load_exclusive(path: &Path) -> Result<(FileLock, Option<Self>)> {
        let lock = FileLock::exclusive(path)?;
        let registry = match lock.read()? {
            Some(content) if !content.trim().is_empty() => Some(serde_json::from_str(&content)?),
            _ => None,
        };
        Ok((lock, registry))
    }

    /// Write the registry to the file guarded by `lock`
    pub fn save_locked(&self, lock: &FileLock) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        lock.write(&format!("{}\n", content))
    }
}

impl StatsObserver for LanguageRegistry {
    fn update_stats(&mut self, language: LanguageId, total: usize, translated: usize) -> Result<()> {
        let lang = self.get_mut(language)?;
        lang.apply_stats(total, translated);
        debug!(
            "Stats for {}: {}/{} ({:.1}%)",
            lang.code, translated, total, lang.completion_percentage
        );
        Ok(())
    }
}

/// Display metadata for a few common languages, used when seeding.
fn builtin_language(code: &str) -> Option<NewLanguage> {
    let lang = match code {
        "en" => NewLanguage::new("en", "en-US", "English", "English"),
        "es" => NewLanguage::new("es", "es-ES", "Spanish", "Español"),
        "fr" => NewLanguage::new("fr", "fr-FR", "French", "Français"),
        "de" => NewLanguage::new("de", "de-DE", "German", "Deutsch"),
        "ja" => NewLanguage::new("ja", "ja-JP", "Japanese", "日本語"),
        "ar" => NewLanguage::new("ar", "ar-SA", "Arabic", "العربية").rtl(),
        "he" => NewLanguage::new("he", "he-IL", "Hebrew", "עברית").rtl(),
        _ => return None,
    };
    Some(lang)
}

/// Seed input for `code`, with known display names where available
pub fn new_language_for(code: &str) -> NewLanguage {
    builtin_language(code).unwrap_or_else(|| NewLanguage::new(code, code, code, code))
}
