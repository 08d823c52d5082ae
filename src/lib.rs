//! Translation key extraction, review workflow and language pack management.
//!
//! - [`extractor`] finds translation keys in source files by pattern.
//! - [`store`] keeps per-language records with a review workflow, plural
//!   forms, fallback resolution and usage tracking.
//! - [`language`] holds the language registry and completion stats.
//! - [`pack`] exports and imports whole languages.
//! - [`reconcile`] feeds extraction results into the store.

pub mod commands;
pub mod config;
pub mod error;
pub mod extractor;
pub mod fs;
pub mod language;
pub mod logging;
pub mod pack;
pub mod plural;
pub mod reconcile;
pub mod repository;
pub mod store;
pub mod translation;

pub use error::{Result, TranslationError};
pub use extractor::{Extractor, KeyOccurrence};
pub use language::{Language, LanguageId, LanguageRegistry};
pub use store::TranslationStore;
pub use translation::{Translation, TranslationId, TranslationStatus};
