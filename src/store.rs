//! Translation store: authoring, review workflow, fallback resolution and
//! usage tracking on top of a [`TranslationRepository`].
//!
//! Every mutation ends in a stats hook that recomputes the owning language's
//! completion figures through [`StatsObserver`]. Inside [`TranslationStore::batch`]
//! the hook is deferred and runs once per affected language when the batch ends.

use chrono::Utc;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

use crate::error::{Result, TranslationError};
use crate::language::{Language, LanguageId, LanguageRegistry, NewLanguage, StatsObserver};
use crate::plural::{self, CldrPluralRule, OneOtherRule, PluralRule};
use crate::repository::{TranslationFilter, TranslationRepository};
use crate::translation::{Translation, TranslationAttributes, TranslationId, TranslationStatus};

/// Workflow action applied to many records at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkAction {
    Approve,
    Reject,
    Delete,
    MarkFuzzy,
    MarkOutdated,
}

impl std::str::FromStr for BulkAction {
    type Err = TranslationError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "approve" => Ok(Self::Approve),
            "reject" => Ok(Self::Reject),
            "delete" => Ok(Self::Delete),
            "fuzzy" | "mark_fuzzy" => Ok(Self::MarkFuzzy),
            "outdated" | "mark_outdated" => Ok(Self::MarkOutdated),
            other => Err(TranslationError::Format(format!(
                "unknown bulk action '{}'",
                other
            ))),
        }
    }
}

/// Per-item result of [`TranslationStore::apply_bulk`].
#[derive(Debug, Default)]
pub struct BulkOutcome {
    pub succeeded: Vec<TranslationId>,
    pub failed: Vec<(TranslationId, TranslationError)>,
}

impl BulkOutcome {
    pub fn success_count(&self) -> usize {
        self.succeeded.len()
    }

    pub fn failure_count(&self) -> usize {
        self.failed.len()
    }
}

pub struct TranslationStore<R: TranslationRepository> {
    repo: R,
    registry: LanguageRegistry,
    plural_rule: Box<dyn PluralRule>,
    /// Languages whose stats are owed at the end of the current batch
    deferred_stats: Option<BTreeSet<LanguageId>>,
}

impl<R: TranslationRepository> TranslationStore<R> {
    pub fn new(repo: R, registry: LanguageRegistry) -> Self {
        Self {
            repo,
            registry,
            plural_rule: Box::new(OneOtherRule),
            deferred_stats: None,
        }
    }

    /// Replace the default plural rule
    pub fn with_plural_rule(mut self, rule: Box<dyn PluralRule>) -> Self {
        self.plural_rule = rule;
        self
    }

    pub fn registry(&self) -> &LanguageRegistry {
        &self.registry
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    pub fn language(&self, code: &str) -> Result<&Language> {
        self.registry.require(code)
    }

    fn language_id(&self, code: &str) -> Result<LanguageId> {
        Ok(self.registry.require(code)?.id)
    }

    // =========================================================================
    // Languages
    // =========================================================================

    pub fn add_language(&mut self, new: NewLanguage) -> Result<LanguageId> {
        let id = self.registry.add(new)?;
        self.recompute_stats(id)?;
        Ok(id)
    }

    pub fn set_default_language(&mut self, code: &str) -> Result<()> {
        let id = self.language_id(code)?;
        self.registry.set_default(id)
    }

    pub fn set_fallback_language(&mut self, code: &str) -> Result<()> {
        let id = self.language_id(code)?;
        self.registry.set_fallback(id)
    }

    /// Flip a language's active flag, returning the new state
    pub fn toggle_language(&mut self, code: &str) -> Result<bool> {
        let id = self.language_id(code)?;
        self.registry.toggle_active(id)
    }

    /// Delete a language and all of its translations.
    ///
    /// Returns the number of translations removed.
    pub fn delete_language(&mut self, code: &str) -> Result<usize> {
        let id = self.language_id(code)?;
        self.registry.ensure_removable(id)?;
        let count = self.repo.remove_language(id)?;
        let removed = self.registry.remove(id)?;
        info!("Deleted language {} and {} translation(s)", removed.code, count);
        Ok(count)
    }

    // =========================================================================
    // Stats hook
    // =========================================================================

    /// Recompute total/completed counts for a language now.
    pub fn recompute_stats(&mut self, language: LanguageId) -> Result<()> {
        if self.registry.get(language).is_none() {
            return Ok(());
        }
        let (total, translated) = self.repo.language_counts(language);
        StatsObserver::update_stats(&mut self.registry, language, total, translated)
    }

    fn after_mutation(&mut self, language: LanguageId) -> Result<()> {
        match self.deferred_stats.as_mut() {
            Some(pending) => {
                pending.insert(language);
                Ok(())
            }
            None => self.recompute_stats(language),
        }
    }

    /// Run `f` as one logical transaction.
    ///
    /// Repository writes are grouped and stats are recomputed once per
    /// affected language when the outermost batch ends, even if `f` fails.
    /// Mutations made before a failure are kept.
    pub fn batch<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let outermost = self.deferred_stats.is_none();
        self.repo.begin_batch()?;
        if outermost {
            self.deferred_stats = Some(BTreeSet::new());
        }

        let result = f(self);

        let commit = self.repo.commit_batch();
        if outermost {
            let affected = self.deferred_stats.take().unwrap_or_default();
            for language in affected {
                self.recompute_stats(language)?;
            }
        }
        let value = result?;
        commit?;
        Ok(value)
    }

    // =========================================================================
    // Lookup & resolution
    // =========================================================================

    pub fn get(&self, id: TranslationId) -> Result<Translation> {
        self.repo
            .get(id)
            .ok_or_else(|| TranslationError::not_found("translation", id))
    }

    pub fn find(&self, language: &str, group: &str, key: &str) -> Option<Translation> {
        let id = self.registry.by_code(language)?.id;
        self.repo.find(id, group, key)
    }

    pub fn list(&self, filter: &TranslationFilter) -> Vec<Translation> {
        self.repo.list(filter)
    }

    /// Translations of a language, optionally restricted to completed ones
    pub fn translations_for(&self, language: &str, completed_only: bool) -> Result<Vec<Translation>> {
        let id = self.language_id(language)?;
        let mut records = self.repo.list(&TranslationFilter::language(id));
        if completed_only {
            records.retain(Translation::is_completed);
        }
        Ok(records)
    }

    /// First usable record for `key` in `language`, then in each fallback in order.
    ///
    /// Usable means a non-empty value. The returned record has its usage
    /// counter bumped. Unknown language codes are skipped; a miss is `None`.
    pub fn resolve(
        &mut self,
        key: &str,
        language: &str,
        group: &str,
        fallbacks: &[String],
    ) -> Option<Translation> {
        let candidates = std::iter::once(language).chain(fallbacks.iter().map(String::as_str));
        let mut found = None;
        for code in candidates {
            let Some(lang) = self.registry.by_code(code) else {
                continue;
            };
            if let Some(t) = self.repo.find(lang.id, group, key) {
                if t.has_value() {
                    found = Some(t);
                    break;
                }
            }
        }

        let mut translation = found?;
        translation.record_usage(Utc::now());
        match self.repo.upsert(translation.clone()) {
            Ok(stored) => Some(stored),
            Err(e) => {
                warn!("Failed to record usage for {}.{}: {}", group, key, e);
                Some(translation)
            }
        }
    }

    /// [`resolve`](Self::resolve) through the registry's fallback chain
    pub fn translate(&mut self, key: &str, language: &str, group: &str) -> Option<Translation> {
        let chain = self.registry.fallback_chain(language);
        self.resolve(key, language, group, &chain)
    }

    /// Plural form of `translation` for `count`.
    ///
    /// A `plural_rule` override on the record names a locale whose CLDR rules
    /// are used instead of the store's default rule.
    pub fn plural_form_for(&self, translation: &Translation, count: u64) -> Option<String> {
        let override_rule = translation
            .plural_rule
            .as_deref()
            .and_then(CldrPluralRule::for_locale);
        let rule: &dyn PluralRule = match &override_rule {
            Some(rule) => rule as &dyn PluralRule,
            None => self.plural_rule.as_ref(),
        };
        plural::plural_form_for(translation, count, rule).map(str::to_string)
    }

    /// Most used records of a language, highest `usage_count` first
    pub fn most_used(&self, language: &str, limit: usize) -> Result<Vec<Translation>> {
        let mut records = self.translations_for(language, false)?;
        records.retain(|t| t.usage_count > 0);
        records.sort_by(|a, b| {
            b.usage_count
                .cmp(&a.usage_count)
                .then_with(|| a.group.cmp(&b.group))
                .then_with(|| a.key.cmp(&b.key))
        });
        records.truncate(limit);
        Ok(records)
    }

    // =========================================================================
    // Authoring
    // =========================================================================

    fn new_translation(
        &self,
        language: LanguageId,
        group: &str,
        key: &str,
        value: &str,
        attrs: TranslationAttributes,
    ) -> Translation {
        let now = Utc::now();
        let mut t = Translation::new(TranslationId(0), language, group, key, now);
        t.value = Some(value.to_string());
        t.set_status(TranslationStatus::Translated, now);
        t.apply_attributes(attrs, now);
        t
    }

    /// Create a record; fails with `DuplicateKey` if it already exists.
    pub fn create(
        &mut self,
        language: &str,
        group: &str,
        key: &str,
        value: &str,
        attrs: TranslationAttributes,
    ) -> Result<Translation> {
        let id = self.language_id(language)?;
        if self.repo.find(id, group, key).is_some() {
            return Err(TranslationError::DuplicateKey {
                language: language.to_string(),
                group: group.to_string(),
                key: key.to_string(),
            });
        }
        let t = self.new_translation(id, group, key, value, attrs);
        let stored = self.repo.insert(t)?;
        self.after_mutation(id)?;
        Ok(stored)
    }

    /// Create or update the record for (language, group, key).
    ///
    /// New records start `translated`. Changing the value of a reviewed,
    /// approved or rejected record sends it back to `pending`.
    pub fn upsert(
        &mut self,
        language: &str,
        group: &str,
        key: &str,
        value: &str,
        attrs: TranslationAttributes,
    ) -> Result<Translation> {
        let id = self.language_id(language)?;
        let t = match self.repo.find(id, group, key) {
            Some(mut existing) => {
                let now = Utc::now();
                existing.edit_value(Some(value.to_string()), now);
                existing.apply_attributes(attrs, now);
                existing
            }
            None => self.new_translation(id, group, key, value, attrs),
        };
        let stored = self.repo.upsert(t)?;
        self.after_mutation(id)?;
        Ok(stored)
    }

    /// Store a record built by the caller as-is (import and reconciliation paths)
    pub(crate) fn put(&mut self, translation: Translation) -> Result<Translation> {
        let language = translation.language_id;
        let stored = self.repo.upsert(translation)?;
        self.after_mutation(language)?;
        Ok(stored)
    }

    pub(crate) fn language_id_for(&self, code: &str) -> Result<LanguageId> {
        self.language_id(code)
    }

    /// Change only the value of an existing record
    pub fn update_value(&mut self, id: TranslationId, value: &str) -> Result<Translation> {
        self.modify(id, |t| {
            t.edit_value(Some(value.to_string()), Utc::now());
            Ok(())
        })
    }

    fn modify(
        &mut self,
        id: TranslationId,
        f: impl FnOnce(&mut Translation) -> Result<()>,
    ) -> Result<Translation> {
        let mut t = self.get(id)?;
        f(&mut t)?;
        let stored = self.repo.upsert(t)?;
        self.after_mutation(stored.language_id)?;
        Ok(stored)
    }

    // =========================================================================
    // Workflow
    // =========================================================================

    pub fn approve(&mut self, id: TranslationId, reviewer_id: &str) -> Result<Translation> {
        self.modify(id, |t| t.approve(reviewer_id, Utc::now()))
    }

    pub fn reject(
        &mut self,
        id: TranslationId,
        reviewer_id: &str,
        comment: Option<&str>,
    ) -> Result<Translation> {
        self.modify(id, |t| t.reject(reviewer_id, comment, Utc::now()))
    }

    pub fn mark_reviewed(&mut self, id: TranslationId, reviewer_id: &str) -> Result<Translation> {
        self.modify(id, |t| {
            t.mark_reviewed(reviewer_id, Utc::now());
            Ok(())
        })
    }

    pub fn mark_fuzzy(&mut self, id: TranslationId) -> Result<Translation> {
        self.modify(id, |t| {
            t.mark_fuzzy(Utc::now());
            Ok(())
        })
    }

    pub fn mark_outdated(&mut self, id: TranslationId) -> Result<Translation> {
        self.modify(id, |t| {
            t.mark_outdated(Utc::now());
            Ok(())
        })
    }

    /// Record the current source string; a change flags the record outdated
    pub fn sync_source(&mut self, id: TranslationId, source: &str) -> Result<Translation> {
        self.modify(id, |t| {
            t.sync_source(source, Utc::now());
            Ok(())
        })
    }

    pub fn delete(&mut self, id: TranslationId) -> Result<Translation> {
        let removed = self.repo.remove(id)?;
        self.after_mutation(removed.language_id)?;
        Ok(removed)
    }

    /// Apply `action` to every id inside one batch.
    ///
    /// Failures are collected per item and do not stop the batch; records
    /// already changed stay changed. Stats are recomputed once per language.
    pub fn apply_bulk(
        &mut self,
        ids: &[TranslationId],
        action: BulkAction,
        reviewer_id: &str,
        comment: Option<&str>,
    ) -> Result<BulkOutcome> {
        let outcome = self.batch(|store| {
            let mut outcome = BulkOutcome::default();
            for &id in ids {
                let result = match action {
                    BulkAction::Approve => store.approve(id, reviewer_id).map(|_| ()),
                    BulkAction::Reject => store.reject(id, reviewer_id, comment).map(|_| ()),
                    BulkAction::Delete => store.delete(id).map(|_| ()),
                    BulkAction::MarkFuzzy => store.mark_fuzzy(id).map(|_| ()),
                    BulkAction::MarkOutdated => store.mark_outdated(id).map(|_| ()),
                };
                match result {
                    Ok(()) => outcome.succeeded.push(id),
                    Err(e) => {
                        debug!("Bulk {:?} failed for {}: {}", action, id, e);
                        outcome.failed.push((id, e));
                    }
                }
            }
            Ok(outcome)
        })?;
        info!(
            "Bulk {:?}: {} succeeded, {} failed",
            action,
            outcome.success_count(),
            outcome.failure_count()
        );
        Ok(outcome)
    }

    /// Code for a language id (falls back to the numeric id)
    pub fn code_of(&self, id: LanguageId) -> String {
        self.registry
            .get(id)
            .map(|lang| lang.code.clone())
            .unwrap_or_else(|| id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::new_language_for;
    use crate::repository::MemoryRepository;
    use std::collections::BTreeMap;

    fn store() -> TranslationStore<MemoryRepository> {
        let mut store = TranslationStore::new(MemoryRepository::new(), LanguageRegistry::seeded("en"));
        store.add_language(new_language_for("es")).unwrap();
        store.add_language(new_language_for("fr")).unwrap();
        store
    }

    fn stats(store: &TranslationStore<MemoryRepository>, code: &str) -> (usize, usize, f64) {
        let lang = store.language(code).unwrap();
        (lang.total_strings, lang.translated_strings, lang.completion_percentage)
    }

    #[test]
    fn test_upsert_creates_translated_and_updates_stats() {
        let mut store = store();
        let t = store
            .upsert("en", "auth", "failed", "Login failed", TranslationAttributes::default())
            .unwrap();
        assert_eq!(t.status, TranslationStatus::Translated);
        assert!(t.translated_at.is_some());
        assert_eq!(stats(&store, "en"), (1, 1, 100.0));
    }

    #[test]
    fn test_create_rejects_duplicate() {
        let mut store = store();
        store
            .create("en", "auth", "failed", "x", TranslationAttributes::default())
            .unwrap();
        let err = store
            .create("en", "auth", "failed", "y", TranslationAttributes::default())
            .unwrap_err();
        assert!(matches!(err, TranslationError::DuplicateKey { ref language, .. } if language == "en"));
    }

    #[test]
    fn test_upsert_unknown_language_is_not_found() {
        let mut store = store();
        let err = store
            .upsert("xx", "auth", "failed", "x", TranslationAttributes::default())
            .unwrap_err();
        assert!(matches!(err, TranslationError::NotFound { .. }));
    }

    #[test]
    fn test_resolve_walks_fallbacks_in_order() {
        let mut store = store();
        store
            .upsert("fr", "auth", "failed", "Échec", TranslationAttributes::default())
            .unwrap();
        store
            .upsert("es", "auth", "failed", "", TranslationAttributes::default())
            .unwrap();

        let chain = vec!["es".to_string(), "fr".to_string()];
        let hit = store.resolve("failed", "en", "auth", &chain).unwrap();
        assert_eq!(hit.value.as_deref(), Some("Échec"));
        assert_eq!(hit.usage_count, 1);
        assert!(hit.last_used_at.is_some());

        assert!(store.resolve("missing", "en", "auth", &chain).is_none());
        assert!(store.resolve("failed", "zz", "auth", &[]).is_none());
    }

    #[test]
    fn test_resolve_prefers_primary_language() {
        let mut store = store();
        store
            .upsert("en", "auth", "failed", "Failed", TranslationAttributes::default())
            .unwrap();
        store
            .upsert("es", "auth", "failed", "Fallo", TranslationAttributes::default())
            .unwrap();

        let hit = store.resolve("failed", "es", "auth", &["en".to_string()]).unwrap();
        assert_eq!(hit.value.as_deref(), Some("Fallo"));
        assert_eq!(store.find("en", "auth", "failed").unwrap().usage_count, 0);
    }

    #[test]
    fn test_translate_uses_registry_fallback() {
        let mut store = store();
        store
            .upsert("en", "auth", "failed", "Failed", TranslationAttributes::default())
            .unwrap();
        let hit = store.translate("failed", "fr", "auth").unwrap();
        assert_eq!(hit.value.as_deref(), Some("Failed"));
    }

    #[test]
    fn test_approve_twice_errors_and_keeps_reviewed_at() {
        let mut store = store();
        let t = store
            .upsert("en", "auth", "failed", "Failed", TranslationAttributes::default())
            .unwrap();
        let approved = store.approve(t.id, "rev-1").unwrap();
        assert!(approved.reviewed_at.is_some());
        assert_eq!(approved.reviewer_id.as_deref(), Some("rev-1"));

        let err = store.approve(t.id, "rev-2").unwrap_err();
        assert!(matches!(err, TranslationError::PolicyViolation { .. }));
        assert_eq!(store.get(t.id).unwrap().reviewed_at, approved.reviewed_at);
    }

    #[test]
    fn test_edit_approved_value_resets_to_pending() {
        let mut store = store();
        let t = store
            .upsert("en", "auth", "failed", "Failed", TranslationAttributes::default())
            .unwrap();
        store.approve(t.id, "rev").unwrap();

        let edited = store
            .upsert("en", "auth", "failed", "Login failed", TranslationAttributes::default())
            .unwrap();
        assert_eq!(edited.id, t.id);
        assert_eq!(edited.status, TranslationStatus::Pending);
        assert!(edited.reviewed_at.is_none());
        assert!(edited.reviewer_id.is_none());
        // Pending records no longer count as completed
        assert_eq!(stats(&store, "en"), (1, 0, 0.0));
    }

    #[test]
    fn test_reject_and_flags() {
        let mut store = store();
        let t = store
            .upsert("en", "auth", "failed", "Failed", TranslationAttributes::default())
            .unwrap();
        let rejected = store.reject(t.id, "rev", Some("Too literal")).unwrap();
        assert_eq!(rejected.status, TranslationStatus::Rejected);
        assert_eq!(rejected.comment.as_deref(), Some("Too literal"));
        assert!(store.reject(t.id, "rev", None).is_err());

        let fuzzy = store.mark_fuzzy(t.id).unwrap();
        assert!(fuzzy.is_fuzzy && fuzzy.needs_review);
        let outdated = store.mark_outdated(t.id).unwrap();
        assert!(outdated.is_outdated && outdated.needs_review);
    }

    #[test]
    fn test_attributes_are_applied_and_clamped() {
        let mut store = store();
        let attrs = TranslationAttributes {
            quality_score: Some(250),
            context: Some("Login form".to_string()),
            translator_id: Some("user-3".to_string()),
            ..TranslationAttributes::default()
        };
        let t = store.upsert("en", "auth", "failed", "Failed", attrs).unwrap();
        assert_eq!(t.quality_score, Some(100));
        assert_eq!(t.context.as_deref(), Some("Login form"));
        assert_eq!(t.translator_id.as_deref(), Some("user-3"));
    }

    #[test]
    fn test_plural_form_default_and_override() {
        let mut store = store();
        let mut plurals = BTreeMap::new();
        plurals.insert("one".to_string(), "1 item".to_string());
        plurals.insert("few".to_string(), "{n} items (few)".to_string());
        plurals.insert("other".to_string(), "{n} items".to_string());
        let attrs = TranslationAttributes {
            plurals: Some(plurals),
            ..TranslationAttributes::default()
        };
        let mut t = store.upsert("en", "cart", "items", "items", attrs).unwrap();

        assert_eq!(store.plural_form_for(&t, 1).as_deref(), Some("1 item"));
        assert_eq!(store.plural_form_for(&t, 3).as_deref(), Some("{n} items"));

        t.plural_rule = Some("pl".to_string());
        assert_eq!(store.plural_form_for(&t, 3).as_deref(), Some("{n} items (few)"));
    }

    #[test]
    fn test_delete_recomputes_stats() {
        let mut store = store();
        let a = store
            .upsert("en", "auth", "failed", "Failed", TranslationAttributes::default())
            .unwrap();
        store
            .upsert("en", "auth", "throttle", "Slow", TranslationAttributes::default())
            .unwrap();
        assert_eq!(stats(&store, "en").0, 2);

        store.delete(a.id).unwrap();
        assert_eq!(stats(&store, "en"), (1, 1, 100.0));
        assert!(matches!(
            store.delete(a.id),
            Err(TranslationError::NotFound { .. })
        ));
    }

    #[test]
    fn test_bulk_reports_partial_failures() {
        let mut store = store();
        let a = store
            .upsert("en", "auth", "a", "A", TranslationAttributes::default())
            .unwrap();
        let b = store
            .upsert("es", "auth", "b", "B", TranslationAttributes::default())
            .unwrap();
        store.approve(b.id, "rev").unwrap();

        let ids = [a.id, b.id, TranslationId(999)];
        let outcome = store.apply_bulk(&ids, BulkAction::Approve, "rev", None).unwrap();
        assert_eq!(outcome.succeeded, vec![a.id]);
        assert_eq!(outcome.failure_count(), 2);
        assert_eq!(store.get(a.id).unwrap().status, TranslationStatus::Approved);
    }

    #[test]
    fn test_bulk_delete_recomputes_each_language() {
        let mut store = store();
        let a = store
            .upsert("en", "auth", "a", "A", TranslationAttributes::default())
            .unwrap();
        let b = store
            .upsert("es", "auth", "b", "B", TranslationAttributes::default())
            .unwrap();
        store
            .upsert("es", "auth", "c", "C", TranslationAttributes::default())
            .unwrap();

        let outcome = store
            .apply_bulk(&[a.id, b.id], BulkAction::Delete, "rev", None)
            .unwrap();
        assert_eq!(outcome.success_count(), 2);
        assert_eq!(stats(&store, "en"), (0, 0, 0.0));
        assert_eq!(stats(&store, "es"), (1, 1, 100.0));
    }

    #[test]
    fn test_delete_language_policy_and_cascade() {
        let mut store = store();
        store
            .upsert("es", "auth", "failed", "Fallo", TranslationAttributes::default())
            .unwrap();

        let err = store.delete_language("en").unwrap_err();
        assert!(matches!(err, TranslationError::PolicyViolation { .. }));

        assert_eq!(store.delete_language("es").unwrap(), 1);
        assert!(store.language("es").is_err());
        assert_eq!(store.list(&TranslationFilter::default()).len(), 0);
    }

    /// Memory repository whose bulk language removal always fails
    struct FailingLanguageRemoval(MemoryRepository);

    impl TranslationRepository for FailingLanguageRemoval {
        fn get(&self, id: TranslationId) -> Option<Translation> {
            self.0.get(id)
        }

        fn find(&self, language: LanguageId, group: &str, key: &str) -> Option<Translation> {
            self.0.find(language, group, key)
        }

        fn list(&self, filter: &TranslationFilter) -> Vec<Translation> {
            self.0.list(filter)
        }

        fn insert(&mut self, translation: Translation) -> Result<Translation> {
            self.0.insert(translation)
        }

        fn upsert(&mut self, translation: Translation) -> Result<Translation> {
            self.0.upsert(translation)
        }

        fn remove(&mut self, id: TranslationId) -> Result<Translation> {
            self.0.remove(id)
        }

        fn remove_language(&mut self, _language: LanguageId) -> Result<usize> {
            Err(TranslationError::io(
                "translations.json",
                std::io::Error::other("disk full"),
            ))
        }
    }

    #[test]
    fn test_failed_language_delete_keeps_registry_entry() {
        let mut store = TranslationStore::new(
            FailingLanguageRemoval(MemoryRepository::new()),
            LanguageRegistry::seeded("en"),
        );
        store.add_language(new_language_for("es")).unwrap();
        store
            .upsert("es", "auth", "failed", "Fallo", TranslationAttributes::default())
            .unwrap();

        assert!(matches!(
            store.delete_language("es"),
            Err(TranslationError::Io { .. })
        ));
        assert_eq!(store.language("es").unwrap().total_strings, 1);
        assert!(store.find("es", "auth", "failed").is_some());
    }

    #[test]
    fn test_most_used_orders_by_usage() {
        let mut store = store();
        for key in ["a", "b", "c"] {
            store
                .upsert("en", "g", key, key, TranslationAttributes::default())
                .unwrap();
        }
        store.resolve("b", "en", "g", &[]);
        store.resolve("b", "en", "g", &[]);
        store.resolve("c", "en", "g", &[]);

        let top = store.most_used("en", 5).unwrap();
        let keys: Vec<_> = top.iter().map(|t| t.key.as_str()).collect();
        assert_eq!(keys, vec!["b", "c"]);
    }

    #[test]
    fn test_bulk_action_parses() {
        assert_eq!("approve".parse::<BulkAction>().unwrap(), BulkAction::Approve);
        assert_eq!("fuzzy".parse::<BulkAction>().unwrap(), BulkAction::MarkFuzzy);
        assert!("archive".parse::<BulkAction>().is_err());
    }
}
