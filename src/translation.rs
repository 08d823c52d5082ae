//! Translation records and their review workflow.
//!
//! Transitions here are pure: they take `now` from the caller and never touch
//! storage or statistics. [`crate::store::TranslationStore`] persists the
//! result and runs the stats hook.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, TranslationError};
use crate::language::LanguageId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TranslationId(pub u64);

impl fmt::Display for TranslationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Review state of a translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranslationStatus {
    #[default]
    Pending,
    Translated,
    Reviewed,
    Approved,
    Rejected,
}

impl TranslationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Translated => "translated",
            Self::Reviewed => "reviewed",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// States that were signed off by someone and must be re-reviewed after an edit
    fn is_reviewed_state(&self) -> bool {
        matches!(self, Self::Reviewed | Self::Approved | Self::Rejected)
    }
}

impl fmt::Display for TranslationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TranslationStatus {
    type Err = TranslationError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(Self::Pending),
            "translated" => Ok(Self::Translated),
            "reviewed" => Ok(Self::Reviewed),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(TranslationError::Format(format!(
                "unknown translation status '{}'",
                other
            ))),
        }
    }
}

/// A translated string for one (language, group, key).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Translation {
    pub id: TranslationId,
    pub language_id: LanguageId,
    pub group: String,
    pub key: String,
    pub value: Option<String>,
    /// Plural category name -> form
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plurals: Option<BTreeMap<String, String>>,
    /// Locale whose plural rules select a form, overriding the store default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plural_rule: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    #[serde(default)]
    pub status: TranslationStatus,
    #[serde(default)]
    pub needs_review: bool,
    #[serde(default)]
    pub is_fuzzy: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_score: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_outdated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translator_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewer_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub usage_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Optional attributes supplied alongside a value when authoring.
#[derive(Debug, Clone, Default)]
pub struct TranslationAttributes {
    pub plurals: Option<BTreeMap<String, String>>,
    pub plural_rule: Option<String>,
    pub context: Option<String>,
    pub comment: Option<String>,
    /// Merged into the existing metadata map
    pub metadata: Option<Map<String, Value>>,
    /// Clamped to 0..=100
    pub quality_score: Option<i64>,
    pub source_value: Option<String>,
    pub translator_id: Option<String>,
    /// Explicit status; timestamps follow the usual transition rules
    pub status: Option<TranslationStatus>,
    pub is_fuzzy: Option<bool>,
    pub needs_review: Option<bool>,
}

impl Translation {
    /// Fresh record with no value, `pending`
    pub fn new(
        id: TranslationId,
        language_id: LanguageId,
        group: &str,
        key: &str,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            language_id,
            group: group.to_string(),
            key: key.to_string(),
            value: None,
            plurals: None,
            plural_rule: None,
            context: None,
            comment: None,
            metadata: Map::new(),
            status: TranslationStatus::Pending,
            needs_review: false,
            is_fuzzy: false,
            quality_score: None,
            source_value: None,
            source_updated_at: None,
            is_outdated: false,
            translator_id: None,
            reviewer_id: None,
            translated_at: None,
            reviewed_at: None,
            usage_count: 0,
            last_used_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Non-empty value, regardless of status
    pub fn has_value(&self) -> bool {
        self.value.as_deref().is_some_and(|v| !v.is_empty())
    }

    /// Counts towards a language's translated strings
    pub fn is_completed(&self) -> bool {
        self.has_value() && self.status != TranslationStatus::Pending
    }

    /// Move to `status`, stamping `translated_at` / `reviewed_at` as the state requires.
    pub fn set_status(&mut self, status: TranslationStatus, now: DateTime<Utc>) {
        self.status = status;
        match status {
            TranslationStatus::Translated => self.translated_at = Some(now),
            TranslationStatus::Reviewed | TranslationStatus::Approved => {
                self.reviewed_at = Some(now)
            }
            TranslationStatus::Pending | TranslationStatus::Rejected => {}
        }
        self.updated_at = now;
    }

    /// Replace the value. Returns false when the value is unchanged.
    ///
    /// A signed-off record goes back to `pending` and loses its reviewer; a
    /// pending record becomes `translated`.
    pub fn edit_value(&mut self, value: Option<String>, now: DateTime<Utc>) -> bool {
        if self.value == value {
            return false;
        }
        self.value = value;
        if self.status.is_reviewed_state() {
            self.set_status(TranslationStatus::Pending, now);
            self.reviewed_at = None;
            self.reviewer_id = None;
        } else if self.status == TranslationStatus::Pending && self.has_value() {
            self.set_status(TranslationStatus::Translated, now);
        }
        self.updated_at = now;
        true
    }

    pub fn approve(&mut self, reviewer_id: &str, now: DateTime<Utc>) -> Result<()> {
        if self.status == TranslationStatus::Approved {
            return Err(TranslationError::policy(
                self.describe(),
                "translation is already approved",
            ));
        }
        self.set_status(TranslationStatus::Approved, now);
        self.needs_review = false;
        self.is_fuzzy = false;
        self.reviewer_id = Some(reviewer_id.to_string());
        Ok(())
    }

    pub fn reject(
        &mut self,
        reviewer_id: &str,
        comment: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if self.status == TranslationStatus::Rejected {
            return Err(TranslationError::policy(
                self.describe(),
                "translation is already rejected",
            ));
        }
        self.set_status(TranslationStatus::Rejected, now);
        self.needs_review = false;
        self.reviewer_id = Some(reviewer_id.to_string());
        self.reviewed_at = Some(now);
        if let Some(note) = comment.map(str::trim).filter(|c| !c.is_empty()) {
            self.comment = Some(match self.comment.take() {
                Some(existing) if !existing.is_empty() => format!("{}\n{}", existing, note),
                _ => note.to_string(),
            });
        }
        Ok(())
    }

    pub fn mark_reviewed(&mut self, reviewer_id: &str, now: DateTime<Utc>) {
        self.set_status(TranslationStatus::Reviewed, now);
        self.needs_review = false;
        self.reviewer_id = Some(reviewer_id.to_string());
    }

    pub fn mark_fuzzy(&mut self, now: DateTime<Utc>) {
        self.is_fuzzy = true;
        self.needs_review = true;
        self.updated_at = now;
    }

    pub fn mark_outdated(&mut self, now: DateTime<Utc>) {
        self.is_outdated = true;
        self.needs_review = true;
        self.updated_at = now;
    }

    pub fn set_quality_score(&mut self, score: i64) {
        self.quality_score = Some(score.clamp(0, 100) as u8);
    }

    pub fn record_usage(&mut self, now: DateTime<Utc>) {
        self.usage_count = self.usage_count.saturating_add(1);
        self.last_used_at = Some(now);
    }

    /// Track the source string this translation was made from.
    ///
    /// A changed source flags the translation as outdated. Returns true when
    /// the source differed from the recorded one.
    pub fn sync_source(&mut self, source: &str, now: DateTime<Utc>) -> bool {
        if self.source_value.as_deref() == Some(source) {
            return false;
        }
        let had_source = self.source_value.is_some();
        self.source_value = Some(source.to_string());
        self.source_updated_at = Some(now);
        if had_source {
            self.mark_outdated(now);
        }
        self.updated_at = now;
        true
    }

    /// Apply authoring attributes; `None` fields leave the record untouched.
    pub fn apply_attributes(&mut self, attrs: TranslationAttributes, now: DateTime<Utc>) {
        if let Some(plurals) = attrs.plurals {
            self.plurals = Some(plurals);
        }
        if let Some(rule) = attrs.plural_rule {
            self.plural_rule = Some(rule);
        }
        if let Some(context) = attrs.context {
            self.context = Some(context);
        }
        if let Some(comment) = attrs.comment {
            self.comment = Some(comment);
        }
        if let Some(metadata) = attrs.metadata {
            self.metadata.extend(metadata);
        }
        if let Some(score) = attrs.quality_score {
            self.set_quality_score(score);
        }
        if let Some(source) = attrs.source_value {
            self.sync_source(&source, now);
        }
        if let Some(translator) = attrs.translator_id {
            self.translator_id = Some(translator);
        }
        if let Some(fuzzy) = attrs.is_fuzzy {
            self.is_fuzzy = fuzzy;
        }
        if let Some(needs_review) = attrs.needs_review {
            self.needs_review = needs_review;
        }
        if let Some(status) = attrs.status {
            self.set_status(status, now);
        }
        self.updated_at = now;
    }

    fn describe(&self) -> String {
        format!("translation {} ({}.{})", self.id, self.group, self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn translation() -> Translation {
        let mut t = Translation::new(
            TranslationId(1),
            LanguageId(1),
            "auth",
            "failed",
            Utc::now(),
        );
        t.value = Some("These credentials do not match.".to_string());
        t.set_status(TranslationStatus::Translated, Utc::now());
        t
    }

    #[test]
    fn test_status_round_trips_through_strings() {
        for status in [
            TranslationStatus::Pending,
            TranslationStatus::Translated,
            TranslationStatus::Reviewed,
            TranslationStatus::Approved,
            TranslationStatus::Rejected,
        ] {
            assert_eq!(status.as_str().parse::<TranslationStatus>().unwrap(), status);
        }
        assert!("done".parse::<TranslationStatus>().is_err());
    }

    #[test]
    fn test_completed_requires_value_and_non_pending() {
        let mut t = translation();
        assert!(t.is_completed());

        t.status = TranslationStatus::Pending;
        assert!(!t.is_completed());

        t.status = TranslationStatus::Approved;
        t.value = Some(String::new());
        assert!(!t.is_completed());
    }

    #[test]
    fn test_approve_sets_reviewer_and_clears_flags() {
        let mut t = translation();
        t.mark_fuzzy(Utc::now());
        let now = Utc::now();
        t.approve("reviewer-7", now).unwrap();

        assert_eq!(t.status, TranslationStatus::Approved);
        assert_eq!(t.reviewer_id.as_deref(), Some("reviewer-7"));
        assert_eq!(t.reviewed_at, Some(now));
        assert!(!t.needs_review);
        assert!(!t.is_fuzzy);
    }

    #[test]
    fn test_second_approve_fails_and_keeps_timestamp() {
        let mut t = translation();
        let first = Utc::now();
        t.approve("r1", first).unwrap();

        let err = t.approve("r2", first + Duration::seconds(5)).unwrap_err();
        assert!(matches!(err, TranslationError::PolicyViolation { .. }));
        assert_eq!(t.reviewed_at, Some(first));
        assert_eq!(t.reviewer_id.as_deref(), Some("r1"));
    }

    #[test]
    fn test_reject_appends_comment_once() {
        let mut t = translation();
        t.comment = Some("Keep it short".to_string());
        t.reject("r1", Some("Wrong tone"), Utc::now()).unwrap();

        assert_eq!(t.status, TranslationStatus::Rejected);
        assert!(t.reviewed_at.is_some());
        assert_eq!(t.comment.as_deref(), Some("Keep it short\nWrong tone"));
        assert!(t.reject("r1", None, Utc::now()).is_err());
    }

    #[test]
    fn test_edit_after_approval_requires_new_review() {
        let mut t = translation();
        t.approve("r1", Utc::now()).unwrap();

        assert!(t.edit_value(Some("Invalid login.".to_string()), Utc::now()));
        assert_eq!(t.status, TranslationStatus::Pending);
        assert!(t.reviewed_at.is_none());
        assert!(t.reviewer_id.is_none());
    }

    #[test]
    fn test_edit_pending_becomes_translated() {
        let mut t = Translation::new(TranslationId(2), LanguageId(1), "auth", "throttle", Utc::now());
        t.value = Some("auth.throttle".to_string());

        assert!(t.edit_value(Some("Too many attempts.".to_string()), Utc::now()));
        assert_eq!(t.status, TranslationStatus::Translated);
        assert!(t.translated_at.is_some());
        assert!(!t.edit_value(Some("Too many attempts.".to_string()), Utc::now()));
    }

    #[test]
    fn test_quality_score_is_clamped() {
        let mut t = translation();
        t.set_quality_score(150);
        assert_eq!(t.quality_score, Some(100));
        t.set_quality_score(-3);
        assert_eq!(t.quality_score, Some(0));
    }

    #[test]
    fn test_sync_source_flags_drift_only_on_change() {
        let mut t = translation();
        assert!(t.sync_source("Login failed", Utc::now()));
        assert!(!t.is_outdated);

        assert!(!t.sync_source("Login failed", Utc::now()));
        assert!(t.sync_source("Login failed!", Utc::now()));
        assert!(t.is_outdated);
        assert!(t.needs_review);
        assert!(t.source_updated_at.is_some());
    }

    #[test]
    fn test_record_usage_counts() {
        let mut t = translation();
        t.record_usage(Utc::now());
        t.record_usage(Utc::now());
        assert_eq!(t.usage_count, 2);
        assert!(t.last_used_at.is_some());
    }
}
