//! Plural form selection.
//!
//! The store selects a form through a [`PluralRule`]. The baseline
//! [`OneOtherRule`] only knows `one`/`other`; [`CldrPluralRule`] uses the
//! ICU data for a locale and can be swapped in without touching the store.

use icu_locid::Locale;
use icu_plurals::{PluralCategory, PluralRules};

use crate::translation::Translation;

/// Maps a count to a CLDR plural category name.
pub trait PluralRule {
    fn category(&self, count: u64) -> &'static str;
}

/// `1 -> "one"`, everything else `"other"`
#[derive(Debug, Default, Clone, Copy)]
pub struct OneOtherRule;

impl PluralRule for OneOtherRule {
    fn category(&self, count: u64) -> &'static str {
        if count == 1 {
            "one"
        } else {
            "other"
        }
    }
}

/// Cardinal plural rules for a locale, from ICU compiled data.
pub struct CldrPluralRule {
    locale: String,
    rules: PluralRules,
}

impl std::fmt::Debug for CldrPluralRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CldrPluralRule")
            .field("locale", &self.locale)
            .finish()
    }
}

impl CldrPluralRule {
    /// Rules for `tag` (e.g. "ru", "ar-EG"); `None` if the tag does not parse
    /// or ICU has no data for it.
    pub fn for_locale(tag: &str) -> Option<Self> {
        let locale: Locale = tag.replace('_', "-").parse().ok()?;
        let rules = PluralRules::try_new_cardinal(&(&locale).into()).ok()?;
        Some(Self {
            locale: locale.to_string(),
            rules,
        })
    }
}

impl PluralRule for CldrPluralRule {
    fn category(&self, count: u64) -> &'static str {
        category_name(self.rules.category_for(count))
    }
}

fn category_name(category: PluralCategory) -> &'static str {
    match category {
        PluralCategory::Zero => "zero",
        PluralCategory::One => "one",
        PluralCategory::Two => "two",
        PluralCategory::Few => "few",
        PluralCategory::Many => "many",
        PluralCategory::Other => "other",
    }
}

/// The form of `translation` to show for `count`.
///
/// Without plural forms this is the plain value. Otherwise the rule picks a
/// category; a missing category falls back to `other`, then to the value.
pub fn plural_form_for<'a>(
    translation: &'a Translation,
    count: u64,
    rule: &dyn PluralRule,
) -> Option<&'a str> {
    let plurals = match &translation.plurals {
        Some(plurals) if !plurals.is_empty() => plurals,
        _ => return translation.value.as_deref(),
    };
    plurals
        .get(rule.category(count))
        .or_else(|| plurals.get("other"))
        .map(String::as_str)
        .or(translation.value.as_deref())
}
