//! Language pack export and import.
//!
//! A pack is the `group -> key -> value` map of one language. JSON packs also
//! list the keys whose value is only a stand-in awaiting translation, so an
//! import recreates them as pending instead of approving them. [`PackFormat`]
//! selects the encoding; every format goes through [`serialize_pack`] /
//! [`deserialize_pack`] (packs) or [`serialize_occurrences`] (raw extraction
//! output), so callers never branch on the format themselves.

pub mod occurrences;
pub mod source_literal;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use tracing::info;

use crate::error::{Result, TranslationError};
use crate::extractor::{generate_stats, group_by_namespace, split_key, ExtractionStats, KeyOccurrence};
use crate::language::Language;
use crate::repository::TranslationRepository;
use crate::store::TranslationStore;
use crate::translation::{Translation, TranslationId, TranslationStatus};

/// group -> key -> value
pub type PackMap = BTreeMap<String, BTreeMap<String, String>>;

/// group -> keys
pub type PendingKeys = BTreeMap<String, BTreeSet<String>>;

const MAX_DEPTH: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PackFormat {
    Json,
    /// PHP `return [...]` array literals
    SourceLiteral,
    Csv,
    Pot,
}

impl PackFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::SourceLiteral => "php",
            Self::Csv => "csv",
            Self::Pot => "pot",
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::SourceLiteral => "source-literal",
            Self::Csv => "csv",
            Self::Pot => "pot",
        }
    }
}

impl fmt::Display for PackFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PackFormat {
    type Err = TranslationError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "php" | "source-literal" | "source_literal" => Ok(Self::SourceLiteral),
            "csv" => Ok(Self::Csv),
            "pot" => Ok(Self::Pot),
            other => Err(TranslationError::Format(format!(
                "unknown format '{}'",
                other
            ))),
        }
    }
}

/// Generated file content plus a suggested name; writing it is up to the caller.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// `<kind>_<code>_<YYYYmmdd_HHMMSS>.<ext>`
pub fn artifact_name(kind: &str, code: &str, at: DateTime<Utc>, format: PackFormat) -> String {
    format!(
        "{}_{}_{}.{}",
        kind,
        code,
        at.format("%Y%m%d_%H%M%S"),
        format.extension()
    )
}

#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Only records with a non-empty value and a non-pending status
    pub completed_only: bool,
    pub version: String,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            completed_only: false,
            version: "1.0".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackMetadata {
    pub language: String,
    pub locale: String,
    pub name: String,
    pub exported_at: DateTime<Utc>,
    pub version: String,
    pub total_strings: usize,
    pub translated_strings: usize,
    pub exported_strings: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pack {
    pub metadata: PackMetadata,
    pub translations: PackMap,
    /// Exported records that are not completed yet
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub pending: PendingKeys,
}

/// A decoded pack payload
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PackContents {
    pub translations: PackMap,
    pub pending: PendingKeys,
}

impl PackContents {
    /// An empty value is never a translation
    pub fn is_pending(&self, group: &str, key: &str, value: &str) -> bool {
        value.is_empty() || self.pending.get(group).is_some_and(|keys| keys.contains(key))
    }
}

/// Build the pack of `language` from its records
pub fn build_pack(
    language: &Language,
    translations: &[Translation],
    options: &ExportOptions,
    now: DateTime<Utc>,
) -> Pack {
    let mut map = PackMap::new();
    let mut pending = PendingKeys::new();
    let mut exported = 0;
    for t in translations {
        if t.language_id != language.id || (options.completed_only && !t.is_completed()) {
            continue;
        }
        map.entry(t.group.clone())
            .or_default()
            .insert(t.key.clone(), t.value.clone().unwrap_or_default());
        if !t.is_completed() {
            pending.entry(t.group.clone()).or_default().insert(t.key.clone());
        }
        exported += 1;
    }

    Pack {
        metadata: PackMetadata {
            language: language.code.clone(),
            locale: language.locale.clone(),
            name: language.name.clone(),
            exported_at: now,
            version: options.version.clone(),
            total_strings: language.total_strings,
            translated_strings: language.translated_strings,
            exported_strings: exported,
        },
        translations: map,
        pending,
    }
}

/// Encode a pack. CSV and POT only describe extraction output.
pub fn serialize_pack(pack: &Pack, format: PackFormat) -> Result<Vec<u8>> {
    match format {
        PackFormat::Json => {
            let mut json = serde_json::to_string_pretty(pack)?;
            json.push('\n');
            Ok(json.into_bytes())
        }
        PackFormat::SourceLiteral => Ok(source_literal::render(&pack.translations).into_bytes()),
        PackFormat::Csv | PackFormat::Pot => Err(TranslationError::Format(format!(
            "{} export is only available for extracted keys",
            format
        ))),
    }
}

/// Decode a pack payload, validating all of it.
pub fn deserialize_pack(bytes: &[u8], format: PackFormat) -> Result<PackContents> {
    let content = std::str::from_utf8(bytes)
        .map_err(|e| TranslationError::Format(format!("pack is not valid UTF-8: {}", e)))?;
    match format {
        PackFormat::Json => parse_json_pack(content),
        PackFormat::SourceLiteral => Ok(PackContents {
            translations: source_literal::parse(content)?,
            pending: PendingKeys::new(),
        }),
        PackFormat::Csv | PackFormat::Pot => Err(TranslationError::Format(format!(
            "{} packs cannot be imported",
            format
        ))),
    }
}

fn parse_json_pack(content: &str) -> Result<PackContents> {
    let root: Value = serde_json::from_str(content)
        .map_err(|e| TranslationError::Format(format!("invalid JSON: {}", e)))?;
    let groups = root
        .get("translations")
        .and_then(Value::as_object)
        .ok_or_else(|| {
            TranslationError::Format("missing top-level \"translations\" object".to_string())
        })?;

    let mut pack = PackMap::new();
    for (group, entries) in groups {
        let entries = entries.as_object().ok_or_else(|| {
            TranslationError::Format(format!("group \"{}\" is not an object", group))
        })?;
        let mut flat = BTreeMap::new();
        flatten_into(entries, "", group, 0, &mut flat)?;
        pack.insert(group.clone(), flat);
    }

    Ok(PackContents {
        translations: pack,
        pending: parse_pending(root.get("pending"))?,
    })
}

/// Optional `"pending": {"group": ["key", ...]}`
fn parse_pending(value: Option<&Value>) -> Result<PendingKeys> {
    let mut pending = PendingKeys::new();
    let Some(value) = value else {
        return Ok(pending);
    };
    let groups = value
        .as_object()
        .ok_or_else(|| TranslationError::Format("\"pending\" must be an object".to_string()))?;
    for (group, keys) in groups {
        let keys = keys.as_array().ok_or_else(|| {
            TranslationError::Format(format!("pending keys of \"{}\" must be an array", group))
        })?;
        let entry = pending.entry(group.clone()).or_default();
        for key in keys {
            let key = key.as_str().ok_or_else(|| {
                TranslationError::Format(format!(
                    "pending key of \"{}\" must be a string, found {}",
                    group, key
                ))
            })?;
            entry.insert(key.to_string());
        }
    }
    Ok(pending)
}

/// Flatten nested objects to dotted keys; every leaf must be a string.
fn flatten_into(
    object: &Map<String, Value>,
    prefix: &str,
    group: &str,
    depth: usize,
    out: &mut BTreeMap<String, String>,
) -> Result<()> {
    if depth > MAX_DEPTH {
        return Err(TranslationError::Format(format!(
            "group \"{}\" is nested too deeply",
            group
        )));
    }
    for (key, value) in object {
        let full_key = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        match value {
            Value::String(s) => {
                out.insert(full_key, s.clone());
            }
            Value::Object(nested) => flatten_into(nested, &full_key, group, depth + 1, out)?,
            other => {
                return Err(TranslationError::Format(format!(
                    "value of {}.{} must be a string, found {}",
                    group, full_key, other
                )))
            }
        }
    }
    Ok(())
}

/// Export the pack of `language` from the store.
pub fn export_language<R: TranslationRepository>(
    store: &TranslationStore<R>,
    language: &str,
    format: PackFormat,
    options: &ExportOptions,
) -> Result<Artifact> {
    let lang = store.language(language)?;
    let translations = store.translations_for(language, options.completed_only)?;
    let now = Utc::now();
    let pack = build_pack(lang, &translations, options, now);
    let bytes = serialize_pack(&pack, format)?;
    info!(
        "Exported {} string(s) for {} as {}",
        pack.metadata.exported_strings, language, format
    );
    Ok(Artifact {
        filename: artifact_name("translations", &lang.code, now, format),
        bytes,
    })
}

#[derive(Debug, Serialize)]
struct OccurrenceDocument {
    generated_at: DateTime<Utc>,
    stats: ExtractionStats,
    keys: BTreeMap<String, BTreeMap<String, KeyOccurrence>>,
}

/// Encode raw extraction output in any format.
///
/// JSON groups occurrences by namespace with summary stats; the
/// source-literal form is a scaffold of the discovered keys.
pub fn serialize_occurrences(occurrences: &[KeyOccurrence], format: PackFormat) -> Result<Vec<u8>> {
    let text = match format {
        PackFormat::Json => {
            let document = OccurrenceDocument {
                generated_at: Utc::now(),
                stats: generate_stats(occurrences),
                keys: group_by_namespace(occurrences),
            };
            let mut json = serde_json::to_string_pretty(&document)?;
            json.push('\n');
            json
        }
        PackFormat::SourceLiteral => source_literal::render(&occurrence_pack(occurrences)),
        PackFormat::Csv => occurrences::render_csv(occurrences),
        PackFormat::Pot => occurrences::render_pot(occurrences),
    };
    Ok(text.into_bytes())
}

/// Extracted keys as a pack: namespace -> remaining key, values empty
pub fn occurrence_pack(occurrences: &[KeyOccurrence]) -> PackMap {
    let mut pack = PackMap::new();
    for occ in occurrences {
        let (namespace, key) = split_key(&occ.key);
        pack.entry(namespace.to_string())
            .or_default()
            .insert(key.to_string(), String::new());
    }
    pack
}

pub fn export_occurrences(occurrences: &[KeyOccurrence], format: PackFormat) -> Result<Artifact> {
    Ok(Artifact {
        filename: artifact_name("keys", "extracted", Utc::now(), format),
        bytes: serialize_occurrences(occurrences, format)?,
    })
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    /// New records created as `pending`
    pub pending: usize,
}

/// Import a pack into `language`.
///
/// The payload is decoded and validated before anything is written. Existing
/// records are skipped unless `overwrite` is set, in which case their value is
/// replaced and they become `approved`; new records are created `approved`.
/// Pending entries (listed as pending, or with an empty value) never replace an
/// existing record and are created `pending`. Stats are recomputed once at the end.
pub fn import_pack<R: TranslationRepository>(
    store: &mut TranslationStore<R>,
    language: &str,
    bytes: &[u8],
    format: PackFormat,
    overwrite: bool,
) -> Result<ImportReport> {
    let language_id = store.language_id_for(language)?;
    let pack = deserialize_pack(bytes, format)?;

    let report = store.batch(|store| {
        let mut report = ImportReport::default();
        let now = Utc::now();
        for (group, entries) in &pack.translations {
            for (key, value) in entries {
                let pending = pack.is_pending(group, key, value);
                match store.repository().find(language_id, group, key) {
                    Some(_) if pending || !overwrite => report.skipped += 1,
                    Some(mut existing) => {
                        existing.edit_value(Some(value.clone()), now);
                        existing.set_status(TranslationStatus::Approved, now);
                        store.put(existing)?;
                        report.updated += 1;
                    }
                    None if pending => {
                        let mut t = Translation::new(TranslationId(0), language_id, group, key, now);
                        t.value = Some(value.clone()).filter(|v| !v.is_empty());
                        store.put(t)?;
                        report.pending += 1;
                    }
                    None => {
                        let mut t = Translation::new(TranslationId(0), language_id, group, key, now);
                        t.value = Some(value.clone());
                        t.translated_at = Some(now);
                        t.set_status(TranslationStatus::Approved, now);
                        store.put(t)?;
                        report.created += 1;
                    }
                }
            }
        }
        Ok(report)
    })?;

    info!(
        "Imported {} pack into {}: {} created, {} pending, {} updated, {} skipped",
        format, language, report.created, report.pending, report.updated, report.skipped
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::{new_language_for, LanguageRegistry};
    use crate::repository::MemoryRepository;
    use crate::translation::TranslationAttributes;

    fn store() -> TranslationStore<MemoryRepository> {
        let mut store = TranslationStore::new(MemoryRepository::new(), LanguageRegistry::seeded("en"));
        store.add_language(new_language_for("es")).unwrap();
        store
    }

    fn seed(store: &mut TranslationStore<MemoryRepository>) {
        for (group, key, value) in [
            ("auth", "failed", "These credentials do not match."),
            ("auth", "throttle", "Too many attempts."),
            ("nav", "home", "Home – “start”"),
        ] {
            store
                .upsert("en", group, key, value, TranslationAttributes::default())
                .unwrap();
        }
    }

    #[test]
    fn test_format_parsing_and_extensions() {
        assert_eq!("php".parse::<PackFormat>().unwrap(), PackFormat::SourceLiteral);
        assert_eq!("JSON".parse::<PackFormat>().unwrap(), PackFormat::Json);
        assert_eq!(PackFormat::Pot.extension(), "pot");
        assert!(matches!(
            "xliff".parse::<PackFormat>(),
            Err(TranslationError::Format(_))
        ));
    }

    #[test]
    fn test_artifact_name() {
        let at = DateTime::parse_from_rfc3339("2024-03-05T07:08:09Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(
            artifact_name("translations", "es", at, PackFormat::Json),
            "translations_es_20240305_070809.json"
        );
    }

    #[test]
    fn test_json_export_keeps_values_and_unicode() {
        let mut store = store();
        seed(&mut store);
        let artifact = export_language(&store, "en", PackFormat::Json, &ExportOptions::default()).unwrap();
        assert!(artifact.filename.starts_with("translations_en_"));
        assert!(artifact.filename.ends_with(".json"));

        let text = String::from_utf8(artifact.bytes).unwrap();
        assert!(text.contains("Home – “start”"));
        let pack: Pack = serde_json::from_str(&text).unwrap();
        assert_eq!(pack.metadata.language, "en");
        assert_eq!(pack.metadata.version, "1.0");
        assert_eq!(pack.metadata.exported_strings, 3);
        assert_eq!(pack.translations["auth"]["throttle"], "Too many attempts.");
    }

    #[test]
    fn test_completed_only_filters_pending() {
        let mut store = store();
        seed(&mut store);
        let failed = store.find("en", "auth", "failed").unwrap();
        store.approve(failed.id, "rev").unwrap();
        store.update_value(failed.id, "Changed").unwrap();

        let options = ExportOptions {
            completed_only: true,
            ..ExportOptions::default()
        };
        let artifact = export_language(&store, "en", PackFormat::Json, &options).unwrap();
        let pack: Pack = serde_json::from_slice(&artifact.bytes).unwrap();
        assert!(!pack.translations["auth"].contains_key("failed"));
        assert_eq!(pack.metadata.exported_strings, 2);
    }

    #[test]
    fn test_source_literal_export_is_a_scaffold() {
        let mut store = store();
        seed(&mut store);
        let artifact =
            export_language(&store, "en", PackFormat::SourceLiteral, &ExportOptions::default()).unwrap();
        assert!(artifact.filename.ends_with(".php"));
        let text = String::from_utf8(artifact.bytes).unwrap();
        assert!(text.contains("// Namespace: auth\nreturn [\n    'failed' => '',"));
        assert!(!text.contains("These credentials"));
    }

    #[test]
    fn test_csv_pack_export_is_a_format_error() {
        let store = store();
        let err = export_language(&store, "en", PackFormat::Csv, &ExportOptions::default()).unwrap_err();
        assert!(matches!(err, TranslationError::Format(_)));
    }

    #[test]
    fn test_import_counts_and_statuses() {
        let mut store = store();
        store
            .upsert("es", "auth", "failed", "Viejo", TranslationAttributes::default())
            .unwrap();
        let payload = br#"{"translations": {"auth": {"failed": "Fallo", "throttle": "Demasiados"}}}"#;

        let report = import_pack(&mut store, "es", payload, PackFormat::Json, false).unwrap();
        assert_eq!(report, ImportReport { created: 1, updated: 0, skipped: 1, pending: 0 });
        assert_eq!(store.find("es", "auth", "failed").unwrap().value.as_deref(), Some("Viejo"));

        let report = import_pack(&mut store, "es", payload, PackFormat::Json, true).unwrap();
        assert_eq!(report, ImportReport { created: 0, updated: 2, skipped: 0, pending: 0 });
        let failed = store.find("es", "auth", "failed").unwrap();
        assert_eq!(failed.value.as_deref(), Some("Fallo"));
        assert_eq!(failed.status, TranslationStatus::Approved);
        assert!(failed.reviewed_at.is_some());

        let es = store.language("es").unwrap();
        assert_eq!((es.total_strings, es.translated_strings), (2, 2));
    }

    #[test]
    fn test_pending_entries_are_listed_and_imported_as_pending() {
        let mut store = store();
        seed(&mut store);
        let en = store.language_id_for("en").unwrap();
        let mut stub = Translation::new(TranslationId(0), en, "auth", "lockout", Utc::now());
        stub.value = Some("lockout".to_string());
        store.put(stub).unwrap();

        let artifact = export_language(&store, "en", PackFormat::Json, &ExportOptions::default()).unwrap();
        let pack: Pack = serde_json::from_slice(&artifact.bytes).unwrap();
        assert_eq!(pack.pending.len(), 1);
        assert!(pack.pending["auth"].contains("lockout"));

        let report = import_pack(&mut store, "es", &artifact.bytes, PackFormat::Json, false).unwrap();
        assert_eq!(report, ImportReport { created: 3, updated: 0, skipped: 0, pending: 1 });
        assert_eq!(
            store.find("es", "auth", "lockout").unwrap().status,
            TranslationStatus::Pending
        );
        let es = store.language("es").unwrap();
        assert_eq!((es.total_strings, es.translated_strings), (4, 3));
    }

    #[test]
    fn test_empty_values_import_as_pending() {
        let mut store = store();
        let payload = br#"{"translations": {"auth": {"failed": "", "throttle": "Demasiados"}}}"#;
        let report = import_pack(&mut store, "es", payload, PackFormat::Json, false).unwrap();
        assert_eq!((report.created, report.pending), (1, 1));

        let failed = store.find("es", "auth", "failed").unwrap();
        assert_eq!(failed.status, TranslationStatus::Pending);
        assert!(failed.value.is_none());
    }

    #[test]
    fn test_pending_section_must_list_strings() {
        for payload in [
            &br#"{"translations": {}, "pending": ["auth"]}"#[..],
            &br#"{"translations": {}, "pending": {"auth": "lockout"}}"#[..],
            &br#"{"translations": {}, "pending": {"auth": [1]}}"#[..],
        ] {
            let err = deserialize_pack(payload, PackFormat::Json).unwrap_err();
            assert!(matches!(err, TranslationError::Format(_)), "{}", err);
        }
    }

    #[test]
    fn test_import_flattens_nested_objects() {
        let mut store = store();
        let payload = br#"{"translations": {"auth": {"password": {"reset": "Reset"}}}}"#;
        import_pack(&mut store, "es", payload, PackFormat::Json, false).unwrap();
        assert!(store.find("es", "auth", "password.reset").is_some());
    }

    #[test]
    fn test_malformed_import_changes_nothing() {
        let mut store = store();
        for payload in [
            &br#"{"auth": {"failed": "x"}}"#[..],
            &br#"{"translations": {"auth": {"ok": "x", "bad": 3}}}"#[..],
            &br#"{"translations": {"auth": "flat"}}"#[..],
            &b"not json"[..],
        ] {
            let err = import_pack(&mut store, "es", payload, PackFormat::Json, true).unwrap_err();
            assert!(matches!(err, TranslationError::Format(_)), "{}", err);
        }
        assert_eq!(store.language("es").unwrap().total_strings, 0);
        assert!(store.find("es", "auth", "ok").is_none());
    }

    #[test]
    fn test_import_source_literal() {
        let mut store = store();
        let payload = b"<?php\n// Namespace: auth\nreturn ['failed' => 'Fallo'];\n";
        let report = import_pack(&mut store, "es", payload, PackFormat::SourceLiteral, false).unwrap();
        assert_eq!(report.created, 1);
        assert_eq!(store.find("es", "auth", "failed").unwrap().value.as_deref(), Some("Fallo"));
    }

    #[test]
    fn test_occurrence_exports() {
        let occurrences = vec![KeyOccurrence {
            key: "auth.failed".to_string(),
            file: Some("app/a.php".to_string()),
            line: 2,
            kind: "server".to_string(),
            pattern: "translate_helper".to_string(),
            context: "__('auth.failed')".to_string(),
        }];

        let json: Value = serde_json::from_slice(&serialize_occurrences(&occurrences, PackFormat::Json).unwrap()).unwrap();
        assert_eq!(json["keys"]["auth"]["auth.failed"]["line"], 2);
        assert_eq!(json["keys"]["auth"]["auth.failed"]["type"], "server");
        assert_eq!(json["stats"]["unique_keys"], 1);

        let php = String::from_utf8(serialize_occurrences(&occurrences, PackFormat::SourceLiteral).unwrap()).unwrap();
        assert!(php.contains("// Namespace: auth\nreturn [\n    'failed' => '',"));

        let artifact = export_occurrences(&occurrences, PackFormat::Pot).unwrap();
        assert!(artifact.filename.starts_with("keys_extracted_"));
        assert!(String::from_utf8(artifact.bytes).unwrap().contains("#: app/a.php:2"));
    }
}
