use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::extractor::{ExtractOptions, ExtractorConfig, SortField};
use crate::pack::ExportOptions;

const CONFIG_FILES: [&str; 2] = ["transvault.json", "transvault.json5"];

/// Configuration for transvault
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Files or directories scanned by `extract` (e.g., ["app", "resources/views"])
    #[serde(default = "default_input")]
    pub input: Vec<String>,

    /// Directory holding the translation and language stores
    #[serde(default = "default_store_path")]
    pub store_path: String,

    /// Language seeded as default and fallback in a fresh store
    #[serde(default = "default_language")]
    pub default_language: String,

    #[serde(default)]
    pub extractor: ExtractorSettings,

    #[serde(default)]
    pub export: ExportSettings,
}

/// Pattern table plus scan behaviour
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ExtractorSettings {
    #[serde(flatten)]
    pub scan: ExtractorConfig,

    #[serde(default = "default_true")]
    pub recursive: bool,

    /// Keep only the first occurrence of each key
    #[serde(default = "default_true")]
    pub deduplicate: bool,

    #[serde(default)]
    pub sort_by: SortField,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ExportSettings {
    /// Version tag written into pack metadata
    #[serde(default = "default_export_version")]
    pub version: String,

    #[serde(default)]
    pub completed_only: bool,
}

fn default_input() -> Vec<String> {
    vec!["src".to_string()]
}

fn default_store_path() -> String {
    ".transvault".to_string()
}

fn default_language() -> String {
    "en".to_string()
}

fn default_true() -> bool {
    true
}

fn default_export_version() -> String {
    "1.0".to_string()
}

impl Default for ExtractorSettings {
    fn default() -> Self {
        Self {
            scan: ExtractorConfig::default(),
            recursive: true,
            deduplicate: true,
            sort_by: SortField::Key,
        }
    }
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            version: default_export_version(),
            completed_only: false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input: default_input(),
            store_path: default_store_path(),
            default_language: default_language(),
            extractor: ExtractorSettings::default(),
            export: ExportSettings::default(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file, or JSON5 when the extension is `.json5`
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let is_json5 = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json5"));
        let config: Config = if is_json5 {
            json5::from_str(&content)
                .with_context(|| format!("Failed to parse JSON5 config file: {}", path.display()))?
        } else {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        };

        Ok(config)
    }

    /// Load configuration from a JSON string
    pub fn from_json_string(json_str: &str) -> Result<Self> {
        let config: Config =
            serde_json::from_str(json_str).with_context(|| "Failed to parse config JSON string")?;
        Ok(config)
    }

    /// Load the given file, else the first default config file present, else defaults
    pub fn load_or_default<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Self::load_from_dir(Path::new(".")),
        }
    }

    /// Look for a default config file in `dir`
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        for name in CONFIG_FILES {
            let candidate = dir.join(name);
            if candidate.exists() {
                return Self::load(candidate);
            }
        }
        Ok(Self::default())
    }

    pub fn extractor_config(&self) -> ExtractorConfig {
        self.extractor.scan.clone()
    }

    pub fn extract_options(&self) -> ExtractOptions {
        ExtractOptions {
            recursive: self.extractor.recursive,
            deduplicate: self.extractor.deduplicate,
            namespace: None,
            sort_by: self.extractor.sort_by,
        }
    }

    pub fn export_options(&self) -> ExportOptions {
        ExportOptions {
            completed_only: self.export.completed_only,
            version: self.export.version.clone(),
        }
    }

    pub fn input_paths(&self) -> Vec<PathBuf> {
        self.input.iter().map(PathBuf::from).collect()
    }

    pub fn translations_path(&self) -> PathBuf {
        Path::new(&self.store_path).join("translations.json")
    }

    pub fn languages_path(&self) -> PathBuf {
        Path::new(&self.store_path).join("languages.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.input, vec!["src"]);
        assert_eq!(config.default_language, "en");
        assert_eq!(config.extractor.scan.context_radius, 50);
        assert!(config.extractor.deduplicate);
        assert_eq!(config.export.version, "1.0");
        assert_eq!(
            config.translations_path(),
            PathBuf::from(".transvault").join("translations.json")
        );
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = Config::from_json_string(
            r#"{
                "input": ["app", "resources/views"],
                "storePath": "var/i18n",
                "extractor": { "contextRadius": 20, "sortBy": "file", "ignore": ["**/*.min.js"] },
                "export": { "completedOnly": true }
            }"#,
        )
        .unwrap();
        assert_eq!(config.input.len(), 2);
        assert_eq!(config.extractor.scan.context_radius, 20);
        assert_eq!(config.extractor.scan.ignore, vec!["**/*.min.js"]);
        assert_eq!(config.extractor.sort_by, SortField::File);
        // untouched tables fall back to the built-in defaults
        assert!(config.extractor.scan.patterns.contains_key("server"));
        assert_eq!(
            config.extractor.scan.extensions.get("blade.php").map(String::as_str),
            Some("template")
        );
        assert!(config.export.completed_only);
        assert_eq!(config.export.version, "1.0");
        assert_eq!(config.languages_path(), PathBuf::from("var/i18n").join("languages.json"));
    }

    #[test]
    fn test_custom_patterns_replace_table() {
        let config = Config::from_json_string(
            r#"{ "extractor": { "patterns": { "gettext": [ { "name": "underscore", "regex": "_\\(\"([^\"]+)\"\\)" } ] },
                                "extensions": { "py": "gettext" } } }"#,
        )
        .unwrap();
        assert_eq!(config.extractor.scan.patterns.len(), 1);
        let extractor = crate::extractor::Extractor::new(&config.extractor_config()).unwrap();
        let found = extractor.extract_from_content(r#"print(_("hello"))"#, "gettext");
        assert_eq!(found[0].key, "hello");
    }

    #[test]
    fn test_load_json5_and_default_lookup() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("transvault.json5"),
            "{\n  // comments are allowed\n  defaultLanguage: 'es',\n  input: ['app',],\n}\n",
        )
        .unwrap();

        let config = Config::load_from_dir(dir.path()).unwrap();
        assert_eq!(config.default_language, "es");
        assert_eq!(config.input, vec!["app"]);
    }

    #[test]
    fn test_missing_config_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from_dir(dir.path()).unwrap();
        assert_eq!(config.store_path, ".transvault");
    }

    #[test]
    fn test_invalid_config_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("transvault.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = Config::load(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("transvault.json"));
    }
}
