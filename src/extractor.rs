use glob::Pattern;
use rayon::prelude::*;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, warn};
use unicode_normalization::{is_nfc_quick, IsNormalized, UnicodeNormalization};

use crate::error::{Result, TranslationError};
use crate::fs::{extension_candidates, FileSystem, RealFileSystem};

/// Normalize a key to NFC so that composed and decomposed spellings of the
/// same text deduplicate. Already-normalized keys are borrowed.
fn normalize_key(key: &str) -> Cow<'_, str> {
    match is_nfc_quick(key.chars()) {
        IsNormalized::Yes => Cow::Borrowed(key),
        _ => Cow::Owned(key.nfc().collect()),
    }
}

// =============================================================================
// Pattern table
// =============================================================================
//
// Each source kind owns an ordered list of call-site patterns. Capture group 1
// (or a group named `key`) is the translation key. New kinds are added through
// configuration, not code.

/// Quoted literal accepted by server-side helpers: `'key'` or `"key"`
const SERVER_KEY: &str = r#"\(\s*['"]([^'"]+)['"]"#;

/// Quoted literal accepted by client helpers; backtick strings with
/// `${...}` interpolation are not static keys and do not match
const CLIENT_KEY: &str = r#"\(\s*['"`]([^'"`$]+)['"`]"#;

/// A single named extraction rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternSpec {
    pub name: String,
    pub regex: String,
}

impl PatternSpec {
    fn new(name: &str, regex: String) -> Self {
        Self {
            name: name.to_string(),
            regex,
        }
    }
}

fn default_patterns() -> BTreeMap<String, Vec<PatternSpec>> {
    let mut table = BTreeMap::new();
    table.insert(
        "server".to_string(),
        vec![
            PatternSpec::new("translate_helper", format!(r"\b__{}", SERVER_KEY)),
            PatternSpec::new("trans", format!(r"\btrans{}", SERVER_KEY)),
            PatternSpec::new("trans_choice", format!(r"\btrans_choice{}", SERVER_KEY)),
            PatternSpec::new("lang_facade", format!(r"\bLang::(?:get|choice|has){}", SERVER_KEY)),
        ],
    );
    table.insert(
        "template".to_string(),
        vec![
            PatternSpec::new("lang_directive", format!(r"@lang{}", SERVER_KEY)),
            PatternSpec::new("choice_directive", format!(r"@choice{}", SERVER_KEY)),
            PatternSpec::new("translate_helper", format!(r"\b__{}", SERVER_KEY)),
            PatternSpec::new("trans", format!(r"\btrans{}", SERVER_KEY)),
            PatternSpec::new("trans_choice", format!(r"\btrans_choice{}", SERVER_KEY)),
        ],
    );
    table.insert(
        "script".to_string(),
        vec![
            PatternSpec::new("dollar_t", format!(r"\$t{}", CLIENT_KEY)),
            PatternSpec::new("i18n_t", format!(r"\bi18n\.t{}", CLIENT_KEY)),
            // `(?m)^` or a non-identifier char on the same line, so `$t(`,
            // `i18n.t(` and `format(` are not matched twice
            PatternSpec::new("t_call", format!(r"(?m)(?:^|[^\w$.\n])t{}", CLIENT_KEY)),
            PatternSpec::new("translate_helper", format!(r"\b__{}", CLIENT_KEY)),
        ],
    );
    table.insert(
        "component".to_string(),
        vec![
            PatternSpec::new("dollar_t", format!(r"\$t{}", CLIENT_KEY)),
            PatternSpec::new("t_call", format!(r"(?m)(?:^|[^\w$.\n])t{}", CLIENT_KEY)),
            PatternSpec::new(
                "i18n_key_attr",
                r#"\bi18n-?[kK]ey\s*=\s*["']([^"']+)["']"#.to_string(),
            ),
            PatternSpec::new("v_t_directive", r#"\bv-t\s*=\s*"'([^'"]+)'""#.to_string()),
        ],
    );
    table
}

fn default_extensions() -> BTreeMap<String, String> {
    [
        ("php", "server"),
        ("blade.php", "template"),
        ("twig", "template"),
        ("js", "script"),
        ("mjs", "script"),
        ("cjs", "script"),
        ("ts", "script"),
        ("vue", "component"),
        ("jsx", "component"),
        ("tsx", "component"),
        ("svelte", "component"),
    ]
    .into_iter()
    .map(|(ext, kind)| (ext.to_string(), kind.to_string()))
    .collect()
}

fn default_exclude_dirs() -> Vec<String> {
    [
        ".git",
        "node_modules",
        "vendor",
        "storage",
        "bootstrap/cache",
        "dist",
        "build",
        "target",
        "public/build",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_context_radius() -> usize {
    50
}

/// Declarative extractor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractorConfig {
    /// Source kind -> ordered extraction patterns
    #[serde(default = "default_patterns")]
    pub patterns: BTreeMap<String, Vec<PatternSpec>>,

    /// File extension (without leading dot, compound allowed) -> source kind
    #[serde(default = "default_extensions")]
    pub extensions: BTreeMap<String, String>,

    /// Directory names (or `a/b` segment paths) never scanned
    #[serde(default = "default_exclude_dirs")]
    pub exclude_dirs: Vec<String>,

    /// Glob patterns for paths to skip
    #[serde(default)]
    pub ignore: Vec<String>,

    /// Characters of context captured on each side of a match
    #[serde(default = "default_context_radius")]
    pub context_radius: usize,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            patterns: default_patterns(),
            extensions: default_extensions(),
            exclude_dirs: default_exclude_dirs(),
            ignore: Vec::new(),
            context_radius: default_context_radius(),
        }
    }
}

// =============================================================================
// Results
// =============================================================================

/// One place a translation key was found
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyOccurrence {
    pub key: String,
    /// Source file; `None` when scanning raw text
    pub file: Option<String>,
    /// 1-based line of the match
    pub line: usize,
    /// Source kind the pattern belongs to
    #[serde(rename = "type")]
    pub kind: String,
    /// Name of the pattern that matched
    pub pattern: String,
    /// Text around the match
    pub context: String,
}

/// Field used to order extraction output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortField {
    #[default]
    Key,
    File,
    Line,
    Type,
}

impl FromStr for SortField {
    type Err = TranslationError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "key" => Ok(Self::Key),
            "file" => Ok(Self::File),
            "line" => Ok(Self::Line),
            "type" | "kind" => Ok(Self::Type),
            other => Err(TranslationError::Format(format!(
                "unknown sort field '{}'",
                other
            ))),
        }
    }
}

/// Post-processing applied by [`Extractor::extract`]
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    pub recursive: bool,
    /// Keep only the first occurrence of each key
    pub deduplicate: bool,
    /// Keep only keys starting with this prefix
    pub namespace: Option<String>,
    pub sort_by: SortField,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            recursive: true,
            deduplicate: true,
            namespace: None,
            sort_by: SortField::Key,
        }
    }
}

/// Merged output of a scan
#[derive(Debug, Default)]
pub struct ExtractionReport {
    pub occurrences: Vec<KeyOccurrence>,
    pub files_scanned: usize,
    /// Paths that were skipped; never fatal
    pub warnings: Vec<TranslationError>,
}

impl ExtractionReport {
    fn merge(&mut self, other: ExtractionReport) {
        self.occurrences.extend(other.occurrences);
        self.files_scanned += other.files_scanned;
        self.warnings.extend(other.warnings);
    }

    fn warn(&mut self, path: &Path, reason: impl Into<String>) {
        let warning = TranslationError::ExtractionWarning {
            path: path.to_path_buf(),
            reason: reason.into(),
        };
        warn!("{}", warning);
        self.warnings.push(warning);
    }
}

/// Aggregate figures over a list of occurrences
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractionStats {
    pub total: usize,
    pub unique_keys: usize,
    pub namespaces: usize,
    pub files: usize,
    pub by_type: BTreeMap<String, usize>,
    /// Up to ten most frequent keys with their counts
    pub top_keys: Vec<(String, usize)>,
}

// =============================================================================
// Extractor
// =============================================================================

struct CompiledPattern {
    name: String,
    regex: Regex,
    /// Capture group holding the key
    group: usize,
}

/// Scans text, files and directories for translation keys.
pub struct Extractor<F: FileSystem = RealFileSystem> {
    fs: F,
    patterns: HashMap<String, Vec<CompiledPattern>>,
    /// (extension, kind) with compound extensions first
    extensions: Vec<(String, String)>,
    exclude_dirs: Vec<Vec<String>>,
    ignore: Vec<Pattern>,
    context_radius: usize,
}

impl Extractor<RealFileSystem> {
    pub fn new(config: &ExtractorConfig) -> Result<Self> {
        Self::with_fs(config, RealFileSystem)
    }
}

impl<F: FileSystem> Extractor<F> {
    pub fn with_fs(config: &ExtractorConfig, fs: F) -> Result<Self> {
        let mut patterns = HashMap::new();
        for (kind, specs) in &config.patterns {
            let compiled = specs
                .iter()
                .map(|spec| compile_pattern(kind, spec))
                .collect::<Result<Vec<_>>>()?;
            patterns.insert(kind.clone(), compiled);
        }

        let mut extensions: Vec<(String, String)> = config
            .extensions
            .iter()
            .map(|(ext, kind)| (ext.trim_start_matches('.').to_lowercase(), kind.clone()))
            .collect();
        // Compound extensions ("blade.php") win over their plain suffix ("php")
        extensions.sort_by(|a, b| {
            let dots = |ext: &str| ext.matches('.').count();
            dots(&b.0).cmp(&dots(&a.0)).then_with(|| a.0.cmp(&b.0))
        });

        let exclude_dirs = config
            .exclude_dirs
            .iter()
            .map(|dir| {
                dir.split(['/', '\\'])
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect::<Vec<_>>()
            })
            .filter(|segments| !segments.is_empty())
            .collect();

        Ok(Self {
            fs,
            patterns,
            extensions,
            exclude_dirs,
            ignore: compile_ignore_patterns(&config.ignore)?,
            context_radius: config.context_radius,
        })
    }

    /// Source kind for a path, preferring compound extensions
    pub fn kind_for_path(&self, path: &Path) -> Option<&str> {
        let candidates = extension_candidates(path);
        self.extensions
            .iter()
            .find(|(ext, _)| candidates.iter().any(|c| c == ext))
            .map(|(_, kind)| kind.as_str())
    }

    /// Apply every pattern of `kind` to `content`.
    ///
    /// Output order is pattern order, then match order within a pattern.
    /// Unknown kinds produce no occurrences.
    pub fn extract_from_content(&self, content: &str, kind: &str) -> Vec<KeyOccurrence> {
        self.scan(content, kind, None)
    }

    fn scan(&self, content: &str, kind: &str, file: Option<&str>) -> Vec<KeyOccurrence> {
        let Some(patterns) = self.patterns.get(kind) else {
            debug!("No patterns configured for kind '{}'", kind);
            return Vec::new();
        };

        let line_starts = line_starts(content);
        let mut occurrences = Vec::new();

        for pattern in patterns {
            for caps in pattern.regex.captures_iter(content) {
                let (Some(whole), Some(key)) = (caps.get(0), caps.get(pattern.group)) else {
                    continue;
                };
                let key = normalize_key(key.as_str().trim());
                if key.is_empty() {
                    continue;
                }
                occurrences.push(KeyOccurrence {
                    key: key.into_owned(),
                    file: file.map(String::from),
                    line: line_at(&line_starts, whole.start()),
                    kind: kind.to_string(),
                    pattern: pattern.name.clone(),
                    context: context_slice(content, whole.start(), whole.end(), self.context_radius),
                });
            }
        }

        occurrences
    }

    /// Extract from one file, choosing the kind from its extension
    pub fn extract_from_file(&self, path: &Path) -> Result<Vec<KeyOccurrence>> {
        let kind = self
            .kind_for_path(path)
            .ok_or_else(|| TranslationError::ExtractionWarning {
                path: path.to_path_buf(),
                reason: "no source kind for this file extension".to_string(),
            })?;
        let content = self
            .fs
            .read_to_string(path)
            .map_err(|e| TranslationError::ExtractionWarning {
                path: path.to_path_buf(),
                reason: format!("unreadable: {}", e),
            })?;
        let file = path.display().to_string();
        Ok(self.scan(&content, kind, Some(&file)))
    }

    /// Extract from every recognised file under `root`.
    ///
    /// Files are read on the rayon pool; output keeps the sorted walk order.
    pub fn extract_from_directory(&self, root: &Path, recursive: bool) -> Result<ExtractionReport> {
        if !self.fs.is_dir(root) {
            return Err(TranslationError::ExtractionWarning {
                path: root.to_path_buf(),
                reason: "not a directory".to_string(),
            });
        }

        let prune = |dir: &Path| self.is_excluded(root, dir);
        let files: Vec<PathBuf> = self
            .fs
            .list_files(root, recursive, &prune)?
            .into_iter()
            .filter(|path| !self.is_excluded(root, path))
            .filter(|path| !self.is_ignored(root, path))
            .filter(|path| self.kind_for_path(path).is_some())
            .collect();

        debug!("Scanning {} file(s) under {}", files.len(), root.display());

        let results: Vec<Result<Vec<KeyOccurrence>>> = files
            .par_iter()
            .map(|path| self.extract_from_file(path))
            .collect();

        let mut report = ExtractionReport::default();
        for (path, result) in files.iter().zip(results) {
            match result {
                Ok(occurrences) => {
                    report.files_scanned += 1;
                    report.occurrences.extend(occurrences);
                }
                Err(e) => {
                    let reason = match e {
                        TranslationError::ExtractionWarning { reason, .. } => reason,
                        other => other.to_string(),
                    };
                    report.warn(path, reason);
                }
            }
        }
        Ok(report)
    }

    /// Scan `paths`, then deduplicate, filter and sort per `options`.
    ///
    /// Missing or unreadable paths are recorded as warnings and skipped.
    pub fn extract(&self, paths: &[PathBuf], options: &ExtractOptions) -> ExtractionReport {
        let mut report = ExtractionReport::default();

        for path in paths {
            if self.fs.is_dir(path) {
                match self.extract_from_directory(path, options.recursive) {
                    Ok(dir_report) => report.merge(dir_report),
                    Err(e) => report.warn(path, e.to_string()),
                }
            } else if self.fs.is_file(path) {
                match self.extract_from_file(path) {
                    Ok(occurrences) => {
                        report.files_scanned += 1;
                        report.occurrences.extend(occurrences);
                    }
                    Err(TranslationError::ExtractionWarning { reason, .. }) => {
                        report.warn(path, reason)
                    }
                    Err(e) => report.warn(path, e.to_string()),
                }
            } else {
                report.warn(path, "path does not exist");
            }
        }

        report.occurrences = post_process(std::mem::take(&mut report.occurrences), options);
        report
    }

    /// Ignore globs are tried against the path as walked and relative to `root`
    fn is_ignored(&self, root: &Path, path: &Path) -> bool {
        let relative = path.strip_prefix(root).unwrap_or(path);
        matches_ignore_path(path, &self.ignore) || matches_ignore_path(relative, &self.ignore)
    }

    fn is_excluded(&self, root: &Path, path: &Path) -> bool {
        let relative = path.strip_prefix(root).unwrap_or(path);
        let components: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        self.exclude_dirs.iter().any(|segments| {
            components
                .windows(segments.len())
                .any(|window| window == segments.as_slice())
        })
    }
}

fn compile_pattern(kind: &str, spec: &PatternSpec) -> Result<CompiledPattern> {
    let invalid = |reason: String| TranslationError::InvalidPattern {
        kind: kind.to_string(),
        name: spec.name.clone(),
        reason,
    };
    let regex = Regex::new(&spec.regex).map_err(|e| invalid(e.to_string()))?;
    let group = match regex.capture_names().position(|name| name == Some("key")) {
        Some(idx) => idx,
        None if regex.captures_len() > 1 => 1,
        None => return Err(invalid("pattern has no capture group for the key".to_string())),
    };
    Ok(CompiledPattern {
        name: spec.name.clone(),
        regex,
        group,
    })
}

fn matches_ignore_path(path: &Path, patterns: &[Pattern]) -> bool {
    patterns.iter().any(|pattern| pattern.matches_path(path))
}

fn compile_ignore_patterns(patterns: &[String]) -> Result<Vec<Pattern>> {
    patterns
        .iter()
        .map(|pattern| {
            Pattern::new(pattern).map_err(|e| {
                TranslationError::Format(format!("invalid ignore glob '{}': {}", pattern, e))
            })
        })
        .collect()
}

/// Byte offsets at which each line begins
fn line_starts(content: &str) -> Vec<usize> {
    std::iter::once(0)
        .chain(content.match_indices('\n').map(|(idx, _)| idx + 1))
        .collect()
}

/// 1-based line containing `offset` (newlines before it, plus one)
fn line_at(line_starts: &[usize], offset: usize) -> usize {
    line_starts.partition_point(|&start| start <= offset)
}

/// Up to `radius` characters on each side of `start..end`, trimmed
fn context_slice(content: &str, start: usize, end: usize, radius: usize) -> String {
    let from = if radius == 0 {
        start
    } else {
        content[..start]
            .char_indices()
            .rev()
            .take(radius)
            .last()
            .map(|(idx, _)| idx)
            .unwrap_or(start)
    };
    let to = content[end..]
        .char_indices()
        .nth(radius)
        .map(|(idx, _)| end + idx)
        .unwrap_or(content.len());
    content[from..to].trim().to_string()
}

fn post_process(occurrences: Vec<KeyOccurrence>, options: &ExtractOptions) -> Vec<KeyOccurrence> {
    let mut seen = HashSet::new();
    let mut processed: Vec<KeyOccurrence> = occurrences
        .into_iter()
        .filter(|occ| !options.deduplicate || seen.insert(occ.key.clone()))
        .filter(|occ| {
            options
                .namespace
                .as_deref()
                .map_or(true, |prefix| occ.key.starts_with(prefix))
        })
        .collect();

    // Stable: equal keys keep scan order, so output does not depend on threads
    match options.sort_by {
        SortField::Key => processed.sort_by(|a, b| a.key.cmp(&b.key)),
        SortField::File => processed.sort_by(|a, b| a.file.cmp(&b.file)),
        SortField::Line => processed.sort_by_key(|occ| occ.line),
        SortField::Type => processed.sort_by(|a, b| a.kind.cmp(&b.kind)),
    }
    processed
}

/// Namespace of a key, as [`split_key`] assigns it
pub fn namespace_of(key: &str) -> &str {
    split_key(key).0
}

/// Split a dotted key into (namespace, remainder).
///
/// `auth.failed` is `("auth", "failed")`; keys without a namespace keep their
/// full text under `"default"`.
pub fn split_key(key: &str) -> (&str, &str) {
    match key.split_once('.') {
        Some((ns, rest)) if !ns.is_empty() && !rest.is_empty() => (ns, rest),
        _ => ("default", key),
    }
}

/// Group occurrences by namespace, then by key (later duplicates win)
pub fn group_by_namespace(
    occurrences: &[KeyOccurrence],
) -> BTreeMap<String, BTreeMap<String, KeyOccurrence>> {
    let mut grouped: BTreeMap<String, BTreeMap<String, KeyOccurrence>> = BTreeMap::new();
    for occ in occurrences {
        grouped
            .entry(namespace_of(&occ.key).to_string())
            .or_default()
            .insert(occ.key.clone(), occ.clone());
    }
    grouped
}

pub fn generate_stats(occurrences: &[KeyOccurrence]) -> ExtractionStats {
    let mut by_type: BTreeMap<String, usize> = BTreeMap::new();
    let mut files: HashSet<&str> = HashSet::new();
    let mut namespaces: HashSet<&str> = HashSet::new();
    // (key, count) in first-seen order
    let mut counts: Vec<(String, usize)> = Vec::new();
    let mut position: HashMap<&str, usize> = HashMap::new();

    for occ in occurrences {
        *by_type.entry(occ.kind.clone()).or_default() += 1;
        if let Some(file) = occ.file.as_deref() {
            files.insert(file);
        }
        namespaces.insert(namespace_of(&occ.key));
        match position.get(occ.key.as_str()) {
            Some(&idx) => counts[idx].1 += 1,
            None => {
                position.insert(occ.key.as_str(), counts.len());
                counts.push((occ.key.clone(), 1));
            }
        }
    }

    let unique_keys = counts.len();
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.truncate(10);

    ExtractionStats {
        total: occurrences.len(),
        unique_keys,
        namespaces: namespaces.len(),
        files: files.len(),
        by_type,
        top_keys: counts,
    }
}
