//! Keyed storage for translation records.
//!
//! Every repository enforces uniqueness of (language, group, key) through an
//! index that maps the composite key to a single record id. Upserts on an
//! existing composite key update that record (last writer wins).

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{Result, TranslationError};
use crate::fs::FileLock;
use crate::language::LanguageId;
use crate::translation::{Translation, TranslationId, TranslationStatus};

/// Listing criteria; `None` fields match everything.
#[derive(Debug, Clone, Default)]
pub struct TranslationFilter {
    pub language: Option<LanguageId>,
    pub group: Option<String>,
    pub status: Option<TranslationStatus>,
    pub needs_review: Option<bool>,
    /// Case-insensitive substring over key, value and group
    pub search: Option<String>,
}

impl TranslationFilter {
    pub fn language(language: LanguageId) -> Self {
        Self {
            language: Some(language),
            ..Self::default()
        }
    }

    pub fn with_group(mut self, group: &str) -> Self {
        self.group = Some(group.to_string());
        self
    }

    pub fn with_status(mut self, status: TranslationStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_search(mut self, search: &str) -> Self {
        self.search = Some(search.to_string());
        self
    }

    pub fn matches(&self, t: &Translation) -> bool {
        if self.language.is_some_and(|lang| lang != t.language_id) {
            return false;
        }
        if self.group.as_deref().is_some_and(|g| g != t.group) {
            return false;
        }
        if self.status.is_some_and(|s| s != t.status) {
            return false;
        }
        if self.needs_review.is_some_and(|n| n != t.needs_review) {
            return false;
        }
        if let Some(needle) = self.search.as_deref().filter(|s| !s.is_empty()) {
            let needle = needle.to_lowercase();
            let hit = t.key.to_lowercase().contains(&needle)
                || t.group.to_lowercase().contains(&needle)
                || t
                    .value
                    .as_deref()
                    .is_some_and(|v| v.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }
        true
    }
}

/// Durable keyed store of translations.
pub trait TranslationRepository {
    fn get(&self, id: TranslationId) -> Option<Translation>;

    fn find(&self, language: LanguageId, group: &str, key: &str) -> Option<Translation>;

    /// Matching records ordered by group, then key
    fn list(&self, filter: &TranslationFilter) -> Vec<Translation>;

    fn count(&self, filter: &TranslationFilter) -> usize {
        self.list(filter).len()
    }

    /// Store a new record, assigning its id. Fails with `DuplicateKey` when the
    /// composite key is taken.
    fn insert(&mut self, translation: Translation) -> Result<Translation>;

    /// Create or replace by composite key. An existing record keeps its id.
    fn upsert(&mut self, translation: Translation) -> Result<Translation>;

    fn remove(&mut self, id: TranslationId) -> Result<Translation>;

    /// Remove every record of a language, returning how many were removed
    fn remove_language(&mut self, language: LanguageId) -> Result<usize>;

    /// (total, completed) record counts for a language
    fn language_counts(&self, language: LanguageId) -> (usize, usize) {
        let records = self.list(&TranslationFilter::language(language));
        let completed = records.iter().filter(|t| t.is_completed()).count();
        (records.len(), completed)
    }

    /// Start grouping mutations; nested calls are allowed
    fn begin_batch(&mut self) -> Result<()> {
        Ok(())
    }

    /// Finish a batch started with `begin_batch`
    fn commit_batch(&mut self) -> Result<()> {
        Ok(())
    }
}

type CompositeKey = (LanguageId, String, String);

fn composite_key(t: &Translation) -> CompositeKey {
    (t.language_id, t.group.clone(), t.key.clone())
}

/// In-memory repository with a unique composite-key index.
#[derive(Debug, Default, Clone)]
pub struct MemoryRepository {
    records: BTreeMap<TranslationId, Translation>,
    index: HashMap<CompositeKey, TranslationId>,
    next_id: u64,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn from_snapshot(snapshot: StoreSnapshot) -> Result<Self> {
        let mut repo = Self::new();
        for translation in snapshot.translations {
            let key = composite_key(&translation);
            if repo.index.contains_key(&key) {
                return Err(TranslationError::DuplicateKey {
                    language: key.0.to_string(),
                    group: key.1,
                    key: key.2,
                });
            }
            repo.next_id = repo.next_id.max(translation.id.0);
            repo.index.insert(key, translation.id);
            repo.records.insert(translation.id, translation);
        }
        repo.next_id = repo.next_id.max(snapshot.next_id);
        Ok(repo)
    }

    fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            version: SNAPSHOT_VERSION,
            next_id: self.next_id,
            translations: self.records.values().cloned().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl TranslationRepository for MemoryRepository {
    fn get(&self, id: TranslationId) -> Option<Translation> {
        self.records.get(&id).cloned()
    }

    fn find(&self, language: LanguageId, group: &str, key: &str) -> Option<Translation> {
        self.index
            .get(&(language, group.to_string(), key.to_string()))
            .and_then(|id| self.records.get(id))
            .cloned()
    }

    fn list(&self, filter: &TranslationFilter) -> Vec<Translation> {
        let mut matched: Vec<Translation> = self
            .records
            .values()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect();
        matched.sort_by(|a, b| a.group.cmp(&b.group).then_with(|| a.key.cmp(&b.key)));
        matched
    }

    fn count(&self, filter: &TranslationFilter) -> usize {
        self.records.values().filter(|t| filter.matches(t)).count()
    }

    fn insert(&mut self, mut translation: Translation) -> Result<Translation> {
        let key = composite_key(&translation);
        if self.index.contains_key(&key) {
            return Err(TranslationError::DuplicateKey {
                language: key.0.to_string(),
                group: key.1,
                key: key.2,
            });
        }
        self.next_id += 1;
        translation.id = TranslationId(self.next_id);
        self.index.insert(key, translation.id);
        self.records.insert(translation.id, translation.clone());
        Ok(translation)
    }

    fn upsert(&mut self, mut translation: Translation) -> Result<Translation> {
        let key = composite_key(&translation);
        match self.index.get(&key).copied() {
            Some(existing) => {
                translation.id = existing;
                self.records.insert(existing, translation.clone());
                Ok(translation)
            }
            None => {
                // A record moved to a new composite key drops its old index entry
                if let Some(previous) = self.records.get(&translation.id) {
                    let old_key = composite_key(previous);
                    self.index.remove(&old_key);
                    self.index.insert(key, translation.id);
                    self.records.insert(translation.id, translation.clone());
                    Ok(translation)
                } else {
                    self.insert(translation)
                }
            }
        }
    }

    fn remove(&mut self, id: TranslationId) -> Result<Translation> {
        let removed = self
            .records
            .remove(&id)
            .ok_or_else(|| TranslationError::not_found("translation", id))?;
        self.index.remove(&composite_key(&removed));
        Ok(removed)
    }

    fn remove_language(&mut self, language: LanguageId) -> Result<usize> {
        let ids: Vec<TranslationId> = self
            .records
            .values()
            .filter(|t| t.language_id == language)
            .map(|t| t.id)
            .collect();
        for id in &ids {
            self.remove(*id)?;
        }
        Ok(ids.len())
    }
}

const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct StoreSnapshot {
    version: u32,
    next_id: u64,
    translations: Vec<Translation>,
}

/// Repository persisted to a single JSON file.
///
/// Every mutation is a locked read-modify-write: the snapshot is reloaded
/// under an exclusive lock, changed and written back before the lock is
/// released, so handles in other processes never overwrite each other's
/// records. A batch holds the lock from `begin_batch` to `commit_batch` and
/// writes once. Reads between mutations see the state as of the last reload.
pub struct JsonFileRepository {
    path: PathBuf,
    inner: MemoryRepository,
    batch_lock: Option<FileLock>,
    batch_depth: usize,
    dirty: bool,
}

impl JsonFileRepository {
    /// Open the store at `path`, starting empty if the file does not exist
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let inner = parse_snapshot(crate::fs::read_locked(&path)?, &path)?;
        debug!("Opened store {} ({} records)", path.display(), inner.len());
        Ok(Self {
            path,
            inner,
            batch_lock: None,
            batch_depth: 0,
            dirty: false,
        })
    }

    fn write(&self, lock: &FileLock) -> Result<()> {
        let content = serde_json::to_string_pretty(&self.inner.snapshot())?;
        lock.write(&format!("{}\n", content))
    }

    /// Apply `f` to the freshest on-disk state and persist the result
    fn mutate<T>(
        &mut self,
        f: impl FnOnce(&mut MemoryRepository) -> Result<T>,
        changes: impl Fn(&T) -> bool,
    ) -> Result<T> {
        if self.batch_lock.is_some() {
            let value = f(&mut self.inner)?;
            self.dirty |= changes(&value);
            return Ok(value);
        }

        let lock = FileLock::exclusive(&self.path)?;
        self.inner = parse_snapshot(lock.read()?, &self.path)?;
        let value = f(&mut self.inner)?;
        if changes(&value) {
            self.write(&lock)?;
        }
        Ok(value)
    }
}

fn parse_snapshot(content: Option<String>, path: &Path) -> Result<MemoryRepository> {
    match content {
        Some(content) if !content.trim().is_empty() => {
            let snapshot: StoreSnapshot = serde_json::from_str(&content)?;
            if snapshot.version != SNAPSHOT_VERSION {
                return Err(TranslationError::Format(format!(
                    "unsupported store version {} in {}",
                    snapshot.version,
                    path.display()
                )));
            }
            MemoryRepository::from_snapshot(snapshot)
        }
        _ => Ok(MemoryRepository::new()),
    }
}

impl TranslationRepository for JsonFileRepository {
    fn get(&self, id: TranslationId) -> Option<Translation> {
        self.inner.get(id)
    }

    fn find(&self, language: LanguageId, group: &str, key: &str) -> Option<Translation> {
        self.inner.find(language, group, key)
    }

    fn list(&self, filter: &TranslationFilter) -> Vec<Translation> {
        self.inner.list(filter)
    }

    fn count(&self, filter: &TranslationFilter) -> usize {
        self.inner.count(filter)
    }

    fn insert(&mut self, translation: Translation) -> Result<Translation> {
        self.mutate(|repo| repo.insert(translation), |_| true)
    }

    fn upsert(&mut self, translation: Translation) -> Result<Translation> {
        self.mutate(|repo| repo.upsert(translation), |_| true)
    }

    fn remove(&mut self, id: TranslationId) -> Result<Translation> {
        self.mutate(|repo| repo.remove(id), |_| true)
    }

    fn remove_language(&mut self, language: LanguageId) -> Result<usize> {
        self.mutate(|repo| repo.remove_language(language), |removed| *removed > 0)
    }

    fn begin_batch(&mut self) -> Result<()> {
        if self.batch_depth == 0 {
            let lock = FileLock::exclusive(&self.path)?;
            self.inner = parse_snapshot(lock.read()?, &self.path)?;
            self.batch_lock = Some(lock);
            self.dirty = false;
        }
        self.batch_depth += 1;
        Ok(())
    }

    fn commit_batch(&mut self) -> Result<()> {
        self.batch_depth = self.batch_depth.saturating_sub(1);
        if self.batch_depth > 0 {
            return Ok(());
        }
        let Some(lock) = self.batch_lock.take() else {
            return Ok(());
        };
        if self.dirty {
            self.write(&lock)?;
            self.dirty = false;
        }
        Ok(())
    }
}
