use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use walkdir::WalkDir;

use crate::error::{Result, TranslationError};

/// Abstraction over the file system operations the extractor needs
pub trait FileSystem: Send + Sync {
    /// Read file contents as a string
    fn read_to_string(&self, path: &Path) -> Result<String>;

    /// Check if a path is a file
    fn is_file(&self, path: &Path) -> bool;

    /// Check if a path is a directory
    fn is_dir(&self, path: &Path) -> bool;

    /// Enumerate files under `root` in a stable (name-sorted) order.
    ///
    /// Directories for which `prune` returns true are not descended into.
    fn list_files(
        &self,
        root: &Path,
        recursive: bool,
        prune: &dyn Fn(&Path) -> bool,
    ) -> Result<Vec<PathBuf>>;
}

/// Real file system implementation using std::fs and walkdir
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        std::fs::read_to_string(path).map_err(|e| TranslationError::io(path, e))
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn list_files(
        &self,
        root: &Path,
        recursive: bool,
        prune: &dyn Fn(&Path) -> bool,
    ) -> Result<Vec<PathBuf>> {
        let mut walker = WalkDir::new(root).sort_by_file_name().follow_links(false);
        if !recursive {
            walker = walker.max_depth(1);
        }

        let mut files = Vec::new();
        let entries = walker
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !entry.file_type().is_dir() || !prune(entry.path()));
        for entry in entries {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(root).to_path_buf();
                TranslationError::io(path, std::io::Error::other(e.to_string()))
            })?;
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }
        Ok(files)
    }
}

/// Lowercased extension(s) of a file name, longest first.
///
/// `resources/views/home.blade.php` yields `["blade.php", "php"]`.
pub fn extension_candidates(path: &Path) -> Vec<String> {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return Vec::new();
    };
    let name = name.to_lowercase();
    let trimmed = name.trim_start_matches('.');
    trimmed
        .match_indices('.')
        .map(|(idx, _)| trimmed[idx + 1..].to_string())
        .filter(|ext| !ext.is_empty())
        .collect()
}

fn lock_file_for(path: &Path) -> Result<File> {
    let mut lock_name = path.as_os_str().to_owned();
    lock_name.push(".lock");
    let lock_path = PathBuf::from(lock_name);
    OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&lock_path)
        .map_err(|e| TranslationError::io(&lock_path, e))
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Advisory lock on `<path>.lock`, released on drop.
///
/// Hold an exclusive lock across a whole read-modify-write cycle: read with
/// [`FileLock::read`], then replace the file with [`FileLock::write`] before
/// dropping the guard.
#[derive(Debug)]
pub struct FileLock {
    file: File,
    path: PathBuf,
    exclusive: bool,
}

impl FileLock {
    /// Block until no other holder has the lock. Creates the parent directory.
    pub fn exclusive(path: &Path) -> Result<Self> {
        let parent = parent_dir(path);
        std::fs::create_dir_all(&parent).map_err(|e| TranslationError::io(&parent, e))?;
        let file = lock_file_for(path)?;
        FileExt::lock_exclusive(&file).map_err(|e| TranslationError::io(path, e))?;
        Ok(Self {
            file,
            path: path.to_path_buf(),
            exclusive: true,
        })
    }

    /// Block until no exclusive holder has the lock
    pub fn shared(path: &Path) -> Result<Self> {
        let file = lock_file_for(path)?;
        FileExt::lock_shared(&file).map_err(|e| TranslationError::io(path, e))?;
        Ok(Self {
            file,
            path: path.to_path_buf(),
            exclusive: false,
        })
    }

    /// Current contents of the guarded file; `None` when it does not exist yet
    pub fn read(&self) -> Result<Option<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(TranslationError::io(&self.path, e)),
        }
    }

    /// Replace the guarded file atomically.
    ///
    /// The temp file is created next to the target so the final rename never
    /// crosses a mount point.
    pub fn write(&self, contents: &str) -> Result<()> {
        if !self.exclusive {
            return Err(TranslationError::policy(
                self.path.display().to_string(),
                "writing requires an exclusive lock",
            ));
        }
        let parent = parent_dir(&self.path);
        let mut tmp =
            NamedTempFile::new_in(&parent).map_err(|e| TranslationError::io(&parent, e))?;
        tmp.write_all(contents.as_bytes())
            .and_then(|_| tmp.flush())
            .map_err(|e| TranslationError::io(&self.path, e))?;
        tmp.persist(&self.path)
            .map_err(|e| TranslationError::io(&self.path, e.error))?;
        Ok(())
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

/// Read a file under a shared lock, returning `None` when it does not exist yet
pub fn read_locked(path: &Path) -> Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }
    FileLock::shared(path)?.read()
}
