//! Filesystem runtime shared between a host build and its child builds.
//!
//! The host owns one `Arc<dyn Runtime>`; child compilers are bound to the same
//! instance so both passes see the same source tree and virtual modules.

use async_trait::async_trait;
use parking_lot::RwLock;
use path_clean::PathClean;
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Result type for runtime operations
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Errors that can occur during runtime operations
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(String),

    /// Other runtime error
    #[error("Runtime error: {0}")]
    Other(String),
}

/// Platform runtime trait
///
/// Abstracts the file access a build needs. Hosts hand the same runtime to
/// every child compiler they create.
#[async_trait]
pub trait Runtime: Send + Sync + std::fmt::Debug {
    /// Read a file
    async fn read_file(&self, path: &Path) -> RuntimeResult<Vec<u8>>;

    /// Check if a path exists
    fn exists(&self, path: &Path) -> bool;

    /// Resolve a module specifier relative to the importing file
    fn resolve(&self, specifier: &str, from: &Path) -> RuntimeResult<PathBuf>;

    /// Get the current working directory
    fn get_cwd(&self) -> RuntimeResult<PathBuf>;
}

/// Runtime that serves virtual files first and falls back to the filesystem.
#[derive(Debug, Clone)]
pub struct MemoryRuntime {
    virtual_files: Arc<RwLock<FxHashMap<PathBuf, Vec<u8>>>>,
    cwd: PathBuf,
}

impl MemoryRuntime {
    /// Create a new runtime rooted at `cwd`
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self {
            virtual_files: Arc::new(RwLock::new(FxHashMap::default())),
            cwd: cwd.into(),
        }
    }

    /// Add a virtual file. Relative paths are resolved against the cwd.
    pub fn add_virtual_file(&self, path: impl Into<PathBuf>, content: impl Into<Vec<u8>>) {
        let path: PathBuf = path.into();
        let normalized = self.normalize(&path);
        self.virtual_files.write().insert(normalized, content.into());
    }

    /// Builder-style variant of [`MemoryRuntime::add_virtual_file`]
    pub fn with_file(self, path: impl Into<PathBuf>, content: impl Into<Vec<u8>>) -> Self {
        self.add_virtual_file(path, content);
        self
    }

    /// Remove a virtual file, returning whether it existed
    pub fn remove_virtual_file(&self, path: &Path) -> bool {
        let normalized = self.normalize(path);
        self.virtual_files.write().remove(&normalized).is_some()
    }

    fn normalize(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf().clean()
        } else {
            self.cwd.join(path).clean()
        }
    }
}

#[async_trait]
impl Runtime for MemoryRuntime {
    async fn read_file(&self, path: &Path) -> RuntimeResult<Vec<u8>> {
        let normalized = self.normalize(path);
        if let Some(content) = self.virtual_files.read().get(&normalized) {
            return Ok(content.clone());
        }

        let path = normalized;
        tokio::task::spawn_blocking(move || {
            std::fs::read(&path).map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    RuntimeError::FileNotFound(path.clone())
                } else {
                    RuntimeError::Io(format!("Failed to read {}: {}", path.display(), e))
                }
            })
        })
        .await
        .map_err(|e| RuntimeError::Other(format!("Task join error: {}", e)))?
    }

    fn exists(&self, path: &Path) -> bool {
        let normalized = self.normalize(path);
        if self.virtual_files.read().contains_key(&normalized) {
            return true;
        }
        // Directories count as existing only for their virtual children
        let has_virtual_child = self
            .virtual_files
            .read()
            .keys()
            .any(|p| p.starts_with(&normalized));
        has_virtual_child || normalized.exists()
    }

    fn resolve(&self, specifier: &str, from: &Path) -> RuntimeResult<PathBuf> {
        if Path::new(specifier).is_absolute() {
            return Ok(PathBuf::from(specifier).clean());
        }

        if specifier.starts_with("./") || specifier.starts_with("../") {
            let from_dir = from.parent().unwrap_or(Path::new(""));
            let resolved = self.normalize(&from_dir.join(specifier));
            if self.exists(&resolved) || resolved.extension().is_some() {
                return Ok(resolved);
            }
            let with_ext = resolved.with_extension("js");
            if self.exists(&with_ext) {
                return Ok(with_ext);
            }
            return Ok(resolved);
        }

        Err(RuntimeError::Other(format!(
            "bare specifier '{}' is not supported by MemoryRuntime",
            specifier
        )))
    }

    fn get_cwd(&self) -> RuntimeResult<PathBuf> {
        Ok(self.cwd.clone())
    }
}
