//! Source loading.
//!
//! [`SourceLoader`] is the seam through which the location engine and the
//! indexer read Ruby files. [`FsLoader`] reads the filesystem; [`MemoryLoader`]
//! serves fixed contents and is what tests and embedders use.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use thiserror::Error;
use walkdir::WalkDir;

use crate::base::constants::RUBY_EXT;

/// A source file that could not be read
#[derive(Debug, Error)]
pub enum LoadError {
    /// The file no longer exists
    #[error("file not found: {}", .path.display())]
    Missing { path: PathBuf },

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to walk {}: {source}", .path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

impl LoadError {
    pub fn path(&self) -> &Path {
        match self {
            Self::Missing { path } | Self::Io { path, .. } | Self::Walk { path, .. } => path,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing { .. })
    }
}

/// Reads the text of a source file
pub trait SourceLoader: Send + Sync {
    fn load(&self, path: &Path) -> Result<String, LoadError>;
}

impl<L: SourceLoader + ?Sized> SourceLoader for &L {
    fn load(&self, path: &Path) -> Result<String, LoadError> {
        (**self).load(path)
    }
}

/// Loads files from disk
#[derive(Debug, Clone, Copy, Default)]
pub struct FsLoader;

impl SourceLoader for FsLoader {
    fn load(&self, path: &Path) -> Result<String, LoadError> {
        fs::read_to_string(path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                LoadError::Missing {
                    path: path.to_path_buf(),
                }
            } else {
                LoadError::Io {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })
    }
}

/// Serves sources from memory, keyed by path
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    files: IndexMap<PathBuf, String>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        self.insert(path, text);
        self
    }

    /// Add or replace a file, returning the previous text
    pub fn insert(&mut self, path: impl Into<PathBuf>, text: impl Into<String>) -> Option<String> {
        self.files.insert(path.into(), text.into())
    }

    pub fn remove(&mut self, path: &Path) -> Option<String> {
        self.files.shift_remove(path)
    }

    /// Paths in insertion order
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.files.keys().map(PathBuf::as_path)
    }
}

impl SourceLoader for MemoryLoader {
    fn load(&self, path: &Path) -> Result<String, LoadError> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| LoadError::Missing {
                path: path.to_path_buf(),
            })
    }
}

/// Check whether a path names a Ruby source file
pub fn is_ruby_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == RUBY_EXT)
}

/// Collect Ruby files under `root`, sorted by path.
///
/// A file path is returned as is when it has the Ruby extension. Hidden
/// directories are not descended into.
pub fn collect_ruby_files(root: &Path) -> Result<Vec<PathBuf>, LoadError> {
    if !root.exists() {
        return Err(LoadError::Missing {
            path: root.to_path_buf(),
        });
    }
    if root.is_file() {
        return Ok(if is_ruby_file(root) {
            vec![root.to_path_buf()]
        } else {
            Vec::new()
        });
    }

    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry.file_name()));
    for entry in walker {
        let entry = entry.map_err(|source| LoadError::Walk {
            path: root.to_path_buf(),
            source,
        })?;
        if entry.file_type().is_file() && is_ruby_file(entry.path()) {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_string_lossy().starts_with('.')
}
