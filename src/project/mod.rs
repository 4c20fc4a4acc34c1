//! Project loading: reading Ruby sources and indexing them into a [`Runtime`].
//!
//! [`Runtime`]: crate::runtime::Runtime

pub mod file_loader;
mod indexer;

pub use file_loader::{
    FsLoader, LoadError, MemoryLoader, SourceLoader, collect_ruby_files, is_ruby_file,
};
pub use indexer::{
    IndexError, IndexReport, IndexWarning, Indexer, index_directory, index_sources,
};
