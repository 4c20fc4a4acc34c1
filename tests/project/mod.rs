//! Indexing Ruby sources from disk.

pub mod tests_index_directory;
