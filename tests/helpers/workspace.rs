//! Ruby sources written to a temporary directory and indexed from disk.

use std::fs;
use std::path::{Path, PathBuf};

use objenealogist::project::{IndexReport, index_directory};
use objenealogist::{Runtime, TypeRef};
use tempfile::TempDir;

pub struct Workspace {
    dir: TempDir,
    pub runtime: Runtime,
    pub report: IndexReport,
}

impl Workspace {
    /// Write `files` (relative path, text) and index the directory
    pub fn new(files: &[(&str, &str)]) -> Self {
        let dir = TempDir::new().expect("temp dir");
        for (relative, text) in files {
            let path = dir.path().join(relative);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).expect("create dirs");
            }
            fs::write(&path, text).expect("write fixture");
        }
        let (runtime, report) = index_directory(dir.path()).expect("index");
        Self {
            dir,
            runtime,
            report,
        }
    }

    pub fn my_class() -> Self {
        Self::new(&[("test/my_class.rb", super::source_fixtures::MY_CLASS)])
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    pub fn class(&self, name: &str) -> TypeRef {
        self.runtime
            .lookup(name)
            .unwrap_or_else(|| panic!("{name} was not indexed"))
    }
}
