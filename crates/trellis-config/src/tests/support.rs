//! Scratch configuration directories for unit tests.

use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::TempDir;

/// Temporary project root with a `configs/` directory.
pub struct ConfigDir {
    _temp: TempDir,
    root: Utf8PathBuf,
}

impl ConfigDir {
    pub fn new() -> Self {
        let temp = TempDir::new().expect("create temporary directory");
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf())
            .expect("temporary directory should be UTF-8");
        fs::create_dir_all(root.join("configs")).expect("create configs directory");
        Self { _temp: temp, root }
    }

    pub fn root(&self) -> &Utf8Path {
        self.root.as_path()
    }

    pub fn configs(&self) -> Utf8PathBuf {
        self.root.join("configs")
    }

    pub fn write(&self, filename: &str, contents: &str) -> Utf8PathBuf {
        let path = self.configs().join(filename);
        fs::write(&path, contents).expect("write configuration file");
        path
    }
}
