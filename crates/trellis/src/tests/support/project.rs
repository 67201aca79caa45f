//! Scratch project roots with a `configs/` directory.

use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::TempDir;

/// Temporary project root.
pub struct ProjectDir {
    _temp: TempDir,
    root: Utf8PathBuf,
}

impl ProjectDir {
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

    /// Writes `contents` to `configs/<filename>`.
    pub fn write(&self, filename: &str, contents: &str) -> Utf8PathBuf {
        let path = self.root.join("configs").join(filename);
        fs::write(&path, contents).expect("write configuration file");
        path
    }
}

impl Default for ProjectDir {
    fn default() -> Self {
        Self::new()
    }
}
