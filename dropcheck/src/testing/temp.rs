use std::fs;
use std::path::{Path, PathBuf};

use rstest::fixture;
use tempfile::TempDir;

/// A per-test scratch directory, removed on drop
pub struct TmpDir {
    dir: TempDir,
}

impl TmpDir {
    pub fn get_path(&self) -> &Path {
        self.dir.path()
    }

    /// Creates a file with the given name (and any missing parent dirs)
    /// under the scratch directory, returning its path
    pub fn create_file_name(&self, name: &str, content: Option<&str>) -> PathBuf {
        let path = self.dir.path().join(name);

        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).expect("failed to create parent dirs for temp file");
            }
        }

        fs::write(&path, content.unwrap_or_default()).expect("failed to write temp file");
        path
    }
}

#[fixture]
pub fn tmp_dir() -> TmpDir {
    let dir = tempfile::Builder::new()
        .prefix("dropcheck_test_")
        .tempdir()
        .expect("failed to create temp dir");
    TmpDir { dir }
}
