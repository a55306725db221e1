#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use school_locator::ingest::{self, DatasetSummary, IngestOptions};
use school_locator::store::Store;
use tempfile::{TempDir, tempdir};

pub const TABLE: &str = "school_data";

/// Three schools around the south bay.
pub const SCHOOLS_CSV: &str = "\
School Name,Location City,Total Students,Latitude,Longitude
Stanford Elementary,Stanford,412,37.4275,-122.1697
Millbrae Primary,Millbrae,,37.6213,-122.3790
San Jose Middle,San Jose,880,37.3352,-121.8811
";

/// Returns the absolute path to a fixture under `tests/data`.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh scratch directory for the current test case.
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    /// Returns the root path for all files owned by this workspace.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        self.write_bytes(name, contents.as_bytes())
    }

    pub fn write_bytes(&self, name: &str, contents: &[u8]) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents).expect("write temp file contents");
        path
    }

    /// Path of the store file owned by this workspace.
    pub fn db_path(&self) -> PathBuf {
        self.temp_dir.path().join("school_db.sqlite")
    }

    /// Opens the workspace store and loads `csv` into [`TABLE`].
    pub fn store_with(&self, csv: &str) -> (Store, DatasetSummary) {
        let source = self.write("source.csv", csv);
        let mut store = Store::open(&self.db_path()).expect("open store");
        let summary = ingest::ingest(&source, &mut store, TABLE, &IngestOptions::default())
            .expect("ingest source");
        (store, summary)
    }
}
