//! [`TestProperty`]: a temporary property checkout.

use std::fs;
use std::path::{Path, PathBuf};

use reactor_core::{LEDGER_FILE, ResourceRecord, SyncLedger};
use reactor_fs::{LocalStore, NormalizedPath};
use serde_json::Value;
use tempfile::TempDir;

/// A temporary property directory with helpers for setup and assertion.
///
/// ```rust,no_run
/// use reactor_test_utils::{RecordBuilder, TestProperty};
/// use reactor_core::ResourceType;
///
/// let property = TestProperty::new();
/// property.write_local(&RecordBuilder::new(ResourceType::Rule, "RL1").build());
/// property.assert_file_exists("rules/RL1/data.json");
/// ```
pub struct TestProperty {
    temp_dir: TempDir,
}

impl Default for TestProperty {
    fn default() -> Self {
        Self::new()
    }
}

impl TestProperty {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().unwrap(),
        }
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn store(&self) -> LocalStore {
        LocalStore::new(NormalizedPath::new(self.root()))
    }

    /// Write `record` as a local checkout would hold it (`data.json` only).
    pub fn write_local(&self, record: &ResourceRecord) -> PathBuf {
        self.store()
            .write_record(record.kind.as_str(), &record.id, None, record)
            .unwrap()
            .to_native()
    }

    /// Record `id` as last synced at `timestamp`.
    pub fn mark_synced(&self, id: &str, timestamp: &str) {
        let path = self.root().join(LEDGER_FILE);
        let mut ledger = SyncLedger::load_or_default(&path).unwrap();
        let at = reactor_core::model::parse_timestamp(timestamp).unwrap();
        ledger.record(id, at);
        ledger.save(&path).unwrap();
    }

    pub fn ledger(&self) -> SyncLedger {
        SyncLedger::load_or_default(&self.root().join(LEDGER_FILE)).unwrap()
    }

    pub fn read(&self, rel_path: &str) -> String {
        fs::read_to_string(self.root().join(rel_path))
            .unwrap_or_else(|e| panic!("cannot read {rel_path}: {e}"))
    }

    pub fn read_json(&self, rel_path: &str) -> Value {
        serde_json::from_str(&self.read(rel_path)).unwrap()
    }

    pub fn write(&self, rel_path: &str, content: &str) {
        let path = self.root().join(rel_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    pub fn assert_file_exists(&self, rel_path: &str) {
        let path = self.root().join(rel_path);
        assert!(path.exists(), "expected {} to exist", path.display());
    }

    pub fn assert_file_missing(&self, rel_path: &str) {
        let path = self.root().join(rel_path);
        assert!(!path.exists(), "expected {} not to exist", path.display());
    }
}
