//! Sync ledger: the remote `updated_at` each resource had when last synced
//!
//! Persisted as TOML next to the resource directories. The comparator uses
//! it to tell local edits (Modified) from remote edits (Behind).

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{DateTime, Utc};
use fs2::FileExt;
use reactor_fs::{NormalizedPath, io};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// File name of the ledger inside the property root
pub const LEDGER_FILE: &str = ".reactor-sync.toml";

const FORMAT_VERSION: &str = "1.0";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncLedger {
    version: String,
    #[serde(default)]
    synced: BTreeMap<String, DateTime<Utc>>,
}

impl Default for SyncLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncLedger {
    pub fn new() -> Self {
        Self {
            version: FORMAT_VERSION.to_string(),
            synced: BTreeMap::new(),
        }
    }

    /// Load the ledger at `path`, or start empty when there is none yet.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.is_file() {
            Self::load(path)
        } else {
            Ok(Self::new())
        }
    }

    /// Read under a shared lock so a concurrent save is never seen half done.
    pub fn load(path: &Path) -> Result<Self> {
        let mut file = File::open(path)?;
        file.lock_shared().map_err(|e| Error::Ledger {
            message: format!("cannot lock {}: {}", path.display(), e),
        })?;
        let mut content = String::new();
        file.read_to_string(&mut content)?;

        let ledger: SyncLedger = toml::from_str(&content)?;
        if ledger.version.split('.').next() != FORMAT_VERSION.split('.').next() {
            return Err(Error::Ledger {
                message: format!(
                    "{} has unsupported version {}",
                    path.display(),
                    ledger.version
                ),
            });
        }
        Ok(ledger)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        io::write_text(&NormalizedPath::new(path), &content)?;
        Ok(())
    }

    pub fn last_synced(&self, id: &str) -> Option<DateTime<Utc>> {
        self.synced.get(id).copied()
    }

    /// Remember `updated_at` as the server state `id` was last synced to.
    pub fn record(&mut self, id: impl Into<String>, updated_at: DateTime<Utc>) {
        self.synced.insert(id.into(), updated_at);
    }

    pub fn len(&self) -> usize {
        self.synced.len()
    }

    pub fn is_empty(&self) -> bool {
        self.synced.is_empty()
    }
}
