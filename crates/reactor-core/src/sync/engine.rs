//! Sync orchestrator
//!
//! Drives a run end to end: inventory and local snapshot, classification,
//! push of Modified resources, batched pull of Behind resources, and the
//! ledger update that makes the next run's classification possible.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use futures::future::join_all;

use reactor_fs::LocalStore;

use crate::config::EngineOptions;
use crate::ledger::{LEDGER_FILE, SyncLedger};
use crate::materialize::Materializer;
use crate::model::{ResourceRecord, ResourceType};
use crate::remote::{DispatchTable, ReactorApi};
use crate::{Error, Result};

use super::diff::{Comparison, ComparisonStatus, DiffReport, LocalSnapshot, classify};
use super::inventory::fetch_inventory;
use super::report::{SyncDirection, SyncPhase, SyncProgress, SyncReport};

/// Split `items` into consecutive batches of at most `size`, keeping order.
///
/// A size of zero is treated as one.
pub fn group_batches<T>(items: &[T], size: usize) -> Vec<&[T]> {
    items.chunks(size.max(1)).collect()
}

/// Reconciles one property directory with the remote service.
pub struct SyncEngine {
    api: Arc<dyn ReactorApi>,
    table: DispatchTable,
    store: LocalStore,
    property_id: String,
    options: EngineOptions,
}

impl SyncEngine {
    /// Create an engine for `property_id`, whose files live in `store`.
    pub fn new(
        api: Arc<dyn ReactorApi>,
        store: LocalStore,
        property_id: impl Into<String>,
        options: EngineOptions,
    ) -> Self {
        Self {
            api,
            table: DispatchTable::new(),
            store,
            property_id: property_id.into(),
            options,
        }
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.store.root().to_native().join(LEDGER_FILE)
    }

    pub fn load_ledger(&self) -> Result<SyncLedger> {
        SyncLedger::load_or_default(&self.ledger_path())
    }

    /// Classify every local and remote resource of the property.
    pub async fn diff(&self) -> Result<DiffReport> {
        let ledger = self.load_ledger()?;
        let remote: BTreeMap<String, ResourceRecord> = fetch_inventory(
            self.api.as_ref(),
            &self.table,
            &self.property_id,
            self.options.fetch,
            &ResourceType::ALL,
        )
        .await?
        .into_iter()
        .map(|record| (record.id.clone(), record))
        .collect();
        let local = self.local_snapshots()?;

        let report = classify(&local, &remote, &ledger);
        tracing::info!(
            added = report.count(ComparisonStatus::Added),
            modified = report.count(ComparisonStatus::Modified),
            deleted = report.count(ComparisonStatus::Deleted),
            behind = report.count(ComparisonStatus::Behind),
            unchanged = report.count(ComparisonStatus::Unchanged),
            "Compared property"
        );
        Ok(report)
    }

    /// Apply a comparison: push Modified, then pull Behind.
    ///
    /// Item failures are collected in the returned report. Local filesystem
    /// and ledger failures abort the run after the ledger entries recorded
    /// so far are saved.
    pub async fn sync(
        &self,
        report: &DiffReport,
        direction: SyncDirection,
        progress: &dyn SyncProgress,
    ) -> Result<SyncReport> {
        let mut ledger = self.load_ledger()?;
        let mut outcome = SyncReport::new();

        if direction.push {
            let modified = report.with_status(ComparisonStatus::Modified);
            let pushed = self.push(&modified, &mut ledger, &mut outcome, progress).await;
            if pushed.is_err() {
                self.save_ledger(&ledger)?;
                return pushed.map(|()| outcome);
            }
        }

        if direction.pull {
            let behind = report.with_status(ComparisonStatus::Behind);
            let pulled = self.pull(&behind, &mut ledger, &mut outcome, progress).await;
            // Keep what was recorded so far even when a batch aborted.
            self.save_ledger(&ledger)?;
            pulled?;
        } else {
            self.save_ledger(&ledger)?;
        }

        tracing::info!(
            pushed = outcome.pushed.len(),
            pulled = outcome.pulled.len(),
            failed = outcome.failures.len(),
            "Sync finished"
        );
        Ok(outcome)
    }

    /// Push every item concurrently. Remote failures are recorded per item;
    /// a failed local write is returned once every push has settled.
    pub async fn push(
        &self,
        items: &[&Comparison],
        ledger: &mut SyncLedger,
        outcome: &mut SyncReport,
        progress: &dyn SyncProgress,
    ) -> Result<()> {
        progress.started(SyncPhase::Push, items.len());
        if items.is_empty() {
            return Ok(());
        }

        let results = join_all(items.iter().map(|item| self.push_one(item))).await;
        let mut fatal = None;
        for (item, result) in items.iter().zip(results) {
            match result {
                Ok(Ok(record)) => {
                    if let Some(updated_at) = record.updated_at() {
                        ledger.record(record.id.clone(), updated_at);
                    }
                    outcome.pushed.push(item.id.clone());
                }
                Ok(Err(e)) => outcome.fail(&item.id, item.kind, SyncPhase::Push, e),
                Err(e) => {
                    tracing::error!(id = %item.id, error = %e, "Writing pushed resource failed");
                    fatal.get_or_insert(e);
                }
            }
        }
        progress.advanced(SyncPhase::Push, items.len());
        fatal.map_or(Ok(()), Err)
    }

    /// Fetch and materialize items in sequential batches of
    /// `options.batch_size`.
    ///
    /// A failed fetch is an item failure; a failed write aborts the pull.
    pub async fn pull(
        &self,
        items: &[&Comparison],
        ledger: &mut SyncLedger,
        outcome: &mut SyncReport,
        progress: &dyn SyncProgress,
    ) -> Result<()> {
        progress.started(SyncPhase::Pull, items.len());
        let materializer = Materializer::new(self.api.as_ref(), &self.store);
        let mut completed = 0;

        for batch in group_batches(items, self.options.batch_size) {
            let fetched = join_all(batch.iter().map(|item| self.fetch_one(item))).await;

            let mut records = Vec::with_capacity(batch.len());
            for (item, result) in batch.iter().zip(fetched) {
                match result {
                    Ok(record) => records.push(record),
                    Err(e) => outcome.fail(&item.id, item.kind, SyncPhase::Pull, e),
                }
            }

            let written = join_all(records.iter().map(|r| materializer.materialize(r))).await;
            for (record, result) in records.iter().zip(written) {
                for warning in &result?.warnings {
                    tracing::warn!(id = %record.id, "{warning}");
                }
                if let Some(updated_at) = record.updated_at() {
                    ledger.record(record.id.clone(), updated_at);
                }
                outcome.pulled.push(record.id.clone());
            }

            completed += batch.len();
            progress.advanced(SyncPhase::Pull, completed);
        }
        Ok(())
    }

    /// Materialize the whole remote property, as for a fresh checkout.
    pub async fn pull_all(&self, progress: &dyn SyncProgress) -> Result<SyncReport> {
        let records = fetch_inventory(
            self.api.as_ref(),
            &self.table,
            &self.property_id,
            self.options.fetch,
            &ResourceType::ALL,
        )
        .await?;

        let mut ledger = self.load_ledger()?;
        let mut outcome = SyncReport::new();
        let materializer = Materializer::new(self.api.as_ref(), &self.store);
        progress.started(SyncPhase::Pull, records.len());

        let mut completed = 0;
        for batch in group_batches(&records, self.options.batch_size) {
            let written = join_all(batch.iter().map(|r| materializer.materialize(r))).await;
            for (record, result) in batch.iter().zip(written) {
                let materialized = result?;
                for warning in &materialized.warnings {
                    tracing::warn!(id = %record.id, "{warning}");
                }
                if let Some(updated_at) = record.updated_at() {
                    ledger.record(record.id.clone(), updated_at);
                }
                outcome.pulled.push(record.id.clone());
            }
            completed += batch.len();
            progress.advanced(SyncPhase::Pull, completed);
        }

        self.save_ledger(&ledger)?;
        tracing::info!(pulled = outcome.pulled.len(), "Pulled property");
        Ok(outcome)
    }

    /// Update one resource, retrying once through the fallback operation,
    /// then revise it where the type requires a new draft revision.
    ///
    /// The inner result is the item's outcome; the outer one fails only when
    /// the server's answer cannot be written back to disk.
    async fn push_one(&self, item: &Comparison) -> Result<Result<ResourceRecord>> {
        let current = match self.send_one(item).await {
            Ok(current) => current,
            Err(e) => return Ok(Err(e)),
        };

        let materialized = Materializer::new(self.api.as_ref(), &self.store)
            .materialize(&current)
            .await?;
        for warning in &materialized.warnings {
            tracing::warn!(id = %item.id, "{warning}");
        }
        tracing::debug!(id = %item.id, kind = %item.kind, "Pushed");
        Ok(Ok(current))
    }

    async fn send_one(&self, item: &Comparison) -> Result<ResourceRecord> {
        let entry = self.store.read_entry(item.kind.as_str(), &item.id)?;
        let record: ResourceRecord = serde_json::from_value(entry.record)?;
        let operations = self.table.operations(item.kind);

        let updated = match self.api.update(operations.update, &record).await {
            Ok(updated) => updated,
            Err(first) => {
                tracing::warn!(id = %item.id, error = %first, "Update failed, retrying once");
                self.api
                    .update(operations.fallback_update, &record)
                    .await
                    .map_err(|e| Error::remote(format!("update {}", item.id), e))?
            }
        };

        match operations.revise {
            Some(endpoint) => self
                .api
                .revise(endpoint, &item.id)
                .await
                .map_err(|e| Error::remote(format!("revise {}", item.id), e)),
            None => Ok(updated),
        }
    }

    async fn fetch_one(&self, item: &Comparison) -> Result<ResourceRecord> {
        let endpoint = self.table.operations(item.kind).get;
        self.api
            .get(endpoint, &item.id)
            .await
            .map_err(|e| Error::remote(format!("get {}", item.id), e))
    }

    fn local_snapshots(&self) -> Result<BTreeMap<String, LocalSnapshot>> {
        let mut snapshots = BTreeMap::new();
        for entry in self.store.entries(&ResourceType::dir_names())? {
            let record: ResourceRecord = serde_json::from_value(entry.record)?;
            snapshots.insert(
                entry.id,
                LocalSnapshot {
                    record,
                    path: entry.dir.as_str().to_string(),
                },
            );
        }
        Ok(snapshots)
    }

    fn save_ledger(&self, ledger: &SyncLedger) -> Result<()> {
        let root = self.store.root().to_native();
        fs::create_dir_all(&root)?;
        ledger.save(&self.ledger_path())
    }
}
