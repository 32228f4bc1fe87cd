//! Reconciliation and sync engine for Reactor Sync
//!
//! This crate keeps a file-based checkout of a tag-management property in
//! step with the remote configuration service:
//!
//! - **Comparator**: classify every resource as Added, Modified, Deleted,
//!   Behind or Unchanged
//! - **SyncEngine**: push Modified resources, pull Behind ones in batches
//! - **Paginated fetch**: exhaust paged collections with a single retry on 429
//! - **Materializer**: split settings blobs into editable transform files
//!
//! # Architecture
//!
//! `reactor-core` sits above `reactor-fs` and below the CLI. The remote
//! service is reached only through the [`ReactorApi`] trait:
//!
//! ```text
//!                 reactor-cli
//!                  /       \
//!        reactor-core    reactor-client
//!          /      \          /
//!   reactor-fs    ReactorApi
//! ```

pub mod config;
pub mod error;
pub mod ledger;
pub mod materialize;
pub mod model;
pub mod paginate;
pub mod remote;
pub mod sync;

pub use config::{EngineOptions, ReactorSettings};
pub use error::{Error, RemoteError, Result};
pub use ledger::{LEDGER_FILE, SyncLedger};
pub use materialize::{Materialized, Materializer};
pub use model::{Document, ExtensionPackage, ResourceRecord, ResourceType};
pub use paginate::{FetchOptions, fetch_all};
pub use remote::{
    DispatchTable, Endpoint, ListOperation, Operations, PageRequest, ReactorApi, RemoteResult,
    UpdateOperation,
};
pub use sync::{
    Comparison, ComparisonStatus, DiffReport, ItemFailure, NoProgress, SyncDirection, SyncEngine,
    SyncPhase, SyncProgress, SyncReport,
};
