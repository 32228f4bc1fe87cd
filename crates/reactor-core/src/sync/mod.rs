//! Reconciliation and sync between the local tree and the remote service
//!
//! This module provides:
//! - **inventory**: fetch every remote resource of a property
//! - **diff**: classify each id as Added/Modified/Deleted/Behind/Unchanged
//! - **engine**: push Modified resources, pull Behind ones, full pull

mod diff;
mod engine;
mod inventory;
mod report;

pub use diff::{
    AttributeDelta, Comparison, ComparisonStatus, DiffReport, LocalSnapshot, VOLATILE_ATTRIBUTES,
    classify, is_volatile,
};
pub use engine::{SyncEngine, group_batches};
pub use inventory::fetch_inventory;
pub use report::{
    ItemFailure, NoProgress, SyncDirection, SyncPhase, SyncProgress, SyncReport,
};
