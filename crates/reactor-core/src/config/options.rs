//! Engine tunables

use crate::paginate::FetchOptions;

/// Tunables for a sync or pull run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    /// Resources fetched together per pull batch
    pub batch_size: usize,
    /// Collection fetch settings
    pub fetch: FetchOptions,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            batch_size: 5,
            fetch: FetchOptions::default(),
        }
    }
}

impl EngineOptions {
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }
}
