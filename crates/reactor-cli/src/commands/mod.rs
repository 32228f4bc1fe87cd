//! Command implementations for reactor-cli

pub mod diff;
pub mod init;
pub mod sync;

pub use diff::run_diff;
pub use init::{InitOptions, run_init};
pub use sync::{run_pull, run_sync};
