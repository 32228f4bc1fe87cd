//! Shared test utilities for the reactor-sync workspace.
//!
//! This crate provides fixtures so crate test suites do not each grow their
//! own fake service. It is a dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`fake`]: [`FakeReactor`], an in-memory remote service with failure
//!   injection and call recording
//! - [`records`]: [`RecordBuilder`] for resource records and extension packages
//! - [`property`]: [`TestProperty`], a temporary property checkout

pub mod fake;
pub mod property;
pub mod records;

pub use fake::{Call, FakeReactor};
pub use property::TestProperty;
pub use records::{RecordBuilder, package_with_actions, package_with_configuration};
