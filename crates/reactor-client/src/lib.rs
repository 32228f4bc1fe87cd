//! HTTP client for the Reactor configuration API
//!
//! [`ReactorClient`] implements [`reactor_core::ReactorApi`] over JSON:API
//! requests authenticated with a bearer token.

pub mod client;
pub mod config;
pub mod error;

pub use client::ReactorClient;
pub use config::{ClientConfig, DEFAULT_REACTOR_URL};
pub use error::{ClientError, Result};
