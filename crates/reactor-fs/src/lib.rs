//! On-disk property layout for Reactor Sync
//!
//! Provides normalized path handling, atomic writes and the per-resource
//! directory layout (`<root>/<type>/<id>/data.json` and friends).

pub mod artifact;
pub mod error;
pub mod io;
pub mod path;
pub mod sanitize;
pub mod store;

pub use artifact::{unwrap_function_body, wrap_function_body};
pub use error::{Error, Result};
pub use path::NormalizedPath;
pub use sanitize::alias_name;
pub use store::{LocalEntry, LocalStore};
