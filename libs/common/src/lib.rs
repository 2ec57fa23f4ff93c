//! Shared runtime plumbing for the alert services
//!
//! - logging bootstrap (console + optional daily file)
//! - graceful shutdown signal
//! - SQLite client with edge-friendly pragmas

pub mod logging;
pub mod shutdown;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use logging::{LogConfig, LogFormat};

#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteClient, SqlitePool};
