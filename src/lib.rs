//! # dirmirror - continuous one-way directory mirror
//!
//! Keeps a slave directory tree in line with a master tree. Every cycle one
//! walker copies what slave is missing or has at the wrong size, and a second
//! walker deletes what master no longer has. Losing access to either root
//! stops the process.

pub mod commands;
pub mod config;
pub mod executor;
pub mod logging;
pub mod types;
pub mod walker;

// Re-export commonly used types
pub use config::Config;
pub use logging::{LogLevel, LogRecord, LogSender, Logger};
pub use types::{EntryInfo, EntryKind, MirrorError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
