//! Core type definitions for dirmirror

mod entry;
mod error;

pub use entry::{lookup_entry, read_entries, EntryInfo, EntryKind};
pub use error::MirrorError;

use std::future::Future;
use std::pin::Pin;

/// Boxed future used to break recursion in the walkers and the purger
pub(crate) type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
