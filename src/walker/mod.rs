//! Tree reconciliation walkers
//!
//! Two independent recursive walkers keep the slave tree in line with the
//! master tree:
//!
//! - [`check_master_folder`] walks master and creates or refreshes whatever
//!   slave is missing;
//! - [`check_slave_folder`] walks slave and deletes whatever master no longer
//!   has.
//!
//! Both recurse into subdirectories sequentially and fan out one task per
//! file at every level, joining those tasks before leaving the level. Only a
//! failure to list a walker's root is critical; everything below it is a
//! local error that is logged and skipped.

mod propagate;
mod prune;
pub mod signal;

pub use propagate::check_master_folder;
pub use prune::check_slave_folder;
pub use signal::{critical_channel, CriticalSignal, CriticalWatch};

use crate::logging::LogSender;
use crate::types::MirrorError;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Semaphore, SemaphorePermit};
use tokio::task::JoinSet;

/// Counters for one cycle, as returned by [`WalkContext::take_report`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub files_copied: u64,

    /// Slave files removed, including entries purged from stale folders
    pub files_deleted: u64,

    pub dirs_created: u64,
    pub dirs_removed: u64,

    /// Local failures (logged and skipped)
    pub errors: u64,
}

impl CycleReport {
    /// Number of filesystem changes made to the slave tree
    pub fn mutations(&self) -> u64 {
        self.files_copied + self.files_deleted + self.dirs_created + self.dirs_removed
    }
}

#[derive(Debug, Default)]
struct CycleStats {
    files_copied: AtomicU64,
    files_deleted: AtomicU64,
    dirs_created: AtomicU64,
    dirs_removed: AtomicU64,
    errors: AtomicU64,
}

impl CycleStats {
    fn take(&self) -> CycleReport {
        CycleReport {
            files_copied: self.files_copied.swap(0, Ordering::Relaxed),
            files_deleted: self.files_deleted.swap(0, Ordering::Relaxed),
            dirs_created: self.dirs_created.swap(0, Ordering::Relaxed),
            dirs_removed: self.dirs_removed.swap(0, Ordering::Relaxed),
            errors: self.errors.swap(0, Ordering::Relaxed),
        }
    }

    fn add(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }
}

/// Collaborators shared by both walkers and all their file tasks
#[derive(Debug)]
pub struct WalkContext {
    log: LogSender,
    signal: CriticalSignal,
    permits: Semaphore,
    stats: CycleStats,
}

impl WalkContext {
    /// `max_concurrent_files` caps how many file tasks do I/O at once
    pub fn new(log: LogSender, signal: CriticalSignal, max_concurrent_files: usize) -> Self {
        Self {
            log,
            signal,
            permits: Semaphore::new(max_concurrent_files.max(1)),
            stats: CycleStats::default(),
        }
    }

    pub fn log(&self) -> &LogSender {
        &self.log
    }

    /// Return the counters gathered since the last call and reset them
    pub fn take_report(&self) -> CycleReport {
        self.stats.take()
    }

    fn raise_critical(&self) {
        self.signal.raise();
    }

    // The semaphore is never closed, so a failed acquire just runs unthrottled.
    async fn permit(&self) -> Option<SemaphorePermit<'_>> {
        self.permits.acquire().await.ok()
    }

    fn copied(&self) {
        CycleStats::add(&self.stats.files_copied, 1);
    }

    fn deleted(&self, n: u64) {
        CycleStats::add(&self.stats.files_deleted, n);
    }

    fn dir_created(&self) {
        CycleStats::add(&self.stats.dirs_created, 1);
    }

    fn dir_removed(&self) {
        CycleStats::add(&self.stats.dirs_removed, 1);
    }

    fn failed(&self, n: u64) {
        CycleStats::add(&self.stats.errors, n);
    }
}

/// Wait for every file task of one directory level
async fn join_level(
    ctx: &WalkContext,
    mut files: JoinSet<Result<(), MirrorError>>,
    op: &'static str,
) {
    while let Some(joined) = files.join_next().await {
        // Task-level errors were logged where they happened.
        if let Err(e) = joined {
            ctx.log.error(op, MirrorError::Task(e.to_string()).to_string());
            ctx.failed(1);
        }
    }
}
