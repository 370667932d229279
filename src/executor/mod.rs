//! Executor module for slave-side file operations
//!
//! These are the leaf operations the walkers call. Each one logs what it did
//! (INFO) and what failed (ERROR) to the log queue; callers decide whether a
//! failure matters beyond that.

pub mod copy;
pub mod folder;

pub use copy::{copy_file, OP_COPY};
pub use folder::{
    delete_file, materialize_folder, purge_folder, remove_folder, PurgeStats, OP_DELETE_FILE,
    OP_MATERIALIZE, OP_PURGE, OP_REMOVE_FOLDER,
};
