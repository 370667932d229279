//! Slave-side folder operations: materialize, purge, remove

use crate::logging::LogSender;
use crate::types::{lookup_entry, read_entries, BoxFuture, MirrorError};
use std::ffi::OsStr;
use std::io;
use std::path::Path;
use tokio::fs;

pub const OP_MATERIALIZE: &str = "check_folder";
pub const OP_PURGE: &str = "purge_folder";
pub const OP_REMOVE_FOLDER: &str = "remove_folder";
pub const OP_DELETE_FILE: &str = "delete_file";

/// Result of emptying a folder
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgeStats {
    /// Entries removed (files and nested folders)
    pub removed: u64,

    /// Entries that could not be removed
    pub failed: u64,
}

impl PurgeStats {
    fn absorb(&mut self, other: PurgeStats) {
        self.removed += other.removed;
        self.failed += other.failed;
    }
}

/// Ensure `slave_parent/name` is a directory
///
/// An existing directory is left alone. A non-directory holding the name is
/// removed first. New directories get `mode` as their permission bits.
///
/// # Returns
/// * `Ok(true)` - the directory was created
/// * `Ok(false)` - it already existed
pub async fn materialize_folder(
    name: &OsStr,
    slave_parent: &Path,
    mode: u32,
    log: &LogSender,
) -> Result<bool, MirrorError> {
    let path = slave_parent.join(name);

    let existing = match lookup_entry(slave_parent, name).await {
        Ok(found) => found,
        Err(source) => {
            log.error(
                OP_MATERIALIZE,
                format!("Cannot list {}: {}", slave_parent.display(), source),
            );
            return Err(MirrorError::Listing {
                path: slave_parent.to_path_buf(),
                source,
            });
        }
    };

    match existing {
        Some(entry) if entry.is_dir() => return Ok(false),
        Some(_) => {
            if let Err(source) = fs::remove_file(&path).await {
                log.error(
                    OP_MATERIALIZE,
                    format!("Cannot replace file {}: {}", path.display(), source),
                );
                return Err(MirrorError::Remove { path, source });
            }
        }
        None => {}
    }

    if let Err(e) = create_dir_with_mode(&path, mode).await {
        log.error(
            OP_MATERIALIZE,
            format!("Cannot create folder {}: {}", path.display(), e),
        );
        return Err(MirrorError::Io(e));
    }

    log.info(
        OP_MATERIALIZE,
        format!(
            "Folder {} created in {}",
            name.to_string_lossy(),
            slave_parent.display()
        ),
    );
    Ok(true)
}

#[cfg(unix)]
async fn create_dir_with_mode(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut builder = fs::DirBuilder::new();
    builder.mode(mode);
    builder.create(path).await?;
    // mkdir applies the umask; set the bits explicitly.
    fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).await
}

#[cfg(not(unix))]
async fn create_dir_with_mode(path: &Path, _mode: u32) -> io::Result<()> {
    fs::create_dir(path).await
}

/// Remove everything inside `path`, keeping `path` itself
///
/// Nested folders are emptied and removed as well. Each failed removal is
/// logged and skipped; one "purged" record is emitted at the end either way.
/// Only a failure to list `path` itself is returned as an error.
pub async fn purge_folder(path: &Path, log: &LogSender) -> Result<PurgeStats, MirrorError> {
    let stats = empty_folder(path, log).await?;
    log.info(OP_PURGE, format!("Folder {} is purged", path.display()));
    Ok(stats)
}

fn empty_folder<'a>(
    path: &'a Path,
    log: &'a LogSender,
) -> BoxFuture<'a, Result<PurgeStats, MirrorError>> {
    Box::pin(async move {
        let entries = read_entries(path).await.map_err(|source| {
            log.error(
                OP_PURGE,
                format!("Cannot list {}: {}", path.display(), source),
            );
            MirrorError::Listing {
                path: path.to_path_buf(),
                source,
            }
        })?;

        let mut stats = PurgeStats::default();
        for entry in entries {
            let child = path.join(&entry.name);

            let removed = if entry.is_dir() {
                match empty_folder(&child, log).await {
                    Ok(inner) => {
                        stats.absorb(inner);
                        fs::remove_dir(&child).await
                    }
                    Err(_) => {
                        stats.failed += 1;
                        continue;
                    }
                }
            } else {
                fs::remove_file(&child).await
            };

            match removed {
                Ok(()) => stats.removed += 1,
                Err(e) => {
                    stats.failed += 1;
                    log.error(
                        OP_PURGE,
                        format!("Cannot remove {}: {}", child.display(), e),
                    );
                }
            }
        }

        Ok(stats)
    })
}

/// Purge `path`, then remove the folder itself
pub async fn remove_folder(path: &Path, log: &LogSender) -> Result<PurgeStats, MirrorError> {
    // A purge failure shows up as a failed remove_dir below.
    let stats = purge_folder(path, log).await.unwrap_or_default();

    if let Err(source) = fs::remove_dir(path).await {
        log.error(
            OP_REMOVE_FOLDER,
            format!("Cannot delete folder {}: {}", path.display(), source),
        );
        return Err(MirrorError::Remove {
            path: path.to_path_buf(),
            source,
        });
    }

    log.info(
        OP_REMOVE_FOLDER,
        format!("Folder {} deleted", path.display()),
    );
    Ok(stats)
}

/// Remove one slave file
pub async fn delete_file(path: &Path, log: &LogSender) -> Result<(), MirrorError> {
    if let Err(source) = fs::remove_file(path).await {
        log.error(
            OP_DELETE_FILE,
            format!("Cannot delete {}: {}", path.display(), source),
        );
        return Err(MirrorError::Remove {
            path: path.to_path_buf(),
            source,
        });
    }

    log.info(OP_DELETE_FILE, format!("File {} deleted", path.display()));
    Ok(())
}
