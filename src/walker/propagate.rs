//! Propagate walker: master -> slave

use super::{join_level, WalkContext};
use crate::executor::{copy_file, materialize_folder};
use crate::types::{lookup_entry, read_entries, BoxFuture, EntryInfo, MirrorError};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::task::JoinSet;

const OP_WALK: &str = "check_master_folder";
const OP_FILE: &str = "check_file";

/// Make sure everything under `master` exists under `slave`
///
/// Files are compared by size only; a missing or differently sized slave file
/// is (re)copied from master. Subdirectories are created with the master
/// directory's permission bits before the walker descends into them.
///
/// # Errors
/// Returns [`MirrorError::RootUnreadable`] when `master` itself cannot be
/// listed. That failure is logged as CRITICAL and raises the critical signal.
/// Every other failure is logged and skipped.
pub async fn check_master_folder(
    ctx: Arc<WalkContext>,
    master: PathBuf,
    slave: PathBuf,
) -> Result<(), MirrorError> {
    let entries = match read_entries(&master).await {
        Ok(entries) => entries,
        Err(source) => {
            ctx.log.critical(
                OP_WALK,
                format!(
                    "error reading master folder {}: {}",
                    master.display(),
                    source
                ),
            );
            ctx.raise_critical();
            return Err(MirrorError::RootUnreadable {
                path: master,
                source,
            });
        }
    };

    propagate_entries(ctx, master, slave, entries).await;
    Ok(())
}

fn propagate_subfolder(
    ctx: Arc<WalkContext>,
    master: PathBuf,
    slave: PathBuf,
) -> BoxFuture<'static, Result<(), MirrorError>> {
    Box::pin(async move {
        let entries = match read_entries(&master).await {
            Ok(entries) => entries,
            Err(source) => {
                ctx.log.error(
                    OP_WALK,
                    format!(
                        "error reading master folder {}: {}",
                        master.display(),
                        source
                    ),
                );
                ctx.failed(1);
                return Err(MirrorError::Listing {
                    path: master,
                    source,
                });
            }
        };

        propagate_entries(ctx, master, slave, entries).await;
        Ok(())
    })
}

async fn propagate_entries(
    ctx: Arc<WalkContext>,
    master: PathBuf,
    slave: PathBuf,
    entries: Vec<EntryInfo>,
) {
    let mut files = JoinSet::new();

    for entry in entries {
        if entry.is_dir() {
            match materialize_folder(&entry.name, &slave, entry.mode, &ctx.log).await {
                Ok(created) => {
                    if created {
                        ctx.dir_created();
                    }
                    // Failures below were logged where they happened.
                    let _ = propagate_subfolder(
                        Arc::clone(&ctx),
                        master.join(&entry.name),
                        slave.join(&entry.name),
                    )
                    .await;
                }
                Err(_) => ctx.failed(1),
            }
        } else {
            let ctx = Arc::clone(&ctx);
            let master = master.clone();
            let slave = slave.clone();
            files.spawn(async move {
                let _permit = ctx.permit().await;
                check_file(&ctx, &entry, &master, &slave).await
            });
        }
    }

    join_level(&ctx, files, OP_WALK).await;
}

/// Bring one slave file in line with its master counterpart
async fn check_file(
    ctx: &WalkContext,
    entry: &EntryInfo,
    master: &Path,
    slave: &Path,
) -> Result<(), MirrorError> {
    let existing = match lookup_entry(slave, &entry.name).await {
        Ok(found) => found,
        Err(source) => {
            ctx.log.error(
                OP_FILE,
                format!("Cannot list {}: {}", slave.display(), source),
            );
            ctx.failed(1);
            return Err(MirrorError::Listing {
                path: slave.to_path_buf(),
                source,
            });
        }
    };

    let source = master.join(&entry.name);
    let target = slave.join(&entry.name);

    match existing {
        Some(current) if current.is_file() && current.size == entry.size => return Ok(()),
        Some(current) => {
            let removed = if current.is_dir() {
                fs::remove_dir_all(&target).await
            } else {
                fs::remove_file(&target).await
            };
            if let Err(e) = removed {
                ctx.log.error(
                    OP_FILE,
                    format!("Cannot remove stale {}: {}", target.display(), e),
                );
                ctx.failed(1);
                return Err(MirrorError::Remove {
                    path: target,
                    source: e,
                });
            }
            ctx.deleted(1);
        }
        None => {}
    }

    match copy_file(&source, &target, &ctx.log).await {
        Ok(_) => {
            ctx.copied();
            Ok(())
        }
        Err(e) => {
            ctx.log.error(OP_FILE, e.to_string());
            ctx.failed(1);
            Err(e)
        }
    }
}
