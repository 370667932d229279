//! Prune walker: delete from slave what master no longer has

use super::{join_level, WalkContext};
use crate::executor::{delete_file, remove_folder, OP_DELETE_FILE, OP_REMOVE_FOLDER};
use crate::types::{lookup_entry, read_entries, BoxFuture, EntryInfo, MirrorError};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinSet;

const OP_WALK: &str = "check_slave_folder";

/// Delete everything under `slave` that has no counterpart under `master`
///
/// A slave folder is kept (and walked) only while master has a directory of
/// the same name; otherwise the whole slave branch is removed in one step. A
/// slave file is kept while master has any entry of that name. When master
/// cannot be consulted nothing is deleted.
///
/// # Errors
/// Returns [`MirrorError::RootUnreadable`] when `slave` itself cannot be
/// listed; logged as CRITICAL and signalled.
pub async fn check_slave_folder(
    ctx: Arc<WalkContext>,
    master: PathBuf,
    slave: PathBuf,
) -> Result<(), MirrorError> {
    let entries = match read_entries(&slave).await {
        Ok(entries) => entries,
        Err(source) => {
            ctx.log.critical(
                OP_WALK,
                format!("error reading slave folder {}: {}", slave.display(), source),
            );
            ctx.raise_critical();
            return Err(MirrorError::RootUnreadable {
                path: slave,
                source,
            });
        }
    };

    prune_entries(ctx, master, slave, entries).await;
    Ok(())
}

fn prune_subfolder(
    ctx: Arc<WalkContext>,
    master: PathBuf,
    slave: PathBuf,
) -> BoxFuture<'static, Result<(), MirrorError>> {
    Box::pin(async move {
        let entries = match read_entries(&slave).await {
            Ok(entries) => entries,
            Err(source) => {
                ctx.log.error(
                    OP_WALK,
                    format!("error reading slave folder {}: {}", slave.display(), source),
                );
                ctx.failed(1);
                return Err(MirrorError::Listing {
                    path: slave,
                    source,
                });
            }
        };

        prune_entries(ctx, master, slave, entries).await;
        Ok(())
    })
}

async fn prune_entries(
    ctx: Arc<WalkContext>,
    master: PathBuf,
    slave: PathBuf,
    entries: Vec<EntryInfo>,
) {
    let mut files = JoinSet::new();

    for entry in entries {
        if entry.is_dir() {
            let counterpart = match lookup_entry(&master, &entry.name).await {
                Ok(found) => found,
                Err(e) => {
                    ctx.log.error(
                        OP_REMOVE_FOLDER,
                        format!("Cannot list {}: {}", master.display(), e),
                    );
                    ctx.failed(1);
                    continue;
                }
            };

            let slave_dir = slave.join(&entry.name);
            match counterpart {
                Some(found) if found.is_dir() => {
                    let _ = prune_subfolder(Arc::clone(&ctx), master.join(&entry.name), slave_dir)
                        .await;
                }
                _ => match remove_folder(&slave_dir, &ctx.log).await {
                    Ok(purged) => {
                        ctx.deleted(purged.removed);
                        ctx.failed(purged.failed);
                        ctx.dir_removed();
                    }
                    Err(_) => ctx.failed(1),
                },
            }
        } else {
            let ctx = Arc::clone(&ctx);
            let master = master.clone();
            let slave = slave.clone();
            files.spawn(async move {
                let _permit = ctx.permit().await;
                prune_file(&ctx, &entry, &master, &slave).await
            });
        }
    }

    join_level(&ctx, files, OP_WALK).await;
}

/// Delete one slave file if master has nothing of that name
async fn prune_file(
    ctx: &WalkContext,
    entry: &EntryInfo,
    master: &Path,
    slave: &Path,
) -> Result<(), MirrorError> {
    match lookup_entry(master, &entry.name).await {
        Ok(Some(_)) => Ok(()),
        Ok(None) => match delete_file(&slave.join(&entry.name), &ctx.log).await {
            Ok(()) => {
                ctx.deleted(1);
                Ok(())
            }
            Err(e) => {
                ctx.failed(1);
                Err(e)
            }
        },
        Err(source) => {
            ctx.log.error(
                OP_DELETE_FILE,
                format!("Cannot list {}: {}", master.display(), source),
            );
            ctx.failed(1);
            Err(MirrorError::Listing {
                path: master.to_path_buf(),
                source,
            })
        }
    }
}
