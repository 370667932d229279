//! EntryInfo - One directory listing entry, read fresh from disk

use std::ffi::{OsStr, OsString};
use std::fs::Metadata;
use std::io::{self, ErrorKind};
use std::path::Path;
use tokio::fs;

/// Kind of a listed entry
///
/// Anything that is not a directory is treated as a file, symlinks included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
}

/// A directory entry as seen by the walkers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryInfo {
    /// Entry name (last path component)
    pub name: OsString,

    /// File or directory
    pub kind: EntryKind,

    /// Size in bytes (files only, 0 for directories)
    pub size: u64,

    /// Permission bits (directories only, 0 for files)
    pub mode: u32,
}

impl EntryInfo {
    /// Create a file entry
    pub fn file(name: impl Into<OsString>, size: u64) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::File,
            size,
            mode: 0,
        }
    }

    /// Create a directory entry
    pub fn dir(name: impl Into<OsString>, mode: u32) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Dir,
            size: 0,
            mode,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Dir
    }

    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }
}

/// List the entries of `dir`.
///
/// Entries that vanish between the listing and their metadata read are
/// skipped; the other walker may be deleting them concurrently.
pub async fn read_entries(dir: &Path) -> io::Result<Vec<EntryInfo>> {
    let mut reader = fs::read_dir(dir).await?;
    let mut entries = Vec::new();

    while let Some(entry) = reader.next_entry().await? {
        let path = entry.path();
        let metadata = match entry.metadata().await {
            Ok(m) => m,
            Err(e) if e.kind() == ErrorKind::NotFound => continue,
            Err(e) => return Err(e),
        };
        entries.push(describe(entry.file_name(), &path, metadata).await);
    }

    Ok(entries)
}

/// Look up `name` inside `dir`.
///
/// * `Ok(Some(_))` - an entry with that name exists
/// * `Ok(None)` - `dir` is listable and has no such entry
/// * `Err(_)` - `dir` itself cannot be listed
pub async fn lookup_entry(dir: &Path, name: &OsStr) -> io::Result<Option<EntryInfo>> {
    let path = dir.join(name);
    match fs::symlink_metadata(&path).await {
        Ok(metadata) => Ok(Some(describe(name.to_os_string(), &path, metadata).await)),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            // Absence only counts when the parent can actually be listed.
            let _listing = fs::read_dir(dir).await?;
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

async fn describe(name: OsString, path: &Path, metadata: Metadata) -> EntryInfo {
    if metadata.is_dir() {
        return EntryInfo::dir(name, mode_bits(&metadata));
    }

    // Symlinks are compared by the size of what they point at, since the
    // copier follows them.
    let size = if metadata.file_type().is_symlink() {
        fs::metadata(path)
            .await
            .map(|target| target.len())
            .unwrap_or(metadata.len())
    } else {
        metadata.len()
    };

    EntryInfo::file(name, size)
}

#[cfg(unix)]
fn mode_bits(metadata: &Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn mode_bits(_metadata: &Metadata) -> u32 {
    0o755
}
