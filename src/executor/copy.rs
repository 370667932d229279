//! File copy implementation

use crate::logging::LogSender;
use crate::types::MirrorError;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufReader};

pub const OP_COPY: &str = "copy_file";

/// 128KB read buffer
const COPY_BUFFER_SIZE: usize = 128 * 1024;

/// Copy the bytes of `src` over `dest`
///
/// `dest` is created or truncated. A failure part way through leaves the
/// partially written destination in place; the next cycle sees the size
/// mismatch and copies again.
///
/// # Returns
/// * `Ok(u64)` - Number of bytes copied
/// * `Err(MirrorError::Copy)` - open, create or stream failure
pub async fn copy_file(src: &Path, dest: &Path, log: &LogSender) -> Result<u64, MirrorError> {
    let input = File::open(src)
        .await
        .map_err(|e| copy_error(src, dest, e))?;
    let mut output = File::create(dest)
        .await
        .map_err(|e| copy_error(src, dest, e))?;

    let mut reader = BufReader::with_capacity(COPY_BUFFER_SIZE, input);
    let bytes = tokio::io::copy_buf(&mut reader, &mut output)
        .await
        .map_err(|e| copy_error(src, dest, e))?;
    output.flush().await.map_err(|e| copy_error(src, dest, e))?;

    log.info(
        OP_COPY,
        format!("Copy file {} to {}", src.display(), dest.display()),
    );

    Ok(bytes)
}

fn copy_error(src: &Path, dest: &Path, source: std::io::Error) -> MirrorError {
    MirrorError::Copy {
        from: src.to_path_buf(),
        to: dest.to_path_buf(),
        source,
    }
}
