//! Chunked stream copy with progress notifications.

use std::io::{self, Read, Write};

use crate::progress::{ProgressReporter, TransferProgress};

/// Copies `reader` to `writer` through `buffer`, notifying `progress` after
/// every non-empty chunk. Returns the number of bytes copied.
///
/// `total` is the length the source reported before streaming; it is passed
/// through to notifications unchanged.
pub(crate) fn copy_with_progress<R, W>(
    reader: &mut R,
    writer: &mut W,
    buffer: &mut [u8],
    entry: &str,
    total: u64,
    progress: &mut dyn ProgressReporter,
) -> io::Result<u64>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let mut transferred = 0u64;
    loop {
        let n = match reader.read(buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        writer.write_all(&buffer[..n])?;
        transferred += n as u64;
        progress.on_progress(&TransferProgress {
            entry,
            chunk_bytes: n as u64,
            bytes_transferred: transferred,
            total_bytes: total,
        });
    }
    Ok(transferred)
}
