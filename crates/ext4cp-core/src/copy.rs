//! Bounded-memory copy from an image stream to a host file.
//!
//! File contents are never loaded whole: they pass through one reusable
//! buffer whose size is fixed for the run, so memory use is bounded by the
//! chunk size regardless of file size.

use std::io::Read;
use std::io::Write;
use std::io::{self};

use crate::Result;
use crate::config::DEFAULT_CHUNK_SIZE;

/// Reusable heap buffer for streaming file contents.
///
/// # Examples
///
/// ```
/// use ext4cp_core::copy::CopyBuffer;
/// use ext4cp_core::copy::copy_with_buffer;
/// use std::io::Cursor;
///
/// # fn main() -> Result<(), ext4cp_core::ExtractionError> {
/// let mut buffer = CopyBuffer::with_chunk_size(4096);
/// let mut input = Cursor::new(vec![7u8; 10_000]);
/// let mut output = Vec::new();
///
/// let copied = copy_with_buffer(&mut input, &mut output, &mut buffer)?;
/// assert_eq!(copied, 10_000);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct CopyBuffer {
    buf: Vec<u8>,
}

impl CopyBuffer {
    /// Creates a buffer of [`DEFAULT_CHUNK_SIZE`] bytes.
    #[must_use]
    pub fn new() -> Self {
        Self::with_chunk_size(DEFAULT_CHUNK_SIZE)
    }

    /// Creates a buffer of `chunk_size` bytes (at least one byte).
    #[must_use]
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self {
            buf: vec![0u8; chunk_size.max(1)],
        }
    }

    /// Returns the buffer size in bytes.
    #[inline]
    #[must_use]
    pub fn size(&self) -> usize {
        self.buf.len()
    }
}

impl Default for CopyBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Copies everything `reader` produces into `writer`, one chunk at a time.
///
/// Interrupted reads are retried. Returns the number of bytes copied.
///
/// # Errors
///
/// Returns `ExtractionError::Io` if reading or writing fails.
pub fn copy_with_buffer<R: Read + ?Sized, W: Write + ?Sized>(
    reader: &mut R,
    writer: &mut W,
    buffer: &mut CopyBuffer,
) -> Result<u64> {
    let mut total: u64 = 0;

    loop {
        let bytes_read = match reader.read(&mut buffer.buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };

        writer.write_all(&buffer.buf[..bytes_read])?;
        total = total.saturating_add(bytes_read as u64);
    }

    Ok(total)
}
