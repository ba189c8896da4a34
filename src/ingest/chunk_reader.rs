use tracing::{debug, trace};

use crate::core::OhlcvBar;
use crate::error::ChartResult;
use crate::ingest::ChunkSource;
use crate::ingest::line_parser::parse_text;

/// Default chunk size for tail-first loading and backward pagination.
pub const DEFAULT_CHUNK_SIZE: u64 = 2 * 1024 * 1024;

/// Result of one chunk read.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkRead {
    /// Parsed records in file order (not yet merged or sorted).
    pub records: Vec<OhlcvBar>,
    /// Byte offset where this chunk started; the next backward read ends here.
    pub cursor: u64,
    /// Bytes of the first, possibly incomplete, line of the chunk.
    pub leftover: Vec<u8>,
    pub has_more: bool,
}

/// Reads the last `chunk_size` bytes of the source.
pub fn read_tail<S: ChunkSource + ?Sized>(source: &S, chunk_size: u64) -> ChartResult<ChunkRead> {
    let size = source.size()?;
    let start = size.saturating_sub(chunk_size.max(1));
    let bytes = source.read_range(start, size)?;
    debug!(source = source.name(), start, end = size, bytes = bytes.len(), "read tail chunk");
    Ok(split_chunk(bytes, start))
}

/// Reads the chunk ending at `cursor`, joined with the `leftover` held from the
/// previous read.
pub fn read_previous<S: ChunkSource + ?Sized>(
    source: &S,
    cursor: u64,
    leftover: &[u8],
    chunk_size: u64,
) -> ChartResult<ChunkRead> {
    let start = cursor.saturating_sub(chunk_size.max(1));
    let mut bytes = source.read_range(start, cursor)?;
    debug!(
        source = source.name(),
        start,
        end = cursor,
        bytes = bytes.len(),
        leftover = leftover.len(),
        "read previous chunk"
    );
    bytes.extend_from_slice(leftover);
    Ok(split_chunk(bytes, start))
}

/// Splits decoded chunk bytes into lines. When the chunk does not start at
/// offset zero its first line is incomplete and is held back as leftover.
fn split_chunk(bytes: Vec<u8>, start: u64) -> ChunkRead {
    let (leftover, body) = if start > 0 {
        match bytes.iter().position(|b| *b == b'\n') {
            Some(newline) => (bytes[..newline].to_vec(), &bytes[newline + 1..]),
            None => (bytes.clone(), &[][..]),
        }
    } else {
        (Vec::new(), &bytes[..])
    };

    let decoded = String::from_utf8_lossy(body);
    let mut text: &str = &decoded;
    if start == 0 {
        text = text.strip_prefix('\u{feff}').unwrap_or(text);
    }
    let records = parse_text(text);
    trace!(start, records = records.len(), leftover = leftover.len(), "split chunk");
    ChunkRead {
        records,
        cursor: start,
        leftover,
        has_more: start > 0,
    }
}
