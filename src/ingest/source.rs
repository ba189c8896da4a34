use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::core::timeframe::file_name_tokens;
use crate::core::Timeframe;
use crate::error::{ChartError, ChartResult};

/// Byte-range access to an OHLCV file, independent of the backing store.
pub trait ChunkSource {
    /// Display name, usually the file name.
    fn name(&self) -> &str;

    fn size(&self) -> ChartResult<u64>;

    /// Reads bytes `[start, end)`. `end` is clamped to the source size.
    fn read_range(&self, start: u64, end: u64) -> ChartResult<Vec<u8>>;
}

/// The backing stores a chart can be opened from.
#[derive(Debug, Clone)]
pub enum FileSource {
    /// Desktop path; each read reopens the file.
    Path(PathBuf),
    /// Already-open handle granted by the host (for example a picker result).
    Handle {
        name: String,
        file: Arc<Mutex<File>>,
    },
    /// In-memory content such as dropped or pasted data.
    Memory { name: String, bytes: Arc<[u8]> },
}

impl FileSource {
    #[must_use]
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self::Path(path.into())
    }

    #[must_use]
    pub fn from_handle(name: impl Into<String>, file: File) -> Self {
        Self::Handle {
            name: name.into(),
            file: Arc::new(Mutex::new(file)),
        }
    }

    #[must_use]
    pub fn from_bytes(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self::Memory {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Stable id shared by every timeframe file of one instrument.
    #[must_use]
    pub fn source_id(&self) -> String {
        source_id_for_name(self.name())
    }
}

impl ChunkSource for FileSource {
    fn name(&self) -> &str {
        match self {
            FileSource::Path(path) => path
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or_default(),
            FileSource::Handle { name, .. } | FileSource::Memory { name, .. } => name,
        }
    }

    fn size(&self) -> ChartResult<u64> {
        match self {
            FileSource::Path(path) => std::fs::metadata(path)
                .map(|meta| meta.len())
                .map_err(|err| ChartError::io(format!("stat {}", path.display()), err)),
            FileSource::Handle { name, file } => {
                let file = lock_handle(name, file)?;
                file.metadata()
                    .map(|meta| meta.len())
                    .map_err(|err| ChartError::io(format!("stat {name}"), err))
            }
            FileSource::Memory { bytes, .. } => Ok(bytes.len() as u64),
        }
    }

    fn read_range(&self, start: u64, end: u64) -> ChartResult<Vec<u8>> {
        if end < start {
            return Err(ChartError::InvalidData(format!(
                "invalid byte range {start}..{end}"
            )));
        }
        match self {
            FileSource::Path(path) => {
                let mut file = File::open(path)
                    .map_err(|err| ChartError::io(format!("open {}", path.display()), err))?;
                read_file_range(&mut file, start, end, &path.display().to_string())
            }
            FileSource::Handle { name, file } => {
                let mut file = lock_handle(name, file)?;
                read_file_range(&mut file, start, end, name)
            }
            FileSource::Memory { bytes, .. } => {
                let len = bytes.len() as u64;
                let start = start.min(len) as usize;
                let end = end.min(len) as usize;
                Ok(bytes[start..end].to_vec())
            }
        }
    }
}

fn lock_handle<'a>(
    name: &str,
    file: &'a Mutex<File>,
) -> ChartResult<std::sync::MutexGuard<'a, File>> {
    file.lock()
        .map_err(|_| ChartError::InvalidData(format!("file handle for {name} is poisoned")))
}

fn read_file_range(file: &mut File, start: u64, end: u64, label: &str) -> ChartResult<Vec<u8>> {
    file.seek(SeekFrom::Start(start))
        .map_err(|err| ChartError::io(format!("seek {label}"), err))?;
    let mut buffer = Vec::with_capacity((end - start) as usize);
    file.take(end - start)
        .read_to_end(&mut buffer)
        .map_err(|err| ChartError::io(format!("read {label}"), err))?;
    Ok(buffer)
}

/// Derives an instrument id from a file name by dropping the extension and any
/// timeframe token, so `EURUSD_M1.csv` and `eurusd-h4.txt` share `eurusd`.
#[must_use]
pub fn source_id_for_name(name: &str) -> String {
    let tokens: Vec<String> = file_name_tokens(name)
        .filter(|token| Timeframe::from_token(token).is_none())
        .collect();
    if tokens.is_empty() {
        return sanitize_source_id(name);
    }
    sanitize_source_id(&tokens.join("_"))
}

/// Makes an id safe to use as a file name: anything other than ASCII
/// alphanumerics, `_` and `-` becomes `_`.
#[must_use]
pub fn sanitize_source_id(source_id: &str) -> String {
    source_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{ChunkSource, FileSource, sanitize_source_id, source_id_for_name};

    #[test]
    fn memory_source_clamps_ranges() {
        let source = FileSource::from_bytes("a.csv", b"0123456789".to_vec());
        assert_eq!(source.size().expect("size"), 10);
        assert_eq!(source.read_range(8, 20).expect("read"), b"89".to_vec());
        assert!(source.read_range(5, 2).is_err());
    }

    #[test]
    fn source_id_is_shared_across_timeframes() {
        assert_eq!(source_id_for_name("EURUSD_M1.csv"), "eurusd");
        assert_eq!(source_id_for_name("eurusd-h4.txt"), "eurusd");
        assert_ne!(
            source_id_for_name("EURUSD_M1.csv"),
            source_id_for_name("GBPUSD_M1.csv")
        );
    }

    #[test]
    fn sanitizes_path_characters() {
        assert_eq!(sanitize_source_id("../etc/passwd"), "___etc_passwd");
    }
}
