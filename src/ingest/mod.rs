//! Time-series ingestion: chunked file access, line parsing, repair,
//! resampling and export.

pub mod chunk_reader;
pub mod export;
pub mod line_parser;
pub mod resampler;
pub mod sanitizer;
pub mod source;
pub mod stream;

pub use chunk_reader::{ChunkRead, DEFAULT_CHUNK_SIZE, read_previous, read_tail};
pub use export::{to_csv_string, write_csv};
pub use line_parser::{
    detect_delimiter, parse_line, parse_lines, parse_record, parse_text, parse_timestamp,
};
pub use resampler::{bucket_start, merge_dedup, resample};
pub use sanitizer::{SanitizeOptions, SanitizeStats, sanitize};
pub use source::{ChunkSource, FileSource, sanitize_source_id, source_id_for_name};
pub use stream::{LoadOutcome, LoadTicket, StreamController};
