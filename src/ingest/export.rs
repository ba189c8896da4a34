use std::io::Write;

use crate::core::OhlcvBar;
use crate::error::{ChartError, ChartResult};

pub const EXPORT_HEADER: [&str; 6] = ["time", "open", "high", "low", "close", "volume"];

/// Writes `bars` as CSV: header row, one candle per line, ISO-8601 times.
pub fn write_csv<W: Write>(writer: W, bars: &[OhlcvBar]) -> ChartResult<()> {
    let mut csv = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(writer);
    csv.write_record(EXPORT_HEADER).map_err(map_csv_error)?;
    for bar in bars {
        csv.write_record([
            bar.iso_time(),
            bar.open.to_string(),
            bar.high.to_string(),
            bar.low.to_string(),
            bar.close.to_string(),
            bar.volume.to_string(),
        ])
        .map_err(map_csv_error)?;
    }
    csv.flush()
        .map_err(|err| ChartError::io("flush csv export", err))
}

/// CSV export as a string without a trailing newline.
pub fn to_csv_string(bars: &[OhlcvBar]) -> ChartResult<String> {
    let mut buffer = Vec::new();
    write_csv(&mut buffer, bars)?;
    let mut text = String::from_utf8(buffer)
        .map_err(|err| ChartError::Serialization(format!("csv export is not utf-8: {err}")))?;
    while text.ends_with('\n') {
        text.pop();
    }
    Ok(text)
}

fn map_csv_error(err: csv::Error) -> ChartError {
    ChartError::Serialization(format!("failed to write csv record: {err}"))
}
