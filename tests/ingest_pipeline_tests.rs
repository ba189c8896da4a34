use chart_workspace::core::{OhlcvBar, Timeframe};
use chart_workspace::ingest::{
    FileSource, SanitizeOptions, StreamController, merge_dedup, parse_line, parse_lines, resample,
    sanitize, to_csv_string,
};

const T0: i64 = 1_704_067_200_000;
const MINUTE: i64 = 60_000;

#[test]
fn two_minute_bucket_merges_two_base_candles() {
    let base = [
        OhlcvBar::raw(T0, 100.0, 105.0, 95.0, 102.0, 10.0),
        OhlcvBar::raw(T0 + MINUTE, 102.0, 103.0, 101.0, 101.5, 5.0),
    ];
    let out = resample(&base, MINUTE, 2 * MINUTE);
    assert_eq!(out, vec![OhlcvBar::raw(T0, 100.0, 105.0, 95.0, 101.5, 15.0)]);
}

#[test]
fn malformed_lines_are_skipped() {
    assert!(parse_line("0,1,2,3,4").is_none());
    assert!(parse_line("time,open,high,low,close").is_none());
    assert!(parse_line("2024-01-01 00:00,1,2").is_none());

    let parsed = parse_lines([
        "Date;Time;Open;High;Low;Close;Volume",
        "20240101;00:00;1.10;1.20;1.00;1.15;100",
        "garbage",
        "20240101;00:01;1.15;1.25;1.05;1.20;50",
    ]);
    assert_eq!(parsed.len(), 2);
    assert_eq!(parsed[0].time, T0);
    assert_eq!(parsed[1].time, T0 + MINUTE);
    assert_eq!(parsed[1].volume, 50.0);
}

#[test]
fn epoch_seconds_are_scaled_to_millis() {
    let bar = parse_line("1704067200,1,2,0.5,1.5,3").expect("epoch seconds");
    assert_eq!(bar.time, T0);
}

#[test]
fn stream_backfills_until_start_of_file() {
    let mut text = String::new();
    for i in 0..400 {
        text.push_str(&format!("{},1.0,1.5,0.5,1.2,1\n", T0 + i * MINUTE));
    }
    let source = FileSource::from_bytes("EURUSD_M1.csv", text.into_bytes());
    let mut stream = StreamController::open(source, 4_096).expect("open");
    assert!(stream.has_more());
    let first_count = stream.bars().len();
    assert!(first_count < 400);

    let mut loads = 0;
    while stream.load_previous().expect("backfill").is_some() {
        loads += 1;
        assert!(loads < 100, "pagination did not terminate");
    }
    assert!(!stream.has_more());
    assert_eq!(stream.bars().len(), 400);
    assert!(stream.bars().windows(2).all(|pair| pair[0].time < pair[1].time));
}

#[test]
fn stale_backfill_after_close_is_rejected() {
    let mut text = String::new();
    for i in 0..400 {
        text.push_str(&format!("{},1.0,1.5,0.5,1.2,1\n", T0 + i * MINUTE));
    }
    let source = FileSource::from_bytes("x.csv", text.into_bytes());
    let mut stream = StreamController::open(source, 4_096).expect("open");
    let ticket = stream.begin_backward_load().expect("ticket");
    assert!(stream.begin_backward_load().is_none());
    let read = stream.read_for(ticket);
    stream.close();
    assert!(stream.complete_backward_load(ticket, read).is_err());
    assert!(stream.bars().is_empty());
}

#[test]
fn sanitize_then_resample_then_export() {
    let raw = vec![
        OhlcvBar::raw(T0, 1.0, 1.2, 0.9, 1.1, 10.0),
        OhlcvBar::raw(T0 + MINUTE, 0.0, 1.3, 1.0, 1.2, 5.0),
        // One missing minute before this bar.
        OhlcvBar::raw(T0 + 3 * MINUTE, 1.2, 1.1, 1.3, 1.25, 2.0),
    ];
    let (clean, stats) = sanitize(&raw, SanitizeOptions::new(MINUTE));
    assert_eq!(stats.fixed_zeroes, 1);
    assert_eq!(stats.filled_gaps, 1);
    assert!(stats.fixed_logic >= 1);
    assert_eq!(stats.total_records, clean.len());
    assert_eq!(clean.len(), 4);
    assert!(clean.iter().all(OhlcvBar::is_consistent));

    let five = resample(&clean, MINUTE, Timeframe::M5.duration_ms());
    assert_eq!(five.len(), 1);
    assert_eq!(five[0].volume, 17.0);

    let csv = to_csv_string(&five).expect("export");
    assert!(csv.starts_with("time,open,high,low,close,volume\n2024-01-01T00:00:00Z,"));
    assert!(!csv.ends_with('\n'));
}

#[test]
fn merge_keeps_first_occurrence() {
    let existing = [OhlcvBar::flat(T0, 1.0)];
    let incoming = [OhlcvBar::flat(T0 - MINUTE, 0.5), OhlcvBar::flat(T0, 9.0)];
    let merged = merge_dedup(&existing, &incoming);
    assert_eq!(merged.len(), 2);
    assert_eq!(merged[1].close, 1.0);
}
