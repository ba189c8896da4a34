use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use chart_workspace::api::{ChartSession, ChartStateStore, SyncContext, WorkspaceConfig};
use chart_workspace::core::{ScreenPoint, Timeframe, Viewport};
use chart_workspace::drawing::DrawingKind;
use chart_workspace::ingest::FileSource;
use chart_workspace::interaction::Tool;
use chart_workspace::render::{NullRenderer, OverlayStyle};

const T0: i64 = 1_704_067_200_000;
const MINUTE: i64 = 60_000;

fn minute_file(name: &str, count: i64) -> FileSource {
    let mut text = String::from("time,open,high,low,close,volume\n");
    for i in 0..count {
        let base = 100.0 + (i % 7) as f64;
        text.push_str(&format!(
            "{},{base},{},{},{},{}\n",
            T0 + i * MINUTE,
            base + 1.0,
            base - 1.0,
            base + 0.5,
            i + 1
        ));
    }
    FileSource::from_bytes(name, text.into_bytes())
}

fn temp_root() -> PathBuf {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let id = COUNTER.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!(
        "chart-workspace-tests-{}-{id}",
        std::process::id()
    ))
}

fn open(name: &str, count: i64) -> ChartSession {
    ChartSession::open(
        minute_file(name, count),
        WorkspaceConfig::default(),
        Viewport::new(1000, 500),
    )
    .expect("open session")
}

#[test]
fn drawings_are_shared_across_timeframe_files() {
    let root = temp_root();
    let store = ChartStateStore::new(root.clone());

    let mut m1 = open("EURUSD_M1.csv", 500);
    m1.set_tool(Tool::Draw(DrawingKind::HorizontalLine));
    assert!(m1.pointer_down(ScreenPoint::new(500.0, 250.0)));
    m1.pointer_up(ScreenPoint::new(500.0, 250.0));
    assert_eq!(m1.controller().drawings().len(), 1);
    store.save(&m1.state_record()).expect("save");

    let mut h1 = open("eurusd-h1.csv", 500);
    assert_eq!(h1.source_id(), m1.source_id());
    let record = store.load(h1.source_id()).expect("load").expect("record");
    h1.restore_state(record).expect("restore");
    assert_eq!(
        h1.controller().drawings().snapshot(),
        m1.controller().drawings().snapshot()
    );
    assert!(!h1.controller().can_undo());

    assert!(store.load("gbpusd").expect("load missing").is_none());
    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn record_of_another_instrument_is_rejected() {
    let eur = open("EURUSD_M1.csv", 50);
    let mut gbp = open("GBPUSD_M1.csv", 50);
    assert!(gbp.restore_state(eur.state_record()).is_err());
}

#[test]
fn backfill_prepends_without_moving_the_view() {
    let config = WorkspaceConfig::default()
        .with_chunk_size_bytes(2_048)
        .with_backfill_threshold_bars(1_000.0);
    let mut session =
        ChartSession::open(minute_file("x.csv", 600), config, Viewport::new(1000, 500))
            .expect("open");
    assert!(session.has_more());
    let loaded = session.bars().len();
    let right_time = session.visible_time_range().expect("range").1;

    let outcome = session.maybe_backfill().expect("backfill").expect("loaded");
    assert!(outcome.added > 0);
    assert!(session.bars().len() > loaded);
    assert_eq!(session.visible_time_range().expect("range").1, right_time);

    while session.maybe_backfill().expect("backfill").is_some() {}
    assert!(!session.has_more());
    assert_eq!(session.raw_bars().len(), 600);
    assert_eq!(session.maybe_backfill().expect("no-op"), None);
}

#[test]
fn timeframe_switch_keeps_drawings_anchored() {
    let mut session = open("x.csv", 600);
    session.set_tool(Tool::Draw(DrawingKind::VerticalLine));
    session.pointer_down(ScreenPoint::new(900.0, 200.0));
    session.pointer_up(ScreenPoint::new(900.0, 200.0));
    let before = session.controller().drawings().snapshot();

    session.set_timeframe(Timeframe::M5).expect("m5");
    assert_eq!(session.timeframe(), Timeframe::M5);
    assert_eq!(session.bars().len(), 120);
    assert_eq!(session.controller().drawings().snapshot(), before);

    let csv = session.export_csv().expect("export");
    assert_eq!(csv.lines().count(), 121);
}

#[test]
fn overlay_renders_committed_drawings() {
    let mut session = open("x.csv", 300);
    session.set_tool(Tool::Draw(DrawingKind::TrendLine));
    for x in [600.0, 800.0] {
        session.pointer_down(ScreenPoint::new(x, 200.0));
        session.pointer_up(ScreenPoint::new(x, 200.0));
    }
    let frame = session.build_overlay(&OverlayStyle::default());
    assert_eq!(frame.lines.len(), 1);
    // Selected: two handles.
    assert_eq!(frame.circles.len(), 2);

    let mut renderer = NullRenderer::default();
    assert!(session.render_frame(&mut renderer, &OverlayStyle::default()).expect("paint"));
    assert_eq!(renderer.frames_rendered, 1);
}

#[test]
fn visible_range_sync_between_charts() {
    let mut sync = SyncContext::default();
    let mut a = open("a.csv", 400);
    let mut b = open("b.csv", 400);
    let a_id = sync.subscribe();
    let b_id = sync.subscribe();

    a.pan_by_pixels(200.0).expect("pan");
    assert_eq!(a.publish_visible_range(&mut sync, a_id), 1);
    b.apply_sync(&mut sync, b_id).expect("apply");
    assert_eq!(b.visible_time_range(), a.visible_time_range());

    a.publish_crosshair(&mut sync, a_id, Some(ScreenPoint::new(500.0, 250.0)));
    b.apply_sync(&mut sync, b_id).expect("apply");
    assert!(b.synced_crosshair().is_some());
}
