use chart_workspace::api::{CoordinateMapper, ViewportSurface};
use chart_workspace::core::{OhlcvBar, PriceScale, ScreenPoint, TimeIndex, TimeScale, Viewport};
use chart_workspace::drawing::{
    Drawing, DrawingId, DrawingKind, DrawingPoint, DrawingProperties, DrawingSet, History,
    simplify_rdp, smooth_stroke,
};
use chart_workspace::interaction::{DrawingController, Tool};
use proptest::prelude::*;

const T0: i64 = 1_704_067_200_000;
const MINUTE: i64 = 60_000;

fn fixture(count: i64) -> (Vec<OhlcvBar>, TimeIndex) {
    let bars: Vec<OhlcvBar> = (0..count)
        .map(|i| OhlcvBar::raw(T0 + i * MINUTE, 100.0, 101.0, 99.0, 100.5, 1.0))
        .collect();
    let index = TimeIndex::from_bars(&bars, MINUTE);
    (bars, index)
}

#[derive(Debug, Clone)]
enum Edit {
    Create(usize),
    Drag(usize, f64),
    ToggleLock(usize),
    Delete(usize),
}

fn edits() -> impl Strategy<Value = Vec<Edit>> {
    let edit = prop_oneof![
        (0usize..6).prop_map(Edit::Create),
        (0usize..6, -40.0f64..40.0).prop_map(|(row, dy)| Edit::Drag(row, dy)),
        any::<usize>().prop_map(Edit::ToggleLock),
        any::<usize>().prop_map(Edit::Delete),
    ];
    prop::collection::vec(edit, 1..40)
}

fn nth_id(controller: &DrawingController, n: usize) -> Option<DrawingId> {
    let len = controller.drawings().len();
    if len == 0 {
        return None;
    }
    controller.drawings().iter().nth(n % len).map(|d| d.id.clone())
}

fn row_y(row: usize) -> f64 {
    100.0 + row as f64 * 50.0
}

proptest! {
    #[test]
    fn screen_round_trip_inside_loaded_range(
        bar in 0i64..200,
        price in 10.0f64..190.0,
        from in -20.0f64..50.0,
        span in 50.0f64..400.0,
    ) {
        let (bars, index) = fixture(200);
        let surface = ViewportSurface::new(
            Viewport::new(1200, 600),
            TimeScale::new(from, from + span).expect("time scale"),
            PriceScale::new(0.0, 200.0).expect("price scale"),
            &index,
        );
        let mapper = CoordinateMapper::new(&surface, &index, &bars);
        let point = DrawingPoint::new(T0 + bar * MINUTE, price);

        let screen = mapper.point_to_screen(point);
        prop_assert!(screen.is_resolved());
        let back = mapper.screen_to_point(screen, false).expect("inverse");
        prop_assert!((back.time - point.time).abs() <= 1);
        prop_assert!((back.price - point.price).abs() <= 1e-6);
    }

    #[test]
    fn extrapolated_times_keep_their_order(
        ahead_a in 1i64..10_000_000,
        ahead_b in 1i64..10_000_000,
    ) {
        prop_assume!(ahead_a != ahead_b);
        let (bars, index) = fixture(50);
        let surface = ViewportSurface::new(
            Viewport::new(1000, 500),
            TimeScale::new(0.0, 60.0).expect("time scale"),
            PriceScale::new(0.0, 200.0).expect("price scale"),
            &index,
        );
        let mapper = CoordinateMapper::new(&surface, &index, &bars);
        let last = T0 + 49 * MINUTE;
        let (t1, t2) = (last + ahead_a.min(ahead_b), last + ahead_a.max(ahead_b));
        let x1 = mapper.point_to_screen(DrawingPoint::new(t1, 100.0)).x;
        let x2 = mapper.point_to_screen(DrawingPoint::new(t2, 100.0)).x;
        prop_assert!(x1 < x2);
    }

    #[test]
    fn undo_then_redo_restores_both_ends(prices in prop::collection::vec(1.0f64..500.0, 1..50)) {
        let mut set = DrawingSet::new();
        let mut history = History::new(50);
        let initial = set.snapshot();

        for price in &prices {
            let drawing = Drawing::new(
                DrawingKind::HorizontalLine,
                vec![DrawingPoint::new(T0, *price)],
                DrawingProperties::default(),
            )
            .expect("drawing");
            history.push(set.snapshot());
            set.insert(drawing);
        }
        let last = set.snapshot();

        for _ in 0..prices.len() {
            let previous = history.undo(set.snapshot()).expect("undo");
            set.restore(previous);
        }
        prop_assert_eq!(set.snapshot(), initial);
        prop_assert!(history.undo(set.snapshot()).is_none());

        for _ in 0..prices.len() {
            let next = history.redo(set.snapshot()).expect("redo");
            set.restore(next);
        }
        prop_assert_eq!(set.snapshot(), last);
    }

    #[test]
    fn smoothing_keeps_endpoints_and_never_grows(
        raw in prop::collection::vec((0.0f64..1000.0, 0.0f64..1000.0), 2..120),
        iterations in 0u32..5,
        epsilon in 0.0f64..5.0,
    ) {
        let points: Vec<ScreenPoint> = raw.iter().map(|(x, y)| ScreenPoint::new(*x, *y)).collect();
        let out = smooth_stroke(&points, iterations, epsilon);
        prop_assert!(out.len() >= 2);
        prop_assert!(out.len() <= points.len());
        prop_assert_eq!(out[0], points[0]);
        prop_assert_eq!(out[out.len() - 1], points[points.len() - 1]);

        let simplified = simplify_rdp(&points, 0.0);
        prop_assert!(simplified.len() <= points.len());
    }

    #[test]
    fn controller_undo_redo_walks_every_committed_edit(script in edits()) {
        let (bars, index) = fixture(100);
        let surface = ViewportSurface::new(
            Viewport::new(1000, 500),
            TimeScale::new(0.0, 100.0).expect("time scale"),
            PriceScale::new(0.0, 200.0).expect("price scale"),
            &index,
        );
        let mapper = CoordinateMapper::new(&surface, &index, &bars);
        let mut controller = DrawingController::default();
        let mut states = vec![controller.drawings().snapshot()];

        for edit in &script {
            match edit {
                Edit::Create(row) => {
                    let pos = ScreenPoint::new(300.0, row_y(*row));
                    controller.set_tool(Tool::Draw(DrawingKind::HorizontalLine));
                    controller.pointer_down(pos, &mapper);
                    controller.pointer_up(pos, &mapper);
                }
                Edit::Drag(row, dy) => {
                    controller.set_tool(Tool::Cross);
                    let from = ScreenPoint::new(600.0, row_y(*row));
                    let to = from.offset(0.0, *dy);
                    controller.pointer_down(from, &mapper);
                    controller.pointer_move(to, &mapper);
                    controller.pointer_up(to, &mapper);
                }
                Edit::ToggleLock(n) => {
                    if let Some(id) = nth_id(&controller, *n) {
                        let locked = controller.drawings().get(&id).expect("drawing").is_locked();
                        controller.set_locked(&id, !locked);
                    }
                }
                Edit::Delete(n) => {
                    if let Some(id) = nth_id(&controller, *n) {
                        controller.delete(&id);
                    }
                }
            }
            let current = controller.drawings().snapshot();
            if states.last() != Some(&current) {
                states.push(current);
            }
        }

        let committed = states.len() - 1;
        for step in 1..=committed {
            prop_assert!(controller.undo());
            prop_assert_eq!(&controller.drawings().snapshot(), &states[committed - step]);
        }
        prop_assert!(!controller.can_undo());

        for step in 1..=committed {
            prop_assert!(controller.redo());
            prop_assert_eq!(&controller.drawings().snapshot(), &states[step]);
        }
        prop_assert!(!controller.can_redo());
    }
}
