use chart_workspace::api::{CoordinateMapper, ViewportSurface};
use chart_workspace::core::{OhlcvBar, PriceScale, ScreenPoint, TimeIndex, TimeScale, Viewport};
use chart_workspace::drawing::{DrawingKind, PanelRow};
use chart_workspace::interaction::{DrawingController, InteractionPhase, Tool};

const T0: i64 = 1_704_067_200_000;
const MINUTE: i64 = 60_000;

struct Chart {
    bars: Vec<OhlcvBar>,
    index: TimeIndex,
}

impl Chart {
    fn new() -> Self {
        let bars: Vec<OhlcvBar> = (0..100)
            .map(|i| OhlcvBar::raw(T0 + i * MINUTE, 100.0, 110.0, 90.0, 105.0, 1.0))
            .collect();
        let index = TimeIndex::from_bars(&bars, MINUTE);
        Self { bars, index }
    }

    fn surface(&self) -> ViewportSurface<'_> {
        ViewportSurface::new(
            Viewport::new(1000, 500),
            TimeScale::new(0.0, 100.0).expect("time scale"),
            PriceScale::new(0.0, 200.0).expect("price scale"),
            &self.index,
        )
    }
}

fn click(
    controller: &mut DrawingController,
    mapper: &CoordinateMapper<'_, ViewportSurface<'_>>,
    x: f64,
    y: f64,
) {
    let pos = ScreenPoint::new(x, y);
    controller.pointer_down(pos, mapper);
    controller.pointer_up(pos, mapper);
}

fn drag(
    controller: &mut DrawingController,
    mapper: &CoordinateMapper<'_, ViewportSurface<'_>>,
    from: (f64, f64),
    to: (f64, f64),
) {
    controller.pointer_down(ScreenPoint::new(from.0, from.1), mapper);
    controller.pointer_move(ScreenPoint::new(to.0, to.1), mapper);
    controller.pointer_up(ScreenPoint::new(to.0, to.1), mapper);
}

#[test]
fn rectangle_completes_after_two_clicks() {
    let chart = Chart::new();
    let surface = chart.surface();
    let mapper = CoordinateMapper::new(&surface, &chart.index, &chart.bars);
    let mut controller = DrawingController::default();

    controller.set_tool(Tool::Draw(DrawingKind::Rectangle));
    click(&mut controller, &mapper, 200.0, 100.0);
    assert!(controller.drawings().is_empty());
    assert_eq!(controller.phase(), InteractionPhase::Creating);

    click(&mut controller, &mapper, 400.0, 300.0);
    assert_eq!(controller.drawings().len(), 1);
    let rectangle = controller.drawings().iter().next().expect("rectangle");
    assert_eq!(rectangle.kind, DrawingKind::Rectangle);
    assert_eq!(rectangle.points.len(), 2);
    assert_eq!(controller.tool(), Tool::Cross);
    assert_eq!(controller.selected(), Some(&rectangle.id));
    assert!(controller.can_undo());
}

#[test]
fn locked_drawing_cannot_be_dragged() {
    let chart = Chart::new();
    let surface = chart.surface();
    let mapper = CoordinateMapper::new(&surface, &chart.index, &chart.bars);
    let mut controller = DrawingController::default();

    controller.set_tool(Tool::Draw(DrawingKind::TrendLine));
    click(&mut controller, &mapper, 100.0, 100.0);
    click(&mut controller, &mapper, 300.0, 300.0);
    let id = controller.selected().cloned().expect("selected");
    assert!(controller.set_locked(&id, true));
    let points = controller.drawings().get(&id).expect("line").points.clone();

    drag(&mut controller, &mapper, (200.0, 200.0), (260.0, 240.0));
    drag(&mut controller, &mapper, (300.0, 300.0), (350.0, 350.0));
    assert_eq!(controller.drawings().get(&id).expect("line").points, points);
    assert_eq!(controller.phase(), InteractionPhase::Idle);

    // Still selectable; one undo reverts only the lock.
    assert_eq!(controller.selected(), Some(&id));
    assert!(controller.undo());
    assert!(!controller.drawings().get(&id).expect("line").is_locked());
}

#[test]
fn locked_drawing_survives_delete_selected() {
    let chart = Chart::new();
    let surface = chart.surface();
    let mapper = CoordinateMapper::new(&surface, &chart.index, &chart.bars);
    let mut controller = DrawingController::default();

    controller.set_tool(Tool::Draw(DrawingKind::HorizontalLine));
    click(&mut controller, &mapper, 100.0, 250.0);
    let id = controller.selected().cloned().expect("selected");
    controller.set_locked(&id, true);
    assert!(!controller.delete_selected());
    assert_eq!(controller.drawings().len(), 1);

    controller.set_locked(&id, false);
    assert!(controller.delete_selected());
    assert!(controller.drawings().is_empty());
    assert!(controller.selected().is_none());
}

#[test]
fn topmost_drawing_wins_the_hit() {
    let chart = Chart::new();
    let surface = chart.surface();
    let mapper = CoordinateMapper::new(&surface, &chart.index, &chart.bars);
    let mut controller = DrawingController::default();

    for _ in 0..2 {
        controller.set_tool(Tool::Draw(DrawingKind::HorizontalLine));
        click(&mut controller, &mapper, 100.0, 250.0);
    }
    let top = controller.drawings().iter().last().expect("top").id.clone();
    controller.select(None);
    let hit = controller
        .hit_at(ScreenPoint::new(600.0, 252.0), &mapper)
        .expect("hit");
    assert_eq!(hit.id, top);
}

#[test]
fn panel_actions_are_undoable() {
    let chart = Chart::new();
    let surface = chart.surface();
    let mapper = CoordinateMapper::new(&surface, &chart.index, &chart.bars);
    let mut controller = DrawingController::default();

    for y in [100.0, 200.0, 300.0] {
        controller.set_tool(Tool::Draw(DrawingKind::HorizontalLine));
        click(&mut controller, &mapper, 100.0, y);
    }
    let folder = controller.create_folder("levels");
    let bottom = controller.drawings().iter().next().expect("bottom").id.clone();
    assert!(controller.move_to_folder(&bottom, Some(folder.clone())));
    assert!(controller.reorder_panel(2, 0));
    assert_eq!(controller.drawings().z_index(&bottom), Some(2));

    let rows = controller.drawings().panel_rows();
    assert!(matches!(rows[0], PanelRow::Folder { .. }));
    assert!(matches!(&rows[1], PanelRow::Drawing { id, .. } if *id == bottom));

    assert!(controller.undo());
    assert_eq!(controller.drawings().z_index(&bottom), Some(0));
    assert!(controller.undo());
    assert!(controller.drawings().get(&bottom).expect("drawing").folder_id.is_none());

    assert!(controller.delete_folder(&folder));
    assert!(controller.clear_all());
    assert!(controller.drawings().is_empty());
    assert!(controller.undo());
    assert_eq!(controller.drawings().len(), 3);
}

#[test]
fn escape_cancels_creation_without_commit() {
    let chart = Chart::new();
    let surface = chart.surface();
    let mapper = CoordinateMapper::new(&surface, &chart.index, &chart.bars);
    let mut controller = DrawingController::default();

    controller.set_tool(Tool::Draw(DrawingKind::Triangle));
    click(&mut controller, &mapper, 100.0, 100.0);
    click(&mut controller, &mapper, 200.0, 100.0);
    controller.cancel();
    assert_eq!(controller.phase(), InteractionPhase::Idle);
    assert!(controller.drawings().is_empty());
    assert!(!controller.can_undo());
    assert_eq!(controller.tool(), Tool::Draw(DrawingKind::Triangle));
}
