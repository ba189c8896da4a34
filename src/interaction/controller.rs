use std::borrow::Cow;

use tracing::{debug, warn};

use crate::api::coordinate_mapper::{ChartSurface, CoordinateMapper};
use crate::core::ScreenPoint;
use crate::drawing::{
    Drawing, DrawingHit, DrawingId, DrawingKind, DrawingPoint, DrawingProperties, DrawingSet,
    DrawingSnapshot, FolderId, HitOptions, HitTarget, History, PointArity, hit_test_drawings,
    smooth_stroke,
};
use crate::error::ChartResult;
use crate::interaction::{Gesture, InteractionPhase, InteractionState, Tool};

/// Tunables of the drawing state machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControllerOptions {
    pub hit: HitOptions,
    pub history_limit: usize,
    pub brush_min_distance_px: f64,
    pub brush_smoothing_iterations: u32,
    pub brush_simplify_epsilon: f64,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            hit: HitOptions::default(),
            history_limit: crate::drawing::DEFAULT_HISTORY_LIMIT,
            brush_min_distance_px: 3.0,
            brush_smoothing_iterations: 2,
            brush_simplify_epsilon: 0.0,
        }
    }
}

/// Owns one chart's durable drawings, their undo history, selection, the
/// active tool and the transient interaction state.
#[derive(Debug, Clone)]
pub struct DrawingController {
    drawings: DrawingSet,
    history: History<DrawingSnapshot>,
    selected: Option<DrawingId>,
    tool: Tool,
    defaults: DrawingProperties,
    state: InteractionState,
    options: ControllerOptions,
}

impl Default for DrawingController {
    fn default() -> Self {
        Self::new(ControllerOptions::default())
    }
}

impl DrawingController {
    #[must_use]
    pub fn new(options: ControllerOptions) -> Self {
        Self {
            drawings: DrawingSet::new(),
            history: History::new(options.history_limit),
            selected: None,
            tool: Tool::Cross,
            defaults: DrawingProperties::default(),
            state: InteractionState::default(),
            options,
        }
    }

    /// Durable drawings; what persistence stores.
    #[must_use]
    pub fn drawings(&self) -> &DrawingSet {
        &self.drawings
    }

    /// Drawings as they should be painted right now: durable drawings with
    /// live drag points applied, plus the creation preview on top.
    #[must_use]
    pub fn render_drawings(&self) -> Vec<Cow<'_, Drawing>> {
        let mut out: Vec<Cow<'_, Drawing>> = self
            .drawings
            .iter()
            .map(|drawing| match self.state.live_points(&drawing.id) {
                Some(live) => {
                    let mut moved = drawing.clone();
                    moved.points = live.to_vec();
                    Cow::Owned(moved)
                }
                None => Cow::Borrowed(drawing),
            })
            .collect();
        if let Some(preview) = self.preview_drawing() {
            out.push(Cow::Owned(preview));
        }
        out
    }

    fn preview_drawing(&self) -> Option<Drawing> {
        let Gesture::Creating {
            kind,
            points,
            preview,
            ..
        } = &self.state.gesture
        else {
            return None;
        };
        let mut all = points.clone();
        all.extend(preview.iter().copied());
        if all.is_empty() {
            return None;
        }
        Some(Drawing {
            id: DrawingId::from("preview"),
            kind: *kind,
            points: all,
            properties: self.defaults.clone(),
            folder_id: None,
        })
    }

    #[must_use]
    pub fn state(&self) -> &InteractionState {
        &self.state
    }

    #[must_use]
    pub fn phase(&self) -> InteractionPhase {
        self.state.phase()
    }

    #[must_use]
    pub fn tool(&self) -> Tool {
        self.tool
    }

    /// Switches tools, discarding any gesture in progress.
    pub fn set_tool(&mut self, tool: Tool) {
        if self.tool != tool {
            debug!(?tool, "tool changed");
        }
        self.state.reset();
        self.tool = tool;
    }

    #[must_use]
    pub fn selected(&self) -> Option<&DrawingId> {
        self.selected.as_ref()
    }

    pub fn select(&mut self, id: Option<DrawingId>) {
        self.selected = id.filter(|id| self.drawings.get(id).is_some());
    }

    #[must_use]
    pub fn defaults(&self) -> &DrawingProperties {
        &self.defaults
    }

    pub fn set_defaults(&mut self, defaults: DrawingProperties) {
        self.defaults = defaults;
    }

    #[must_use]
    pub fn options(&self) -> ControllerOptions {
        self.options
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// What lies under `pos`, with the selected drawing's handles first.
    #[must_use]
    pub fn hit_at<S: ChartSurface + ?Sized>(
        &self,
        pos: ScreenPoint,
        mapper: &CoordinateMapper<'_, S>,
    ) -> Option<DrawingHit> {
        hit_test_drawings(
            self.drawings.iter(),
            self.selected.as_ref(),
            pos,
            mapper,
            &mapper.scene_context(),
            self.options.hit,
            |_| true,
        )
    }

    /// Handles a button press. Returns `true` when the overlay needs a
    /// repaint.
    pub fn pointer_down<S: ChartSurface + ?Sized>(
        &mut self,
        pos: ScreenPoint,
        mapper: &CoordinateMapper<'_, S>,
    ) -> bool {
        self.state.set_cursor(pos);
        match self.tool {
            Tool::Draw(kind) => self.creation_press(kind, pos, mapper),
            Tool::Eraser => {
                self.state.gesture = Gesture::Erasing {
                    history_pushed: false,
                };
                self.erase_at(pos, mapper);
                true
            }
            Tool::Cross => self.select_press(pos, mapper),
        }
    }

    pub fn pointer_move<S: ChartSurface + ?Sized>(
        &mut self,
        pos: ScreenPoint,
        mapper: &CoordinateMapper<'_, S>,
    ) -> bool {
        self.state.set_cursor(pos);
        let min_distance = self.options.brush_min_distance_px;
        match &mut self.state.gesture {
            Gesture::Idle => false,
            Gesture::Creating {
                kind: DrawingKind::Brush,
                points,
                stroke,
                ..
            } => {
                if stroke.is_empty() {
                    return false;
                }
                let far_enough = stroke
                    .last()
                    .is_none_or(|last| last.distance_to(pos) >= min_distance);
                if !far_enough {
                    return false;
                }
                match mapper.screen_to_point(pos, false) {
                    Some(point) => {
                        stroke.push(pos);
                        points.push(point);
                        true
                    }
                    None => false,
                }
            }
            Gesture::Creating { preview, .. } => {
                *preview = mapper.screen_to_point(pos, true);
                true
            }
            Gesture::DraggingHandle { index, live, .. } => {
                match (mapper.screen_to_point(pos, true), live.get_mut(*index)) {
                    (Some(point), Some(slot)) => {
                        *slot = point;
                        true
                    }
                    _ => false,
                }
            }
            Gesture::DraggingBody {
                origin,
                original,
                live,
                ..
            } => {
                let (dx, dy) = (pos.x - origin.x, pos.y - origin.y);
                *live = original
                    .iter()
                    .map(|point| translate(*point, dx, dy, mapper))
                    .collect();
                true
            }
            Gesture::Erasing { .. } => self.erase_at(pos, mapper),
        }
    }

    pub fn pointer_up<S: ChartSurface + ?Sized>(
        &mut self,
        pos: ScreenPoint,
        mapper: &CoordinateMapper<'_, S>,
    ) -> bool {
        self.state.set_cursor(pos);
        match std::mem::replace(&mut self.state.gesture, Gesture::Idle) {
            Gesture::Idle => false,
            Gesture::Creating {
                kind: DrawingKind::Brush,
                stroke,
                ..
            } => {
                self.finish_brush(&stroke, mapper);
                true
            }
            creating @ Gesture::Creating { .. } => {
                self.state.gesture = creating;
                false
            }
            Gesture::DraggingHandle {
                id, original, live, ..
            }
            | Gesture::DraggingBody {
                id, original, live, ..
            } => {
                if live != original {
                    let before = self.drawings.snapshot();
                    if self.drawings.set_points(&id, live) {
                        self.history.push(before);
                        debug!(id = id.as_str(), "drag committed");
                    }
                }
                true
            }
            Gesture::Erasing { .. } => false,
        }
    }

    /// Aborts the gesture in progress; nothing is committed.
    pub fn cancel(&mut self) {
        self.state.reset();
    }

    fn creation_press<S: ChartSurface + ?Sized>(
        &mut self,
        kind: DrawingKind,
        pos: ScreenPoint,
        mapper: &CoordinateMapper<'_, S>,
    ) -> bool {
        if kind.arity() == PointArity::AtLeast(2) {
            let Some(point) = mapper.screen_to_point(pos, false) else {
                return false;
            };
            self.state.gesture = Gesture::Creating {
                kind,
                points: vec![point],
                preview: None,
                stroke: vec![pos],
            };
            return true;
        }

        let Some(point) = mapper.screen_to_point(pos, true) else {
            return false;
        };
        let required = kind.arity().min();
        let mut points = match std::mem::replace(&mut self.state.gesture, Gesture::Idle) {
            Gesture::Creating {
                kind: current,
                points,
                ..
            } if current == kind => points,
            _ => Vec::with_capacity(required),
        };
        points.push(point);

        if points.len() >= required {
            self.commit_new(kind, points);
        } else {
            self.state.gesture = Gesture::Creating {
                kind,
                points,
                preview: Some(point),
                stroke: Vec::new(),
            };
        }
        true
    }

    fn finish_brush<S: ChartSurface + ?Sized>(
        &mut self,
        stroke: &[ScreenPoint],
        mapper: &CoordinateMapper<'_, S>,
    ) {
        let smoothed = smooth_stroke(
            stroke,
            self.options.brush_smoothing_iterations,
            self.options.brush_simplify_epsilon,
        );
        let points: Vec<DrawingPoint> = smoothed
            .into_iter()
            .filter_map(|px| mapper.screen_to_point(px, false))
            .collect();
        if points.len() < 2 {
            debug!(samples = stroke.len(), "brush stroke too short, discarded");
            return;
        }
        self.commit_new(DrawingKind::Brush, points);
    }

    fn commit_new(&mut self, kind: DrawingKind, points: Vec<DrawingPoint>) {
        let mut properties = self.defaults.clone();
        if kind == DrawingKind::Brush {
            properties.smoothing = Some(self.options.brush_smoothing_iterations);
        }
        match Drawing::new(kind, points, properties) {
            Ok(drawing) => {
                self.history.push(self.drawings.snapshot());
                self.selected = Some(drawing.id.clone());
                self.drawings.insert(drawing);
                self.state.reset();
                self.tool = Tool::Cross;
            }
            Err(err) => {
                warn!(error = %err, ?kind, "discarding invalid drawing");
                self.state.reset();
            }
        }
    }

    fn select_press<S: ChartSurface + ?Sized>(
        &mut self,
        pos: ScreenPoint,
        mapper: &CoordinateMapper<'_, S>,
    ) -> bool {
        let previous = self.selected.clone();
        let Some(hit) = self.hit_at(pos, mapper) else {
            self.selected = None;
            return previous.is_some();
        };
        self.selected = Some(hit.id.clone());
        let Some(drawing) = self.drawings.get(&hit.id) else {
            return true;
        };
        if drawing.is_locked() {
            return true;
        }
        let original = drawing.points.clone();
        self.state.gesture = match hit.target {
            HitTarget::Handle(index) => Gesture::DraggingHandle {
                id: hit.id,
                index,
                live: original.clone(),
                original,
            },
            HitTarget::Body => Gesture::DraggingBody {
                id: hit.id,
                origin: pos,
                live: original.clone(),
                original,
            },
        };
        true
    }

    /// Deletes the topmost unlocked drawing under `pos`. History is pushed
    /// once per eraser gesture.
    fn erase_at<S: ChartSurface + ?Sized>(
        &mut self,
        pos: ScreenPoint,
        mapper: &CoordinateMapper<'_, S>,
    ) -> bool {
        let hit = hit_test_drawings(
            self.drawings.iter(),
            None,
            pos,
            mapper,
            &mapper.scene_context(),
            self.options.hit,
            |d| !d.is_locked(),
        );
        let Some(hit) = hit else {
            return false;
        };
        if let Gesture::Erasing { history_pushed } = &mut self.state.gesture {
            if !*history_pushed {
                self.history.push(self.drawings.snapshot());
                *history_pushed = true;
            }
        }
        self.drawings.remove(&hit.id);
        if self.selected.as_ref() == Some(&hit.id) {
            self.selected = None;
        }
        true
    }

    /// Runs `edit` against the durable set, pushing one history snapshot if
    /// it reports a change.
    fn edit(&mut self, edit: impl FnOnce(&mut DrawingSet) -> bool) -> bool {
        let before = self.drawings.snapshot();
        let changed = edit(&mut self.drawings);
        if changed {
            self.history.push(before);
            self.state.reset();
        }
        changed
    }

    fn is_locked(&self, id: &DrawingId) -> bool {
        self.drawings.get(id).is_some_and(Drawing::is_locked)
    }

    /// Deletes the selected drawing unless it is locked.
    pub fn delete_selected(&mut self) -> bool {
        match self.selected.clone() {
            Some(id) => self.delete(&id),
            None => false,
        }
    }

    pub fn delete(&mut self, id: &DrawingId) -> bool {
        if self.is_locked(id) {
            return false;
        }
        let removed = self.edit(|set| set.remove(id).is_some());
        if removed && self.selected.as_ref() == Some(id) {
            self.selected = None;
        }
        removed
    }

    pub fn clear_all(&mut self) -> bool {
        let cleared = self.edit(|set| {
            let had_content = !set.is_empty() || set.folders().next().is_some();
            set.clear();
            had_content
        });
        if cleared {
            self.selected = None;
            debug!("all drawings cleared");
        }
        cleared
    }

    pub fn set_visible(&mut self, id: &DrawingId, visible: bool) -> bool {
        if self.drawings.get(id).is_none_or(|d| d.is_visible() == visible) {
            return false;
        }
        self.edit(|set| set.set_visible(id, visible))
    }

    pub fn set_locked(&mut self, id: &DrawingId, locked: bool) -> bool {
        if self.drawings.get(id).is_none_or(|d| d.is_locked() == locked) {
            return false;
        }
        self.edit(|set| set.set_locked(id, locked))
    }

    pub fn update_properties(&mut self, id: &DrawingId, properties: DrawingProperties) -> bool {
        if self
            .drawings
            .get(id)
            .is_none_or(|d| d.properties == properties)
        {
            return false;
        }
        self.edit(|set| set.set_properties(id, properties))
    }

    pub fn move_to_folder(&mut self, id: &DrawingId, folder: Option<FolderId>) -> bool {
        if self
            .drawings
            .get(id)
            .is_none_or(|d| d.folder_id == folder)
        {
            return false;
        }
        self.edit(|set| set.move_to_folder(id, folder))
    }

    pub fn reorder_panel(&mut self, from: usize, to: usize) -> bool {
        if from == to {
            return false;
        }
        self.edit(|set| set.reorder_panel(from, to))
    }

    pub fn create_folder(&mut self, name: impl Into<String>) -> FolderId {
        let before = self.drawings.snapshot();
        let id = self.drawings.create_folder(name);
        self.history.push(before);
        id
    }

    pub fn rename_folder(&mut self, id: &FolderId, name: impl Into<String>) -> bool {
        let name = name.into();
        if self.drawings.folder(id).is_none_or(|f| f.name == name) {
            return false;
        }
        self.edit(|set| set.rename_folder(id, name))
    }

    /// Expand/collapse is view state and bypasses history.
    pub fn toggle_folder(&mut self, id: &FolderId) -> bool {
        self.drawings.toggle_folder(id)
    }

    pub fn delete_folder(&mut self, id: &FolderId) -> bool {
        self.edit(|set| set.delete_folder(id))
    }

    pub fn undo(&mut self) -> bool {
        let Some(previous) = self.history.undo(self.drawings.snapshot()) else {
            return false;
        };
        self.restore_from_history(previous);
        debug!(depth = self.history.undo_depth(), "undo");
        true
    }

    pub fn redo(&mut self) -> bool {
        let Some(next) = self.history.redo(self.drawings.snapshot()) else {
            return false;
        };
        self.restore_from_history(next);
        debug!(depth = self.history.undo_depth(), "redo");
        true
    }

    fn restore_from_history(&mut self, snapshot: DrawingSnapshot) {
        self.drawings.restore(snapshot);
        self.state.reset();
        if let Some(id) = &self.selected {
            if self.drawings.get(id).is_none() {
                self.selected = None;
            }
        }
    }

    /// Replaces all drawings with persisted state, clearing history.
    pub fn load(&mut self, snapshot: DrawingSnapshot) -> ChartResult<()> {
        self.drawings = DrawingSet::from_snapshot(snapshot)?;
        self.history.clear();
        self.selected = None;
        self.state.reset();
        Ok(())
    }
}

/// Moves `point` by a pixel delta through the inverse mapping. Points that
/// cannot be resolved stay where they are.
fn translate<S: ChartSurface + ?Sized>(
    point: DrawingPoint,
    dx: f64,
    dy: f64,
    mapper: &CoordinateMapper<'_, S>,
) -> DrawingPoint {
    let screen = mapper.point_to_screen(point);
    if !screen.is_resolved() {
        return point;
    }
    mapper
        .screen_to_point(screen.offset(dx, dy), false)
        .unwrap_or(point)
}
