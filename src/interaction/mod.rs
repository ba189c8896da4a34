//! Pointer-driven drawing interaction.
//!
//! State lives in two tiers. [`InteractionState`] is transient: creation
//! previews and live drag points, updated every pointer move, never
//! persisted. The durable [`DrawingSet`](crate::drawing::DrawingSet) owned by
//! [`DrawingController`] changes only when a gesture commits.

mod controller;

pub use controller::{ControllerOptions, DrawingController};

use serde::{Deserialize, Serialize};

use crate::core::ScreenPoint;
use crate::drawing::{DrawingId, DrawingKind, DrawingPoint};

/// Active pointer tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "tool", content = "kind")]
pub enum Tool {
    #[default]
    Cross,
    Eraser,
    Draw(DrawingKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InteractionPhase {
    Idle,
    Creating,
    DraggingHandle,
    DraggingBody,
    Erasing,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Gesture {
    Idle,
    Creating {
        kind: DrawingKind,
        points: Vec<DrawingPoint>,
        preview: Option<DrawingPoint>,
        /// Raw pixel samples of a brush stroke.
        stroke: Vec<ScreenPoint>,
    },
    DraggingHandle {
        id: DrawingId,
        index: usize,
        original: Vec<DrawingPoint>,
        live: Vec<DrawingPoint>,
    },
    DraggingBody {
        id: DrawingId,
        origin: ScreenPoint,
        original: Vec<DrawingPoint>,
        live: Vec<DrawingPoint>,
    },
    Erasing {
        history_pushed: bool,
    },
}

/// Transient per-frame interaction state.
#[derive(Debug, Clone, PartialEq)]
pub struct InteractionState {
    pub(crate) gesture: Gesture,
    cursor: Option<ScreenPoint>,
}

impl Default for InteractionState {
    fn default() -> Self {
        Self {
            gesture: Gesture::Idle,
            cursor: None,
        }
    }
}

impl InteractionState {
    #[must_use]
    pub fn phase(&self) -> InteractionPhase {
        match self.gesture {
            Gesture::Idle => InteractionPhase::Idle,
            Gesture::Creating { .. } => InteractionPhase::Creating,
            Gesture::DraggingHandle { .. } => InteractionPhase::DraggingHandle,
            Gesture::DraggingBody { .. } => InteractionPhase::DraggingBody,
            Gesture::Erasing { .. } => InteractionPhase::Erasing,
        }
    }

    #[must_use]
    pub fn cursor(&self) -> Option<ScreenPoint> {
        self.cursor
    }

    pub(crate) fn set_cursor(&mut self, pos: ScreenPoint) {
        self.cursor = Some(pos);
    }

    pub fn on_pointer_leave(&mut self) {
        self.cursor = None;
    }

    /// Live points of the drawing being dragged, if `id` is being dragged.
    #[must_use]
    pub fn live_points(&self, id: &DrawingId) -> Option<&[DrawingPoint]> {
        match &self.gesture {
            Gesture::DraggingHandle { id: drag_id, live, .. }
            | Gesture::DraggingBody { id: drag_id, live, .. }
                if drag_id == id =>
            {
                Some(live)
            }
            _ => None,
        }
    }

    /// Discards any gesture in progress.
    pub fn reset(&mut self) {
        self.gesture = Gesture::Idle;
    }
}
