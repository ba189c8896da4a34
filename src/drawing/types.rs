use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::{ChartError, ChartResult};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn next_id(prefix: &str) -> String {
    let seq = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    let millis = chrono::Utc::now().timestamp_millis();
    format!("{prefix}-{millis:x}-{seq}")
}

/// Unique drawing identifier. Persisted ids are kept verbatim on load.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DrawingId(String);

impl DrawingId {
    #[must_use]
    pub fn generate() -> Self {
        Self(next_id("d"))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DrawingId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FolderId(String);

impl FolderId {
    #[must_use]
    pub fn generate() -> Self {
        Self(next_id("f"))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for FolderId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// Anchor in (time, price) space, independent of pixel geometry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DrawingPoint {
    /// Epoch milliseconds.
    pub time: i64,
    pub price: f64,
}

impl DrawingPoint {
    #[must_use]
    pub const fn new(time: i64, price: f64) -> Self {
        Self { time, price }
    }
}

/// Drawing primitive kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DrawingKind {
    Text,
    HorizontalLine,
    VerticalLine,
    HorizontalRay,
    TrendLine,
    Ray,
    ExtendedLine,
    Arrow,
    Rectangle,
    Circle,
    Measure,
    DateRange,
    PriceRange,
    FibRetracement,
    Triangle,
    RotatedRectangle,
    ParallelChannel,
    Brush,
}

/// Number of points a kind carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointArity {
    Fixed(usize),
    AtLeast(usize),
}

impl PointArity {
    #[must_use]
    pub fn accepts(self, count: usize) -> bool {
        match self {
            PointArity::Fixed(n) => count == n,
            PointArity::AtLeast(n) => count >= n,
        }
    }

    #[must_use]
    pub fn min(self) -> usize {
        match self {
            PointArity::Fixed(n) | PointArity::AtLeast(n) => n,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineStyle {
    #[default]
    Solid,
    Dashed,
    Dotted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

/// Style and state flags of a drawing. Colors are CSS hex strings
/// (`#rrggbb` or `#rrggbbaa`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawingProperties {
    pub color: String,
    pub line_width: f64,
    #[serde(default)]
    pub line_style: LineStyle,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_align: Option<TextAlign>,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default)]
    pub locked: bool,
    /// Moving-average passes applied to brush strokes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smoothing: Option<u32>,
}

fn default_true() -> bool {
    true
}

pub const DEFAULT_FONT_SIZE: f64 = 14.0;

impl Default for DrawingProperties {
    fn default() -> Self {
        Self {
            color: "#2962ff".to_owned(),
            line_width: 2.0,
            line_style: LineStyle::Solid,
            filled: None,
            background_color: None,
            text: None,
            font_size: None,
            text_align: None,
            visible: true,
            locked: false,
            smoothing: None,
        }
    }
}

impl DrawingProperties {
    #[must_use]
    pub fn is_filled(&self) -> bool {
        self.filled.unwrap_or(false)
    }

    #[must_use]
    pub fn font_size_or_default(&self) -> f64 {
        self.font_size
            .filter(|size| size.is_finite() && *size > 0.0)
            .unwrap_or(DEFAULT_FONT_SIZE)
    }
}

/// One annotation on a chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Drawing {
    pub id: DrawingId,
    #[serde(rename = "type")]
    pub kind: DrawingKind,
    pub points: Vec<DrawingPoint>,
    pub properties: DrawingProperties,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<FolderId>,
}

impl Drawing {
    /// Builds a drawing with a fresh id, checking the point count against the
    /// kind's arity.
    pub fn new(
        kind: DrawingKind,
        points: Vec<DrawingPoint>,
        properties: DrawingProperties,
    ) -> ChartResult<Self> {
        let drawing = Self {
            id: DrawingId::generate(),
            kind,
            points,
            properties,
            folder_id: None,
        };
        drawing.validate()?;
        Ok(drawing)
    }

    pub fn validate(&self) -> ChartResult<()> {
        if !self.kind.arity().accepts(self.points.len()) {
            return Err(ChartError::InvalidData(format!(
                "{:?} does not accept {} points",
                self.kind,
                self.points.len()
            )));
        }
        if self.points.iter().any(|p| !p.price.is_finite()) {
            return Err(ChartError::InvalidData(
                "drawing prices must be finite".to_owned(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.properties.visible
    }

    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.properties.locked
    }
}

/// Non-nesting grouping bucket for drawings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    pub id: FolderId,
    pub name: String,
    #[serde(default = "default_true")]
    pub is_expanded: bool,
}

impl Folder {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: FolderId::generate(),
            name: name.into(),
            is_expanded: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Drawing, DrawingId, DrawingKind, DrawingPoint, DrawingProperties};

    #[test]
    fn generated_ids_are_unique() {
        assert_ne!(DrawingId::generate(), DrawingId::generate());
    }

    #[test]
    fn arity_is_enforced() {
        let p = DrawingPoint::new(1_000, 1.0);
        assert!(Drawing::new(DrawingKind::Rectangle, vec![p], DrawingProperties::default()).is_err());
        assert!(
            Drawing::new(DrawingKind::Rectangle, vec![p, p], DrawingProperties::default()).is_ok()
        );
        assert!(
            Drawing::new(DrawingKind::Brush, vec![p, p, p, p], DrawingProperties::default())
                .is_ok()
        );
    }

    #[test]
    fn serializes_with_wire_names() {
        let drawing = Drawing::new(
            DrawingKind::HorizontalRay,
            vec![DrawingPoint::new(1_000, 1.5)],
            DrawingProperties::default(),
        )
        .expect("drawing");
        let json = serde_json::to_value(&drawing).expect("json");
        assert_eq!(json["type"], "horizontal-ray");
        assert_eq!(json["properties"]["lineWidth"], 2.0);
        assert_eq!(json["properties"]["visible"], true);
        assert!(json.get("folderId").is_none());
    }
}
