use crate::core::ScreenPoint;
use crate::drawing::LineStyle;
use crate::error::{ChartError, ChartResult};

/// RGBA color in normalized 0..=1 channel values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
    pub alpha: f64,
}

impl Color {
    #[must_use]
    pub const fn rgba(red: f64, green: f64, blue: f64, alpha: f64) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    #[must_use]
    pub const fn rgb(red: f64, green: f64, blue: f64) -> Self {
        Self::rgba(red, green, blue, 1.0)
    }

    pub const TRANSPARENT: Self = Self::rgba(0.0, 0.0, 0.0, 0.0);
    pub const WHITE: Self = Self::rgb(1.0, 1.0, 1.0);

    /// Parses `#rgb`, `#rrggbb` or `#rrggbbaa`.
    pub fn from_hex(value: &str) -> ChartResult<Self> {
        let invalid = || ChartError::InvalidData(format!("invalid hex color `{value}`"));
        let digits = value.strip_prefix('#').ok_or_else(invalid)?;
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&digits[range], 16)
                .map(|v| f64::from(v) / 255.0)
                .map_err(|_| invalid())
        };
        match digits.len() {
            3 => {
                let short = |i: usize| {
                    u8::from_str_radix(&digits[i..=i], 16)
                        .map(|v| f64::from(v * 17) / 255.0)
                        .map_err(|_| invalid())
                };
                Ok(Self::rgb(short(0)?, short(1)?, short(2)?))
            }
            6 => Ok(Self::rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?)),
            8 => Ok(Self::rgba(
                channel(0..2)?,
                channel(2..4)?,
                channel(4..6)?,
                channel(6..8)?,
            )),
            _ => Err(invalid()),
        }
    }

    #[must_use]
    pub fn with_alpha(self, alpha: f64) -> Self {
        Self { alpha, ..self }
    }

    pub fn validate(self) -> ChartResult<()> {
        for (channel, value) in [
            ("red", self.red),
            ("green", self.green),
            ("blue", self.blue),
            ("alpha", self.alpha),
        ] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(ChartError::InvalidData(format!(
                    "color channel `{channel}` must be finite and in [0, 1]"
                )));
            }
        }
        Ok(())
    }
}

/// Dash pattern of a stroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StrokeDash {
    #[default]
    Solid,
    Dashed,
    Dotted,
}

impl StrokeDash {
    /// On/off lengths in pixels, scaled by stroke width.
    #[must_use]
    pub fn pattern(self, stroke_width: f64) -> Option<[f64; 2]> {
        let w = stroke_width.max(1.0);
        match self {
            StrokeDash::Solid => None,
            StrokeDash::Dashed => Some([4.0 * w, 3.0 * w]),
            StrokeDash::Dotted => Some([w, 2.0 * w]),
        }
    }
}

impl From<LineStyle> for StrokeDash {
    fn from(style: LineStyle) -> Self {
        match style {
            LineStyle::Solid => StrokeDash::Solid,
            LineStyle::Dashed => StrokeDash::Dashed,
            LineStyle::Dotted => StrokeDash::Dotted,
        }
    }
}

/// Outline settings shared by stroked primitives.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stroke {
    pub width: f64,
    pub color: Color,
    pub dash: StrokeDash,
}

impl Stroke {
    #[must_use]
    pub const fn new(width: f64, color: Color, dash: StrokeDash) -> Self {
        Self { width, color, dash }
    }

    pub fn validate(self) -> ChartResult<()> {
        if !self.width.is_finite() || self.width <= 0.0 {
            return Err(ChartError::InvalidData(
                "stroke width must be finite and > 0".to_owned(),
            ));
        }
        self.color.validate()
    }
}

fn validate_points(points: &[ScreenPoint], what: &str) -> ChartResult<()> {
    if points.iter().any(|p| !p.is_resolved()) {
        return Err(ChartError::InvalidData(format!(
            "{what} coordinates must be finite"
        )));
    }
    Ok(())
}

/// Draw command for one line segment in pixel space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinePrimitive {
    pub from: ScreenPoint,
    pub to: ScreenPoint,
    pub stroke: Stroke,
}

impl LinePrimitive {
    #[must_use]
    pub const fn new(from: ScreenPoint, to: ScreenPoint, stroke: Stroke) -> Self {
        Self { from, to, stroke }
    }

    pub fn validate(self) -> ChartResult<()> {
        validate_points(&[self.from, self.to], "line")?;
        self.stroke.validate()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PolylinePrimitive {
    pub points: Vec<ScreenPoint>,
    pub stroke: Stroke,
}

impl PolylinePrimitive {
    pub fn validate(&self) -> ChartResult<()> {
        if self.points.len() < 2 {
            return Err(ChartError::InvalidData(
                "polyline needs at least two points".to_owned(),
            ));
        }
        validate_points(&self.points, "polyline")?;
        self.stroke.validate()
    }
}

/// Closed shape with optional fill and outline.
#[derive(Debug, Clone, PartialEq)]
pub struct PolygonPrimitive {
    pub points: Vec<ScreenPoint>,
    pub fill: Option<Color>,
    pub stroke: Option<Stroke>,
}

impl PolygonPrimitive {
    pub fn validate(&self) -> ChartResult<()> {
        if self.points.len() < 3 {
            return Err(ChartError::InvalidData(
                "polygon needs at least three points".to_owned(),
            ));
        }
        validate_points(&self.points, "polygon")?;
        if let Some(fill) = self.fill {
            fill.validate()?;
        }
        if let Some(stroke) = self.stroke {
            stroke.validate()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CirclePrimitive {
    pub center: ScreenPoint,
    pub radius: f64,
    pub fill: Option<Color>,
    pub stroke: Option<Stroke>,
}

impl CirclePrimitive {
    pub fn validate(self) -> ChartResult<()> {
        validate_points(&[self.center], "circle")?;
        if !self.radius.is_finite() || self.radius < 0.0 {
            return Err(ChartError::InvalidData(
                "circle radius must be finite and >= 0".to_owned(),
            ));
        }
        if let Some(fill) = self.fill {
            fill.validate()?;
        }
        if let Some(stroke) = self.stroke {
            stroke.validate()?;
        }
        Ok(())
    }
}

/// Axis-aligned rectangle, used for text backgrounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RectPrimitive {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub fill_color: Color,
    pub corner_radius: f64,
}

impl RectPrimitive {
    #[must_use]
    pub const fn new(x: f64, y: f64, width: f64, height: f64, fill_color: Color) -> Self {
        Self {
            x,
            y,
            width,
            height,
            fill_color,
            corner_radius: 0.0,
        }
    }

    #[must_use]
    pub const fn with_corner_radius(mut self, corner_radius: f64) -> Self {
        self.corner_radius = corner_radius;
        self
    }

    pub fn validate(self) -> ChartResult<()> {
        if ![self.x, self.y, self.width, self.height, self.corner_radius]
            .iter()
            .all(|v| v.is_finite())
        {
            return Err(ChartError::InvalidData(
                "rect geometry must be finite".to_owned(),
            ));
        }
        if self.width < 0.0 || self.height < 0.0 || self.corner_radius < 0.0 {
            return Err(ChartError::InvalidData(
                "rect size must be >= 0".to_owned(),
            ));
        }
        self.fill_color.validate()
    }
}

/// Horizontal text alignment relative to `TextPrimitive::x`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextHAlign {
    Left,
    Center,
    Right,
}

/// Draw command for one label in pixel space; `y` is the top edge.
#[derive(Debug, Clone, PartialEq)]
pub struct TextPrimitive {
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub font_size_px: f64,
    pub color: Color,
    pub h_align: TextHAlign,
}

impl TextPrimitive {
    #[must_use]
    pub fn new(
        text: impl Into<String>,
        x: f64,
        y: f64,
        font_size_px: f64,
        color: Color,
        h_align: TextHAlign,
    ) -> Self {
        Self {
            text: text.into(),
            x,
            y,
            font_size_px,
            color,
            h_align,
        }
    }

    pub fn validate(&self) -> ChartResult<()> {
        if self.text.is_empty() {
            return Err(ChartError::InvalidData(
                "text primitive must not be empty".to_owned(),
            ));
        }
        if !self.x.is_finite() || !self.y.is_finite() {
            return Err(ChartError::InvalidData(
                "text coordinates must be finite".to_owned(),
            ));
        }
        if !self.font_size_px.is_finite() || self.font_size_px <= 0.0 {
            return Err(ChartError::InvalidData(
                "font size must be finite and > 0".to_owned(),
            ));
        }
        self.color.validate()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::Color;

    #[test]
    fn parses_hex_forms() {
        let c = Color::from_hex("#2962ff").expect("hex");
        assert_relative_eq!(c.red, 41.0 / 255.0);
        assert_relative_eq!(c.alpha, 1.0);
        let c = Color::from_hex("#ff000080").expect("hex with alpha");
        assert_relative_eq!(c.alpha, 128.0 / 255.0);
        let c = Color::from_hex("#fff").expect("short hex");
        assert_relative_eq!(c.green, 1.0);
        assert!(Color::from_hex("2962ff").is_err());
        assert!(Color::from_hex("#zzzzzz").is_err());
    }
}
