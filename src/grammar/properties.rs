//! Visual properties and their mapping semantics.
//!
//! Each plot variable names a [`Property`]: a visual channel with a rule for
//! picking a default scale from the data, a rule for interpreting shorthand
//! scale arguments, a standardization of user-supplied values, and a way to
//! build the final value mapping of a fitted scale.
//!
//! Properties form a closed set of [`PropertyKind`]s. Numeric channels share
//! one interval algorithm parameterized by a [`Capabilities`] record (default
//! range plus a value-space transform), so size, alpha and width channels
//! differ only in data.

use std::collections::HashSet;

use itertools::Itertools;
use tracing::warn;

use super::data::{Column, DataValue};
use super::rules::{categorical_order, variable_type, VarType};
use super::scales::transform::{is_transform_name, Transform};
use super::scales::{ScaleArg, ScaleKind, ScaleSpec, ScaleValues};
use super::theme::Theme;
use crate::color::Color;
use crate::error::{Error, Result};
use crate::palettes::{self, Colormap};

// ============================================================================
// Property values
// ============================================================================

/// Marker glyphs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Marker {
    /// No marker.
    None,
    /// `o`
    Circle,
    /// `.`
    Point,
    /// `s`
    Square,
    /// `D`
    Diamond,
    /// `d`
    ThinDiamond,
    /// `^`
    TriangleUp,
    /// `v`
    TriangleDown,
    /// `<`
    TriangleLeft,
    /// `>`
    TriangleRight,
    /// `p`
    Pentagon,
    /// `h`
    Hexagon,
    /// `8`
    Octagon,
    /// `*`
    Star,
    /// `P`
    FilledPlus,
    /// `X`
    FilledX,
    /// `+` (line art)
    Plus,
    /// `x` (line art)
    Cross,
    /// `|` (line art)
    VLine,
    /// `_` (line art)
    HLine,
    /// Regular polygon with the first vertex at the top, rotated by `angle`
    /// degrees.
    Polygon {
        /// Number of sides.
        sides: u32,
        /// Rotation in degrees.
        angle: f64,
    },
    /// Star with `points` tips.
    StarPolygon {
        /// Number of tips.
        points: u32,
        /// Rotation in degrees.
        angle: f64,
    },
    /// Asterisk with `points` spokes (line art).
    Asterisk {
        /// Number of spokes.
        points: u32,
        /// Rotation in degrees.
        angle: f64,
    },
}

impl Marker {
    /// Marker from a `(sides, style, angle)` triple: style 0 is a polygon,
    /// 1 a star and 2 an asterisk.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Value`] for an unknown style.
    pub fn regular(sides: u32, style: u8, angle: f64) -> Result<Self> {
        match style {
            0 => Ok(Marker::Polygon { sides, angle }),
            1 => Ok(Marker::StarPolygon { points: sides, angle }),
            2 => Ok(Marker::Asterisk { points: sides, angle }),
            _ => Err(Error::value(format!("Unknown marker style {style}"))),
        }
    }

    /// Parse a marker code.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Value`] for an unknown code.
    pub fn parse(code: &str) -> Result<Self> {
        Ok(match code {
            "" | "None" | "none" | " " => Marker::None,
            "o" => Marker::Circle,
            "." => Marker::Point,
            "s" => Marker::Square,
            "D" => Marker::Diamond,
            "d" => Marker::ThinDiamond,
            "^" => Marker::TriangleUp,
            "v" => Marker::TriangleDown,
            "<" => Marker::TriangleLeft,
            ">" => Marker::TriangleRight,
            "p" => Marker::Pentagon,
            "h" | "H" => Marker::Hexagon,
            "8" => Marker::Octagon,
            "*" => Marker::Star,
            "P" => Marker::FilledPlus,
            "X" => Marker::FilledX,
            "+" => Marker::Plus,
            "x" => Marker::Cross,
            "|" => Marker::VLine,
            "_" => Marker::HLine,
            _ => return Err(Error::value(format!("Unrecognized marker style {code:?}"))),
        })
    }

    /// Whether the glyph has an interior that can be filled.
    #[must_use]
    pub fn is_filled(&self) -> bool {
        !matches!(
            self,
            Marker::None
                | Marker::Plus
                | Marker::Cross
                | Marker::VLine
                | Marker::HLine
                | Marker::Asterisk { .. }
        )
    }

    /// Glyph outline in unit coordinates (radius 1, y up), as a list of
    /// polylines. Filled glyphs return one closed ring.
    #[must_use]
    pub fn path(&self) -> Vec<Vec<(f64, f64)>> {
        fn ring(n: u32, angle: f64) -> Vec<(f64, f64)> {
            (0..n)
                .map(|i| {
                    let t = std::f64::consts::TAU * f64::from(i) / f64::from(n)
                        + std::f64::consts::FRAC_PI_2
                        + angle.to_radians();
                    (t.cos(), t.sin())
                })
                .collect()
        }
        fn star(n: u32, angle: f64, inner: f64) -> Vec<(f64, f64)> {
            (0..2 * n)
                .map(|i| {
                    let r = if i % 2 == 0 { 1.0 } else { inner };
                    let t = std::f64::consts::PI * f64::from(i) / f64::from(n)
                        + std::f64::consts::FRAC_PI_2
                        + angle.to_radians();
                    (r * t.cos(), r * t.sin())
                })
                .collect()
        }
        fn spokes(n: u32, angle: f64) -> Vec<Vec<(f64, f64)>> {
            ring(n, angle).into_iter().map(|p| vec![(0.0, 0.0), p]).collect()
        }
        fn cross(w: f64, rotate: f64) -> Vec<(f64, f64)> {
            let pts = [
                (-w, 1.0),
                (w, 1.0),
                (w, w),
                (1.0, w),
                (1.0, -w),
                (w, -w),
                (w, -1.0),
                (-w, -1.0),
                (-w, -w),
                (-1.0, -w),
                (-1.0, w),
                (-w, w),
            ];
            let (s, c) = rotate.to_radians().sin_cos();
            pts.iter().map(|(x, y)| (x * c - y * s, x * s + y * c)).collect()
        }
        match *self {
            Marker::None => Vec::new(),
            Marker::Circle => vec![ring(32, 0.0)],
            Marker::Point => vec![ring(16, 0.0).into_iter().map(|(x, y)| (x * 0.5, y * 0.5)).collect()],
            Marker::Square => vec![ring(4, 45.0)],
            Marker::Diamond => vec![ring(4, 0.0)],
            Marker::ThinDiamond => vec![ring(4, 0.0).into_iter().map(|(x, y)| (x * 0.6, y)).collect()],
            Marker::TriangleUp => vec![ring(3, 0.0)],
            Marker::TriangleDown => vec![ring(3, 180.0)],
            Marker::TriangleLeft => vec![ring(3, 90.0)],
            Marker::TriangleRight => vec![ring(3, 270.0)],
            Marker::Pentagon => vec![ring(5, 0.0)],
            Marker::Hexagon => vec![ring(6, 0.0)],
            Marker::Octagon => vec![ring(8, 22.5)],
            Marker::Star => vec![star(5, 0.0, 0.38)],
            Marker::FilledPlus => vec![cross(0.3, 0.0)],
            Marker::FilledX => vec![cross(0.3, 45.0)],
            Marker::Plus => vec![vec![(-1.0, 0.0), (1.0, 0.0)], vec![(0.0, -1.0), (0.0, 1.0)]],
            Marker::Cross => {
                let d = std::f64::consts::FRAC_1_SQRT_2;
                vec![vec![(-d, -d), (d, d)], vec![(-d, d), (d, -d)]]
            }
            Marker::VLine => vec![vec![(0.0, -1.0), (0.0, 1.0)]],
            Marker::HLine => vec![vec![(-1.0, 0.0), (1.0, 0.0)]],
            Marker::Polygon { sides, angle } => vec![ring(sides.max(3), angle)],
            Marker::StarPolygon { points, angle } => vec![star(points.max(2), angle, 0.5)],
            Marker::Asterisk { points, angle } => spokes(points.max(2), angle),
        }
    }
}

/// A line dash pattern: on/off segment lengths in units of the line width,
/// with an offset into the pattern. An empty pattern is a solid line.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dash {
    /// Offset into the pattern, reduced modulo the pattern length.
    pub offset: f64,
    /// Alternating on/off lengths.
    pub pattern: Vec<f64>,
}

impl Dash {
    /// A solid line.
    #[must_use]
    pub fn solid() -> Self {
        Self::default()
    }

    /// Dash pattern with an offset.
    #[must_use]
    pub fn new(offset: f64, pattern: Vec<f64>) -> Self {
        let total: f64 = pattern.iter().sum();
        let offset = if total > 0.0 { offset.rem_euclid(total) } else { offset };
        Self { offset, pattern }
    }

    /// Whether the line is drawn without gaps.
    #[must_use]
    pub fn is_solid(&self) -> bool {
        self.pattern.is_empty()
    }

    /// Parse a named line style.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Value`] for an unknown name.
    pub fn parse(style: &str) -> Result<Self> {
        let style = match style {
            "-" => "solid",
            "--" => "dashed",
            "-." => "dashdot",
            ":" => "dotted",
            other => other,
        };
        match style {
            "solid" | "none" | "None" | "" => Ok(Self::solid()),
            "dashed" => Ok(Self::new(0.0, vec![3.7, 1.6])),
            "dashdot" => Ok(Self::new(0.0, vec![6.4, 1.6, 1.0, 1.6])),
            "dotted" => Ok(Self::new(0.0, vec![1.0, 1.65])),
            _ => Err(Error::value(format!(
                "Linestyle string must be one of [solid, dashed, dashdot, dotted, -, --, -., :], not {style:?}."
            ))),
        }
    }
}

impl From<Vec<f64>> for Dash {
    fn from(pattern: Vec<f64>) -> Self {
        Self::new(0.0, pattern)
    }
}

/// A resolved (or user-supplied) property value.
#[derive(Debug, Clone, PartialEq)]
pub enum PropValue {
    /// Numeric value.
    Number(f64),
    /// Color.
    Color(Color),
    /// Marker glyph.
    Marker(Marker),
    /// Line dash pattern.
    Dash(Dash),
    /// Flag (fill).
    Bool(bool),
    /// Free text, or a shorthand that a property standardizes (color names,
    /// marker codes, line style names).
    Text(String),
    /// Missing.
    Null,
}

impl PropValue {
    /// Numeric view; NaN when not numeric.
    #[must_use]
    pub fn as_f64(&self) -> f64 {
        match self {
            PropValue::Number(v) => *v,
            PropValue::Bool(b) => f64::from(u8::from(*b)),
            _ => f64::NAN,
        }
    }

    /// Color view.
    #[must_use]
    pub fn as_color(&self) -> Option<Color> {
        match self {
            PropValue::Color(c) => Some(*c),
            _ => None,
        }
    }

    /// Marker view.
    #[must_use]
    pub fn as_marker(&self) -> Option<Marker> {
        match self {
            PropValue::Marker(m) => Some(*m),
            PropValue::Null => Some(Marker::None),
            _ => None,
        }
    }

    /// Dash view.
    #[must_use]
    pub fn as_dash(&self) -> Option<&Dash> {
        match self {
            PropValue::Dash(d) => Some(d),
            _ => None,
        }
    }

    /// Flag view; numbers are true when non-zero.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropValue::Bool(b) => Some(*b),
            PropValue::Number(v) if v.is_finite() => Some(*v != 0.0),
            _ => None,
        }
    }

    /// Text view.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            PropValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<f64> for PropValue {
    fn from(v: f64) -> Self {
        PropValue::Number(v)
    }
}

impl From<bool> for PropValue {
    fn from(v: bool) -> Self {
        PropValue::Bool(v)
    }
}

impl From<&str> for PropValue {
    fn from(v: &str) -> Self {
        PropValue::Text(v.to_string())
    }
}

impl From<String> for PropValue {
    fn from(v: String) -> Self {
        PropValue::Text(v)
    }
}

impl From<Color> for PropValue {
    fn from(v: Color) -> Self {
        PropValue::Color(v)
    }
}

impl From<Marker> for PropValue {
    fn from(v: Marker) -> Self {
        PropValue::Marker(v)
    }
}

impl From<Dash> for PropValue {
    fn from(v: Dash) -> Self {
        PropValue::Dash(v)
    }
}

impl From<&DataValue> for PropValue {
    fn from(v: &DataValue) -> Self {
        match v {
            DataValue::Number(n) => PropValue::Number(*n),
            DataValue::Bool(b) => PropValue::Bool(*b),
            DataValue::Text(s) => PropValue::Text(s.clone()),
            DataValue::DateTime(_) => PropValue::Number(v.as_f64().unwrap_or(f64::NAN)),
            DataValue::Null => PropValue::Null,
        }
    }
}

// ============================================================================
// Value mappings
// ============================================================================

/// Final stage of a fitted scale: from the normalized numeric pipeline
/// output to property values.
#[derive(Debug, Clone, PartialEq)]
pub enum Mapping {
    /// Numbers pass through.
    Identity,
    /// `inverse(x * (hi - lo) + lo)` where `lo`/`hi` are in transformed space.
    Interval {
        /// Transformed lower bound.
        lo: f64,
        /// Transformed upper bound.
        hi: f64,
        /// Value-space transform of the property.
        trans: Transform,
    },
    /// Continuous colors.
    Colormap(Colormap),
    /// Index lookup; out-of-range or missing indices give `null`.
    Lookup {
        /// Values by index.
        values: Vec<PropValue>,
        /// Value for missing data.
        null: PropValue,
    },
}

impl Mapping {
    /// Map one pipeline value.
    #[must_use]
    pub fn apply(&self, x: f64) -> PropValue {
        match self {
            Mapping::Identity => PropValue::Number(x),
            Mapping::Interval { lo, hi, trans } => {
                if x.is_finite() {
                    PropValue::Number(trans.inverse(x * (hi - lo) + lo))
                } else {
                    PropValue::Number(f64::NAN)
                }
            }
            Mapping::Colormap(cmap) => PropValue::Color(cmap.sample(x)),
            Mapping::Lookup { values, null } => {
                if x.is_finite() && x >= 0.0 {
                    values.get(x as usize).cloned().unwrap_or_else(|| null.clone())
                } else {
                    null.clone()
                }
            }
        }
    }
}

// ============================================================================
// Properties
// ============================================================================

/// The closed set of property semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyKind {
    /// Position on an axis.
    Coordinate,
    /// Color (face, fill or edge).
    Color,
    /// Opacity.
    Alpha,
    /// Whether a glyph is filled.
    Fill,
    /// Marker glyph.
    Marker,
    /// Marker size; area scales linearly with data.
    PointSize,
    /// Width of line-art markers.
    Stroke,
    /// Line width.
    LineWidth,
    /// Patch edge width.
    EdgeWidth,
    /// Dash pattern.
    LineStyle,
    /// Horizontal text alignment.
    HAlign,
    /// Vertical text alignment.
    VAlign,
    /// Text offset in points.
    Offset,
    /// Font size.
    FontSize,
    /// Anything else: raw values, no legend.
    Plain,
}

/// Capability record of an interval property.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Capabilities {
    /// Default output range.
    pub default_range: (f64, f64),
    /// Transform applied to the range before interpolation.
    pub trans: Transform,
}

/// A named visual channel.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    /// Variable this property serves (e.g. `edgecolor`, `x1`).
    pub variable: String,
    /// Semantics.
    pub kind: PropertyKind,
}

/// Registered property names. Coordinates also cover paired (`x0`, `x1`,
/// ...) and derived (`xmin`, ...) variables.
pub const PROPERTY_NAMES: &[&str] = &[
    "x", "y", "xmin", "xmax", "ymin", "ymax", "color", "fillcolor", "edgecolor", "alpha",
    "fillalpha", "edgealpha", "fill", "marker", "pointsize", "stroke", "linewidth", "linestyle",
    "edgestyle", "edgewidth", "text", "halign", "valign", "offset", "fontsize", "group",
];

/// Split a coordinate variable into `(axis, coordinate)`: `x1max` gives
/// `("x", "x1")`. Returns `None` for non-coordinate variables.
#[must_use]
pub fn split_coordinate(var: &str) -> Option<(&str, &str)> {
    let axis = var.get(..1).filter(|a| *a == "x" || *a == "y")?;
    let digits = var[1..].chars().take_while(char::is_ascii_digit).count();
    Some((axis, &var[..1 + digits]))
}

impl Property {
    /// Property for a registered name (coordinates by axis prefix).
    #[must_use]
    pub fn lookup(variable: &str) -> Option<Self> {
        let kind = if split_coordinate(variable).is_some() {
            PropertyKind::Coordinate
        } else {
            match variable {
                "color" | "fillcolor" | "edgecolor" => PropertyKind::Color,
                "alpha" | "fillalpha" | "edgealpha" => PropertyKind::Alpha,
                "fill" => PropertyKind::Fill,
                "marker" => PropertyKind::Marker,
                "pointsize" => PropertyKind::PointSize,
                "stroke" => PropertyKind::Stroke,
                "linewidth" => PropertyKind::LineWidth,
                "linestyle" | "edgestyle" => PropertyKind::LineStyle,
                "edgewidth" => PropertyKind::EdgeWidth,
                "halign" => PropertyKind::HAlign,
                "valign" => PropertyKind::VAlign,
                "offset" => PropertyKind::Offset,
                "fontsize" => PropertyKind::FontSize,
                "text" | "group" => PropertyKind::Plain,
                _ => return None,
            }
        };
        Some(Self { variable: variable.to_string(), kind })
    }

    /// Property for any variable; unregistered names are plain.
    #[must_use]
    pub fn get(variable: &str) -> Self {
        Self::lookup(variable)
            .unwrap_or_else(|| Self { variable: variable.to_string(), kind: PropertyKind::Plain })
    }

    /// Whether fitted scales of this property produce legend entries.
    #[must_use]
    pub fn legend(&self) -> bool {
        matches!(
            self.kind,
            PropertyKind::Color
                | PropertyKind::Alpha
                | PropertyKind::Fill
                | PropertyKind::Marker
                | PropertyKind::PointSize
                | PropertyKind::Stroke
                | PropertyKind::LineWidth
                | PropertyKind::EdgeWidth
                | PropertyKind::LineStyle
        )
    }

    /// Whether continuous data is normalized to `[0, 1]` before mapping.
    #[must_use]
    pub fn normed(&self) -> bool {
        matches!(
            self.kind,
            PropertyKind::Color
                | PropertyKind::Alpha
                | PropertyKind::PointSize
                | PropertyKind::Stroke
                | PropertyKind::LineWidth
                | PropertyKind::EdgeWidth
                | PropertyKind::Offset
                | PropertyKind::FontSize
        )
    }

    fn color_like(&self) -> bool {
        self.kind == PropertyKind::Color
    }

    fn object_like(&self) -> bool {
        matches!(
            self.kind,
            PropertyKind::Marker
                | PropertyKind::LineStyle
                | PropertyKind::Fill
                | PropertyKind::HAlign
                | PropertyKind::VAlign
        )
    }

    /// Capability record for interval properties.
    #[must_use]
    pub fn interval(&self, theme: &Theme) -> Option<Capabilities> {
        let linear = |lo: f64, hi: f64| Capabilities { default_range: (lo, hi), trans: Transform::Identity };
        match self.kind {
            PropertyKind::Alpha => Some(linear(0.3, 0.95)),
            PropertyKind::PointSize => {
                Some(Capabilities { default_range: (2.0, 8.0), trans: Transform::Pow(2.0) })
            }
            PropertyKind::Stroke => Some(linear(0.25, 2.5)),
            PropertyKind::LineWidth => {
                Some(linear(theme.lines_linewidth * 0.5, theme.lines_linewidth * 2.0))
            }
            PropertyKind::EdgeWidth => {
                Some(linear(theme.patch_linewidth * 0.5, theme.patch_linewidth * 2.0))
            }
            PropertyKind::Offset => Some(linear(0.0, 5.0)),
            PropertyKind::FontSize => Some(linear(theme.font_size * 0.5, theme.font_size * 2.0)),
            _ => None,
        }
    }

    /// Scale used when the user did not specify one.
    #[must_use]
    pub fn default_scale(&self, data: &Column) -> ScaleSpec {
        let var_type = variable_type(data, VarType::Boolean, true);
        if self.object_like() {
            return match var_type {
                VarType::Boolean => ScaleSpec::boolean(),
                _ => ScaleSpec::nominal(),
            };
        }
        match var_type {
            VarType::Numeric => ScaleSpec::continuous(),
            VarType::Datetime => ScaleSpec::temporal(),
            VarType::Boolean => ScaleSpec::boolean(),
            VarType::Categorical => ScaleSpec::nominal(),
        }
    }

    /// Interpret a shorthand scale argument given the data it will see.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Value`] when the argument makes no sense for this
    /// property (e.g. a palette name for a coordinate).
    pub fn infer_scale(&self, arg: &ScaleArg, data: &Column) -> Result<ScaleSpec> {
        let var_type = variable_type(data, VarType::Boolean, true);
        let values = match arg {
            ScaleArg::Spec(spec) => return Ok(spec.clone()),
            ScaleArg::Identity => return Ok(ScaleSpec::identity()),
            ScaleArg::Values(values) => values.clone(),
        };

        match self.kind {
            PropertyKind::Coordinate | PropertyKind::Plain => match &values {
                ScaleValues::Name(name) if is_transform_name(name) => {
                    Ok(ScaleSpec::continuous().trans(name.clone()))
                }
                ScaleValues::Name(name) => Err(Error::value(format!(
                    "Unknown magic arg for {} scale: {name:?}.",
                    self.variable
                ))),
                _ => Err(Error::value(format!(
                    "Magic arg for {} scale must be a transform name.",
                    self.variable
                ))),
            },
            PropertyKind::Color => {
                let spec = if var_type == VarType::Boolean {
                    ScaleSpec::boolean()
                } else {
                    match &values {
                        ScaleValues::List(_) | ScaleValues::Dict(_) => ScaleSpec::nominal(),
                        ScaleValues::Colors(_) | ScaleValues::Range(..) => {
                            if var_type == VarType::Categorical {
                                ScaleSpec::nominal()
                            } else {
                                ScaleSpec::continuous()
                            }
                        }
                        ScaleValues::Name(name) => {
                            if palettes::qualitative(name).is_some() {
                                ScaleSpec::nominal()
                            } else if var_type == VarType::Numeric {
                                ScaleSpec::continuous()
                            } else {
                                ScaleSpec::nominal()
                            }
                        }
                    }
                };
                Ok(spec.values(values))
            }
            _ if self.object_like() => {
                let spec = if var_type == VarType::Boolean {
                    ScaleSpec::boolean()
                } else {
                    ScaleSpec::nominal()
                };
                Ok(spec.values(values))
            }
            _ => {
                let spec = match (&values, var_type) {
                    (_, VarType::Boolean) => ScaleSpec::boolean(),
                    (ScaleValues::List(_) | ScaleValues::Dict(_), _) | (_, VarType::Categorical) => {
                        ScaleSpec::nominal()
                    }
                    (_, VarType::Datetime) => ScaleSpec::temporal(),
                    _ => ScaleSpec::continuous(),
                };
                Ok(spec.values(values))
            }
        }
    }

    /// Convert a user-supplied value into this property's canonical form.
    ///
    /// # Errors
    ///
    /// Returns an error when the value cannot represent this property.
    pub fn standardize(&self, value: &PropValue, theme: &Theme) -> Result<PropValue> {
        let invalid = || {
            Error::value(format!("Invalid value for {}: {value:?}", self.variable))
        };
        match (self.kind, value) {
            (_, PropValue::Null) => Ok(PropValue::Null),
            (PropertyKind::Color, PropValue::Color(_)) => Ok(value.clone()),
            (PropertyKind::Color, PropValue::Text(s)) => Ok(PropValue::Color(theme.color(s)?)),
            (PropertyKind::Color, _) => Err(invalid()),
            (PropertyKind::Marker, PropValue::Marker(_)) => Ok(value.clone()),
            (PropertyKind::Marker, PropValue::Text(s)) => Ok(PropValue::Marker(Marker::parse(s)?)),
            (PropertyKind::Marker, _) => Err(invalid()),
            (PropertyKind::LineStyle, PropValue::Dash(_)) => Ok(value.clone()),
            (PropertyKind::LineStyle, PropValue::Text(s)) => Ok(PropValue::Dash(Dash::parse(s)?)),
            (PropertyKind::LineStyle, _) => Err(invalid()),
            (PropertyKind::Fill, _) => value.as_bool().map(PropValue::Bool).ok_or_else(invalid),
            (PropertyKind::HAlign | PropertyKind::VAlign, PropValue::Text(_)) => Ok(value.clone()),
            (PropertyKind::HAlign | PropertyKind::VAlign, _) => Err(invalid()),
            (PropertyKind::Coordinate | PropertyKind::Plain, _) => Ok(value.clone()),
            (_, PropValue::Number(_)) => Ok(value.clone()),
            (_, PropValue::Text(s)) => s.parse::<f64>().map(PropValue::Number).map_err(|_| invalid()),
            _ => Err(invalid()),
        }
    }

    /// Value for missing data.
    fn null_value(&self) -> PropValue {
        match self.kind {
            PropertyKind::Color => PropValue::Color(Color::invisible()),
            PropertyKind::Fill => PropValue::Bool(false),
            PropertyKind::Marker | PropertyKind::LineStyle | PropertyKind::HAlign | PropertyKind::VAlign => {
                PropValue::Null
            }
            _ => PropValue::Number(f64::NAN),
        }
    }

    /// Generated values for `n` levels when the scale provides none.
    fn default_values(&self, n: usize, theme: &Theme) -> Vec<PropValue> {
        match self.kind {
            PropertyKind::Marker => default_markers(n).into_iter().map(PropValue::Marker).collect(),
            PropertyKind::LineStyle => default_dashes(n).into_iter().map(PropValue::Dash).collect(),
            PropertyKind::Fill => {
                if n > 2 {
                    warn!(
                        variable = %self.variable,
                        "The variable assigned to {v} has more than two levels, so {v} values will cycle and may be uninterpretable",
                        v = self.variable
                    );
                }
                [true, false].iter().cycle().take(n).map(|b| PropValue::Bool(*b)).collect()
            }
            PropertyKind::HAlign => ["left", "right"].iter().cycle().take(n).map(|s| PropValue::from(*s)).collect(),
            PropertyKind::VAlign => ["top", "bottom"].iter().cycle().take(n).map(|s| PropValue::from(*s)).collect(),
            PropertyKind::Color => {
                let cycle = theme.color_cycle();
                let colors = if n <= cycle.len() {
                    cycle.into_iter().take(n).collect()
                } else {
                    palettes::husl_palette(n, 0.01, 0.9, 0.65)
                };
                colors.into_iter().map(PropValue::Color).collect()
            }
            _ => vec![PropValue::Null; n],
        }
    }

    /// Repeat or truncate a value list to the number of levels, warning.
    fn check_list_length(&self, n: usize, values: &[PropValue]) -> Vec<PropValue> {
        if n > values.len() {
            warn!(
                variable = %self.variable,
                "The {} list has fewer values ({}) than needed ({n}) and will cycle, which may produce an uninterpretable plot.",
                self.variable,
                values.len()
            );
            values.iter().cycle().take(n).cloned().collect()
        } else if values.len() > n {
            warn!(
                variable = %self.variable,
                "The {} list has more values ({}) than needed ({n}), which may not be intended.",
                self.variable,
                values.len()
            );
            values[..n].to_vec()
        } else {
            values.to_vec()
        }
    }

    fn check_dict_entries(&self, levels: &[DataValue], dict: &[(DataValue, PropValue)]) -> Result<Vec<PropValue>> {
        let mut missing: Vec<String> = levels
            .iter()
            .filter(|l| !dict.iter().any(|(k, _)| k == *l))
            .map(|l| format!("{:?}", l.to_string()))
            .collect();
        if !missing.is_empty() {
            missing.sort();
            return Err(Error::value(format!(
                "No entry in {} dictionary for {}",
                self.variable,
                missing.join(", ")
            )));
        }
        Ok(levels
            .iter()
            .filter_map(|l| dict.iter().find(|(k, _)| k == l).map(|(_, v)| v.clone()))
            .collect())
    }

    /// Values for each of `levels`, standardized.
    fn level_values(
        &self,
        spec: &ScaleSpec,
        levels: &[DataValue],
        theme: &Theme,
    ) -> Result<Vec<PropValue>> {
        let n = levels.len();
        let values = match (spec.values_ref(), self.interval(theme)) {
            (Some(ScaleValues::Dict(dict)), _) => self.check_dict_entries(levels, dict)?,
            (Some(ScaleValues::List(list)), _) => self.check_list_length(n, list),
            (Some(ScaleValues::Colors(colors)), _) if self.color_like() => {
                palettes::blend_palette(colors)?.colors(n).into_iter().map(PropValue::Color).collect()
            }
            (Some(ScaleValues::Name(name)), _) if self.color_like() => {
                palettes::color_palette(name, n)?.into_iter().map(PropValue::Color).collect()
            }
            (None, _) if self.color_like() && spec.kind() == ScaleKind::Ordinal => palettes::colormap("ch:")?
                .colors(n)
                .into_iter()
                .map(PropValue::Color)
                .collect(),
            (None, None) => self.default_values(n, theme),
            (range, Some(caps)) => {
                let (lo, hi) = match range {
                    None => caps.default_range,
                    Some(ScaleValues::Range(lo, hi)) => (*lo, *hi),
                    Some(other) => {
                        return Err(Error::value(format!(
                            "Values for {} variables with {} scale must be a dict, list or 2-tuple; not {other:?}.",
                            self.variable,
                            spec.kind()
                        )))
                    }
                };
                let (a, b) = (caps.trans.forward(lo), caps.trans.forward(hi));
                palettes::linspace(b, a, n)
                    .into_iter()
                    .map(|v| PropValue::Number(caps.trans.inverse(v)))
                    .collect()
            }
            (Some(other), None) => {
                return Err(Error::value(format!(
                    "Scale values for {} with a {} scale must be a dict or list; not {other:?}.",
                    self.variable,
                    spec.kind()
                )))
            }
        };
        let values = values
            .iter()
            .map(|v| self.standardize(v, theme))
            .collect::<Result<Vec<_>>>()?;
        if self.kind == PropertyKind::Marker {
            let filled: HashSet<bool> =
                values.iter().filter_map(PropValue::as_marker).filter(|m| *m != Marker::None).map(|m| m.is_filled()).collect();
            if filled.len() > 1 {
                return Err(Error::value("Filled and line art markers cannot be mixed"));
            }
        }
        Ok(values)
    }

    /// Build the value mapping of a scale fit on `data`.
    ///
    /// `levels` is the resolved level order for discrete scales.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Value`] when the scale values do not suit the
    /// property.
    pub fn get_mapping(&self, spec: &ScaleSpec, levels: &[DataValue], theme: &Theme) -> Result<Mapping> {
        if matches!(self.kind, PropertyKind::Coordinate | PropertyKind::Plain) {
            return Ok(Mapping::Identity);
        }
        let null = self.null_value();
        match spec.kind() {
            ScaleKind::Identity => Ok(Mapping::Identity),
            ScaleKind::Boolean => {
                let tf = [DataValue::Bool(true), DataValue::Bool(false)];
                let values = self.level_values(spec, &tf, theme)?;
                Ok(Mapping::Lookup { values: values.into_iter().rev().collect(), null })
            }
            ScaleKind::Nominal | ScaleKind::Ordinal => {
                let values = self.level_values(spec, levels, theme)?;
                Ok(Mapping::Lookup { values, null })
            }
            ScaleKind::Continuous | ScaleKind::Temporal => {
                if self.color_like() {
                    let cmap = match spec.values_ref() {
                        None => palettes::colormap("ch:")?,
                        Some(ScaleValues::Colors(colors)) => palettes::blend_palette(colors)?,
                        Some(ScaleValues::Name(name)) => palettes::colormap(name)?,
                        Some(other) => {
                            return Err(Error::value(format!(
                                "Scale values for {} with a {} scale must be string or tuple; not {other:?}.",
                                self.variable,
                                spec.kind()
                            )))
                        }
                    };
                    return Ok(Mapping::Colormap(cmap));
                }
                let Some(caps) = self.interval(theme) else {
                    return Err(Error::value(format!(
                        "A {} scale cannot be used with {} variables.",
                        spec.kind(),
                        self.variable
                    )));
                };
                let (lo, hi) = match spec.values_ref() {
                    None => caps.default_range,
                    Some(ScaleValues::Range(lo, hi)) => (*lo, *hi),
                    Some(other) => {
                        return Err(Error::value(format!(
                            "Values for {} variables with {} scale must be 2-tuple; not {other:?}.",
                            self.variable,
                            spec.kind()
                        )))
                    }
                };
                Ok(Mapping::Interval { lo: caps.trans.forward(lo), hi: caps.trans.forward(hi), trans: caps.trans })
            }
        }
    }

    /// Resolved level order for a discrete scale.
    #[must_use]
    pub fn levels(&self, spec: &ScaleSpec, data: &Column) -> Vec<DataValue> {
        match spec.kind() {
            ScaleKind::Boolean => vec![DataValue::Bool(true), DataValue::Bool(false)],
            ScaleKind::Ordinal if spec.order_ref().is_none() => {
                let mut levels = categorical_order(data, None);
                levels.sort();
                levels
            }
            _ => categorical_order(data, spec.order_ref()),
        }
    }
}

/// Distinguishable marker glyphs, all filled.
#[must_use]
pub fn default_markers(n: usize) -> Vec<Marker> {
    let mut markers = vec![
        Marker::Circle,
        Marker::FilledX,
        Marker::Polygon { sides: 4, angle: 45.0 },
        Marker::FilledPlus,
        Marker::Polygon { sides: 4, angle: 0.0 },
        Marker::StarPolygon { points: 4, angle: 0.0 },
        Marker::TriangleUp,
        Marker::StarPolygon { points: 4, angle: 45.0 },
        Marker::TriangleDown,
    ];
    let mut s = 5;
    while markers.len() < n {
        let a = 360.0 / f64::from(s + 1) / 2.0;
        markers.extend([
            Marker::StarPolygon { points: s + 1, angle: a },
            Marker::Polygon { sides: s + 1, angle: a },
            Marker::StarPolygon { points: s, angle: 0.0 },
            Marker::Polygon { sides: s, angle: 0.0 },
        ]);
        s += 1;
    }
    markers.truncate(n);
    markers
}

/// Distinguishable dash patterns, starting with a solid line.
#[must_use]
pub fn default_dashes(n: usize) -> Vec<Dash> {
    let mut dashes: Vec<Dash> = vec![
        Dash::solid(),
        Dash::from(vec![4.0, 1.5]),
        Dash::from(vec![1.0, 1.0]),
        Dash::from(vec![3.0, 1.25, 1.5, 1.25]),
        Dash::from(vec![5.0, 1.0, 1.0, 1.0]),
    ];
    let mut p = 3;
    while dashes.len() < n {
        let trim = |combos: Vec<Vec<f64>>| -> Vec<Vec<f64>> {
            let len = combos.len();
            combos.into_iter().skip(1).take(len.saturating_sub(2)).collect()
        };
        let a = trim([3.0, 1.25].into_iter().combinations_with_replacement(p).collect());
        let b = trim([4.0, 1.0].into_iter().combinations_with_replacement(p).collect());
        for (x, y) in a.into_iter().rev().zip(b) {
            for segments in [x, y] {
                let gap = segments.iter().copied().fold(f64::INFINITY, f64::min);
                let pattern: Vec<f64> = segments.iter().flat_map(|s| [*s, gap]).collect();
                dashes.push(Dash::from(pattern));
            }
        }
        p += 1;
    }
    dashes.truncate(n);
    dashes
}
