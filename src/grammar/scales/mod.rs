//! Scales: fitted mappings from a variable's data domain to a property.
//!
//! A [`ScaleSpec`] is what the user writes (`ScaleSpec::continuous().trans("log")`);
//! calling [`ScaleSpec::setup`] with the data a variable actually takes
//! produces an immutable, fitted [`Scale`]. A fitted scale runs a fixed
//! pipeline: unit conversion (levels to indices, timestamps to days), the
//! value transform, normalization to `[0, 1]` for normed properties, and the
//! property's [`Mapping`].
//!
//! Shorthand arguments (`"log"`, a palette name, a `(min, max)` range, a list
//! or dict of values) are wrapped in [`ScaleArg`] and interpreted by the
//! property the scale serves.

pub mod ticks;
pub mod transform;

use std::fmt;

use indexmap::IndexMap;

pub use ticks::{Formatter, LabelSpec, Locator, TickSpec};
pub use transform::Transform;

use super::data::{Column, DataValue};
use super::properties::{Mapping, PropValue, Property, PropertyKind};
use super::theme::Theme;
use crate::color::Color;
use crate::error::{Error, Result};

/// Family of a scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScaleKind {
    /// Numeric domain, continuous range.
    Continuous,
    /// Unordered categories.
    Nominal,
    /// Ordered categories (levels sorted, sequential colors).
    Ordinal,
    /// True/false.
    Boolean,
    /// Timestamps.
    Temporal,
    /// Raw values pass through.
    Identity,
}

impl ScaleKind {
    /// Priority used to infer orientation: the axis with the more
    /// categorical scale is the orientation axis.
    #[must_use]
    pub fn priority(self) -> u8 {
        match self {
            ScaleKind::Identity => 0,
            ScaleKind::Continuous => 1,
            ScaleKind::Temporal => 2,
            ScaleKind::Boolean => 3,
            ScaleKind::Nominal | ScaleKind::Ordinal => 4,
        }
    }

    /// Whether the scale maps levels rather than magnitudes.
    #[must_use]
    pub fn is_discrete(self) -> bool {
        matches!(self, ScaleKind::Nominal | ScaleKind::Ordinal | ScaleKind::Boolean)
    }
}

impl fmt::Display for ScaleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ScaleKind::Continuous => "Continuous",
            ScaleKind::Nominal => "Nominal",
            ScaleKind::Ordinal => "Ordinal",
            ScaleKind::Boolean => "Boolean",
            ScaleKind::Temporal => "Temporal",
            ScaleKind::Identity => "Identity",
        };
        f.write_str(s)
    }
}

/// Output values a scale maps onto.
#[derive(Debug, Clone, PartialEq)]
pub enum ScaleValues {
    /// A palette, colormap or transform name.
    Name(String),
    /// Output range `(min, max)`.
    Range(f64, f64),
    /// Colors to blend into a gradient.
    Colors(Vec<Color>),
    /// One value per level, in level order.
    List(Vec<PropValue>),
    /// Explicit value per level.
    Dict(Vec<(DataValue, PropValue)>),
}

impl From<&str> for ScaleValues {
    fn from(name: &str) -> Self {
        ScaleValues::Name(name.to_string())
    }
}

impl From<(f64, f64)> for ScaleValues {
    fn from((lo, hi): (f64, f64)) -> Self {
        ScaleValues::Range(lo, hi)
    }
}

impl From<Vec<&str>> for ScaleValues {
    fn from(values: Vec<&str>) -> Self {
        ScaleValues::List(values.into_iter().map(PropValue::from).collect())
    }
}

impl From<Vec<PropValue>> for ScaleValues {
    fn from(values: Vec<PropValue>) -> Self {
        ScaleValues::List(values)
    }
}

impl From<Vec<Color>> for ScaleValues {
    fn from(colors: Vec<Color>) -> Self {
        ScaleValues::Colors(colors)
    }
}

/// User configuration of a scale.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaleSpec {
    kind: ScaleKind,
    values: Option<ScaleValues>,
    norm: Option<(f64, f64)>,
    trans: Option<String>,
    order: Option<Vec<DataValue>>,
    ticks: TickSpec,
    labels: LabelSpec,
}

impl ScaleSpec {
    fn of(kind: ScaleKind) -> Self {
        Self {
            kind,
            values: None,
            norm: None,
            trans: None,
            order: None,
            ticks: TickSpec::default(),
            labels: LabelSpec::default(),
        }
    }

    /// Continuous scale.
    #[must_use]
    pub fn continuous() -> Self {
        Self::of(ScaleKind::Continuous)
    }

    /// Nominal (categorical) scale.
    #[must_use]
    pub fn nominal() -> Self {
        Self::of(ScaleKind::Nominal)
    }

    /// Ordinal scale.
    #[must_use]
    pub fn ordinal() -> Self {
        Self::of(ScaleKind::Ordinal)
    }

    /// Boolean scale.
    #[must_use]
    pub fn boolean() -> Self {
        Self::of(ScaleKind::Boolean)
    }

    /// Temporal scale.
    #[must_use]
    pub fn temporal() -> Self {
        Self::of(ScaleKind::Temporal)
    }

    /// Identity scale: data values are used as property values directly.
    #[must_use]
    pub fn identity() -> Self {
        Self::of(ScaleKind::Identity)
    }

    /// Output values.
    #[must_use]
    pub fn values(mut self, values: impl Into<ScaleValues>) -> Self {
        self.values = Some(values.into());
        self
    }

    /// Fix the data range normalized to `[0, 1]`.
    #[must_use]
    pub fn norm(mut self, lo: f64, hi: f64) -> Self {
        self.norm = Some((lo, hi));
        self
    }

    /// Value transform by name (`log`, `sqrt`, `symlog10`, ...).
    #[must_use]
    pub fn trans(mut self, name: impl Into<String>) -> Self {
        self.trans = Some(name.into());
        self
    }

    /// Explicit level order.
    #[must_use]
    pub fn order<T: Into<DataValue>>(mut self, order: impl IntoIterator<Item = T>) -> Self {
        self.order = Some(order.into_iter().map(Into::into).collect());
        self
    }

    /// Tick placement.
    #[must_use]
    pub fn tick(mut self, ticks: TickSpec) -> Self {
        self.ticks = ticks;
        self
    }

    /// Tick label formatting.
    #[must_use]
    pub fn label(mut self, labels: LabelSpec) -> Self {
        self.labels = labels;
        self
    }

    /// Scale family.
    #[must_use]
    pub fn kind(&self) -> ScaleKind {
        self.kind
    }

    /// Output values, if given.
    #[must_use]
    pub fn values_ref(&self) -> Option<&ScaleValues> {
        self.values.as_ref()
    }

    /// Explicit level order, if given.
    #[must_use]
    pub fn order_ref(&self) -> Option<&[DataValue]> {
        self.order.as_deref()
    }

    fn transform(&self) -> Result<Transform> {
        match &self.trans {
            Some(name) if self.kind == ScaleKind::Continuous => name.parse(),
            Some(name) => Err(Error::value(format!(
                "A {} scale does not accept a transform ({name:?})",
                self.kind
            ))),
            None => Ok(Transform::Identity),
        }
    }

    /// Fit the scale to the values a variable takes.
    ///
    /// # Errors
    ///
    /// Returns an error when the data does not suit the scale (text data on
    /// a continuous scale, an unknown transform) or the scale values do not
    /// suit the property.
    pub fn setup(&self, data: &Column, prop: &Property, theme: &Theme) -> Result<Scale> {
        let mut scale = Scale {
            kind: self.kind,
            prop: prop.clone(),
            priority: self.kind.priority(),
            units: Units::Numeric,
            trans: Transform::Identity,
            normalize: None,
            mapping: Mapping::Identity,
            legend: None,
            order: self.order.clone(),
            ticks: self.ticks.clone(),
            labels: self.labels.clone(),
            theme: theme.clone(),
        };
        match self.kind {
            ScaleKind::Identity => {}
            ScaleKind::Continuous | ScaleKind::Temporal => {
                if let Some(bad) = data.iter().find(|v| matches!(v, DataValue::Text(_))) {
                    return Err(Error::value(format!(
                        "{} scale requires numeric data; found {bad:?}",
                        self.kind
                    )));
                }
                scale.units =
                    if self.kind == ScaleKind::Temporal { Units::Temporal } else { Units::Numeric };
                scale.trans = self.transform()?;
                let (vmin, vmax) = match self.norm {
                    Some(norm) => norm,
                    None => {
                        let values: Vec<f64> =
                            data.iter().map(|v| scale.convert(v)).filter(|v| v.is_finite()).collect();
                        let lo = values.iter().copied().fold(f64::INFINITY, f64::min);
                        let hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                        (lo, hi)
                    }
                };
                if prop.normed() && vmin.is_finite() && vmax.is_finite() {
                    let a = scale.trans.forward(vmin);
                    let b = scale.trans.forward(vmax) - a;
                    scale.normalize = Some((a, if b == 0.0 { 1.0 } else { b }));
                }
                scale.mapping = prop.get_mapping(self, &[], theme)?;
                if prop.legend() && vmin.is_finite() && vmax.is_finite() {
                    let locator = scale.major_locator();
                    let locs: Vec<f64> = locator
                        .ticks(vmin, vmax, 5)
                        .into_iter()
                        .filter(|v| *v >= vmin && *v <= vmax)
                        .collect();
                    let labels = scale.formatter().format_ticks(&locs);
                    scale.legend = Some(ScaleLegend {
                        values: locs.into_iter().map(DataValue::Number).collect(),
                        labels,
                    });
                }
            }
            ScaleKind::Nominal | ScaleKind::Ordinal => {
                let levels = prop.levels(self, data);
                scale.mapping = prop.get_mapping(self, &levels, theme)?;
                if prop.legend() {
                    scale.legend = Some(ScaleLegend {
                        labels: levels.iter().map(ToString::to_string).collect(),
                        values: levels.clone(),
                    });
                }
                scale.units = Units::Categories(levels);
            }
            ScaleKind::Boolean => {
                scale.units = Units::Boolean;
                scale.mapping = prop.get_mapping(self, &[], theme)?;
                if prop.legend() {
                    scale.legend = Some(ScaleLegend {
                        values: vec![DataValue::Bool(true), DataValue::Bool(false)],
                        labels: vec!["True".to_string(), "False".to_string()],
                    });
                }
            }
        }
        Ok(scale)
    }
}

/// Shorthand scale argument, interpreted by the property it is used for.
#[derive(Debug, Clone, PartialEq)]
pub enum ScaleArg {
    /// A fully specified scale.
    Spec(ScaleSpec),
    /// Use data values directly.
    Identity,
    /// Values (or a name) from which the scale family is inferred.
    Values(ScaleValues),
}

impl From<ScaleSpec> for ScaleArg {
    fn from(spec: ScaleSpec) -> Self {
        ScaleArg::Spec(spec)
    }
}

impl From<ScaleValues> for ScaleArg {
    fn from(values: ScaleValues) -> Self {
        ScaleArg::Values(values)
    }
}

impl From<&str> for ScaleArg {
    fn from(name: &str) -> Self {
        ScaleArg::Values(name.into())
    }
}

impl From<(f64, f64)> for ScaleArg {
    fn from(range: (f64, f64)) -> Self {
        ScaleArg::Values(range.into())
    }
}

impl From<Vec<&str>> for ScaleArg {
    fn from(values: Vec<&str>) -> Self {
        ScaleArg::Values(values.into())
    }
}

/// Fitted scales keyed by variable.
pub type ScaleMap = IndexMap<String, Scale>;

/// Legend contents of a fitted scale.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaleLegend {
    /// Representative data values.
    pub values: Vec<DataValue>,
    /// Their labels.
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
enum Units {
    Numeric,
    Temporal,
    Categories(Vec<DataValue>),
    Boolean,
}

/// One labeled tick.
#[derive(Debug, Clone, PartialEq)]
pub struct Tick {
    /// Position in data units (level index for discrete scales).
    pub pos: f64,
    /// Label text.
    pub label: String,
}

/// Ticks for one axis view.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AxisTicks {
    /// Labeled major ticks.
    pub major: Vec<Tick>,
    /// Unlabeled minor tick positions.
    pub minor: Vec<f64>,
}

/// A fitted scale. Immutable once built.
#[derive(Debug, Clone)]
pub struct Scale {
    kind: ScaleKind,
    prop: Property,
    priority: u8,
    units: Units,
    trans: Transform,
    normalize: Option<(f64, f64)>,
    mapping: Mapping,
    legend: Option<ScaleLegend>,
    order: Option<Vec<DataValue>>,
    ticks: TickSpec,
    labels: LabelSpec,
    theme: Theme,
}

impl Scale {
    /// Identity scale for a property: values pass through unchanged.
    #[must_use]
    pub fn identity(prop: &Property, theme: &Theme) -> Self {
        Self {
            kind: ScaleKind::Identity,
            prop: prop.clone(),
            priority: 0,
            units: Units::Numeric,
            trans: Transform::Identity,
            normalize: None,
            mapping: Mapping::Identity,
            legend: None,
            order: None,
            ticks: TickSpec::default(),
            labels: LabelSpec::default(),
            theme: theme.clone(),
        }
    }

    /// Scale family.
    #[must_use]
    pub fn kind(&self) -> ScaleKind {
        self.kind
    }

    /// Priority for orientation inference.
    #[must_use]
    pub fn priority(&self) -> u8 {
        self.priority
    }

    /// Copy of this scale with a different priority.
    #[must_use]
    pub(crate) fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    /// The property this scale maps onto.
    #[must_use]
    pub fn property(&self) -> &Property {
        &self.prop
    }

    /// Value transform.
    #[must_use]
    pub fn transform(&self) -> Transform {
        self.trans
    }

    /// Explicit level order given by the user.
    #[must_use]
    pub fn order(&self) -> Option<&[DataValue]> {
        self.order.as_deref()
    }

    /// Fitted levels of a nominal or ordinal scale.
    #[must_use]
    pub fn levels(&self) -> Option<&[DataValue]> {
        match &self.units {
            Units::Categories(levels) => Some(levels),
            _ => None,
        }
    }

    /// Legend values and labels, for properties that have legends.
    #[must_use]
    pub fn legend(&self) -> Option<&ScaleLegend> {
        self.legend.as_ref()
    }

    /// Unit conversion: level index, day number, 0/1 or the number itself.
    #[must_use]
    pub fn convert(&self, value: &DataValue) -> f64 {
        match &self.units {
            Units::Numeric | Units::Temporal => value.as_f64().unwrap_or(f64::NAN),
            Units::Categories(levels) => {
                levels.iter().position(|l| l == value).map_or(f64::NAN, |i| i as f64)
            }
            Units::Boolean => match value {
                DataValue::Null => f64::NAN,
                DataValue::Number(n) if n.is_nan() => f64::NAN,
                DataValue::Text(s) => f64::from(u8::from(!s.is_empty())),
                other => other.as_f64().map_or(f64::NAN, |v| f64::from(u8::from(v != 0.0))),
            },
        }
    }

    /// The numeric part of the pipeline: units, transform, normalization.
    #[must_use]
    pub fn forward(&self, data: &Column) -> Vec<f64> {
        data.iter()
            .map(|v| {
                let x = self.trans.forward(self.convert(v));
                match self.normalize {
                    Some((a, b)) => (x - a) / b,
                    None => x,
                }
            })
            .collect()
    }

    /// Undo the value transform of a coordinate (normalization is never
    /// applied to coordinates).
    #[must_use]
    pub fn inverse(&self, x: f64) -> f64 {
        self.trans.inverse(x)
    }

    /// Map data to property values.
    ///
    /// # Errors
    ///
    /// For identity scales, returns an error when a raw value is not a
    /// valid value of the property.
    pub fn map(&self, data: &Column) -> Result<Vec<PropValue>> {
        if self.kind == ScaleKind::Identity {
            return data
                .iter()
                .map(|v| self.prop.standardize(&PropValue::from(v), &self.theme))
                .collect();
        }
        Ok(self.forward(data).into_iter().map(|x| self.mapping.apply(x)).collect())
    }

    /// Distance between adjacent positions, used to size bars and dodges.
    #[must_use]
    pub fn spacing(&self, values: &[f64]) -> f64 {
        if self.kind.is_discrete() {
            return 1.0;
        }
        let mut unique: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        unique.sort_by(f64::total_cmp);
        unique.dedup();
        unique
            .windows(2)
            .map(|w| w[1] - w[0])
            .fold(None, |acc: Option<f64>, d| Some(acc.map_or(d, |a| a.min(d))))
            .unwrap_or(1.0)
    }

    fn major_locator(&self) -> Locator {
        match self.kind {
            ScaleKind::Temporal => Locator::Date { upto: self.ticks.upto },
            _ => Locator::continuous(&self.ticks, self.trans).0,
        }
    }

    fn formatter(&self) -> Formatter {
        match self.kind {
            ScaleKind::Temporal if self.labels.like.is_none() => {
                Formatter::Date { concise: self.labels.concise }
            }
            _ => Formatter::continuous(&self.labels, self.trans),
        }
    }

    /// Default view limits of a discrete axis: each level gets a unit slot,
    /// the first level on the left (x) or at the top (y). Boolean axes put
    /// `True` first.
    #[must_use]
    pub fn discrete_limits(&self, axis: &str) -> Option<(f64, f64)> {
        let n = match (&self.units, self.kind) {
            (Units::Categories(levels), _) => levels.len(),
            (_, ScaleKind::Boolean) => 2,
            _ => return None,
        };
        let (lo, hi) = (-0.5, n as f64 - 0.5);
        let flip = match self.kind {
            ScaleKind::Boolean => axis == "x",
            _ => axis == "y",
        };
        Some(if flip { (hi, lo) } else { (lo, hi) })
    }

    /// Ticks over the view `[lo, hi]` (data units).
    #[must_use]
    pub fn axis_ticks(&self, lo: f64, hi: f64, space: usize) -> AxisTicks {
        let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
        match (&self.units, self.kind) {
            (Units::Categories(levels), _) => AxisTicks {
                major: levels
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| (*i as f64) >= lo && (*i as f64) <= hi)
                    .map(|(i, level)| Tick { pos: i as f64, label: level.to_string() })
                    .collect(),
                minor: Vec::new(),
            },
            (_, ScaleKind::Boolean) => AxisTicks {
                major: vec![
                    Tick { pos: 0.0, label: "False".to_string() },
                    Tick { pos: 1.0, label: "True".to_string() },
                ],
                minor: Vec::new(),
            },
            _ => {
                let (locator, minor) = match self.kind {
                    ScaleKind::Temporal => (self.major_locator(), None),
                    _ => Locator::continuous(&self.ticks, self.trans),
                };
                let eps = (hi - lo).abs() * 1e-10;
                let locs: Vec<f64> = locator
                    .ticks(lo, hi, space)
                    .into_iter()
                    .filter(|v| *v >= lo - eps && *v <= hi + eps)
                    .collect();
                let labels = self.formatter().format_ticks(&locs);
                let minor = minor
                    .map(|m| {
                        m.ticks(lo, hi, space)
                            .into_iter()
                            .filter(|v| *v >= lo && *v <= hi && !locs.iter().any(|l| (l - v).abs() <= eps))
                            .collect()
                    })
                    .unwrap_or_default();
                AxisTicks {
                    major: locs.into_iter().zip(labels).map(|(pos, label)| Tick { pos, label }).collect(),
                    minor,
                }
            }
        }
    }

    /// Whether this scale's axis draws grid lines.
    #[must_use]
    pub fn has_grid(&self) -> bool {
        !self.kind.is_discrete()
    }

    /// Whether the scale serves a coordinate.
    #[must_use]
    pub fn is_coordinate(&self) -> bool {
        self.prop.kind == PropertyKind::Coordinate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn theme() -> Theme {
        Theme::default()
    }

    #[test]
    fn test_nominal_levels_first_seen() {
        let data = Column::from(vec!["b", "a", "b"]);
        let scale = ScaleSpec::nominal().setup(&data, &Property::get("color"), &theme()).unwrap();
        assert_eq!(scale.levels().unwrap(), &[DataValue::from("b"), DataValue::from("a")]);
        let legend = scale.legend().unwrap();
        assert_eq!(legend.labels, vec!["b", "a"]);
        let mapped = scale.map(&data).unwrap();
        assert_eq!(mapped[0], mapped[2]);
        assert_ne!(mapped[0], mapped[1]);
    }

    #[test]
    fn test_nominal_unknown_value_is_invisible() {
        let data = Column::from(vec!["a"]);
        let scale = ScaleSpec::nominal().setup(&data, &Property::get("color"), &theme()).unwrap();
        let out = scale.map(&Column::from(vec!["zzz"])).unwrap();
        assert!(!out[0].as_color().unwrap().is_visible());
    }

    #[test]
    fn test_boolean_legend_order() {
        let data = Column::from(vec![false, true, false]);
        let scale = ScaleSpec::boolean().setup(&data, &Property::get("color"), &theme()).unwrap();
        let legend = scale.legend().unwrap();
        assert_eq!(legend.values, vec![DataValue::Bool(true), DataValue::Bool(false)]);
        let colors = scale.map(&Column::from(vec![true, false])).unwrap();
        assert_eq!(colors[0], PropValue::Color(theme().color_cycle()[0]));
    }

    #[test]
    fn test_continuous_normalization() {
        let data = Column::from(vec![0.0, 2.0, 4.0]);
        let scale = ScaleSpec::continuous().setup(&data, &Property::get("pointsize"), &theme()).unwrap();
        let sizes: Vec<f64> = scale.map(&Column::from(vec![0.0, 4.0])).unwrap().iter().map(PropValue::as_f64).collect();
        assert_relative_eq!(sizes[0], 2.0);
        assert_relative_eq!(sizes[1], 8.0);
    }

    #[test]
    fn test_continuous_legend_ticks_inside_range() {
        let data = Column::from(vec![0.0, 10.0]);
        let scale = ScaleSpec::continuous().setup(&data, &Property::get("alpha"), &theme()).unwrap();
        let legend = scale.legend().unwrap();
        assert!(!legend.values.is_empty());
        assert!(legend.values.iter().all(|v| (0.0..=10.0).contains(&v.as_f64().unwrap())));
        assert_eq!(legend.values.len(), legend.labels.len());
    }

    #[test]
    fn test_constant_data_does_not_divide_by_zero() {
        let data = Column::from(vec![3.0, 3.0]);
        let scale = ScaleSpec::continuous().setup(&data, &Property::get("color"), &theme()).unwrap();
        let out = scale.map(&data).unwrap();
        assert!(out[0].as_color().unwrap().is_visible());
    }

    #[test]
    fn test_coordinate_log_transform() {
        let data = Column::from(vec![1.0, 10.0, 100.0]);
        let scale = ScaleSpec::continuous().trans("log").setup(&data, &Property::get("x"), &theme()).unwrap();
        assert_eq!(scale.forward(&data), vec![0.0, 1.0, 2.0]);
        assert_relative_eq!(scale.inverse(2.0), 100.0);
    }

    #[test]
    fn test_text_on_continuous_fails() {
        let data = Column::from(vec!["a"]);
        assert!(ScaleSpec::continuous().setup(&data, &Property::get("x"), &theme()).is_err());
    }

    #[test]
    fn test_unknown_transform_fails_at_setup() {
        let data = Column::from(vec![1.0]);
        let spec = ScaleSpec::continuous().trans("cube");
        assert!(spec.setup(&data, &Property::get("x"), &theme()).is_err());
    }

    #[test]
    fn test_spacing() {
        let data = Column::from(vec![0.0, 1.0]);
        let cont = ScaleSpec::continuous().setup(&data, &Property::get("x"), &theme()).unwrap();
        assert_relative_eq!(cont.spacing(&[0.0, 0.5, 2.0, 0.5]), 0.5);
        assert_relative_eq!(cont.spacing(&[3.0]), 1.0);
        let nom = ScaleSpec::nominal().setup(&data, &Property::get("x"), &theme()).unwrap();
        assert_relative_eq!(nom.spacing(&[0.0, 0.1]), 1.0);
    }

    #[test]
    fn test_discrete_limits() {
        let data = Column::from(vec!["a", "b", "c"]);
        let nom = ScaleSpec::nominal().setup(&data, &Property::get("y"), &theme()).unwrap();
        assert_eq!(nom.discrete_limits("x"), Some((-0.5, 2.5)));
        assert_eq!(nom.discrete_limits("y"), Some((2.5, -0.5)));
        let flags = Column::from(vec![true, false]);
        let boolean = ScaleSpec::boolean().setup(&flags, &Property::get("x"), &theme()).unwrap();
        assert_eq!(boolean.discrete_limits("x"), Some((1.5, -0.5)));
        assert_eq!(boolean.discrete_limits("y"), Some((-0.5, 1.5)));
    }

    #[test]
    fn test_axis_ticks_nominal() {
        let data = Column::from(vec!["a", "b"]);
        let scale = ScaleSpec::nominal().setup(&data, &Property::get("x"), &theme()).unwrap();
        let ticks = scale.axis_ticks(-0.5, 1.5, 5);
        assert_eq!(ticks.major.len(), 2);
        assert_eq!(ticks.major[1].label, "b");
    }

    #[test]
    fn test_identity_scale_standardizes() {
        let scale = Scale::identity(&Property::get("color"), &theme());
        let out = scale.map(&Column::from(vec!["red"])).unwrap();
        assert_eq!(out[0], PropValue::Color(Color::rgb(1.0, 0.0, 0.0)));
        assert!(scale.map(&Column::from(vec!["notacolor"])).is_err());
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(32))]

            #[test]
            fn prop_interval_mapping_monotonic(mut values in prop::collection::vec(0.0f64..100.0, 2..20)) {
                values.sort_by(f64::total_cmp);
                let data = Column::from(values.clone());
                let scale = ScaleSpec::continuous().setup(&data, &Property::get("linewidth"), &Theme::default()).unwrap();
                let out: Vec<f64> = scale.map(&data).unwrap().iter().map(PropValue::as_f64).collect();
                prop_assert!(out.windows(2).all(|w| w[0] <= w[1] + 1e-12));
            }
        }
    }
}
