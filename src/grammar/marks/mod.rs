//! Marks: the visual representation of a layer.
//!
//! A mark declares a table of *features* (the properties it can draw, each
//! with a default and a flag saying whether distinct values split the data
//! into separately drawn groups). At draw time every feature is resolved in
//! order of precedence:
//!
//! 1. a value set directly on the mark;
//! 2. the data, mapped through the variable's fitted scale (or passed
//!    through standardized when unscaled);
//! 3. another feature the default depends on (`edgecolor` follows `color`);
//! 4. a theme parameter;
//! 5. the literal default.
//!
//! Colors combine a color feature with an alpha feature, keeping any alpha
//! carried by the color value itself.

mod area;
mod bar;
mod dot;
mod line;
mod text;

use std::fmt;

use indexmap::IndexMap;
use itertools::Itertools;

pub use area::{Area, Band};
pub use bar::{Bar, Bars};
pub use dot::{Dot, Dots};
pub use line::{Dash, Line, Lines, Path, Paths, Range};
pub use text::Text;

use super::backend::{LegendGlyph, RenderBackend};
use super::data::{Column, DataFrame, DataValue};
use super::facet::Dim;
use super::orient::Orient;
use super::properties::{Dash as DashPattern, Marker, PropValue, Property};
use super::rules::categorical_order;
use super::scales::ScaleMap;
use super::subplots::Subplot;
use super::theme::Theme;
use crate::color::Color;
use crate::error::{Error, Result};

/// Generates builder methods that set features directly on a mark.
macro_rules! feature_setters {
    ($($name:ident),* $(,)?) => {
        $(
            #[doc = concat!("Set `", stringify!($name), "` for every element, bypassing any scale.")]
            #[must_use]
            pub fn $name(mut self, value: impl Into<$crate::grammar::properties::PropValue>) -> Self {
                self.features.set(stringify!($name), value.into());
                self
            }
        )*
    };
}
pub(crate) use feature_setters;

// ============================================================================
// Feature tables
// ============================================================================

/// Theme parameters a feature can default to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rc {
    /// `lines.linewidth`
    LinesLinewidth,
    /// `lines.linestyle`
    LinesLinestyle,
    /// `lines.marker`
    LinesMarker,
    /// `lines.markersize`
    LinesMarkersize,
    /// `lines.markeredgewidth`
    LinesMarkeredgewidth,
    /// `patch.linewidth`
    PatchLinewidth,
    /// `patch.edgecolor`
    PatchEdgecolor,
    /// `font.size`
    FontSize,
    /// `scatter.marker`
    ScatterMarker,
}

impl Rc {
    /// Current value in `theme`.
    #[must_use]
    pub fn value(self, theme: &Theme) -> PropValue {
        match self {
            Rc::LinesLinewidth => theme.lines_linewidth.into(),
            Rc::LinesLinestyle => theme.lines_linestyle.as_str().into(),
            Rc::LinesMarker => theme.lines_marker.as_str().into(),
            Rc::LinesMarkersize => theme.lines_markersize.into(),
            Rc::LinesMarkeredgewidth => theme.lines_markeredgewidth.into(),
            Rc::PatchLinewidth => theme.patch_linewidth.into(),
            Rc::PatchEdgecolor => theme.patch_edgecolor.into(),
            Rc::FontSize => theme.font_size.into(),
            Rc::ScatterMarker => theme.scatter_marker.as_str().into(),
        }
    }
}

/// Default of a feature.
#[derive(Debug, Clone, PartialEq)]
pub enum Mappable {
    /// A literal value.
    Val(PropValue),
    /// Whatever another feature resolves to.
    Depend(&'static str),
    /// A theme parameter.
    Rc(Rc),
    /// Computed by the mark once the figure is laid out.
    Auto,
}

impl Mappable {
    fn val(v: impl Into<PropValue>) -> Self {
        Mappable::Val(v.into())
    }
}

/// One row of a feature table.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    /// Fallback when neither set directly nor mapped.
    pub default: Mappable,
    /// Whether distinct values split the data into separately drawn groups.
    pub grouping: bool,
    /// Value set directly on the mark.
    pub value: Option<PropValue>,
}

/// Ordered feature table of a mark.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Features {
    table: IndexMap<&'static str, Feature>,
}

impl Features {
    fn add(mut self, name: &'static str, default: Mappable, grouping: bool) -> Self {
        self.table.insert(name, Feature { default, grouping, value: None });
        self
    }

    /// Add a feature whose values split the data.
    fn grouped(self, name: &'static str, default: Mappable) -> Self {
        self.add(name, default, true)
    }

    /// Add a feature that varies within a drawn group.
    fn ungrouped(self, name: &'static str, default: Mappable) -> Self {
        self.add(name, default, false)
    }

    /// Set a feature directly. Names the mark does not have are ignored.
    pub fn set(&mut self, name: &str, value: PropValue) {
        if let Some(feature) = self.table.get_mut(name) {
            feature.value = Some(value);
        }
    }

    /// Whether the mark has this feature.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.table.contains_key(name)
    }

    /// Whether the feature was set directly.
    #[must_use]
    pub fn is_set(&self, name: &str) -> bool {
        self.table.get(name).is_some_and(|f| f.value.is_some())
    }

    /// Feature definition.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Feature> {
        self.table.get(name)
    }

    /// Names of the features whose values split the data.
    #[must_use]
    pub fn grouping(&self) -> Vec<&'static str> {
        self.table.iter().filter(|(_, f)| f.grouping).map(|(n, _)| *n).collect()
    }

    /// Resolve one feature.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Value`] for a feature the mark lacks or an invalid
    /// direct value, and a [`Error::Compile`] annotated with the variable
    /// when mapping data fails.
    pub fn resolve(&self, source: Source<'_>, name: &str, ctx: &MarkContext<'_>) -> Result<Resolved> {
        let feature = self
            .table
            .get(name)
            .ok_or_else(|| Error::value(format!("{name:?} is not a feature of this mark")))?;
        let prop = Property::get(name);

        if let Some(value) = &feature.value {
            return Ok(Resolved::Scalar(prop.standardize(value, ctx.theme)?));
        }

        if let Some(column) = source.column(name) {
            let mapped = match ctx.scales.get(name) {
                Some(scale) => scale.map(&column),
                None => column
                    .iter()
                    .map(|v| prop.standardize(&PropValue::from(v), ctx.theme))
                    .collect(),
            }
            .map_err(Error::during("Scaling operation", name))?;
            return Ok(match source {
                Source::Frame(_) => Resolved::Vector(mapped),
                Source::Keys(_) => Resolved::Scalar(mapped.into_iter().next().unwrap_or(PropValue::Null)),
            });
        }

        let value = match &feature.default {
            Mappable::Depend(other) => return self.resolve(source, other, ctx),
            Mappable::Rc(rc) => rc.value(ctx.theme),
            Mappable::Val(v) => v.clone(),
            Mappable::Auto => PropValue::Null,
        };
        Ok(Resolved::Scalar(prop.standardize(&value, ctx.theme)?))
    }

    /// Resolve `{prefix}color` and combine it with `{prefix}alpha` (or the
    /// mark-wide `alpha`).
    ///
    /// # Errors
    ///
    /// Propagates resolution errors of either feature.
    pub fn resolve_color(&self, source: Source<'_>, prefix: &str, ctx: &MarkContext<'_>) -> Result<Resolved> {
        let color = self.resolve(source, &format!("{prefix}color"), ctx)?;
        let alpha_name = format!("{prefix}alpha");
        let alpha = if self.contains(&alpha_name) {
            self.resolve(source, &alpha_name, ctx)?
        } else if self.contains("alpha") {
            self.resolve(source, "alpha", ctx)?
        } else {
            Resolved::Scalar(PropValue::Number(1.0))
        };
        Ok(color.zip_with(&alpha, |c, a| {
            let c = c.as_color().unwrap_or_else(Color::invisible);
            let out = if c.alpha.is_some() {
                c
            } else if c.is_visible() {
                c.with_alpha(a.as_f64())
            } else {
                Color::invisible()
            };
            PropValue::Color(out)
        }))
    }
}

/// Where feature values come from.
#[derive(Debug, Clone, Copy)]
pub enum Source<'a> {
    /// One value per row of a table.
    Frame(&'a DataFrame),
    /// Group key levels: one value for the whole group.
    Keys(&'a IndexMap<String, DataValue>),
}

impl Source<'_> {
    fn column(&self, name: &str) -> Option<Column> {
        match self {
            Source::Frame(df) => df.get(name).cloned(),
            Source::Keys(keys) => keys.get(name).map(|v| Column::new([v.clone()])),
        }
    }
}

/// A resolved feature: one value, or one per row.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    /// Same value everywhere.
    Scalar(PropValue),
    /// Per-row values.
    Vector(Vec<PropValue>),
}

impl Resolved {
    /// Value for row `i`.
    #[must_use]
    pub fn get(&self, i: usize) -> &PropValue {
        static NULL: PropValue = PropValue::Null;
        match self {
            Resolved::Scalar(v) => v,
            Resolved::Vector(vs) => vs.get(i).unwrap_or(&NULL),
        }
    }

    /// Numeric value for row `i` (NaN when missing).
    #[must_use]
    pub fn f64(&self, i: usize) -> f64 {
        self.get(i).as_f64()
    }

    /// Color for row `i` (invisible when missing).
    #[must_use]
    pub fn color(&self, i: usize) -> Color {
        self.get(i).as_color().unwrap_or_else(Color::invisible)
    }

    /// Flag for row `i` (false when missing).
    #[must_use]
    pub fn flag(&self, i: usize) -> bool {
        self.get(i).as_bool().unwrap_or(false)
    }

    /// Marker for row `i`.
    #[must_use]
    pub fn marker(&self, i: usize) -> Marker {
        self.get(i).as_marker().unwrap_or(Marker::None)
    }

    /// Dash pattern for row `i` (solid when missing).
    #[must_use]
    pub fn dash(&self, i: usize) -> DashPattern {
        self.get(i).as_dash().cloned().unwrap_or_else(DashPattern::solid)
    }

    /// Text for row `i`.
    #[must_use]
    pub fn text(&self, i: usize) -> String {
        match self.get(i) {
            PropValue::Text(s) => s.clone(),
            PropValue::Number(n) => n.to_string(),
            PropValue::Bool(b) => if *b { "True" } else { "False" }.to_string(),
            _ => String::new(),
        }
    }

    fn zip_with(&self, other: &Resolved, f: impl Fn(&PropValue, &PropValue) -> PropValue) -> Resolved {
        match (self, other) {
            (Resolved::Scalar(a), Resolved::Scalar(b)) => Resolved::Scalar(f(a, b)),
            (Resolved::Vector(a), _) => {
                Resolved::Vector(a.iter().enumerate().map(|(i, v)| f(v, other.get(i))).collect())
            }
            (Resolved::Scalar(a), Resolved::Vector(b)) => {
                Resolved::Vector(b.iter().map(|v| f(a, v)).collect())
            }
        }
    }
}

/// Per-layer state a mark needs while drawing.
#[derive(Debug, Clone, Copy)]
pub struct MarkContext<'a> {
    /// Fitted scales, with `x`/`y` pointing at the current pairing.
    pub scales: &'a ScaleMap,
    /// Style parameters.
    pub theme: &'a Theme,
    /// Layer orientation.
    pub orient: Orient,
    /// Layer index, recorded with every artist.
    pub layer: usize,
}

// ============================================================================
// Mark contract
// ============================================================================

/// A visual representation of layer data.
pub trait Mark: fmt::Debug + Send + Sync {
    /// Feature table.
    fn features(&self) -> &Features;

    /// Whether rows with missing values are kept (as line breaks) instead of
    /// dropped.
    fn keep_na(&self) -> bool {
        false
    }

    /// Names of the features whose values split the data into groups.
    fn grouping_props(&self) -> Vec<&'static str> {
        self.features().grouping()
    }

    /// Orientation implied by the coordinate scales: `y` only when its scale
    /// outranks the `x` scale.
    fn infer_orient(&self, scales: &ScaleMap) -> Orient {
        let x = scales.get("x").map_or(0, |s| s.priority());
        let y = scales.get("y").map_or(0, |s| s.priority());
        if y > x {
            Orient::Y
        } else {
            Orient::X
        }
    }

    /// Draw every split.
    ///
    /// # Errors
    ///
    /// Propagates feature resolution and backend errors.
    fn plot(&self, splits: &SplitGenerator<'_>, ctx: &MarkContext<'_>, backend: &mut dyn RenderBackend) -> Result<()>;

    /// Glyph representing `value` of `variables` in a legend, or `None` when
    /// the mark has no legend representation.
    ///
    /// # Errors
    ///
    /// Propagates feature resolution errors.
    fn legend_artist(
        &self,
        variables: &[String],
        value: &DataValue,
        ctx: &MarkContext<'_>,
    ) -> Result<Option<LegendGlyph>>;
}

/// Key of a legend glyph: every variable mapped to the same level.
pub(crate) fn legend_keys(variables: &[String], value: &DataValue) -> IndexMap<String, DataValue> {
    variables.iter().map(|v| (v.clone(), value.clone())).collect()
}

/// Numeric coordinate column of split data.
pub(crate) fn coordinate(data: &DataFrame, var: &str) -> Result<Vec<f64>> {
    data.numeric(var)
        .ok_or_else(|| Error::value(format!("Mark requires a `{var}` variable")))
}

/// Point in `(x, y)` order from a position along `orient` and a value.
pub(crate) fn oriented(orient: Orient, pos: f64, val: f64) -> (f64, f64) {
    match orient {
        Orient::X => (pos, val),
        Orient::Y => (val, pos),
    }
}

/// `(position, min, max)` of the values at each distinct position, sorted by
/// position.
pub(crate) fn ranges_by_position(pos: &[f64], val: &[f64]) -> Vec<(f64, f64, f64)> {
    let mut rows: Vec<(f64, f64)> =
        pos.iter().copied().zip(val.iter().copied()).filter(|(p, _)| p.is_finite()).collect();
    rows.sort_by(|a, b| a.0.total_cmp(&b.0));
    rows.into_iter()
        .chunk_by(|(p, _)| *p)
        .into_iter()
        .map(|(p, group)| {
            let (lo, hi) = group
                .filter(|(_, v)| v.is_finite())
                .fold((f64::NAN, f64::NAN), |(lo, hi), (_, v)| (v.min(lo), v.max(hi)));
            (p, lo, hi)
        })
        .collect()
}

/// Multiply the alpha of a resolved color by a flag, so unfilled faces
/// become transparent.
pub(crate) fn times_fill(color: Color, fill: bool) -> Color {
    let alpha = color.opacity() * if fill { 1.0 } else { 0.0 };
    if color.is_visible() {
        color.with_alpha(alpha)
    } else {
        color
    }
}

// ============================================================================
// Splitting layer data for drawing
// ============================================================================

/// One drawing unit: a surface, the group key levels and the group rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Split {
    /// Grouping levels, including `col`/`row` levels of the surface.
    pub keys: IndexMap<String, DataValue>,
    /// Rows of the group on this surface.
    pub data: DataFrame,
    /// Surface index.
    pub surface: usize,
}

/// Restartable iteration over subplot × group subsets of a layer.
#[derive(Debug, Clone)]
pub struct SplitGenerator<'a> {
    data: &'a DataFrame,
    views: Vec<&'a Subplot>,
    grouping: Vec<(String, Vec<DataValue>)>,
}

impl<'a> SplitGenerator<'a> {
    /// Split `data` over `views` by the grouping variables present in it.
    /// Level order comes from a scale's explicit order, else from the data.
    #[must_use]
    pub fn new(data: &'a DataFrame, views: Vec<&'a Subplot>, grouping_vars: &[&str], scales: &ScaleMap) -> Self {
        let grouping = grouping_vars
            .iter()
            .filter(|v| !matches!(**v, "col" | "row"))
            .unique()
            .filter_map(|v| {
                let col = data.get(v)?;
                let order = scales.get(*v).and_then(|s| s.order());
                Some(((*v).to_string(), categorical_order(col, order)))
            })
            .collect();
        Self { data, views, grouping }
    }

    /// Grouping variables in effect.
    pub fn grouping_vars(&self) -> impl Iterator<Item = &str> {
        self.grouping.iter().map(|(v, _)| v.as_str())
    }

    /// All non-empty splits, surface by surface, groups in level order.
    ///
    /// With `keep_na`, rows with a missing value stay in place with their
    /// non-grouping columns nulled, so lines break there; otherwise they are
    /// dropped. Infinite numbers count as missing.
    ///
    /// # Errors
    ///
    /// Returns an error when the layer table is malformed.
    pub fn splits(&self, keep_na: bool) -> Result<Vec<Split>> {
        let mut out = Vec::new();
        for view in &self.views {
            let df = self.prepare(view, keep_na)?;
            let subplot_keys: IndexMap<String, DataValue> = [Dim::Col, Dim::Row]
                .into_iter()
                .filter_map(|dim| view.level(dim).map(|l| (dim.var().to_string(), l.clone())))
                .collect();

            if self.grouping.is_empty() || self.grouping.iter().all(|(_, levels)| levels.is_empty()) {
                if df.nrow() > 0 {
                    out.push(Split { keys: subplot_keys, data: df, surface: view.surface });
                }
                continue;
            }

            let mut index: IndexMap<Vec<DataValue>, Vec<usize>> = IndexMap::new();
            for row in 0..df.nrow() {
                let key = self
                    .grouping
                    .iter()
                    .map(|(v, _)| df.get(v).and_then(|c| c.get(row)).cloned().unwrap_or(DataValue::Null))
                    .collect();
                index.entry(key).or_default().push(row);
            }

            for key in self.grouping.iter().map(|(_, levels)| levels.iter().cloned()).multi_cartesian_product() {
                let Some(rows) = index.get(&key) else { continue };
                let mut keys: IndexMap<String, DataValue> =
                    self.grouping.iter().map(|(v, _)| v.clone()).zip(key).collect();
                keys.extend(subplot_keys.clone());
                out.push(Split { keys, data: df.take(rows), surface: view.surface });
            }
        }
        Ok(out)
    }

    fn prepare(&self, view: &Subplot, keep_na: bool) -> Result<DataFrame> {
        let keep: Vec<bool> = (0..self.data.nrow())
            .map(|row| {
                [Dim::Col, Dim::Row].into_iter().all(|dim| match (view.level(dim), self.data.get(dim.var())) {
                    (Some(level), Some(col)) => col.get(row) == Some(level),
                    _ => true,
                })
            })
            .collect();
        let df = self.data.filter(&keep);

        let cleaned: Vec<(String, Vec<DataValue>)> = df
            .iter()
            .map(|(name, col)| {
                let values = col
                    .iter()
                    .map(|v| match v {
                        DataValue::Number(n) if !n.is_finite() => DataValue::Null,
                        other => other.clone(),
                    })
                    .collect();
                (name.to_string(), values)
            })
            .collect();
        let present: Vec<bool> = (0..df.nrow())
            .map(|row| cleaned.iter().all(|(_, values)| !values[row].is_null()))
            .collect();

        let mut out = DataFrame::new();
        for (name, mut values) in cleaned {
            if keep_na {
                if !self.grouping.iter().any(|(v, _)| *v == name) {
                    for (value, ok) in values.iter_mut().zip(&present) {
                        if !ok {
                            *value = DataValue::Null;
                        }
                    }
                }
            } else {
                values = values.into_iter().zip(&present).filter(|(_, ok)| **ok).map(|(v, _)| v).collect();
            }
            out.insert(name, Column::new(values))?;
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::facet::{FacetSpec, PairSpec};
    use crate::grammar::properties::Property;
    use crate::grammar::scales::ScaleSpec;
    use crate::grammar::subplots::Subplots;

    fn single() -> Subplots {
        Subplots::new(&FacetSpec::new(), &IndexMap::new(), &PairSpec::new(), &IndexMap::new()).unwrap()
    }

    fn ctx<'a>(scales: &'a ScaleMap, theme: &'a Theme) -> MarkContext<'a> {
        MarkContext { scales, theme, orient: Orient::X, layer: 0 }
    }

    fn features() -> Features {
        Features::default()
            .grouped("color", Mappable::val("C0"))
            .grouped("alpha", Mappable::val(1.0))
            .ungrouped("edgecolor", Mappable::Depend("color"))
            .ungrouped("edgealpha", Mappable::val(0.5))
            .ungrouped("linewidth", Mappable::Rc(Rc::LinesLinewidth))
            .ungrouped("edgewidth", Mappable::Auto)
    }

    #[test]
    fn test_resolve_precedence() {
        let theme = Theme::default();
        let scales = ScaleMap::new();
        let c = ctx(&scales, &theme);
        let mut f = features();
        let keys = IndexMap::new();

        assert_eq!(f.resolve(Source::Keys(&keys), "linewidth", &c).unwrap(), Resolved::Scalar(1.5.into()));
        assert_eq!(f.resolve(Source::Keys(&keys), "edgewidth", &c).unwrap(), Resolved::Scalar(PropValue::Null));

        let c0 = theme.color("C0").unwrap();
        assert_eq!(f.resolve(Source::Keys(&keys), "edgecolor", &c).unwrap(), Resolved::Scalar(c0.into()));

        f.set("color", "red".into());
        let red = theme.color("red").unwrap();
        assert_eq!(f.resolve(Source::Keys(&keys), "edgecolor", &c).unwrap(), Resolved::Scalar(red.into()));
        assert!(f.resolve(Source::Keys(&keys), "marker", &c).is_err());
    }

    #[test]
    fn test_resolve_maps_data_through_scale() {
        let theme = Theme::default();
        let data = DataFrame::new().column("color", vec!["a", "b", "a"]).unwrap();
        let scale = ScaleSpec::nominal()
            .setup(data.get("color").unwrap(), &Property::get("color"), &theme)
            .unwrap();
        let mut scales = ScaleMap::new();
        scales.insert("color".into(), scale);
        let f = features();
        let res = f.resolve(Source::Frame(&data), "color", &ctx(&scales, &theme)).unwrap();
        assert_eq!(res.color(0), res.color(2));
        assert_ne!(res.color(0), res.color(1));
    }

    #[test]
    fn test_unscaled_data_is_standardized() {
        let theme = Theme::default();
        let scales = ScaleMap::new();
        let data = DataFrame::new().column("color", vec!["notacolor"]).unwrap();
        let err = features().resolve(Source::Frame(&data), "color", &ctx(&scales, &theme)).unwrap_err();
        assert!(matches!(err, Error::Compile { .. }));
    }

    #[test]
    fn test_resolve_color_alpha() {
        let theme = Theme::default();
        let scales = ScaleMap::new();
        let c = ctx(&scales, &theme);
        let keys = IndexMap::new();
        let mut f = features();

        let face = f.resolve_color(Source::Keys(&keys), "", &c).unwrap().color(0);
        assert_eq!(face.alpha, Some(1.0));
        let edge = f.resolve_color(Source::Keys(&keys), "edge", &c).unwrap().color(0);
        assert_eq!(edge.alpha, Some(0.5));

        f.set("color", Color::rgba(1.0, 0.0, 0.0, 0.3).into());
        let face = f.resolve_color(Source::Keys(&keys), "", &c).unwrap().color(0);
        assert_eq!(face.alpha, Some(0.3));
    }

    #[test]
    fn test_grouping_props() {
        assert_eq!(features().grouping(), vec!["color", "alpha"]);
    }

    fn layer_data() -> DataFrame {
        DataFrame::new()
            .column("x", vec![1.0, 2.0, 3.0, f64::INFINITY])
            .unwrap()
            .column("y", vec![1.0, f64::NAN, 3.0, 4.0])
            .unwrap()
            .column("color", vec!["b", "a", "b", "a"])
            .unwrap()
    }

    #[test]
    fn test_splits_follow_level_order() {
        let subplots = single();
        let data = layer_data();
        let gen = SplitGenerator::new(&data, subplots.iter().collect(), &["color", "group"], &ScaleMap::new());
        let splits = gen.splits(false).unwrap();
        // the `a` rows are all incomplete
        assert_eq!(splits.len(), 1);
        assert_eq!(splits[0].keys["color"], DataValue::from("b"));
        assert_eq!(splits[0].data.numeric("x").unwrap(), vec![1.0, 3.0]);
    }

    #[test]
    fn test_splits_keep_na_nulls_rows() {
        let subplots = single();
        let data = layer_data();
        let gen = SplitGenerator::new(&data, subplots.iter().collect(), &["color"], &ScaleMap::new());
        let splits = gen.splits(true).unwrap();
        assert_eq!(splits.len(), 2);
        let a = &splits[1];
        assert_eq!(a.keys["color"], DataValue::from("a"));
        assert_eq!(a.data.nrow(), 2);
        assert!(a.data.get("x").unwrap().iter().all(DataValue::is_null));
        // restartable
        assert_eq!(gen.splits(true).unwrap(), splits);
    }

    #[test]
    fn test_splits_per_facet() {
        let data = DataFrame::new()
            .column("x", vec![1.0, 2.0, 3.0])
            .unwrap()
            .column("y", vec![1.0, 2.0, 3.0])
            .unwrap()
            .column("col", vec!["p", "q", "p"])
            .unwrap();
        let facet = FacetSpec::new().col("c");
        let mut levels = IndexMap::new();
        levels.insert(Dim::Col, vec![DataValue::from("p"), DataValue::from("q")]);
        let subplots = Subplots::new(&facet, &levels, &PairSpec::new(), &IndexMap::new()).unwrap();
        let gen = SplitGenerator::new(&data, subplots.iter().collect(), &["col", "row", "group"], &ScaleMap::new());
        let splits = gen.splits(false).unwrap();
        assert_eq!(splits.len(), 2);
        assert_eq!(splits[0].data.nrow(), 2);
        assert_eq!(splits[1].surface, 1);
        assert_eq!(splits[1].keys["col"], DataValue::from("q"));
    }
}
