//! The declarative plot builder.
//!
//! A [`Plot`] records data, variable assignments, layers and figure options.
//! Specification errors that need no data (facet/pair collisions, bad wrap
//! counts) are raised by the builder methods themselves. [`Plot::try_new`]
//! binds the plot-level variables on construction; the chained builder
//! defers that check to [`Plot::validate`] or [`Plot::compile`].
//!
//! ```
//! use trueno_plot::prelude::*;
//!
//! let data = DataFrame::new()
//!     .column("x", vec![1.0, 2.0, 3.0]).unwrap()
//!     .column("y", vec![2.0, 4.0, 3.0]).unwrap();
//! let plot = Plot::new().data(data).x("x").y("y").add(Dot::new());
//! let compiled = plot.compile().unwrap();
//! assert_eq!(compiled.scene().artist_count(), 1);
//! ```

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use super::bind::{PlotData, VariableSpec, Variables};
use super::data::{DataFrame, DataValue};
use super::facet::{FacetSpec, PairSpec};
use super::marks::Mark;
use super::moves::Move;
use super::orient::Orient;
use super::scales::ScaleArg;
use super::stats::Stat;
use super::subplots::{check_dimension_uniqueness, Share};
use super::theme::ThemeOverrides;
use crate::error::Result;

// ============================================================================
// Labels
// ============================================================================

/// A manual label: fixed text, or a function of the automatic label.
#[derive(Clone)]
pub enum Label {
    /// Replace the automatic label.
    Text(String),
    /// Transform the automatic label.
    Func(Arc<dyn Fn(&str) -> String + Send + Sync>),
}

impl Label {
    /// Label computed from the automatic one.
    pub fn func(f: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
        Label::Func(Arc::new(f))
    }

    /// Apply to the automatic label, if there is one.
    #[must_use]
    pub fn resolve(&self, auto: Option<&str>) -> String {
        match (self, auto) {
            (Label::Text(text), _) => text.clone(),
            (Label::Func(f), Some(auto)) => f(auto),
            (Label::Func(_), None) => String::new(),
        }
    }
}

impl fmt::Debug for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Label::Func(_) => f.write_str("Func(..)"),
        }
    }
}

impl From<&str> for Label {
    fn from(text: &str) -> Self {
        Label::Text(text.to_string())
    }
}

impl From<String> for Label {
    fn from(text: String) -> Self {
        Label::Text(text)
    }
}

// ============================================================================
// Layers
// ============================================================================

/// One layer: a mark with its optional stat, moves and variables.
#[derive(Debug, Clone)]
pub struct Layer {
    pub(crate) mark: Arc<dyn Mark>,
    pub(crate) stat: Option<Arc<dyn Stat>>,
    pub(crate) moves: Vec<Arc<dyn Move>>,
    pub(crate) orient: Option<Orient>,
    pub(crate) legend: bool,
    pub(crate) label: Option<String>,
    pub(crate) data: Option<Arc<DataFrame>>,
    pub(crate) variables: Variables,
}

impl Layer {
    /// Layer drawing `mark`.
    pub fn new(mark: impl Mark + 'static) -> Self {
        Self {
            mark: Arc::new(mark),
            stat: None,
            moves: Vec::new(),
            orient: None,
            legend: true,
            label: None,
            data: None,
            variables: Variables::new(),
        }
    }

    /// Transform the data with a stat before drawing.
    #[must_use]
    pub fn stat(mut self, stat: impl Stat + 'static) -> Self {
        self.stat = Some(Arc::new(stat));
        self
    }

    /// Append a position adjustment; moves run in the order added.
    #[must_use]
    pub fn adjust(mut self, adjustment: impl Move + 'static) -> Self {
        self.moves.push(Arc::new(adjustment));
        self
    }

    /// Fix the orientation instead of inferring it from the scales.
    #[must_use]
    pub fn orient(mut self, orient: Orient) -> Self {
        self.orient = Some(orient);
        self
    }

    /// Whether the layer contributes to the legend.
    #[must_use]
    pub fn legend(mut self, show: bool) -> Self {
        self.legend = show;
        self
    }

    /// Add a legend entry for the layer itself.
    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Data for this layer only.
    #[must_use]
    pub fn data(mut self, data: impl Into<Arc<DataFrame>>) -> Self {
        self.data = Some(data.into());
        self
    }

    /// Assign a variable for this layer; [`VariableSpec::Null`] drops an
    /// inherited one.
    #[must_use]
    pub fn var(mut self, name: impl Into<String>, spec: impl Into<VariableSpec>) -> Self {
        self.variables.insert(name.into(), spec.into());
        self
    }

    /// Assign `x`.
    #[must_use]
    pub fn x(self, spec: impl Into<VariableSpec>) -> Self {
        self.var("x", spec)
    }

    /// Assign `y`.
    #[must_use]
    pub fn y(self, spec: impl Into<VariableSpec>) -> Self {
        self.var("y", spec)
    }

    /// Assign `color`.
    #[must_use]
    pub fn color(self, spec: impl Into<VariableSpec>) -> Self {
        self.var("color", spec)
    }
}

impl<M: Mark + 'static> From<M> for Layer {
    fn from(mark: M) -> Self {
        Layer::new(mark)
    }
}

// ============================================================================
// Plot
// ============================================================================

/// Declarative plot specification.
#[derive(Debug, Clone, Default)]
pub struct Plot {
    pub(crate) data: Option<Arc<DataFrame>>,
    pub(crate) variables: Variables,
    pub(crate) layers: Vec<Layer>,
    pub(crate) scales: IndexMap<String, ScaleArg>,
    pub(crate) shares: IndexMap<String, Share>,
    pub(crate) limits: IndexMap<String, (DataValue, DataValue)>,
    pub(crate) labels: IndexMap<String, Label>,
    pub(crate) facet: FacetSpec,
    pub(crate) pair: PairSpec,
    pub(crate) size: Option<(u32, u32)>,
    pub(crate) theme: ThemeOverrides,
}

impl Plot {
    /// Empty plot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Plot over `data` with plot-level `variables`, bound immediately.
    ///
    /// ```
    /// use trueno_plot::prelude::*;
    ///
    /// let data = DataFrame::new().column("a", vec![1.0, 2.0]).unwrap();
    /// assert!(Plot::try_new(data.clone(), [("x", "a")]).is_ok());
    /// assert!(matches!(Plot::try_new(data, [("x", "b")]), Err(Error::Binding { .. })));
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Binding`] when a column is missing from
    /// `data` or a vector's length disagrees with it.
    pub fn try_new<K, V>(data: impl Into<Arc<DataFrame>>, variables: impl IntoIterator<Item = (K, V)>) -> Result<Self>
    where
        K: Into<String>,
        V: Into<VariableSpec>,
    {
        let plot = variables.into_iter().fold(Self::new().data(data), |plot, (k, v)| plot.var(k, v));
        plot.validate()?;
        Ok(plot)
    }

    /// Bind the plot-level variables against the plot data without compiling.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Binding`] for the first variable that does not
    /// resolve.
    pub fn validate(&self) -> Result<()> {
        PlotData::new(self.data.as_ref(), &self.variables).map(|_| ())
    }

    /// Source data shared by all layers.
    #[must_use]
    pub fn data(mut self, data: impl Into<Arc<DataFrame>>) -> Self {
        self.data = Some(data.into());
        self
    }

    /// Assign a plot-level variable.
    #[must_use]
    pub fn var(mut self, name: impl Into<String>, spec: impl Into<VariableSpec>) -> Self {
        self.variables.insert(name.into(), spec.into());
        self
    }

    /// Assign `x`.
    #[must_use]
    pub fn x(self, spec: impl Into<VariableSpec>) -> Self {
        self.var("x", spec)
    }

    /// Assign `y`.
    #[must_use]
    pub fn y(self, spec: impl Into<VariableSpec>) -> Self {
        self.var("y", spec)
    }

    /// Assign `color`.
    #[must_use]
    pub fn color(self, spec: impl Into<VariableSpec>) -> Self {
        self.var("color", spec)
    }

    /// Add a layer drawing `mark` with no stat or moves.
    #[must_use]
    pub fn add(mut self, mark: impl Mark + 'static) -> Self {
        self.layers.push(Layer::new(mark));
        self
    }

    /// Add a fully specified layer.
    #[must_use]
    pub fn layer(mut self, layer: impl Into<Layer>) -> Self {
        self.layers.push(layer.into());
        self
    }

    /// Produce subplots by pairing multiple `x` and/or `y` variables.
    ///
    /// # Errors
    ///
    /// Returns an error when the pairing is invalid on its own or collides
    /// with the faceting.
    pub fn pair(mut self, pair: PairSpec) -> Result<Self> {
        pair.validate()?;
        check_dimension_uniqueness(&self.facet, &pair)?;
        self.pair = pair;
        Ok(self)
    }

    /// Produce subplots with conditional subsets of the data.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Configuration`] when the faceting is invalid
    /// on its own or collides with the pairing.
    pub fn facet(mut self, facet: FacetSpec) -> Result<Self> {
        facet.validate()?;
        check_dimension_uniqueness(&facet, &self.pair)?;
        self.facet = facet;
        Ok(self)
    }

    /// Control the mapping of a variable to its property.
    #[must_use]
    pub fn scale(mut self, var: impl Into<String>, arg: impl Into<ScaleArg>) -> Self {
        self.scales.insert(var.into(), arg.into());
        self
    }

    /// Control axis sharing across subplots (`x` or `y`).
    #[must_use]
    pub fn share(mut self, axis: impl Into<String>, share: impl Into<Share>) -> Self {
        self.shares.insert(axis.into(), share.into());
        self
    }

    /// Fix the view limits of a coordinate. A null bound stays automatic;
    /// text bounds refer to levels of a nominal axis.
    #[must_use]
    pub fn limit(mut self, var: impl Into<String>, lo: impl Into<DataValue>, hi: impl Into<DataValue>) -> Self {
        self.limits.insert(var.into(), (lo.into(), hi.into()));
        self
    }

    /// Label an axis or legend variable, or a facet dimension (`col`, `row`).
    #[must_use]
    pub fn label(mut self, var: impl Into<String>, label: impl Into<Label>) -> Self {
        self.labels.insert(var.into(), label.into());
        self
    }

    /// Title of an unfaceted plot, or a format for facet titles.
    #[must_use]
    pub fn title(self, label: impl Into<Label>) -> Self {
        self.label("title", label)
    }

    /// Title of the section holding layer labels.
    #[must_use]
    pub fn legend_title(self, label: impl Into<Label>) -> Self {
        self.label("legend", label)
    }

    /// Figure size in pixels.
    #[must_use]
    pub fn layout(mut self, width: u32, height: u32) -> Self {
        self.size = Some((width, height));
        self
    }

    /// Style overrides applied on top of the configured theme.
    #[must_use]
    pub fn theme(mut self, overrides: ThemeOverrides) -> Self {
        self.theme = overrides;
        self
    }

    /// Number of layers.
    #[must_use]
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Resolve a label for `var` against its automatic value.
    pub(crate) fn resolve_label(&self, var: &str, auto: Option<&str>) -> String {
        match self.labels.get(var) {
            Some(label) => label.resolve(auto),
            None => auto.unwrap_or_default().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::grammar::marks::Dot;
    use crate::grammar::moves::{Dodge, Stack};
    use crate::grammar::stats::Hist;

    #[test]
    fn test_builder_records_layers() {
        let plot = Plot::new()
            .x("a")
            .add(Dot::new())
            .layer(Layer::new(Dot::new()).stat(Hist::new()).adjust(Dodge::new()).adjust(Stack).label("h"));
        assert_eq!(plot.layer_count(), 2);
        assert_eq!(plot.layers[1].moves.len(), 2);
        assert_eq!(plot.layers[1].label.as_deref(), Some("h"));
        assert!(plot.layers[0].stat.is_none());
    }

    #[test]
    fn test_facet_pair_collision_is_eager() {
        let plot = Plot::new().facet(FacetSpec::new().col("g")).unwrap();
        let err = plot.pair(PairSpec::new().x(["a", "b"])).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_invalid_facet_rejected() {
        let err = Plot::new().facet(FacetSpec::new().col("a").row("b").wrap(2)).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_try_new_binds_eagerly() {
        let data = DataFrame::new().column("a", vec![1.0, 2.0, 3.0]).unwrap();
        let plot = Plot::try_new(data.clone(), [("x", "a")]).unwrap();
        assert!(plot.validate().is_ok());

        let err = Plot::try_new(data.clone(), [("x", "missing")]).unwrap_err();
        assert!(matches!(err, Error::Binding { ref variable, .. } if variable == "x"));

        let short = VariableSpec::vector(vec![1.0, 2.0]);
        let err = Plot::try_new(data, [("y", short)]).unwrap_err();
        assert!(matches!(err, Error::Binding { .. }));
    }

    #[test]
    fn test_validate_without_data_rejects_column_names() {
        let err = Plot::new().x("a").validate().unwrap_err();
        assert!(matches!(err, Error::Binding { .. }));
        assert!(Plot::new().x(vec![1.0, 2.0]).validate().is_ok());
    }

    #[test]
    fn test_label_resolution() {
        let plot = Plot::new().label("x", "Width").label("y", Label::func(|s: &str| s.to_uppercase()));
        assert_eq!(plot.resolve_label("x", Some("w")), "Width");
        assert_eq!(plot.resolve_label("y", Some("h")), "H");
        assert_eq!(plot.resolve_label("y", None), "");
        assert_eq!(plot.resolve_label("color", Some("g")), "g");
        assert_eq!(plot.resolve_label("color", None), "");
    }
}
