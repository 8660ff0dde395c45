//! Faceting and pairing specifications.
//!
//! Both split the figure into small multiples. Faceting conditions each
//! subplot on a level of a `col`/`row` variable; pairing substitutes a
//! different variable into the `x` or `y` role of each subplot.

use indexmap::IndexMap;

use super::bind::{VariableSpec, Variables};
use super::data::DataValue;
use crate::error::{Error, Result};

/// Figure dimension driven by a facet variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dim {
    /// Subplot columns.
    Col,
    /// Subplot rows.
    Row,
}

impl Dim {
    /// Variable name of this dimension.
    #[must_use]
    pub fn var(self) -> &'static str {
        match self {
            Dim::Col => "col",
            Dim::Row => "row",
        }
    }
}

/// Faceting specification.
#[derive(Debug, Clone, Default)]
pub struct FacetSpec {
    col: Option<VariableSpec>,
    row: Option<VariableSpec>,
    order: Option<Vec<DataValue>>,
    col_order: Option<Vec<DataValue>>,
    row_order: Option<Vec<DataValue>>,
    wrap: Option<usize>,
}

impl FacetSpec {
    /// No faceting.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Facet subplot columns on a variable.
    #[must_use]
    pub fn col(mut self, spec: impl Into<VariableSpec>) -> Self {
        self.col = Some(spec.into());
        self
    }

    /// Facet subplot rows on a variable.
    #[must_use]
    pub fn row(mut self, spec: impl Into<VariableSpec>) -> Self {
        self.row = Some(spec.into());
        self
    }

    /// Level order of the single faceted dimension.
    #[must_use]
    pub fn order<T: Into<DataValue>>(mut self, order: impl IntoIterator<Item = T>) -> Self {
        self.order = Some(order.into_iter().map(Into::into).collect());
        self
    }

    /// Level order of the column dimension.
    #[must_use]
    pub fn col_order<T: Into<DataValue>>(mut self, order: impl IntoIterator<Item = T>) -> Self {
        self.col_order = Some(order.into_iter().map(Into::into).collect());
        self
    }

    /// Level order of the row dimension.
    #[must_use]
    pub fn row_order<T: Into<DataValue>>(mut self, order: impl IntoIterator<Item = T>) -> Self {
        self.row_order = Some(order.into_iter().map(Into::into).collect());
        self
    }

    /// Wrap the single faceted dimension after this many subplots.
    #[must_use]
    pub fn wrap(mut self, wrap: usize) -> Self {
        self.wrap = Some(wrap);
        self
    }

    /// Check the specification on its own.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] for a shared order with both
    /// dimensions faceted, for wrapping with both dimensions faceted, or for
    /// a zero wrap.
    pub fn validate(&self) -> Result<()> {
        let both = self.col.is_some() && self.row.is_some();
        if both && self.order.is_some() {
            return Err(Error::config(
                "When faceting on both col and row, a single `order` is ambiguous; \
                 use col_order and/or row_order instead",
            ));
        }
        if both && self.wrap.is_some() {
            return Err(Error::config("Cannot wrap facets when specifying both `col` and `row`."));
        }
        if self.wrap == Some(0) {
            return Err(Error::config("`wrap` must be at least 1"));
        }
        Ok(())
    }

    /// Whether a dimension is faceted.
    #[must_use]
    pub fn has(&self, dim: Dim) -> bool {
        match dim {
            Dim::Col => self.col.is_some(),
            Dim::Row => self.row.is_some(),
        }
    }

    /// Explicit level order of a dimension.
    #[must_use]
    pub fn order_of(&self, dim: Dim) -> Option<&[DataValue]> {
        let (own, other) = match dim {
            Dim::Col => (&self.col_order, self.row.is_none()),
            Dim::Row => (&self.row_order, self.col.is_none()),
        };
        own.as_deref().or(if other && self.has(dim) { self.order.as_deref() } else { None })
    }

    /// Wrap count.
    #[must_use]
    pub fn wrap_count(&self) -> Option<usize> {
        self.wrap
    }

    /// The `col`/`row` assignments to bind alongside the plot variables.
    #[must_use]
    pub fn variables(&self) -> Variables {
        let mut vars = Variables::new();
        if let Some(col) = &self.col {
            vars.insert("col".into(), col.clone());
        }
        if let Some(row) = &self.row {
            vars.insert("row".into(), row.clone());
        }
        vars
    }
}

/// Pairing specification.
#[derive(Debug, Clone)]
pub struct PairSpec {
    x: Vec<VariableSpec>,
    y: Vec<VariableSpec>,
    wrap: Option<usize>,
    cross: bool,
}

impl Default for PairSpec {
    fn default() -> Self {
        Self { x: Vec::new(), y: Vec::new(), wrap: None, cross: true }
    }
}

impl PairSpec {
    /// No pairing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Variables substituted into the x role, one per subplot column.
    #[must_use]
    pub fn x<T: Into<VariableSpec>>(mut self, vars: impl IntoIterator<Item = T>) -> Self {
        self.x = vars.into_iter().map(Into::into).collect();
        self
    }

    /// Variables substituted into the y role, one per subplot row.
    #[must_use]
    pub fn y<T: Into<VariableSpec>>(mut self, vars: impl IntoIterator<Item = T>) -> Self {
        self.y = vars.into_iter().map(Into::into).collect();
        self
    }

    /// Wrap the single paired dimension after this many subplots.
    #[must_use]
    pub fn wrap(mut self, wrap: usize) -> Self {
        self.wrap = Some(wrap);
        self
    }

    /// With `false`, pair the i-th x with the i-th y instead of taking all
    /// combinations.
    #[must_use]
    pub fn cross(mut self, cross: bool) -> Self {
        self.cross = cross;
        self
    }

    /// Check the specification on its own.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Value`] when `cross` is off and the lists differ in
    /// length, and [`Error::Configuration`] for a zero wrap.
    pub fn validate(&self) -> Result<()> {
        if !self.cross && self.x.len() != self.y.len() {
            return Err(Error::value("Lengths of the `x` and `y` lists must match with cross=False"));
        }
        if self.wrap == Some(0) {
            return Err(Error::config("`wrap` must be at least 1"));
        }
        Ok(())
    }

    /// Whether nothing is paired.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.x.is_empty() && self.y.is_empty()
    }

    /// Whether all combinations are drawn.
    #[must_use]
    pub fn is_cross(&self) -> bool {
        self.cross
    }

    /// Wrap count.
    #[must_use]
    pub fn wrap_count(&self) -> Option<usize> {
        self.wrap
    }

    /// Keys (`x0`, `x1`, ...) of the paired variables on one axis, empty
    /// when the axis is not paired.
    #[must_use]
    pub fn structure(&self, axis: &str) -> Vec<String> {
        let vars = if axis == "x" { &self.x } else { &self.y };
        (0..vars.len()).map(|i| format!("{axis}{i}")).collect()
    }

    /// Whether an axis is paired.
    #[must_use]
    pub fn pairs(&self, axis: &str) -> bool {
        !self.structure(axis).is_empty()
    }

    /// Paired assignments keyed by their numbered variable names.
    #[must_use]
    pub fn variables(&self) -> Variables {
        let mut vars = IndexMap::new();
        for (axis, specs) in [("x", &self.x), ("y", &self.y)] {
            for (i, spec) in specs.iter().enumerate() {
                vars.insert(format!("{axis}{i}"), spec.clone());
            }
        }
        vars
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_facet_order_resolution() {
        let f = FacetSpec::new().col("category").order(["b", "a"]);
        assert_eq!(f.order_of(Dim::Col), Some(&[DataValue::from("b"), DataValue::from("a")][..]));
        assert_eq!(f.order_of(Dim::Row), None);

        let g = FacetSpec::new().col("c").row("r").row_order(["z"]);
        assert_eq!(g.order_of(Dim::Col), None);
        assert_eq!(g.order_of(Dim::Row).map(<[DataValue]>::len), Some(1));
    }

    #[test]
    fn test_facet_validation() {
        assert!(FacetSpec::new().col("a").wrap(3).validate().is_ok());
        let err = FacetSpec::new().col("a").row("b").wrap(3).validate().unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        let err = FacetSpec::new().col("a").row("b").order(["x"]).validate().unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_pair_structure() {
        let p = PairSpec::new().x(["a", "b"]).y(["c"]);
        assert_eq!(p.structure("x"), vec!["x0", "x1"]);
        assert_eq!(p.structure("y"), vec!["y0"]);
        let vars = p.variables();
        assert_eq!(vars.keys().collect::<Vec<_>>(), vec!["x0", "x1", "y0"]);
        assert_eq!(vars["x1"], VariableSpec::column("b"));
    }

    #[test]
    fn test_uncrossed_pair_lengths() {
        let err = PairSpec::new().x(["a", "b"]).y(["c"]).cross(false).validate().unwrap_err();
        assert!(matches!(err, Error::Value(_)));
        assert!(PairSpec::new().x(["a"]).y(["c"]).cross(false).validate().is_ok());
    }
}
