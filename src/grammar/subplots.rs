//! Subplot grid layout.
//!
//! Turns the facet and pair specifications into a grid of cells, each
//! knowing which facet levels and which coordinate variables it shows and
//! where it sits relative to the grid edges.

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;

use super::data::DataValue;
use super::facet::{Dim, FacetSpec, PairSpec};
use crate::error::{Error, Result};

/// Axis sharing across subplots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Share {
    /// One scale for the whole grid.
    #[default]
    All,
    /// Independent scales per subplot.
    None,
    /// Shared along each grid column.
    Col,
    /// Shared along each grid row.
    Row,
}

impl From<bool> for Share {
    fn from(shared: bool) -> Self {
        if shared {
            Share::All
        } else {
            Share::None
        }
    }
}

impl FromStr for Share {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "all" | "true" => Ok(Share::All),
            "none" | "false" => Ok(Share::None),
            "col" => Ok(Share::Col),
            "row" => Ok(Share::Row),
            _ => Err(Error::config(format!("Unknown sharing {s:?}; use all, none, col or row"))),
        }
    }
}

impl fmt::Display for Share {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Share::All => "all",
            Share::None => "none",
            Share::Col => "col",
            Share::Row => "row",
        })
    }
}

/// Reject specifications that facet and pair on (or wrap into) the same
/// figure dimension. Needs no data.
///
/// # Errors
///
/// Returns [`Error::Configuration`] describing the collision.
pub fn check_dimension_uniqueness(facet: &FacetSpec, pair: &PairSpec) -> Result<()> {
    let mut err = None;
    if facet.wrap_count().is_some() && facet.has(Dim::Col) && facet.has(Dim::Row) {
        err = Some("Cannot wrap facets when specifying both `col` and `row`.".to_string());
    } else if pair.wrap_count().is_some()
        && pair.is_cross()
        && pair.structure("x").len() > 1
        && pair.structure("y").len() > 1
    {
        err = Some("Cannot wrap subplots when pairing on both `x` and `y`.".to_string());
    }

    for (axis, multi, wrap) in [("x", Dim::Col, Dim::Row), ("y", Dim::Row, Dim::Col)] {
        if !pair.pairs(axis) {
            continue;
        }
        let name = |d: Dim| if d == Dim::Col { "columns" } else { "rows" };
        if facet.has(multi) {
            err = Some(format!("Cannot facet the {} while pairing on `{axis}`.", name(multi)));
        } else if facet.has(wrap) && facet.wrap_count().is_some() {
            err = Some(format!("Cannot wrap the {} while pairing on `{axis}`.", name(wrap)));
        } else if facet.has(wrap) && pair.wrap_count().is_some() {
            err = Some(format!("Cannot wrap the {} while faceting the {}.", name(multi), name(wrap)));
        }
    }
    err.map_or(Ok(()), |msg| Err(Error::Configuration(msg)))
}

/// One cell of the subplot grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Subplot {
    /// Index of the drawing surface: the cell's rank in row-major order.
    pub surface: usize,
    /// Grid position.
    pub grid_row: usize,
    /// Grid position.
    pub grid_col: usize,
    /// Column facet level, if faceted on columns.
    pub col: Option<DataValue>,
    /// Row facet level, if faceted on rows.
    pub row: Option<DataValue>,
    /// Coordinate variable shown on the x axis (`x` or a paired `x0`, ...).
    pub x: String,
    /// Coordinate variable shown on the y axis.
    pub y: String,
    /// On the left edge of the grid.
    pub left: bool,
    /// On the right edge of the grid.
    pub right: bool,
    /// On the top edge of the grid.
    pub top: bool,
    /// On the bottom edge of the grid.
    pub bottom: bool,
}

impl Subplot {
    /// Coordinate variable for an axis (`"x"` or `"y"`).
    #[must_use]
    pub fn coord(&self, axis: &str) -> &str {
        if axis == "x" {
            &self.x
        } else {
            &self.y
        }
    }

    /// Facet level of a dimension.
    #[must_use]
    pub fn level(&self, dim: Dim) -> Option<&DataValue> {
        match dim {
            Dim::Col => self.col.as_ref(),
            Dim::Row => self.row.as_ref(),
        }
    }
}

/// The laid-out subplot grid.
#[derive(Debug, Clone)]
pub struct Subplots {
    nrows: usize,
    ncols: usize,
    n_subplots: usize,
    wrap: Option<usize>,
    wrap_dim: Dim,
    sharex: Share,
    sharey: Share,
    cells: Vec<Subplot>,
}

impl Subplots {
    /// Lay out the grid.
    ///
    /// `levels` holds the resolved facet levels per faceted dimension;
    /// `shares` holds explicit per-axis sharing, overriding the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] for facet/pair dimension collisions.
    pub fn new(
        facet: &FacetSpec,
        levels: &IndexMap<Dim, Vec<DataValue>>,
        pair: &PairSpec,
        shares: &IndexMap<String, Share>,
    ) -> Result<Self> {
        check_dimension_uniqueness(facet, pair)?;

        // Grid dimensions: facet levels, or one slot per paired variable.
        let mut dims: IndexMap<Dim, Vec<Option<DataValue>>> = IndexMap::new();
        for (dim, axis) in [(Dim::Col, "x"), (Dim::Row, "y")] {
            let slots = match levels.get(&dim).filter(|_| facet.has(dim)) {
                Some(lv) => lv.iter().cloned().map(Some).collect(),
                None if pair.pairs(axis) => vec![None; pair.structure(axis).len()],
                None => vec![None],
            };
            dims.insert(dim, slots);
        }
        let mut ncols = dims[&Dim::Col].len();
        let mut nrows = if pair.is_cross() { dims[&Dim::Row].len() } else { 1 };
        let mut n_subplots = ncols * nrows;

        let wrap = facet.wrap_count().or(pair.wrap_count());
        let wrap_dim = if nrows > 1 { Dim::Row } else { Dim::Col };
        if let Some(wrap) = wrap {
            let n = if wrap_dim == Dim::Row { nrows } else { ncols };
            let flow = n.div_ceil(wrap);
            match wrap_dim {
                Dim::Row => {
                    nrows = nrows.min(wrap);
                    ncols = flow;
                }
                Dim::Col => {
                    ncols = ncols.min(wrap);
                    nrows = flow;
                }
            }
            n_subplots = n;
        }

        let default_share = |axis: &str, along: Share| {
            if pair.pairs(axis) {
                if wrap.is_none() && pair.is_cross() {
                    along
                } else {
                    Share::None
                }
            } else {
                Share::All
            }
        };
        let sharex = shares.get("x").copied().unwrap_or_else(|| default_share("x", Share::Col));
        let sharey = shares.get("y").copied().unwrap_or_else(|| default_share("y", Share::Row));

        let mut layout = Self { nrows, ncols, n_subplots, wrap, wrap_dim, sharex, sharey, cells: Vec::new() };
        layout.cells = layout.build_cells(&dims, pair);
        Ok(layout)
    }

    fn build_cells(&self, dims: &IndexMap<Dim, Vec<Option<DataValue>>>, pair: &PairSpec) -> Vec<Subplot> {
        let (nrows, ncols, n) = (self.nrows, self.ncols, self.n_subplots);

        // Grid positions in surface order, and the facet/pair indices (i, j)
        // each position stands for.
        let mut slots: Vec<((usize, usize), (usize, usize))> = Vec::with_capacity(n);
        for k in 0..n {
            let grid = match (self.wrap, self.wrap_dim) {
                (None, _) => (k / ncols, k % ncols),
                (Some(_), Dim::Col) => (k / ncols, k % ncols),
                (Some(_), Dim::Row) => (k % nrows, k / nrows),
            };
            let index = if !pair.is_cross() {
                (k, k)
            } else {
                match (self.wrap, self.wrap_dim) {
                    (None, _) => grid,
                    (Some(_), Dim::Col) => (0, k),
                    (Some(_), Dim::Row) => (k, 0),
                }
            };
            slots.push((grid, index));
        }

        let mut cells: Vec<Subplot> = slots
            .into_iter()
            .map(|((grid_row, grid_col), (i, j))| {
                let (left, right, top, bottom) = match (self.wrap, self.wrap_dim) {
                    (None, _) => (j % ncols == 0, (j + 1) % ncols == 0, i == 0, i + 1 == nrows),
                    (Some(_), Dim::Col) => (
                        j % ncols == 0,
                        (j + 1) % ncols == 0 || j + 1 == n,
                        j < ncols,
                        j + ncols >= n,
                    ),
                    (Some(_), Dim::Row) => (
                        i < nrows,
                        i + nrows >= n,
                        i % nrows == 0,
                        (i + 1) % nrows == 0 || i + 1 == n,
                    ),
                };
                let (top, bottom) = if pair.is_cross() { (top, bottom) } else { (j < ncols, j + ncols >= n) };
                let coord = |axis: &str, idx: usize| {
                    if pair.pairs(axis) {
                        format!("{axis}{idx}")
                    } else {
                        axis.to_string()
                    }
                };
                Subplot {
                    surface: grid_row * ncols + grid_col,
                    grid_row,
                    grid_col,
                    col: dims[&Dim::Col].get(j).cloned().flatten(),
                    row: dims[&Dim::Row].get(i).cloned().flatten(),
                    x: coord("x", j),
                    y: coord("y", i),
                    left,
                    right,
                    top,
                    bottom,
                }
            })
            .collect();
        cells.sort_by_key(|c| c.surface);
        for (rank, cell) in cells.iter_mut().enumerate() {
            cell.surface = rank;
        }
        cells
    }

    /// Grid shape as `(rows, columns)`.
    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        (self.nrows, self.ncols)
    }

    /// Sharing of an axis.
    #[must_use]
    pub fn share(&self, axis: &str) -> Share {
        if axis == "x" {
            self.sharex
        } else {
            self.sharey
        }
    }

    /// Whether the grid was wrapped.
    #[must_use]
    pub fn is_wrapped(&self) -> bool {
        self.wrap.is_some()
    }

    /// Cells in surface order.
    pub fn iter(&self) -> std::slice::Iter<'_, Subplot> {
        self.cells.iter()
    }

    /// Cells in surface order.
    #[must_use]
    pub fn cells(&self) -> &[Subplot] {
        &self.cells
    }

    /// Number of subplots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether the grid has no subplots.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl<'a> IntoIterator for &'a Subplots {
    type Item = &'a Subplot;
    type IntoIter = std::slice::Iter<'a, Subplot>;

    fn into_iter(self) -> Self::IntoIter {
        self.cells.iter()
    }
}
