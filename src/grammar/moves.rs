//! Position adjustments.
//!
//! Moves run after the stat, on a layer's whole table at once, because
//! resolving overlap needs the positions of sibling groups. Positions are
//! in scaled (numeric) coordinates; the orchestrator prepares the `width`
//! and `baseline` columns they read.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::data::{Column, DataFrame, DataValue};
use super::groupby::GroupBy;
use super::orient::Orient;
use super::scales::ScaleMap;
use super::stats::{grouping_vars, Estimator};
use crate::error::{Error, Result};

/// A position adjustment applied to one layer.
pub trait Move: fmt::Debug + Send + Sync {
    /// Whether the orientation variable is added to the grouping.
    fn group_by_orient(&self) -> bool {
        true
    }

    /// Explicit grouping variables, replacing the mark's grouping properties.
    fn by(&self) -> Option<&[String]> {
        None
    }

    /// Adjust positions.
    ///
    /// # Errors
    ///
    /// Returns an error when the data lacks a column the move requires or
    /// violates its preconditions.
    fn apply(&self, data: &DataFrame, groupby: &GroupBy, orient: Orient, scales: &ScaleMap)
        -> Result<DataFrame>;
}

// ============================================================================
// Dodge
// ============================================================================

/// Treatment of unobserved groups when dodging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Empty {
    /// Reserve a slot for them.
    #[default]
    Keep,
    /// Reserve no slot, but keep the observed widths.
    Drop,
    /// Expand observed groups into the space.
    Fill,
}

impl FromStr for Empty {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "keep" => Ok(Empty::Keep),
            "drop" => Ok(Empty::Drop),
            "fill" => Ok(Empty::Fill),
            _ => Err(Error::config(format!("`empty` must be keep, drop or fill; not {s:?}"))),
        }
    }
}

/// Displace overlapping groups side by side along the orientation axis,
/// narrowing each to share its slot.
#[derive(Debug, Clone, Default)]
pub struct Dodge {
    empty: Empty,
    gap: f64,
    by: Option<Vec<String>>,
}

impl Dodge {
    /// Dodge keeping empty slots.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Unobserved group handling.
    #[must_use]
    pub fn empty(mut self, empty: Empty) -> Self {
        self.empty = empty;
        self
    }

    /// Fraction of each dodged width left blank.
    #[must_use]
    pub fn gap(mut self, gap: f64) -> Self {
        self.gap = gap;
        self
    }

    /// Dodge by these variables only.
    #[must_use]
    pub fn by<I, S>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.by = Some(vars.into_iter().map(Into::into).collect());
        self
    }

    fn scale_widths(&self, widths: &[f64]) -> Vec<f64> {
        let observed: Vec<f64> = widths.iter().copied().filter(|w| !w.is_nan()).collect();
        let empty = match self.empty {
            Empty::Fill => 0.0,
            _ => observed.iter().sum::<f64>() / observed.len().max(1) as f64,
        };
        let filled: Vec<f64> = widths.iter().map(|&w| if w.is_nan() { empty } else { w }).collect();
        let scale = filled.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let norm: f64 = filled.iter().sum();
        let source = if self.empty == Empty::Keep { &filled } else { widths };
        source.iter().map(|w| w / norm * scale).collect()
    }
}

/// Offsets that lay widths side by side, centered on zero.
fn widths_to_offsets(widths: &[f64]) -> Vec<f64> {
    let total: f64 = widths.iter().filter(|w| !w.is_nan()).sum();
    let mut before = 0.0;
    widths
        .iter()
        .map(|&w| {
            let offset = before + (w - total) / 2.0;
            if !w.is_nan() {
                before += w;
            }
            offset
        })
        .collect()
}

fn row_key(cols: &[&Column], row: usize) -> Vec<DataValue> {
    cols.iter().map(|c| c.get(row).cloned().unwrap_or(DataValue::Null)).collect()
}

impl Move for Dodge {
    fn by(&self) -> Option<&[String]> {
        self.by.as_deref()
    }

    fn apply(&self, data: &DataFrame, groupby: &GroupBy, orient: Orient, _: &ScaleMap) -> Result<DataFrame> {
        if !data.has_column("width") {
            return Err(Error::value("Dodge requires a `width` column"));
        }
        let vars = grouping_vars(data, groupby);
        let max = |v: &[f64]| v.iter().copied().reduce(f64::max).unwrap_or(f64::NAN);
        let mut groups = groupby.agg(data, &[("width", &max)])?;
        if self.empty == Empty::Fill {
            groups = groups.drop_nulls(&["width"]);
        }

        let pos_vars: Vec<&str> =
            [orient.var(), "col", "row"].into_iter().filter(|v| data.has_column(v)).collect();
        let pos_cols: Vec<&Column> = pos_vars.iter().filter_map(|v| groups.get(v)).collect();
        let mut slots: IndexMap<Vec<DataValue>, Vec<usize>> = IndexMap::new();
        for row in 0..groups.nrow() {
            slots.entry(row_key(&pos_cols, row)).or_default().push(row);
        }

        let widths = groups.numeric("width").unwrap_or_default();
        let positions = groups.numeric(orient.var()).unwrap_or_else(|| vec![f64::NAN; groups.nrow()]);
        let mut new_widths = vec![f64::NAN; groups.nrow()];
        let mut dodged = vec![f64::NAN; groups.nrow()];
        for rows in slots.values() {
            let slot: Vec<f64> = rows.iter().map(|&r| widths[r]).collect();
            let scaled = self.scale_widths(&slot);
            let offsets = widths_to_offsets(&scaled);
            for ((&r, w), off) in rows.iter().zip(scaled).zip(offsets) {
                new_widths[r] = w * (1.0 - self.gap);
                dodged[r] = positions[r] + off;
            }
        }

        let key_cols: Vec<&Column> = vars.iter().filter_map(|v| groups.get(v)).collect();
        let lookup: HashMap<Vec<DataValue>, (f64, f64)> = (0..groups.nrow())
            .map(|r| (row_key(&key_cols, r), (dodged[r], new_widths[r])))
            .collect();

        let data_cols: Vec<&Column> = vars.iter().filter_map(|v| data.get(v)).collect();
        let (pos, width): (Vec<f64>, Vec<f64>) = (0..data.nrow())
            .map(|r| lookup.get(&row_key(&data_cols, r)).copied().unwrap_or((f64::NAN, f64::NAN)))
            .unzip();
        let mut out = data.clone();
        out.insert(orient.var(), pos)?;
        out.insert("width", width)?;
        Ok(out)
    }
}

// ============================================================================
// Stack
// ============================================================================

/// Pile groups that share a position on top of one another along the value
/// axis, in grouping level order.
#[derive(Debug, Clone, Copy, Default)]
pub struct Stack;

impl Stack {
    fn stack(data: &DataFrame, orient: Orient, rank: &dyn Fn(usize) -> Vec<usize>) -> Result<DataFrame> {
        let baseline = data.numeric("baseline").unwrap_or_else(|| vec![0.0; data.nrow()]);
        let mut distinct: Vec<f64> = baseline.iter().copied().filter(|b| !b.is_nan()).collect();
        distinct.sort_by(f64::total_cmp);
        distinct.dedup();
        if distinct.len() > 1 {
            return Err(Error::value(
                "Stack move cannot be used when baselines are already heterogeneous",
            ));
        }

        let mut rows: Vec<usize> = (0..data.nrow()).collect();
        rows.sort_by_key(|&r| rank(r));
        let data = data.take(&rows);
        let baseline: Vec<f64> = rows.iter().map(|&r| baseline[r]).collect();
        let values = data.numeric(orient.other()).unwrap_or_else(|| vec![f64::NAN; rows.len()]);

        let mut stacked = Vec::with_capacity(values.len());
        let mut bases = Vec::with_capacity(values.len());
        let mut total = 0.0;
        for (v, b) in values.iter().zip(&baseline) {
            let length = v - b;
            // Missing rows are left out of the pile entirely.
            if length.is_nan() {
                stacked.push(f64::NAN);
                bases.push(f64::NAN);
            } else {
                bases.push(b + total);
                total += length;
                stacked.push(total);
            }
        }
        let mut out = data;
        out.insert(orient.other(), stacked)?;
        out.insert("baseline", bases)?;
        Ok(out)
    }
}

impl Move for Stack {
    fn apply(&self, data: &DataFrame, groupby: &GroupBy, orient: Orient, _: &ScaleMap) -> Result<DataFrame> {
        // Level rank of each row within the declared grouping, so piles
        // follow level order rather than row order.
        let levels = groupby.levels(data);
        let ranks: Vec<Vec<usize>> = (0..data.nrow())
            .map(|r| {
                levels
                    .iter()
                    .filter(|(var, _)| var.as_str() != orient.var())
                    .map(|(var, lv)| {
                        data.get(var)
                            .and_then(|c| c.get(r))
                            .and_then(|v| lv.iter().position(|l| l == v))
                            .unwrap_or(usize::MAX)
                    })
                    .collect()
            })
            .collect();

        let mut data = data.clone();
        data.insert("__row", (0..data.nrow()).map(|r| r as f64).collect::<Vec<_>>())?;
        let stacker = GroupBy::new(["col", "row", orient.var()])?;
        let mut out = stacker.apply(&data, |df| {
            let origin = df.numeric("__row").unwrap_or_default();
            Self::stack(df, orient, &|r| origin.get(r).map_or_else(Vec::new, |&o| ranks[o as usize].clone()))
        })?;
        out.remove("__row");
        Ok(out)
    }
}

// ============================================================================
// Jitter
// ============================================================================

/// Random displacement to reduce overplotting.
///
/// `width` is relative to the mark width along the orientation axis; `x`
/// and `y` are absolute, in data units. The noise is uniform in
/// `[-amount / 2, amount / 2]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Jitter {
    width: Option<f64>,
    x: f64,
    y: f64,
    seed: Option<u64>,
}

impl Jitter {
    /// Relative jitter of 0.2 along the orientation axis.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Relative jitter along the orientation axis.
    #[must_use]
    pub fn width(mut self, width: f64) -> Self {
        self.width = Some(width);
        self
    }

    /// Absolute jitter on x.
    #[must_use]
    pub fn x(mut self, x: f64) -> Self {
        self.x = x;
        self
    }

    /// Absolute jitter on y.
    #[must_use]
    pub fn y(mut self, y: f64) -> Self {
        self.y = y;
        self
    }

    /// Seed for reproducible noise.
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

impl Move for Jitter {
    fn apply(&self, data: &DataFrame, _: &GroupBy, orient: Orient, _: &ScaleMap) -> Result<DataFrame> {
        let mut rng = self.seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
        let n = data.nrow();
        let mut jitter = |values: Vec<f64>, scale: &dyn Fn(usize) -> f64| -> Vec<f64> {
            values
                .into_iter()
                .enumerate()
                .map(|(i, v)| v + rng.gen_range(-0.5..0.5) * scale(i))
                .collect()
        };

        let width = self
            .width
            .unwrap_or(if self.x != 0.0 || self.y != 0.0 { 0.0 } else { 0.2 });
        let mut out = data.clone();
        if width != 0.0 {
            let widths = data.numeric("width").unwrap_or_else(|| vec![0.8; n]);
            if let Some(pos) = data.numeric(orient.var()) {
                out.insert(orient.var(), jitter(pos, &|i| width * widths[i]))?;
            }
        }
        for (var, amount) in [("x", self.x), ("y", self.y)] {
            if amount != 0.0 {
                if let Some(pos) = out.numeric(var) {
                    let moved = jitter(pos, &|_| amount);
                    out.insert(var, moved)?;
                }
            }
        }
        Ok(out)
    }
}

// ============================================================================
// Shift and Norm
// ============================================================================

/// Constant displacement.
#[derive(Debug, Clone, Copy, Default)]
pub struct Shift {
    x: f64,
    y: f64,
}

impl Shift {
    /// Shift by `(x, y)` in scaled coordinates.
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl Move for Shift {
    fn group_by_orient(&self) -> bool {
        false
    }

    fn apply(&self, data: &DataFrame, _: &GroupBy, _: Orient, _: &ScaleMap) -> Result<DataFrame> {
        let mut out = data.clone();
        for (var, amount) in [("x", self.x), ("y", self.y)] {
            if let Some(values) = data.numeric(var) {
                out.insert(var, values.into_iter().map(|v| v + amount).collect::<Vec<_>>())?;
            }
        }
        Ok(out)
    }
}

/// Divide the value axis by a per-group reduction of itself.
#[derive(Debug, Clone)]
pub struct Norm {
    func: Estimator,
    percent: bool,
    by: Option<Vec<String>>,
}

impl Default for Norm {
    fn default() -> Self {
        Self { func: Estimator::Max, percent: false, by: None }
    }
}

impl Norm {
    /// Normalize by the group maximum.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Denominator reduction.
    #[must_use]
    pub fn func(mut self, func: Estimator) -> Self {
        self.func = func;
        self
    }

    /// Scale to percentages.
    #[must_use]
    pub fn percent(mut self, percent: bool) -> Self {
        self.percent = percent;
        self
    }

    /// Normalize within groups of these variables only.
    #[must_use]
    pub fn by<I, S>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.by = Some(vars.into_iter().map(Into::into).collect());
        self
    }
}

impl Move for Norm {
    fn group_by_orient(&self) -> bool {
        false
    }

    fn by(&self) -> Option<&[String]> {
        self.by.as_deref()
    }

    fn apply(&self, data: &DataFrame, groupby: &GroupBy, orient: Orient, _: &ScaleMap) -> Result<DataFrame> {
        let var = orient.other();
        groupby.apply(data, |df| {
            let values = df.numeric(var).unwrap_or_default();
            let present: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
            let denom = self.func.apply(&present);
            let factor = if self.percent { 100.0 } else { 1.0 };
            let mut out = df.clone();
            if df.has_column(var) {
                out.insert(var, values.iter().map(|v| v / denom * factor).collect::<Vec<_>>())?;
            }
            Ok(out)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn bars() -> DataFrame {
        DataFrame::new()
            .column("x", vec![0.0, 0.0, 1.0])
            .unwrap()
            .column("y", vec![2.0, 3.0, 4.0])
            .unwrap()
            .column("color", vec!["a", "b", "a"])
            .unwrap()
            .column("width", vec![0.8, 0.8, 0.8])
            .unwrap()
            .column("baseline", vec![0.0, 0.0, 0.0])
            .unwrap()
    }

    fn dodge_groupby() -> GroupBy {
        GroupBy::new(["x", "color"]).unwrap()
    }

    #[test]
    fn test_dodge_keep_reserves_empty_slot() {
        let res = Dodge::new().apply(&bars(), &dodge_groupby(), Orient::X, &ScaleMap::new()).unwrap();
        let x = res.numeric("x").unwrap();
        let w = res.numeric("width").unwrap();
        assert_relative_eq!(x[0], -0.2);
        assert_relative_eq!(x[1], 0.2);
        assert_relative_eq!(x[2], 0.8);
        assert!(w.iter().all(|&v| (v - 0.4).abs() < 1e-12));
    }

    #[test]
    fn test_dodge_fill_expands_lone_group() {
        let res = Dodge::new()
            .empty(Empty::Fill)
            .apply(&bars(), &dodge_groupby(), Orient::X, &ScaleMap::new())
            .unwrap();
        let x = res.numeric("x").unwrap();
        let w = res.numeric("width").unwrap();
        assert_relative_eq!(x[2], 1.0);
        assert_relative_eq!(w[2], 0.8);
    }

    #[test]
    fn test_dodge_drop_keeps_width_centered() {
        let res = Dodge::new()
            .empty(Empty::Drop)
            .apply(&bars(), &dodge_groupby(), Orient::X, &ScaleMap::new())
            .unwrap();
        let x = res.numeric("x").unwrap();
        let w = res.numeric("width").unwrap();
        assert_relative_eq!(x[2], 1.0);
        assert_relative_eq!(w[2], 0.4);
    }

    #[test]
    fn test_dodge_gap() {
        let res = Dodge::new()
            .gap(0.5)
            .apply(&bars(), &dodge_groupby(), Orient::X, &ScaleMap::new())
            .unwrap();
        assert_relative_eq!(res.numeric("width").unwrap()[0], 0.2);
        assert_relative_eq!(res.numeric("x").unwrap()[0], -0.2);
    }

    #[test]
    fn test_stack_in_level_order() {
        let data = bars().take(&[1, 0, 2]);
        let order: IndexMap<String, Option<Vec<DataValue>>> = [
            ("x".to_string(), None),
            ("color".to_string(), Some(vec![DataValue::from("a"), DataValue::from("b")])),
        ]
        .into_iter()
        .collect();
        let groupby = GroupBy::with_order(order).unwrap();
        let res = Stack.apply(&data, &groupby, Orient::X, &ScaleMap::new()).unwrap();
        let colors: Vec<String> = res.get("color").unwrap().iter().map(ToString::to_string).collect();
        assert_eq!(colors, vec!["a", "b", "a"]);
        assert_eq!(res.numeric("y").unwrap(), vec![2.0, 5.0, 4.0]);
        assert_eq!(res.numeric("baseline").unwrap(), vec![0.0, 2.0, 0.0]);
    }

    #[test]
    fn test_stack_skips_missing_values() {
        let data = DataFrame::new()
            .column("x", vec![0.0, 0.0, 0.0])
            .unwrap()
            .column("y", vec![1.0, f64::NAN, 2.0])
            .unwrap()
            .column("color", vec!["a", "b", "c"])
            .unwrap()
            .column("baseline", vec![0.0, f64::NAN, 0.0])
            .unwrap();
        let res = Stack.apply(&data, &dodge_groupby(), Orient::X, &ScaleMap::new()).unwrap();
        let y = res.numeric("y").unwrap();
        let base = res.numeric("baseline").unwrap();
        assert_eq!((y[0], base[0]), (1.0, 0.0));
        assert!(y[1].is_nan() && base[1].is_nan());
        assert_eq!((y[2], base[2]), (3.0, 1.0));
    }

    #[test]
    fn test_stack_rejects_mixed_baselines() {
        let mut data = bars();
        data.insert("baseline", vec![0.0, 1.0, 0.0]).unwrap();
        let err = Stack.apply(&data, &dodge_groupby(), Orient::X, &ScaleMap::new()).unwrap_err();
        assert!(matches!(err, Error::Value(_)));
    }

    #[test]
    fn test_jitter_is_seeded_and_bounded() {
        let a = Jitter::new().seed(7).apply(&bars(), &dodge_groupby(), Orient::X, &ScaleMap::new()).unwrap();
        let b = Jitter::new().seed(7).apply(&bars(), &dodge_groupby(), Orient::X, &ScaleMap::new()).unwrap();
        assert_eq!(a.numeric("x"), b.numeric("x"));
        for (moved, orig) in a.numeric("x").unwrap().iter().zip([0.0, 0.0, 1.0]) {
            assert!((moved - orig).abs() <= 0.08);
        }
        assert_eq!(a.numeric("y").unwrap(), vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_jitter_absolute_y_only() {
        let res = Jitter::new().y(1.0).seed(1).apply(&bars(), &dodge_groupby(), Orient::X, &ScaleMap::new()).unwrap();
        assert_eq!(res.numeric("x").unwrap(), vec![0.0, 0.0, 1.0]);
        assert_ne!(res.numeric("y").unwrap(), vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_shift() {
        let res = Shift::new(0.5, -1.0).apply(&bars(), &dodge_groupby(), Orient::X, &ScaleMap::new()).unwrap();
        assert_eq!(res.numeric("x").unwrap(), vec![0.5, 0.5, 1.5]);
        assert_eq!(res.numeric("y").unwrap(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_norm_percent_by_group() {
        let res = Norm::new()
            .percent(true)
            .apply(&bars(), &GroupBy::new(["color"]).unwrap(), Orient::X, &ScaleMap::new())
            .unwrap();
        let colors: Vec<String> = res.get("color").unwrap().iter().map(ToString::to_string).collect();
        let y = res.numeric("y").unwrap();
        for (c, v) in colors.iter().zip(y) {
            let expected = if c == "a" { [50.0, 100.0] } else { [100.0, 100.0] };
            assert!(expected.iter().any(|e| (e - v).abs() < 1e-12));
        }
    }

    #[test]
    fn test_empty_from_str() {
        assert_eq!("fill".parse::<Empty>().unwrap(), Empty::Fill);
        assert!("spread".parse::<Empty>().is_err());
    }
}
