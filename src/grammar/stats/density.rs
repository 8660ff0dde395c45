//! Gaussian kernel density estimation.

use std::collections::HashMap;

use super::{grouping_vars, norm_cdf, Common, Stat};
use crate::error::Result;
use crate::grammar::data::{Column, DataFrame, DataValue};
use crate::grammar::groupby::GroupBy;
use crate::grammar::orient::Orient;
use crate::grammar::scales::ticks::linspace;
use crate::grammar::scales::ScaleMap;

/// Rule for the kernel bandwidth, as a factor of the data's spread.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bandwidth {
    /// Scott's rule, `n_eff^(-1/5)`.
    Scott,
    /// Silverman's rule, `(3 n_eff / 4)^(-1/5)`.
    Silverman,
    /// Fixed factor.
    Factor(f64),
}

/// A fitted univariate Gaussian KDE.
#[derive(Debug, Clone)]
struct Fitted {
    points: Vec<f64>,
    weights: Vec<f64>,
    bw: f64,
}

impl Fitted {
    /// Fit on `values` with (unnormalized) `weights`. `None` when the data
    /// has no spread.
    fn new(values: &[f64], weights: &[f64], method: Bandwidth, adjust: f64) -> Option<Self> {
        if values.len() < 2 {
            return None;
        }
        let total: f64 = weights.iter().sum();
        let weights: Vec<f64> = weights.iter().map(|w| w / total).collect();
        let sum_sq: f64 = weights.iter().map(|w| w * w).sum();
        let neff = 1.0 / sum_sq;
        let mean: f64 = values.iter().zip(&weights).map(|(x, w)| x * w).sum();
        let cov = values.iter().zip(&weights).map(|(x, w)| w * (x - mean).powi(2)).sum::<f64>()
            / (1.0 - sum_sq);
        if !(cov.is_finite() && cov > 0.0) {
            return None;
        }
        let factor = match method {
            Bandwidth::Scott => neff.powf(-0.2),
            Bandwidth::Silverman => (neff * 0.75).powf(-0.2),
            Bandwidth::Factor(f) => f,
        } * adjust;
        Some(Self { points: values.to_vec(), weights, bw: cov.sqrt() * factor })
    }

    fn pdf(&self, x: f64) -> f64 {
        let norm = self.bw * (2.0 * std::f64::consts::PI).sqrt();
        self.points
            .iter()
            .zip(&self.weights)
            .map(|(p, w)| w * (-0.5 * ((x - p) / self.bw).powi(2)).exp())
            .sum::<f64>()
            / norm
    }

    fn integrate(&self, a: f64, b: f64) -> f64 {
        self.points
            .iter()
            .zip(&self.weights)
            .map(|(p, w)| w * (norm_cdf((b - p) / self.bw) - norm_cdf((a - p) / self.bw)))
            .sum()
    }
}

/// Univariate kernel density estimate along the orientation axis.
///
/// Each group is fit independently; the densities are then rescaled by the
/// group's share of the total weight within its normalization group, so the
/// curves of a common normalization integrate to one together.
#[derive(Debug, Clone)]
pub struct Kde {
    bw_adjust: f64,
    bw_method: Bandwidth,
    common_norm: Common,
    common_grid: Common,
    gridsize: Option<usize>,
    cut: f64,
    cumulative: bool,
}

impl Default for Kde {
    fn default() -> Self {
        Self {
            bw_adjust: 1.0,
            bw_method: Bandwidth::Scott,
            common_norm: Common::All,
            common_grid: Common::All,
            gridsize: Some(200),
            cut: 3.0,
            cumulative: false,
        }
    }
}

impl Kde {
    /// Default estimate: Scott bandwidth, 200-point shared grid.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Multiply the rule-of-thumb bandwidth.
    #[must_use]
    pub fn bw_adjust(mut self, adjust: f64) -> Self {
        self.bw_adjust = adjust;
        self
    }

    /// Bandwidth rule.
    #[must_use]
    pub fn bw_method(mut self, method: Bandwidth) -> Self {
        self.bw_method = method;
        self
    }

    /// Normalization sharing across groups.
    #[must_use]
    pub fn common_norm(mut self, common: impl Into<Common>) -> Self {
        self.common_norm = common.into();
        self
    }

    /// Evaluation grid sharing across groups.
    #[must_use]
    pub fn common_grid(mut self, common: impl Into<Common>) -> Self {
        self.common_grid = common.into();
        self
    }

    /// Number of grid points; `None` evaluates at the observations.
    #[must_use]
    pub fn gridsize(mut self, gridsize: Option<usize>) -> Self {
        self.gridsize = gridsize;
        self
    }

    /// Grid extent past the data, in bandwidths.
    #[must_use]
    pub fn cut(mut self, cut: f64) -> Self {
        self.cut = cut;
        self
    }

    /// Evaluate the cumulative distribution instead of the density.
    #[must_use]
    pub fn cumulative(mut self, cumulative: bool) -> Self {
        self.cumulative = cumulative;
        self
    }

    fn fit(&self, data: &DataFrame, orient: Orient) -> Option<Fitted> {
        let values = data.numeric(orient.var())?;
        let weights = data.numeric("weight")?;
        Fitted::new(&values, &weights, self.bw_method, self.bw_adjust)
    }

    fn support(&self, data: &DataFrame, orient: Orient) -> Option<Vec<f64>> {
        let values = data.numeric(orient.var())?;
        let Some(gridsize) = self.gridsize else {
            return Some(values);
        };
        let kde = self.fit(data, orient)?;
        let lo = values.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Some(linspace(lo - kde.bw * self.cut, hi + kde.bw * self.cut, gridsize))
    }

    fn fit_and_evaluate(&self, data: &DataFrame, orient: Orient, support: &[f64]) -> Result<DataFrame> {
        let empty = || {
            DataFrame::new()
                .column(orient.var(), Vec::<f64>::new())?
                .column("weight", Vec::<f64>::new())?
                .column("density", Vec::<f64>::new())
        };
        let Some(kde) = self.fit(data, orient) else {
            return empty();
        };
        let density: Vec<f64> = if self.cumulative {
            let s0 = support.first().copied().unwrap_or(0.0);
            support.iter().map(|s| kde.integrate(s0, *s)).collect()
        } else {
            support.iter().map(|s| kde.pdf(*s)).collect()
        };
        let weight: f64 = data.numeric("weight").unwrap_or_default().iter().sum();
        DataFrame::new()
            .column(orient.var(), support.to_vec())?
            .column("weight", vec![weight; support.len()])?
            .column("density", density)
    }

    fn transform(&self, data: &DataFrame, orient: Orient, grouping: &[String]) -> Result<DataFrame> {
        let empty = || {
            let mut frame = data.take(&[]);
            frame.insert("density", Vec::<f64>::new())?;
            Ok(frame)
        };
        if data.nrow() < 2 {
            return empty();
        }
        let Some(support) = self.support(data, orient) else {
            return empty();
        };
        if grouping.is_empty() {
            return self.fit_and_evaluate(data, orient, &support);
        }
        GroupBy::new(grouping.iter().cloned())?
            .apply(data, |df| self.fit_and_evaluate(df, orient, &support))
    }
}

impl Stat for Kde {
    fn compute(&self, data: &DataFrame, groupby: &GroupBy, orient: Orient, _: &ScaleMap) -> Result<DataFrame> {
        let mut data = data.clone();
        if !data.has_column("weight") {
            data.insert("weight", vec![1.0; data.nrow()])?;
        }
        let data = data.drop_nulls(&[orient.var(), "weight"]);
        let grouping = grouping_vars(&data, groupby);

        let mut res = match self.common_grid.subgroups("common_grid", &grouping) {
            None => self.transform(&data, orient, &grouping)?,
            Some(grid_vars) => {
                GroupBy::new(grid_vars)?.apply(&data, |df| self.transform(df, orient, &grouping))?
            }
        };

        let weights = data.numeric("weight").unwrap_or_default();
        let group_weight: Vec<f64> = match self.common_norm.subgroups("common_norm", &grouping) {
            None => vec![weights.iter().sum(); res.nrow()],
            Some(norm_vars) => {
                let key = |frame: &DataFrame, row: usize| -> Vec<DataValue> {
                    norm_vars
                        .iter()
                        .map(|v| frame.get(v).and_then(|c| c.get(row)).cloned().unwrap_or(DataValue::Null))
                        .collect()
                };
                let mut totals: HashMap<Vec<DataValue>, f64> = HashMap::new();
                for (row, w) in weights.iter().enumerate() {
                    *totals.entry(key(&data, row)).or_default() += w;
                }
                (0..res.nrow()).map(|row| totals.get(&key(&res, row)).copied().unwrap_or(f64::NAN)).collect()
            }
        };

        let weight = res.numeric("weight").unwrap_or_default();
        let density: Vec<f64> = res
            .numeric("density")
            .unwrap_or_default()
            .iter()
            .zip(weight.iter().zip(&group_weight))
            .map(|(d, (w, gw))| d * w / gw)
            .collect();
        res.insert("density", density.clone())?;
        res.insert(orient.other(), Column::from(density))?;
        res.remove("weight");
        Ok(res)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn trapezoid(x: &[f64], y: &[f64]) -> f64 {
        x.windows(2).zip(y.windows(2)).map(|(x, y)| (x[1] - x[0]) * (y[0] + y[1]) / 2.0).sum()
    }

    fn two_groups() -> DataFrame {
        DataFrame::new()
            .column("x", vec![1.0, 2.0, 2.5, 3.0, 4.0, 5.0, 10.0, 11.0, 12.5])
            .unwrap()
            .column("color", vec!["a", "a", "a", "a", "a", "a", "b", "b", "b"])
            .unwrap()
    }

    fn area(res: &DataFrame, level: &str) -> f64 {
        let keep: Vec<bool> = res.get("color").unwrap().iter().map(|v| v == &DataValue::from(level)).collect();
        let part = res.filter(&keep);
        trapezoid(&part.numeric("x").unwrap(), &part.numeric("y").unwrap())
    }

    #[test]
    fn test_single_group_integrates_to_one() {
        let data = DataFrame::new().column("x", vec![0.0, 1.0, 1.5, 2.0, 4.0]).unwrap();
        let groupby = GroupBy::new(["color"]).unwrap();
        let res = Kde::new().compute(&data, &groupby, Orient::X, &ScaleMap::new()).unwrap();
        assert_eq!(res.nrow(), 200);
        let area = trapezoid(&res.numeric("x").unwrap(), &res.numeric("y").unwrap());
        assert_relative_eq!(area, 1.0, epsilon = 1e-2);
        assert!(!res.has_column("weight"));
    }

    #[test]
    fn test_common_norm_splits_area_by_weight() {
        let groupby = GroupBy::new(["color"]).unwrap();
        let res = Kde::new().compute(&two_groups(), &groupby, Orient::X, &ScaleMap::new()).unwrap();
        assert_relative_eq!(area(&res, "a"), 6.0 / 9.0, epsilon = 1e-2);
        assert_relative_eq!(area(&res, "b"), 3.0 / 9.0, epsilon = 1e-2);
    }

    #[test]
    fn test_independent_norm() {
        let groupby = GroupBy::new(["color"]).unwrap();
        let stat = Kde::new().common_norm(false).common_grid(false);
        let res = stat.compute(&two_groups(), &groupby, Orient::X, &ScaleMap::new()).unwrap();
        assert_relative_eq!(area(&res, "a"), 1.0, epsilon = 1e-2);
        assert_relative_eq!(area(&res, "b"), 1.0, epsilon = 1e-2);
    }

    #[test]
    fn test_cumulative_reaches_one() {
        let data = DataFrame::new().column("y", vec![0.0, 1.0, 2.0, 3.0]).unwrap();
        let groupby = GroupBy::new(["color"]).unwrap();
        let res = Kde::new().cumulative(true).compute(&data, &groupby, Orient::Y, &ScaleMap::new()).unwrap();
        let cdf = res.numeric("x").unwrap();
        assert_relative_eq!(cdf[0], 0.0);
        assert_relative_eq!(*cdf.last().unwrap(), 1.0, epsilon = 1e-2);
        assert!(cdf.windows(2).all(|w| w[0] <= w[1] + 1e-12));
    }

    #[test]
    fn test_constant_data_gives_empty_result() {
        let data = DataFrame::new().column("x", vec![2.0, 2.0, 2.0]).unwrap();
        let groupby = GroupBy::new(["color"]).unwrap();
        let res = Kde::new().compute(&data, &groupby, Orient::X, &ScaleMap::new()).unwrap();
        assert_eq!(res.nrow(), 0);
    }

    #[test]
    fn test_constant_group_drops_out_but_keeps_its_weight() {
        let data = DataFrame::new()
            .column("x", vec![1.0, 2.0, 2.5, 3.0, 4.0, 5.0, 7.0, 7.0, 7.0])
            .unwrap()
            .column("color", vec!["a", "a", "a", "a", "a", "a", "b", "b", "b"])
            .unwrap();
        let groupby = GroupBy::new(["color"]).unwrap();

        let res = Kde::new().compute(&data, &groupby, Orient::X, &ScaleMap::new()).unwrap();
        assert_eq!(res.nrow(), 200);
        assert!(res.get("color").unwrap().iter().all(|v| v == &DataValue::from("a")));
        assert_relative_eq!(area(&res, "a"), 6.0 / 9.0, epsilon = 1e-2);

        let res = Kde::new().common_norm(false).compute(&data, &groupby, Orient::X, &ScaleMap::new()).unwrap();
        assert_relative_eq!(area(&res, "a"), 1.0, epsilon = 1e-2);
    }

    #[test]
    fn test_gridsize_none_evaluates_at_data() {
        let data = DataFrame::new().column("x", vec![0.0, 1.0, 3.0]).unwrap();
        let groupby = GroupBy::new(["color"]).unwrap();
        let res = Kde::new().gridsize(None).compute(&data, &groupby, Orient::X, &ScaleMap::new()).unwrap();
        assert_eq!(res.numeric("x").unwrap(), vec![0.0, 1.0, 3.0]);
    }

    #[test]
    fn test_wider_bandwidth_flattens_peak() {
        let data = DataFrame::new().column("x", vec![0.0, 0.1, 0.2, 5.0]).unwrap();
        let groupby = GroupBy::new(["color"]).unwrap();
        let peak = |stat: Kde| {
            let res = stat.compute(&data, &groupby, Orient::X, &ScaleMap::new()).unwrap();
            res.numeric("y").unwrap().into_iter().fold(0.0, f64::max)
        };
        assert!(peak(Kde::new().bw_adjust(2.0)) < peak(Kde::new().bw_adjust(0.5)));
    }
}
