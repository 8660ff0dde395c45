//! Empirical cumulative distribution.

use super::Stat;
use crate::error::Result;
use crate::grammar::data::DataFrame;
use crate::grammar::groupby::GroupBy;
use crate::grammar::orient::Orient;
use crate::grammar::scales::ScaleMap;

/// Scale of the cumulative axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EcdfStat {
    /// Cumulative (weighted) count.
    Count,
    /// Fraction in `[0, 1]`.
    #[default]
    Proportion,
    /// Percent in `[0, 100]`.
    Percent,
}

/// Step function of the cumulative distribution along the orientation axis.
///
/// Each group's curve starts at its smallest observation with a value of
/// zero, so the first step is drawn.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ecdf {
    stat: EcdfStat,
    complementary: bool,
}

impl Ecdf {
    /// Proportion ECDF.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cumulative scale.
    #[must_use]
    pub fn stat(mut self, stat: EcdfStat) -> Self {
        self.stat = stat;
        self
    }

    /// Plot `1 - CDF` (or `total - count`).
    #[must_use]
    pub fn complementary(mut self, complementary: bool) -> Self {
        self.complementary = complementary;
        self
    }

    fn eval(&self, data: &DataFrame, orient: Orient) -> Result<DataFrame> {
        let values = data.numeric(orient.var()).unwrap_or_default();
        let weights = data.numeric("weight").unwrap_or_else(|| vec![1.0; values.len()]);
        let mut pairs: Vec<(f64, f64)> =
            values.into_iter().zip(weights).filter(|(v, w)| v.is_finite() && w.is_finite()).collect();
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut xs = Vec::with_capacity(pairs.len() + 1);
        let mut ys = Vec::with_capacity(pairs.len() + 1);
        if let Some((first, _)) = pairs.first() {
            xs.push(*first);
            ys.push(0.0);
        }
        let mut acc = 0.0;
        for (v, w) in &pairs {
            acc += w;
            xs.push(*v);
            ys.push(acc);
        }
        let total = acc;
        if total > 0.0 {
            let scale = match self.stat {
                EcdfStat::Count => 1.0,
                EcdfStat::Proportion => 1.0 / total,
                EcdfStat::Percent => 100.0 / total,
            };
            for y in &mut ys {
                *y *= scale;
            }
        }
        if self.complementary {
            let top = ys.last().copied().unwrap_or(0.0);
            for y in &mut ys {
                *y = top - *y;
            }
        }
        DataFrame::new().column(orient.var(), xs)?.column(orient.other(), ys)
    }
}

impl Stat for Ecdf {
    fn compute(&self, data: &DataFrame, groupby: &GroupBy, orient: Orient, _: &ScaleMap) -> Result<DataFrame> {
        groupby.apply(data, |df| self.eval(df, orient))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(stat: Ecdf, values: Vec<f64>) -> DataFrame {
        let data = DataFrame::new().column("x", values).unwrap();
        stat.compute(&data, &GroupBy::new(["color"]).unwrap(), Orient::X, &ScaleMap::new()).unwrap()
    }

    #[test]
    fn test_proportion_steps() {
        let res = run(Ecdf::new(), vec![3.0, 1.0, 2.0, 2.0]);
        assert_eq!(res.numeric("x").unwrap(), vec![1.0, 1.0, 2.0, 2.0, 3.0]);
        assert_eq!(res.numeric("y").unwrap(), vec![0.0, 0.25, 0.5, 0.75, 1.0]);
    }

    #[test]
    fn test_complementary_percent() {
        let res = run(Ecdf::new().stat(EcdfStat::Percent).complementary(true), vec![1.0, 2.0]);
        assert_eq!(res.numeric("y").unwrap(), vec![100.0, 50.0, 0.0]);
    }

    #[test]
    fn test_weighted_count() {
        let data = DataFrame::new()
            .column("x", vec![1.0, 2.0])
            .unwrap()
            .column("weight", vec![2.0, 3.0])
            .unwrap();
        let res = Ecdf::new()
            .stat(EcdfStat::Count)
            .compute(&data, &GroupBy::new(["color"]).unwrap(), Orient::X, &ScaleMap::new())
            .unwrap();
        assert_eq!(res.numeric("y").unwrap(), vec![0.0, 2.0, 5.0]);
    }
}
