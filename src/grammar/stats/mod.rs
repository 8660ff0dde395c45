//! Statistical transforms.
//!
//! A stat turns a layer's observations into derived values per group: a
//! density curve, histogram bars, an estimate with an error interval. Stats
//! are pure functions of the layer data; the [`GroupBy`] they receive carries
//! the layer's grouping variables (and the orientation variable for stats
//! that aggregate along it).

mod aggregation;
mod density;
mod ecdf;
mod hist;
mod letter_values;
mod regression;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tracing::warn;

pub use aggregation::{bootstrap, Agg, Count, Errorbar, Est};
pub use density::{Bandwidth, Kde};
pub use ecdf::{Ecdf, EcdfStat};
pub use hist::{Bins, Hist, HistStat};
pub use letter_values::{KDepth, LetterValues};
pub use regression::PolyFit;

use super::data::DataFrame;
use super::groupby::GroupBy;
use super::orient::Orient;
use super::scales::ScaleMap;
use crate::error::{Error, Result};

/// A statistical transform applied to one layer.
pub trait Stat: fmt::Debug + Send + Sync {
    /// Whether the orientation variable is added to the grouping.
    fn group_by_orient(&self) -> bool {
        false
    }

    /// Transform the layer data.
    ///
    /// # Errors
    ///
    /// Returns an error when the data cannot be transformed (missing
    /// columns, invalid parameter combinations for this data).
    fn compute(
        &self,
        data: &DataFrame,
        groupby: &GroupBy,
        orient: Orient,
        scales: &ScaleMap,
    ) -> Result<DataFrame>;
}

/// Sharing of a computation (bins, grid, normalization) across groups.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Common {
    /// Shared by every group.
    #[default]
    All,
    /// Independent per group.
    None,
    /// Shared within groups defined by these variables.
    By(Vec<String>),
}

impl From<bool> for Common {
    fn from(shared: bool) -> Self {
        if shared {
            Common::All
        } else {
            Common::None
        }
    }
}

impl From<Vec<&str>> for Common {
    fn from(vars: Vec<&str>) -> Self {
        Common::By(vars.into_iter().map(str::to_string).collect())
    }
}

impl Common {
    /// The variables to sub-group by, or `None` when shared by all groups.
    /// Named variables missing from the data are dropped with a warning.
    pub(crate) fn subgroups(&self, param: &str, grouping_vars: &[String]) -> Option<Vec<String>> {
        match self {
            Common::All => None,
            _ if grouping_vars.is_empty() => None,
            Common::None => Some(grouping_vars.to_vec()),
            Common::By(vars) => {
                let missing: Vec<&String> = vars.iter().filter(|v| !grouping_vars.contains(v)).collect();
                if !missing.is_empty() {
                    warn!(
                        param,
                        ?missing,
                        "Undefined variable(s) passed for {param}; they are not present in the data"
                    );
                }
                let present: Vec<String> = vars.iter().filter(|v| grouping_vars.contains(v)).cloned().collect();
                (!present.is_empty()).then_some(present)
            }
        }
    }
}

/// Columns of `data` that are grouping variables, in data order.
pub(crate) fn grouping_vars(data: &DataFrame, groupby: &GroupBy) -> Vec<String> {
    data.columns().into_iter().filter(|c| groupby.contains(c)).map(str::to_string).collect()
}

/// Scalar reduction used by aggregating stats.
#[derive(Clone)]
pub enum Estimator {
    /// Arithmetic mean.
    Mean,
    /// Median.
    Median,
    /// Sum.
    Sum,
    /// Minimum.
    Min,
    /// Maximum.
    Max,
    /// Sample standard deviation.
    Std,
    /// Sample variance.
    Var,
    /// Number of values.
    Count,
    /// Any function of the values.
    Custom(Arc<dyn Fn(&[f64]) -> f64 + Send + Sync>),
}

impl fmt::Debug for Estimator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Estimator::Mean => f.write_str("Mean"),
            Estimator::Median => f.write_str("Median"),
            Estimator::Sum => f.write_str("Sum"),
            Estimator::Min => f.write_str("Min"),
            Estimator::Max => f.write_str("Max"),
            Estimator::Std => f.write_str("Std"),
            Estimator::Var => f.write_str("Var"),
            Estimator::Count => f.write_str("Count"),
            Estimator::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl Estimator {
    /// Wrap a function as an estimator.
    pub fn custom(func: impl Fn(&[f64]) -> f64 + Send + Sync + 'static) -> Self {
        Estimator::Custom(Arc::new(func))
    }

    /// Reduce the values.
    #[must_use]
    pub fn apply(&self, values: &[f64]) -> f64 {
        match self {
            Estimator::Mean => mean(values),
            Estimator::Median => {
                let mut sorted = values.to_vec();
                sorted.sort_by(f64::total_cmp);
                percentile(&sorted, 50.0)
            }
            Estimator::Sum => values.iter().sum(),
            Estimator::Min => values.iter().copied().reduce(f64::min).unwrap_or(f64::NAN),
            Estimator::Max => values.iter().copied().reduce(f64::max).unwrap_or(f64::NAN),
            Estimator::Std => variance(values).sqrt(),
            Estimator::Var => variance(values),
            Estimator::Count => values.len() as f64,
            Estimator::Custom(func) => func(values),
        }
    }
}

impl FromStr for Estimator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "mean" => Estimator::Mean,
            "median" => Estimator::Median,
            "sum" => Estimator::Sum,
            "min" => Estimator::Min,
            "max" => Estimator::Max,
            "std" => Estimator::Std,
            "var" => Estimator::Var,
            "count" | "len" | "size" => Estimator::Count,
            _ => return Err(Error::config(format!("Unknown estimator {s:?}"))),
        })
    }
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        f64::NAN
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Sample variance (one delta degree of freedom).
pub(crate) fn variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64
}

/// Percentile of sorted data with linear interpolation between ranks.
pub(crate) fn percentile(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let pos = (q / 100.0).clamp(0.0, 1.0) * (n - 1) as f64;
            let lo = pos.floor() as usize;
            let hi = (lo + 1).min(n - 1);
            sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
        }
    }
}

/// Error function, accurate to about 1e-7.
pub(crate) fn erf(x: f64) -> f64 {
    let t = 1.0 / (1.0 + 0.327_591_1 * x.abs());
    let poly = t
        * (0.254_829_592
            + t * (-0.284_496_736 + t * (1.421_413_741 + t * (-1.453_152_027 + t * 1.061_405_429))));
    let y = 1.0 - poly * (-x * x).exp();
    if x >= 0.0 {
        y
    } else {
        -y
    }
}

/// Standard normal cumulative distribution.
pub(crate) fn norm_cdf(x: f64) -> f64 {
    0.5 * (1.0 + erf(x / std::f64::consts::SQRT_2))
}

/// Standard normal quantile function (Acklam's rational approximation).
pub(crate) fn norm_ppf(p: f64) -> f64 {
    const A: [f64; 6] = [
        -3.969_683_028_665_376e1,
        2.209_460_984_245_205e2,
        -2.759_285_104_469_687e2,
        1.383_577_518_672_69e2,
        -3.066_479_806_614_716e1,
        2.506_628_277_459_239,
    ];
    const B: [f64; 5] = [
        -5.447_609_879_822_406e1,
        1.615_858_368_580_409e2,
        -1.556_989_798_598_866e2,
        6.680_131_188_771_972e1,
        -1.328_068_155_288_572e1,
    ];
    const C: [f64; 6] = [
        -7.784_894_002_430_293e-3,
        -3.223_964_580_411_365e-1,
        -2.400_758_277_161_838,
        -2.549_732_539_343_734,
        4.374_664_141_464_968,
        2.938_163_982_698_783,
    ];
    const D: [f64; 4] = [
        7.784_695_709_041_462e-3,
        3.224_671_290_700_398e-1,
        2.445_134_137_142_996,
        3.754_408_661_907_416,
    ];
    if !(0.0..=1.0).contains(&p) {
        return f64::NAN;
    }
    if p == 0.0 {
        return f64::NEG_INFINITY;
    }
    if p == 1.0 {
        return f64::INFINITY;
    }
    let tail = |q: f64| {
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    };
    let p_low = 0.024_25;
    if p < p_low {
        tail((-2.0 * p.ln()).sqrt())
    } else if p > 1.0 - p_low {
        -tail((-2.0 * (1.0 - p).ln()).sqrt())
    } else {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_estimators() {
        let v = [1.0, 2.0, 3.0, 10.0];
        assert_relative_eq!(Estimator::Mean.apply(&v), 4.0);
        assert_relative_eq!(Estimator::Median.apply(&v), 2.5);
        assert_relative_eq!(Estimator::Count.apply(&v), 4.0);
        assert_relative_eq!(Estimator::Var.apply(&[1.0, 3.0]), 2.0);
        assert!(Estimator::Mean.apply(&[]).is_nan());
        assert!("mode".parse::<Estimator>().is_err());
        let range = Estimator::custom(|v| v.iter().copied().fold(f64::NEG_INFINITY, f64::max) - v[0]);
        assert_relative_eq!(range.apply(&v), 9.0);
    }

    #[test]
    fn test_percentile_interpolates() {
        let sorted = [0.0, 10.0, 20.0];
        assert_relative_eq!(percentile(&sorted, 25.0), 5.0);
        assert_relative_eq!(percentile(&sorted, 100.0), 20.0);
    }

    #[test]
    fn test_normal_functions() {
        assert_relative_eq!(norm_cdf(0.0), 0.5, epsilon = 1e-7);
        assert_relative_eq!(norm_cdf(1.96), 0.975, epsilon = 1e-4);
        assert_relative_eq!(norm_ppf(0.975), 1.959_964, epsilon = 1e-5);
        assert_relative_eq!(norm_ppf(0.01), -2.326_348, epsilon = 1e-5);
    }

    #[test]
    fn test_common_subgroups() {
        let vars = vec!["color".to_string(), "col".to_string()];
        assert_eq!(Common::All.subgroups("common_norm", &vars), None);
        assert_eq!(Common::None.subgroups("common_norm", &vars), Some(vars.clone()));
        assert_eq!(
            Common::from(vec!["col", "nope"]).subgroups("common_norm", &vars),
            Some(vec!["col".to_string()])
        );
        assert_eq!(Common::None.subgroups("common_norm", &[]), None);
    }
}
