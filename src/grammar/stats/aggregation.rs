//! Aggregating stats: one value (and optionally an interval) per group.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{mean, percentile, variance, Estimator, Stat};
use crate::error::{Error, Result};
use crate::grammar::data::{Column, DataFrame, DataValue};
use crate::grammar::groupby::GroupBy;
use crate::grammar::orient::Orient;
use crate::grammar::scales::ScaleMap;

/// Aggregate the value axis with a scalar function per group.
#[derive(Debug, Clone)]
pub struct Agg {
    func: Estimator,
}

impl Default for Agg {
    fn default() -> Self {
        Self { func: Estimator::Mean }
    }
}

impl Agg {
    /// Mean per group.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use another reduction.
    #[must_use]
    pub fn func(mut self, func: Estimator) -> Self {
        self.func = func;
        self
    }
}

impl Stat for Agg {
    fn group_by_orient(&self) -> bool {
        true
    }

    fn compute(&self, data: &DataFrame, groupby: &GroupBy, orient: Orient, _: &ScaleMap) -> Result<DataFrame> {
        let var = orient.other();
        let reduce = |v: &[f64]| self.func.apply(v);
        let res = groupby.agg(data, &[(var, &reduce)])?;
        Ok(res.drop_nulls(&[var]))
    }
}

/// Count observations per group along the orientation axis.
#[derive(Debug, Clone, Copy, Default)]
pub struct Count;

impl Stat for Count {
    fn group_by_orient(&self) -> bool {
        true
    }

    fn compute(&self, data: &DataFrame, groupby: &GroupBy, orient: Orient, _: &ScaleMap) -> Result<DataFrame> {
        let var = orient.other();
        let mut data = data.clone();
        let positions = data
            .get(orient.var())
            .cloned()
            .ok_or_else(|| Error::value(format!("Count requires the `{orient}` variable")))?;
        data.insert(var, positions.values().iter().map(|_| DataValue::Number(1.0)).collect::<Column>())?;
        let count = |v: &[f64]| v.len() as f64;
        let res = groupby.agg(&data, &[(var, &count)])?;
        Ok(res.drop_nulls(&["x", "y"]))
    }
}

/// Error bar method with its level parameter.
#[derive(Clone)]
pub enum Errorbar {
    /// No interval.
    None,
    /// Bootstrap confidence interval of the given width (percent).
    Ci(f64),
    /// Percentile interval of the given width (percent).
    Pi(f64),
    /// Multiple of the standard error.
    Se(f64),
    /// Multiple of the standard deviation.
    Sd(f64),
    /// A function from values to `(min, max)`.
    Custom(Arc<dyn Fn(&[f64]) -> (f64, f64) + Send + Sync>),
}

impl fmt::Debug for Errorbar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Errorbar::None => f.write_str("None"),
            Errorbar::Ci(l) => write!(f, "Ci({l})"),
            Errorbar::Pi(l) => write!(f, "Pi({l})"),
            Errorbar::Se(l) => write!(f, "Se({l})"),
            Errorbar::Sd(l) => write!(f, "Sd({l})"),
            Errorbar::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl Errorbar {
    /// Method name with an explicit level.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] for an unknown method.
    pub fn with_level(method: &str, level: f64) -> Result<Self> {
        Ok(match method {
            "ci" => Errorbar::Ci(level),
            "pi" => Errorbar::Pi(level),
            "se" => Errorbar::Se(level),
            "sd" => Errorbar::Sd(level),
            _ => {
                return Err(Error::config(format!(
                    "`errorbar` must be one of ci, pi, se or sd; not {method:?}"
                )))
            }
        })
    }

    /// Wrap a function as an interval method.
    pub fn custom(func: impl Fn(&[f64]) -> (f64, f64) + Send + Sync + 'static) -> Self {
        Errorbar::Custom(Arc::new(func))
    }
}

impl FromStr for Errorbar {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let level = match s {
            "ci" | "pi" => 95.0,
            _ => 1.0,
        };
        Self::with_level(s, level)
    }
}

/// Central interval of `width` percent.
fn percentile_interval(values: &[f64], width: f64) -> (f64, f64) {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    sorted.sort_by(f64::total_cmp);
    let edge = (100.0 - width) / 2.0;
    (percentile(&sorted, edge), percentile(&sorted, 100.0 - edge))
}

fn weighted_mean(values: &[f64], weights: Option<&[f64]>) -> f64 {
    match weights {
        Some(w) => {
            let total: f64 = w.iter().sum();
            values.iter().zip(w).map(|(v, w)| v * w).sum::<f64>() / total
        }
        None => mean(values),
    }
}

/// Resample with replacement `n_boot` times, reducing each sample with
/// `func`. With `units`, whole units are resampled first and observations
/// are then resampled within each chosen unit.
pub fn bootstrap(
    values: &[f64],
    weights: Option<&[f64]>,
    units: Option<&[DataValue]>,
    n_boot: usize,
    seed: Option<u64>,
    func: impl Fn(&[f64], Option<&[f64]>) -> f64,
) -> Vec<f64> {
    let mut rng = seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
    let n = values.len();
    if n == 0 {
        return Vec::new();
    }

    let mut out = Vec::with_capacity(n_boot);
    match units {
        None => {
            let mut sample = vec![0.0; n];
            let mut sample_w = weights.map(|_| vec![0.0; n]);
            for _ in 0..n_boot {
                for i in 0..n {
                    let j = rng.gen_range(0..n);
                    sample[i] = values[j];
                    if let (Some(sw), Some(w)) = (sample_w.as_mut(), weights) {
                        sw[i] = w[j];
                    }
                }
                out.push(func(&sample, sample_w.as_deref()));
            }
        }
        Some(units) => {
            let mut by_unit: BTreeMap<&DataValue, Vec<usize>> = BTreeMap::new();
            for (i, unit) in units.iter().enumerate().take(n) {
                by_unit.entry(unit).or_default().push(i);
            }
            let groups: Vec<Vec<usize>> = by_unit.into_values().collect();
            let n_units = groups.len();
            for _ in 0..n_boot {
                let mut sample = Vec::with_capacity(n);
                let mut sample_w = weights.map(|_| Vec::with_capacity(n));
                for _ in 0..n_units {
                    let rows = &groups[rng.gen_range(0..n_units)];
                    for _ in 0..rows.len() {
                        let j = rows[rng.gen_range(0..rows.len())];
                        sample.push(values[j]);
                        if let (Some(sw), Some(w)) = (sample_w.as_mut(), weights) {
                            sw.push(w[j]);
                        }
                    }
                }
                out.push(func(&sample, sample_w.as_deref()));
            }
        }
    }
    out
}

/// Estimate the value axis per group with an error interval.
///
/// When the data has a `weight` column the weighted engine is used, which
/// supports only the mean with bootstrap (`ci`) intervals.
#[derive(Debug, Clone)]
pub struct Est {
    func: Estimator,
    errorbar: Errorbar,
    n_boot: usize,
    seed: Option<u64>,
}

impl Default for Est {
    fn default() -> Self {
        Self { func: Estimator::Mean, errorbar: Errorbar::Ci(95.0), n_boot: 1000, seed: None }
    }
}

impl Est {
    /// Mean with a 95% bootstrap interval.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Estimator.
    #[must_use]
    pub fn func(mut self, func: Estimator) -> Self {
        self.func = func;
        self
    }

    /// Interval method.
    #[must_use]
    pub fn errorbar(mut self, errorbar: Errorbar) -> Self {
        self.errorbar = errorbar;
        self
    }

    /// Bootstrap iterations.
    #[must_use]
    pub fn n_boot(mut self, n: usize) -> Self {
        self.n_boot = n;
        self
    }

    /// Seed for reproducible bootstrap intervals.
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    fn estimate(&self, data: &DataFrame, var: &str, weighted: bool) -> (f64, f64, f64) {
        let raw = data.numeric(var).unwrap_or_default();
        let raw_w = data.numeric("weight");
        let keep: Vec<usize> = (0..raw.len()).filter(|&i| !raw[i].is_nan()).collect();
        let vals: Vec<f64> = keep.iter().map(|&i| raw[i]).collect();
        let weights: Option<Vec<f64>> =
            raw_w.filter(|_| weighted).map(|w| keep.iter().map(|&i| w[i]).collect());
        let units: Option<Vec<DataValue>> = data
            .get("units")
            .map(|u| keep.iter().map(|&i| u.get(i).cloned().unwrap_or(DataValue::Null)).collect());

        let estimate = if weighted {
            weighted_mean(&vals, weights.as_deref())
        } else {
            self.func.apply(&vals)
        };
        if vals.len() <= 1 {
            return (estimate, f64::NAN, f64::NAN);
        }
        let (lo, hi) = match &self.errorbar {
            Errorbar::None => (f64::NAN, f64::NAN),
            Errorbar::Custom(func) => func(&vals),
            Errorbar::Sd(level) => {
                let half = variance(&vals).sqrt() * level;
                (estimate - half, estimate + half)
            }
            Errorbar::Se(level) => {
                let half = (variance(&vals) / vals.len() as f64).sqrt() * level;
                (estimate - half, estimate + half)
            }
            Errorbar::Pi(width) => percentile_interval(&vals, *width),
            Errorbar::Ci(width) => {
                let boots = if weighted {
                    bootstrap(&vals, weights.as_deref(), units.as_deref(), self.n_boot, self.seed, weighted_mean)
                } else {
                    bootstrap(&vals, None, units.as_deref(), self.n_boot, self.seed, |v, _| self.func.apply(v))
                };
                percentile_interval(&boots, *width)
            }
        };
        (estimate, lo, hi)
    }
}

impl Stat for Est {
    fn group_by_orient(&self) -> bool {
        true
    }

    fn compute(&self, data: &DataFrame, groupby: &GroupBy, orient: Orient, _: &ScaleMap) -> Result<DataFrame> {
        let var = orient.other();
        let weighted = data.has_column("weight");
        if weighted {
            if !matches!(self.func, Estimator::Mean) {
                return Err(Error::config(format!(
                    "Weighted estimator must be 'mean', not {:?}.",
                    self.func
                )));
            }
            if !matches!(self.errorbar, Errorbar::None | Errorbar::Ci(_)) {
                return Err(Error::config(format!(
                    "Error bar method must be 'ci', not {:?}.",
                    self.errorbar
                )));
            }
        }
        let (min_var, max_var) = (format!("{var}min"), format!("{var}max"));
        let res = groupby.apply(data, |df| {
            let (est, lo, hi) = self.estimate(df, var, weighted);
            DataFrame::new()
                .column(var, vec![est])?
                .column(min_var.as_str(), vec![lo])?
                .column(max_var.as_str(), vec![hi])
        })?;
        let mut res = res.drop_nulls(&[var]);
        let est = res.numeric(var).unwrap_or_default();
        for name in [&min_var, &max_var] {
            let filled: Vec<f64> = res
                .numeric(name)
                .unwrap_or_default()
                .into_iter()
                .zip(&est)
                .map(|(v, e)| if v.is_nan() { *e } else { v })
                .collect();
            res.insert(name.as_str(), filled)?;
        }
        Ok(res)
    }
}
