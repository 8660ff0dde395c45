//! Letter-value summaries: nested boxes reaching further into the tails
//! than a quartile box.

use super::{norm_ppf, percentile, Stat};
use crate::error::{Error, Result};
use crate::grammar::data::{Column, DataFrame, DataValue};
use crate::grammar::groupby::GroupBy;
use crate::grammar::orient::Orient;
use crate::grammar::scales::ScaleMap;

/// Rule choosing how many letter values (box depths) to compute.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum KDepth {
    /// `log2(n) - 3` boxes, leaving a handful of observations per tail.
    #[default]
    Tukey,
    /// Stop when roughly this fraction of the data lies outside the boxes.
    Proportion(f64),
    /// Stop when the outermost letter value is estimated with this
    /// confidence level (`alpha`).
    Trustworthy(f64),
    /// Extend until the outermost box spans the data range.
    Full,
    /// Exactly this many boxes.
    Fixed(usize),
}

impl KDepth {
    /// Number of boxes for a sample of size `n`, at least one.
    #[must_use]
    pub fn depth(self, n: usize) -> usize {
        if n == 0 {
            return 1;
        }
        let log2n = (n as f64).log2();
        let k = match self {
            KDepth::Tukey => log2n.trunc() - 3.0,
            KDepth::Proportion(p) => log2n.trunc() - (n as f64 * p).log2().trunc() + 1.0,
            KDepth::Trustworthy(alpha) => {
                let point_conf = 2.0 * norm_ppf(1.0 - alpha / 2.0).powi(2);
                (n as f64 / point_conf).log2().trunc() + 1.0
            }
            KDepth::Full => log2n.trunc() + 1.0,
            KDepth::Fixed(k) => k as f64,
        };
        if k.is_finite() && k >= 1.0 {
            k as usize
        } else {
            1
        }
    }

    fn validate(self) -> Result<()> {
        match self {
            KDepth::Proportion(p) if !(p > 0.0 && p < 1.0) => {
                Err(Error::config(format!("outlier proportion must be in (0, 1); got {p}")))
            }
            KDepth::Trustworthy(a) if !(a > 0.0 && a < 1.0) => {
                Err(Error::config(format!("trust alpha must be in (0, 1); got {a}")))
            }
            _ => Ok(()),
        }
    }
}

/// Letter values along the value axis, one row per box plus one per flier.
///
/// Box rows carry the median in the value column, the box edges in its
/// `min`/`max` columns and the box `depth` (0 is the innermost, quartile,
/// box). Flier rows have equal value, `min` and `max` and a null depth.
#[derive(Debug, Clone, Copy, Default)]
pub struct LetterValues {
    k_depth: KDepth,
}

impl LetterValues {
    /// Summary with the Tukey depth rule.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Depth rule.
    #[must_use]
    pub fn k_depth(mut self, k_depth: KDepth) -> Self {
        self.k_depth = k_depth;
        self
    }

    fn eval(&self, data: &DataFrame, orient: Orient) -> Result<DataFrame> {
        let var = orient.other();
        let mut sorted: Vec<f64> =
            data.numeric(var).unwrap_or_default().into_iter().filter(|v| v.is_finite()).collect();
        sorted.sort_by(f64::total_cmp);

        let min_col = format!("{var}min");
        let max_col = format!("{var}max");
        if sorted.is_empty() {
            return DataFrame::new()
                .column(var, Vec::<f64>::new())?
                .column(min_col, Vec::<f64>::new())?
                .column(max_col, Vec::<f64>::new())?
                .column("depth", Vec::<f64>::new());
        }

        let k = self.k_depth.depth(sorted.len());
        let median = percentile(&sorted, 50.0);
        let mut values = Vec::with_capacity(k);
        let mut mins = Vec::with_capacity(k);
        let mut maxs = Vec::with_capacity(k);
        let mut depths = Vec::with_capacity(k);
        for depth in 0..k {
            let tail = 0.5_f64.powi(depth as i32 + 2) * 100.0;
            let outermost = depth + 1 == k;
            let (lo, hi) = if outermost && self.k_depth == KDepth::Full {
                (0.0, 100.0)
            } else {
                (tail, 100.0 - tail)
            };
            values.push(DataValue::Number(median));
            mins.push(DataValue::Number(percentile(&sorted, lo)));
            maxs.push(DataValue::Number(percentile(&sorted, hi)));
            depths.push(DataValue::Number(depth as f64));
        }

        let lower = mins.last().and_then(DataValue::as_f64).unwrap_or(f64::NEG_INFINITY);
        let upper = maxs.last().and_then(DataValue::as_f64).unwrap_or(f64::INFINITY);
        for &v in sorted.iter().filter(|&&v| v < lower || v > upper) {
            values.push(DataValue::Number(v));
            mins.push(DataValue::Number(v));
            maxs.push(DataValue::Number(v));
            depths.push(DataValue::Null);
        }

        DataFrame::new()
            .column(var, Column::new(values))?
            .column(min_col, Column::new(mins))?
            .column(max_col, Column::new(maxs))?
            .column("depth", Column::new(depths))
    }
}

impl Stat for LetterValues {
    fn group_by_orient(&self) -> bool {
        true
    }

    fn compute(&self, data: &DataFrame, groupby: &GroupBy, orient: Orient, _: &ScaleMap) -> Result<DataFrame> {
        self.k_depth.validate()?;
        groupby.apply(data, |df| self.eval(df, orient))
    }
}
