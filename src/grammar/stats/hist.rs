//! Histogram binning.

use std::str::FromStr;

use super::{grouping_vars, percentile, Common, Stat};
use crate::error::{Error, Result};
use crate::grammar::data::DataFrame;
use crate::grammar::groupby::GroupBy;
use crate::grammar::orient::Orient;
use crate::grammar::scales::ticks::linspace;
use crate::grammar::scales::{ScaleKind, ScaleMap};

/// Aggregate statistic of each bin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HistStat {
    /// Number of observations.
    #[default]
    Count,
    /// Count divided by bin width.
    Frequency,
    /// Normalized so the total area is one.
    Density,
    /// Normalized so bar heights sum to one.
    Probability,
    /// Same as [`HistStat::Probability`].
    Proportion,
    /// Normalized so bar heights sum to 100.
    Percent,
}

impl HistStat {
    /// Output column name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            HistStat::Count => "count",
            HistStat::Frequency => "frequency",
            HistStat::Density => "density",
            HistStat::Probability => "probability",
            HistStat::Proportion => "proportion",
            HistStat::Percent => "percent",
        }
    }
}

impl FromStr for HistStat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "count" => HistStat::Count,
            "frequency" => HistStat::Frequency,
            "density" => HistStat::Density,
            "probability" => HistStat::Probability,
            "proportion" => HistStat::Proportion,
            "percent" => HistStat::Percent,
            _ => {
                return Err(Error::config(format!(
                    "The `stat` parameter must be one of count, frequency, density, probability, proportion or percent; not {s:?}"
                )))
            }
        })
    }
}

/// Bin count rule.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Bins {
    /// The smaller width of the Sturges and Freedman-Diaconis rules.
    #[default]
    Auto,
    /// `log2(n) + 1` bins.
    Sturges,
    /// Freedman-Diaconis width, `2 IQR n^(-1/3)`.
    Fd,
    /// Scott's width, `(24 sqrt(pi) / n)^(1/3) sd`.
    Scott,
    /// `sqrt(n)` bins.
    Sqrt,
    /// `2 n^(1/3)` bins.
    Rice,
    /// Fixed number of equal bins.
    Count(usize),
    /// Explicit edges.
    Edges(Vec<f64>),
}

impl FromStr for Bins {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "auto" => Bins::Auto,
            "sturges" => Bins::Sturges,
            "fd" => Bins::Fd,
            "scott" => Bins::Scott,
            "sqrt" => Bins::Sqrt,
            "rice" => Bins::Rice,
            other => match other.parse::<usize>() {
                Ok(n) => Bins::Count(n),
                Err(_) => return Err(Error::config(format!("Unknown bin rule {s:?}"))),
            },
        })
    }
}

impl From<usize> for Bins {
    fn from(n: usize) -> Self {
        Bins::Count(n)
    }
}

impl From<Vec<f64>> for Bins {
    fn from(edges: Vec<f64>) -> Self {
        Bins::Edges(edges)
    }
}

/// Equal-width bin edges over `[start, stop]` following a rule.
fn rule_edges(values: &[f64], rule: &Bins, start: f64, stop: f64) -> Vec<f64> {
    if start == stop {
        return vec![start - 0.5, stop + 0.5];
    }
    let in_range: Vec<f64> = values.iter().copied().filter(|v| *v >= start && *v <= stop).collect();
    let n = in_range.len().max(1) as f64;
    let ptp = stop - start;
    let fd = || {
        let mut sorted = in_range.clone();
        sorted.sort_by(f64::total_cmp);
        2.0 * (percentile(&sorted, 75.0) - percentile(&sorted, 25.0)) * n.powf(-1.0 / 3.0)
    };
    let sturges = ptp / (n.log2() + 1.0);
    let width = match rule {
        Bins::Count(k) => return linspace(start, stop, (*k).max(1) + 1),
        Bins::Edges(edges) => return edges.clone(),
        Bins::Sturges => sturges,
        Bins::Sqrt => ptp / n.sqrt(),
        Bins::Rice => ptp / (2.0 * n.cbrt()),
        Bins::Scott => {
            let m = in_range.iter().sum::<f64>() / n;
            let sd = (in_range.iter().map(|v| (v - m).powi(2)).sum::<f64>() / n).sqrt();
            (24.0 * std::f64::consts::PI.sqrt() / n).cbrt() * sd
        }
        Bins::Fd => fd(),
        Bins::Auto => {
            let fd = fd();
            if fd > 0.0 {
                fd.min(sturges)
            } else {
                sturges
            }
        }
    };
    let count = if width > 0.0 { (ptp / width).ceil().max(1.0) as usize } else { 1 };
    linspace(start, stop, count + 1)
}

/// Bin observations along the orientation axis.
#[derive(Debug, Clone, Default)]
pub struct Hist {
    stat: HistStat,
    bins: Bins,
    binwidth: Option<f64>,
    binrange: Option<(f64, f64)>,
    common_norm: Common,
    common_bins: Common,
    cumulative: bool,
    discrete: bool,
}

impl Hist {
    /// Counts in automatically sized, shared bins.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bin statistic.
    #[must_use]
    pub fn stat(mut self, stat: HistStat) -> Self {
        self.stat = stat;
        self
    }

    /// Bin rule, count or edges.
    #[must_use]
    pub fn bins(mut self, bins: impl Into<Bins>) -> Self {
        self.bins = bins.into();
        self
    }

    /// Bin width (overrides the bin rule).
    #[must_use]
    pub fn binwidth(mut self, width: f64) -> Self {
        self.binwidth = Some(width);
        self
    }

    /// Range covered by the bins.
    #[must_use]
    pub fn binrange(mut self, lo: f64, hi: f64) -> Self {
        self.binrange = Some((lo, hi));
        self
    }

    /// Normalization sharing across groups.
    #[must_use]
    pub fn common_norm(mut self, common: impl Into<Common>) -> Self {
        self.common_norm = common.into();
        self
    }

    /// Bin sharing across groups.
    #[must_use]
    pub fn common_bins(mut self, common: impl Into<Common>) -> Self {
        self.common_bins = common.into();
        self
    }

    /// Accumulate bins.
    #[must_use]
    pub fn cumulative(mut self, cumulative: bool) -> Self {
        self.cumulative = cumulative;
        self
    }

    /// One bin per integer value.
    #[must_use]
    pub fn discrete(mut self, discrete: bool) -> Self {
        self.discrete = discrete;
        self
    }

    fn bin_edges(&self, data: &DataFrame, orient: Orient, discrete: bool) -> Vec<f64> {
        let values: Vec<f64> = data
            .numeric(orient.var())
            .unwrap_or_default()
            .into_iter()
            .filter(|v| v.is_finite())
            .collect();
        let (start, stop) = self.binrange.unwrap_or_else(|| {
            (
                values.iter().copied().fold(f64::INFINITY, f64::min),
                values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            )
        });
        if !(start.is_finite() && stop.is_finite()) {
            return vec![0.0, 1.0];
        }
        if discrete {
            let n = (stop - start).round() as usize + 2;
            return (0..n).map(|i| start - 0.5 + i as f64).collect();
        }
        match self.binwidth {
            // Fixed-width bins from `start`; the last edge lands on or past `stop`.
            Some(width) if width.is_finite() && width > 0.0 => {
                let n = (((stop - start) / width) - 1e-9).ceil().max(1.0) as usize;
                (0..=n).map(|i| start + i as f64 * width).collect()
            }
            _ => rule_edges(&values, &self.bins, start, stop),
        }
    }

    fn eval(&self, data: &DataFrame, orient: Orient, edges: &[f64]) -> Result<DataFrame> {
        let values = data.numeric(orient.var()).unwrap_or_default();
        let weights = data.numeric("weight").unwrap_or_else(|| vec![1.0; values.len()]);
        let nbins = edges.len().saturating_sub(1);
        let mut hist = vec![0.0; nbins];
        if let (Some(&first), Some(&last)) = (edges.first(), edges.last()) {
            for (v, w) in values.iter().zip(&weights) {
                if !(v.is_finite() && *v >= first && *v <= last) {
                    continue;
                }
                let idx = edges.partition_point(|e| e <= v).saturating_sub(1).min(nbins.saturating_sub(1));
                hist[idx] += w;
            }
        }
        let widths: Vec<f64> = edges.windows(2).map(|w| w[1] - w[0]).collect();
        if self.stat == HistStat::Density {
            let total: f64 = hist.iter().sum();
            for (h, w) in hist.iter_mut().zip(&widths) {
                *h /= total * w;
            }
        }
        let centers: Vec<f64> = edges.windows(2).map(|w| (w[0] + w[1]) / 2.0).collect();
        DataFrame::new()
            .column(orient.var(), centers)?
            .column("count", hist)?
            .column("space", widths)
    }

    fn normalize(&self, data: &DataFrame) -> Result<DataFrame> {
        let count = data.numeric("count").unwrap_or_default();
        let space = data.numeric("space").unwrap_or_default();
        let total: f64 = count.iter().sum();
        let mut hist: Vec<f64> = match self.stat {
            HistStat::Probability | HistStat::Proportion => count.iter().map(|c| c / total).collect(),
            HistStat::Percent => count.iter().map(|c| c / total * 100.0).collect(),
            HistStat::Frequency => count.iter().zip(&space).map(|(c, s)| c / s).collect(),
            HistStat::Count | HistStat::Density => count.clone(),
        };
        if self.cumulative {
            if matches!(self.stat, HistStat::Density | HistStat::Frequency) {
                for (h, s) in hist.iter_mut().zip(&space) {
                    *h *= s;
                }
            }
            let mut acc = 0.0;
            for h in &mut hist {
                acc += *h;
                *h = acc;
            }
        }
        let mut out = data.clone();
        out.insert(self.stat.name(), hist)?;
        Ok(out)
    }
}

impl Stat for Hist {
    fn compute(&self, data: &DataFrame, groupby: &GroupBy, orient: Orient, scales: &ScaleMap) -> Result<DataFrame> {
        let nominal = scales
            .get(orient.var())
            .is_some_and(|s| matches!(s.kind(), ScaleKind::Nominal | ScaleKind::Ordinal));
        let discrete = self.discrete || nominal;
        let grouping = grouping_vars(data, groupby);

        let binned = match self.common_bins.subgroups("common_bins", &grouping) {
            None => {
                let edges = self.bin_edges(data, orient, discrete);
                groupby.apply(data, |df| self.eval(df, orient, &edges))?
            }
            Some(bin_vars) => GroupBy::new(bin_vars)?.apply(data, |subset| {
                let edges = self.bin_edges(subset, orient, discrete);
                groupby.apply(subset, |df| self.eval(df, orient, &edges))
            })?,
        };

        let mut res = match self.common_norm.subgroups("common_norm", &grouping) {
            None => self.normalize(&binned)?,
            Some(norm_vars) => GroupBy::new(norm_vars)?.apply(&binned, |df| self.normalize(df))?,
        };
        let stat = res.get(self.stat.name()).cloned().unwrap_or_default();
        res.insert(orient.other(), stat)?;
        Ok(res)
    }
}
