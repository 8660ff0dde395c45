//! Tick placement and tick label formatting.
//!
//! Locators produce candidate tick values for a view interval in data units;
//! formatters turn them into labels. Both are configured from the user-facing
//! [`TickSpec`] and [`LabelSpec`] of a scale.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike};

use super::transform::Transform;
use crate::grammar::data::{datetime_to_num, num_to_datetime};

/// User configuration of major/minor tick placement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickSpec {
    /// Place ticks exactly at these values.
    pub at: Option<Vec<f64>>,
    /// Choose "nice" ticks, at most this many.
    pub upto: Option<usize>,
    /// Exactly this many evenly spaced ticks.
    pub count: Option<usize>,
    /// Ticks at multiples of this step.
    pub every: Option<f64>,
    /// Restrict `count`/`every` ticks to this interval.
    pub between: Option<(f64, f64)>,
    /// Number of minor ticks between major ticks.
    pub minor: Option<usize>,
}

impl TickSpec {
    /// Default automatic ticks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ticks at fixed locations.
    #[must_use]
    pub fn at(mut self, values: impl Into<Vec<f64>>) -> Self {
        self.at = Some(values.into());
        self
    }

    /// At most `n` nice ticks.
    #[must_use]
    pub fn upto(mut self, n: usize) -> Self {
        self.upto = Some(n);
        self
    }

    /// Exactly `n` evenly spaced ticks.
    #[must_use]
    pub fn count(mut self, n: usize) -> Self {
        self.count = Some(n);
        self
    }

    /// Ticks every `step` units.
    #[must_use]
    pub fn every(mut self, step: f64) -> Self {
        self.every = Some(step);
        self
    }

    /// Bound `count`/`every` ticks.
    #[must_use]
    pub fn between(mut self, lo: f64, hi: f64) -> Self {
        self.between = Some((lo, hi));
        self
    }

    /// Minor ticks between majors.
    #[must_use]
    pub fn minor(mut self, n: usize) -> Self {
        self.minor = Some(n);
        self
    }
}

/// User configuration of tick labels.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelSpec {
    /// Format pattern: either a bare spec like `".2f"` or a template with an
    /// `{x}` / `{x:spec}` placeholder and optional `{pos}`.
    pub like: Option<String>,
    /// Log base for scientific labels; `Some(None)` disables the default
    /// base taken from a log transform.
    pub base: Option<Option<f64>>,
    /// Unit with SI prefixes, as `(separator, unit)`.
    pub unit: Option<(String, String)>,
    /// Compact date labels (temporal scales).
    pub concise: bool,
}

impl LabelSpec {
    /// Default labels.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Format with a pattern.
    #[must_use]
    pub fn like(mut self, pattern: impl Into<String>) -> Self {
        self.like = Some(pattern.into());
        self
    }

    /// Scientific labels in `base` (or none with `None`).
    #[must_use]
    pub fn base(mut self, base: Option<f64>) -> Self {
        self.base = Some(base);
        self
    }

    /// SI-prefixed labels with a unit, separated by a space.
    #[must_use]
    pub fn unit(mut self, unit: impl Into<String>) -> Self {
        let unit = unit.into();
        let sep = if unit.is_empty() { String::new() } else { " ".to_string() };
        self.unit = Some((sep, unit));
        self
    }

    /// Compact date labels.
    #[must_use]
    pub fn concise(mut self, concise: bool) -> Self {
        self.concise = concise;
        self
    }
}

const AUTO_STEPS: [f64; 5] = [1.0, 2.0, 2.5, 5.0, 10.0];
const UPTO_STEPS: [f64; 7] = [1.0, 1.5, 2.0, 2.5, 3.0, 5.0, 10.0];

/// Tick placement rule.
#[derive(Debug, Clone, PartialEq)]
pub enum Locator {
    /// Nice ticks with at most `nbins` intervals (`None` uses the available
    /// tick space, capped at nine).
    MaxN {
        /// Target number of intervals.
        nbins: Option<usize>,
        /// Allowed mantissas of the tick step.
        steps: Vec<f64>,
    },
    /// `count` ticks spanning the view.
    Linear(usize),
    /// Fixed values.
    Fixed(Vec<f64>),
    /// Multiples of a step.
    Multiple(f64),
    /// Integer powers of a base.
    Log {
        /// Logarithm base.
        base: f64,
        /// Maximum number of ticks.
        numticks: Option<usize>,
        /// Mantissas of minor ticks within each decade.
        subs: Vec<f64>,
    },
    /// Zero and powers of ten outside the linear threshold.
    Symlog(f64),
    /// Ticks at minor subdivisions of another locator's ticks.
    Minor {
        /// Ticks to subdivide.
        major: Box<Locator>,
        /// Subdivisions per major interval.
        n: usize,
    },
    /// Calendar ticks.
    Date {
        /// Maximum number of ticks.
        upto: Option<usize>,
    },
}

impl Locator {
    /// Default automatic locator.
    #[must_use]
    pub fn auto() -> Self {
        Locator::MaxN { nbins: None, steps: AUTO_STEPS.to_vec() }
    }

    /// Build the major and minor locators of a continuous scale.
    #[must_use]
    pub fn continuous(spec: &TickSpec, trans: Transform) -> (Locator, Option<Locator>) {
        let log_base = trans.log_base();
        let symlog = trans.symlog_thresh();
        let major = if let Some(upto) = spec.upto {
            match log_base {
                Some(base) => Locator::Log { base, numticks: Some(upto), subs: vec![1.0] },
                None => Locator::MaxN { nbins: Some(upto), steps: UPTO_STEPS.to_vec() },
            }
        } else if let Some(count) = spec.count {
            match spec.between {
                None => Locator::Linear(count),
                Some((lo, hi)) if log_base.is_some() || symlog.is_some() => {
                    let (a, b) = (trans.forward(lo), trans.forward(hi));
                    Locator::Fixed(linspace(a, b, count).into_iter().map(|v| trans.inverse(v)).collect())
                }
                Some((lo, hi)) => Locator::Fixed(linspace(lo, hi, count)),
            }
        } else if let Some(every) = spec.every {
            match spec.between {
                None => Locator::Multiple(every),
                Some((lo, hi)) => {
                    let n = ((hi - lo) / every + 1e-9).floor() as usize;
                    Locator::Fixed((0..=n).map(|i| lo + every * i as f64).collect())
                }
            }
        } else if let Some(at) = &spec.at {
            Locator::Fixed(at.clone())
        } else if let Some(base) = log_base {
            Locator::Log { base, numticks: None, subs: vec![1.0] }
        } else if let Some(thresh) = symlog {
            Locator::Symlog(thresh)
        } else {
            Locator::auto()
        };

        let minor = match (spec.minor, log_base) {
            (None, Some(base)) => Some(Locator::Log {
                base,
                numticks: None,
                subs: (2..base.ceil() as usize).map(|s| s as f64).collect(),
            }),
            (None, None) => None,
            (Some(n), Some(base)) => {
                let subs = linspace(0.0, base, n + 2);
                Some(Locator::Log { base, numticks: None, subs: subs[1..subs.len() - 1].to_vec() })
            }
            (Some(n), None) => Some(Locator::Minor { major: Box::new(major.clone()), n: n + 1 }),
        };
        (major, minor)
    }

    /// Tick values for the view `[vmin, vmax]`. `space` is the number of ticks
    /// that comfortably fit on the axis.
    #[must_use]
    pub fn ticks(&self, vmin: f64, vmax: f64, space: usize) -> Vec<f64> {
        let (lo, hi) = if vmin <= vmax { (vmin, vmax) } else { (vmax, vmin) };
        if !lo.is_finite() || !hi.is_finite() {
            return Vec::new();
        }
        match self {
            Locator::MaxN { nbins, steps } => {
                let nbins = nbins.unwrap_or_else(|| space.clamp(1, 9));
                max_n_ticks(lo, hi, nbins, steps)
            }
            Locator::Linear(count) => {
                if lo == hi {
                    vec![lo]
                } else {
                    linspace(lo, hi, *count)
                }
            }
            Locator::Fixed(values) => values.clone(),
            Locator::Multiple(step) => {
                if *step <= 0.0 {
                    return Vec::new();
                }
                let start = (lo / step).floor() * step;
                let n = ((hi - start + 0.001 * step) / step).floor() as usize;
                (0..=n).map(|i| start + *step * i as f64).collect()
            }
            Locator::Log { base, numticks, subs } => log_ticks(lo, hi, *base, numticks.unwrap_or(space.clamp(2, 9)), subs),
            Locator::Symlog(thresh) => symlog_ticks(lo, hi, *thresh),
            Locator::Minor { major, n } => {
                let majors = major.ticks(lo, hi, space);
                if majors.len() < 2 || *n < 2 {
                    return Vec::new();
                }
                let step = majors[1] - majors[0];
                let minor_step = step / *n as f64;
                let start = majors[0] - step;
                let count = (majors.len() + 1) * n;
                (0..=count)
                    .map(|i| start + minor_step * i as f64)
                    .filter(|v| {
                        !majors.iter().any(|m| (m - v).abs() < minor_step * 1e-6)
                            && *v >= lo
                            && *v <= hi
                    })
                    .collect()
            }
            Locator::Date { upto } => date_ticks(lo, hi, upto.unwrap_or(space.clamp(3, 9))).0,
        }
    }
}

/// `n` evenly spaced values from `start` to `stop` inclusive.
#[must_use]
pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    crate::palettes::linspace(start, stop, n)
}

fn max_n_ticks(vmin: f64, vmax: f64, nbins: usize, steps: &[f64]) -> Vec<f64> {
    let (vmin, vmax) = if (vmax - vmin).abs() < f64::EPSILON * vmax.abs().max(1.0) {
        let pad = if vmin == 0.0 { 1.0 } else { vmin.abs() * 0.05 };
        (vmin - pad, vmax + pad)
    } else {
        (vmin, vmax)
    };
    let nbins = nbins.max(1) as f64;
    let dv = vmax - vmin;
    let meanv = (vmax + vmin) / 2.0;
    let offset = if meanv.abs() / dv < 100.0 {
        0.0
    } else {
        10f64.powf(meanv.abs().log10().floor()).copysign(meanv)
    };
    let scale = 10f64.powf((dv / nbins).log10().floor());
    let (lo, hi) = (vmin - offset, vmax - offset);

    let mut extended: Vec<f64> = steps[..steps.len() - 1].iter().map(|s| s * 0.1).collect();
    extended.extend_from_slice(steps);
    if steps.len() > 1 {
        extended.push(10.0 * steps[1]);
    }
    let extended: Vec<f64> = extended.iter().map(|s| s * scale).collect();

    let raw_step = (hi - lo) / nbins;
    let istep = extended
        .iter()
        .position(|&s| {
            let floored = (lo / s).floor() * s;
            s >= raw_step && floored + s * nbins >= hi
        })
        .unwrap_or(extended.len() - 1);

    let mut ticks = Vec::new();
    for &step in extended[..=istep].iter().rev() {
        let best_vmin = (lo / step).floor() * step;
        let low = edge_le(lo - best_vmin, step);
        let high = edge_ge(hi - best_vmin, step);
        ticks = (low as i64..=high as i64).map(|i| i as f64 * step + best_vmin).collect();
        let visible = ticks.iter().filter(|&&t| t >= lo && t <= hi).count();
        if visible >= 2 {
            break;
        }
    }
    ticks.into_iter().map(|t| clean(t + offset)).collect()
}

fn edge_le(x: f64, step: f64) -> f64 {
    let d = (x / step).floor();
    let m = x - d * step;
    if (m / step - 1.0).abs() < 1e-10 {
        d + 1.0
    } else {
        d
    }
}

fn edge_ge(x: f64, step: f64) -> f64 {
    let d = (x / step).floor();
    let m = x - d * step;
    if (m / step).abs() < 1e-10 {
        d
    } else {
        d + 1.0
    }
}

/// Snap values that are zero up to rounding error.
fn clean(v: f64) -> f64 {
    if v.abs() < 1e-12 {
        0.0
    } else {
        v
    }
}

fn log_ticks(lo: f64, hi: f64, base: f64, numticks: usize, subs: &[f64]) -> Vec<f64> {
    if hi <= 0.0 || base <= 1.0 {
        return Vec::new();
    }
    let lo = if lo <= 0.0 { hi / base.powi(6) } else { lo };
    let first = snap(log_of(lo, base)).floor() as i32;
    let last = snap(log_of(hi, base)).ceil() as i32;
    let decades = (last - first).max(1) as usize;
    let is_major = subs == [1.0];
    let stride = if is_major { decades.div_ceil(numticks.max(1)).max(1) } else { 1 };
    let mut out = Vec::new();
    let mut k = first;
    while k <= last {
        let decade = base.powi(k);
        for s in subs {
            out.push(decade * s);
        }
        k += stride as i32;
    }
    out
}

fn log_of(v: f64, base: f64) -> f64 {
    if base == 10.0 {
        v.log10()
    } else {
        v.ln() / base.ln()
    }
}

/// Round exponents that are integral up to rounding error.
fn snap(k: f64) -> f64 {
    if (k - k.round()).abs() < 1e-9 {
        k.round()
    } else {
        k
    }
}

fn symlog_ticks(lo: f64, hi: f64, thresh: f64) -> Vec<f64> {
    let decades = |extent: f64| -> Vec<f64> {
        if extent <= thresh {
            return Vec::new();
        }
        let first = snap(thresh.log10()).ceil() as i32;
        let last = snap(extent.log10()).ceil() as i32;
        (first..=last).map(|k| 10f64.powi(k)).collect()
    };
    let mut out: Vec<f64> = decades(-lo).into_iter().rev().map(|v| -v).collect();
    if lo <= 0.0 && hi >= 0.0 {
        out.push(0.0);
    }
    out.extend(decades(hi));
    if out.len() < 2 {
        return max_n_ticks(lo, hi, 5, &AUTO_STEPS);
    }
    out
}

/// Calendar resolution of a set of date ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DateUnit {
    /// Whole years.
    Year,
    /// Whole months.
    Month,
    /// Whole days.
    Day,
    /// Whole hours.
    Hour,
    /// Whole minutes.
    Minute,
    /// Whole seconds.
    Second,
}

impl DateUnit {
    fn intervals(self) -> &'static [i64] {
        match self {
            DateUnit::Year => &[1, 2, 4, 5, 10, 20, 40, 50, 100, 200, 400, 500, 1000],
            DateUnit::Month => &[1, 2, 3, 4, 6],
            DateUnit::Day => &[1, 2, 3, 7, 14],
            DateUnit::Hour => &[1, 2, 3, 4, 6, 12],
            DateUnit::Minute | DateUnit::Second => &[1, 5, 10, 15, 30],
        }
    }

    fn days(self) -> f64 {
        match self {
            DateUnit::Year => 365.25,
            DateUnit::Month => 30.44,
            DateUnit::Day => 1.0,
            DateUnit::Hour => 1.0 / 24.0,
            DateUnit::Minute => 1.0 / 1440.0,
            DateUnit::Second => 1.0 / 86_400.0,
        }
    }
}

/// Date ticks over a view in fractional days since the epoch, with the
/// resolution that was chosen.
#[must_use]
pub fn date_ticks(lo: f64, hi: f64, upto: usize) -> (Vec<f64>, DateUnit) {
    let span = hi - lo;
    let units = [
        DateUnit::Year,
        DateUnit::Month,
        DateUnit::Day,
        DateUnit::Hour,
        DateUnit::Minute,
        DateUnit::Second,
    ];
    let upto = upto.max(2) as f64;
    let mut chosen = (DateUnit::Second, 1);
    for unit in units {
        let n = span / unit.days();
        if n >= 3.0 || unit == DateUnit::Second {
            let interval = unit
                .intervals()
                .iter()
                .copied()
                .find(|&i| n / i as f64 <= upto)
                .unwrap_or_else(|| unit.intervals().last().copied().unwrap_or(1));
            chosen = (unit, interval);
            break;
        }
    }

    let (Some(start), Some(end)) = (num_to_datetime(lo), num_to_datetime(hi)) else {
        return (Vec::new(), chosen.0);
    };
    let (unit, step) = chosen;
    let mut t = floor_date(start, unit, step);
    let mut out = Vec::new();
    while t <= end && out.len() < 1000 {
        if t >= start {
            out.push(datetime_to_num(&t));
        }
        let Some(next) = advance(t, unit, step) else { break };
        t = next;
    }
    (out, unit)
}

fn floor_date(t: NaiveDateTime, unit: DateUnit, step: i64) -> NaiveDateTime {
    let date = t.date();
    let midnight = |d: NaiveDate| d.and_hms_opt(0, 0, 0).unwrap_or(t);
    match unit {
        DateUnit::Year => {
            let y = i64::from(date.year());
            let y = (y.div_euclid(step) * step) as i32;
            NaiveDate::from_ymd_opt(y, 1, 1).map_or(t, midnight)
        }
        DateUnit::Month => {
            let m0 = i64::from(date.month0());
            let m = (m0 / step * step) as u32 + 1;
            NaiveDate::from_ymd_opt(date.year(), m, 1).map_or(t, midnight)
        }
        DateUnit::Day => midnight(date),
        DateUnit::Hour => {
            let h = i64::from(t.hour()) / step * step;
            date.and_hms_opt(h as u32, 0, 0).unwrap_or(t)
        }
        DateUnit::Minute => {
            let m = i64::from(t.minute()) / step * step;
            date.and_hms_opt(t.hour(), m as u32, 0).unwrap_or(t)
        }
        DateUnit::Second => {
            let s = i64::from(t.second()) / step * step;
            date.and_hms_opt(t.hour(), t.minute(), s as u32).unwrap_or(t)
        }
    }
}

fn advance(t: NaiveDateTime, unit: DateUnit, step: i64) -> Option<NaiveDateTime> {
    match unit {
        DateUnit::Year => {
            let y = t.year() + step as i32;
            NaiveDate::from_ymd_opt(y, t.month(), 1).and_then(|d| d.and_hms_opt(0, 0, 0))
        }
        DateUnit::Month => {
            let total = i64::from(t.year()) * 12 + i64::from(t.month0()) + step;
            let y = total.div_euclid(12) as i32;
            let m = total.rem_euclid(12) as u32 + 1;
            NaiveDate::from_ymd_opt(y, m, 1).and_then(|d| d.and_hms_opt(0, 0, 0))
        }
        DateUnit::Day => t.checked_add_signed(Duration::days(step)),
        DateUnit::Hour => t.checked_add_signed(Duration::hours(step)),
        DateUnit::Minute => t.checked_add_signed(Duration::minutes(step)),
        DateUnit::Second => t.checked_add_signed(Duration::seconds(step)),
    }
}

/// Tick label formatting rule.
#[derive(Debug, Clone, PartialEq)]
pub enum Formatter {
    /// Plain decimal labels with a shared precision.
    Scalar,
    /// Pattern-based labels (see [`LabelSpec::like`]).
    Pattern(String),
    /// `base^k` labels at integer powers; other ticks are unlabeled.
    LogSci(f64),
    /// SI-prefixed labels.
    Eng {
        /// Unit suffix.
        unit: String,
        /// Separator between number and prefix.
        sep: String,
    },
    /// Calendar labels.
    Date {
        /// Compact labels.
        concise: bool,
    },
}

impl Formatter {
    /// Build the formatter of a continuous scale.
    #[must_use]
    pub fn continuous(spec: &LabelSpec, trans: Transform) -> Formatter {
        let base = match spec.base {
            Some(base) => base,
            None => trans.log_base().or(trans.symlog_thresh().map(|_| 10.0)),
        };
        if let Some(like) = &spec.like {
            Formatter::Pattern(like.clone())
        } else if let Some(base) = base {
            Formatter::LogSci(base)
        } else if let Some((sep, unit)) = &spec.unit {
            Formatter::Eng { unit: unit.clone(), sep: sep.clone() }
        } else {
            Formatter::Scalar
        }
    }

    /// Labels for a set of tick locations.
    #[must_use]
    pub fn format_ticks(&self, locs: &[f64]) -> Vec<String> {
        match self {
            Formatter::Scalar => {
                let decimals = shared_decimals(locs);
                locs.iter().map(|v| format_fixed(*v, decimals)).collect()
            }
            Formatter::Pattern(p) => {
                locs.iter().enumerate().map(|(i, v)| format_pattern(p, *v, i)).collect()
            }
            Formatter::LogSci(base) => locs.iter().map(|v| format_log(*v, *base)).collect(),
            Formatter::Eng { unit, sep } => locs.iter().map(|v| format_eng(*v, unit, sep)).collect(),
            Formatter::Date { concise } => {
                let unit = infer_date_unit(locs);
                locs.iter().map(|v| format_date(*v, unit, *concise)).collect()
            }
        }
    }
}

/// Decimal places needed to show every value exactly (up to rounding noise).
fn shared_decimals(locs: &[f64]) -> usize {
    locs.iter()
        .filter(|v| v.is_finite())
        .map(|v| {
            (0..=10)
                .find(|&d| {
                    let f = 10f64.powi(d as i32);
                    ((v * f).round() / f - v).abs() <= 1e-9 * v.abs().max(1.0)
                })
                .unwrap_or(10)
        })
        .max()
        .unwrap_or(0)
}

fn format_fixed(v: f64, decimals: usize) -> String {
    let s = format!("{v:.decimals$}");
    if s.starts_with('-') && s[1..].chars().all(|c| c == '0' || c == '.') {
        s[1..].to_string()
    } else {
        s
    }
}

/// `%g` with six significant digits.
fn format_general(v: f64) -> String {
    if v == 0.0 || !v.is_finite() {
        return format!("{v}");
    }
    let exp = v.abs().log10().floor() as i32;
    if (-5..6).contains(&exp) {
        let decimals = (5 - exp).max(0) as usize;
        let s = format!("{v:.decimals$}");
        trim_zeros(&s)
    } else {
        let s = format!("{v:.5e}");
        match s.split_once('e') {
            Some((m, e)) => format!("{}e{}", trim_zeros(m), e),
            None => s,
        }
    }
}

fn trim_zeros(s: &str) -> String {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        s.to_string()
    }
}

fn group_thousands(int_part: &str) -> String {
    let (sign, digits) = int_part.strip_prefix('-').map_or(("", int_part), |d| ("-", d));
    let mut out = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    format!("{sign}{out}")
}

/// Apply a Python-style format spec subset: `[,][.N][f|e|%|g|d]`.
fn apply_spec(v: f64, spec: &str) -> String {
    let grouping = spec.contains(',');
    let spec = spec.replace(',', "");
    let (precision, kind) = match spec.split_once('.') {
        Some((_, rest)) => {
            let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
            let kind = rest[digits.len()..].chars().next();
            (digits.parse::<usize>().ok(), kind)
        }
        None => (None, spec.chars().last().filter(|c| c.is_ascii_alphabetic() || *c == '%')),
    };
    let body = match kind {
        Some('f') => format!("{v:.prec$}", prec = precision.unwrap_or(6)),
        Some('e') => format!("{v:.prec$e}", prec = precision.unwrap_or(6)),
        Some('%') => format!("{:.prec$}%", v * 100.0, prec = precision.unwrap_or(6)),
        Some('d') => format!("{}", v.round() as i64),
        Some('g') | None => match precision {
            Some(p) => {
                let p = p.max(1);
                let exp = if v == 0.0 { 0 } else { v.abs().log10().floor() as i32 };
                let decimals = (p as i32 - 1 - exp).max(0) as usize;
                trim_zeros(&format!("{v:.decimals$}"))
            }
            None => format_general(v),
        },
        Some(_) => format_general(v),
    };
    if grouping {
        let (int_part, rest) = match body.find(|c: char| c == '.' || c == 'e' || c == '%') {
            Some(i) => body.split_at(i),
            None => (body.as_str(), ""),
        };
        format!("{}{rest}", group_thousands(int_part))
    } else {
        body
    }
}

fn format_pattern(pattern: &str, v: f64, pos: usize) -> String {
    if !pattern.contains("{x") && !pattern.contains("{pos") {
        return apply_spec(v, pattern);
    }
    let mut out = String::new();
    let mut rest = pattern;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let Some(end) = rest[start..].find('}') else {
            out.push_str(&rest[start..]);
            return out;
        };
        let field = &rest[start + 1..start + end];
        let (name, spec) = field.split_once(':').unwrap_or((field, ""));
        match name {
            "x" => out.push_str(&apply_spec(v, spec)),
            "pos" => out.push_str(&pos.to_string()),
            _ => out.push_str(&rest[start..=start + end]),
        }
        rest = &rest[start + end + 1..];
    }
    out.push_str(rest);
    out
}

fn superscript(n: i32) -> String {
    n.to_string()
        .chars()
        .map(|c| match c {
            '-' => '⁻',
            '0' => '⁰',
            '1' => '¹',
            '2' => '²',
            '3' => '³',
            '4' => '⁴',
            '5' => '⁵',
            '6' => '⁶',
            '7' => '⁷',
            '8' => '⁸',
            _ => '⁹',
        })
        .collect()
}

fn format_log(v: f64, base: f64) -> String {
    if v == 0.0 {
        return "0".to_string();
    }
    if !v.is_finite() {
        return String::new();
    }
    let k = log_of(v.abs(), base);
    if (k - k.round()).abs() > 1e-9 {
        return String::new();
    }
    let sign = if v < 0.0 { "-" } else { "" };
    let base_str = if (base - std::f64::consts::E).abs() < 1e-12 {
        "e".to_string()
    } else {
        format_general(base)
    };
    format!("{sign}{base_str}{}", superscript(k.round() as i32))
}

fn format_eng(v: f64, unit: &str, sep: &str) -> String {
    const PREFIXES: [(i32, &str); 17] = [
        (-24, "y"),
        (-21, "z"),
        (-18, "a"),
        (-15, "f"),
        (-12, "p"),
        (-9, "n"),
        (-6, "µ"),
        (-3, "m"),
        (0, ""),
        (3, "k"),
        (6, "M"),
        (9, "G"),
        (12, "T"),
        (15, "P"),
        (18, "E"),
        (21, "Z"),
        (24, "Y"),
    ];
    let pow = if v == 0.0 { 0 } else { ((v.abs().log10() / 3.0).floor() as i32 * 3).clamp(-24, 24) };
    let mant = v / 10f64.powi(pow);
    let prefix = PREFIXES.iter().find(|(p, _)| *p == pow).map_or("", |(_, s)| *s);
    let suffix = format!("{prefix}{unit}");
    if suffix.is_empty() {
        format_general(mant)
    } else {
        format!("{}{sep}{suffix}", format_general(mant))
    }
}

fn infer_date_unit(locs: &[f64]) -> DateUnit {
    let step = locs.windows(2).map(|w| (w[1] - w[0]).abs()).fold(f64::INFINITY, f64::min);
    if !step.is_finite() {
        return DateUnit::Day;
    }
    if step >= 360.0 {
        DateUnit::Year
    } else if step >= 28.0 {
        DateUnit::Month
    } else if step >= 1.0 {
        DateUnit::Day
    } else if step >= 1.0 / 24.0 {
        DateUnit::Hour
    } else if step >= 1.0 / 1440.0 {
        DateUnit::Minute
    } else {
        DateUnit::Second
    }
}

fn format_date(v: f64, unit: DateUnit, concise: bool) -> String {
    let Some(t) = num_to_datetime(v) else {
        return String::new();
    };
    let fmt = match (unit, concise) {
        (DateUnit::Year, _) => "%Y",
        (DateUnit::Month, false) => "%Y-%m",
        (DateUnit::Month, true) if t.month() == 1 => "%Y",
        (DateUnit::Month, true) => "%b",
        (DateUnit::Day, false) => "%Y-%m-%d",
        (DateUnit::Day, true) if t.day() == 1 => "%b",
        (DateUnit::Day, true) => "%d",
        (DateUnit::Hour | DateUnit::Minute, false) => "%Y-%m-%d %H:%M",
        (DateUnit::Hour | DateUnit::Minute, true) => "%H:%M",
        (DateUnit::Second, false) => "%Y-%m-%d %H:%M:%S",
        (DateUnit::Second, true) => "%H:%M:%S",
    };
    t.format(fmt).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_auto_ticks_nice() {
        let ticks = Locator::auto().ticks(0.0, 10.0, 5);
        assert_eq!(ticks, vec![0.0, 2.0, 4.0, 6.0, 8.0, 10.0]);
    }

    #[test]
    fn test_auto_ticks_fractional() {
        let ticks = Locator::auto().ticks(0.0, 1.0, 5);
        assert_eq!(ticks.len(), 6);
        assert_relative_eq!(ticks[1], 0.2, epsilon = 1e-12);
    }

    #[test]
    fn test_auto_ticks_cover_view() {
        let ticks = Locator::auto().ticks(3.7, 48.2, 9);
        assert!(ticks[0] <= 3.7);
        assert!(*ticks.last().unwrap() >= 48.2);
    }

    #[test]
    fn test_upto_limits_count() {
        let (major, _) = Locator::continuous(&TickSpec::new().upto(3), Transform::Identity);
        let ticks: Vec<f64> =
            major.ticks(0.0, 100.0, 9).into_iter().filter(|t| (0.0..=100.0).contains(t)).collect();
        assert!(ticks.len() <= 4);
    }

    #[test]
    fn test_every_between() {
        let (major, _) = Locator::continuous(&TickSpec::new().every(5.0).between(0.0, 20.0), Transform::Identity);
        assert_eq!(major.ticks(0.0, 100.0, 9), vec![0.0, 5.0, 10.0, 15.0, 20.0]);
    }

    #[test]
    fn test_count_between_log() {
        let (major, _) = Locator::continuous(&TickSpec::new().count(3).between(1.0, 100.0), Transform::Log(10.0));
        let ticks = major.ticks(1.0, 100.0, 9);
        assert_relative_eq!(ticks[1], 10.0, epsilon = 1e-9);
    }

    #[test]
    fn test_log_ticks_decades() {
        let (major, minor) = Locator::continuous(&TickSpec::new(), Transform::Log(10.0));
        assert_eq!(major.ticks(1.0, 1000.0, 9), vec![1.0, 10.0, 100.0, 1000.0]);
        assert!(minor.is_some());
    }

    #[test]
    fn test_scalar_labels_share_precision() {
        let labels = Formatter::Scalar.format_ticks(&[0.0, 0.5, 1.0]);
        assert_eq!(labels, vec!["0.0", "0.5", "1.0"]);
        assert_eq!(Formatter::Scalar.format_ticks(&[2.0, 4.0]), vec!["2", "4"]);
    }

    #[test]
    fn test_pattern_labels() {
        let f = Formatter::Pattern(".1f".into());
        assert_eq!(f.format_ticks(&[1.26]), vec!["1.3"]);
        let f = Formatter::Pattern("{x:.0%}".into());
        assert_eq!(f.format_ticks(&[0.5]), vec!["50%"]);
        let f = Formatter::Pattern("{x:,.0f} kg".into());
        assert_eq!(f.format_ticks(&[12345.0]), vec!["12,345 kg"]);
        let f = Formatter::Pattern("#{pos}".into());
        assert_eq!(f.format_ticks(&[3.0, 4.0]), vec!["#0", "#1"]);
    }

    #[test]
    fn test_log_labels() {
        let f = Formatter::LogSci(10.0);
        assert_eq!(f.format_ticks(&[100.0, 50.0]), vec!["10²", ""]);
    }

    #[test]
    fn test_eng_labels() {
        let f = Formatter::Eng { unit: "g".into(), sep: " ".into() };
        assert_eq!(f.format_ticks(&[1500.0]), vec!["1.5 kg"]);
    }

    #[test]
    fn test_date_ticks_months() {
        let lo = datetime_to_num(&NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap());
        let hi = datetime_to_num(&NaiveDate::from_ymd_opt(2024, 7, 1).unwrap().and_hms_opt(0, 0, 0).unwrap());
        let (ticks, unit) = date_ticks(lo, hi, 7);
        assert_eq!(unit, DateUnit::Month);
        assert_eq!(ticks.len(), 7);
        let labels = Formatter::Date { concise: true }.format_ticks(&ticks);
        assert_eq!(labels[0], "2024");
        assert_eq!(labels[1], "Feb");
    }
}
