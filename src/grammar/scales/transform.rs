//! Invertible value transforms for continuous scales.

use std::f64::consts::E;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// A monotonic, invertible transform applied before normalization.
///
/// Parsed from the names accepted by `Continuous::trans`: `log` (base 10),
/// `logN`, `ln`, `symlog` / `symlogC`, `sqrt`, `pow` / `powN`, `logit` /
/// `logitN`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Transform {
    /// No transform.
    #[default]
    Identity,
    /// Logarithm in the given base.
    Log(f64),
    /// Symmetric log with linear threshold `c` (base 10).
    Symlog(f64),
    /// Signed square root.
    Sqrt,
    /// Signed power.
    Pow(f64),
    /// Log-odds in the given base.
    Logit(f64),
}

impl Transform {
    /// Apply the transform.
    #[must_use]
    pub fn forward(self, x: f64) -> f64 {
        match self {
            Transform::Identity => x,
            Transform::Log(base) => log(x, base),
            Transform::Symlog(c) => x.signum() * (1.0 + (x / c).abs()).log10(),
            Transform::Sqrt => x.signum() * x.abs().sqrt(),
            Transform::Pow(p) => x.signum() * x.abs().powf(p),
            Transform::Logit(base) => log(x, base) - log(1.0 - x, base),
        }
    }

    /// Undo the transform.
    #[must_use]
    pub fn inverse(self, x: f64) -> f64 {
        match self {
            Transform::Identity => x,
            Transform::Log(base) => base.powf(x),
            Transform::Symlog(c) => x.signum() * c * (10f64.powf(x.abs()) - 1.0),
            Transform::Sqrt => x.signum() * x * x,
            Transform::Pow(p) => x.signum() * x.abs().powf(1.0 / p),
            Transform::Logit(base) => {
                let e = base.powf(x);
                e / (1.0 + e)
            }
        }
    }

    /// Base of a logarithmic transform, used to pick log tick locators.
    #[must_use]
    pub fn log_base(self) -> Option<f64> {
        match self {
            Transform::Log(base) => Some(base),
            _ => None,
        }
    }

    /// Linear threshold of a symlog transform.
    #[must_use]
    pub fn symlog_thresh(self) -> Option<f64> {
        match self {
            Transform::Symlog(c) => Some(c),
            _ => None,
        }
    }
}

fn log(x: f64, base: f64) -> f64 {
    if x < 0.0 {
        return f64::NAN;
    }
    if base == 10.0 {
        x.log10()
    } else if base == 2.0 {
        x.log2()
    } else if base == E {
        x.ln()
    } else {
        x.ln() / base.ln()
    }
}

/// Parameter suffix of a transform name, or `default` when absent.
fn param(arg: &str, method: &str, default: f64) -> Result<f64> {
    let rest = &arg[method.len()..];
    if rest.is_empty() {
        return Ok(default);
    }
    rest.parse().map_err(|_| Error::value(format!("Unknown value provided for trans: {arg:?}")))
}

impl FromStr for Transform {
    type Err = Error;

    fn from_str(arg: &str) -> Result<Self> {
        if arg == "ln" {
            Ok(Transform::Log(E))
        } else if arg.starts_with("logit") {
            Ok(Transform::Logit(param(arg, "logit", 10.0)?))
        } else if arg.starts_with("log") {
            Ok(Transform::Log(param(arg, "log", 10.0)?))
        } else if arg.starts_with("symlog") {
            Ok(Transform::Symlog(param(arg, "symlog", 1.0)?))
        } else if arg.starts_with("pow") {
            Ok(Transform::Pow(param(arg, "pow", 2.0)?))
        } else if arg == "sqrt" {
            Ok(Transform::Sqrt)
        } else {
            Err(Error::value(format!("Unknown value provided for trans: {arg:?}")))
        }
    }
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transform::Identity => f.write_str("identity"),
            Transform::Log(b) if *b == E => f.write_str("ln"),
            Transform::Log(b) => write!(f, "log{b}"),
            Transform::Symlog(c) => write!(f, "symlog{c}"),
            Transform::Sqrt => f.write_str("sqrt"),
            Transform::Pow(p) => write!(f, "pow{p}"),
            Transform::Logit(b) => write!(f, "logit{b}"),
        }
    }
}

/// Whether a string names a transform (used to interpret magic scale args).
#[must_use]
pub fn is_transform_name(arg: &str) -> bool {
    ["log", "ln", "symlog", "logit", "pow", "sqrt"].iter().any(|k| arg.starts_with(k))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_parse_names() {
        assert_eq!("log".parse::<Transform>().unwrap(), Transform::Log(10.0));
        assert_eq!("log2".parse::<Transform>().unwrap(), Transform::Log(2.0));
        assert_eq!("ln".parse::<Transform>().unwrap(), Transform::Log(E));
        assert_eq!("symlog".parse::<Transform>().unwrap(), Transform::Symlog(1.0));
        assert_eq!("symlog100".parse::<Transform>().unwrap(), Transform::Symlog(100.0));
        assert_eq!("pow".parse::<Transform>().unwrap(), Transform::Pow(2.0));
        assert_eq!("pow.5".parse::<Transform>().unwrap(), Transform::Pow(0.5));
        assert_eq!("logit".parse::<Transform>().unwrap(), Transform::Logit(10.0));
        assert!("cube".parse::<Transform>().is_err());
        assert!("logx".parse::<Transform>().is_err());
    }

    #[test]
    fn test_log_roundtrip() {
        let t = Transform::Log(10.0);
        assert_relative_eq!(t.forward(1000.0), 3.0);
        assert_relative_eq!(t.inverse(2.0), 100.0);
        assert!(t.forward(-1.0).is_nan());
    }

    #[test]
    fn test_symlog_is_odd() {
        let t = Transform::Symlog(1.0);
        assert_relative_eq!(t.forward(-9.0), -1.0);
        assert_relative_eq!(t.inverse(t.forward(42.0)), 42.0, epsilon = 1e-9);
    }

    #[test]
    fn test_sqrt_and_pow_signed() {
        assert_relative_eq!(Transform::Sqrt.forward(-4.0), -2.0);
        assert_relative_eq!(Transform::Sqrt.inverse(-2.0), -4.0);
        assert_relative_eq!(Transform::Pow(3.0).inverse(Transform::Pow(3.0).forward(-2.0)), -2.0);
    }

    #[test]
    fn test_logit_midpoint() {
        let t = Transform::Logit(10.0);
        assert_relative_eq!(t.forward(0.5), 0.0);
        assert_relative_eq!(t.inverse(0.0), 0.5);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(64))]

            #[test]
            fn prop_forward_is_monotonic(a in 0.01f64..1e4, b in 0.01f64..1e4) {
                for t in [Transform::Log(10.0), Transform::Symlog(1.0), Transform::Sqrt, Transform::Pow(2.0)] {
                    if a < b {
                        prop_assert!(t.forward(a) < t.forward(b));
                    }
                }
            }
        }
    }
}
