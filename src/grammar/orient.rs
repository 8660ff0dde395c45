//! Orientation: which axis a layer treats as its independent axis.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// The axis along which observations are grouped (bars stand on it,
/// densities are estimated along it).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Orient {
    /// Grouped along x; values on y.
    #[default]
    X,
    /// Grouped along y; values on x.
    Y,
}

impl Orient {
    /// Variable name of the orientation axis.
    #[must_use]
    pub fn var(self) -> &'static str {
        match self {
            Orient::X => "x",
            Orient::Y => "y",
        }
    }

    /// Variable name of the value axis.
    #[must_use]
    pub fn other(self) -> &'static str {
        match self {
            Orient::X => "y",
            Orient::Y => "x",
        }
    }

    /// The opposite orientation.
    #[must_use]
    pub fn flip(self) -> Self {
        match self {
            Orient::X => Orient::Y,
            Orient::Y => Orient::X,
        }
    }
}

impl fmt::Display for Orient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.var())
    }
}

impl FromStr for Orient {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "x" | "v" => Ok(Orient::X),
            "y" | "h" => Ok(Orient::Y),
            _ => Err(Error::value(format!("`orient` must be one of x, y, v or h; not {s:?}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_aliases() {
        assert_eq!("v".parse::<Orient>().unwrap(), Orient::X);
        assert_eq!("h".parse::<Orient>().unwrap(), Orient::Y);
        assert!("z".parse::<Orient>().is_err());
    }

    #[test]
    fn test_other_axis() {
        assert_eq!(Orient::X.other(), "y");
        assert_eq!(Orient::Y.flip(), Orient::X);
    }
}
