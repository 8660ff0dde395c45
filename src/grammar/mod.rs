//! Declarative statistical graphics.
//!
//! A [`Plot`] is a specification: data, variable assignments, layers of
//! [`marks`] with optional [`stats`] and [`moves`], facets, pairing, scales
//! and labels. [`Plot::compile`] turns it into a [`CompiledPlot`] whose
//! [`backend::Scene`] holds positioned artists in data coordinates, ready
//! for the encoders in [`crate::output`].
//!
//! # Pipeline
//!
//! 1. Bind variables to columns ([`bind`])
//! 2. Lay out subplots from facet and pair specs ([`subplots`])
//! 3. Set up coordinate scales, run stats, set up them again
//! 4. Set up property scales and plot each layer through its moves
//! 5. Build the legend and finalize axes
//!
//! # References
//!
//! - Wilkinson, L. (2005). *The Grammar of Graphics*. Springer.
//! - Wickham, H. (2010). "A Layered Grammar of Graphics." Journal of Computational
//!   and Graphical Statistics.

pub mod backend;
pub mod bind;
mod compile;
pub mod data;
pub mod facet;
pub mod groupby;
mod legend;
pub mod marks;
pub mod moves;
pub mod orient;
mod plot;
pub mod properties;
pub mod rules;
pub mod scales;
pub mod stats;
pub mod subplots;
pub mod theme;

pub use compile::CompiledPlot;
pub use data::{Column, DataFrame, DataValue};
pub use facet::{Dim, FacetSpec, PairSpec};
pub use orient::Orient;
pub use plot::{Label, Layer, Plot};
pub use rules::{categorical_order, variable_type, VarType};
pub use scales::{Scale, ScaleArg, ScaleSpec, Transform};
pub use subplots::Share;
pub use theme::{DisplayConfig, DisplayFormat, PlotConfig, Theme, ThemeOverrides};
