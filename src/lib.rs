//! # Trueno-Plot
//!
//! A declarative statistical graphics compiler.
//!
//! Plots are specified as data plus variable assignments plus layers of marks,
//! optionally transformed by stats and moves, split into facets or paired
//! across variables. Compiling a plot resolves every scale, runs the
//! statistics, positions every artist and builds the legend; the result can be
//! written as SVG, PNG or HTML, or previewed in the terminal.
//!
//! ## Features
//!
//! - **Pure Rust**: no JavaScript, HTML or browser dependencies
//! - **Layered grammar**: marks, stats and moves compose per layer
//! - **Semantic scales**: continuous, nominal, temporal and boolean scales for
//!   coordinates and visual properties, with automatic legends
//! - **Small multiples**: facet grids, wrapped facets and pair grids with
//!   shared or independent axes
//! - **Multiple outputs**: SVG, PNG, HTML and terminal rendering
//!
//! ## Quick Start
//!
//! ```rust
//! use trueno_plot::prelude::*;
//!
//! let data = DataFrame::new()
//!     .column("x", vec![1.0, 2.0, 3.0, 4.0])?
//!     .column("y", vec![2.0, 4.0, 1.0, 5.0])?
//!     .column("g", vec!["a", "a", "b", "b"])?;
//!
//! let compiled = Plot::new()
//!     .data(data)
//!     .x("x")
//!     .y("y")
//!     .color("g")
//!     .add(Dot::new())
//!     .label("y", "Response")
//!     .compile()?;
//!
//! assert_eq!(compiled.legend().len(), 1);
//! let svg = compiled.to_svg();
//! assert!(svg.contains("Response"));
//! # Ok::<(), trueno_plot::Error>(())
//! ```
//!
//! ## References
//!
//! - Wilkinson, L. (2005). *The Grammar of Graphics*. Springer.
//! - Wickham, H. (2010). "A Layered Grammar of Graphics." Journal of
//!   Computational and Graphical Statistics.
//! - Wu, X. (1991). "An Efficient Antialiasing Technique." SIGGRAPH '91.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
// Allow unwrap() in tests only - banned in production code
#![cfg_attr(test, allow(clippy::unwrap_used))]
// Allow common patterns in graphics/statistics code
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::many_single_char_names)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Core Modules
// ============================================================================

/// Color types, color space conversions and color spec parsing.
pub mod color;

/// Core framebuffer for pixel rendering.
pub mod framebuffer;

/// Named palettes and continuous colormaps.
pub mod palettes;

// ============================================================================
// Plot Specification and Compilation
// ============================================================================

/// Plot builder, scales, stats, moves, marks and the compiler.
pub mod grammar;

// ============================================================================
// Rendering Modules
// ============================================================================

/// Layout, painting and rasterization of compiled scenes.
pub mod render;

/// Output encoders (PNG, SVG, HTML, terminal).
pub mod output;

// ============================================================================
// Error Types
// ============================================================================

/// Error types for plot specification, compilation and output.
pub mod error;

pub use error::{Error, Result};

// ============================================================================
// Prelude
// ============================================================================

/// Commonly used types for convenient imports.
///
/// ```rust
/// use trueno_plot::prelude::*;
///
/// let plot = Plot::new().add(Line::new());
/// assert_eq!(plot.layer_count(), 1);
/// ```
pub mod prelude {
    pub use crate::color::{Color, Rgba};
    pub use crate::error::{Error, Result};
    pub use crate::framebuffer::Framebuffer;
    pub use crate::grammar::marks::{Area, Band, Bar, Bars, Dash, Dot, Dots, Line, Lines, Path, Paths, Range, Text};
    pub use crate::grammar::moves::{Dodge, Jitter, Norm, Shift, Stack};
    pub use crate::grammar::stats::{Agg, Count, Ecdf, Est, Hist, Kde, PolyFit};
    pub use crate::grammar::{
        Column, CompiledPlot, DataFrame, DataValue, FacetSpec, Label, Layer, Orient, PairSpec, Plot, PlotConfig,
        ScaleSpec, Share, Theme, ThemeOverrides,
    };
}
