//! Pixel-space rendering of compiled scenes.
//!
//! [`layout`] places panels and the legend and projects data coordinates;
//! [`paint`] walks a scene through the [`Canvas`] trait, which the raster
//! backend here and the SVG encoder in [`crate::output`] implement.
//!
//! # Algorithms
//!
//! - **Wu's anti-aliased line** for hairlines
//! - **Scanline polygon fill** with vertical supersampling and exact
//!   horizontal coverage, nonzero winding
//!
//! # References
//!
//! - Wu, X. (1991). "An Efficient Antialiasing Technique." SIGGRAPH '91.

pub mod layout;
mod paint;
mod primitives;
mod raster;

pub use layout::{Layout, Projection, Rect};
pub use paint::{paint_scene, Canvas, Stroke, TextAnchor, TextBaseline, TextRun};
pub use primitives::{dash_runs, draw_line_aa, fill_paths, fill_rect, stroke_polyline};
pub use raster::rasterize;
