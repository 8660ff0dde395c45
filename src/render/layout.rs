//! Figure layout: where panels and the legend sit in pixel space, and how
//! data coordinates project into a panel.
//!
//! Both the vector and raster targets paint through the same [`Layout`], and
//! the compiler uses it to size outlines that depend on drawn bar widths, so
//! every consumer agrees on the geometry.

use crate::grammar::backend::{LegendSection, Scene, Surface};
use crate::grammar::orient::Orient;
use crate::grammar::scales::Transform;

/// Axis-aligned pixel rectangle; `y` grows downward.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Width.
    pub width: f64,
    /// Height.
    pub height: f64,
}

impl Rect {
    /// Right edge.
    #[must_use]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Bottom edge.
    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }
}

/// Pixel geometry of a scene.
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    /// Panel of each surface, in surface order.
    pub panels: Vec<Rect>,
    /// Legend box, when the scene has a legend.
    pub legend: Option<Rect>,
    /// Font size in pixels.
    pub font_px: f64,
    /// Height of one legend row in pixels.
    pub legend_row: f64,
}

impl Layout {
    /// Lay out the grid of panels with room for tick labels, titles and the
    /// legend.
    #[must_use]
    pub fn new(scene: &Scene) -> Self {
        let theme = &scene.theme;
        let font_px = theme.points_to_pixels(theme.font_size);
        let legend_row = font_px * 1.7;
        let (w, h) = (f64::from(scene.size.0), f64::from(scene.size.1));

        let legend_size = legend_size(&scene.legend, font_px, legend_row);
        let legend_w = legend_size.map_or(0.0, |(lw, _)| lw + font_px);

        let (left, right) = (font_px * 6.0, font_px * 1.5 + legend_w);
        let (top, bottom) = (font_px * 2.5, font_px * 4.5);
        let (gap_x, gap_y) = (font_px * 5.0, font_px * 4.0);
        let (nrows, ncols) = (scene.shape.0.max(1) as f64, scene.shape.1.max(1) as f64);
        let cell_w = ((w - left - right - gap_x * (ncols - 1.0)) / ncols).max(1.0);
        let cell_h = ((h - top - bottom - gap_y * (nrows - 1.0)) / nrows).max(1.0);

        let panels = scene
            .surfaces
            .iter()
            .map(|s| Rect {
                x: left + s.col as f64 * (cell_w + gap_x),
                y: top + s.row as f64 * (cell_h + gap_y),
                width: cell_w,
                height: cell_h,
            })
            .collect();
        let legend = legend_size.map(|(lw, lh)| Rect {
            x: w - lw - font_px,
            y: ((h - lh) / 2.0).max(0.0),
            width: lw,
            height: lh,
        });
        Self { panels, legend, font_px, legend_row }
    }
}

fn legend_size(sections: &[LegendSection], font_px: f64, row: f64) -> Option<(f64, f64)> {
    if sections.is_empty() {
        return None;
    }
    let rows: usize = sections.iter().map(|s| s.entries.len() + usize::from(!s.title.is_empty())).sum();
    let chars = sections
        .iter()
        .flat_map(|s| std::iter::once(s.title.chars().count()).chain(s.entries.iter().map(|e| e.label.chars().count() + 3)))
        .max()
        .unwrap_or(0);
    let width = (chars as f64 * font_px * 0.6 + font_px * 2.0).max(font_px * 6.0);
    Some((width, rows as f64 * row + font_px))
}

/// One axis of a projection: transformed view limits onto a pixel span.
#[derive(Debug, Clone, Copy, PartialEq)]
struct AxisMap {
    lo: f64,
    hi: f64,
    trans: Transform,
    start: f64,
    len: f64,
}

impl AxisMap {
    fn new(limits: (f64, f64), trans: Transform, start: f64, len: f64) -> Self {
        let (mut lo, mut hi) = (trans.forward(limits.0), trans.forward(limits.1));
        if !lo.is_finite() || !hi.is_finite() || lo == hi {
            (lo, hi) = (0.0, 1.0);
        }
        Self { lo, hi, trans, start, len }
    }

    fn map(&self, v: f64) -> f64 {
        self.start + (self.trans.forward(v) - self.lo) / (self.hi - self.lo) * self.len
    }
}

/// Projection of data coordinates into one panel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    x: AxisMap,
    y: AxisMap,
}

impl Projection {
    /// Projection through the axis limits and transforms of `surface`.
    /// Undecorated axes default to `[0, 1]`.
    #[must_use]
    pub fn new(panel: &Rect, surface: &Surface) -> Self {
        let axis = |a: Orient| {
            surface
                .axis(a)
                .map_or(((0.0, 1.0), Transform::Identity), |spec| (spec.limits, spec.transform))
        };
        let (xl, xt) = axis(Orient::X);
        let (yl, yt) = axis(Orient::Y);
        Self {
            x: AxisMap::new(xl, xt, panel.x, panel.width),
            // Pixel rows grow downward, so y runs from the bottom edge up.
            y: AxisMap::new(yl, yt, panel.bottom(), -panel.height),
        }
    }

    /// Pixel position of a data point.
    #[must_use]
    pub fn point(&self, x: f64, y: f64) -> (f64, f64) {
        (self.x.map(x), self.y.map(y))
    }

    /// Pixel position along one axis.
    #[must_use]
    pub fn along(&self, axis: Orient, v: f64) -> f64 {
        match axis {
            Orient::X => self.x.map(v),
            Orient::Y => self.y.map(v),
        }
    }
}
