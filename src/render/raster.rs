//! Raster backend: paints a finalized scene into a [`Framebuffer`].
//!
//! Text is not rasterized; tick labels, titles and legend labels only appear
//! in vector output.

use tracing::debug;

use crate::color::Color;
use crate::error::{Error, Result};
use crate::framebuffer::Framebuffer;
use crate::grammar::backend::Scene;

use super::layout::Rect;
use super::paint::{paint_scene, Canvas, Stroke, TextRun};
use super::primitives::{dash_runs, fill_paths, fill_rect, stroke_polyline};

/// Rasterize `scene` at `scale` times its pixel size.
///
/// # Errors
///
/// Returns [`Error::InvalidDimensions`] when the scaled figure is empty and
/// [`Error::Value`] for a non-positive scale.
///
/// ```
/// use trueno_plot::prelude::*;
///
/// let plot = Plot::new().layout(200, 150);
/// let fb = trueno_plot::render::rasterize(plot.compile().unwrap().scene(), 2.0).unwrap();
/// assert_eq!((fb.width(), fb.height()), (400, 300));
/// ```
pub fn rasterize(scene: &Scene, scale: f64) -> Result<Framebuffer> {
    if !(scale.is_finite() && scale > 0.0) {
        return Err(Error::value(format!("Raster scale must be positive, not {scale}")));
    }
    let width = (f64::from(scene.size.0) * scale).round() as u32;
    let height = (f64::from(scene.size.1) * scale).round() as u32;
    let mut fb = Framebuffer::new(width, height)?;
    let mut canvas = Rasterizer { fb: &mut fb, scale, clip: None };
    paint_scene(scene, &mut canvas);
    debug!(width, height, artists = scene.artist_count(), "rasterized scene");
    Ok(fb)
}

struct Rasterizer<'a> {
    fb: &'a mut Framebuffer,
    scale: f64,
    clip: Option<Rect>,
}

impl Rasterizer<'_> {
    fn rect(&self, r: Rect) -> Rect {
        Rect { x: r.x * self.scale, y: r.y * self.scale, width: r.width * self.scale, height: r.height * self.scale }
    }

    fn points(&self, points: &[(f64, f64)]) -> Vec<(f64, f64)> {
        points.iter().map(|(x, y)| (x * self.scale, y * self.scale)).collect()
    }

    fn stroke(&mut self, points: &[(f64, f64)], stroke: &Stroke) {
        let color = stroke.color.to_rgba8();
        if color.a == 0 {
            return;
        }
        let width = stroke.width * self.scale;
        let scaled = self.points(points);
        if stroke.dash.is_empty() {
            stroke_polyline(self.fb, &scaled, width, color, self.clip);
            return;
        }
        let dash: Vec<f64> = stroke.dash.iter().map(|d| d * self.scale).collect();
        for run in dash_runs(&scaled, &dash, stroke.dash_offset * self.scale) {
            stroke_polyline(self.fb, &run, width, color, self.clip);
        }
    }
}

impl Canvas for Rasterizer<'_> {
    fn begin_clip(&mut self, rect: Rect) {
        self.clip = Some(self.rect(rect));
    }

    fn end_clip(&mut self) {
        self.clip = None;
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        let rect = self.rect(rect);
        fill_rect(self.fb, rect, color.to_rgba8(), self.clip);
    }

    fn polygon(&mut self, points: &[(f64, f64)], fill: Color, stroke: Option<&Stroke>) {
        let ring = self.points(points);
        fill_paths(self.fb, &[ring], fill.to_rgba8(), self.clip);
        if let (Some(stroke), Some(&first)) = (stroke, points.first()) {
            let mut closed = points.to_vec();
            closed.push(first);
            self.stroke(&closed, stroke);
        }
    }

    fn polyline(&mut self, points: &[(f64, f64)], stroke: &Stroke) {
        self.stroke(points, stroke);
    }

    fn text(&mut self, _: &TextRun) {}
}
