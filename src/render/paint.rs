//! Painting a finalized scene onto a 2D canvas.
//!
//! [`paint_scene`] walks a [`Scene`] in pixel space: figure background,
//! panels and grids, clipped artists, spines, tick marks and labels, titles
//! and the legend. Targets only implement the handful of drawing calls in
//! [`Canvas`]; the raster backend ignores text.

use crate::color::Color;
use crate::grammar::backend::{
    Artist, AxisSpec, LegendGlyph, LineArtist, PatchArtist, PointArtist, Scene, TextArtist,
};
use crate::grammar::orient::Orient;
use crate::grammar::properties::{Dash, Marker};
use crate::grammar::theme::Theme;

use super::layout::{Layout, Projection, Rect};

/// Horizontal text alignment relative to the anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextAnchor {
    /// Text starts at the anchor.
    #[default]
    Start,
    /// Text is centered on the anchor.
    Middle,
    /// Text ends at the anchor.
    End,
}

/// Vertical text alignment relative to the anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextBaseline {
    /// Top of the text at the anchor.
    Top,
    /// Middle of the text at the anchor.
    Middle,
    /// Alphabetic baseline at the anchor.
    #[default]
    Baseline,
    /// Bottom of the text at the anchor.
    Bottom,
}

/// Outline style in pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct Stroke {
    /// Line color.
    pub color: Color,
    /// Width in pixels.
    pub width: f64,
    /// Alternating on/off lengths in pixels; empty for solid.
    pub dash: Vec<f64>,
    /// Offset into the dash pattern in pixels.
    pub dash_offset: f64,
}

impl Stroke {
    /// Solid stroke.
    #[must_use]
    pub fn solid(color: Color, width: f64) -> Self {
        Self { color, width, dash: Vec::new(), dash_offset: 0.0 }
    }

    /// Stroke from a width in points and a dash pattern in line widths.
    fn styled(color: Color, width_pt: f64, dash: &Dash, dpi: f64) -> Self {
        let unit = width_pt.max(1.0) * dpi;
        Self {
            color,
            width: width_pt * dpi,
            dash: dash.pattern.iter().map(|d| d * unit).collect(),
            dash_offset: dash.offset * unit,
        }
    }

    fn is_visible(&self) -> bool {
        self.width.is_finite() && self.width > 0.0 && self.color.is_visible() && self.color.opacity() > 0.0
    }
}

/// A positioned text run in pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    /// Anchor.
    pub x: f64,
    /// Anchor.
    pub y: f64,
    /// Content.
    pub text: String,
    /// Font size in pixels.
    pub size: f64,
    /// Fill color.
    pub color: Color,
    /// Horizontal alignment.
    pub anchor: TextAnchor,
    /// Vertical alignment.
    pub baseline: TextBaseline,
    /// Counterclockwise rotation in degrees.
    pub rotation: f64,
}

/// Drawing surface for [`paint_scene`]. Coordinates are pixels with `y`
/// growing downward.
pub trait Canvas {
    /// Restrict subsequent drawing to `rect` until [`Canvas::end_clip`].
    fn begin_clip(&mut self, rect: Rect);

    /// Lift the clip.
    fn end_clip(&mut self);

    /// Fill an axis-aligned rectangle.
    fn fill_rect(&mut self, rect: Rect, color: Color);

    /// Fill a closed polygon and optionally outline it.
    fn polygon(&mut self, points: &[(f64, f64)], fill: Color, stroke: Option<&Stroke>);

    /// Stroke an open polyline.
    fn polyline(&mut self, points: &[(f64, f64)], stroke: &Stroke);

    /// Draw text.
    fn text(&mut self, run: &TextRun);
}

// ============================================================================
// Scene
// ============================================================================

/// Paint every part of `scene` onto `canvas`.
pub fn paint_scene(scene: &Scene, canvas: &mut dyn Canvas) {
    let layout = Layout::new(scene);
    let theme = &scene.theme;
    let (w, h) = (f64::from(scene.size.0), f64::from(scene.size.1));
    canvas.fill_rect(Rect { x: 0.0, y: 0.0, width: w, height: h }, theme.figure_facecolor);

    for (surface, panel) in scene.surfaces.iter().zip(&layout.panels) {
        let proj = Projection::new(panel, surface);
        canvas.fill_rect(*panel, theme.axes_facecolor);
        for axis in [Orient::X, Orient::Y] {
            if let Some(spec) = surface.axis(axis) {
                paint_grid(canvas, theme, panel, &proj, axis, spec);
            }
        }

        canvas.begin_clip(*panel);
        for item in &surface.items {
            paint_artist(canvas, theme, &proj, &item.artist);
        }
        canvas.end_clip();

        if theme.spines {
            let (x0, y0, x1, y1) = (panel.x, panel.y, panel.right(), panel.bottom());
            let spine = Stroke::solid(theme.axes_edgecolor, theme.axes_linewidth * theme.dpi);
            canvas.polyline(&[(x0, y0), (x1, y0), (x1, y1), (x0, y1), (x0, y0)], &spine);
        }
        for axis in [Orient::X, Orient::Y] {
            if let Some(spec) = surface.axis(axis) {
                paint_axis(canvas, theme, &layout, panel, &proj, axis, spec);
            }
        }
        if let Some(title) = &surface.title {
            canvas.text(&TextRun {
                x: panel.x + panel.width / 2.0,
                y: panel.y - layout.font_px * 0.6,
                text: title.clone(),
                size: layout.font_px * 1.1,
                color: theme.text_color,
                anchor: TextAnchor::Middle,
                baseline: TextBaseline::Bottom,
                rotation: 0.0,
            });
        }
    }

    if let Some(rect) = layout.legend {
        paint_legend(canvas, scene, &layout, rect);
    }
}

/// Major tick positions inside the view limits, with their pixel offsets.
fn visible_ticks<'a>(spec: &'a AxisSpec, proj: &'a Projection, axis: Orient) -> impl Iterator<Item = (f64, &'a str)> + 'a {
    let (lo, hi) = (spec.limits.0.min(spec.limits.1), spec.limits.0.max(spec.limits.1));
    let tol = (hi - lo).abs() * 1e-9;
    spec.ticks
        .major
        .iter()
        .filter(move |t| t.pos >= lo - tol && t.pos <= hi + tol)
        .map(move |t| (proj.along(axis, t.pos), t.label.as_str()))
        .filter(|(px, _)| px.is_finite())
}

fn paint_grid(canvas: &mut dyn Canvas, theme: &Theme, panel: &Rect, proj: &Projection, axis: Orient, spec: &AxisSpec) {
    if !spec.grid {
        return;
    }
    let stroke = Stroke::solid(theme.grid_color, theme.grid_linewidth * theme.dpi);
    for (px, _) in visible_ticks(spec, proj, axis) {
        let line = match axis {
            Orient::X => [(px, panel.y), (px, panel.bottom())],
            Orient::Y => [(panel.x, px), (panel.right(), px)],
        };
        canvas.polyline(&line, &stroke);
    }
}

fn paint_axis(
    canvas: &mut dyn Canvas,
    theme: &Theme,
    layout: &Layout,
    panel: &Rect,
    proj: &Projection,
    axis: Orient,
    spec: &AxisSpec,
) {
    let fp = layout.font_px;
    let tick_len = if theme.ticks { theme.tick_size * theme.dpi } else { 0.0 };
    let pad = tick_len + fp * 0.4;
    let tick_stroke = Stroke::solid(theme.axes_edgecolor, theme.axes_linewidth * theme.dpi);
    let label = |x: f64, y: f64, text: &str, anchor: TextAnchor, baseline: TextBaseline, rotation: f64| TextRun {
        x,
        y,
        text: text.to_string(),
        size: fp,
        color: theme.text_color,
        anchor,
        baseline,
        rotation,
    };

    for (px, text) in visible_ticks(spec, proj, axis) {
        match axis {
            Orient::X => {
                if tick_len > 0.0 {
                    canvas.polyline(&[(px, panel.bottom()), (px, panel.bottom() + tick_len)], &tick_stroke);
                }
                if spec.show_ticklabels {
                    canvas.text(&label(px, panel.bottom() + pad, text, TextAnchor::Middle, TextBaseline::Top, 0.0));
                }
            }
            Orient::Y => {
                if tick_len > 0.0 {
                    canvas.polyline(&[(panel.x, px), (panel.x - tick_len, px)], &tick_stroke);
                }
                if spec.show_ticklabels {
                    canvas.text(&label(panel.x - pad, px, text, TextAnchor::End, TextBaseline::Middle, 0.0));
                }
            }
        }
    }

    let Some(text) = spec.label.as_deref().filter(|_| spec.show_label) else { return };
    let run = match axis {
        Orient::X => label(panel.x + panel.width / 2.0, panel.bottom() + pad + fp * 1.5, text, TextAnchor::Middle, TextBaseline::Top, 0.0),
        Orient::Y => label(panel.x - pad - fp * 3.2, panel.y + panel.height / 2.0, text, TextAnchor::Middle, TextBaseline::Bottom, 90.0),
    };
    canvas.text(&run);
}

// ============================================================================
// Artists
// ============================================================================

fn paint_artist(canvas: &mut dyn Canvas, theme: &Theme, proj: &Projection, artist: &Artist) {
    match artist {
        Artist::Points(points) => {
            for p in points {
                let (x, y) = proj.point(p.x, p.y);
                paint_point(canvas, theme, (x, y), p);
            }
        }
        Artist::Line(line) => paint_line(canvas, theme, proj, line),
        Artist::Lines(lines) => lines.iter().for_each(|line| paint_line(canvas, theme, proj, line)),
        Artist::Patches { patches, .. } => {
            for patch in patches {
                let points: Vec<(f64, f64)> = patch.vertices.iter().map(|&(x, y)| proj.point(x, y)).collect();
                if points.iter().all(|(x, y)| x.is_finite() && y.is_finite()) {
                    paint_patch(canvas, theme, &points, patch);
                }
            }
        }
        Artist::Texts(texts) => {
            for t in texts {
                let (x, y) = proj.point(t.x, t.y);
                if x.is_finite() && y.is_finite() {
                    canvas.text(&text_run(theme, (x, y), t));
                }
            }
        }
    }
}

fn paint_patch(canvas: &mut dyn Canvas, theme: &Theme, points: &[(f64, f64)], patch: &PatchArtist) {
    let stroke = Stroke::styled(patch.edgecolor, patch.edgewidth, &patch.edgestyle, theme.dpi);
    canvas.polygon(points, patch.facecolor, stroke.is_visible().then_some(&stroke));
}

fn paint_point(canvas: &mut dyn Canvas, theme: &Theme, center: (f64, f64), p: &PointArtist) {
    if !(center.0.is_finite() && center.1.is_finite()) {
        return;
    }
    let stroke = Stroke::styled(p.edgecolor, p.linewidth, &p.edgestyle, theme.dpi);
    paint_marker(canvas, center, &p.marker, p.size * theme.dpi, p.facecolor, &stroke);
}

/// Draw a marker glyph of `size` pixels across centered on `center`.
fn paint_marker(canvas: &mut dyn Canvas, center: (f64, f64), marker: &Marker, size: f64, face: Color, stroke: &Stroke) {
    let r = size / 2.0;
    if !(r.is_finite() && r > 0.0) {
        return;
    }
    let filled = marker.is_filled();
    for path in marker.path() {
        // Glyph paths are y-up.
        let points: Vec<(f64, f64)> = path.iter().map(|(x, y)| (center.0 + x * r, center.1 - y * r)).collect();
        if filled {
            canvas.polygon(&points, face, stroke.is_visible().then_some(stroke));
        } else if stroke.is_visible() {
            canvas.polyline(&points, stroke);
        }
    }
}

fn paint_line(canvas: &mut dyn Canvas, theme: &Theme, proj: &Projection, line: &LineArtist) {
    let stroke = Stroke::styled(line.color, line.linewidth, &line.linestyle, theme.dpi);
    let projected: Vec<(f64, f64)> = line.points.iter().map(|&(x, y)| proj.point(x, y)).collect();
    if stroke.is_visible() {
        for run in finite_runs(&projected) {
            if run.len() > 1 {
                canvas.polyline(run, &stroke);
            }
        }
    }
    if line.marker != Marker::None {
        let edge = Stroke::solid(line.markeredgecolor, line.markeredgewidth * theme.dpi);
        for &center in projected.iter().filter(|(x, y)| x.is_finite() && y.is_finite()) {
            paint_marker(canvas, center, &line.marker, line.markersize * theme.dpi, line.markerfacecolor, &edge);
        }
    }
}

/// Maximal runs of finite points; a non-finite point breaks the line.
pub(crate) fn finite_runs(points: &[(f64, f64)]) -> impl Iterator<Item = &[(f64, f64)]> {
    points.split(|(x, y)| !(x.is_finite() && y.is_finite())).filter(|run| !run.is_empty())
}

fn text_run(theme: &Theme, (x, y): (f64, f64), t: &TextArtist) -> TextRun {
    let offset = t.offset * theme.dpi;
    let (anchor, dx) = match t.halign.as_str() {
        "left" => (TextAnchor::Start, offset),
        "right" => (TextAnchor::End, -offset),
        _ => (TextAnchor::Middle, 0.0),
    };
    let (baseline, dy) = match t.valign.as_str() {
        "top" => (TextBaseline::Top, offset),
        "bottom" => (TextBaseline::Bottom, -offset),
        "baseline" => (TextBaseline::Baseline, -offset),
        _ => (TextBaseline::Middle, 0.0),
    };
    TextRun {
        x: x + dx,
        y: y + dy,
        text: t.text.clone(),
        size: t.fontsize * theme.dpi,
        color: t.color,
        anchor,
        baseline,
        rotation: 0.0,
    }
}

// ============================================================================
// Legend
// ============================================================================

fn paint_legend(canvas: &mut dyn Canvas, scene: &Scene, layout: &Layout, rect: Rect) {
    let theme = &scene.theme;
    let (fp, row) = (layout.font_px, layout.legend_row);
    canvas.fill_rect(rect, theme.figure_facecolor.with_alpha(0.8));

    let glyph_x = rect.x + fp * 1.4;
    let text_x = rect.x + fp * 2.8;
    let mut y = rect.y + fp * 0.5;
    for section in &scene.legend {
        if !section.title.is_empty() {
            canvas.text(&TextRun {
                x: rect.x + fp * 0.5,
                y: y + row / 2.0,
                text: section.title.clone(),
                size: fp,
                color: theme.text_color,
                anchor: TextAnchor::Start,
                baseline: TextBaseline::Middle,
                rotation: 0.0,
            });
            y += row;
        }
        for entry in &section.entries {
            let center = (glyph_x, y + row / 2.0);
            for glyph in &entry.glyphs {
                paint_glyph(canvas, theme, center, fp, glyph);
            }
            canvas.text(&TextRun {
                x: text_x,
                y: center.1,
                text: entry.label.clone(),
                size: fp,
                color: theme.text_color,
                anchor: TextAnchor::Start,
                baseline: TextBaseline::Middle,
                rotation: 0.0,
            });
            y += row;
        }
    }
}

fn paint_glyph(canvas: &mut dyn Canvas, theme: &Theme, center: (f64, f64), fp: f64, glyph: &LegendGlyph) {
    let (cx, cy) = center;
    match glyph {
        LegendGlyph::Point(p) => paint_point(canvas, theme, center, p),
        LegendGlyph::Line(line) => {
            let stroke = Stroke::styled(line.color, line.linewidth, &line.linestyle, theme.dpi);
            if stroke.is_visible() {
                canvas.polyline(&[(cx - fp, cy), (cx + fp, cy)], &stroke);
            }
            if line.marker != Marker::None {
                let edge = Stroke::solid(line.markeredgecolor, line.markeredgewidth * theme.dpi);
                paint_marker(canvas, center, &line.marker, line.markersize * theme.dpi, line.markerfacecolor, &edge);
            }
        }
        LegendGlyph::Patch(patch) => {
            let (hw, hh) = (fp * 0.9, fp * 0.45);
            let square = [(cx - hw, cy - hh), (cx + hw, cy - hh), (cx + hw, cy + hh), (cx - hw, cy + hh)];
            paint_patch(canvas, theme, &square, patch);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::backend::{FigureSpec, LegendEntry, LegendSection, RenderBackend};
    use crate::grammar::scales::{AxisTicks, Tick, Transform};
    use crate::grammar::subplots::Share;

    /// Records calls by kind.
    #[derive(Default)]
    struct Recorder {
        rects: usize,
        polygons: Vec<Vec<(f64, f64)>>,
        polylines: usize,
        texts: Vec<TextRun>,
        clips: i32,
    }

    impl Canvas for Recorder {
        fn begin_clip(&mut self, _: Rect) {
            self.clips += 1;
        }
        fn end_clip(&mut self) {
            self.clips -= 1;
        }
        fn fill_rect(&mut self, _: Rect, _: Color) {
            self.rects += 1;
        }
        fn polygon(&mut self, points: &[(f64, f64)], _: Color, _: Option<&Stroke>) {
            self.polygons.push(points.to_vec());
        }
        fn polyline(&mut self, _: &[(f64, f64)], _: &Stroke) {
            self.polylines += 1;
        }
        fn text(&mut self, run: &TextRun) {
            self.texts.push(run.clone());
        }
    }

    fn scene() -> Scene {
        let mut scene = Scene::default();
        scene
            .create_figure(&FigureSpec {
                nrows: 1,
                ncols: 1,
                cells: vec![(0, 0)],
                sharex: Share::All,
                sharey: Share::All,
                size: (400, 300),
            })
            .unwrap();
        let ticks = AxisTicks {
            major: vec![Tick { pos: 0.0, label: "0".into() }, Tick { pos: 5.0, label: "5".into() }, Tick { pos: 20.0, label: "20".into() }],
            minor: Vec::new(),
        };
        for axis in [Orient::X, Orient::Y] {
            let spec = AxisSpec {
                label: Some(axis.var().to_string()),
                show_label: true,
                limits: (0.0, 10.0),
                transform: Transform::Identity,
                ticks: ticks.clone(),
                show_ticklabels: true,
                grid: true,
            };
            scene.set_axis(0, axis, spec).unwrap();
        }
        scene
    }

    #[test]
    fn test_ticks_outside_limits_are_skipped() {
        let mut canvas = Recorder::default();
        paint_scene(&scene(), &mut canvas);
        let labels: Vec<&str> = canvas.texts.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(labels, vec!["0", "5", "x", "0", "5", "y"]);
        assert_eq!(canvas.clips, 0);
        let ylabel = canvas.texts.iter().find(|t| t.text == "y").unwrap();
        assert_eq!(ylabel.rotation, 90.0);
    }

    #[test]
    fn test_patches_and_legend_glyphs() {
        let mut scene = scene();
        let patch = PatchArtist::rect(1.0, 0.0, 2.0, 5.0, Color::rgb(1.0, 0.0, 0.0), Color::rgb(0.0, 0.0, 0.0));
        let artist = Artist::Patches { patches: vec![patch.clone()], sticky: Some(Orient::X), auto_edgewidth: false };
        scene.draw(0, 0, artist).unwrap();
        let section = LegendSection {
            title: "g".into(),
            entries: vec![LegendEntry { label: "a".into(), glyphs: vec![LegendGlyph::Patch(patch)] }],
        };
        scene.add_legend(vec![section], crate::grammar::backend::LegendLoc::CenterRight).unwrap();

        let mut canvas = Recorder::default();
        paint_scene(&scene, &mut canvas);
        assert_eq!(canvas.polygons.len(), 2);
        // The bar spans a fifth of the panel width.
        let bar = &canvas.polygons[0];
        let layout = Layout::new(&scene);
        let width = bar[1].0 - bar[0].0;
        assert!((width - layout.panels[0].width / 5.0).abs() < 1e-9);
        assert!(canvas.texts.iter().any(|t| t.text == "g"));
        assert!(canvas.texts.iter().any(|t| t.text == "a"));
    }

    #[test]
    fn test_text_alignment_offsets() {
        let theme = Theme::default();
        let artist = TextArtist {
            x: 0.0,
            y: 0.0,
            text: "t".into(),
            color: Color::rgb(0.0, 0.0, 0.0),
            fontsize: 10.0,
            halign: "left".into(),
            valign: "top".into(),
            offset: 2.0,
        };
        let run = text_run(&theme, (100.0, 100.0), &artist);
        assert_eq!(run.anchor, TextAnchor::Start);
        assert_eq!(run.baseline, TextBaseline::Top);
        assert!(run.x > 100.0 && run.y > 100.0);
    }

    #[test]
    fn test_finite_runs_break_on_nan() {
        let points = [(0.0, 0.0), (1.0, 1.0), (f64::NAN, 2.0), (3.0, 3.0), (4.0, 4.0)];
        let runs: Vec<usize> = finite_runs(&points).map(<[_]>::len).collect();
        assert_eq!(runs, vec![2, 2]);
    }
}
