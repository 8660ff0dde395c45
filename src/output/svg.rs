//! SVG output encoder.
//!
//! [`SvgEncoder::from_scene`] paints a compiled scene as vector elements,
//! with text and per-panel clip paths. [`SvgEncoder::from_framebuffer`]
//! wraps a raster instead.

use crate::color::Color;
use crate::error::Result;
use crate::framebuffer::Framebuffer;
use crate::grammar::backend::Scene;
use crate::render::{paint_scene, Canvas, Rect, Stroke, TextAnchor, TextBaseline, TextRun};
use base64::{engine::general_purpose::STANDARD, Engine};
use std::fmt::Write as FmtWrite;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// SVG encoder for scenes and framebuffers.
#[derive(Debug, Clone)]
pub struct SvgEncoder {
    width: u32,
    height: u32,
    elements: Vec<SvgElement>,
    clips: usize,
}

/// An SVG element in pixel coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum SvgElement {
    /// Axis-aligned filled rectangle.
    Rect {
        /// Geometry.
        rect: Rect,
        /// Fill.
        fill: Color,
    },
    /// Closed filled polygon with an optional outline.
    Polygon {
        /// Vertices.
        points: Vec<(f64, f64)>,
        /// Fill.
        fill: Color,
        /// Outline.
        stroke: Option<Stroke>,
    },
    /// Open stroked path.
    Polyline {
        /// Vertices.
        points: Vec<(f64, f64)>,
        /// Outline.
        stroke: Stroke,
    },
    /// Text run.
    Text(TextRun),
    /// Embedded base64 PNG.
    Image {
        /// Width in pixels.
        width: u32,
        /// Height in pixels.
        height: u32,
        /// Data URI.
        data: String,
    },
    /// Start a group clipped to `rect`.
    ClipStart {
        /// Clip path id.
        id: usize,
        /// Clip region.
        rect: Rect,
    },
    /// Close the innermost clip group.
    ClipEnd,
}

impl SvgEncoder {
    /// Empty document of the given size.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height, elements: Vec::new(), clips: 0 }
    }

    /// Paint a compiled scene as vector elements.
    #[must_use]
    pub fn from_scene(scene: &Scene) -> Self {
        let mut encoder = Self::new(scene.size.0, scene.size.1);
        paint_scene(scene, &mut encoder);
        encoder
    }

    /// Embed a framebuffer as a raster image.
    ///
    /// # Errors
    ///
    /// Returns an error if PNG encoding fails.
    pub fn from_framebuffer(fb: &Framebuffer) -> Result<Self> {
        let mut encoder = Self::new(fb.width(), fb.height());
        let png_bytes = super::PngEncoder::to_bytes(fb)?;
        encoder.elements.push(SvgElement::Image {
            width: fb.width(),
            height: fb.height(),
            data: format!("data:image/png;base64,{}", STANDARD.encode(png_bytes)),
        });
        Ok(encoder)
    }

    /// Elements in paint order.
    #[must_use]
    pub fn elements(&self) -> &[SvgElement] {
        &self.elements
    }

    /// Append a raw element.
    pub fn add_element(&mut self, element: SvgElement) {
        self.elements.push(element);
    }

    /// Render to an SVG document.
    #[must_use]
    pub fn render(&self) -> String {
        let mut svg = String::with_capacity(256 + self.elements.len() * 96);
        let _ = writeln!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
            w = self.width,
            h = self.height
        );
        let mut depth = 1;
        for element in &self.elements {
            if matches!(element, SvgElement::ClipEnd) {
                depth = (depth - 1).max(1);
            }
            let _ = writeln!(svg, "{}{}", "  ".repeat(depth), element_to_svg(element));
            if matches!(element, SvgElement::ClipStart { .. }) {
                depth += 1;
            }
        }
        svg.push_str("</svg>\n");
        svg
    }

    /// Write the document to a file.
    ///
    /// # Errors
    ///
    /// Returns an error if file writing fails.
    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(self.render().as_bytes())?;
        Ok(())
    }
}

impl Canvas for SvgEncoder {
    fn begin_clip(&mut self, rect: Rect) {
        self.clips += 1;
        self.elements.push(SvgElement::ClipStart { id: self.clips, rect });
    }

    fn end_clip(&mut self) {
        self.elements.push(SvgElement::ClipEnd);
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.elements.push(SvgElement::Rect { rect, fill: color });
    }

    fn polygon(&mut self, points: &[(f64, f64)], fill: Color, stroke: Option<&Stroke>) {
        self.elements.push(SvgElement::Polygon { points: points.to_vec(), fill, stroke: stroke.cloned() });
    }

    fn polyline(&mut self, points: &[(f64, f64)], stroke: &Stroke) {
        self.elements.push(SvgElement::Polyline { points: points.to_vec(), stroke: stroke.clone() });
    }

    fn text(&mut self, run: &TextRun) {
        if !run.text.is_empty() {
            self.elements.push(SvgElement::Text(run.clone()));
        }
    }
}

// ============================================================================
// Serialization
// ============================================================================

/// `name="rgb(...)"` plus an opacity attribute when translucent; `none`
/// for invisible colors.
fn paint_attrs(name: &str, color: &Color) -> String {
    let opacity = color.opacity();
    if !color.is_visible() || !(opacity > 0.0) {
        return format!(r#"{name}="none""#);
    }
    let c = color.to_rgba8();
    let mut out = format!(r#"{name}="rgb({},{},{})""#, c.r, c.g, c.b);
    if opacity < 1.0 {
        let _ = write!(out, r#" {name}-opacity="{}""#, num(opacity));
    }
    out
}

fn stroke_attrs(stroke: Option<&Stroke>) -> String {
    let Some(stroke) = stroke.filter(|s| s.width > 0.0 && s.width.is_finite()) else {
        return r#"stroke="none""#.to_string();
    };
    let mut out = paint_attrs("stroke", &stroke.color);
    let _ = write!(out, r#" stroke-width="{}""#, num(stroke.width));
    if !stroke.dash.is_empty() {
        let dash: Vec<String> = stroke.dash.iter().map(|d| num(*d)).collect();
        let _ = write!(out, r#" stroke-dasharray="{}""#, dash.join(","));
        if stroke.dash_offset != 0.0 {
            let _ = write!(out, r#" stroke-dashoffset="{}""#, num(stroke.dash_offset));
        }
    }
    out
}

fn points_attr(points: &[(f64, f64)]) -> String {
    points.iter().map(|(x, y)| format!("{},{}", num(*x), num(*y))).collect::<Vec<_>>().join(" ")
}

/// Compact number formatting: two decimals, trailing zeros removed.
fn num(v: f64) -> String {
    let s = format!("{v:.2}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" { "0".to_string() } else { s.to_string() }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

fn element_to_svg(element: &SvgElement) -> String {
    match element {
        SvgElement::Rect { rect, fill } => format!(
            r#"<rect x="{}" y="{}" width="{}" height="{}" {}/>"#,
            num(rect.x),
            num(rect.y),
            num(rect.width),
            num(rect.height),
            paint_attrs("fill", fill)
        ),
        SvgElement::Polygon { points, fill, stroke } => format!(
            r#"<polygon points="{}" {} {} stroke-linejoin="miter"/>"#,
            points_attr(points),
            paint_attrs("fill", fill),
            stroke_attrs(stroke.as_ref())
        ),
        SvgElement::Polyline { points, stroke } => format!(
            r#"<polyline points="{}" fill="none" {} stroke-linecap="butt" stroke-linejoin="round"/>"#,
            points_attr(points),
            stroke_attrs(Some(stroke))
        ),
        SvgElement::Text(run) => {
            let anchor = match run.anchor {
                TextAnchor::Start => "start",
                TextAnchor::Middle => "middle",
                TextAnchor::End => "end",
            };
            let baseline = match run.baseline {
                TextBaseline::Top => "hanging",
                TextBaseline::Middle => "central",
                TextBaseline::Baseline => "alphabetic",
                TextBaseline::Bottom => "text-after-edge",
            };
            let rotate = if run.rotation == 0.0 {
                String::new()
            } else {
                format!(r#" transform="rotate({} {} {})""#, num(-run.rotation), num(run.x), num(run.y))
            };
            format!(
                r#"<text x="{}" y="{}" font-family="sans-serif" font-size="{}" text-anchor="{anchor}" dominant-baseline="{baseline}" {}{rotate}>{}</text>"#,
                num(run.x),
                num(run.y),
                num(run.size),
                paint_attrs("fill", &run.color),
                escape(&run.text)
            )
        }
        SvgElement::Image { width, height, data } => {
            format!(r#"<image x="0" y="0" width="{width}" height="{height}" xlink:href="{data}"/>"#)
        }
        SvgElement::ClipStart { id, rect } => format!(
            r#"<clipPath id="clip{id}"><rect x="{}" y="{}" width="{}" height="{}"/></clipPath><g clip-path="url(#clip{id})">"#,
            num(rect.x),
            num(rect.y),
            num(rect.width),
            num(rect.height)
        ),
        SvgElement::ClipEnd => "</g>".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgba;

    const RED: Color = Color::rgb(1.0, 0.0, 0.0);

    fn rect(x: f64, y: f64, width: f64, height: f64) -> Rect {
        Rect { x, y, width, height }
    }

    #[test]
    fn test_document_header_and_size() {
        let svg = SvgEncoder::new(320, 240).render();
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains(r#"width="320""#));
        assert!(svg.contains(r#"viewBox="0 0 320 240""#));
        assert!(svg.trim_end().ends_with("</svg>"));
    }

    #[test]
    fn test_canvas_elements() {
        let mut svg = SvgEncoder::new(100, 100);
        svg.begin_clip(rect(10.0, 10.0, 80.0, 80.0));
        svg.fill_rect(rect(0.0, 0.0, 50.5, 20.0), RED.with_alpha(0.5));
        svg.polygon(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0)], RED, None);
        let dashed = Stroke { color: Color::rgb(0.0, 0.0, 1.0), width: 2.0, dash: vec![7.4, 3.2], dash_offset: 0.0 };
        svg.polyline(&[(1.0, 2.0), (3.0, 4.0)], &dashed);
        svg.end_clip();
        let out = svg.render();
        assert!(out.contains(r#"<clipPath id="clip1">"#));
        assert!(out.contains(r#"clip-path="url(#clip1)""#));
        assert!(out.contains(r#"width="50.5""#));
        assert!(out.contains(r#"fill="rgb(255,0,0)" fill-opacity="0.5""#));
        assert!(out.contains(r#"points="0,0 10,0 10,10""#));
        assert!(out.contains(r#"stroke-dasharray="7.4,3.2""#));
        assert!(out.contains("</g>"));
    }

    #[test]
    fn test_text_is_escaped_and_rotated() {
        let mut svg = SvgEncoder::new(100, 100);
        svg.text(&TextRun {
            x: 10.0,
            y: 50.0,
            text: "a < b & c".into(),
            size: 12.0,
            color: Color::rgb(0.0, 0.0, 0.0),
            anchor: TextAnchor::Middle,
            baseline: TextBaseline::Bottom,
            rotation: 90.0,
        });
        let out = svg.render();
        assert!(out.contains("a &lt; b &amp; c"));
        assert!(out.contains(r#"text-anchor="middle""#));
        assert!(out.contains(r#"transform="rotate(-90 10 50)""#));
    }

    #[test]
    fn test_invisible_paint_is_none() {
        assert_eq!(paint_attrs("fill", &Color::none()), r#"fill="none""#);
        assert_eq!(paint_attrs("fill", &Color::invisible()), r#"fill="none""#);
        assert_eq!(paint_attrs("fill", &RED.with_alpha(0.0)), r#"fill="none""#);
        assert_eq!(paint_attrs("fill", &RED), r#"fill="rgb(255,0,0)""#);
        assert_eq!(stroke_attrs(Some(&Stroke::solid(RED, 0.0))), r#"stroke="none""#);
    }

    #[test]
    fn test_from_framebuffer_embeds_png() {
        let mut fb = Framebuffer::new(4, 4).unwrap();
        fb.clear(Rgba::WHITE);
        let svg = SvgEncoder::from_framebuffer(&fb).unwrap().render();
        assert!(svg.contains("data:image/png;base64,"));
    }

    #[test]
    fn test_from_scene_paints_background() {
        let scene = Scene::default();
        let svg = SvgEncoder::from_scene(&scene);
        assert!(matches!(svg.elements().first(), Some(SvgElement::Rect { .. })));
    }

    #[test]
    fn test_write_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plot.svg");
        SvgEncoder::new(10, 10).write_to_file(&path).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("<svg"));
    }

    #[test]
    fn test_number_format() {
        assert_eq!(num(1.0), "1");
        assert_eq!(num(-0.001), "0");
        assert_eq!(num(2.346), "2.35");
    }
}
