//! Raster primitives: anti-aliased lines, filled polygons and wide strokes.
//!
//! Every primitive takes pixel coordinates (y down) and an optional clip
//! rectangle, and composites onto the framebuffer with alpha coverage.

use crate::color::Rgba;
use crate::framebuffer::Framebuffer;

use super::layout::Rect;

/// Vertical samples per pixel row when filling polygons.
const SUBSAMPLES: u32 = 4;

/// Integer pixel bounds `[x0, x1) x [y0, y1)` that drawing may touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Bounds {
    x0: i64,
    y0: i64,
    x1: i64,
    y1: i64,
}

impl Bounds {
    fn new(fb: &Framebuffer, clip: Option<Rect>) -> Self {
        let full = Self { x0: 0, y0: 0, x1: i64::from(fb.width()), y1: i64::from(fb.height()) };
        match clip {
            None => full,
            Some(r) => Self {
                x0: (r.x.floor() as i64).max(full.x0),
                y0: (r.y.floor() as i64).max(full.y0),
                x1: (r.right().ceil() as i64).min(full.x1),
                y1: (r.bottom().ceil() as i64).min(full.y1),
            },
        }
    }

    fn contains(&self, x: i64, y: i64) -> bool {
        x >= self.x0 && x < self.x1 && y >= self.y0 && y < self.y1
    }
}

fn plot(fb: &mut Framebuffer, bounds: &Bounds, x: i64, y: i64, color: Rgba, coverage: f64) {
    if coverage > 0.0 && bounds.contains(x, y) {
        fb.blend_pixel_coverage(x, y, color, coverage as f32);
    }
}

// ============================================================================
// Lines
// ============================================================================

/// Fractional part, positive for negative inputs too.
#[inline]
fn fpart(v: f64) -> f64 {
    v - v.floor()
}

/// Draw a one-pixel anti-aliased line with Wu's algorithm, scaling its
/// coverage by `weight`.
pub fn draw_line_aa(fb: &mut Framebuffer, from: (f64, f64), to: (f64, f64), color: Rgba, weight: f64, clip: Option<Rect>) {
    let bounds = Bounds::new(fb, clip);
    let ((mut x0, mut y0), (mut x1, mut y1)) = (from, to);
    if ![x0, y0, x1, y1].iter().all(|v| v.is_finite()) {
        return;
    }
    let steep = (y1 - y0).abs() > (x1 - x0).abs();
    if steep {
        (x0, y0, x1, y1) = (y0, x0, y1, x1);
    }
    if x0 > x1 {
        (x0, y0, x1, y1) = (x1, y1, x0, y0);
    }
    let dx = x1 - x0;
    let gradient = if dx.abs() < f64::EPSILON { 1.0 } else { (y1 - y0) / dx };
    let mut put = |major: i64, minor: i64, c: f64| {
        let (x, y) = if steep { (minor, major) } else { (major, minor) };
        plot(fb, &bounds, x, y, color, c * weight);
    };

    let xpx0 = x0.round();
    let ypx0 = y0 + gradient * (xpx0 - x0);
    let gap = 1.0 - fpart(x0 + 0.5);
    put(xpx0 as i64, ypx0.floor() as i64, (1.0 - fpart(ypx0)) * gap);
    put(xpx0 as i64, ypx0.floor() as i64 + 1, fpart(ypx0) * gap);

    let xpx1 = x1.round();
    let ypx1 = y1 + gradient * (xpx1 - x1);
    let gap = fpart(x1 + 0.5);
    put(xpx1 as i64, ypx1.floor() as i64, (1.0 - fpart(ypx1)) * gap);
    put(xpx1 as i64, ypx1.floor() as i64 + 1, fpart(ypx1) * gap);

    let mut intery = ypx0 + gradient;
    for x in (xpx0 as i64 + 1)..(xpx1 as i64) {
        let base = intery.floor();
        put(x, base as i64, 1.0 - (intery - base));
        put(x, base as i64 + 1, intery - base);
        intery += gradient;
    }
}

/// Stroke an open polyline `width` pixels wide. Hairlines use Wu lines with
/// reduced coverage; wider strokes fill one quad per segment.
pub fn stroke_polyline(fb: &mut Framebuffer, points: &[(f64, f64)], width: f64, color: Rgba, clip: Option<Rect>) {
    if !(width.is_finite() && width > 0.0) || points.len() < 2 {
        return;
    }
    if width <= 1.0 {
        for pair in points.windows(2) {
            draw_line_aa(fb, pair[0], pair[1], color, width, clip);
        }
        return;
    }
    let half = width / 2.0;
    let quads: Vec<Vec<(f64, f64)>> = points
        .windows(2)
        .filter_map(|pair| {
            let ((x0, y0), (x1, y1)) = (pair[0], pair[1]);
            let len = (x1 - x0).hypot(y1 - y0);
            if !(len.is_finite() && len > 0.0) {
                return None;
            }
            let (nx, ny) = (-(y1 - y0) / len * half, (x1 - x0) / len * half);
            Some(vec![(x0 + nx, y0 + ny), (x1 + nx, y1 + ny), (x1 - nx, y1 - ny), (x0 - nx, y0 - ny)])
        })
        .collect();
    // Segment quads share an orientation, so overlaps at joins fill once.
    fill_paths(fb, &quads, color, clip);
}

/// Split a polyline into the "on" pieces of a dash pattern given in pixels.
#[must_use]
pub fn dash_runs(points: &[(f64, f64)], pattern: &[f64], offset: f64) -> Vec<Vec<(f64, f64)>> {
    let total: f64 = pattern.iter().sum();
    if pattern.is_empty() || !(total.is_finite() && total > 0.0) || pattern.iter().any(|d| *d < 0.0) {
        return vec![points.to_vec()];
    }

    let mut runs = Vec::new();
    let mut current: Vec<(f64, f64)> = Vec::new();
    let mut index = 0;
    let mut left = pattern[0];
    let mut phase = offset.rem_euclid(total);
    while phase >= left {
        phase -= left;
        index = (index + 1) % pattern.len();
        left = pattern[index];
    }
    left -= phase;
    let on = |i: usize| i % 2 == 0;

    if let Some(&first) = points.first() {
        if on(index) {
            current.push(first);
        }
    }
    for pair in points.windows(2) {
        let ((x0, y0), (x1, y1)) = (pair[0], pair[1]);
        let len = (x1 - x0).hypot(y1 - y0);
        let mut done = 0.0;
        while len - done > left {
            done += left;
            let t = done / len;
            let p = (x0 + (x1 - x0) * t, y0 + (y1 - y0) * t);
            if on(index) {
                current.push(p);
                runs.push(std::mem::take(&mut current));
            } else {
                current.push(p);
            }
            index = (index + 1) % pattern.len();
            left = pattern[index];
            if !on(index) {
                current.clear();
            }
        }
        left -= len - done;
        if on(index) {
            current.push((x1, y1));
        }
    }
    if current.len() > 1 {
        runs.push(current);
    }
    runs
}

// ============================================================================
// Fills
// ============================================================================

/// Fill the union of closed paths with the nonzero winding rule.
pub fn fill_paths(fb: &mut Framebuffer, paths: &[Vec<(f64, f64)>], color: Rgba, clip: Option<Rect>) {
    let bounds = Bounds::new(fb, clip);
    let edges: Vec<((f64, f64), (f64, f64))> = paths
        .iter()
        .filter(|p| p.len() > 2 && p.iter().all(|(x, y)| x.is_finite() && y.is_finite()))
        .flat_map(|p| p.iter().copied().zip(p.iter().copied().cycle().skip(1)))
        .filter(|(a, b)| a.1 != b.1)
        .collect();
    if edges.is_empty() || color.a == 0 {
        return;
    }

    let (mut top, mut bottom) = (f64::INFINITY, f64::NEG_INFINITY);
    for ((_, ay), (_, by)) in &edges {
        top = top.min(ay.min(*by));
        bottom = bottom.max(ay.max(*by));
    }
    let y_start = (top.floor() as i64).max(bounds.y0);
    let y_end = (bottom.ceil() as i64).min(bounds.y1);
    let width = usize::try_from(bounds.x1 - bounds.x0).unwrap_or(0);
    if width == 0 {
        return;
    }

    let mut coverage = vec![0.0f64; width];
    let mut crossings: Vec<(f64, i32)> = Vec::new();
    for py in y_start..y_end {
        coverage.iter_mut().for_each(|c| *c = 0.0);
        for s in 0..SUBSAMPLES {
            let sy = py as f64 + (f64::from(s) + 0.5) / f64::from(SUBSAMPLES);
            crossings.clear();
            for &((ax, ay), (bx, by)) in &edges {
                if (ay <= sy) != (by <= sy) {
                    let x = ax + (sy - ay) * (bx - ax) / (by - ay);
                    crossings.push((x, if by > ay { 1 } else { -1 }));
                }
            }
            crossings.sort_by(|a, b| a.0.total_cmp(&b.0));
            let mut winding = 0;
            for pair in crossings.windows(2) {
                winding += pair[0].1;
                if winding != 0 {
                    add_span(&mut coverage, bounds.x0, pair[0].0, pair[1].0, 1.0 / f64::from(SUBSAMPLES));
                }
            }
        }
        for (i, c) in coverage.iter().enumerate() {
            if *c > 0.0 {
                plot(fb, &bounds, bounds.x0 + i as i64, py, color, c.min(1.0));
            }
        }
    }
}

/// Accumulate the horizontal overlap of `[xa, xb)` with each pixel.
fn add_span(coverage: &mut [f64], x_origin: i64, xa: f64, xb: f64, weight: f64) {
    let lo = xa - x_origin as f64;
    let hi = xb - x_origin as f64;
    let first = lo.floor().max(0.0) as usize;
    let last = (hi.ceil().max(0.0) as usize).min(coverage.len());
    for (i, cell) in coverage.iter_mut().enumerate().take(last).skip(first) {
        let px = i as f64;
        let overlap = hi.min(px + 1.0) - lo.max(px);
        if overlap > 0.0 {
            *cell += overlap * weight;
        }
    }
}

/// Composite a rectangle onto the framebuffer.
pub fn fill_rect(fb: &mut Framebuffer, rect: Rect, color: Rgba, clip: Option<Rect>) {
    if color.a == 255 && clip.is_none() && rect.x.fract() == 0.0 && rect.y.fract() == 0.0 {
        let to_u32 = |v: f64| v.max(0.0) as u32;
        fb.fill_rect(to_u32(rect.x), to_u32(rect.y), to_u32(rect.width.ceil()), to_u32(rect.height.ceil()), color);
        return;
    }
    let corners = vec![(rect.x, rect.y), (rect.right(), rect.y), (rect.right(), rect.bottom()), (rect.x, rect.bottom())];
    fill_paths(fb, &[corners], color, clip);
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Rgba = Rgba::rgb(255, 0, 0);
    const BLUE: Rgba = Rgba::rgb(0, 0, 255);

    fn canvas() -> Framebuffer {
        let mut fb = Framebuffer::new(100, 100).unwrap();
        fb.clear(Rgba::WHITE);
        fb
    }

    #[test]
    fn test_line_aa_horizontal() {
        let mut fb = canvas();
        draw_line_aa(&mut fb, (10.0, 50.0), (90.0, 50.0), Rgba::BLACK, 1.0, None);
        let p = fb.get_pixel(50, 50).unwrap();
        assert!(p.r < 128);
        assert_eq!(fb.get_pixel(50, 20), Some(Rgba::WHITE));
    }

    #[test]
    fn test_line_aa_steep_and_offscreen() {
        let mut fb = canvas();
        draw_line_aa(&mut fb, (-20.0, -20.0), (120.0, 130.0), Rgba::BLACK, 1.0, None);
        assert_ne!(fb.get_pixel(46, 51), Some(Rgba::WHITE));
        draw_line_aa(&mut fb, (f64::NAN, 0.0), (1.0, 1.0), RED, 1.0, None);
    }

    #[test]
    fn test_fill_square() {
        let mut fb = canvas();
        let square = vec![(20.0, 20.0), (50.0, 20.0), (50.0, 50.0), (20.0, 50.0)];
        fill_paths(&mut fb, &[square], RED, None);
        assert_eq!(fb.get_pixel(35, 35), Some(RED));
        assert_eq!(fb.get_pixel(20, 20), Some(RED));
        assert_eq!(fb.get_pixel(50, 50), Some(Rgba::WHITE));
        assert_eq!(fb.get_pixel(10, 10), Some(Rgba::WHITE));
    }

    #[test]
    fn test_fill_triangle_edge_is_partial() {
        let mut fb = canvas();
        let triangle = vec![(10.0, 90.0), (90.0, 90.0), (50.0, 10.0)];
        fill_paths(&mut fb, &[triangle], BLUE, None);
        assert_eq!(fb.get_pixel(50, 60), Some(BLUE));
        let edge = fb.get_pixel(30, 49).unwrap();
        assert!(edge.r > 0 && edge.r < 255);
    }

    #[test]
    fn test_clip_limits_fill() {
        let mut fb = canvas();
        let clip = Rect { x: 0.0, y: 0.0, width: 30.0, height: 100.0 };
        let square = vec![(20.0, 20.0), (50.0, 20.0), (50.0, 50.0), (20.0, 50.0)];
        fill_paths(&mut fb, &[square], RED, Some(clip));
        assert_eq!(fb.get_pixel(25, 30), Some(RED));
        assert_eq!(fb.get_pixel(35, 30), Some(Rgba::WHITE));
    }

    #[test]
    fn test_wide_stroke_overlap_blends_once() {
        let mut fb = canvas();
        let half_red = RED.with_alpha(128);
        let path = [(10.0, 50.0), (50.0, 50.0), (50.0, 90.0)];
        stroke_polyline(&mut fb, &path, 6.0, half_red, None);
        let straight = fb.get_pixel(30, 50).unwrap();
        let joint = fb.get_pixel(49, 51).unwrap();
        assert_eq!(straight, joint);
    }

    #[test]
    fn test_dash_runs() {
        let line = [(0.0, 0.0), (10.0, 0.0)];
        let runs = dash_runs(&line, &[3.0, 2.0], 0.0);
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0], vec![(0.0, 0.0), (3.0, 0.0)]);
        assert_eq!(runs[1], vec![(5.0, 0.0), (8.0, 0.0)]);

        let shifted = dash_runs(&line, &[3.0, 2.0], 4.0);
        assert_eq!(shifted[0], vec![(1.0, 0.0), (4.0, 0.0)]);

        assert_eq!(dash_runs(&line, &[], 0.0), vec![line.to_vec()]);
    }

    #[test]
    fn test_fill_rect_fast_path() {
        let mut fb = canvas();
        fill_rect(&mut fb, Rect { x: 10.0, y: 10.0, width: 5.0, height: 5.0 }, RED, None);
        assert_eq!(fb.get_pixel(12, 12), Some(RED));
        assert_eq!(fb.get_pixel(15, 15), Some(Rgba::WHITE));
    }
}
