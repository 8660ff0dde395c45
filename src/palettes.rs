//! Named color palettes and continuous colormaps.
//!
//! Qualitative palettes (`deep`, `muted`, ...) are fixed lists. Evenly spaced
//! hue palettes are generated in HUSL or HLS space. Continuous mappings are
//! [`Colormap`]s: a sequence of evenly spaced anchor colors interpolated
//! linearly. String specs understood by [`color_palette`] and [`colormap`]:
//!
//! - a qualitative palette name, `husl`, `hls`
//! - a colormap name (`viridis`, `plasma`, `magma`, `inferno`, `cividis`),
//!   optionally suffixed `_r`
//! - `ch:<args>` cubehelix (`start`/`s`, `rot`/`r`, `gamma`/`g`, `hue`/`h`,
//!   `light`/`l`, `dark`/`d`), `light:<color>`, `dark:<color>`,
//!   `blend:<color>,<color>,...`
//!
//! # References
//!
//! - Green, D. A. (2011). "A colour scheme for the display of astronomical
//!   intensity images." *Bulletin of the Astronomical Society of India*, 39, 289.

use std::f64::consts::PI;

use crate::color::{Color, Hsla};
use crate::error::{Error, Result};

const DEEP: [&str; 10] = [
    "#4C72B0", "#DD8452", "#55A868", "#C44E52", "#8172B3", "#937860", "#DA8BC3", "#8C8C8C",
    "#CCB974", "#64B5CD",
];
const MUTED: [&str; 10] = [
    "#4878D0", "#EE854A", "#6ACC64", "#D65F5F", "#956CB4", "#8C613C", "#DC7EC0", "#797979",
    "#D5BB67", "#82C6E2",
];
const PASTEL: [&str; 10] = [
    "#A1C9F4", "#FFB482", "#8DE5A1", "#FF9F9B", "#D0BBFF", "#DEBB9B", "#FAB0E4", "#CFCFCF",
    "#FFFEA3", "#B9F2F0",
];
const BRIGHT: [&str; 10] = [
    "#023EFF", "#FF7C00", "#1AC938", "#E8000B", "#8B2BE2", "#9F4800", "#F14CC1", "#A3A3A3",
    "#FFC400", "#00D7FF",
];
const DARK: [&str; 10] = [
    "#001C7F", "#B1400D", "#12711C", "#8C0800", "#591E71", "#592F0D", "#A23582", "#3C3C3C",
    "#B8850A", "#006374",
];
const COLORBLIND: [&str; 10] = [
    "#0173B2", "#DE8F05", "#029E73", "#D55E00", "#CC78BC", "#CA9161", "#FBAFE4", "#949494",
    "#ECE133", "#56B4E9",
];
const TAB10: [&str; 10] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
    "#bcbd22", "#17becf",
];

const VIRIDIS: [&str; 10] = [
    "#440154", "#482878", "#3e4989", "#31688e", "#26828e", "#1f9e89", "#35b779", "#6ece58",
    "#b5de2b", "#fde725",
];
const PLASMA: [&str; 10] = [
    "#0d0887", "#46039f", "#7201a8", "#9c179e", "#bd3786", "#d8576b", "#ed7953", "#fb9f3a",
    "#fdca26", "#f0f921",
];
const MAGMA: [&str; 10] = [
    "#000004", "#180f3d", "#440f76", "#721f81", "#9e2f7f", "#cd4071", "#f1605d", "#fd9668",
    "#feca8d", "#fcfdbf",
];
const INFERNO: [&str; 10] = [
    "#000004", "#1b0c41", "#4a0c6b", "#781c6d", "#a52c60", "#cf4446", "#ed6925", "#fb9b06",
    "#f7d13d", "#fcffa4",
];
const CIVIDIS: [&str; 10] = [
    "#00224e", "#123570", "#3b496c", "#575d6d", "#707173", "#8a8678", "#a59c74", "#c3b369",
    "#e1cc55", "#fee838",
];

fn hex_list(hex: &[&str]) -> Vec<Color> {
    hex.iter().filter_map(|h| h.parse().ok()).collect()
}

/// A qualitative palette by name, or `None` if the name is unknown.
#[must_use]
pub fn qualitative(name: &str) -> Option<Vec<Color>> {
    let table: &[&str] = match name {
        "deep" => &DEEP,
        "muted" => &MUTED,
        "pastel" => &PASTEL,
        "bright" => &BRIGHT,
        "dark" => &DARK,
        "colorblind" => &COLORBLIND,
        "tab10" => &TAB10,
        _ => return None,
    };
    Some(hex_list(table))
}

/// A continuous mapping from `[0, 1]` to colors.
#[derive(Debug, Clone, PartialEq)]
pub struct Colormap {
    anchors: Vec<Color>,
}

impl Colormap {
    /// Build a colormap from evenly spaced anchor colors (alpha is dropped).
    pub fn from_anchors(anchors: Vec<Color>) -> Result<Self> {
        if anchors.is_empty() {
            return Err(Error::value("a colormap needs at least one color"));
        }
        Ok(Self { anchors: anchors.into_iter().map(Color::without_alpha).collect() })
    }

    /// Same colormap traversed in the opposite direction.
    #[must_use]
    pub fn reversed(mut self) -> Self {
        self.anchors.reverse();
        self
    }

    /// Color at position `t`; values outside `[0, 1]` are clipped and
    /// non-finite input yields an invisible color.
    #[must_use]
    pub fn sample(&self, t: f64) -> Color {
        if !t.is_finite() {
            return Color::invisible();
        }
        let n = self.anchors.len();
        if n == 1 {
            return self.anchors[0];
        }
        let pos = t.clamp(0.0, 1.0) * (n - 1) as f64;
        let lo = (pos.floor() as usize).min(n - 2);
        self.anchors[lo].lerp(&self.anchors[lo + 1], pos - lo as f64)
    }

    /// `n` colors sampled evenly across the full range.
    #[must_use]
    pub fn colors(&self, n: usize) -> Vec<Color> {
        linspace(0.0, 1.0, n).into_iter().map(|t| self.sample(t)).collect()
    }
}

pub(crate) fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => (0..n).map(|i| start + (stop - start) * i as f64 / (n - 1) as f64).collect(),
    }
}

/// Parameters of the cubehelix color scheme.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cubehelix {
    /// Starting hue (0 to 3).
    pub start: f64,
    /// Rotations around the hue wheel over the range.
    pub rot: f64,
    /// Gamma factor emphasizing dark (< 1) or light (> 1) colors.
    pub gamma: f64,
    /// Saturation.
    pub hue: f64,
    /// Lightness of the lightest color.
    pub light: f64,
    /// Lightness of the darkest color.
    pub dark: f64,
    /// Run from dark to light instead.
    pub reverse: bool,
}

impl Default for Cubehelix {
    fn default() -> Self {
        Self { start: 0.0, rot: 0.4, gamma: 1.0, hue: 0.8, light: 0.85, dark: 0.15, reverse: false }
    }
}

impl Cubehelix {
    /// Parse the argument part of a `ch:` spec, e.g. `"s=.25,rot=-.25"`.
    pub fn parse(args: &str) -> Result<Self> {
        let mut params = Self::default();
        let mut args = args.trim();
        if let Some(stripped) = args.strip_suffix("_r") {
            params.reverse = true;
            args = stripped;
        }
        for pair in args.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| Error::value(format!("malformed cubehelix argument {pair:?}")))?;
            let value: f64 = value
                .trim()
                .parse()
                .map_err(|_| Error::value(format!("non-numeric cubehelix argument {pair:?}")))?;
            match key.trim() {
                "start" | "s" => params.start = value,
                "rot" | "r" => params.rot = value,
                "gamma" | "g" => params.gamma = value,
                "hue" | "h" => params.hue = value,
                "light" | "l" => params.light = value,
                "dark" | "d" => params.dark = value,
                other => return Err(Error::value(format!("unknown cubehelix parameter {other:?}"))),
            }
        }
        Ok(params)
    }

    fn color_at(&self, x: f64) -> Color {
        let xg = x.powf(self.gamma);
        let a = self.hue * xg * (1.0 - xg) / 2.0;
        let phi = 2.0 * PI * (self.start / 3.0 + self.rot * x);
        let channel = |p0: f64, p1: f64| (xg + a * (p0 * phi.cos() + p1 * phi.sin())).clamp(0.0, 1.0);
        Color::rgb(
            channel(-0.14861, 1.78277),
            channel(-0.29227, -0.90649),
            channel(1.97294, 0.0),
        )
    }

    /// The scheme as a colormap running from `light` to `dark`.
    #[must_use]
    pub fn colormap(&self) -> Colormap {
        let mut anchors: Vec<Color> =
            linspace(self.light, self.dark, 256).into_iter().map(|x| self.color_at(x)).collect();
        if self.reverse {
            anchors.reverse();
        }
        Colormap { anchors }
    }
}

/// Evenly spaced hues in HUSL space.
#[must_use]
pub fn husl_palette(n: usize, h: f64, s: f64, l: f64) -> Vec<Color> {
    let mut hues = linspace(0.0, 1.0, n + 1);
    hues.pop();
    hues.into_iter()
        .map(|hue| {
            let hue = ((hue + h) % 1.0) * 359.0;
            let [r, g, b] = husl::to_rgb(hue, s * 99.0, l * 99.0);
            Color::rgb(r.clamp(0.0, 1.0), g.clamp(0.0, 1.0), b.clamp(0.0, 1.0))
        })
        .collect()
}

/// Evenly spaced hues in HLS space.
#[must_use]
pub fn hls_palette(n: usize, h: f64, l: f64, s: f64) -> Vec<Color> {
    let mut hues = linspace(0.0, 1.0, n + 1);
    hues.pop();
    hues.into_iter()
        .map(|hue| {
            let hue = (hue + h).rem_euclid(1.0) * 360.0;
            Color::from(Hsla::hsl(hue as f32, s as f32, l as f32).to_rgb())
        })
        .collect()
}

/// Colormap interpolating between the given colors.
pub fn blend_palette(colors: &[Color]) -> Result<Colormap> {
    Colormap::from_anchors(colors.to_vec())
}

/// Colormap from a desaturated near-white to `color`.
#[must_use]
pub fn light_palette(color: Color) -> Colormap {
    let hsl = Hsla::from_rgb(color.channels());
    let light = Color::from(Hsla::hsl(hsl.h, hsl.s * 0.15, 0.95).to_rgb());
    Colormap { anchors: vec![light, color.without_alpha()] }
}

/// Colormap from a desaturated near-black to `color`.
#[must_use]
pub fn dark_palette(color: Color) -> Colormap {
    let hsl = Hsla::from_rgb(color.channels());
    let dark = Color::from(Hsla::hsl(hsl.h, hsl.s * 0.15, 0.15).to_rgb());
    Colormap { anchors: vec![dark, color.without_alpha()] }
}

fn named_colormap(name: &str) -> Option<Colormap> {
    let table: &[&str] = match name {
        "viridis" => &VIRIDIS,
        "plasma" => &PLASMA,
        "magma" => &MAGMA,
        "inferno" => &INFERNO,
        "cividis" => &CIVIDIS,
        _ => return None,
    };
    Some(Colormap { anchors: hex_list(table) })
}

/// Resolve a continuous colormap from a palette spec string.
pub fn colormap(spec: &str) -> Result<Colormap> {
    if let Some(args) = spec.strip_prefix("ch:") {
        return Ok(Cubehelix::parse(args)?.colormap());
    }
    if let Some(base) = spec.strip_prefix("light:") {
        let (base, reverse) = strip_reverse(base);
        let cmap = light_palette(Color::parse(base)?);
        return Ok(if reverse { cmap.reversed() } else { cmap });
    }
    if let Some(base) = spec.strip_prefix("dark:") {
        let (base, reverse) = strip_reverse(base);
        let cmap = dark_palette(Color::parse(base)?);
        return Ok(if reverse { cmap.reversed() } else { cmap });
    }
    if let Some(list) = spec.strip_prefix("blend:") {
        let colors = list.split(',').map(Color::parse).collect::<Result<Vec<_>>>()?;
        return blend_palette(&colors);
    }
    let (name, reverse) = strip_reverse(spec);
    let cmap = named_colormap(name)
        .or_else(|| qualitative(name).map(|anchors| Colormap { anchors }))
        .ok_or_else(|| Error::value(format!("{spec:?} is not a known palette or colormap")))?;
    Ok(if reverse { cmap.reversed() } else { cmap })
}

fn strip_reverse(spec: &str) -> (&str, bool) {
    spec.strip_suffix("_r").map_or((spec, false), |s| (s, true))
}

/// `n` discrete colors from a palette spec string.
///
/// Qualitative palettes cycle when `n` exceeds their length; colormaps are
/// sampled away from their extremes.
pub fn color_palette(spec: &str, n: usize) -> Result<Vec<Color>> {
    if let Some(colors) = qualitative(spec) {
        return Ok(colors.iter().cycle().take(n).copied().collect());
    }
    match spec {
        "husl" => return Ok(husl_palette(n, 0.01, 0.9, 0.65)),
        "hls" => return Ok(hls_palette(n, 0.01, 0.6, 0.65)),
        _ => {}
    }
    let cmap = colormap(spec)?;
    if named_colormap(strip_reverse(spec).0).is_some() {
        let mut bins = linspace(0.0, 1.0, n + 2);
        bins.pop();
        return Ok(bins.into_iter().skip(1).map(|t| cmap.sample(t)).collect());
    }
    Ok(cmap.colors(n))
}

/// Conversion from HUSL (human-friendly HSL) to sRGB.
mod husl {
    const M: [[f64; 3]; 3] =
        [[3.2406, -1.5372, -0.4986], [-0.9689, 1.8758, 0.0415], [0.0557, -0.2040, 1.0570]];
    const REF_U: f64 = 0.19784;
    const REF_V: f64 = 0.46834;
    const LAB_E: f64 = 0.008856;
    const LAB_K: f64 = 903.3;

    pub(super) fn to_rgb(h: f64, s: f64, l: f64) -> [f64; 3] {
        let (l, c, h) = to_lch(h, s, l);
        let hrad = h.to_radians();
        let (u, v) = (hrad.cos() * c, hrad.sin() * c);
        let [x, y, z] = luv_to_xyz(l, u, v);
        M.map(|row| from_linear(row[0] * x + row[1] * y + row[2] * z))
    }

    fn to_lch(h: f64, s: f64, l: f64) -> (f64, f64, f64) {
        if l > 99.999_999_9 {
            return (100.0, 0.0, h);
        }
        if l < 1e-8 {
            return (0.0, 0.0, h);
        }
        (l, max_chroma(l, h) / 100.0 * s, h)
    }

    fn max_chroma(l: f64, h: f64) -> f64 {
        let hrad = h.to_radians();
        let (sin_h, cos_h) = (hrad.sin(), hrad.cos());
        let sub1 = (l + 16.0).powi(3) / 1_560_896.0;
        let sub2 = if sub1 > LAB_E { sub1 } else { l / LAB_K };
        let mut result = f64::INFINITY;
        for [m1, m2, m3] in M {
            let top = (0.99915 * m1 + 1.05122 * m2 + 1.14460 * m3) * sub2;
            let rbottom = 0.86330 * m3 - 0.17266 * m2;
            let lbottom = 0.12949 * m3 - 0.38848 * m1;
            let bottom = (rbottom * sin_h + lbottom * cos_h) * sub2;
            for t in [0.0, 1.0] {
                let c = l * (top - 1.05122 * t) / (bottom + 0.17266 * sin_h * t);
                if c > 0.0 && c < result {
                    result = c;
                }
            }
        }
        result
    }

    fn f_inv(t: f64) -> f64 {
        if t.powi(3) > LAB_E {
            t.powi(3)
        } else {
            (116.0 * t - 16.0) / LAB_K
        }
    }

    fn luv_to_xyz(l: f64, u: f64, v: f64) -> [f64; 3] {
        if l == 0.0 {
            return [0.0; 3];
        }
        let var_y = f_inv((l + 16.0) / 116.0);
        let var_u = u / (13.0 * l) + REF_U;
        let var_v = v / (13.0 * l) + REF_V;
        let y = var_y;
        let x = -(9.0 * y * var_u) / ((var_u - 4.0) * var_v - var_u * var_v);
        let z = (9.0 * y - 15.0 * var_v * y - var_v * x) / (3.0 * var_v);
        [x, y, z]
    }

    fn from_linear(c: f64) -> f64 {
        if c <= 0.003_130_8 {
            12.92 * c
        } else {
            1.055 * c.powf(1.0 / 2.4) - 0.055
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_qualitative_lookup() {
        let deep = qualitative("deep").unwrap();
        assert_eq!(deep.len(), 10);
        assert_eq!(deep[0].to_rgba8().to_hex(), "#4c72b0");
        assert!(qualitative("unknown").is_none());
    }

    #[test]
    fn test_color_palette_cycles_qualitative() {
        let colors = color_palette("muted", 12).unwrap();
        assert_eq!(colors.len(), 12);
        assert_eq!(colors[10], colors[0]);
    }

    #[test]
    fn test_husl_palette_distinct() {
        let colors = husl_palette(12, 0.01, 0.9, 0.65);
        assert_eq!(colors.len(), 12);
        for (i, a) in colors.iter().enumerate() {
            assert!(a.is_visible());
            for b in &colors[i + 1..] {
                assert_ne!(a.to_rgba8(), b.to_rgba8());
            }
        }
    }

    #[test]
    fn test_colormap_sample_clips_and_handles_nan() {
        let cmap = colormap("viridis").unwrap();
        assert_eq!(cmap.sample(-1.0), cmap.sample(0.0));
        assert_eq!(cmap.sample(0.0).to_rgba8().to_hex(), "#440154");
        assert!(!cmap.sample(f64::NAN).is_visible());
    }

    #[test]
    fn test_colormap_reverse_suffix() {
        let fwd = colormap("magma").unwrap();
        let rev = colormap("magma_r").unwrap();
        assert_eq!(fwd.sample(0.0), rev.sample(1.0));
    }

    #[test]
    fn test_cubehelix_default_runs_light_to_dark() {
        let cmap = Cubehelix::default().colormap();
        let lum = |c: Color| c.r + c.g + c.b;
        assert!(lum(cmap.sample(0.0)) > lum(cmap.sample(1.0)));
    }

    #[test]
    fn test_cubehelix_parse() {
        let ch = Cubehelix::parse("s=.25,rot=-.25,light=.9_r").unwrap();
        assert_abs_diff_eq!(ch.start, 0.25);
        assert_abs_diff_eq!(ch.rot, -0.25);
        assert_abs_diff_eq!(ch.light, 0.9);
        assert!(ch.reverse);
        assert!(Cubehelix::parse("bogus=1").is_err());
    }

    #[test]
    fn test_blend_spec() {
        let cmap = colormap("blend:#000000,#ffffff").unwrap();
        assert_abs_diff_eq!(cmap.sample(0.5).r, 0.5);
    }

    #[test]
    fn test_light_palette_ends_on_color() {
        let red = Color::rgb(1.0, 0.0, 0.0);
        assert_eq!(light_palette(red).sample(1.0), red);
    }

    #[test]
    fn test_unknown_palette() {
        assert!(color_palette("nope", 3).is_err());
    }
}
