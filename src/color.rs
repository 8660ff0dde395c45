//! Color types and color space conversions.
//!
//! Two representations live here:
//!
//! - [`Rgba`]: 8-bit channels, what the raster and SVG backends consume.
//! - [`Color`]: floating-point RGB with an *optional* alpha. The compiler keeps
//!   alpha optional so that an alpha written into a color spec (`"#ff000080"`)
//!   can be told apart from one that should come from the `alpha` property.
//!   Missing data maps to an invisible color whose channels are all NaN.
//!
//! Color strings follow the usual conventions: `#rgb`, `#rgba`, `#rrggbb`,
//! `#rrggbbaa`, single-letter base colors, a small table of named colors,
//! gray levels as decimal strings (`"0.5"`), `"none"`, and `"C0"`..`"C9"`
//! references into the active color cycle.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// RGBA color with 8-bit components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
#[repr(C)]
pub struct Rgba {
    /// Red component (0-255).
    pub r: u8,
    /// Green component (0-255).
    pub g: u8,
    /// Blue component (0-255).
    pub b: u8,
    /// Alpha component (0-255, 255 = fully opaque).
    pub a: u8,
}

impl Rgba {
    /// Fully transparent black.
    pub const TRANSPARENT: Self = Self::new(0, 0, 0, 0);
    /// Opaque black.
    pub const BLACK: Self = Self::new(0, 0, 0, 255);
    /// Opaque white.
    pub const WHITE: Self = Self::new(255, 255, 255, 255);

    /// Create a new RGBA color.
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Create an opaque RGB color (alpha = 255).
    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    /// Create a color with modified alpha.
    #[must_use]
    pub const fn with_alpha(self, a: u8) -> Self {
        Self::new(self.r, self.g, self.b, a)
    }

    /// Convert to array representation.
    #[must_use]
    pub const fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Linear interpolation between two colors.
    #[must_use]
    pub fn lerp(self, other: Self, t: f32) -> Self {
        let t = t.clamp(0.0, 1.0);
        let inv_t = 1.0 - t;

        Self::new(
            (f32::from(self.r) * inv_t + f32::from(other.r) * t) as u8,
            (f32::from(self.g) * inv_t + f32::from(other.g) * t) as u8,
            (f32::from(self.b) * inv_t + f32::from(other.b) * t) as u8,
            (f32::from(self.a) * inv_t + f32::from(other.a) * t) as u8,
        )
    }

    /// `#rrggbb` form, ignoring alpha.
    #[must_use]
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// HSLA color with floating-point components.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Hsla {
    /// Hue (0.0-360.0 degrees).
    pub h: f32,
    /// Saturation (0.0-1.0).
    pub s: f32,
    /// Lightness (0.0-1.0).
    pub l: f32,
    /// Alpha (0.0-1.0).
    pub a: f32,
}

impl Hsla {
    /// Create a new HSLA color.
    #[must_use]
    pub const fn new(h: f32, s: f32, l: f32, a: f32) -> Self {
        Self { h, s, l, a }
    }

    /// Create an opaque HSL color (alpha = 1.0).
    #[must_use]
    pub const fn hsl(h: f32, s: f32, l: f32) -> Self {
        Self::new(h, s, l, 1.0)
    }

    /// Convert to floating-point RGB channels in `[0, 1]`.
    #[must_use]
    pub fn to_rgb(self) -> [f64; 3] {
        let h = f64::from(self.h) / 360.0;
        let s = f64::from(self.s);
        let l = f64::from(self.l);

        if s == 0.0 {
            return [l, l, l];
        }
        let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
        let p = 2.0 * l - q;
        [hue_to_rgb(p, q, h + 1.0 / 3.0), hue_to_rgb(p, q, h), hue_to_rgb(p, q, h - 1.0 / 3.0)]
    }

    /// Convert to RGBA.
    #[must_use]
    pub fn to_rgba(self) -> Rgba {
        let [r, g, b] = self.to_rgb();
        Rgba::new((r * 255.0) as u8, (g * 255.0) as u8, (b * 255.0) as u8, (self.a * 255.0) as u8)
    }

    /// Convert an RGB triple in `[0, 1]` to HSL (hue in degrees).
    #[must_use]
    pub fn from_rgb(rgb: [f64; 3]) -> Self {
        let [r, g, b] = rgb;
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let l = (max + min) / 2.0;
        if (max - min).abs() < f64::EPSILON {
            return Self::hsl(0.0, 0.0, l as f32);
        }
        let d = max - min;
        let s = if l > 0.5 { d / (2.0 - max - min) } else { d / (max + min) };
        let h = if max == r {
            (g - b) / d + if g < b { 6.0 } else { 0.0 }
        } else if max == g {
            (b - r) / d + 2.0
        } else {
            (r - g) / d + 4.0
        };
        Self::hsl((h * 60.0) as f32, s as f32, l as f32)
    }
}

fn hue_to_rgb(p: f64, q: f64, mut t: f64) -> f64 {
    if t < 0.0 {
        t += 1.0;
    }
    if t > 1.0 {
        t -= 1.0;
    }

    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 1.0 / 2.0 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}

impl From<Hsla> for Rgba {
    fn from(hsla: Hsla) -> Self {
        hsla.to_rgba()
    }
}

/// Floating-point color with an optional alpha channel.
///
/// Serializes as its hex string, so themes can be written in YAML.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    /// Red channel in `[0, 1]`.
    pub r: f64,
    /// Green channel in `[0, 1]`.
    pub g: f64,
    /// Blue channel in `[0, 1]`.
    pub b: f64,
    /// Alpha in `[0, 1]`; `None` when the spec did not carry one.
    pub alpha: Option<f64>,
}

impl Color {
    /// Opaque-able RGB color without an explicit alpha.
    #[must_use]
    pub const fn rgb(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b, alpha: None }
    }

    /// RGB color with an explicit alpha.
    #[must_use]
    pub const fn rgba(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, alpha: Some(a) }
    }

    /// Invisible color used for missing data.
    #[must_use]
    pub const fn invisible() -> Self {
        Self { r: f64::NAN, g: f64::NAN, b: f64::NAN, alpha: None }
    }

    /// Fully transparent black, the result of parsing `"none"`.
    #[must_use]
    pub const fn none() -> Self {
        Self::rgba(0.0, 0.0, 0.0, 0.0)
    }

    /// Whether every RGB channel is finite.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.r.is_finite() && self.g.is_finite() && self.b.is_finite()
    }

    /// Replace the alpha channel.
    #[must_use]
    pub const fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = Some(alpha);
        self
    }

    /// Drop the alpha channel.
    #[must_use]
    pub const fn without_alpha(mut self) -> Self {
        self.alpha = None;
        self
    }

    /// RGB channels as an array.
    #[must_use]
    pub const fn channels(&self) -> [f64; 3] {
        [self.r, self.g, self.b]
    }

    /// Effective opacity: the explicit alpha, or 1.
    #[must_use]
    pub fn opacity(&self) -> f64 {
        self.alpha.unwrap_or(1.0)
    }

    /// Quantize to 8-bit channels. Invisible colors become transparent.
    #[must_use]
    pub fn to_rgba8(&self) -> Rgba {
        let alpha = self.opacity();
        if !self.is_visible() || !alpha.is_finite() {
            return Rgba::TRANSPARENT;
        }
        let q = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        Rgba::new(q(self.r), q(self.g), q(self.b), q(alpha))
    }

    /// Channel-wise linear interpolation (alpha is not interpolated).
    #[must_use]
    pub fn lerp(&self, other: &Color, t: f64) -> Color {
        Color::rgb(
            self.r + (other.r - self.r) * t,
            self.g + (other.g - self.g) * t,
            self.b + (other.b - self.b) * t,
        )
    }

    /// Parse a color string, resolving `"Cn"` references against `cycle`.
    pub fn parse_in(spec: &str, cycle: &[Color]) -> Result<Color> {
        let s = spec.trim();
        if let Some(idx) = s.strip_prefix('C').and_then(|n| n.parse::<usize>().ok()) {
            if cycle.is_empty() {
                return Err(Error::InvalidColor(format!("{spec:?} used with an empty color cycle")));
            }
            return Ok(cycle[idx % cycle.len()]);
        }
        s.parse()
    }

    /// Parse a color string against the default `deep` cycle.
    pub fn parse(spec: &str) -> Result<Color> {
        Color::parse_in(spec, &crate::palettes::qualitative("deep").unwrap_or_default())
    }
}

impl From<Rgba> for Color {
    fn from(c: Rgba) -> Self {
        let f = |v: u8| f64::from(v) / 255.0;
        Color::rgba(f(c.r), f(c.g), f(c.b), f(c.a))
    }
}

impl From<[f64; 3]> for Color {
    fn from(c: [f64; 3]) -> Self {
        Color::rgb(c[0], c[1], c[2])
    }
}

impl From<[f64; 4]> for Color {
    fn from(c: [f64; 4]) -> Self {
        Color::rgba(c[0], c[1], c[2], c[3])
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = self.to_rgba8();
        match self.alpha {
            Some(_) => write!(f, "{}{:02x}", c.to_hex(), c.a),
            None => write!(f, "{}", c.to_hex()),
        }
    }
}

impl TryFrom<String> for Color {
    type Error = Error;

    fn try_from(spec: String) -> Result<Color> {
        Color::parse(&spec)
    }
}

impl From<Color> for String {
    fn from(c: Color) -> String {
        c.to_string()
    }
}

impl FromStr for Color {
    type Err = Error;

    fn from_str(spec: &str) -> Result<Color> {
        let s = spec.trim().to_ascii_lowercase();
        if s == "none" {
            return Ok(Color::none());
        }
        if let Some(hex) = s.strip_prefix('#') {
            return parse_hex(hex).ok_or_else(|| Error::InvalidColor(spec.to_string()));
        }
        if let Ok(gray) = s.parse::<f64>() {
            if (0.0..=1.0).contains(&gray) {
                return Ok(Color::rgb(gray, gray, gray));
            }
            return Err(Error::InvalidColor(format!("gray level {spec:?} outside [0, 1]")));
        }
        NAMED_COLORS
            .iter()
            .find(|(name, _)| *name == s)
            .and_then(|(_, hex)| parse_hex(&hex[1..]))
            .ok_or_else(|| Error::InvalidColor(spec.to_string()))
    }
}

fn parse_hex(hex: &str) -> Option<Color> {
    let digits: Vec<f64> = match hex.len() {
        3 | 4 => hex
            .chars()
            .map(|c| c.to_digit(16).map(|d| f64::from(d * 17) / 255.0))
            .collect::<Option<_>>()?,
        6 | 8 => (0..hex.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok().map(|v| f64::from(v) / 255.0))
            .collect::<Option<_>>()?,
        _ => return None,
    };
    Some(match digits.as_slice() {
        [r, g, b] => Color::rgb(*r, *g, *b),
        [r, g, b, a] => Color::rgba(*r, *g, *b, *a),
        _ => return None,
    })
}

/// Base colors and the common named colors.
const NAMED_COLORS: &[(&str, &str)] = &[
    ("b", "#0000ff"),
    ("g", "#008000"),
    ("r", "#ff0000"),
    ("c", "#00bfbf"),
    ("m", "#bf00bf"),
    ("y", "#bfbf00"),
    ("k", "#000000"),
    ("w", "#ffffff"),
    ("black", "#000000"),
    ("white", "#ffffff"),
    ("red", "#ff0000"),
    ("green", "#008000"),
    ("blue", "#0000ff"),
    ("yellow", "#ffff00"),
    ("cyan", "#00ffff"),
    ("magenta", "#ff00ff"),
    ("orange", "#ffa500"),
    ("purple", "#800080"),
    ("brown", "#a52a2a"),
    ("pink", "#ffc0cb"),
    ("gray", "#808080"),
    ("grey", "#808080"),
    ("darkgray", "#a9a9a9"),
    ("darkgrey", "#a9a9a9"),
    ("lightgray", "#d3d3d3"),
    ("lightgrey", "#d3d3d3"),
    ("dimgray", "#696969"),
    ("silver", "#c0c0c0"),
    ("navy", "#000080"),
    ("teal", "#008080"),
    ("olive", "#808000"),
    ("maroon", "#800000"),
    ("crimson", "#dc143c"),
    ("gold", "#ffd700"),
    ("indigo", "#4b0082"),
    ("seagreen", "#2e8b57"),
    ("steelblue", "#4682b4"),
    ("slategray", "#708090"),
    ("tomato", "#ff6347"),
    ("salmon", "#fa8072"),
    ("skyblue", "#87ceeb"),
    ("darkblue", "#00008b"),
    ("darkred", "#8b0000"),
    ("darkgreen", "#006400"),
    ("darkorange", "#ff8c00"),
    ("rebeccapurple", "#663399"),
    ("tab:blue", "#1f77b4"),
    ("tab:orange", "#ff7f0e"),
    ("tab:green", "#2ca02c"),
    ("tab:red", "#d62728"),
    ("tab:purple", "#9467bd"),
    ("tab:brown", "#8c564b"),
    ("tab:pink", "#e377c2"),
    ("tab:gray", "#7f7f7f"),
    ("tab:olive", "#bcbd22"),
    ("tab:cyan", "#17becf"),
];

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_color_yaml_as_string() {
        let c: Color = serde_yaml_ng::from_str("\"#ff0000\"").unwrap();
        assert_eq!(c, Color::rgb(1.0, 0.0, 0.0));
        let out = serde_yaml_ng::to_string(&c).unwrap();
        assert!(out.contains("#ff0000"));
        assert!(serde_yaml_ng::from_str::<Color>("\"nope\"").is_err());
    }

    #[test]
    fn test_rgba_lerp() {
        let mid = Rgba::BLACK.lerp(Rgba::WHITE, 0.5);
        assert_eq!(mid.r, 127);
        assert_eq!(mid.g, 127);
        assert_eq!(mid.b, 127);
    }

    #[test]
    fn test_lerp_boundaries() {
        assert_eq!(Rgba::BLACK.lerp(Rgba::WHITE, -0.5), Rgba::BLACK);
        assert_eq!(Rgba::BLACK.lerp(Rgba::WHITE, 1.5), Rgba::WHITE);
    }

    #[test]
    fn test_hsla_to_rgba() {
        let red = Hsla::hsl(0.0, 1.0, 0.5).to_rgba();
        assert_eq!((red.r, red.g, red.b), (255, 0, 0));

        let gray = Hsla::hsl(0.0, 0.0, 0.5).to_rgba();
        assert_eq!((gray.r, gray.g, gray.b), (127, 127, 127));
    }

    #[test]
    fn test_hsla_roundtrip_hue() {
        let hsl = Hsla::from_rgb([0.0, 1.0, 1.0]);
        assert_abs_diff_eq!(hsl.h, 180.0, epsilon = 1e-4);
        assert_abs_diff_eq!(hsl.l, 0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_parse_hex_forms() {
        assert_eq!("#f00".parse::<Color>().unwrap(), Color::rgb(1.0, 0.0, 0.0));
        let c: Color = "#ff000080".parse().unwrap();
        assert_abs_diff_eq!(c.alpha.unwrap(), 128.0 / 255.0);
        assert!("#12345".parse::<Color>().is_err());
    }

    #[test]
    fn test_parse_named_and_gray() {
        assert_eq!(Color::parse("k").unwrap().to_rgba8(), Rgba::BLACK);
        let gray = Color::parse("0.5").unwrap();
        assert_abs_diff_eq!(gray.g, 0.5);
        assert!(gray.alpha.is_none());
        assert!(Color::parse("1.5").is_err());
        assert!(Color::parse("not-a-color").is_err());
    }

    #[test]
    fn test_parse_none_is_transparent() {
        assert_eq!(Color::parse("none").unwrap().to_rgba8().a, 0);
    }

    #[test]
    fn test_parse_cycle_reference() {
        let cycle = [Color::rgb(1.0, 0.0, 0.0), Color::rgb(0.0, 1.0, 0.0)];
        assert_eq!(Color::parse_in("C1", &cycle).unwrap(), cycle[1]);
        assert_eq!(Color::parse_in("C3", &cycle).unwrap(), cycle[1]);
    }

    #[test]
    fn test_invisible_color() {
        let c = Color::invisible();
        assert!(!c.is_visible());
        assert_eq!(c.to_rgba8(), Rgba::TRANSPARENT);
    }

    #[test]
    fn test_display_hex() {
        assert_eq!(Color::rgb(1.0, 0.0, 0.0).to_string(), "#ff0000");
        assert_eq!(Color::rgba(0.0, 0.0, 1.0, 1.0).to_string(), "#0000ffff");
    }
}
