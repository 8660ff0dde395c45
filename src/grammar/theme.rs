//! Theme and display configuration.
//!
//! A [`Theme`] holds every style parameter the compiler and the backends
//! read: panel colors, grid and spine settings, and the line/patch/font
//! defaults that marks and properties fall back to. Themes load from YAML
//! and come in five presets (`darkgrid`, `whitegrid`, `dark`, `white`,
//! `ticks`).
//!
//! The process-wide default lives in [`PlotConfig::global`] and is never
//! mutated. Per-plot [`ThemeOverrides`] are layered on top of it for one
//! compilation only.

use std::path::Path;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::error::{Error, Result};
use crate::palettes;

/// Style parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Theme {
    /// Preset name this theme was derived from.
    pub name: String,
    /// Figure background.
    pub figure_facecolor: Color,
    /// Panel (axes) background.
    pub axes_facecolor: Color,
    /// Panel border and axis line color.
    pub axes_edgecolor: Color,
    /// Panel border width in points.
    pub axes_linewidth: f64,
    /// Draw the panel border.
    pub spines: bool,
    /// Draw grid lines.
    pub grid: bool,
    /// Grid line color.
    pub grid_color: Color,
    /// Grid line width in points.
    pub grid_linewidth: f64,
    /// Draw tick marks outside the panel.
    pub ticks: bool,
    /// Tick mark length in points.
    pub tick_size: f64,
    /// Color of titles, labels and tick labels.
    pub text_color: Color,
    /// Base font size in points.
    pub font_size: f64,
    /// Default line width in points.
    pub lines_linewidth: f64,
    /// Default line style.
    pub lines_linestyle: String,
    /// Default marker drawn on lines (`"None"` for none).
    pub lines_marker: String,
    /// Default marker size in points.
    pub lines_markersize: f64,
    /// Default marker edge width in points.
    pub lines_markeredgewidth: f64,
    /// Default scatter marker.
    pub scatter_marker: String,
    /// Default patch edge width in points.
    pub patch_linewidth: f64,
    /// Default patch edge color.
    pub patch_edgecolor: Color,
    /// Palette spec for the color cycle (`"C0"`, `"C1"`, ...).
    pub prop_cycle: String,
    /// Fractional padding added around the data when autoscaling.
    pub margins: f64,
    /// Figure width in pixels.
    pub width: u32,
    /// Figure height in pixels.
    pub height: u32,
    /// Pixels per point.
    pub dpi: f64,
}

impl Default for Theme {
    fn default() -> Self {
        Self::darkgrid()
    }
}

impl Theme {
    fn base(name: &str) -> Self {
        Self {
            name: name.to_string(),
            figure_facecolor: Color::rgb(1.0, 1.0, 1.0),
            axes_facecolor: Color::rgb(1.0, 1.0, 1.0),
            axes_edgecolor: Color::rgb(0.15, 0.15, 0.15),
            axes_linewidth: 1.25,
            spines: true,
            grid: false,
            grid_color: Color::rgb(0.8, 0.8, 0.8),
            grid_linewidth: 1.0,
            ticks: false,
            tick_size: 6.0,
            text_color: Color::rgb(0.15, 0.15, 0.15),
            font_size: 10.0,
            lines_linewidth: 1.5,
            lines_linestyle: "-".to_string(),
            lines_marker: "None".to_string(),
            lines_markersize: 6.0,
            lines_markeredgewidth: 1.0,
            scatter_marker: "o".to_string(),
            patch_linewidth: 1.0,
            patch_edgecolor: Color::rgb(1.0, 1.0, 1.0),
            prop_cycle: "deep".to_string(),
            margins: 0.05,
            width: 640,
            height: 480,
            dpi: 100.0 / 72.0,
        }
    }

    /// Gray panel with a white grid (default).
    #[must_use]
    pub fn darkgrid() -> Self {
        Self {
            axes_facecolor: Color::rgb(0.918, 0.918, 0.949),
            axes_edgecolor: Color::rgb(1.0, 1.0, 1.0),
            spines: false,
            grid: true,
            grid_color: Color::rgb(1.0, 1.0, 1.0),
            ..Self::base("darkgrid")
        }
    }

    /// White panel with a light gray grid.
    #[must_use]
    pub fn whitegrid() -> Self {
        Self {
            axes_edgecolor: Color::rgb(0.8, 0.8, 0.8),
            grid: true,
            ..Self::base("whitegrid")
        }
    }

    /// Gray panel without a grid.
    #[must_use]
    pub fn dark() -> Self {
        Self {
            axes_facecolor: Color::rgb(0.918, 0.918, 0.949),
            axes_edgecolor: Color::rgb(1.0, 1.0, 1.0),
            spines: false,
            ..Self::base("dark")
        }
    }

    /// White panel with a dark border.
    #[must_use]
    pub fn white() -> Self {
        Self::base("white")
    }

    /// White panel with a dark border and tick marks.
    #[must_use]
    pub fn ticks() -> Self {
        Self { ticks: true, ..Self::base("ticks") }
    }

    /// Look up a preset by name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Value`] for an unknown preset.
    pub fn preset(name: &str) -> Result<Self> {
        match name {
            "darkgrid" => Ok(Self::darkgrid()),
            "whitegrid" => Ok(Self::whitegrid()),
            "dark" => Ok(Self::dark()),
            "white" => Ok(Self::white()),
            "ticks" => Ok(Self::ticks()),
            _ => Err(Error::value(format!("Unknown theme preset: {name:?}"))),
        }
    }

    /// Colors of the default color cycle.
    #[must_use]
    pub fn color_cycle(&self) -> Vec<Color> {
        palettes::qualitative(&self.prop_cycle)
            .or_else(|| palettes::color_palette(&self.prop_cycle, 10).ok())
            .unwrap_or_default()
    }

    /// Parse a color, resolving `"Cn"` against this theme's cycle.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidColor`] for an unparseable spec.
    pub fn color(&self, spec: &str) -> Result<Color> {
        Color::parse_in(spec, &self.color_cycle())
    }

    /// Convert points to pixels.
    #[must_use]
    pub fn points_to_pixels(&self, points: f64) -> f64 {
        points * self.dpi
    }
}

/// Per-plot theme overrides; every field left `None` keeps the base value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThemeOverrides {
    /// Start from this preset instead of the base theme.
    pub preset: Option<String>,
    /// Panel background.
    pub axes_facecolor: Option<Color>,
    /// Panel border color.
    pub axes_edgecolor: Option<Color>,
    /// Draw grid lines.
    pub grid: Option<bool>,
    /// Grid line color.
    pub grid_color: Option<Color>,
    /// Base font size.
    pub font_size: Option<f64>,
    /// Default line width.
    pub lines_linewidth: Option<f64>,
    /// Default marker size.
    pub lines_markersize: Option<f64>,
    /// Default patch edge width.
    pub patch_linewidth: Option<f64>,
    /// Default patch edge color.
    pub patch_edgecolor: Option<Color>,
    /// Color cycle palette.
    pub prop_cycle: Option<String>,
    /// Autoscale margins.
    pub margins: Option<f64>,
}

impl ThemeOverrides {
    /// No overrides.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse overrides from YAML.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] on malformed YAML or unknown keys.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml_ng::from_str(yaml)?)
    }

    /// Start from a named preset.
    #[must_use]
    pub fn preset(mut self, name: impl Into<String>) -> Self {
        self.preset = Some(name.into());
        self
    }

    /// Override the color cycle.
    #[must_use]
    pub fn palette(mut self, spec: impl Into<String>) -> Self {
        self.prop_cycle = Some(spec.into());
        self
    }

    /// Toggle the grid.
    #[must_use]
    pub fn grid(mut self, show: bool) -> Self {
        self.grid = Some(show);
        self
    }

    /// Override the line width.
    #[must_use]
    pub fn linewidth(mut self, width: f64) -> Self {
        self.lines_linewidth = Some(width);
        self
    }

    /// Override the base font size.
    #[must_use]
    pub fn font_size(mut self, size: f64) -> Self {
        self.font_size = Some(size);
        self
    }

    /// Whether any override is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Layer these overrides on `base`, producing a new theme.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Value`] for an unknown preset name.
    pub fn apply(&self, base: &Theme) -> Result<Theme> {
        let mut theme = match &self.preset {
            Some(name) => Theme { width: base.width, height: base.height, ..Theme::preset(name)? },
            None => base.clone(),
        };
        macro_rules! set {
            ($($field:ident => $target:ident),* $(,)?) => {
                $(if let Some(v) = &self.$field { theme.$target = v.clone(); })*
            };
        }
        set!(
            axes_facecolor => axes_facecolor,
            axes_edgecolor => axes_edgecolor,
            grid => grid,
            grid_color => grid_color,
            font_size => font_size,
            lines_linewidth => lines_linewidth,
            lines_markersize => lines_markersize,
            patch_linewidth => patch_linewidth,
            patch_edgecolor => patch_edgecolor,
            prop_cycle => prop_cycle,
            margins => margins,
        );
        Ok(theme)
    }
}

/// Raster format used for inline display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayFormat {
    /// Base64-embedded PNG.
    #[default]
    Png,
    /// Inline SVG markup.
    Svg,
}

/// Options for HTML and terminal display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Inline format.
    pub format: DisplayFormat,
    /// Display size relative to the figure size.
    pub scaling: f64,
    /// Render PNGs at twice the resolution and display them at half size.
    pub hidpi: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self { format: DisplayFormat::Png, scaling: 0.85, hidpi: true }
    }
}

/// Complete configuration: theme plus display options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotConfig {
    /// Style parameters.
    pub theme: Theme,
    /// Display options.
    pub display: DisplayConfig,
}

static GLOBAL: OnceLock<PlotConfig> = OnceLock::new();

impl PlotConfig {
    /// Process-wide default configuration.
    ///
    /// Built on first use from `TRUENO_PLOT_CONFIG` (a YAML file path) when
    /// that variable is set and readable, and from the defaults otherwise.
    pub fn global() -> &'static PlotConfig {
        GLOBAL.get_or_init(|| {
            std::env::var_os("TRUENO_PLOT_CONFIG")
                .and_then(|path| match Self::from_yaml_file(&path) {
                    Ok(config) => Some(config),
                    Err(err) => {
                        tracing::warn!(%err, "ignoring unreadable plot configuration");
                        None
                    }
                })
                .unwrap_or_default()
        })
    }

    /// Parse a configuration from YAML. Missing keys take default values.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] on malformed YAML.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml_ng::from_str(yaml)?)
    }

    /// Load a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an I/O error when the file cannot be read, or [`Error::Config`]
    /// when it cannot be parsed.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Serialize to YAML.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if serialization fails.
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_darkgrid() {
        let theme = Theme::default();
        assert_eq!(theme.name, "darkgrid");
        assert!(theme.grid);
        assert!(!theme.spines);
        assert_eq!(theme.lines_linewidth, 1.5);
        assert_eq!(theme.patch_linewidth, 1.0);
    }

    #[test]
    fn test_presets() {
        for name in ["darkgrid", "whitegrid", "dark", "white", "ticks"] {
            assert_eq!(Theme::preset(name).unwrap().name, name);
        }
        assert!(Theme::preset("neon").is_err());
        assert!(Theme::ticks().ticks);
    }

    #[test]
    fn test_color_cycle_references() {
        let theme = Theme::default();
        assert_eq!(theme.color_cycle().len(), 10);
        assert_eq!(theme.color("C1").unwrap(), theme.color_cycle()[1]);
    }

    #[test]
    fn test_overrides_layer_without_mutating_base() {
        let base = Theme::default();
        let over = ThemeOverrides::new().grid(false).linewidth(3.0);
        let theme = over.apply(&base).unwrap();
        assert!(!theme.grid);
        assert_eq!(theme.lines_linewidth, 3.0);
        assert!(base.grid);
        assert_eq!(base.lines_linewidth, 1.5);
    }

    #[test]
    fn test_overrides_preset() {
        let theme = ThemeOverrides::new().preset("white").apply(&Theme::default()).unwrap();
        assert_eq!(theme.name, "white");
        assert!(ThemeOverrides::new().preset("nope").apply(&Theme::default()).is_err());
    }

    #[test]
    fn test_overrides_yaml_rejects_unknown_keys() {
        let over = ThemeOverrides::from_yaml_str("grid: false\nfont_size: 14\n").unwrap();
        assert_eq!(over.font_size, Some(14.0));
        assert!(ThemeOverrides::from_yaml_str("gird: false\n").is_err());
    }

    #[test]
    fn test_config_yaml_partial() {
        let yaml = r##"
theme:
  prop_cycle: muted
  axes_facecolor: "#ffffff"
display:
  format: svg
"##;
        let config = PlotConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.theme.prop_cycle, "muted");
        assert_eq!(config.theme.axes_facecolor, Color::rgb(1.0, 1.0, 1.0));
        assert_eq!(config.theme.lines_linewidth, 1.5);
        assert_eq!(config.display.format, DisplayFormat::Svg);
        assert!(config.display.hidpi);
    }

    #[test]
    fn test_config_roundtrip_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plot.yaml");
        let config = PlotConfig::default();
        std::fs::write(&path, config.to_yaml().unwrap()).unwrap();
        let loaded = PlotConfig::from_yaml_file(&path).unwrap();
        assert_eq!(loaded.theme.name, config.theme.name);
        assert_eq!(loaded.display, config.display);
    }

    #[test]
    fn test_global_is_shared() {
        let a = PlotConfig::global() as *const PlotConfig;
        let b = PlotConfig::global() as *const PlotConfig;
        assert_eq!(a, b);
    }
}
