//! Inline HTML display of compiled scenes.

use base64::{engine::general_purpose::STANDARD, Engine};
use tracing::debug;

use crate::error::{Error, Result};
use crate::grammar::backend::Scene;
use crate::grammar::theme::{DisplayConfig, DisplayFormat};
use crate::render::rasterize;

use super::{PngEncoder, SvgEncoder};

/// Renders a scene as an HTML fragment according to [`DisplayConfig`].
///
/// PNG output is rasterized at twice the figure size when `hidpi` is set
/// and shown at `size * scaling` CSS pixels either way.
#[derive(Debug, Clone)]
pub struct HtmlExporter {
    config: DisplayConfig,
}

impl HtmlExporter {
    /// Exporter for the given display options.
    #[must_use]
    pub fn new(config: &DisplayConfig) -> Self {
        Self { config: config.clone() }
    }

    /// Render `scene` to an HTML fragment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Value`] for a non-positive scaling and propagates
    /// rasterization or encoding failures.
    pub fn render(&self, scene: &Scene) -> Result<String> {
        let scaling = self.config.scaling;
        if !(scaling.is_finite() && scaling > 0.0) {
            return Err(Error::value(format!("Display scaling must be positive, not {scaling}")));
        }
        let width = f64::from(scene.size.0) * scaling;
        let height = f64::from(scene.size.1) * scaling;
        let html = match self.config.format {
            DisplayFormat::Png => {
                let density = if self.config.hidpi { 2.0 } else { 1.0 };
                let png = PngEncoder::to_bytes(&rasterize(scene, density)?)?;
                format!(
                    r#"<img width="{}" height="{}" src="data:image/png;base64,{}">"#,
                    width.round(),
                    height.round(),
                    STANDARD.encode(png)
                )
            }
            DisplayFormat::Svg => {
                let svg = SvgEncoder::from_scene(scene).render();
                format!(r#"<div style="width:{}px;height:{}px">{}</div>"#, width.round(), height.round(), svg.trim_end())
            }
        };
        debug!(format = ?self.config.format, bytes = html.len(), "rendered html");
        Ok(html)
    }
}
