//! Text labels.

use super::{coordinate, feature_setters, Features, Mappable, Mark, MarkContext, Rc, Source, Split, SplitGenerator};
use crate::error::Result;
use crate::grammar::backend::{Artist, LegendGlyph, RenderBackend, TextArtist};
use crate::grammar::data::DataValue;

/// A textual mark to annotate or represent data values.
///
/// Labels come from the `text` variable, one per row. `offset` moves them
/// away from the anchor on the side named by the alignment.
#[derive(Debug, Clone)]
pub struct Text {
    features: Features,
}

impl Default for Text {
    fn default() -> Self {
        let features = Features::default()
            .grouped("text", Mappable::val(""))
            .grouped("color", Mappable::val("k"))
            .grouped("alpha", Mappable::val(1.0))
            .grouped("fontsize", Mappable::Rc(Rc::FontSize))
            .grouped("halign", Mappable::val("center"))
            .grouped("valign", Mappable::val("center_baseline"))
            .grouped("offset", Mappable::val(4.0));
        Self { features }
    }
}

impl Text {
    /// Text with default features.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    feature_setters!(text, color, alpha, fontsize, halign, valign, offset);
}

impl Mark for Text {
    fn features(&self) -> &Features {
        &self.features
    }

    fn plot(&self, splits: &SplitGenerator<'_>, ctx: &MarkContext<'_>, backend: &mut dyn RenderBackend) -> Result<()> {
        for Split { keys, data, surface } in splits.splits(false)? {
            let source = Source::Keys(&keys);
            let color = self.features.resolve_color(source, "", ctx)?.color(0);
            let fontsize = self.features.resolve(source, "fontsize", ctx)?.f64(0);
            let halign = self.features.resolve(source, "halign", ctx)?.text(0);
            let valign = self.features.resolve(source, "valign", ctx)?.text(0);
            let offset = self.features.resolve(source, "offset", ctx)?.f64(0);
            let fallback = self.features.resolve(source, "text", ctx)?.text(0);
            let x = coordinate(&data, "x")?;
            let y = coordinate(&data, "y")?;
            let labels = data.get("text");

            let texts = x
                .into_iter()
                .zip(y)
                .enumerate()
                .map(|(i, (x, y))| TextArtist {
                    x,
                    y,
                    text: labels
                        .and_then(|col| col.get(i))
                        .map_or_else(|| fallback.clone(), ToString::to_string),
                    color,
                    fontsize,
                    halign: halign.clone(),
                    valign: valign.clone(),
                    offset,
                })
                .collect();
            backend.draw(surface, ctx.layer, Artist::Texts(texts))?;
        }
        Ok(())
    }

    fn legend_artist(&self, _: &[String], _: &DataValue, _: &MarkContext<'_>) -> Result<Option<LegendGlyph>> {
        Ok(None)
    }
}
