//! Bar marks.
//!
//! Bars span `width` along the orientation axis (centered on the position,
//! in transformed space so bars stay symmetric on log axes) and run from
//! `baseline` to the value. Bars with a zero or missing value are skipped.

use indexmap::IndexMap;

use super::{
    coordinate, feature_setters, legend_keys, times_fill, Features, Mappable, Mark, MarkContext, Rc,
    Source, SplitGenerator,
};
use crate::error::Result;
use crate::grammar::backend::{Artist, LegendGlyph, PatchArtist, RenderBackend};
use crate::grammar::data::{DataFrame, DataValue};
use crate::grammar::orient::Orient;
use crate::grammar::scales::Transform;

fn make_patches(features: &Features, data: &DataFrame, ctx: &MarkContext<'_>) -> Result<Vec<PatchArtist>> {
    let orient = ctx.orient;
    let transform = ctx.scales.get(orient.var()).map_or(Transform::Identity, |s| s.transform());
    let source = Source::Frame(data);

    let pos = coordinate(data, orient.var())?;
    let other = coordinate(data, orient.other())?;
    let width = features.resolve(source, "width", ctx)?;
    let baseline = features.resolve(source, "baseline", ctx)?;
    let face = features.resolve_color(source, "", ctx)?;
    let edge = features.resolve_color(source, "edge", ctx)?;
    let fill = features.resolve(source, "fill", ctx)?;
    let edgewidth = features.resolve(source, "edgewidth", ctx)?;
    let edgestyle = features.resolve(source, "edgestyle", ctx)?;

    let mut patches = Vec::with_capacity(pos.len());
    for (i, (&p, &o)) in pos.iter().zip(&other).enumerate() {
        let base = baseline.f64(i);
        let val = o - base;
        if val == 0.0 || val.is_nan() {
            continue;
        }
        let center = transform.forward(p);
        let half = width.f64(i) / 2.0;
        let lo = transform.inverse(center - half);
        let span = transform.inverse(center + half) - lo;
        let (x, y, w, h) = match orient {
            Orient::X => (lo, base, span, val),
            Orient::Y => (base, lo, val, span),
        };
        let mut patch = PatchArtist::rect(x, y, w, h, times_fill(face.color(i), fill.flag(i)), edge.color(i));
        patch.edgewidth = edgewidth.f64(i);
        patch.edgestyle = edgestyle.dash(i);
        patches.push(patch);
    }
    Ok(patches)
}

fn legend_patch(features: &Features, variables: &[String], value: &DataValue, ctx: &MarkContext<'_>) -> Result<Option<LegendGlyph>> {
    let keys = legend_keys(variables, value);
    let source = Source::Keys(&keys);
    let face = features.resolve_color(source, "", ctx)?.color(0);
    let fill = features.resolve(source, "fill", ctx)?.flag(0);
    let mut patch = PatchArtist::rect(0.0, 0.0, 1.0, 1.0, times_fill(face, fill), features.resolve_color(source, "edge", ctx)?.color(0));
    let edgewidth = features.resolve(source, "edgewidth", ctx)?.f64(0);
    patch.edgewidth = if edgewidth.is_nan() { ctx.theme.patch_linewidth } else { edgewidth };
    patch.edgestyle = features.resolve(source, "edgestyle", ctx)?.dash(0);
    Ok(Some(LegendGlyph::Patch(patch)))
}

/// A bar mark drawn between baseline and data values.
///
/// Each group is drawn as its own collection with a visible outline.
#[derive(Debug, Clone)]
pub struct Bar {
    features: Features,
}

impl Default for Bar {
    fn default() -> Self {
        let features = Features::default()
            .ungrouped("color", Mappable::val("C0"))
            .ungrouped("alpha", Mappable::val(0.7))
            .ungrouped("fill", Mappable::val(true))
            .ungrouped("edgecolor", Mappable::Depend("color"))
            .ungrouped("edgealpha", Mappable::val(1.0))
            .ungrouped("edgewidth", Mappable::Rc(Rc::PatchLinewidth))
            .ungrouped("edgestyle", Mappable::val("-"))
            .ungrouped("width", Mappable::val(0.8))
            .ungrouped("baseline", Mappable::val(0.0));
        Self { features }
    }
}

impl Bar {
    /// Bar with default features.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    feature_setters!(color, alpha, fill, edgecolor, edgealpha, edgewidth, edgestyle, width, baseline);
}

impl Mark for Bar {
    fn features(&self) -> &Features {
        &self.features
    }

    fn plot(&self, splits: &SplitGenerator<'_>, ctx: &MarkContext<'_>, backend: &mut dyn RenderBackend) -> Result<()> {
        for split in splits.splits(false)? {
            let patches = make_patches(&self.features, &split.data, ctx)?;
            let artist = Artist::Patches { patches, sticky: Some(ctx.orient), auto_edgewidth: false };
            backend.draw(split.surface, ctx.layer, artist)?;
        }
        Ok(())
    }

    fn legend_artist(&self, variables: &[String], value: &DataValue, ctx: &MarkContext<'_>) -> Result<Option<LegendGlyph>> {
        legend_patch(&self.features, variables, value, ctx)
    }
}

/// A faster bar mark with defaults more suitable for histograms.
///
/// All bars of a subplot form one collection. Unless set or mapped, the
/// edge width is derived from the narrowest drawn bar once axis limits are
/// known, so that dense histograms are not swamped by their outlines.
#[derive(Debug, Clone)]
pub struct Bars {
    features: Features,
}

impl Default for Bars {
    fn default() -> Self {
        let features = Features::default()
            .ungrouped("color", Mappable::val("C0"))
            .ungrouped("alpha", Mappable::val(0.7))
            .ungrouped("fill", Mappable::val(true))
            .ungrouped("edgecolor", Mappable::Rc(Rc::PatchEdgecolor))
            .ungrouped("edgealpha", Mappable::val(1.0))
            .ungrouped("edgewidth", Mappable::Auto)
            .ungrouped("edgestyle", Mappable::val("-"))
            .ungrouped("width", Mappable::val(1.0))
            .ungrouped("baseline", Mappable::val(0.0));
        Self { features }
    }
}

impl Bars {
    /// Bars with default features.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    feature_setters!(color, alpha, fill, edgecolor, edgealpha, edgewidth, edgestyle, width, baseline);
}

impl Mark for Bars {
    fn features(&self) -> &Features {
        &self.features
    }

    fn plot(&self, splits: &SplitGenerator<'_>, ctx: &MarkContext<'_>, backend: &mut dyn RenderBackend) -> Result<()> {
        let mut collections: IndexMap<usize, Vec<PatchArtist>> = IndexMap::new();
        for split in splits.splits(false)? {
            let patches = make_patches(&self.features, &split.data, ctx)?;
            collections.entry(split.surface).or_default().extend(patches);
        }
        let auto_edgewidth = !ctx.scales.contains_key("edgewidth") && !self.features.is_set("edgewidth");
        for (surface, patches) in collections {
            let artist = Artist::Patches { patches, sticky: Some(ctx.orient), auto_edgewidth };
            backend.draw(surface, ctx.layer, artist)?;
        }
        Ok(())
    }

    fn legend_artist(&self, variables: &[String], value: &DataValue, ctx: &MarkContext<'_>) -> Result<Option<LegendGlyph>> {
        legend_patch(&self.features, variables, value, ctx)
    }
}
