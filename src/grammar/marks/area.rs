//! Filled area marks.

use indexmap::IndexMap;

use super::{
    coordinate, feature_setters, legend_keys, oriented, ranges_by_position, times_fill, Features,
    Mappable, Mark, MarkContext, Rc, Source, Split, SplitGenerator,
};
use crate::error::{Error, Result};
use crate::grammar::backend::{Artist, LegendGlyph, PatchArtist, RenderBackend};
use crate::grammar::data::{DataFrame, DataValue};
use crate::grammar::orient::Orient;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Span {
    /// From the baseline to the value.
    Baseline,
    /// Between the min and max of the value axis.
    Interval,
}

/// `(position, min, max)` rows of one group, sorted by position.
fn spans(span: Span, features: &Features, data: &DataFrame, ctx: &MarkContext<'_>) -> Result<Vec<(f64, f64, f64)>> {
    let orient = ctx.orient;
    let dv = orient.other();
    let pos = coordinate(data, orient.var())?;
    let (lo, hi) = match span {
        Span::Baseline => {
            let baseline = features.resolve(Source::Frame(data), "baseline", ctx)?;
            let lo = (0..pos.len()).map(|i| baseline.f64(i)).collect();
            (lo, coordinate(data, dv)?)
        }
        Span::Interval => {
            let (min, max) = (format!("{dv}min"), format!("{dv}max"));
            match (data.numeric(&min), data.numeric(&max)) {
                (Some(lo), Some(hi)) => (lo, hi),
                (None, None) => return Ok(ranges_by_position(&pos, &coordinate(data, dv)?)),
                _ => return Err(Error::value(format!("Band needs both `{min}` and `{max}`, or neither"))),
            }
        }
    };
    let mut rows: Vec<(f64, f64, f64)> =
        pos.into_iter().zip(lo).zip(hi).map(|((p, l), h)| (p, l, h)).collect();
    rows.sort_by(|a, b| a.0.total_cmp(&b.0));
    Ok(rows)
}

/// Polygon tracing the lower edge forward and the upper edge back.
fn vertices(orient: Orient, rows: &[(f64, f64, f64)]) -> Vec<(f64, f64)> {
    rows.iter()
        .map(|&(p, lo, _)| oriented(orient, p, lo))
        .chain(rows.iter().rev().map(|&(p, _, hi)| oriented(orient, p, hi)))
        .collect()
}

fn area_patch(features: &Features, keys: &IndexMap<String, DataValue>, vertices: Vec<(f64, f64)>, ctx: &MarkContext<'_>) -> Result<PatchArtist> {
    let source = Source::Keys(keys);
    let fill = features.resolve(source, "fill", ctx)?.flag(0);
    Ok(PatchArtist {
        vertices,
        facecolor: times_fill(features.resolve_color(source, "", ctx)?.color(0), fill),
        edgecolor: features.resolve_color(source, "edge", ctx)?.color(0),
        edgewidth: features.resolve(source, "edgewidth", ctx)?.f64(0),
        edgestyle: features.resolve(source, "edgestyle", ctx)?.dash(0),
    })
}

fn plot_area(
    features: &Features,
    span: Span,
    splits: &SplitGenerator<'_>,
    ctx: &MarkContext<'_>,
    backend: &mut dyn RenderBackend,
) -> Result<()> {
    for Split { keys, data, surface } in splits.splits(false)? {
        let rows = spans(span, features, &data, ctx)?;
        let patch = area_patch(features, &keys, vertices(ctx.orient, &rows), ctx)?;
        // Only a baseline fill pins the value axis to its edge.
        let sticky = (span == Span::Baseline).then_some(ctx.orient);
        let artist = Artist::Patches { patches: vec![patch], sticky, auto_edgewidth: false };
        backend.draw(surface, ctx.layer, artist)?;
    }
    Ok(())
}

fn legend_area(features: &Features, variables: &[String], value: &DataValue, ctx: &MarkContext<'_>) -> Result<Option<LegendGlyph>> {
    let keys = legend_keys(variables, value);
    let square = vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)];
    Ok(Some(LegendGlyph::Patch(area_patch(features, &keys, square, ctx)?)))
}

fn area_features(edgewidth: Mappable) -> Features {
    Features::default()
        .grouped("color", Mappable::val("C0"))
        .grouped("alpha", Mappable::val(0.2))
        .grouped("fill", Mappable::val(true))
        .grouped("edgecolor", Mappable::Depend("color"))
        .grouped("edgealpha", Mappable::val(1.0))
        .grouped("edgewidth", edgewidth)
        .grouped("edgestyle", Mappable::val("-"))
}

/// A fill mark drawn from a baseline to data values.
#[derive(Debug, Clone)]
pub struct Area {
    features: Features,
}

impl Default for Area {
    fn default() -> Self {
        let features = area_features(Mappable::Rc(Rc::PatchLinewidth)).ungrouped("baseline", Mappable::val(0.0));
        Self { features }
    }
}

impl Area {
    /// Area with default features.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    feature_setters!(color, alpha, fill, edgecolor, edgealpha, edgewidth, edgestyle, baseline);
}

impl Mark for Area {
    fn features(&self) -> &Features {
        &self.features
    }

    fn plot(&self, splits: &SplitGenerator<'_>, ctx: &MarkContext<'_>, backend: &mut dyn RenderBackend) -> Result<()> {
        plot_area(&self.features, Span::Baseline, splits, ctx, backend)
    }

    fn legend_artist(&self, variables: &[String], value: &DataValue, ctx: &MarkContext<'_>) -> Result<Option<LegendGlyph>> {
        legend_area(&self.features, variables, value, ctx)
    }
}

/// A fill mark representing an interval between values, such as an error
/// band. Without `min`/`max` variables it spans the extremes at each
/// position.
#[derive(Debug, Clone)]
pub struct Band {
    features: Features,
}

impl Default for Band {
    fn default() -> Self {
        Self { features: area_features(Mappable::val(0.0)) }
    }
}

impl Band {
    /// Band with default features.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    feature_setters!(color, alpha, fill, edgecolor, edgealpha, edgewidth, edgestyle);
}

impl Mark for Band {
    fn features(&self) -> &Features {
        &self.features
    }

    fn plot(&self, splits: &SplitGenerator<'_>, ctx: &MarkContext<'_>, backend: &mut dyn RenderBackend) -> Result<()> {
        plot_area(&self.features, Span::Interval, splits, ctx, backend)
    }

    fn legend_artist(&self, variables: &[String], value: &DataValue, ctx: &MarkContext<'_>) -> Result<Option<LegendGlyph>> {
        legend_area(&self.features, variables, value, ctx)
    }
}
