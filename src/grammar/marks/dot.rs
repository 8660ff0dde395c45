//! Point marks.

use super::{
    coordinate, feature_setters, legend_keys, times_fill, Features, Mappable, Mark, MarkContext, Rc,
    Source, SplitGenerator,
};
use crate::error::Result;
use crate::grammar::backend::{Artist, LegendGlyph, PointArtist, RenderBackend};
use crate::grammar::data::DataValue;
use crate::grammar::properties::Dash;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Style {
    Dot,
    Dots,
}

fn resolve_points(
    features: &Features,
    style: Style,
    source: Source<'_>,
    xy: &[(f64, f64)],
    ctx: &MarkContext<'_>,
) -> Result<Vec<PointArtist>> {
    let marker = features.resolve(source, "marker", ctx)?;
    let pointsize = features.resolve(source, "pointsize", ctx)?;
    let stroke = features.resolve(source, "stroke", ctx)?;
    let fill = features.resolve(source, "fill", ctx)?;
    let main = features.resolve_color(source, "", ctx)?;

    let points = match style {
        Style::Dot => {
            let edge = features.resolve_color(source, "edge", ctx)?;
            let edgewidth = features.resolve(source, "edgewidth", ctx)?;
            let edgestyle = features.resolve(source, "edgestyle", ctx)?;
            xy.iter()
                .enumerate()
                .map(|(i, &(x, y))| {
                    let marker = marker.marker(i);
                    let filled = fill.flag(i) && marker.is_filled();
                    PointArtist {
                        x,
                        y,
                        marker,
                        size: pointsize.f64(i),
                        facecolor: times_fill(main.color(i), filled),
                        edgecolor: if filled { edge.color(i) } else { main.color(i) },
                        linewidth: if filled { edgewidth.f64(i) } else { stroke.f64(i) },
                        edgestyle: edgestyle.dash(i),
                    }
                })
                .collect()
        }
        Style::Dots => {
            let face = features.resolve_color(source, "fill", ctx)?;
            xy.iter()
                .enumerate()
                .map(|(i, &(x, y))| {
                    let marker = marker.marker(i);
                    PointArtist {
                        x,
                        y,
                        marker,
                        size: pointsize.f64(i),
                        facecolor: times_fill(face.color(i), fill.flag(i) && marker.is_filled()),
                        edgecolor: main.color(i),
                        linewidth: stroke.f64(i),
                        edgestyle: Dash::solid(),
                    }
                })
                .collect()
        }
    };
    Ok(points)
}

fn plot_points(
    features: &Features,
    style: Style,
    splits: &SplitGenerator<'_>,
    ctx: &MarkContext<'_>,
    backend: &mut dyn RenderBackend,
) -> Result<()> {
    for split in splits.splits(false)? {
        let xy: Vec<(f64, f64)> =
            coordinate(&split.data, "x")?.into_iter().zip(coordinate(&split.data, "y")?).collect();
        let points = resolve_points(features, style, Source::Frame(&split.data), &xy, ctx)?;
        backend.draw(split.surface, ctx.layer, Artist::Points(points))?;
    }
    Ok(())
}

fn legend_point(
    features: &Features,
    style: Style,
    variables: &[String],
    value: &DataValue,
    ctx: &MarkContext<'_>,
) -> Result<Option<LegendGlyph>> {
    let keys = legend_keys(variables, value);
    let mut points = resolve_points(features, style, Source::Keys(&keys), &[(0.0, 0.0)], ctx)?;
    Ok(points.pop().map(LegendGlyph::Point))
}

/// A mark suitable for dot plots or less-dense scatterplots.
///
/// Filled markers take their face from `color` and their outline from
/// `edgecolor`; unfilled markers are stroked in `color`.
#[derive(Debug, Clone)]
pub struct Dot {
    features: Features,
}

impl Default for Dot {
    fn default() -> Self {
        let features = Features::default()
            .ungrouped("marker", Mappable::val("o"))
            .ungrouped("pointsize", Mappable::val(6.0))
            .ungrouped("stroke", Mappable::val(0.75))
            .ungrouped("color", Mappable::val("C0"))
            .ungrouped("alpha", Mappable::val(1.0))
            .ungrouped("fill", Mappable::val(true))
            .ungrouped("edgecolor", Mappable::Depend("color"))
            .ungrouped("edgealpha", Mappable::Depend("alpha"))
            .ungrouped("edgewidth", Mappable::val(0.5))
            .ungrouped("edgestyle", Mappable::val("-"));
        Self { features }
    }
}

impl Dot {
    /// Dot with default features.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    feature_setters!(marker, pointsize, stroke, color, alpha, fill, edgecolor, edgealpha, edgewidth, edgestyle);
}

impl Mark for Dot {
    fn features(&self) -> &Features {
        &self.features
    }

    fn plot(&self, splits: &SplitGenerator<'_>, ctx: &MarkContext<'_>, backend: &mut dyn RenderBackend) -> Result<()> {
        plot_points(&self.features, Style::Dot, splits, ctx, backend)
    }

    fn legend_artist(
        &self,
        variables: &[String],
        value: &DataValue,
        ctx: &MarkContext<'_>,
    ) -> Result<Option<LegendGlyph>> {
        legend_point(&self.features, Style::Dot, variables, value, ctx)
    }
}

/// A dot mark defined by strokes, to better handle overplotting.
///
/// Outlines use `color`; faces use a faint `fillcolor`.
#[derive(Debug, Clone)]
pub struct Dots {
    features: Features,
}

impl Default for Dots {
    fn default() -> Self {
        let features = Features::default()
            .ungrouped("marker", Mappable::Rc(Rc::ScatterMarker))
            .ungrouped("pointsize", Mappable::val(4.0))
            .ungrouped("stroke", Mappable::val(0.75))
            .ungrouped("color", Mappable::val("C0"))
            .ungrouped("alpha", Mappable::val(1.0))
            .ungrouped("fill", Mappable::val(true))
            .ungrouped("fillcolor", Mappable::Depend("color"))
            .ungrouped("fillalpha", Mappable::val(0.2));
        Self { features }
    }
}

impl Dots {
    /// Dots with default features.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    feature_setters!(marker, pointsize, stroke, color, alpha, fill, fillcolor, fillalpha);
}

impl Mark for Dots {
    fn features(&self) -> &Features {
        &self.features
    }

    fn plot(&self, splits: &SplitGenerator<'_>, ctx: &MarkContext<'_>, backend: &mut dyn RenderBackend) -> Result<()> {
        plot_points(&self.features, Style::Dots, splits, ctx, backend)
    }

    fn legend_artist(
        &self,
        variables: &[String],
        value: &DataValue,
        ctx: &MarkContext<'_>,
    ) -> Result<Option<LegendGlyph>> {
        legend_point(&self.features, Style::Dots, variables, value, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;
    use crate::grammar::backend::Scene;
    use crate::grammar::data::DataFrame;
    use crate::grammar::orient::Orient;
    use crate::grammar::properties::Marker;
    use crate::grammar::scales::ScaleMap;
    use crate::grammar::theme::Theme;
    use approx::assert_relative_eq;

    fn ctx<'a>(scales: &'a ScaleMap, theme: &'a Theme) -> MarkContext<'a> {
        MarkContext { scales, theme, orient: Orient::X, layer: 0 }
    }

    fn glyph(mark: &dyn Mark) -> PointArtist {
        let theme = Theme::default();
        let scales = ScaleMap::new();
        match mark.legend_artist(&[], &DataValue::Null, &ctx(&scales, &theme)).unwrap() {
            Some(LegendGlyph::Point(p)) => p,
            other => panic!("expected a point glyph, got {other:?}"),
        }
    }

    #[test]
    fn test_dot_filled_defaults() {
        let p = glyph(&Dot::new());
        let c0 = Theme::default().color("C0").unwrap();
        assert_eq!(p.marker, Marker::Circle);
        assert_eq!(p.size, 6.0);
        assert_eq!(p.facecolor, c0.with_alpha(1.0));
        assert_eq!(p.edgecolor, c0.with_alpha(1.0));
        assert_eq!(p.linewidth, 0.5);
    }

    #[test]
    fn test_dot_unfilled_marker_uses_stroke() {
        let p = glyph(&Dot::new().marker("x").edgecolor("red"));
        assert_eq!(p.linewidth, 0.75);
        assert_eq!(p.facecolor.opacity(), 0.0);
        // the edge takes the main color when there is no face
        assert_eq!(p.edgecolor, Theme::default().color("C0").unwrap().with_alpha(1.0));
    }

    #[test]
    fn test_dot_fill_false() {
        let p = glyph(&Dot::new().fill(false).color(Color::rgb(1.0, 0.0, 0.0)));
        assert_eq!(p.facecolor.opacity(), 0.0);
        assert_eq!(p.edgecolor, Color::rgba(1.0, 0.0, 0.0, 1.0));
    }

    #[test]
    fn test_dots_faint_face() {
        let p = glyph(&Dots::new());
        assert_relative_eq!(p.facecolor.opacity(), 0.2);
        assert_eq!(p.edgecolor.opacity(), 1.0);
        assert_eq!(p.size, 4.0);
        assert!(p.edgestyle.is_solid());
    }

    #[test]
    fn test_dot_plot_draws_one_collection_per_split() {
        use crate::grammar::backend::{FigureSpec, RenderBackend};
        use crate::grammar::facet::{FacetSpec, PairSpec};
        use crate::grammar::subplots::{Share, Subplots};
        use indexmap::IndexMap;

        let theme = Theme::default();
        let scales = ScaleMap::new();
        let subplots = Subplots::new(&FacetSpec::new(), &IndexMap::new(), &PairSpec::new(), &IndexMap::new()).unwrap();
        let data = DataFrame::new()
            .column("x", vec![1.0, 2.0, 3.0])
            .unwrap()
            .column("y", vec![4.0, 5.0, 6.0])
            .unwrap()
            .column("pointsize", vec![1.0, 2.0, 3.0])
            .unwrap();
        let mut scene = Scene::default();
        scene
            .create_figure(&FigureSpec {
                nrows: 1,
                ncols: 1,
                cells: vec![(0, 0)],
                sharex: Share::All,
                sharey: Share::All,
                size: (100, 100),
            })
            .unwrap();
        let mark = Dot::new();
        let gen = SplitGenerator::new(&data, subplots.iter().collect(), &mark.grouping_props(), &scales);
        mark.plot(&gen, &ctx(&scales, &theme), &mut scene).unwrap();
        let items = &scene.surfaces[0].items;
        assert_eq!(items.len(), 1);
        let Artist::Points(points) = &items[0].artist else { panic!("expected points") };
        assert_eq!(points.iter().map(|p| p.size).collect::<Vec<_>>(), vec![1.0, 2.0, 3.0]);
        assert_eq!((points[2].x, points[2].y), (3.0, 6.0));
    }
}
