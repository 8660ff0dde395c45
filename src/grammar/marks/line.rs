//! Line marks: connected paths and collections of segments.

use indexmap::IndexMap;

use super::{
    coordinate, feature_setters, legend_keys, oriented, ranges_by_position, Features, Mappable, Mark,
    MarkContext, Rc, Source, Split, SplitGenerator,
};
use crate::error::{Error, Result};
use crate::grammar::backend::{Artist, LegendGlyph, LineArtist, RenderBackend};
use crate::grammar::data::{DataFrame, DataValue};
use crate::grammar::orient::Orient;

// ============================================================================
// Connected paths
// ============================================================================

fn path_features() -> Features {
    Features::default()
        .grouped("color", Mappable::val("C0"))
        .grouped("alpha", Mappable::val(1.0))
        .grouped("linewidth", Mappable::Rc(Rc::LinesLinewidth))
        .grouped("linestyle", Mappable::Rc(Rc::LinesLinestyle))
        .grouped("marker", Mappable::Rc(Rc::LinesMarker))
        .grouped("pointsize", Mappable::Rc(Rc::LinesMarkersize))
        .grouped("fillcolor", Mappable::Depend("color"))
        .grouped("edgecolor", Mappable::Depend("color"))
        .grouped("edgewidth", Mappable::Rc(Rc::LinesMarkeredgewidth))
}

/// Line style of one group, resolved from its key levels.
fn path_style(features: &Features, keys: &IndexMap<String, DataValue>, ctx: &MarkContext<'_>) -> Result<LineArtist> {
    let source = Source::Keys(keys);
    Ok(LineArtist {
        points: Vec::new(),
        color: features.resolve_color(source, "", ctx)?.color(0),
        linewidth: features.resolve(source, "linewidth", ctx)?.f64(0),
        linestyle: features.resolve(source, "linestyle", ctx)?.dash(0),
        marker: features.resolve(source, "marker", ctx)?.marker(0),
        markersize: features.resolve(source, "pointsize", ctx)?.f64(0),
        markerfacecolor: features.resolve_color(source, "fill", ctx)?.color(0),
        markeredgecolor: features.resolve_color(source, "edge", ctx)?.color(0),
        markeredgewidth: features.resolve(source, "edgewidth", ctx)?.f64(0),
    })
}

fn xy(data: &DataFrame) -> Result<Vec<(f64, f64)>> {
    Ok(coordinate(data, "x")?.into_iter().zip(coordinate(data, "y")?).collect())
}

fn plot_path(
    features: &Features,
    sort: bool,
    splits: &SplitGenerator<'_>,
    ctx: &MarkContext<'_>,
    backend: &mut dyn RenderBackend,
) -> Result<()> {
    for Split { keys, data, surface } in splits.splits(!sort)? {
        let data = if sort { data.sort_by_column(ctx.orient.var()) } else { data };
        let mut line = path_style(features, &keys, ctx)?;
        line.points = xy(&data)?;
        backend.draw(surface, ctx.layer, Artist::Line(line))?;
    }
    Ok(())
}

fn legend_path(features: &Features, variables: &[String], value: &DataValue, ctx: &MarkContext<'_>) -> Result<Option<LegendGlyph>> {
    let keys = legend_keys(variables, value);
    Ok(Some(LegendGlyph::Line(path_style(features, &keys, ctx)?)))
}

/// A mark connecting data points in the order they appear.
#[derive(Debug, Clone)]
pub struct Path {
    features: Features,
}

impl Default for Path {
    fn default() -> Self {
        Self { features: path_features() }
    }
}

impl Path {
    /// Path with default features.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    feature_setters!(color, alpha, linewidth, linestyle, marker, pointsize, fillcolor, edgecolor, edgewidth);
}

impl Mark for Path {
    fn features(&self) -> &Features {
        &self.features
    }

    fn keep_na(&self) -> bool {
        true
    }

    fn plot(&self, splits: &SplitGenerator<'_>, ctx: &MarkContext<'_>, backend: &mut dyn RenderBackend) -> Result<()> {
        plot_path(&self.features, false, splits, ctx, backend)
    }

    fn legend_artist(&self, variables: &[String], value: &DataValue, ctx: &MarkContext<'_>) -> Result<Option<LegendGlyph>> {
        legend_path(&self.features, variables, value, ctx)
    }
}

/// A mark connecting data points with sorting along the orientation axis.
#[derive(Debug, Clone)]
pub struct Line {
    features: Features,
}

impl Default for Line {
    fn default() -> Self {
        Self { features: path_features() }
    }
}

impl Line {
    /// Line with default features.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    feature_setters!(color, alpha, linewidth, linestyle, marker, pointsize, fillcolor, edgecolor, edgewidth);
}

impl Mark for Line {
    fn features(&self) -> &Features {
        &self.features
    }

    fn plot(&self, splits: &SplitGenerator<'_>, ctx: &MarkContext<'_>, backend: &mut dyn RenderBackend) -> Result<()> {
        plot_path(&self.features, true, splits, ctx, backend)
    }

    fn legend_artist(&self, variables: &[String], value: &DataValue, ctx: &MarkContext<'_>) -> Result<Option<LegendGlyph>> {
        legend_path(&self.features, variables, value, ctx)
    }
}

// ============================================================================
// Segment collections
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segments {
    Unsorted,
    Sorted,
    Range,
    Dash,
}

fn segment_features() -> Features {
    Features::default()
        .grouped("color", Mappable::val("C0"))
        .grouped("alpha", Mappable::val(1.0))
        .grouped("linewidth", Mappable::Rc(Rc::LinesLinewidth))
        .grouped("linestyle", Mappable::Rc(Rc::LinesLinestyle))
}

fn setup_segments(
    features: &Features,
    kind: Segments,
    data: &DataFrame,
    ctx: &MarkContext<'_>,
) -> Result<Vec<Vec<(f64, f64)>>> {
    let orient = ctx.orient;
    let val = orient.other();
    match kind {
        Segments::Unsorted => Ok(vec![xy(data)?]),
        Segments::Sorted => Ok(vec![xy(&data.sort_by_column(orient.var()))?]),
        Segments::Range => {
            let pos = coordinate(data, orient.var())?;
            let (min, max) = (format!("{val}min"), format!("{val}max"));
            match (data.numeric(&min), data.numeric(&max)) {
                (None, None) => {
                    let values = coordinate(data, val)?;
                    Ok(ranges_by_position(&pos, &values)
                        .into_iter()
                        .map(|(p, lo, hi)| vec![oriented(orient, p, lo), oriented(orient, p, hi)])
                        .collect())
                }
                (Some(lo), Some(hi)) => {
                    let mut rows: Vec<usize> = (0..pos.len()).collect();
                    rows.sort_by(|&a, &b| pos[a].total_cmp(&pos[b]));
                    let mut segments: IndexMap<u64, Vec<(f64, f64)>> = IndexMap::new();
                    for &i in &rows {
                        segments.entry(pos[i].to_bits()).or_default().push(oriented(orient, pos[i], lo[i]));
                    }
                    for &i in &rows {
                        segments.entry(pos[i].to_bits()).or_default().push(oriented(orient, pos[i], hi[i]));
                    }
                    Ok(segments.into_values().collect())
                }
                _ => Err(Error::value(format!("Range needs both `{min}` and `{max}`, or neither"))),
            }
        }
        Segments::Dash => {
            let points = xy(data)?;
            let width = features.resolve(Source::Frame(data), "width", ctx)?;
            Ok(points
                .into_iter()
                .enumerate()
                .map(|(i, (x, y))| {
                    let half = width.f64(i) / 2.0;
                    match orient {
                        Orient::X => vec![(x - half, y), (x + half, y)],
                        Orient::Y => vec![(x, y - half), (x, y + half)],
                    }
                })
                .collect())
        }
    }
}

fn plot_segments(
    features: &Features,
    kind: Segments,
    splits: &SplitGenerator<'_>,
    ctx: &MarkContext<'_>,
    backend: &mut dyn RenderBackend,
) -> Result<()> {
    let keep_na = kind != Segments::Sorted;
    let mut collections: IndexMap<usize, Vec<LineArtist>> = IndexMap::new();
    for Split { keys, data, surface } in splits.splits(keep_na)? {
        let source = Source::Keys(&keys);
        let color = features.resolve_color(source, "", ctx)?.color(0);
        let linewidth = features.resolve(source, "linewidth", ctx)?.f64(0);
        let linestyle = features.resolve(source, "linestyle", ctx)?.dash(0);
        let lines = collections.entry(surface).or_default();
        for segment in setup_segments(features, kind, &data, ctx)? {
            lines.push(LineArtist::plain(segment, color, linewidth, linestyle.clone()));
        }
    }
    for (surface, lines) in collections {
        backend.draw(surface, ctx.layer, Artist::Lines(lines))?;
    }
    Ok(())
}

fn legend_segment(features: &Features, variables: &[String], value: &DataValue, ctx: &MarkContext<'_>) -> Result<Option<LegendGlyph>> {
    let keys = legend_keys(variables, value);
    let source = Source::Keys(&keys);
    Ok(Some(LegendGlyph::Line(LineArtist::plain(
        Vec::new(),
        features.resolve_color(source, "", ctx)?.color(0),
        features.resolve(source, "linewidth", ctx)?.f64(0),
        features.resolve(source, "linestyle", ctx)?.dash(0),
    ))))
}

macro_rules! segment_mark {
    ($(#[$doc:meta])* $name:ident, $kind:expr, $features:expr, [$($setter:ident),*]) => {
        $(#[$doc])*
        #[derive(Debug, Clone)]
        pub struct $name {
            features: Features,
        }

        impl Default for $name {
            fn default() -> Self {
                Self { features: $features }
            }
        }

        impl $name {
            #[doc = concat!(stringify!($name), " with default features.")]
            #[must_use]
            pub fn new() -> Self {
                Self::default()
            }

            feature_setters!($($setter),*);
        }

        impl Mark for $name {
            fn features(&self) -> &Features {
                &self.features
            }

            fn keep_na(&self) -> bool {
                $kind != Segments::Sorted
            }

            fn plot(&self, splits: &SplitGenerator<'_>, ctx: &MarkContext<'_>, backend: &mut dyn RenderBackend) -> Result<()> {
                plot_segments(&self.features, $kind, splits, ctx, backend)
            }

            fn legend_artist(&self, variables: &[String], value: &DataValue, ctx: &MarkContext<'_>) -> Result<Option<LegendGlyph>> {
                legend_segment(&self.features, variables, value, ctx)
            }
        }
    };
}

segment_mark!(
    /// A faster but less-flexible mark for drawing many paths, in data order.
    Paths,
    Segments::Unsorted,
    segment_features(),
    [color, alpha, linewidth, linestyle]
);

segment_mark!(
    /// A faster but less-flexible mark for drawing many lines, sorted along
    /// the orientation axis.
    Lines,
    Segments::Sorted,
    segment_features(),
    [color, alpha, linewidth, linestyle]
);

segment_mark!(
    /// An oriented line marking a range of values at each position: between
    /// the `min` and `max` variables of the value axis when present, else
    /// between the extreme values at each position.
    Range,
    Segments::Range,
    segment_features(),
    [color, alpha, linewidth, linestyle]
);

segment_mark!(
    /// A line mark drawn as an oriented segment for each datapoint.
    Dash,
    Segments::Dash,
    segment_features().ungrouped("width", Mappable::val(0.8)),
    [color, alpha, linewidth, linestyle, width]
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::backend::{FigureSpec, Scene};
    use crate::grammar::facet::{FacetSpec, PairSpec};
    use crate::grammar::properties::Marker;
    use crate::grammar::scales::ScaleMap;
    use crate::grammar::subplots::{Share, Subplots};
    use crate::grammar::theme::Theme;

    fn draw(mark: &dyn Mark, data: &DataFrame, orient: Orient) -> Vec<Artist> {
        let theme = Theme::default();
        let scales = ScaleMap::new();
        let subplots = Subplots::new(&FacetSpec::new(), &IndexMap::new(), &PairSpec::new(), &IndexMap::new()).unwrap();
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
        let mut grouping = mark.grouping_props();
        grouping.extend(["col", "row", "group"]);
        let gen = SplitGenerator::new(data, subplots.iter().collect(), &grouping, &scales);
        let ctx = MarkContext { scales: &scales, theme: &theme, orient, layer: 0 };
        mark.plot(&gen, &ctx, &mut scene).unwrap();
        scene.surfaces.remove(0).items.into_iter().map(|i| i.artist).collect()
    }

    fn frame() -> DataFrame {
        DataFrame::new()
            .column("x", vec![3.0, 1.0, 2.0, 1.0])
            .unwrap()
            .column("y", vec![1.0, 2.0, 3.0, 5.0])
            .unwrap()
            .column("group", vec!["a", "a", "a", "b"])
            .unwrap()
    }

    #[test]
    fn test_line_sorts_and_path_does_not() {
        let artists = draw(&Line::new(), &frame(), Orient::X);
        assert_eq!(artists.len(), 2);
        let Artist::Line(line) = &artists[0] else { panic!("expected a line") };
        assert_eq!(line.points, vec![(1.0, 2.0), (2.0, 3.0), (3.0, 1.0)]);
        assert_eq!(line.marker, Marker::None);
        assert_eq!(line.linewidth, 1.5);

        let artists = draw(&Path::new(), &frame(), Orient::X);
        let Artist::Line(line) = &artists[0] else { panic!("expected a line") };
        assert_eq!(line.points[0], (3.0, 1.0));
    }

    #[test]
    fn test_path_keeps_gaps() {
        let data = DataFrame::new()
            .column("x", vec![1.0, 2.0, 3.0])
            .unwrap()
            .column("y", vec![1.0, f64::NAN, 3.0])
            .unwrap();
        let artists = draw(&Path::new(), &data, Orient::X);
        let Artist::Line(line) = &artists[0] else { panic!("expected a line") };
        assert_eq!(line.points.len(), 3);
        assert!(line.points[1].0.is_nan());
    }

    #[test]
    fn test_lines_collect_per_surface() {
        let artists = draw(&Lines::new(), &frame(), Orient::X);
        assert_eq!(artists.len(), 1);
        let Artist::Lines(lines) = &artists[0] else { panic!("expected lines") };
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn test_range_aggregates_extremes() {
        let artists = draw(&Range::new(), &frame(), Orient::X);
        let Artist::Lines(lines) = &artists[0] else { panic!("expected lines") };
        let segments: Vec<_> = lines.iter().map(|l| l.points.clone()).collect();
        assert_eq!(
            segments,
            vec![
                vec![(1.0, 2.0), (1.0, 2.0)],
                vec![(2.0, 3.0), (2.0, 3.0)],
                vec![(3.0, 1.0), (3.0, 1.0)],
                vec![(1.0, 5.0), (1.0, 5.0)],
            ]
        );
    }

    #[test]
    fn test_range_uses_min_max_columns() {
        let data = DataFrame::new()
            .column("x", vec![0.0, 1.0])
            .unwrap()
            .column("ymin", vec![1.0, 2.0])
            .unwrap()
            .column("ymax", vec![3.0, 4.0])
            .unwrap()
            .column("y", vec![2.0, 3.0])
            .unwrap();
        let artists = draw(&Range::new(), &data, Orient::X);
        let Artist::Lines(lines) = &artists[0] else { panic!("expected lines") };
        assert_eq!(lines[1].points, vec![(1.0, 2.0), (1.0, 4.0)]);
    }

    #[test]
    fn test_dash_spans_width() {
        let data = DataFrame::new()
            .column("x", vec![1.0])
            .unwrap()
            .column("y", vec![2.0])
            .unwrap()
            .column("width", vec![0.5])
            .unwrap();
        let artists = draw(&Dash::new(), &data, Orient::X);
        let Artist::Lines(lines) = &artists[0] else { panic!("expected lines") };
        assert_eq!(lines[0].points, vec![(0.75, 2.0), (1.25, 2.0)]);

        let artists = draw(&Dash::new(), &data.clone(), Orient::Y);
        let Artist::Lines(lines) = &artists[0] else { panic!("expected lines") };
        assert_eq!(lines[0].points, vec![(1.0, 1.75), (1.0, 2.25)]);
    }
}
