//! Rendering backend contract and the recording [`Scene`].
//!
//! Marks resolve their visual properties into artists (points, lines,
//! patches, text) in data coordinates and hand them to a [`RenderBackend`].
//! Compilation always draws into a [`Scene`] first; the finalized scene can
//! then be replayed onto any other backend or encoded by the output module.

use std::ops::{Deref, DerefMut};

use super::orient::Orient;
use super::properties::{Dash, Marker};
use super::scales::{AxisTicks, Transform};
use super::subplots::Share;
use super::theme::Theme;
use crate::color::Color;
use crate::error::{Error, Result};

// ============================================================================
// Artists
// ============================================================================

/// A marker glyph at a data position.
#[derive(Debug, Clone, PartialEq)]
pub struct PointArtist {
    /// Position.
    pub x: f64,
    /// Position.
    pub y: f64,
    /// Glyph.
    pub marker: Marker,
    /// Glyph diameter in points.
    pub size: f64,
    /// Interior color.
    pub facecolor: Color,
    /// Outline color.
    pub edgecolor: Color,
    /// Outline width in points.
    pub linewidth: f64,
    /// Outline dash pattern.
    pub edgestyle: Dash,
}

/// A polyline, optionally with markers at its vertices.
#[derive(Debug, Clone, PartialEq)]
pub struct LineArtist {
    /// Vertices; a NaN coordinate breaks the line.
    pub points: Vec<(f64, f64)>,
    /// Line color.
    pub color: Color,
    /// Width in points.
    pub linewidth: f64,
    /// Dash pattern.
    pub linestyle: Dash,
    /// Vertex marker.
    pub marker: Marker,
    /// Marker diameter in points.
    pub markersize: f64,
    /// Marker interior.
    pub markerfacecolor: Color,
    /// Marker outline.
    pub markeredgecolor: Color,
    /// Marker outline width in points.
    pub markeredgewidth: f64,
}

impl LineArtist {
    /// Plain line without markers.
    #[must_use]
    pub fn plain(points: Vec<(f64, f64)>, color: Color, linewidth: f64, linestyle: Dash) -> Self {
        Self {
            points,
            color,
            linewidth,
            linestyle,
            marker: Marker::None,
            markersize: 0.0,
            markerfacecolor: color,
            markeredgecolor: color,
            markeredgewidth: 0.0,
        }
    }
}

/// A closed polygon.
#[derive(Debug, Clone, PartialEq)]
pub struct PatchArtist {
    /// Vertices in data coordinates.
    pub vertices: Vec<(f64, f64)>,
    /// Interior color.
    pub facecolor: Color,
    /// Outline color.
    pub edgecolor: Color,
    /// Outline width in points; NaN until resolved automatically.
    pub edgewidth: f64,
    /// Outline dash pattern.
    pub edgestyle: Dash,
}

impl PatchArtist {
    /// Axis-aligned rectangle.
    #[must_use]
    pub fn rect(x: f64, y: f64, w: f64, h: f64, facecolor: Color, edgecolor: Color) -> Self {
        Self {
            vertices: vec![(x, y), (x + w, y), (x + w, y + h), (x, y + h)],
            facecolor,
            edgecolor,
            edgewidth: 0.0,
            edgestyle: Dash::solid(),
        }
    }
}

/// A text label anchored at a data position.
#[derive(Debug, Clone, PartialEq)]
pub struct TextArtist {
    /// Anchor.
    pub x: f64,
    /// Anchor.
    pub y: f64,
    /// Content.
    pub text: String,
    /// Text color.
    pub color: Color,
    /// Size in points.
    pub fontsize: f64,
    /// `left`, `center` or `right`.
    pub halign: String,
    /// `top`, `center`, `center_baseline`, `baseline` or `bottom`.
    pub valign: String,
    /// Distance from the anchor in points, away from the aligned side.
    pub offset: f64,
}

/// One drawing call.
#[derive(Debug, Clone, PartialEq)]
pub enum Artist {
    /// A collection of markers.
    Points(Vec<PointArtist>),
    /// A single line.
    Line(LineArtist),
    /// A collection of line segments.
    Lines(Vec<LineArtist>),
    /// A collection of polygons.
    Patches {
        /// The polygons.
        patches: Vec<PatchArtist>,
        /// Orientation of bar-like patches: their value axis does not pad
        /// past zero when autoscaling.
        sticky: Option<Orient>,
        /// Whether edge widths are derived from the drawn size of the
        /// patches once axis limits are known.
        auto_edgewidth: bool,
    },
    /// Text labels.
    Texts(Vec<TextArtist>),
}

/// Bounding box of data coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    /// Lower x.
    pub x0: f64,
    /// Upper x.
    pub x1: f64,
    /// Lower y.
    pub y0: f64,
    /// Upper y.
    pub y1: f64,
}

impl Extent {
    fn empty() -> Self {
        Self {
            x0: f64::INFINITY,
            x1: f64::NEG_INFINITY,
            y0: f64::INFINITY,
            y1: f64::NEG_INFINITY,
        }
    }

    fn add(&mut self, x: f64, y: f64) {
        if x.is_finite() && y.is_finite() {
            self.x0 = self.x0.min(x);
            self.x1 = self.x1.max(x);
            self.y0 = self.y0.min(y);
            self.y1 = self.y1.max(y);
        }
    }

    /// Smallest box covering both.
    #[must_use]
    pub fn union(self, other: Extent) -> Extent {
        Extent {
            x0: self.x0.min(other.x0),
            x1: self.x1.max(other.x1),
            y0: self.y0.min(other.y0),
            y1: self.y1.max(other.y1),
        }
    }

    /// Range along an axis.
    #[must_use]
    pub fn range(&self, axis: Orient) -> (f64, f64) {
        match axis {
            Orient::X => (self.x0, self.x1),
            Orient::Y => (self.y0, self.y1),
        }
    }

    fn is_valid(&self) -> bool {
        self.x0 <= self.x1 && self.y0 <= self.y1
    }
}

impl Artist {
    /// Data extent covered by this artist, if any finite point exists.
    #[must_use]
    pub fn extent(&self) -> Option<Extent> {
        let mut e = Extent::empty();
        match self {
            Artist::Points(points) => points.iter().for_each(|p| e.add(p.x, p.y)),
            Artist::Line(line) => line.points.iter().for_each(|&(x, y)| e.add(x, y)),
            Artist::Lines(lines) => {
                lines.iter().flat_map(|l| &l.points).for_each(|&(x, y)| e.add(x, y));
            }
            Artist::Patches { patches, .. } => {
                patches.iter().flat_map(|p| &p.vertices).for_each(|&(x, y)| e.add(x, y));
            }
            Artist::Texts(texts) => texts.iter().for_each(|t| e.add(t.x, t.y)),
        }
        e.is_valid().then_some(e)
    }
}

/// Representative glyph of one legend entry.
#[derive(Debug, Clone, PartialEq)]
pub enum LegendGlyph {
    /// Marker glyph.
    Point(PointArtist),
    /// Line sample.
    Line(LineArtist),
    /// Filled swatch.
    Patch(PatchArtist),
}

/// One legend row: glyphs from every layer showing the level, and a label.
#[derive(Debug, Clone, PartialEq)]
pub struct LegendEntry {
    /// Label text.
    pub label: String,
    /// Glyphs drawn on top of one another.
    pub glyphs: Vec<LegendGlyph>,
}

/// A titled legend section, one per mapped variable identity.
#[derive(Debug, Clone, PartialEq)]
pub struct LegendSection {
    /// Section title.
    pub title: String,
    /// Rows.
    pub entries: Vec<LegendEntry>,
}

/// Placement of the legend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LegendLoc {
    /// Outside the grid, to the right, vertically centered.
    #[default]
    CenterRight,
}

// ============================================================================
// Backend contract
// ============================================================================

/// Figure layout handed to [`RenderBackend::create_figure`].
#[derive(Debug, Clone, PartialEq)]
pub struct FigureSpec {
    /// Grid rows.
    pub nrows: usize,
    /// Grid columns.
    pub ncols: usize,
    /// Which grid positions hold a subplot, as `(row, col)` in surface order.
    pub cells: Vec<(usize, usize)>,
    /// x axis sharing.
    pub sharex: Share,
    /// y axis sharing.
    pub sharey: Share,
    /// Figure size in pixels.
    pub size: (u32, u32),
}

/// Axis decoration for one subplot.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisSpec {
    /// Axis label.
    pub label: Option<String>,
    /// Whether the label is drawn.
    pub show_label: bool,
    /// View limits; `lo > hi` inverts the axis.
    pub limits: (f64, f64),
    /// Data-to-axis transform.
    pub transform: Transform,
    /// Tick positions and labels.
    pub ticks: AxisTicks,
    /// Whether tick labels are drawn.
    pub show_ticklabels: bool,
    /// Whether grid lines are drawn.
    pub grid: bool,
}

/// Anything that can draw a compiled plot.
pub trait RenderBackend {
    /// Start a figure with a grid of drawing surfaces.
    ///
    /// # Errors
    ///
    /// Returns an error when the backend cannot create the figure.
    fn create_figure(&mut self, spec: &FigureSpec) -> Result<()>;

    /// Draw an artist on a surface.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Rendering`] for an unknown surface.
    fn draw(&mut self, surface: usize, layer: usize, artist: Artist) -> Result<()>;

    /// Decorate one axis of a surface.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Rendering`] for an unknown surface.
    fn set_axis(&mut self, surface: usize, axis: Orient, spec: AxisSpec) -> Result<()>;

    /// Set (or clear) a surface title.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Rendering`] for an unknown surface.
    fn set_title(&mut self, surface: usize, title: Option<String>) -> Result<()>;

    /// Add a legend to the figure.
    ///
    /// # Errors
    ///
    /// Returns an error when the backend cannot place the legend.
    fn add_legend(&mut self, sections: Vec<LegendSection>, loc: LegendLoc) -> Result<()>;

    /// Apply style parameters until the matching [`RenderBackend::pop_theme`].
    fn push_theme(&mut self, theme: &Theme);

    /// Restore the style parameters active before the last push.
    fn pop_theme(&mut self);
}

/// Scoped theme application: pushes a theme on creation and pops it on drop,
/// so a plot's style never outlives its own rendering.
pub struct ThemeScope<'a, B: RenderBackend + ?Sized> {
    backend: &'a mut B,
}

impl<'a, B: RenderBackend + ?Sized> ThemeScope<'a, B> {
    /// Apply `theme` to `backend` for the lifetime of the guard.
    pub fn new(backend: &'a mut B, theme: &Theme) -> Self {
        backend.push_theme(theme);
        Self { backend }
    }
}

impl<B: RenderBackend + ?Sized> Deref for ThemeScope<'_, B> {
    type Target = B;

    fn deref(&self) -> &B {
        self.backend
    }
}

impl<B: RenderBackend + ?Sized> DerefMut for ThemeScope<'_, B> {
    fn deref_mut(&mut self) -> &mut B {
        self.backend
    }
}

impl<B: RenderBackend + ?Sized> Drop for ThemeScope<'_, B> {
    fn drop(&mut self) {
        self.backend.pop_theme();
    }
}

// ============================================================================
// Scene
// ============================================================================

/// An artist tagged with the layer that drew it.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneItem {
    /// Declaration index of the layer.
    pub layer: usize,
    /// The artist.
    pub artist: Artist,
}

/// One recorded subplot.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Surface {
    /// Grid row.
    pub row: usize,
    /// Grid column.
    pub col: usize,
    /// Title.
    pub title: Option<String>,
    /// x axis decoration.
    pub xaxis: Option<AxisSpec>,
    /// y axis decoration.
    pub yaxis: Option<AxisSpec>,
    /// Artists in drawing order.
    pub items: Vec<SceneItem>,
}

impl Surface {
    /// Data extent of everything drawn on this surface.
    #[must_use]
    pub fn extent(&self) -> Option<Extent> {
        self.items.iter().filter_map(|i| i.artist.extent()).reduce(Extent::union)
    }

    /// Axis decoration.
    #[must_use]
    pub fn axis(&self, axis: Orient) -> Option<&AxisSpec> {
        match axis {
            Orient::X => self.xaxis.as_ref(),
            Orient::Y => self.yaxis.as_ref(),
        }
    }
}

/// Recording backend: keeps every call so the figure can be finalized,
/// inspected, encoded or replayed.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    /// Grid shape as `(rows, cols)`.
    pub shape: (usize, usize),
    /// Axis sharing.
    pub share: (Share, Share),
    /// Figure size in pixels.
    pub size: (u32, u32),
    /// Subplots in surface order.
    pub surfaces: Vec<Surface>,
    /// Legend sections.
    pub legend: Vec<LegendSection>,
    /// Theme active while recording.
    pub theme: Theme,
    themes: Vec<Theme>,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new(Theme::default())
    }
}

impl Scene {
    /// Empty scene styled with `theme`.
    #[must_use]
    pub fn new(theme: Theme) -> Self {
        Self {
            shape: (0, 0),
            share: (Share::All, Share::All),
            size: (theme.width, theme.height),
            surfaces: Vec::new(),
            legend: Vec::new(),
            theme,
            themes: Vec::new(),
        }
    }

    fn surface_mut(&mut self, surface: usize) -> Result<&mut Surface> {
        let n = self.surfaces.len();
        self.surfaces
            .get_mut(surface)
            .ok_or_else(|| Error::Rendering(format!("surface {surface} out of range ({n} surfaces)")))
    }

    /// Total number of artists.
    #[must_use]
    pub fn artist_count(&self) -> usize {
        self.surfaces.iter().map(|s| s.items.len()).sum()
    }

    /// Redraw this scene on another backend.
    ///
    /// # Errors
    ///
    /// Propagates backend errors.
    pub fn replay(&self, backend: &mut dyn RenderBackend) -> Result<()> {
        let mut scope = ThemeScope::new(backend, &self.theme);
        scope.create_figure(&FigureSpec {
            nrows: self.shape.0,
            ncols: self.shape.1,
            cells: self.surfaces.iter().map(|s| (s.row, s.col)).collect(),
            sharex: self.share.0,
            sharey: self.share.1,
            size: self.size,
        })?;
        for (i, surface) in self.surfaces.iter().enumerate() {
            for item in &surface.items {
                scope.draw(i, item.layer, item.artist.clone())?;
            }
            if let Some(x) = &surface.xaxis {
                scope.set_axis(i, Orient::X, x.clone())?;
            }
            if let Some(y) = &surface.yaxis {
                scope.set_axis(i, Orient::Y, y.clone())?;
            }
            scope.set_title(i, surface.title.clone())?;
        }
        if !self.legend.is_empty() {
            scope.add_legend(self.legend.clone(), LegendLoc::CenterRight)?;
        }
        Ok(())
    }
}

impl RenderBackend for Scene {
    fn create_figure(&mut self, spec: &FigureSpec) -> Result<()> {
        if spec.size.0 == 0 || spec.size.1 == 0 {
            return Err(Error::InvalidDimensions { width: spec.size.0, height: spec.size.1 });
        }
        self.shape = (spec.nrows, spec.ncols);
        self.share = (spec.sharex, spec.sharey);
        self.size = spec.size;
        self.surfaces = spec
            .cells
            .iter()
            .map(|&(row, col)| Surface { row, col, ..Surface::default() })
            .collect();
        self.legend.clear();
        Ok(())
    }

    fn draw(&mut self, surface: usize, layer: usize, artist: Artist) -> Result<()> {
        self.surface_mut(surface)?.items.push(SceneItem { layer, artist });
        Ok(())
    }

    fn set_axis(&mut self, surface: usize, axis: Orient, spec: AxisSpec) -> Result<()> {
        let s = self.surface_mut(surface)?;
        match axis {
            Orient::X => s.xaxis = Some(spec),
            Orient::Y => s.yaxis = Some(spec),
        }
        Ok(())
    }

    fn set_title(&mut self, surface: usize, title: Option<String>) -> Result<()> {
        self.surface_mut(surface)?.title = title;
        Ok(())
    }

    fn add_legend(&mut self, sections: Vec<LegendSection>, _: LegendLoc) -> Result<()> {
        self.legend = sections;
        Ok(())
    }

    fn push_theme(&mut self, theme: &Theme) {
        let previous = std::mem::replace(&mut self.theme, theme.clone());
        self.themes.push(previous);
    }

    fn pop_theme(&mut self) {
        if let Some(previous) = self.themes.pop() {
            self.theme = previous;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn figure(n: usize) -> FigureSpec {
        FigureSpec {
            nrows: 1,
            ncols: n,
            cells: (0..n).map(|c| (0, c)).collect(),
            sharex: Share::All,
            sharey: Share::All,
            size: (400, 300),
        }
    }

    fn point(x: f64, y: f64) -> PointArtist {
        PointArtist {
            x,
            y,
            marker: Marker::Circle,
            size: 6.0,
            facecolor: Color::rgb(0.0, 0.0, 1.0),
            edgecolor: Color::rgb(0.0, 0.0, 1.0),
            linewidth: 0.5,
            edgestyle: Dash::solid(),
        }
    }

    #[test]
    fn test_scene_records_calls() {
        let mut scene = Scene::default();
        scene.create_figure(&figure(2)).unwrap();
        scene.draw(1, 0, Artist::Points(vec![point(1.0, 2.0)])).unwrap();
        scene.set_title(1, Some("b".into())).unwrap();
        assert_eq!(scene.surfaces.len(), 2);
        assert_eq!(scene.surfaces[1].items.len(), 1);
        assert_eq!(scene.surfaces[1].title.as_deref(), Some("b"));
        assert!(matches!(scene.draw(5, 0, Artist::Texts(Vec::new())), Err(Error::Rendering(_))));
    }

    #[test]
    fn test_zero_size_figure_rejected() {
        let mut scene = Scene::default();
        let mut spec = figure(1);
        spec.size = (0, 10);
        assert!(matches!(scene.create_figure(&spec), Err(Error::InvalidDimensions { .. })));
    }

    #[test]
    fn test_extent_skips_nan() {
        let artist = Artist::Line(LineArtist::plain(
            vec![(0.0, 1.0), (f64::NAN, 5.0), (2.0, -1.0)],
            Color::rgb(0.0, 0.0, 0.0),
            1.0,
            Dash::solid(),
        ));
        let e = artist.extent().unwrap();
        assert_eq!((e.x0, e.x1, e.y0, e.y1), (0.0, 2.0, -1.0, 1.0));
        assert!(Artist::Points(Vec::new()).extent().is_none());
    }

    #[test]
    fn test_theme_scope_restores() {
        let mut scene = Scene::new(Theme::white());
        {
            let scope = ThemeScope::new(&mut scene, &Theme::darkgrid());
            assert_eq!(scope.theme.name, "darkgrid");
        }
        assert_eq!(scene.theme.name, "white");
    }

    #[test]
    fn test_replay_copies_scene() {
        let mut scene = Scene::default();
        scene.create_figure(&figure(1)).unwrap();
        scene.draw(0, 0, Artist::Points(vec![point(0.0, 0.0)])).unwrap();
        let mut copy = Scene::new(Theme::white());
        scene.replay(&mut copy).unwrap();
        assert_eq!(copy.surfaces, scene.surfaces);
        assert_eq!(copy.theme.name, "white");
    }
}
