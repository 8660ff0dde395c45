//! Compilation: from a declarative [`Plot`] to a finalized [`Scene`].
//!
//! Compilation runs a fixed sequence of passes:
//!
//! 1. bind the plot, facet, pair and layer variables;
//! 2. lay out the subplot grid, its titles and axis labels;
//! 3. fit coordinate scales and convert coordinates to numbers per subplot;
//! 4. run each layer's stat, then fit scales for the variables stats added;
//! 5. per layer and pairing, size bars, apply moves, undo coordinate
//!    transforms and draw the mark, collecting legend contents;
//! 6. add the legend, set axis limits and ticks, size automatic bar edges.
//!
//! Any failure that depends on data is raised here, wrapped in
//! [`Error::Compile`] with the pass and variable that failed.

use std::iter;
use std::path::Path;

use indexmap::IndexMap;
use itertools::Itertools;
use tracing::{debug, warn};

use super::backend::{Artist, AxisSpec, FigureSpec, LegendLoc, LegendSection, RenderBackend, Scene, Surface};
use super::bind::PlotData;
use super::data::{Column, DataFrame, DataValue};
use super::facet::Dim;
use super::groupby::GroupBy;
use super::legend::LegendBuilder;
use super::marks::{Mark, MarkContext, Source, SplitGenerator};
use super::orient::Orient;
use super::plot::Plot;
use super::properties::{split_coordinate, Property, PROPERTY_NAMES};
use super::rules::categorical_order;
use super::scales::{Scale, ScaleMap, ScaleSpec, Transform};
use super::subplots::{Share, Subplot, Subplots};
use super::theme::{DisplayConfig, PlotConfig, Theme};
use crate::error::{Error, Result};
use crate::framebuffer::Framebuffer;
use crate::output::{HtmlExporter, PngEncoder, SvgEncoder, TerminalEncoder};
use crate::render::layout::{Layout, Projection};
use crate::render::rasterize;

/// Grouping variables that never name a property.
const DEFAULT_GROUPING: [&str; 3] = ["col", "row", "group"];

// ============================================================================
// Compiled plot
// ============================================================================

/// A compiled plot: the subplot grid, fitted scales and the recorded scene.
#[derive(Debug, Clone)]
pub struct CompiledPlot {
    scene: Scene,
    subplots: Subplots,
    scales: ScaleMap,
    display: DisplayConfig,
}

impl CompiledPlot {
    /// The finalized scene.
    #[must_use]
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// The subplot grid.
    #[must_use]
    pub fn subplots(&self) -> &Subplots {
        &self.subplots
    }

    /// Every fitted scale, keyed by variable.
    #[must_use]
    pub fn scales(&self) -> &ScaleMap {
        &self.scales
    }

    /// Fitted scale of one variable.
    #[must_use]
    pub fn scale(&self, var: &str) -> Option<&Scale> {
        self.scales.get(var)
    }

    /// Legend sections.
    #[must_use]
    pub fn legend(&self) -> &[LegendSection] {
        &self.scene.legend
    }

    /// Theme the plot was compiled with.
    #[must_use]
    pub fn theme(&self) -> &Theme {
        &self.scene.theme
    }

    /// Draw the compiled plot on another backend.
    ///
    /// # Errors
    ///
    /// Propagates backend errors.
    pub fn replay(&self, backend: &mut dyn RenderBackend) -> Result<()> {
        self.scene.replay(backend)
    }

    /// Vector rendering as an SVG document.
    #[must_use]
    pub fn to_svg(&self) -> String {
        SvgEncoder::from_scene(&self.scene).render()
    }

    /// Write the SVG rendering to a file.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be written.
    pub fn save_svg(&self, path: impl AsRef<Path>) -> Result<()> {
        SvgEncoder::from_scene(&self.scene).write_to_file(path)
    }

    /// Raster rendering at the figure size.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDimensions`] for a zero-sized figure.
    pub fn to_framebuffer(&self) -> Result<Framebuffer> {
        rasterize(&self.scene, 1.0)
    }

    /// Write the raster rendering as a PNG file.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering, encoding or writing fails.
    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<()> {
        PngEncoder::write_to_file(&self.to_framebuffer()?, path)
    }

    /// Self-contained HTML fragment, embedding a PNG or inline SVG according
    /// to the display configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if rasterizing or encoding fails.
    pub fn to_html(&self) -> Result<String> {
        HtmlExporter::new(&self.display).render(&self.scene)
    }

    /// Save to a file, choosing the format from its extension (`png`,
    /// `svg` or `html`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Value`] for an unsupported extension, or an error if
    /// rendering or writing fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let ext = path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("png") => self.save_png(path),
            Some("svg") => self.save_svg(path),
            Some("html" | "htm") => Ok(std::fs::write(path, self.to_html()?)?),
            _ => Err(Error::value(format!("Cannot infer an output format from {}", path.display()))),
        }
    }

    /// Print a raster rendering to the terminal.
    ///
    /// # Errors
    ///
    /// Returns an error if rasterizing fails.
    pub fn show(&self) -> Result<()> {
        let fb = self.to_framebuffer()?;
        TerminalEncoder::new().print(&fb)?;
        Ok(())
    }
}

impl Plot {
    /// Compile with the process-wide configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Binding`] for unresolvable variables and
    /// [`Error::Compile`] for failures in any data-dependent pass.
    pub fn compile(&self) -> Result<CompiledPlot> {
        self.compile_with(PlotConfig::global())
    }

    /// Compile with an explicit configuration. The plot's own theme
    /// overrides are layered on top of `config.theme`.
    ///
    /// # Errors
    ///
    /// Same as [`Plot::compile`].
    #[tracing::instrument(skip_all, fields(layers = self.layers.len()))]
    pub fn compile_with(&self, config: &PlotConfig) -> Result<CompiledPlot> {
        let mut theme = self.theme.apply(&config.theme)?;
        if let Some((width, height)) = self.size {
            theme.width = width;
            theme.height = height;
        }
        let (scene, subplots, scales) = Compiler::run(self, theme)?;
        Ok(CompiledPlot { scene, subplots, scales, display: config.display.clone() })
    }

    /// Compile, then draw the result on `backend`.
    ///
    /// # Errors
    ///
    /// Same as [`Plot::compile`], plus backend errors.
    pub fn compile_on<B: RenderBackend>(&self, backend: &mut B) -> Result<CompiledPlot> {
        let compiled = self.compile()?;
        compiled.replay(backend)?;
        Ok(compiled)
    }
}

// ============================================================================
// Compiler
// ============================================================================

/// Label and visibility of one axis of one subplot.
#[derive(Debug, Clone)]
struct Decoration {
    label: Option<String>,
    show_label: bool,
    show_ticklabels: bool,
}

/// Data range drawn along one axis of a surface.
#[derive(Debug, Clone, Copy)]
struct Span {
    lo: f64,
    hi: f64,
    sticky: bool,
}

impl Span {
    const EMPTY: Span = Span { lo: f64::INFINITY, hi: f64::NEG_INFINITY, sticky: false };

    fn merge(self, other: Span) -> Span {
        Span { lo: self.lo.min(other.lo), hi: self.hi.max(other.hi), sticky: self.sticky || other.sticky }
    }
}

fn axis_index(axis: Orient) -> usize {
    match axis {
        Orient::X => 0,
        Orient::Y => 1,
    }
}

fn orient_of(axis: &str) -> Orient {
    if axis == "y" {
        Orient::Y
    } else {
        Orient::X
    }
}

struct Compiler<'p> {
    plot: &'p Plot,
    theme: Theme,
    scene: Scene,
    common: PlotData,
    layers: Vec<PlotData>,
    declared: Vec<String>,
    subplots: Subplots,
    decorations: IndexMap<(usize, Orient), Decoration>,
    scales: ScaleMap,
    view_scales: IndexMap<(usize, Orient), Scale>,
}

impl<'p> Compiler<'p> {
    fn run(plot: &'p Plot, theme: Theme) -> Result<(Scene, Subplots, ScaleMap)> {
        let (common, layers) = extract_data(plot)?;
        let declared = declared_variables(plot, &common);
        let subplots = layout_subplots(plot, &common)?;
        debug!(subplots = subplots.len(), variables = declared.len(), "bound plot data");

        let mut compiler = Compiler {
            plot,
            scene: Scene::new(theme.clone()),
            theme,
            common,
            layers,
            declared,
            subplots,
            decorations: IndexMap::new(),
            scales: ScaleMap::new(),
            view_scales: IndexMap::new(),
        };
        compiler.setup_figure()?;
        compiler.setup_scales(true)?;
        compiler.compute_stats()?;
        compiler.setup_scales(false)?;
        compiler.warn_unused_scales();

        let mut legend = LegendBuilder::new();
        compiler.plot_layers(&mut legend)?;
        let sections = legend.build();
        if !sections.is_empty() {
            compiler.scene.add_legend(sections, LegendLoc::CenterRight)?;
        }
        compiler.finalize()?;
        debug!(artists = compiler.scene.artist_count(), "compiled plot");
        Ok((compiler.scene, compiler.subplots, compiler.scales))
    }

    // ------------------------------------------------------------------
    // Figure
    // ------------------------------------------------------------------

    fn setup_figure(&mut self) -> Result<()> {
        let plot = self.plot;
        let (nrows, ncols) = self.subplots.shape();
        self.scene.create_figure(&FigureSpec {
            nrows,
            ncols,
            cells: self.subplots.iter().map(|s| (s.grid_row, s.grid_col)).collect(),
            sharex: self.subplots.share("x"),
            sharey: self.subplots.share("y"),
            size: (self.theme.width, self.theme.height),
        })?;

        let pair_wrapped = plot.pair.wrap_count().is_some();
        let facet_wrapped = plot.facet.wrap_count().is_some();
        for view in self.subplots.iter() {
            for (axis, on_edge) in [("x", view.bottom), ("y", view.left)] {
                let key = view.coord(axis);
                let auto = iter::once(&self.common)
                    .chain(&self.layers)
                    .find_map(|data| data.names.get(key).cloned().flatten());
                let label = plot.resolve_label(key, auto.as_deref());
                let show_label =
                    on_edge || !plot.pair.is_cross() || (plot.pair.pairs(axis) && pair_wrapped);
                let shared = matches!(
                    (self.subplots.share(axis), axis),
                    (Share::All, _) | (Share::Col, "x") | (Share::Row, "y")
                );
                self.decorations.insert(
                    (view.surface, orient_of(axis)),
                    Decoration {
                        label: (!label.is_empty()).then_some(label),
                        show_label,
                        show_ticklabels: show_label || !shared,
                    },
                );
            }

            let mut parts = Vec::new();
            for dim in [Dim::Col, Dim::Row] {
                if let Some(level) = view.level(dim) {
                    let mut part = plot.resolve_label("title", Some(&level.to_string()));
                    if plot.labels.contains_key(dim.var()) {
                        let name = self.common.names.get(dim.var()).cloned().flatten();
                        part = format!("{} {part}", plot.resolve_label(dim.var(), name.as_deref()));
                    }
                    parts.push(part);
                }
            }
            let (has_col, has_row) = (view.col.is_some(), view.row.is_some());
            let show_title = (has_col && has_row)
                || ((has_col || has_row) && facet_wrapped)
                || (has_col && view.top)
                || has_row;
            let title = if !parts.is_empty() {
                show_title.then(|| parts.join(" | "))
            } else if !(has_col || has_row) {
                Some(plot.resolve_label("title", None)).filter(|t| !t.is_empty())
            } else {
                None
            };
            self.scene.set_title(view.surface, title)?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Scales
    // ------------------------------------------------------------------

    /// Fit scales for layer variables that have none yet. The first pass
    /// covers coordinates only and converts their data to numbers.
    fn setup_scales(&mut self, first: bool) -> Result<()> {
        let mut variables: Vec<String> = Vec::new();
        for data in &self.layers {
            for frame in iter::once(&data.frame).chain(data.frames.values()) {
                for name in frame.columns() {
                    if !self.scales.contains_key(name) && !variables.iter().any(|v| v == name) {
                        variables.push(name.to_string());
                    }
                }
            }
        }
        if first {
            variables.retain(|v| split_coordinate(v).is_some());
            // Plain coordinates first, so derived ones (`xmin`) reuse their views.
            variables.sort_by_key(|v| split_coordinate(v).is_some_and(|(_, coord)| coord != v));
        }
        debug!(pass = if first { "coordinates" } else { "semantics" }, count = variables.len(), "setting up scales");
        for var in &variables {
            self.setup_scale(var, first)?;
        }
        Ok(())
    }

    fn setup_scale(&mut self, var: &str, first: bool) -> Result<()> {
        let coordinate = split_coordinate(var).map(|(axis, coord)| (axis.to_string(), coord.to_string()));
        let (prop_key, scale_key) = match &coordinate {
            Some((axis, coord)) => (axis.as_str(), coord.as_str()),
            None => (var, var),
        };
        let Some(prop) = Property::lookup(prop_key) else {
            return Ok(());
        };

        let parts: Vec<DataFrame> = iter::once(&self.common.frame)
            .chain(self.layers.iter().flat_map(|d| iter::once(&d.frame).chain(d.frames.values())))
            .filter(|frame| frame.has_column(var))
            .map(|frame| frame.select(&[var, "col", "row"]))
            .collect();
        let var_df = DataFrame::concat(&parts);
        let values = var_df.get(var).cloned().unwrap_or_else(|| Column::new(Vec::<f64>::new()));

        let spec = match self.plot.scales.get(scale_key) {
            Some(arg) => prop.infer_scale(arg, &values).map_err(Error::during("Scale setup", var))?,
            None => prop.default_scale(&values),
        };
        let mut scale = spec.setup(&values, &prop, &self.theme).map_err(Error::during("Scale setup", var))?;
        if !self.declared.iter().any(|v| v == scale_key) {
            // Added by a stat: never drives orientation.
            scale = scale.with_priority(0);
        }
        self.scales.insert(var.to_string(), scale);

        let Some((axis, coord)) = coordinate else {
            return Ok(());
        };
        // Stat outputs derived from an existing coordinate are already numeric.
        if !first && var != coord && self.declared.contains(&coord) {
            return Ok(());
        }
        self.convert_coordinate(var, &axis, &coord, &spec, &prop, &var_df)
    }

    /// Replace coordinate data with numbers, fitting one scale per subplot
    /// from the data its sharing lets it see.
    fn convert_coordinate(
        &mut self,
        var: &str,
        axis: &str,
        coord: &str,
        spec: &ScaleSpec,
        prop: &Property,
        var_df: &DataFrame,
    ) -> Result<()> {
        let share = self.subplots.share(axis);
        let values = var_df.get(var).cloned().unwrap_or_else(|| Column::new(Vec::<f64>::new()));
        let mut converted: Vec<Option<Vec<f64>>> = self
            .layers
            .iter()
            .map(|d| d.frame.get(var).map(|c| vec![f64::NAN; c.len()]))
            .collect();

        let views: Vec<Subplot> = self.subplots.iter().filter(|v| v.coord(axis) == coord).cloned().collect();
        for view in &views {
            let key = (view.surface, orient_of(axis));
            let existing = if var == coord { None } else { self.view_scales.get(&key).cloned() };
            let view_scale = match existing {
                Some(scale) => scale,
                None => {
                    let seeds = values.take(&share_rows(var_df, view, Some(share)));
                    let scale = spec.setup(&seeds, prop, &self.theme).map_err(Error::during("Scale setup", var))?;
                    self.view_scales.insert(key, scale.clone());
                    scale
                }
            };
            for (data, out) in self.layers.iter().zip(converted.iter_mut()) {
                let (Some(col), Some(out)) = (data.frame.get(var), out.as_mut()) else { continue };
                let rows = view_rows(&data.frame, view);
                for (row, v) in rows.iter().zip(view_scale.forward(&col.take(&rows))) {
                    out[*row] = v;
                }
            }
        }

        for (data, out) in self.layers.iter_mut().zip(converted) {
            if let Some(out) = out {
                data.frame.insert(var, out).map_err(Error::during("Scaling operation", var))?;
            }
        }
        Ok(())
    }

    fn warn_unused_scales(&self) {
        for var in self.plot.scales.keys() {
            let used = self.scales.keys().any(|k| {
                k == var || split_coordinate(k).is_some_and(|(_, coord)| coord == var)
            });
            if !used {
                warn!(variable = %var, "ignoring scale for a variable no layer uses");
            }
        }
    }

    // ------------------------------------------------------------------
    // Stats
    // ------------------------------------------------------------------

    fn pairings(&self) -> Vec<(String, String)> {
        let axis_vars = |axis: &str| {
            let structure = self.plot.pair.structure(axis);
            if structure.is_empty() {
                vec![axis.to_string()]
            } else {
                structure
            }
        };
        axis_vars("x").into_iter().cartesian_product(axis_vars("y")).collect()
    }

    fn compute_stats(&mut self) -> Result<()> {
        let grouping: Vec<String> = PROPERTY_NAMES
            .iter()
            .copied()
            .filter(|v| split_coordinate(v).is_none())
            .chain(DEFAULT_GROUPING)
            .unique()
            .map(str::to_string)
            .collect();
        let pairings = self.pairings();
        let paired = !self.plot.pair.is_empty();

        for (layer, data) in self.plot.layers.iter().zip(self.layers.iter_mut()) {
            let Some(stat) = &layer.stat else { continue };
            let source = std::mem::take(&mut data.frame);
            data.frames.clear();

            for (x, y) in &pairings {
                let (df, scales) = pairing_view(&source, &self.scales, x, y);
                let orient = layer.orient.unwrap_or_else(|| layer.mark.infer_orient(&scales));
                let mut grouper: Vec<String> = Vec::with_capacity(grouping.len() + 1);
                if stat.group_by_orient() {
                    grouper.push(orient.var().to_string());
                }
                grouper.extend(grouping.iter().cloned());
                let groupby = GroupBy::new(grouper)?;
                let result = stat
                    .compute(&df, &groupby, orient, &scales)
                    .map_err(Error::during("Stat computation", ""))?;
                if paired {
                    data.frames.insert((x.clone(), y.clone()), result);
                } else {
                    data.frame = result;
                }
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Layers
    // ------------------------------------------------------------------

    fn plot_layers(&mut self, legend: &mut LegendBuilder) -> Result<()> {
        let plot = self.plot;
        let pairings = self.pairings();
        let grouping_props: Vec<&str> =
            PROPERTY_NAMES.iter().copied().filter(|v| split_coordinate(v).is_none()).collect();

        for (index, (layer, data)) in plot.layers.iter().zip(&self.layers).enumerate() {
            let mark = layer.mark.as_ref();
            for (x, y) in &pairings {
                let views: Vec<&Subplot> = self.subplots.iter().filter(|v| v.x == *x && v.y == *y).collect();
                let source = if data.frame.ncol() == 0 && !data.frames.is_empty() {
                    match data.frames.get(&(x.clone(), y.clone())) {
                        Some(frame) => frame,
                        None => continue,
                    }
                } else {
                    &data.frame
                };
                let (mut df, scales) = pairing_view(source, &self.scales, x, y);
                let orient = layer.orient.unwrap_or_else(|| mark.infer_orient(&scales));
                let ctx = MarkContext { scales: &scales, theme: &self.theme, orient, layer: index };

                if df.has_column(orient.var()) {
                    let share = plot.shares.get(orient.var()).copied();
                    add_width(&mut df, mark, &views, share, &ctx)?;
                }
                add_baseline(&mut df, mark, &ctx)?;

                for adjustment in &layer.moves {
                    let mut groupers: Vec<String> = match adjustment.by() {
                        Some(by) => by.to_vec(),
                        None => grouping_props.iter().map(|v| (*v).to_string()).collect(),
                    };
                    groupers.extend(DEFAULT_GROUPING.map(String::from));
                    if adjustment.group_by_orient() {
                        groupers.insert(0, orient.var().to_string());
                    }
                    // Coordinates are numbers by now; their levels sort naturally.
                    let order: IndexMap<String, Option<Vec<DataValue>>> = groupers
                        .into_iter()
                        .map(|var| {
                            let order = match var.as_str() {
                                "x" | "y" => None,
                                _ => scales.get(&var).and_then(|s| s.order()).map(<[DataValue]>::to_vec),
                            };
                            (var, order)
                        })
                        .collect();
                    let groupby = GroupBy::with_order(order)?;
                    df = adjustment
                        .apply(&df, &groupby, orient, &scales)
                        .map_err(Error::during("Position adjustment", ""))?;
                }

                let df = unscale_coords(&df, &scales)?;
                let mut grouping = mark.grouping_props();
                grouping.extend(DEFAULT_GROUPING);
                let splits = SplitGenerator::new(&df, views, &grouping, &scales);
                mark.plot(&splits, &ctx, &mut self.scene).map_err(|err| match err {
                    Error::Compile { .. } => err,
                    other => Error::during("Plotting", "")(other),
                })?;
            }

            if layer.legend {
                let orient = layer.orient.unwrap_or_else(|| mark.infer_orient(&self.scales));
                let ctx = MarkContext { scales: &self.scales, theme: &self.theme, orient, layer: index };
                let title = plot.resolve_label("legend", None);
                legend.add_layer(
                    mark,
                    data,
                    &ctx,
                    layer.label.as_deref(),
                    &title,
                    &|var: &str, name: Option<&str>| plot.resolve_label(var, name),
                )?;
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Finalization
    // ------------------------------------------------------------------

    fn finalize(&mut self) -> Result<()> {
        let layout = Layout::new(&self.scene);
        let spans: Vec<[Span; 2]> = self.scene.surfaces.iter().map(surface_spans).collect();
        let views: Vec<Subplot> = self.subplots.iter().cloned().collect();
        for view in &views {
            for axis in [Orient::X, Orient::Y] {
                let spec = self.axis_spec(view, axis, &spans, &layout)?;
                self.scene.set_axis(view.surface, axis, spec)?;
            }
        }
        self.fit_edgewidths();
        Ok(())
    }

    fn axis_spec(&self, view: &Subplot, axis: Orient, spans: &[[Span; 2]], layout: &Layout) -> Result<AxisSpec> {
        let name = axis.var();
        let key = view.coord(name);
        let scale = match self.view_scales.get(&(view.surface, axis)).or_else(|| self.scales.get(key)) {
            Some(scale) => scale.clone(),
            None => ScaleSpec::continuous().setup(&Column::new(Vec::<f64>::new()), &Property::get(name), &self.theme)?,
        };

        let auto = scale
            .discrete_limits(name)
            .unwrap_or_else(|| self.autoscale(view, axis, spans, scale.transform()));
        let limits = match self.plot.limits.get(key).or_else(|| self.plot.limits.get(name)) {
            Some((lo, hi)) => (
                user_bound(lo, &scale, -0.5).unwrap_or(auto.0),
                user_bound(hi, &scale, 0.5).unwrap_or(auto.1),
            ),
            None => auto,
        };

        let panel = layout.panels.get(view.surface).copied();
        let length = panel.map_or(0.0, |p| if axis == Orient::X { p.width } else { p.height });
        let per_tick = self.theme.font_size * if axis == Orient::X { 3.0 } else { 2.0 };
        let space = ((length / self.theme.dpi / per_tick).floor() as usize).max(2);

        let decoration = self.decorations.get(&(view.surface, axis));
        Ok(AxisSpec {
            label: decoration.and_then(|d| d.label.clone()),
            show_label: decoration.is_some_and(|d| d.show_label),
            limits,
            transform: scale.transform(),
            ticks: scale.axis_ticks(limits.0, limits.1, space),
            show_ticklabels: decoration.is_some_and(|d| d.show_ticklabels),
            grid: self.theme.grid && scale.has_grid(),
        })
    }

    /// View limits covering the data of every subplot sharing this axis,
    /// padded by the theme margins in transformed space. Bar-like patches
    /// keep their value axis from padding past zero.
    fn autoscale(&self, view: &Subplot, axis: Orient, spans: &[[Span; 2]], trans: Transform) -> (f64, f64) {
        let share = self.subplots.share(axis.var());
        let span = self
            .subplots
            .iter()
            .filter(|other| match share {
                Share::All => true,
                Share::None => other.surface == view.surface,
                Share::Row => other.grid_row == view.grid_row,
                Share::Col => other.grid_col == view.grid_col,
            })
            .filter_map(|other| spans.get(other.surface).map(|s| s[axis_index(axis)]))
            .fold(Span::EMPTY, Span::merge);
        if !(span.lo.is_finite() && span.hi.is_finite()) {
            return (0.0, 1.0);
        }

        let (lo, hi) = nonsingular(span.lo, span.hi);
        let (lo_t, hi_t) = (trans.forward(lo), trans.forward(hi));
        let delta = (hi_t - lo_t) * self.theme.margins;
        let delta = if delta.is_finite() { delta } else { 0.0 };
        let (mut padded_lo, mut padded_hi) = (trans.inverse(lo_t - delta), trans.inverse(hi_t + delta));
        if span.sticky {
            if span.lo >= 0.0 && padded_lo < 0.0 {
                padded_lo = 0.0;
            }
            if span.hi <= 0.0 && padded_hi > 0.0 {
                padded_hi = 0.0;
            }
        }
        (padded_lo, padded_hi)
    }

    /// Resolve automatic bar outlines: a tenth of the narrowest drawn bar of
    /// the layer, capped by the theme's patch line width.
    fn fit_edgewidths(&mut self) {
        let layout = Layout::new(&self.scene);
        let dpi = self.theme.dpi;
        let mut narrowest: IndexMap<usize, f64> = IndexMap::new();
        for (surface, panel) in self.scene.surfaces.iter().zip(&layout.panels) {
            let projection = Projection::new(panel, surface);
            for item in &surface.items {
                let Artist::Patches { patches, sticky: Some(orient), auto_edgewidth: true } = &item.artist else {
                    continue;
                };
                for patch in patches {
                    let (lo, hi) = patch
                        .vertices
                        .iter()
                        .map(|&(x, y)| if *orient == Orient::X { x } else { y })
                        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
                    let pixels = (projection.along(*orient, hi) - projection.along(*orient, lo)).abs();
                    if pixels.is_finite() {
                        let entry = narrowest.entry(item.layer).or_insert(f64::INFINITY);
                        *entry = entry.min(pixels / dpi);
                    }
                }
            }
        }

        let cap = self.theme.patch_linewidth;
        for surface in &mut self.scene.surfaces {
            for item in &mut surface.items {
                if let Artist::Patches { patches, auto_edgewidth: true, .. } = &mut item.artist {
                    let width = narrowest.get(&item.layer).map_or(cap, |min| (0.1 * min).min(cap));
                    for patch in patches {
                        patch.edgewidth = width;
                    }
                }
            }
        }
    }
}

// ============================================================================
// Passes as free functions
// ============================================================================

fn extract_data(plot: &Plot) -> Result<(PlotData, Vec<PlotData>)> {
    let mut variables = plot.variables.clone();
    variables.extend(plot.facet.variables());
    variables.extend(plot.pair.variables());

    let wide = variables.is_empty() && plot.layers.iter().all(|l| l.variables.is_empty());
    let common = match (&plot.data, wide) {
        (Some(data), true) => PlotData::wide(data)?,
        _ => PlotData::new(plot.data.as_ref(), &variables)?,
    };
    let layers = plot
        .layers
        .iter()
        .map(|layer| common.join(layer.data.as_ref(), Some(&layer.variables)))
        .collect::<Result<Vec<_>>>()?;
    Ok((common, layers))
}

/// Every variable the user assigned anywhere in the plot.
fn declared_variables(plot: &Plot, common: &PlotData) -> Vec<String> {
    let mut vars: Vec<String> = common.frame.columns().into_iter().map(str::to_string).collect();
    let pair = plot.pair.variables();
    let facet = plot.facet.variables();
    for name in pair.keys().chain(facet.keys()).chain(plot.layers.iter().flat_map(|l| l.variables.keys())) {
        if !vars.contains(name) {
            vars.push(name.clone());
        }
    }
    vars
}

fn layout_subplots(plot: &Plot, common: &PlotData) -> Result<Subplots> {
    let mut levels = IndexMap::new();
    for dim in [Dim::Col, Dim::Row] {
        if let Some(col) = common.frame.get(dim.var()) {
            levels.insert(dim, categorical_order(col, plot.facet.order_of(dim)));
        }
    }
    Subplots::new(&plot.facet, &levels, &plot.pair, &plot.shares)
}

/// Rows of `df` that fall in a subplot's facet cell.
fn view_rows(df: &DataFrame, view: &Subplot) -> Vec<usize> {
    (0..df.nrow())
        .filter(|&row| {
            [Dim::Col, Dim::Row].into_iter().all(|dim| match (view.level(dim), df.get(dim.var())) {
                (Some(level), Some(col)) => col.get(row) == Some(level),
                _ => true,
            })
        })
        .collect()
}

/// Rows of `df` a subplot sees under an axis sharing mode.
fn share_rows(df: &DataFrame, view: &Subplot, share: Option<Share>) -> Vec<usize> {
    let dim = match share {
        None | Some(Share::All) => return (0..df.nrow()).collect(),
        Some(Share::None) => return view_rows(df, view),
        Some(Share::Row) => Dim::Row,
        Some(Share::Col) => Dim::Col,
    };
    match (df.get(dim.var()), view.level(dim)) {
        (Some(col), Some(level)) => (0..df.nrow()).filter(|&row| col.get(row) == Some(level)).collect(),
        _ => (0..df.nrow()).collect(),
    }
}

/// Whether a column is a numbered coordinate of `axis` (`x0`, `x1max`).
fn is_numbered(name: &str, axis: &str) -> bool {
    name.strip_prefix(axis).is_some_and(|rest| rest.starts_with(|c: char| c.is_ascii_digit()))
}

/// Layer data and scales as seen by one `(x, y)` pairing: the paired
/// variables are renamed to `x`/`y` and the other pairs are dropped.
fn pairing_view(df: &DataFrame, scales: &ScaleMap, x: &str, y: &str) -> (DataFrame, ScaleMap) {
    let mut out = df.clone();
    let mut scales = scales.clone();
    for (axis, var) in [("x", x), ("y", y)] {
        if let Some(scale) = scales.get(var).cloned() {
            scales.insert(axis.to_string(), scale);
        }
        if axis != var {
            out.rename(var, axis);
            let numbered: Vec<String> =
                out.columns().into_iter().filter(|c| is_numbered(c, axis)).map(str::to_string).collect();
            for name in numbered {
                out.remove(&name);
            }
        }
    }
    (out, scales)
}

fn add_width(
    df: &mut DataFrame,
    mark: &dyn Mark,
    views: &[&Subplot],
    share: Option<Share>,
    ctx: &MarkContext<'_>,
) -> Result<()> {
    let orient = ctx.orient.var();
    let mut width = vec![f64::NAN; df.nrow()];
    for view in views {
        let rows = share_rows(df, view, share);
        let view_df = df.take(&rows);
        let view_width: Vec<f64> = if mark.features().contains("width") {
            let resolved = mark.features().resolve(Source::Frame(&view_df), "width", ctx)?;
            (0..rows.len()).map(|i| resolved.f64(i)).collect()
        } else if let Some(values) = view_df.numeric("width") {
            values
        } else {
            vec![0.8; rows.len()]
        };
        let spacing = match (ctx.scales.get(orient), view_df.numeric(orient)) {
            (Some(scale), Some(values)) => scale.spacing(&values),
            _ => 1.0,
        };
        for (row, w) in rows.into_iter().zip(view_width) {
            width[row] = w * spacing;
        }
    }
    df.insert("width", width)
}

fn add_baseline(df: &mut DataFrame, mark: &dyn Mark, ctx: &MarkContext<'_>) -> Result<()> {
    let n = df.nrow();
    let baseline: Vec<f64> = if mark.features().contains("baseline") {
        let resolved = mark.features().resolve(Source::Frame(df), "baseline", ctx)?;
        (0..n).map(|i| resolved.f64(i)).collect()
    } else {
        df.numeric("baseline").unwrap_or_else(|| vec![0.0; n])
    };
    df.insert("baseline", baseline)
}

/// Axis of an unnumbered coordinate column (`x`, `ymax`).
fn unscaled_axis(name: &str) -> Option<&'static str> {
    let axis = match name.chars().next()? {
        'x' => "x",
        'y' => "y",
        _ => return None,
    };
    (!name[1..].chars().any(|c| c.is_ascii_digit())).then_some(axis)
}

/// Bring coordinates back from transformed space to data space.
fn unscale_coords(df: &DataFrame, scales: &ScaleMap) -> Result<DataFrame> {
    let mut out = df.clone();
    for name in df.columns() {
        let Some(scale) = unscaled_axis(name).and_then(|axis| scales.get(axis)) else { continue };
        if scale.transform() == Transform::Identity {
            continue;
        }
        if let Some(values) = df.numeric(name) {
            let inverted: Vec<f64> = values.into_iter().map(|v| scale.inverse(v)).collect();
            out.insert(name, inverted)?;
        }
    }
    Ok(out)
}

fn surface_spans(surface: &Surface) -> [Span; 2] {
    let mut spans = [Span::EMPTY; 2];
    for item in &surface.items {
        if let Some(extent) = item.artist.extent() {
            for axis in [Orient::X, Orient::Y] {
                let (lo, hi) = extent.range(axis);
                let i = axis_index(axis);
                spans[i] = spans[i].merge(Span { lo, hi, sticky: false });
            }
        }
        if let Artist::Patches { sticky: Some(orient), .. } = &item.artist {
            spans[axis_index(orient.flip())].sticky = true;
        }
    }
    spans
}

/// Widen a degenerate range by 5% (or ±0.05 around zero).
fn nonsingular(lo: f64, hi: f64) -> (f64, f64) {
    if lo < hi {
        (lo, hi)
    } else if lo == 0.0 {
        (-0.05, 0.05)
    } else {
        (lo - 0.05 * lo.abs(), hi + 0.05 * hi.abs())
    }
}

/// A user limit in axis units; text names a level, padded to its slot edge.
fn user_bound(value: &DataValue, scale: &Scale, pad: f64) -> Option<f64> {
    match value {
        DataValue::Null => None,
        DataValue::Text(_) => Some(scale.convert(value) + pad),
        other => other.as_f64(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::facet::{FacetSpec, PairSpec};
    use crate::grammar::marks::{Area, Bar, Bars, Dot, Line};
    use crate::grammar::moves::Dodge;
    use crate::grammar::plot::{Label, Layer};
    use crate::grammar::scales::ScaleKind;
    use crate::grammar::stats::{Agg, Hist};
    use approx::assert_relative_eq;

    fn frame() -> DataFrame {
        DataFrame::new()
            .column("x", vec![1.0, 1.0, 2.0, 2.0])
            .unwrap()
            .column("y", vec![1.0, 2.0, 1.0, 2.0])
            .unwrap()
            .column("g", vec!["a", "a", "b", "b"])
            .unwrap()
    }

    fn axis(compiled: &CompiledPlot, surface: usize, axis: Orient) -> AxisSpec {
        compiled.scene().surfaces[surface].axis(axis).cloned().unwrap()
    }

    fn points(compiled: &CompiledPlot) -> Vec<crate::grammar::backend::PointArtist> {
        compiled
            .scene()
            .surfaces
            .iter()
            .flat_map(|s| &s.items)
            .flat_map(|item| match &item.artist {
                Artist::Points(points) => points.clone(),
                _ => Vec::new(),
            })
            .collect()
    }

    #[test]
    fn test_color_mapping_end_to_end() {
        let compiled = Plot::new().data(frame()).x("x").y("y").color("g").add(Dot::new()).compile().unwrap();
        let scale = compiled.scale("color").unwrap();
        assert_eq!(scale.kind(), ScaleKind::Nominal);
        assert_eq!(scale.levels().unwrap(), &[DataValue::from("a"), DataValue::from("b")]);

        let pts = points(&compiled);
        assert_eq!(pts.len(), 4);
        assert_eq!(pts[0].facecolor, pts[1].facecolor);
        assert_ne!(pts[0].facecolor, pts[2].facecolor);

        let legend = compiled.legend();
        assert_eq!(legend.len(), 1);
        assert_eq!(legend[0].title, "g");
        let labels: Vec<&str> = legend[0].entries.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, vec!["a", "b"]);
    }

    #[test]
    fn test_axis_labels_and_limits() {
        let compiled = Plot::new().data(frame()).x("x").y("y").add(Dot::new()).compile().unwrap();
        let x = axis(&compiled, 0, Orient::X);
        assert_eq!(x.label.as_deref(), Some("x"));
        assert!(x.show_label);
        // Data spans [1, 2], padded by 5% on each side.
        assert_relative_eq!(x.limits.0, 0.95, epsilon = 1e-12);
        assert_relative_eq!(x.limits.1, 2.05, epsilon = 1e-12);
        assert!(!x.ticks.major.is_empty());
    }

    #[test]
    fn test_nominal_axis_is_slotted() {
        let compiled = Plot::new().data(frame()).x("g").y("y").add(Dot::new()).compile().unwrap();
        let x = axis(&compiled, 0, Orient::X);
        assert_eq!(x.limits, (-0.5, 1.5));
        let labels: Vec<&str> = x.ticks.major.iter().map(|t| t.label.as_str()).collect();
        assert_eq!(labels, vec!["a", "b"]);
        assert!(!x.grid);
        // Points sit at level indices.
        let xs: Vec<f64> = points(&compiled).iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![0.0, 0.0, 1.0, 1.0]);

        let flipped = Plot::new().data(frame()).x("y").y("g").add(Dot::new()).compile().unwrap();
        assert_eq!(axis(&flipped, 0, Orient::Y).limits, (1.5, -0.5));
    }

    #[test]
    fn test_log_scale_round_trips_coordinates() {
        let data = DataFrame::new()
            .column("x", vec![1.0, 10.0, 100.0])
            .unwrap()
            .column("y", vec![1.0, 2.0, 3.0])
            .unwrap();
        let compiled = Plot::new().data(data).x("x").y("y").scale("x", "log").add(Dot::new()).compile().unwrap();
        let xs: Vec<f64> = points(&compiled).iter().map(|p| p.x).collect();
        assert_relative_eq!(xs[0], 1.0, epsilon = 1e-9);
        assert_relative_eq!(xs[1], 10.0, epsilon = 1e-9);
        assert_relative_eq!(xs[2], 100.0, epsilon = 1e-9);
        let x = axis(&compiled, 0, Orient::X);
        assert_eq!(x.transform, Transform::Log(10.0));
        // Margins are added in log space.
        assert_relative_eq!(x.limits.0, 10f64.powf(-0.1), epsilon = 1e-9);
        assert_relative_eq!(x.limits.1, 10f64.powf(2.1), epsilon = 1e-9);
    }

    #[test]
    fn test_bars_stick_to_zero() {
        let data = DataFrame::new()
            .column("x", vec!["a", "b"])
            .unwrap()
            .column("y", vec![2.0, 4.0])
            .unwrap();
        let compiled = Plot::new().data(data).x("x").y("y").add(Bar::new()).compile().unwrap();
        let y = axis(&compiled, 0, Orient::Y);
        assert_eq!(y.limits.0, 0.0);
        assert_relative_eq!(y.limits.1, 4.2, epsilon = 1e-12);
    }

    #[test]
    fn test_area_sticks_but_dots_do_not() {
        let data = DataFrame::new()
            .column("x", vec![1.0, 2.0])
            .unwrap()
            .column("y", vec![1.0, 3.0])
            .unwrap();
        let area = Plot::new().data(data.clone()).x("x").y("y").add(Area::new()).compile().unwrap();
        assert_eq!(axis(&area, 0, Orient::Y).limits.0, 0.0);
        let dots = Plot::new().data(data).x("x").y("y").add(Dot::new()).compile().unwrap();
        assert!(axis(&dots, 0, Orient::Y).limits.0 > 0.0);
    }

    #[test]
    fn test_hist_adds_unprioritized_value_scale() {
        let data = DataFrame::new().column("x", vec![1.0, 2.0, 2.0, 3.0, 3.0, 3.0]).unwrap();
        let compiled = Plot::new()
            .data(data)
            .x("x")
            .layer(Layer::new(Bars::new()).stat(Hist::new()))
            .compile()
            .unwrap();
        assert_eq!(compiled.scale("y").unwrap().priority(), 0);
        let y = axis(&compiled, 0, Orient::Y);
        assert_eq!(y.limits.0, 0.0);
        assert_eq!(y.label, None);

        let edgewidths: Vec<f64> = compiled.scene().surfaces[0]
            .items
            .iter()
            .flat_map(|item| match &item.artist {
                Artist::Patches { patches, .. } => patches.iter().map(|p| p.edgewidth).collect(),
                _ => Vec::new(),
            })
            .collect();
        assert!(!edgewidths.is_empty());
        assert!(edgewidths.iter().all(|w| w.is_finite() && *w > 0.0 && *w <= compiled.theme().patch_linewidth));
    }

    #[test]
    fn test_aggregate_with_dodge() {
        let data = DataFrame::new()
            .column("x", vec!["a", "a", "b", "b"])
            .unwrap()
            .column("y", vec![1.0, 3.0, 2.0, 4.0])
            .unwrap()
            .column("g", vec!["u", "v", "u", "v"])
            .unwrap();
        let compiled = Plot::new()
            .data(data)
            .x("x")
            .y("y")
            .color("g")
            .layer(Layer::new(Bar::new()).stat(Agg::default()).adjust(Dodge::new()))
            .compile()
            .unwrap();
        let patches: Vec<_> = compiled.scene().surfaces[0]
            .items
            .iter()
            .flat_map(|item| match &item.artist {
                Artist::Patches { patches, .. } => patches.clone(),
                _ => Vec::new(),
            })
            .collect();
        assert_eq!(patches.len(), 4);
        // Dodged bars are half as wide as the level slot.
        let width = patches[0].vertices[1].0 - patches[0].vertices[0].0;
        assert_relative_eq!(width, 0.4, epsilon = 1e-9);
    }

    #[test]
    fn test_facet_titles_and_shared_labels() {
        let compiled = Plot::new()
            .data(frame())
            .x("x")
            .y("y")
            .facet(FacetSpec::new().col("g"))
            .unwrap()
            .add(Dot::new())
            .compile()
            .unwrap();
        let scene = compiled.scene();
        assert_eq!(scene.surfaces.len(), 2);
        assert_eq!(scene.surfaces[0].title.as_deref(), Some("a"));
        assert_eq!(scene.surfaces[1].title.as_deref(), Some("b"));
        // Only the leftmost subplot labels its y axis.
        let (left, right) = (axis(&compiled, 0, Orient::Y), axis(&compiled, 1, Orient::Y));
        assert!(left.show_label && left.show_ticklabels);
        assert!(!right.show_label && !right.show_ticklabels);
        // Shared x limits cover all the data on both subplots.
        assert_eq!(axis(&compiled, 0, Orient::X).limits, axis(&compiled, 1, Orient::X).limits);
    }

    #[test]
    fn test_labeled_facet_titles() {
        let compiled = Plot::new()
            .data(frame())
            .x("x")
            .y("y")
            .facet(FacetSpec::new().col("g"))
            .unwrap()
            .label("col", "group")
            .title(Label::func(|s: &str| format!("[{s}]")))
            .add(Dot::new())
            .compile()
            .unwrap();
        assert_eq!(compiled.scene().surfaces[1].title.as_deref(), Some("group [b]"));
    }

    #[test]
    fn test_unfaceted_title() {
        let compiled = Plot::new().data(frame()).x("x").y("y").title("Hello").add(Dot::new()).compile().unwrap();
        assert_eq!(compiled.scene().surfaces[0].title.as_deref(), Some("Hello"));
        let untitled = Plot::new().data(frame()).x("x").y("y").add(Dot::new()).compile().unwrap();
        assert_eq!(untitled.scene().surfaces[0].title, None);
    }

    #[test]
    fn test_pairing_draws_each_variable() {
        let data = DataFrame::new()
            .column("a", vec![1.0, 2.0])
            .unwrap()
            .column("b", vec![10.0, 20.0])
            .unwrap()
            .column("y", vec![0.0, 1.0])
            .unwrap();
        let compiled = Plot::new()
            .data(data)
            .y("y")
            .pair(PairSpec::new().x(["a", "b"]))
            .unwrap()
            .add(Line::new())
            .compile()
            .unwrap();
        let scene = compiled.scene();
        assert_eq!(scene.surfaces.len(), 2);
        let x0 = axis(&compiled, 0, Orient::X);
        let x1 = axis(&compiled, 1, Orient::X);
        assert_eq!(x0.label.as_deref(), Some("a"));
        assert_eq!(x1.label.as_deref(), Some("b"));
        assert!(x0.limits.1 < 5.0);
        assert!(x1.limits.0 > 5.0);
    }

    #[test]
    fn test_user_limits() {
        let compiled = Plot::new()
            .data(frame())
            .x("g")
            .y("y")
            .limit("x", "b", DataValue::Null)
            .limit("y", 0.0, 10.0)
            .add(Dot::new())
            .compile()
            .unwrap();
        assert_eq!(axis(&compiled, 0, Orient::Y).limits, (0.0, 10.0));
        assert_eq!(axis(&compiled, 0, Orient::X).limits, (0.5, 1.5));
    }

    #[test]
    fn test_missing_column_is_binding_error() {
        let err = Plot::new().data(frame()).x("nope").add(Dot::new()).compile().unwrap_err();
        assert!(matches!(err, Error::Binding { .. }));
    }

    #[test]
    fn test_scale_errors_name_the_variable() {
        let err = Plot::new()
            .data(frame())
            .x("x")
            .y("y")
            .color("g")
            .scale("color", ScaleSpec::continuous())
            .add(Dot::new())
            .compile()
            .unwrap_err();
        assert_eq!(err.to_string(), "Scale setup failed for the `color` variable");
        assert!(matches!(err.root_cause(), Error::Value(_)));
    }

    #[test]
    fn test_empty_plot_compiles() {
        let compiled = Plot::new().compile().unwrap();
        assert_eq!(compiled.subplots().len(), 1);
        assert_eq!(compiled.scene().artist_count(), 0);
        assert_eq!(axis(&compiled, 0, Orient::X).limits, (0.0, 1.0));
    }

    #[test]
    fn test_layout_size_and_theme_overrides() {
        let config = PlotConfig::default();
        let compiled = Plot::new()
            .layout(300, 200)
            .theme(crate::grammar::theme::ThemeOverrides::new().preset("white"))
            .compile_with(&config)
            .unwrap();
        assert_eq!(compiled.scene().size, (300, 200));
        assert_eq!(compiled.theme().name, "white");
        // The shared configuration is untouched.
        assert_eq!(config.theme.name, "darkgrid");
    }

    #[test]
    fn test_compile_on_replays() {
        let mut target = Scene::default();
        let compiled = Plot::new().data(frame()).x("x").y("y").add(Dot::new()).compile_on(&mut target).unwrap();
        assert_eq!(target.surfaces, compiled.scene().surfaces);
    }

    #[test]
    fn test_save_rejects_unknown_extension() {
        let compiled = Plot::new().compile().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let err = compiled.save(dir.path().join("plot.bmp")).unwrap_err();
        assert!(matches!(err, Error::Value(_)));
    }

    #[test]
    fn test_helpers() {
        assert!(is_numbered("x0", "x"));
        assert!(is_numbered("x12max", "x"));
        assert!(!is_numbered("xmin", "x"));
        assert_eq!(unscaled_axis("ymax"), Some("y"));
        assert_eq!(unscaled_axis("x1"), None);
        assert_eq!(unscaled_axis("color"), None);
        assert_eq!(nonsingular(0.0, 0.0), (-0.05, 0.05));
        assert_eq!(nonsingular(2.0, 2.0), (1.9, 2.1));
    }
}
