//! Legend assembly.
//!
//! Every layer that shows a legend contributes one section per mapped
//! variable identity: one row per level the variable's scale exposes (all
//! levels for discrete scales, a few nice values for continuous ones). A
//! layer `label` adds a row to a separate section titled by the plot's
//! legend title. Sections with the same title and identity merge across
//! layers, so each level appears once with the glyphs of every layer
//! stacked on top of one another.

use indexmap::IndexMap;

use super::backend::{LegendEntry, LegendGlyph, LegendSection};
use super::bind::{PlotData, VariableId};
use super::marks::{Mark, MarkContext};
use crate::error::Result;
use crate::grammar::data::DataValue;

/// Identity of a legend section.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum SectionId {
    /// Rows contributed by layer labels.
    Layers,
    /// Rows for the levels of a mapped variable.
    Variable(VariableId),
}

type SectionKey = (String, SectionId);

#[derive(Debug)]
struct Contents {
    key: SectionKey,
    glyphs: Vec<LegendGlyph>,
    labels: Vec<String>,
}

/// Collects legend contents layer by layer.
#[derive(Debug, Default)]
pub(crate) struct LegendBuilder {
    contents: Vec<Contents>,
}

impl LegendBuilder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Add the legend contents of one layer.
    ///
    /// `title` resolves the section title of a variable from its name and
    /// the name of the data it came from.
    pub(crate) fn add_layer(
        &mut self,
        mark: &dyn Mark,
        data: &PlotData,
        ctx: &MarkContext<'_>,
        label: Option<&str>,
        legend_title: &str,
        title: &dyn Fn(&str, Option<&str>) -> String,
    ) -> Result<()> {
        if let Some(label) = label {
            if let Some(glyph) = mark.legend_artist(&[], &DataValue::Null, ctx)? {
                let key = (legend_title.to_string(), SectionId::Layers);
                match self.contents.iter_mut().find(|c| c.key == key) {
                    Some(existing) => {
                        existing.glyphs.push(glyph);
                        existing.labels.push(label.to_string());
                    }
                    None => self.contents.push(Contents { key, glyphs: vec![glyph], labels: vec![label.to_string()] }),
                }
            }
        }

        // Variables sharing an identity share a section, each glyph showing
        // all of them at once.
        let mut schema: Vec<(SectionKey, Vec<String>, &[DataValue], &[String])> = Vec::new();
        for var in legend_vars(data, ctx) {
            let Some(legend) = ctx.scales.get(&var).and_then(|s| s.legend()) else { continue };
            let id = data.ids.get(&var).cloned().unwrap_or_else(|| VariableId::Name(var.clone()));
            match schema.iter_mut().find(|((_, part), ..)| *part == SectionId::Variable(id.clone())) {
                Some((_, vars, ..)) => vars.push(var),
                None => {
                    let name = data.names.get(&var).cloned().flatten();
                    let key = (title(&var, name.as_deref()), SectionId::Variable(id));
                    schema.push((key, vec![var], &legend.values, &legend.labels));
                }
            }
        }

        for (key, vars, values, labels) in schema {
            let mut glyphs = Vec::with_capacity(values.len());
            for value in values {
                if let Some(glyph) = mark.legend_artist(&vars, value, ctx)? {
                    glyphs.push(glyph);
                }
            }
            if !glyphs.is_empty() {
                self.contents.push(Contents { key, glyphs, labels: labels.to_vec() });
            }
        }
        Ok(())
    }

    /// Merge contents with the same section key into titled sections.
    pub(crate) fn build(self) -> Vec<LegendSection> {
        let mut merged: IndexMap<SectionKey, Vec<LegendEntry>> = IndexMap::new();
        for Contents { key, glyphs, labels } in self.contents {
            let entries = merged.entry(key).or_default();
            for (i, (glyph, label)) in glyphs.into_iter().zip(labels).enumerate() {
                match entries.get_mut(i) {
                    Some(entry) => entry.glyphs.push(glyph),
                    None => entries.push(LegendEntry { label, glyphs: vec![glyph] }),
                }
            }
        }
        merged
            .into_iter()
            .map(|((title, _), entries)| LegendSection { title, entries })
            .collect()
    }
}

/// Layer variables that have a fitted scale, in column order.
fn legend_vars(data: &PlotData, ctx: &MarkContext<'_>) -> Vec<String> {
    let frames: Vec<_> = if data.frame.ncol() == 0 && !data.frames.is_empty() {
        data.frames.values().collect()
    } else {
        vec![&data.frame]
    };
    let mut vars: Vec<String> = Vec::new();
    for frame in frames {
        for name in frame.columns() {
            if ctx.scales.contains_key(name) && !vars.iter().any(|v| v == name) {
                vars.push(name.to_string());
            }
        }
    }
    vars
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::grammar::bind::{VariableSpec, Variables};
    use crate::grammar::data::DataFrame;
    use crate::grammar::marks::{Dot, Line, Text};
    use crate::grammar::orient::Orient;
    use crate::grammar::properties::Property;
    use crate::grammar::scales::{ScaleMap, ScaleSpec};
    use crate::grammar::theme::Theme;

    fn setup() -> (PlotData, ScaleMap, Theme) {
        let theme = Theme::default();
        let df = Arc::new(
            DataFrame::new()
                .column("x", vec![1.0, 2.0, 3.0])
                .unwrap()
                .column("g", vec!["a", "b", "a"])
                .unwrap(),
        );
        let mut vars = Variables::new();
        vars.insert("x".into(), VariableSpec::column("x"));
        vars.insert("color".into(), VariableSpec::column("g"));
        vars.insert("marker".into(), VariableSpec::column("g"));
        let data = PlotData::new(Some(&df), &vars).unwrap();
        let mut scales = ScaleMap::new();
        for var in ["color", "marker"] {
            let col = data.frame.get(var).unwrap();
            let scale = ScaleSpec::nominal().setup(col, &Property::get(var), &theme).unwrap();
            scales.insert(var.to_string(), scale);
        }
        (data, scales, theme)
    }

    fn title(var: &str, name: Option<&str>) -> String {
        name.unwrap_or(var).to_string()
    }

    #[test]
    fn test_shared_identity_gives_one_section() {
        let (data, scales, theme) = setup();
        let ctx = MarkContext { scales: &scales, theme: &theme, orient: Orient::X, layer: 0 };
        let mut builder = LegendBuilder::new();
        builder.add_layer(&Dot::new(), &data, &ctx, None, "", &title).unwrap();
        let sections = builder.build();
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].title, "g");
        let labels: Vec<&str> = sections[0].entries.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, vec!["a", "b"]);
        let Some(LegendGlyph::Point(first)) = sections[0].entries[0].glyphs.first() else {
            panic!("expected a point glyph")
        };
        let Some(LegendGlyph::Point(second)) = sections[0].entries[1].glyphs.first() else {
            panic!("expected a point glyph")
        };
        assert_ne!(first.facecolor, second.facecolor);
        assert_ne!(first.marker, second.marker);
    }

    #[test]
    fn test_layers_merge_by_level() {
        let (data, scales, theme) = setup();
        let ctx = MarkContext { scales: &scales, theme: &theme, orient: Orient::X, layer: 0 };
        let mut builder = LegendBuilder::new();
        builder.add_layer(&Dot::new(), &data, &ctx, None, "", &title).unwrap();
        builder.add_layer(&Line::new(), &data, &ctx, None, "", &title).unwrap();
        let sections = builder.build();
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].entries.len(), 2);
        assert!(sections[0].entries.iter().all(|e| e.glyphs.len() == 2));
    }

    #[test]
    fn test_layer_labels_share_a_section() {
        let (data, scales, theme) = setup();
        let ctx = MarkContext { scales: &scales, theme: &theme, orient: Orient::X, layer: 0 };
        let mut builder = LegendBuilder::new();
        builder.add_layer(&Dot::new(), &data, &ctx, Some("points"), "", &title).unwrap();
        builder.add_layer(&Line::new(), &data, &ctx, Some("fit"), "", &title).unwrap();
        let sections = builder.build();
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].title, "");
        let labels: Vec<&str> = sections[0].entries.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, vec!["points", "fit"]);
    }

    #[test]
    fn test_marks_without_glyphs_add_nothing() {
        let (data, scales, theme) = setup();
        let ctx = MarkContext { scales: &scales, theme: &theme, orient: Orient::X, layer: 0 };
        let mut builder = LegendBuilder::new();
        builder.add_layer(&Text::new(), &data, &ctx, Some("labels"), "", &title).unwrap();
        assert!(builder.build().is_empty());
    }
}
