//! End-to-end compilation tests: specification in, scene and files out.
//!
//! Run: cargo test --test plot_compile_test

#![allow(clippy::unwrap_used, clippy::float_cmp)]

use chrono::NaiveDate;
use proptest::prelude::*;
use trueno_plot::grammar::backend::{Artist, Extent};
use trueno_plot::grammar::scales::ScaleKind;
use trueno_plot::prelude::*;

fn tips() -> DataFrame {
    DataFrame::new()
        .column("day", vec!["thu", "thu", "fri", "fri", "sat", "sat"])
        .unwrap()
        .column("total", vec![1.0, 3.0, 2.0, 4.0, 5.0, 1.0])
        .unwrap()
        .column("smoker", vec!["yes", "no", "yes", "no", "yes", "no"])
        .unwrap()
        .column("size", vec![2.0, 3.0, 2.5, 4.0, 1.5, 3.5])
        .unwrap()
}

fn extent(compiled: &CompiledPlot, surface: usize) -> Extent {
    compiled.scene().surfaces[surface].extent().unwrap()
}

fn point_xs(compiled: &CompiledPlot) -> Vec<f64> {
    compiled
        .scene()
        .surfaces
        .iter()
        .flat_map(|s| &s.items)
        .flat_map(|item| match &item.artist {
            Artist::Points(points) => points.iter().map(|p| p.x).collect(),
            _ => Vec::new(),
        })
        .collect()
}

// ============================================================================
// Layers
// ============================================================================

#[test]
fn stacked_bars_accumulate_per_level() {
    let compiled = Plot::new()
        .data(tips())
        .x("day")
        .y("total")
        .color("smoker")
        .layer(Layer::new(Bar::new()).adjust(Stack))
        .compile()
        .unwrap();
    let e = extent(&compiled, 0);
    assert_eq!(e.y0, 0.0);
    assert_eq!(e.y1, 6.0);
    let y = compiled.scene().surfaces[0].yaxis.as_ref().unwrap();
    assert_eq!(y.limits.0, 0.0);
}

#[test]
fn ecdf_spans_unit_interval() {
    let compiled = Plot::new()
        .data(tips())
        .x("total")
        .layer(Layer::new(Line::new()).stat(Ecdf::new()))
        .compile()
        .unwrap();
    let e = extent(&compiled, 0);
    assert_eq!(e.y0, 0.0);
    assert!((e.y1 - 1.0).abs() < 1e-12);
    assert_eq!(e.x0, 1.0);
    assert_eq!(e.x1, 5.0);
}

#[test]
fn density_area_rests_on_zero() {
    let compiled = Plot::new()
        .data(tips())
        .x("total")
        .layer(Layer::new(Area::new()).stat(Kde::new()))
        .compile()
        .unwrap();
    let e = extent(&compiled, 0);
    assert_eq!(e.y0, 0.0);
    assert!(e.y1 > 0.0);
    // The default grid extends past the data by three bandwidths.
    assert!(e.x0 < 1.0 && e.x1 > 5.0);
}

#[test]
fn jitter_is_reproducible_with_a_seed() {
    let jittered = || {
        Plot::new()
            .data(tips())
            .x("day")
            .y("total")
            .layer(Layer::new(Dot::new()).adjust(Jitter::new().seed(7)))
            .compile()
            .unwrap()
    };
    let (a, b) = (point_xs(&jittered()), point_xs(&jittered()));
    assert_eq!(a, b);
    assert_eq!(a.len(), 6);
    for (x, slot) in a.iter().zip([0.0, 0.0, 1.0, 1.0, 2.0, 2.0]) {
        assert!((x - slot).abs() < 0.5, "{x} left its slot {slot}");
    }
}

#[test]
fn regression_line_is_drawn_over_points() {
    let compiled = Plot::new()
        .data(tips())
        .x("size")
        .y("total")
        .add(Dot::new())
        .layer(Layer::new(Line::new()).stat(PolyFit::new()))
        .compile()
        .unwrap();
    let layers: Vec<usize> = compiled.scene().surfaces[0].items.iter().map(|i| i.layer).collect();
    assert!(layers.contains(&0) && layers.contains(&1));
}

#[test]
fn temporal_axis_gets_a_temporal_scale() {
    let days: Vec<_> =
        (1..=4).map(|d| NaiveDate::from_ymd_opt(2024, 3, d).unwrap().and_hms_opt(0, 0, 0).unwrap()).collect();
    let data = DataFrame::new().column("when", days).unwrap().column("v", vec![1.0, 2.0, 4.0, 3.0]).unwrap();
    let compiled = Plot::new().data(data).x("when").y("v").add(Line::new()).compile().unwrap();
    assert_eq!(compiled.scale("x").unwrap().kind(), ScaleKind::Temporal);
    let x = compiled.scene().surfaces[0].xaxis.as_ref().unwrap();
    assert!(x.ticks.major.iter().all(|t| !t.label.is_empty()));
}

// ============================================================================
// Figure structure
// ============================================================================

#[test]
fn wrapped_facets_fill_rows_first() {
    let compiled = Plot::new()
        .data(tips())
        .x("size")
        .y("total")
        .facet(FacetSpec::new().col("day").wrap(2))
        .unwrap()
        .add(Dot::new())
        .compile()
        .unwrap();
    let scene = compiled.scene();
    assert_eq!(scene.shape, (2, 2));
    let cells: Vec<(usize, usize)> = scene.surfaces.iter().map(|s| (s.row, s.col)).collect();
    assert_eq!(cells, vec![(0, 0), (0, 1), (1, 0)]);
    let titles: Vec<_> = scene.surfaces.iter().map(|s| s.title.clone().unwrap()).collect();
    assert_eq!(titles, vec!["thu", "fri", "sat"]);
}

#[test]
fn facet_and_pair_on_the_same_dimension_is_rejected() {
    let plot = Plot::new().facet(FacetSpec::new().col("day")).unwrap();
    assert!(plot.pair(PairSpec::new().x(["size", "total"]).wrap(2)).is_err());
}

#[test]
fn legend_merges_layers_mapping_the_same_variable() {
    let compiled = Plot::new()
        .data(tips())
        .x("size")
        .y("total")
        .color("smoker")
        .add(Dot::new())
        .add(Line::new())
        .compile()
        .unwrap();
    let legend = compiled.legend();
    assert_eq!(legend.len(), 1);
    assert_eq!(legend[0].entries.len(), 2);
    assert!(legend[0].entries.iter().all(|e| e.glyphs.len() == 2));
}

#[test]
fn unknown_variable_fails_at_compile_time() {
    let err = Plot::new().data(tips()).x("tip").add(Dot::new()).compile().unwrap_err();
    assert!(matches!(err, Error::Binding { .. }));
}

#[test]
fn unknown_variable_fails_on_eager_construction() {
    let err = Plot::try_new(tips(), [("x", "day"), ("y", "tip")]).unwrap_err();
    assert!(matches!(err, Error::Binding { ref variable, .. } if variable == "y"));
    let plot = Plot::try_new(tips(), [("x", "day"), ("y", "total")]).unwrap();
    assert!(plot.add(Bar::new()).compile().is_ok());
}

// ============================================================================
// Output
// ============================================================================

#[test]
fn compiled_plot_saves_every_format() {
    let compiled = Plot::new()
        .data(tips())
        .x("day")
        .y("total")
        .color("smoker")
        .add(Bar::new())
        .label("y", "Total bill")
        .layout(320, 240)
        .compile()
        .unwrap();
    let dir = tempfile::tempdir().unwrap();

    let svg = dir.path().join("plot.svg");
    compiled.save(&svg).unwrap();
    let text = std::fs::read_to_string(&svg).unwrap();
    assert!(text.starts_with("<svg"));
    assert!(text.contains("Total bill"));
    assert!(text.contains("smoker"));

    let png = dir.path().join("plot.png");
    compiled.save(&png).unwrap();
    let bytes = std::fs::read(&png).unwrap();
    assert_eq!(&bytes[..8], &[137, 80, 78, 71, 13, 10, 26, 10]);

    let html = dir.path().join("plot.html");
    compiled.save(&html).unwrap();
    assert!(std::fs::read_to_string(&html).unwrap().contains("<img"));

    let fb = compiled.to_framebuffer().unwrap();
    assert_eq!((fb.width(), fb.height()), (320, 240));
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn axis_limits_cover_the_data(xs in prop::collection::vec(-1e3f64..1e3, 2..30)) {
        let ys: Vec<f64> = (0..xs.len()).map(|i| i as f64).collect();
        let data = DataFrame::new().column("x", xs.clone()).unwrap().column("y", ys).unwrap();
        let compiled = Plot::new().data(data).x("x").y("y").add(Dot::new()).compile().unwrap();
        let (lo, hi) = compiled.scene().surfaces[0].xaxis.as_ref().unwrap().limits;
        let min = xs.iter().copied().fold(f64::INFINITY, f64::min);
        let max = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        prop_assert!(lo <= min && hi >= max, "({lo}, {hi}) misses [{min}, {max}]");
    }
}
