//! Grid construction tests

use chrono::{NaiveDate, NaiveDateTime};
use geocube::{
    build_grid,
    errors::GeoCubeError,
    grid::{AxisFilter, GridBuilder, IntegrationMode, ReferenceSelection},
    model::{Axes, Crs, Dim, Grid, SampleArray},
};

fn ts(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .and_then(|date| date.and_hms_opt(h, 0, 0))
        .expect("valid timestamp")
}

fn spatial(name: &str, y: Vec<f64>, x: Vec<f64>, crs: Option<&str>) -> SampleArray {
    let n = y.len() * x.len();
    SampleArray::new(name, Axes::spatial(y, x), crs.map(Crs::new))
        .and_then(|a| a.with_values("v", vec![1.0; n]))
        .expect("valid spatial array")
}

fn temporal(name: &str, times: Vec<NaiveDateTime>, crs: Option<&str>) -> SampleArray {
    let n = times.len();
    SampleArray::new(name, Axes::temporal(times), crs.map(Crs::new))
        .and_then(|a| a.with_values("v", vec![1.0; n]))
        .expect("valid temporal array")
}

fn builder(mode: IntegrationMode) -> GridBuilder {
    GridBuilder::new(mode, 1.0, "D".parse().unwrap()).unwrap()
}

#[test]
fn test_empty_input_fails_for_every_mode() {
    for mode in ["spatiotemporal", "spatial", "temporal"] {
        match build_grid(&[], mode, 1.0, "D", None, Some(0.01)) {
            Err(GeoCubeError::MissingAxis { .. }) => {}
            other => panic!("Expected MissingAxis for {mode}, got {:?}", other),
        }
    }
}

#[test]
fn test_unsupported_mode() {
    let arrays = vec![spatial("a", vec![0.0], vec![0.0], Some("EPSG:4326"))];
    match build_grid(&arrays, "bogus", 1.0, "D", None, None) {
        Err(GeoCubeError::UnsupportedMode { mode }) => assert_eq!(mode, "bogus"),
        other => panic!("Expected UnsupportedMode, got {:?}", other),
    }
}

#[test]
fn test_spatial_extent_skips_arrays_without_space() {
    let arrays = vec![
        spatial("a", vec![10.2, 12.9], vec![0.4, 2.0, 3.7], Some("EPSG:25832")),
        temporal("series", vec![ts(2024, 1, 1, 0)], None),
        spatial("b", vec![11.0], vec![5.1], Some("EPSG:25832")),
    ];

    let grid = builder(IntegrationMode::Spatial).build(&arrays).unwrap();

    // x: 0.39 rounds to 0, 5.11 would round inside 5.1 so it rounds up to 6
    assert_eq!(grid.x(), Some(&[0.0, 1.0, 2.0, 3.0, 4.0, 5.0][..]));
    assert_eq!(grid.y(), Some(&[10.0, 11.0, 12.0][..]));
    assert_eq!(grid.time(), None);
    assert_eq!(grid.dims(), vec![Dim::Y, Dim::X]);
    assert_eq!(grid.shape(), vec![3, 6]);
    assert_eq!(grid.crs(), Some(&Crs::new("EPSG:25832")));
}

#[test]
fn test_spatial_mode_without_spatial_arrays() {
    let arrays = vec![temporal("series", vec![ts(2024, 1, 1, 0)], Some("EPSG:4326"))];
    match builder(IntegrationMode::Spatial).build(&arrays) {
        Err(GeoCubeError::MissingAxis { axis }) => assert_eq!(axis, "x/y"),
        other => panic!("Expected MissingAxis, got {:?}", other),
    }
    match builder(IntegrationMode::Spatiotemporal).build(&arrays) {
        Err(GeoCubeError::MissingAxis { axis }) => assert_eq!(axis, "x/y"),
        other => panic!("Expected MissingAxis, got {:?}", other),
    }
}

#[test]
fn test_temporal_grid() {
    let arrays = vec![
        temporal("a", vec![ts(2024, 1, 3, 0), ts(2024, 1, 1, 0)], Some("EPSG:4326")),
        spatial("no_time", vec![0.0], vec![0.0], Some("EPSG:4326")),
        temporal("b", vec![ts(2024, 1, 5, 0)], None),
    ];

    let grid = builder(IntegrationMode::Temporal).build(&arrays).unwrap();
    assert_eq!(
        grid.time(),
        Some(
            &[
                ts(2024, 1, 1, 0),
                ts(2024, 1, 2, 0),
                ts(2024, 1, 3, 0),
                ts(2024, 1, 4, 0),
                ts(2024, 1, 5, 0)
            ][..]
        )
    );
    assert_eq!(grid.x(), None);
    assert_eq!(grid.y(), None);
    assert_eq!(grid.crs(), None, "temporal grids carry no reference");

    let spatial_only = vec![spatial("a", vec![0.0], vec![0.0], None)];
    match builder(IntegrationMode::Temporal).build(&spatial_only) {
        Err(GeoCubeError::MissingAxis { axis }) => assert_eq!(axis, "time"),
        other => panic!("Expected MissingAxis, got {:?}", other),
    }
}

#[test]
fn test_spatiotemporal_grid() {
    let cube_array = SampleArray::new(
        "stack",
        Axes::spatiotemporal(
            vec![ts(2024, 3, 1, 0), ts(2024, 3, 1, 18)],
            vec![0.5, 1.5],
            vec![0.5, 2.5],
        ),
        Some(Crs::from_epsg(3035)),
    )
    .and_then(|a| a.with_values("t2m", vec![0.0; 8]))
    .unwrap();

    let grid = GridBuilder::new(IntegrationMode::Spatiotemporal, 1.0, "6h".parse().unwrap())
        .unwrap()
        .with_buffer_edge(Some(0.0))
        .unwrap()
        .build(&[cube_array])
        .unwrap();

    assert_eq!(grid.dims(), vec![Dim::Time, Dim::Y, Dim::X]);
    assert_eq!(grid.time().map(<[_]>::len), Some(4));
    assert_eq!(grid.y(), Some(&[0.0, 1.0][..]));
    // 2.5 rounds to 2 which would cut the last sample, so it rounds up to 3
    assert_eq!(grid.x(), Some(&[0.0, 1.0, 2.0][..]));
    assert_eq!(grid.crs(), Some(&Crs::from_epsg(3035)));
}

#[test]
fn test_reference_selection() {
    let arrays = vec![
        spatial("unknown", vec![0.0], vec![0.0], None),
        spatial("utm", vec![1.0], vec![1.0], Some("EPSG:32632")),
        spatial("etrs", vec![2.0], vec![2.0], Some("EPSG:25832")),
    ];

    let first = builder(IntegrationMode::Spatial)
        .with_reference_selection(ReferenceSelection::FirstFound)
        .build(&arrays)
        .unwrap();
    assert_eq!(first.crs(), Some(&Crs::new("EPSG:32632")));

    let lexical = builder(IntegrationMode::Spatial).build(&arrays).unwrap();
    assert_eq!(lexical.crs(), Some(&Crs::new("EPSG:25832")));

    // Lexical selection does not depend on input order
    let reversed: Vec<SampleArray> = arrays.iter().rev().cloned().collect();
    let lexical_rev = builder(IntegrationMode::Spatial).build(&reversed).unwrap();
    assert_eq!(lexical_rev.crs(), lexical.crs());

    let target = builder(IntegrationMode::Spatial)
        .with_target_reference(Some(Crs::from_epsg(3857)))
        .build(&arrays)
        .unwrap();
    assert_eq!(target.crs(), Some(&Crs::from_epsg(3857)));
}

#[test]
fn test_missing_reference() {
    let arrays = vec![spatial("a", vec![0.0, 3.0], vec![0.0, 3.0], None)];
    match builder(IntegrationMode::Spatial).build(&arrays) {
        Err(GeoCubeError::MissingReference) => {}
        other => panic!("Expected MissingReference, got {:?}", other),
    }

    let with_target = builder(IntegrationMode::Spatial)
        .with_target_reference(Some(Crs::from_epsg(4326)))
        .build(&arrays)
        .unwrap();
    assert_eq!(with_target.crs(), Some(&Crs::from_epsg(4326)));
}

#[test]
fn test_invalid_parameters() {
    let precision = "D".parse().unwrap();
    for resolution in [0.0, -1.0, f64::NAN, f64::INFINITY] {
        assert!(matches!(
            GridBuilder::new(IntegrationMode::Spatial, resolution, precision),
            Err(GeoCubeError::InvalidParameter { .. })
        ));
    }
    assert!(matches!(
        builder(IntegrationMode::Spatial).with_buffer_edge(Some(-0.1)),
        Err(GeoCubeError::InvalidParameter { .. })
    ));
    assert!(matches!(
        build_grid(&[], "spatial", 1.0, "fortnightly", None, None),
        Err(GeoCubeError::InvalidPrecision { .. })
    ));
}

#[test]
fn test_unbuffered_axes_start_at_the_raw_minimum() {
    let arrays = vec![spatial("a", vec![3.0, 4.0], vec![0.4, 1.6], Some("EPSG:4326"))];
    let grid = GridBuilder::new(IntegrationMode::Spatial, 0.5, "D".parse().unwrap())
        .unwrap()
        .with_buffer_edge(None)
        .unwrap()
        .build(&arrays)
        .unwrap();

    let x = grid.x().unwrap();
    assert_eq!(x.len(), 3);
    assert_eq!(x[0], 0.4);
    assert!((x[2] - 1.4).abs() < 1e-12);
    assert_eq!(grid.y(), Some(&[3.0, 3.5][..]));
}

#[test]
fn test_degenerate_extent_keeps_one_bin() {
    // A single point with a tiny buffer: 6.99 and 7.01 both round to 7
    let arrays = vec![spatial("point", vec![3.0], vec![7.0], Some("EPSG:4326"))];
    let grid = builder(IntegrationMode::Spatial).build(&arrays).unwrap();
    assert_eq!(grid.x(), Some(&[7.0][..]));
    assert_eq!(grid.y(), Some(&[3.0][..]));

    let unbuffered = builder(IntegrationMode::Spatial)
        .with_buffer_edge(None)
        .unwrap()
        .build(&arrays)
        .unwrap();
    assert_eq!(unbuffered.x(), Some(&[7.0][..]));

    // A buffer of a full resolution step spans two bins
    let grid = builder(IntegrationMode::Spatial)
        .with_buffer_edge(Some(1.0))
        .unwrap()
        .build(&arrays)
        .unwrap();
    assert_eq!(grid.x(), Some(&[6.0, 7.0][..]));
}

#[test]
fn test_single_row_gets_one_bin_on_the_shared_axis() {
    let arrays = vec![
        spatial("a", vec![-12.3], vec![0.4], Some("EPSG:4326")),
        spatial("b", vec![-12.3], vec![3.6], Some("EPSG:4326")),
    ];
    let grid = builder(IntegrationMode::Spatial).build(&arrays).unwrap();
    // -12.31 would round inside the extent, so the lower bound rounds down
    assert_eq!(grid.y(), Some(&[-13.0][..]));
    assert_eq!(grid.x(), Some(&[0.0, 1.0, 2.0, 3.0][..]));
}

#[test]
fn test_grid_axes_are_strictly_increasing() {
    let arrays = vec![
        spatial("a", vec![-40.0, 12.5], vec![100.0, 900.0], Some("EPSG:3035")),
        spatial("b", vec![-3.0], vec![-250.0, 7.0], Some("EPSG:3035")),
    ];
    for resolution in [0.5, 1.0, 7.0, 30.0, 250.0] {
        let grid = GridBuilder::new(IntegrationMode::Spatial, resolution, "D".parse().unwrap())
            .unwrap()
            .build(&arrays)
            .unwrap();
        for axis in [grid.x().unwrap(), grid.y().unwrap()] {
            assert!(!axis.is_empty());
            assert!(axis.windows(2).all(|w| w[0] < w[1]));
        }
        assert!(grid.x().unwrap()[0] <= -250.0);
        assert!(grid.y().unwrap()[0] <= -40.0);
    }

    let bad = Grid::new(Axes::spatial(vec![0.0, 0.0], vec![1.0]), None);
    assert!(matches!(bad, Err(GeoCubeError::InvalidParameter { .. })));
}

#[test]
fn test_axis_filter_reports_skipped_arrays() {
    let arrays = vec![
        spatial("a", vec![0.0], vec![0.0], None),
        temporal("b", vec![ts(2024, 1, 1, 0)], None),
        temporal("c", vec![ts(2024, 1, 2, 0)], None),
    ];

    let filter = AxisFilter::new(&arrays, Dim::Time);
    assert_eq!(filter.kept.len(), 2);
    assert_eq!(filter.skipped.len(), 1);
    assert_eq!(filter.skipped[0].index, 0);
    assert_eq!(filter.skipped[0].name, "a");
    assert_eq!(filter.skipped[0].axis, Dim::Time);
}

#[test]
fn test_build_reports_skipped_arrays() {
    let arrays = vec![
        spatial("map", vec![0.0], vec![0.0], Some("EPSG:4326")),
        temporal("series", vec![ts(2024, 1, 1, 0)], None),
    ];

    let (grid, skipped) = builder(IntegrationMode::Spatial)
        .build_with_report(&arrays)
        .unwrap();
    assert_eq!(grid.x(), Some(&[0.0][..]));
    let listed: Vec<(usize, &str, Dim)> = skipped
        .iter()
        .map(|s| (s.index, s.name.as_str(), s.axis))
        .collect();
    assert_eq!(listed, vec![(1, "series", Dim::X), (1, "series", Dim::Y)]);

    let (_, skipped) = builder(IntegrationMode::Spatiotemporal)
        .build_with_report(&arrays)
        .unwrap();
    assert_eq!(skipped.len(), 3);
    assert!(skipped
        .iter()
        .any(|s| s.index == 0 && s.name == "map" && s.axis == Dim::Time));

    let (_, none_skipped) = builder(IntegrationMode::Spatial)
        .build_with_report(&arrays[..1])
        .unwrap();
    assert!(none_skipped.is_empty());
}
