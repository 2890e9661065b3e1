use std::collections::BTreeMap;

use cv_core::{Crs, GeoTransform, RasterLayer, ThresholdRange, build_mask};
use cv_pipeline::{
    ConfigError, RunConfig, build_combined_mask, process_combined, process_layer, run_all,
};
use geo::Area;

fn utm_10m() -> GeoTransform {
    GeoTransform::north_up(500_000.0, 4_000_000.0, 10.0, 10.0)
}

fn layer_4x4(values: [f32; 16]) -> RasterLayer {
    RasterLayer::from_vec(4, 4, values.to_vec(), utm_10m(), Crs::projected(32633))
        .expect("valid layer")
}

/// 5x5 grid of 0.5 with a 3x3 block of 0.8 at (1..4, 1..4).
fn block_layer() -> RasterLayer {
    let mut data = vec![0.5f32; 25];
    for y in 1..4 {
        for x in 1..4 {
            data[y * 5 + x] = 0.8;
        }
    }
    RasterLayer::from_vec(5, 5, data, utm_10m(), Crs::projected(32633)).expect("valid layer")
}

fn block_config(range: ThresholdRange) -> RunConfig {
    RunConfig::new(0.05, 1.0)
        .with_radii(0, 0)
        .with_threshold("NDVI", range)
}

#[test]
fn single_block_yields_one_polygon() {
    let cfg = block_config(ThresholdRange::new(0.6, 1.0));
    let features = process_layer("NDVI", &block_layer(), &cfg)
        .expect("valid config")
        .expect("one feature");

    assert_eq!(features.len(), 1);
    assert_eq!(features.crs, Crs::projected(32633));
    let feature = &features.features[0];
    assert!((feature.area_ha - 0.09).abs() < 1e-9);
    assert!(feature.geometry.interiors().is_empty());
    assert!((feature.geometry.unsigned_area() - 900.0).abs() < 1e-6);
}

#[test]
fn no_matching_cells_is_empty_not_error() {
    let cfg = block_config(ThresholdRange::new(0.0, 0.4));
    assert_eq!(process_layer("NDVI", &block_layer(), &cfg), Ok(None));
}

#[test]
fn threshold_bounds_are_inclusive_end_to_end() {
    // block edges sit exactly on the bounds
    let mut data = vec![0.0f32; 25];
    for y in 1..4 {
        for x in 1..4 {
            data[y * 5 + x] = if x == 1 { 0.6 } else { 1.0 };
        }
    }
    data[0] = 0.6 - 1e-3;
    data[4] = 1.0 + 1e-3;
    let layer =
        RasterLayer::from_vec(5, 5, data, utm_10m(), Crs::projected(32633)).expect("valid layer");
    let range = ThresholdRange::new(0.6, 1.0);

    let mask = build_mask(&layer, &range);
    assert_eq!(mask.count_ones(), 9);
    assert!(!mask.is_set(0, 0));
    assert!(!mask.is_set(4, 0));

    let features = process_layer("NDVI", &layer, &block_config(range))
        .expect("valid config")
        .expect("one feature");
    assert!((features.features[0].area_ha - 0.09).abs() < 1e-9);
}

#[test]
fn area_range_bounds_are_inclusive() {
    let layer = block_layer();
    let range = ThresholdRange::new(0.6, 1.0);

    // exactly min_area_ha
    let at_min = RunConfig::new(0.09, 1.0)
        .with_radii(0, 0)
        .with_threshold("NDVI", range);
    assert!(process_layer("NDVI", &layer, &at_min).expect("valid").is_some());

    // exactly max_area_ha
    let at_max = RunConfig::new(0.05, 0.09)
        .with_radii(0, 0)
        .with_threshold("NDVI", range);
    assert!(process_layer("NDVI", &layer, &at_max).expect("valid").is_some());

    // one pixel short of the minimum
    let above_min = RunConfig::new(0.1, 1.0)
        .with_radii(0, 0)
        .with_threshold("NDVI", range);
    assert_eq!(process_layer("NDVI", &layer, &above_min), Ok(None));

    let below_max = RunConfig::new(0.05, 0.0899)
        .with_radii(0, 0)
        .with_threshold("NDVI", range);
    assert_eq!(process_layer("NDVI", &layer, &below_max), Ok(None));
}

fn three_layers() -> (BTreeMap<String, RasterLayer>, RunConfig) {
    let ndvi = layer_4x4([
        0.1, 0.7, 0.8, 0.9, //
        0.7, 0.7, 0.2, 0.9, //
        0.9, 0.6, 0.7, 0.1, //
        0.5, 0.8, 0.8, 0.8,
    ]);
    let savi = layer_4x4([
        0.3, 0.4, 0.5, 0.6, //
        0.4, 0.2, 0.3, 0.4, //
        0.45, 0.3, 0.9, 0.35, //
        0.3, 0.5, 0.1, 0.4,
    ]);
    let ndwi = layer_4x4([
        -0.5, -0.2, 0.1, -0.3, //
        -0.1, -0.4, -0.2, 0.2, //
        -0.9, 0.3, -0.1, -0.2, //
        -0.3, -0.6, -0.7, f32::NAN,
    ]);

    let layers = BTreeMap::from([
        ("NDVI".to_string(), ndvi),
        ("SAVI".to_string(), savi),
        ("NDWI".to_string(), ndwi),
    ]);
    let cfg = RunConfig::new(0.01, 1.0)
        .with_radii(0, 0)
        .with_threshold("NDVI", ThresholdRange::new(0.6, 1.0))
        .with_threshold("SAVI", ThresholdRange::new(0.3, 0.5))
        .with_threshold("NDWI", ThresholdRange::new(-1.0, 0.0));
    (layers, cfg)
}

#[test]
fn combined_mask_is_and_of_layer_masks() {
    let (layers, cfg) = three_layers();

    let a = build_mask(&layers["NDVI"], &cfg.threshold_ranges["NDVI"]);
    let b = build_mask(&layers["SAVI"], &cfg.threshold_ranges["SAVI"]);
    let c = build_mask(&layers["NDWI"], &cfg.threshold_ranges["NDWI"]);
    assert_eq!(a.data(), &[0, 1, 1, 1, 1, 1, 0, 1, 1, 1, 1, 0, 0, 1, 1, 1]);
    assert_eq!(b.data(), &[1, 1, 1, 0, 1, 0, 1, 1, 1, 1, 0, 1, 1, 1, 0, 1]);
    assert_eq!(c.data(), &[1, 1, 0, 1, 1, 1, 1, 0, 1, 0, 1, 1, 1, 1, 1, 0]);

    let combined = build_combined_mask(&layers, &cfg).expect("aligned layers");
    assert_eq!(
        combined.data(),
        &[0, 1, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 0, 1, 0, 0]
    );
    assert_eq!(combined.transform(), &utm_10m());
}

#[test]
fn run_all_reports_layers_and_combined() {
    let (layers, cfg) = three_layers();
    let report = run_all(&layers, &cfg).expect("valid run");

    assert_eq!(report.layers.len(), 3);
    let ndvi = report.layers["NDVI"].as_ref().expect("ndvi features");
    assert_eq!(ndvi.len(), 1);
    assert_eq!(ndvi.features[0].geometry.interiors().len(), 1);
    assert!((ndvi.features[0].area_ha - 0.12).abs() < 1e-9);

    // the four combined cells chain diagonally into one region
    let combined = report
        .combined
        .as_ref()
        .expect("aligned layers")
        .as_ref()
        .expect("combined features");
    assert_eq!(combined.len(), 1);
    assert!((combined.features[0].area_ha - 0.04).abs() < 1e-9);

    let names: Vec<&str> = report.outputs().map(|(name, _)| name).collect();
    assert_eq!(names, vec!["NDVI", "NDWI", "SAVI", "Combined"]);
}

#[test]
fn combined_empty_result_is_none() {
    let (layers, mut cfg) = three_layers();
    cfg.min_area_ha = 0.05;
    assert_eq!(process_combined(&layers, &cfg), Ok(None));
}

#[test]
fn misaligned_layers_fail_only_the_combination() {
    let (mut layers, cfg) = three_layers();
    let shifted = RasterLayer::new(
        layers["SAVI"].grid().clone(),
        GeoTransform::north_up(500_010.0, 4_000_000.0, 10.0, 10.0),
        Crs::projected(32633),
    );
    layers.insert("SAVI".into(), shifted);
    let report = run_all(&layers, &cfg).expect("valid config");
    assert!(matches!(
        report.combined,
        Err(ConfigError::TransformMismatch { ref layer, .. }) if layer == "SAVI"
    ));
    assert_eq!(report.layers.len(), 3);
    assert!(report.layers["NDVI"].is_some());

    let (mut layers, cfg) = three_layers();
    let other_crs = RasterLayer::new(
        layers["NDWI"].grid().clone(),
        utm_10m(),
        Crs::projected(32634),
    );
    layers.insert("NDWI".into(), other_crs);
    assert!(matches!(
        process_combined(&layers, &cfg),
        Err(ConfigError::CrsMismatch { .. })
    ));

    let (mut layers, cfg) = three_layers();
    let small = RasterLayer::from_vec(2, 2, vec![0.7; 4], utm_10m(), Crs::projected(32633))
        .expect("valid layer");
    layers.insert("NDVI".into(), small);
    assert!(matches!(
        run_all(&layers, &cfg).expect("valid config").combined,
        Err(ConfigError::ShapeMismatch { .. })
    ));
}

#[test]
fn shifted_layer_keeps_per_layer_features() {
    let a = block_layer();
    let b = RasterLayer::new(
        a.grid().clone(),
        GeoTransform::north_up(500_010.0, 4_000_000.0, 10.0, 10.0),
        Crs::projected(32633),
    );
    let layers = BTreeMap::from([("A".to_string(), a), ("B".to_string(), b)]);
    let cfg = RunConfig::new(0.05, 1.0)
        .with_radii(0, 0)
        .with_threshold("A", ThresholdRange::new(0.6, 1.0))
        .with_threshold("B", ThresholdRange::new(0.6, 1.0));

    let report = run_all(&layers, &cfg).expect("valid config");
    for name in ["A", "B"] {
        let set = report.layers[name].as_ref().expect("one feature per layer");
        assert_eq!(set.len(), 1);
        assert!((set.features[0].area_ha - 0.09).abs() < 1e-9);
    }
    assert!(matches!(
        report.combined,
        Err(ConfigError::TransformMismatch { ref layer, .. }) if layer == "B"
    ));

    // the failed combination is left out of the written outputs
    let names: Vec<&str> = report.outputs().map(|(name, _)| name).collect();
    assert_eq!(names, vec!["A", "B"]);
}

#[test]
fn config_errors_come_before_any_work() {
    let (mut layers, cfg) = three_layers();
    let extra = layers["NDVI"].clone();
    layers.insert("EVI".into(), extra);
    assert_eq!(
        run_all(&layers, &cfg),
        Err(ConfigError::MissingThreshold {
            layer: "EVI".into()
        })
    );

    let (layers, mut cfg) = three_layers();
    cfg.max_area_ha = 0.001;
    assert!(matches!(
        run_all(&layers, &cfg),
        Err(ConfigError::InvalidAreaRange { .. })
    ));
}

#[test]
fn geographic_layer_is_measured_in_utm() {
    // 0.0001 degree cells near 101.5E 2.9N, 10x10 block of candidates
    let transform = GeoTransform::north_up(101.5, 2.9, 0.0001, 0.0001);
    let mut data = vec![0.0f32; 20 * 20];
    for y in 5..15 {
        for x in 5..15 {
            data[y * 20 + x] = 1.0;
        }
    }
    let layer = RasterLayer::from_vec(20, 20, data, transform, Crs::WGS84).expect("valid layer");
    let cfg = RunConfig::new(0.5, 5.0)
        .with_radii(0, 0)
        .with_threshold("NDVI", ThresholdRange::new(0.5, 1.5));

    let features = process_layer("NDVI", &layer, &cfg)
        .expect("valid config")
        .expect("one feature");
    assert_eq!(features.crs, Crs::WGS84);
    assert!((features.features[0].area_ha - 1.2307).abs() < 1e-3);
    // geometry stays in degrees
    assert!((features.features[0].geometry.unsigned_area() - 1e-6).abs() < 1e-12);

    // any registry code with lat/lon axes is measured the same way
    let wgs72: Crs = "EPSG:4322".parse().expect("known code");
    let layer = RasterLayer::new(layer.grid().clone(), transform, wgs72);
    let features = process_layer("NDVI", &layer, &cfg)
        .expect("valid config")
        .expect("one feature");
    assert_eq!(features.crs, wgs72);
    assert!((features.features[0].area_ha - 1.2307).abs() < 1e-3);
}
