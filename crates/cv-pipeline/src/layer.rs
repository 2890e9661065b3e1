use cv_area::{AreaError, FeatureSet, SQ_M_PER_HA, compute_areas, pixel_area_m2};
use cv_core::{BinaryMask, RasterLayer, build_mask};
use cv_label::{filter_small_regions, min_region_pixels};
use cv_morph::clean_mask;
use cv_polygon::vectorize;

use crate::{ConfigError, RunConfig};

/// Threshold, clean, size-filter, vectorize and measure one layer.
///
/// `Ok(None)` means no feature survived the area-range filter.
pub fn process_layer(
    name: &str,
    layer: &RasterLayer,
    config: &RunConfig,
) -> Result<Option<FeatureSet>, ConfigError> {
    config.validate()?;
    let range = config.threshold_for(name)?;

    let mask = build_mask(layer, range);
    tracing::debug!(
        layer = name,
        lo = range.lo,
        hi = range.hi,
        candidates = mask.count_ones(),
        "threshold mask"
    );

    let features = extract_features(&mask, config)?;
    Ok(report(name, features))
}

/// Runs cleaning through area filtering on an already built mask.
pub fn extract_features(
    mask: &BinaryMask,
    config: &RunConfig,
) -> Result<FeatureSet, AreaError> {
    let cleaned = clean_mask(mask, config.morph_open_radius, config.morph_close_radius);

    let pixel_area = pixel_area_m2(mask.transform(), mask.crs(), mask.width(), mask.height())?;
    let min_pixels = min_region_pixels(config.min_area_ha, pixel_area);
    if min_pixels <= 1 && pixel_area / SQ_M_PER_HA > config.min_area_ha {
        tracing::warn!(
            pixel_area_m2 = pixel_area,
            min_area_ha = config.min_area_ha,
            "one pixel exceeds the minimum area; the pixel-count pre-filter keeps every region"
        );
    }
    let filtered = filter_small_regions(&cleaned, min_pixels, config.connectivity);

    let polygons = vectorize(&filtered, config.connectivity);
    let traced = polygons.len();
    let features =
        compute_areas(polygons)?.retain_area_range(config.min_area_ha, config.max_area_ha);

    tracing::debug!(
        pixel_area_m2 = pixel_area,
        min_pixels,
        traced,
        kept = features.len(),
        "area filter"
    );
    Ok(features)
}

pub(crate) fn report(name: &str, features: FeatureSet) -> Option<FeatureSet> {
    if features.is_empty() {
        tracing::info!(layer = name, "zero features");
        return None;
    }
    tracing::info!(
        layer = name,
        features = features.len(),
        total_area_ha = features.total_area_ha(),
        "features extracted"
    );
    Some(features)
}
