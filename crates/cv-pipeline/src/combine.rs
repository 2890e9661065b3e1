use std::collections::BTreeMap;

use cv_area::FeatureSet;
use cv_core::{BinaryMask, Crs, GeoTransform, RasterLayer, build_mask};
use rayon::prelude::*;

use crate::layer::{extract_features, report};
use crate::{ConfigError, RunConfig};

pub const COMBINED_NAME: &str = "Combined";

/// Shape, transform and CRS that every combined input must share.
struct Grid<'a> {
    name: &'a str,
    shape: (usize, usize),
    transform: &'a GeoTransform,
    crs: &'a Crs,
}

impl<'a> Grid<'a> {
    fn of_layer(name: &'a str, layer: &'a RasterLayer) -> Self {
        Self {
            name,
            shape: layer.shape(),
            transform: layer.transform(),
            crs: layer.crs(),
        }
    }

    fn of_mask(name: &'a str, mask: &'a BinaryMask) -> Self {
        Self {
            name,
            shape: mask.shape(),
            transform: mask.transform(),
            crs: mask.crs(),
        }
    }

    fn check(&self, reference: &Grid<'_>) -> Result<(), ConfigError> {
        if self.shape != reference.shape {
            return Err(ConfigError::ShapeMismatch {
                layer: self.name.to_string(),
                reference: reference.name.to_string(),
                expected: reference.shape,
                actual: self.shape,
            });
        }
        if !self.transform.approx_eq(reference.transform) {
            return Err(ConfigError::TransformMismatch {
                layer: self.name.to_string(),
                reference: reference.name.to_string(),
                expected: reference.transform.to_array(),
                actual: self.transform.to_array(),
            });
        }
        if self.crs != reference.crs {
            return Err(ConfigError::CrsMismatch {
                layer: self.name.to_string(),
                reference: reference.name.to_string(),
                expected: *reference.crs,
                actual: *self.crs,
            });
        }
        Ok(())
    }
}

fn check_grids<'a>(mut grids: impl Iterator<Item = Grid<'a>>) -> Result<(), ConfigError> {
    let Some(reference) = grids.next() else {
        return Err(ConfigError::NoLayers);
    };
    grids.try_for_each(|g| g.check(&reference))
}

/// Fails unless all layers are pixel-aligned with the first one.
pub fn check_alignment(layers: &BTreeMap<String, RasterLayer>) -> Result<(), ConfigError> {
    check_grids(
        layers
            .iter()
            .map(|(name, layer)| Grid::of_layer(name, layer)),
    )
}

/// Elementwise AND of aligned masks.
pub fn combine_masks<'a>(
    masks: impl IntoIterator<Item = (&'a str, &'a BinaryMask)>,
) -> Result<BinaryMask, ConfigError> {
    let masks: Vec<(&str, &BinaryMask)> = masks.into_iter().collect();
    check_grids(masks.iter().map(|&(name, mask)| Grid::of_mask(name, mask)))?;

    let mut iter = masks.into_iter();
    let Some((_, first)) = iter.next() else {
        return Err(ConfigError::NoLayers);
    };
    let mut combined = first.clone();
    for (name, mask) in iter {
        combined
            .and_assign(mask)
            .map_err(|_| ConfigError::ShapeMismatch {
                layer: name.to_string(),
                reference: COMBINED_NAME.to_string(),
                expected: combined.shape(),
                actual: mask.shape(),
            })?;
    }
    Ok(combined)
}

/// Thresholds every layer with its own range and ANDs the masks.
pub fn build_combined_mask(
    layers: &BTreeMap<String, RasterLayer>,
    config: &RunConfig,
) -> Result<BinaryMask, ConfigError> {
    config.validate_for(layers.keys().map(String::as_str))?;
    check_alignment(layers)?;

    let masks: Vec<(&str, BinaryMask)> = layers
        .par_iter()
        .map(|(name, layer)| -> Result<_, ConfigError> {
            let range = config.threshold_for(name)?;
            Ok((name.as_str(), build_mask(layer, range)))
        })
        .collect::<Result<_, _>>()?;

    let combined = combine_masks(masks.iter().map(|(name, mask)| (*name, mask)))?;
    tracing::debug!(
        layers = masks.len(),
        candidates = combined.count_ones(),
        "combined mask"
    );
    Ok(combined)
}

/// Runs cleaning through area filtering once on the AND of all layer masks.
pub fn process_combined(
    layers: &BTreeMap<String, RasterLayer>,
    config: &RunConfig,
) -> Result<Option<FeatureSet>, ConfigError> {
    let combined = build_combined_mask(layers, config)?;
    let features = extract_features(&combined, config)?;
    Ok(report(COMBINED_NAME, features))
}

#[cfg(test)]
mod tests {
    use cv_core::{BinaryMask, Crs, GeoTransform};

    use crate::{ConfigError, combine_masks};

    fn mask(data: Vec<u8>, transform: GeoTransform, crs: Crs) -> BinaryMask {
        BinaryMask::from_vec(2, 2, data, transform, crs).expect("valid mask")
    }

    #[test]
    fn and_of_masks() {
        let t = GeoTransform::north_up(0.0, 20.0, 10.0, 10.0);
        let crs = Crs::projected(32633);
        let a = mask(vec![1, 1, 0, 1], t, crs);
        let b = mask(vec![1, 0, 1, 1], t, crs);
        let out = combine_masks([("a", &a), ("b", &b)]).expect("aligned");
        assert_eq!(out.data(), &[1, 0, 0, 1]);
        assert_eq!(out.transform(), &t);
    }

    #[test]
    fn misaligned_masks_are_rejected() {
        let t = GeoTransform::north_up(0.0, 20.0, 10.0, 10.0);
        let crs = Crs::projected(32633);
        let a = mask(vec![1; 4], t, crs);

        let shifted = mask(vec![1; 4], GeoTransform::north_up(10.0, 20.0, 10.0, 10.0), crs);
        assert!(matches!(
            combine_masks([("a", &a), ("b", &shifted)]),
            Err(ConfigError::TransformMismatch { ref layer, .. }) if layer == "b"
        ));

        let other_crs = mask(vec![1; 4], t, Crs::projected(32634));
        assert!(matches!(
            combine_masks([("a", &a), ("c", &other_crs)]),
            Err(ConfigError::CrsMismatch { .. })
        ));

        let wide = BinaryMask::from_vec(3, 2, vec![1; 6], t, crs).expect("valid mask");
        assert!(matches!(
            combine_masks([("a", &a), ("w", &wide)]),
            Err(ConfigError::ShapeMismatch { .. })
        ));

        assert_eq!(combine_masks([]), Err(ConfigError::NoLayers));
    }

    #[test]
    fn tiny_transform_noise_is_tolerated() {
        let t = GeoTransform::north_up(0.0, 20.0, 10.0, 10.0);
        let mut noisy = t;
        noisy.c += 1e-12;
        let crs = Crs::projected(32633);
        let a = mask(vec![1; 4], t, crs);
        let b = mask(vec![1; 4], noisy, crs);
        assert!(combine_masks([("a", &a), ("b", &b)]).is_ok());
    }
}
