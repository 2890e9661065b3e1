use std::collections::BTreeMap;

use cv_area::FeatureSet;
use cv_core::RasterLayer;
use rayon::prelude::*;

use crate::combine::process_combined;
use crate::{COMBINED_NAME, ConfigError, RunConfig, process_layer};

/// Outcome of one batch run. `None` entries had no qualifying features.
///
/// Misaligned layers only fail the combined run; per-layer results are kept.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub layers: BTreeMap<String, Option<FeatureSet>>,
    pub combined: Result<Option<FeatureSet>, ConfigError>,
}

impl RunReport {
    /// Per-layer results followed by the combined one when it ran.
    pub fn outputs(&self) -> impl Iterator<Item = (&str, Option<&FeatureSet>)> {
        let combined = self
            .combined
            .as_ref()
            .ok()
            .map(|set| (COMBINED_NAME, set.as_ref()));
        self.layers
            .iter()
            .map(|(name, set)| (name.as_str(), set.as_ref()))
            .chain(combined)
    }
}

/// Validates the configuration, runs every layer in parallel and finally the
/// combined intersection.
pub fn run_all(
    layers: &BTreeMap<String, RasterLayer>,
    config: &RunConfig,
) -> Result<RunReport, ConfigError> {
    config.validate_for(layers.keys().map(String::as_str))?;

    tracing::info!(
        layers = layers.len(),
        open_radius = config.morph_open_radius,
        close_radius = config.morph_close_radius,
        min_area_ha = config.min_area_ha,
        max_area_ha = config.max_area_ha,
        connectivity = ?config.connectivity,
        "starting run"
    );

    let per_layer = layers
        .par_iter()
        .map(|(name, layer)| -> Result<_, ConfigError> {
            Ok((name.clone(), process_layer(name, layer, config)?))
        })
        .collect::<Result<BTreeMap<_, _>, _>>()?;

    let combined = process_combined(layers, config);
    if let Err(err) = &combined {
        tracing::error!(output = COMBINED_NAME, %err, "combined run aborted");
    }

    Ok(RunReport {
        layers: per_layer,
        combined,
    })
}
