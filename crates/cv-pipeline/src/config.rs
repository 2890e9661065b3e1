use std::collections::BTreeMap;

use cv_core::{Connectivity, ThresholdRange};
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Parameters shared by every per-layer run and the combined run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Inclusive `[lo, hi]` per layer name.
    pub threshold_ranges: BTreeMap<String, ThresholdRange>,
    #[serde(default = "default_radius")]
    pub morph_open_radius: usize,
    #[serde(default = "default_radius")]
    pub morph_close_radius: usize,
    pub min_area_ha: f64,
    pub max_area_ha: f64,
    #[serde(default)]
    pub connectivity: Connectivity,
}

fn default_radius() -> usize {
    1
}

impl RunConfig {
    pub fn new(min_area_ha: f64, max_area_ha: f64) -> Self {
        Self {
            threshold_ranges: BTreeMap::new(),
            morph_open_radius: default_radius(),
            morph_close_radius: default_radius(),
            min_area_ha,
            max_area_ha,
            connectivity: Connectivity::default(),
        }
    }

    pub fn with_threshold(mut self, layer: impl Into<String>, range: ThresholdRange) -> Self {
        self.threshold_ranges.insert(layer.into(), range);
        self
    }

    pub fn with_radii(mut self, open_radius: usize, close_radius: usize) -> Self {
        self.morph_open_radius = open_radius;
        self.morph_close_radius = close_radius;
        self
    }

    pub fn with_connectivity(mut self, connectivity: Connectivity) -> Self {
        self.connectivity = connectivity;
        self
    }

    /// Checks the area bounds and every configured threshold range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let (min, max) = (self.min_area_ha, self.max_area_ha);
        if !(min.is_finite() && max.is_finite() && min > 0.0 && max >= min) {
            return Err(ConfigError::InvalidAreaRange {
                min_area_ha: min,
                max_area_ha: max,
            });
        }
        for (layer, range) in &self.threshold_ranges {
            if !range.is_valid() {
                return Err(ConfigError::InvalidThreshold {
                    layer: layer.clone(),
                    lo: range.lo,
                    hi: range.hi,
                });
            }
        }
        Ok(())
    }

    /// [`validate`](Self::validate) plus a one-to-one match between the
    /// supplied layer names and the configured threshold ranges.
    pub fn validate_for<'a>(
        &self,
        layers: impl IntoIterator<Item = &'a str>,
    ) -> Result<(), ConfigError> {
        self.validate()?;

        let names: Vec<&str> = layers.into_iter().collect();
        if names.is_empty() {
            return Err(ConfigError::NoLayers);
        }
        for name in &names {
            self.threshold_for(name)?;
        }
        if let Some(unused) = self
            .threshold_ranges
            .keys()
            .find(|k| !names.contains(&k.as_str()))
        {
            return Err(ConfigError::UnusedThreshold {
                layer: unused.clone(),
            });
        }
        Ok(())
    }

    pub fn threshold_for(&self, layer: &str) -> Result<&ThresholdRange, ConfigError> {
        self.threshold_ranges
            .get(layer)
            .ok_or_else(|| ConfigError::MissingThreshold {
                layer: layer.to_string(),
            })
    }
}
