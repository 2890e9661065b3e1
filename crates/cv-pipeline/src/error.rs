use cv_area::AreaError;
use cv_core::Crs;
use thiserror::Error;

/// Fatal problems that abort a layer or combined run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("no input layers")]
    NoLayers,
    #[error("no threshold range configured for layer `{layer}`")]
    MissingThreshold { layer: String },
    #[error("threshold range configured for `{layer}` but no such layer was supplied")]
    UnusedThreshold { layer: String },
    #[error("invalid threshold range [{lo}, {hi}] for layer `{layer}`")]
    InvalidThreshold { layer: String, lo: f64, hi: f64 },
    #[error("invalid area range: min_area_ha={min_area_ha}, max_area_ha={max_area_ha}")]
    InvalidAreaRange { min_area_ha: f64, max_area_ha: f64 },
    #[error("layer `{layer}` has shape {actual:?}, expected {expected:?} as in `{reference}`")]
    ShapeMismatch {
        layer: String,
        reference: String,
        expected: (usize, usize),
        actual: (usize, usize),
    },
    #[error("layer `{layer}` transform {actual:?} differs from `{reference}` {expected:?}")]
    TransformMismatch {
        layer: String,
        reference: String,
        expected: [f64; 6],
        actual: [f64; 6],
    },
    #[error("layer `{layer}` CRS {actual} differs from `{reference}` CRS {expected}")]
    CrsMismatch {
        layer: String,
        reference: String,
        expected: Crs,
        actual: Crs,
    },
    #[error(transparent)]
    Area(#[from] AreaError),
}
