//! Umbrella crate for the `canopy-vector` workspace.
//!
//! Re-exports every stage: thresholding and grid types ([`cv_core`]),
//! morphology ([`cv_morph`]), region labeling ([`cv_label`]), boundary
//! tracing ([`cv_polygon`]), area measurement ([`cv_area`]) and the layer and
//! combined runs ([`cv_pipeline`]).

pub use cv_area::*;
pub use cv_core::*;
pub use cv_label::*;
pub use cv_morph::*;
pub use cv_pipeline::*;
pub use cv_polygon::*;
