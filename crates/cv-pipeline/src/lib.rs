//! Layer processing and multi-layer combination.
//!
//! A layer run thresholds one raster with its configured range, then cleans,
//! size-filters, vectorizes and measures the mask and keeps features inside
//! `[min_area_ha, max_area_ha]`. The combined run ANDs the threshold masks of
//! all layers and runs the same stages once on the intersection.
//!
//! Configuration problems are [`ConfigError`]s; an empty result is `Ok(None)`.

mod combine;
mod config;
mod error;
mod layer;
mod run;

pub use combine::{
    COMBINED_NAME, build_combined_mask, check_alignment, combine_masks, process_combined,
};
pub use config::RunConfig;
pub use error::ConfigError;
pub use layer::{extract_features, process_layer};
pub use run::{RunReport, run_all};
