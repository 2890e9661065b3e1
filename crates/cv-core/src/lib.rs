//! Foundational types for the canopy vectorization engine.
//!
//! ## Grids
//! [`Image`] is a dense row-major grid addressed as `(x, y)` = `(col, row)`.
//! [`ImageView`] borrows one for row-wise kernels.
//!
//! ## Georeferencing
//! A [`GeoTransform`] maps pixel-corner lattice coordinates `(col, row)` to
//! world coordinates using the six affine coefficients `(a, b, c, d, e, f)`:
//! `x = a*col + b*row + c`, `y = d*col + e*row + f`. Pixel `(col, row)` covers
//! the lattice square `[col, col + 1] x [row, row + 1]`.
//!
//! ## Masks
//! [`BinaryMask`] cells are `0` or `1`. Masks inherit shape, transform and
//! [`Crs`] from the [`RasterLayer`] they were thresholded from.

mod connectivity;
mod crs;
mod error;
mod geom;
mod image;
mod raster;
mod threshold;

pub use connectivity::Connectivity;
pub use crs::{Crs, CrsKind};
pub use error::Error;
pub use geom::GeoTransform;
pub use image::{Image, ImageView};
pub use raster::{BinaryMask, RasterLayer};
pub use threshold::{ThresholdRange, build_mask};
