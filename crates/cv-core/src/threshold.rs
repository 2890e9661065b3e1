use serde::{Deserialize, Serialize};

use crate::{BinaryMask, RasterLayer};

/// Inclusive value interval `[lo, hi]`, serialized as a two-element array.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct ThresholdRange {
    pub lo: f64,
    pub hi: f64,
}

impl ThresholdRange {
    pub const fn new(lo: f64, hi: f64) -> Self {
        Self { lo, hi }
    }

    /// Both bounds finite and `lo <= hi`.
    pub fn is_valid(&self) -> bool {
        self.lo.is_finite() && self.hi.is_finite() && self.lo <= self.hi
    }

    /// Bounds are compared at sample precision so a sample written as the
    /// same decimal literal as a bound matches it exactly.
    #[inline]
    pub fn contains(&self, v: f32) -> bool {
        v.is_finite() && v >= self.lo as f32 && v <= self.hi as f32
    }
}

impl From<[f64; 2]> for ThresholdRange {
    fn from(v: [f64; 2]) -> Self {
        Self::new(v[0], v[1])
    }
}

impl From<ThresholdRange> for [f64; 2] {
    fn from(r: ThresholdRange) -> Self {
        [r.lo, r.hi]
    }
}

/// Thresholds a layer: `1` where the sample lies in `range`, else `0`.
pub fn build_mask(layer: &RasterLayer, range: &ThresholdRange) -> BinaryMask {
    let grid = layer.grid().map(|&v| u8::from(range.contains(v)));
    BinaryMask::from_image(grid, *layer.transform(), *layer.crs())
}
