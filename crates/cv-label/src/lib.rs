//! Connected-component labeling of binary masks and the pixel-count
//! pre-filter that drops regions too small to reach the minimum area.
//!
//! Labels are assigned in raster-scan order of each region's first pixel,
//! starting at `1`; background stays `0`.

use cv_core::{BinaryMask, Connectivity, Image};

const SQ_M_PER_HA: f64 = 10_000.0;

#[derive(Debug, Clone, PartialEq)]
pub struct RegionLabels {
    labels: Image<u32>,
    sizes: Vec<usize>,
}

impl RegionLabels {
    pub fn labels(&self) -> &Image<u32> {
        &self.labels
    }

    pub fn num_regions(&self) -> usize {
        self.sizes.len()
    }

    /// Pixel count of `label`; `0` for background or unknown labels.
    pub fn size(&self, label: u32) -> usize {
        match label {
            0 => 0,
            l => self.sizes.get(l as usize - 1).copied().unwrap_or(0),
        }
    }

    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    pub fn label_at(&self, x: usize, y: usize) -> u32 {
        self.labels.get(x, y).copied().unwrap_or(0)
    }
}

pub fn label_regions(mask: &BinaryMask, connectivity: Connectivity) -> RegionLabels {
    let (width, height) = mask.shape();
    let occupancy = mask.data();
    let mut grid = Image::new_fill(width, height, 0u32);
    let labels = grid.data_mut();
    let mut sizes = Vec::new();
    let mut stack = Vec::new();

    for i in 0..occupancy.len() {
        if occupancy[i] == 0 || labels[i] != 0 {
            continue;
        }

        let label = sizes.len() as u32 + 1;
        let mut size = 0usize;
        labels[i] = label;
        stack.push(i);

        while let Some(p) = stack.pop() {
            size += 1;
            for (dx, dy) in connectivity.offsets() {
                let Some(nb) = Connectivity::neighbor(p, dx, dy, width, height) else {
                    continue;
                };
                if occupancy[nb] != 0 && labels[nb] == 0 {
                    labels[nb] = label;
                    stack.push(nb);
                }
            }
        }

        sizes.push(size);
    }

    RegionLabels {
        labels: grid,
        sizes,
    }
}

/// `ceil(min_area_ha * 10000 / pixel_area_m2)`.
///
/// Quotients within `1e-9` (relative) of an integer snap to it, so a
/// threshold that is an exact pixel multiple in decimal is not bumped up by
/// binary rounding. Returns `0` (keep everything) for a degenerate pixel area.
pub fn min_region_pixels(min_area_ha: f64, pixel_area_m2: f64) -> usize {
    if !(pixel_area_m2 > 0.0 && pixel_area_m2.is_finite()) || !(min_area_ha > 0.0) {
        return 0;
    }

    let raw = min_area_ha * SQ_M_PER_HA / pixel_area_m2;
    let nearest = raw.round();
    let pixels = if (raw - nearest).abs() <= 1e-9 * raw.max(1.0) {
        nearest
    } else {
        raw.ceil()
    };
    pixels as usize
}

/// Zeroes every region with fewer than `min_pixels` cells.
pub fn filter_small_regions(
    mask: &BinaryMask,
    min_pixels: usize,
    connectivity: Connectivity,
) -> BinaryMask {
    let regions = label_regions(mask, connectivity);
    let kept = regions.sizes.iter().filter(|&&s| s >= min_pixels).count();

    let grid = regions
        .labels
        .map(|&l| u8::from(l != 0 && regions.size(l) >= min_pixels));

    tracing::debug!(
        regions = regions.num_regions(),
        kept,
        min_pixels,
        "region size filter"
    );

    BinaryMask::from_image(grid, *mask.transform(), *mask.crs())
}
