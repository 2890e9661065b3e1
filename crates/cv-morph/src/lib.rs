//! Binary morphology with disk structuring elements.
//!
//! Pixels are binary with threshold `> 0`; outputs are `0` or `1`.
//! The disk of radius `r` is the set of offsets with `dx² + dy² <= r²`.
//! Cells outside the grid are background: erosion next to the border sees
//! zeros, and closing is evaluated on a grid padded by `r` so it never
//! removes foreground that touches the border.
//!
//! Each disk row is a contiguous span `[-w, w]`, so erosion and dilation test
//! spans against per-row prefix counts instead of visiting every offset.

use cv_core::{BinaryMask, Image, ImageView};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskElement {
    radius: usize,
    /// `half_widths[dy + r]` is the largest `dx` with `dx² + dy² <= r²`.
    half_widths: Vec<usize>,
}

impl DiskElement {
    pub fn new(radius: usize) -> Self {
        let r2 = radius * radius;
        let half_widths = (0..=2 * radius)
            .map(|i| {
                let dy = i.abs_diff(radius);
                isqrt(r2 - dy * dy)
            })
            .collect();
        Self {
            radius,
            half_widths,
        }
    }

    pub fn radius(&self) -> usize {
        self.radius
    }

    pub fn diameter(&self) -> usize {
        2 * self.radius + 1
    }

    /// Number of offsets in the element.
    pub fn area(&self) -> usize {
        self.half_widths.iter().map(|w| 2 * w + 1).sum()
    }

    /// All `(dx, dy)` offsets of the element.
    pub fn offsets(&self) -> impl Iterator<Item = (isize, isize)> + '_ {
        let r = self.radius as isize;
        self.half_widths.iter().enumerate().flat_map(move |(i, &w)| {
            let dy = i as isize - r;
            let w = w as isize;
            (-w..=w).map(move |dx| (dx, dy))
        })
    }

    fn rows(&self) -> impl Iterator<Item = (isize, usize)> + '_ {
        let r = self.radius as isize;
        self.half_widths
            .iter()
            .enumerate()
            .map(move |(i, &w)| (i as isize - r, w))
    }
}

fn isqrt(n: usize) -> usize {
    let mut s = (n as f64).sqrt() as usize;
    while s * s > n {
        s -= 1;
    }
    while (s + 1) * (s + 1) <= n {
        s += 1;
    }
    s
}

/// Per-row prefix counts: `p[y * (w + 1) + x]` = ones in row `y`, columns `[0, x)`.
struct RowCounts {
    width: usize,
    height: usize,
    prefix: Vec<u32>,
}

impl RowCounts {
    fn new(src: &ImageView<'_, u8>) -> Self {
        let width = src.width();
        let height = src.height();
        let mut prefix = Vec::with_capacity((width + 1) * height);
        for row in src.rows() {
            let mut acc = 0u32;
            prefix.push(0);
            for &v in row {
                acc += u32::from(v != 0);
                prefix.push(acc);
            }
        }
        Self {
            width,
            height,
            prefix,
        }
    }

    /// Ones in row `y`, inclusive columns `[x0, x1]`.
    #[inline]
    fn span(&self, y: usize, x0: usize, x1: usize) -> u32 {
        let base = y * (self.width + 1);
        self.prefix[base + x1 + 1] - self.prefix[base + x0]
    }
}

pub fn erode_disk_u8(src: &ImageView<'_, u8>, se: &DiskElement) -> Image<u8> {
    let counts = RowCounts::new(src);
    let (width, height) = (counts.width, counts.height);
    let mut out = Vec::with_capacity(width * height);

    for y in 0..height {
        for x in 0..width {
            let all_set = se.rows().all(|(dy, w)| {
                let ny = y as isize + dy;
                if ny < 0 || ny >= height as isize || x < w || x + w >= width {
                    return false;
                }
                counts.span(ny as usize, x - w, x + w) as usize == 2 * w + 1
            });
            out.push(u8::from(all_set));
        }
    }

    Image::from_vec(width, height, out).expect("one output cell per input cell")
}

pub fn dilate_disk_u8(src: &ImageView<'_, u8>, se: &DiskElement) -> Image<u8> {
    let counts = RowCounts::new(src);
    let (width, height) = (counts.width, counts.height);
    let mut out = Vec::with_capacity(width * height);

    for y in 0..height {
        for x in 0..width {
            let any_set = se.rows().any(|(dy, w)| {
                let ny = y as isize + dy;
                if ny < 0 || ny >= height as isize {
                    return false;
                }
                let x0 = x.saturating_sub(w);
                let x1 = (x + w).min(width - 1);
                counts.span(ny as usize, x0, x1) > 0
            });
            out.push(u8::from(any_set));
        }
    }

    Image::from_vec(width, height, out).expect("one output cell per input cell")
}

/// Erosion followed by dilation. Removes foreground smaller than the disk.
pub fn open_disk_u8(src: &ImageView<'_, u8>, se: &DiskElement) -> Image<u8> {
    let eroded = erode_disk_u8(src, se);
    dilate_disk_u8(&eroded.as_view(), se)
}

/// Dilation followed by erosion. Fills background gaps smaller than the disk.
pub fn close_disk_u8(src: &ImageView<'_, u8>, se: &DiskElement) -> Image<u8> {
    let r = se.radius();
    let (width, height) = (src.width(), src.height());
    let padded_width = width + 2 * r;
    let padded_height = height + 2 * r;

    let mut padded = Image::new_fill(padded_width, padded_height, 0u8);
    for (y, row) in src.rows().enumerate() {
        let start = (y + r) * padded_width + r;
        padded.data_mut()[start..start + width].copy_from_slice(row);
    }

    let dilated = dilate_disk_u8(&padded.as_view(), se);
    let closed = erode_disk_u8(&dilated.as_view(), se);
    let closed = closed.as_view();

    let mut out = Vec::with_capacity(width * height);
    for row in closed.rows().skip(r).take(height) {
        out.extend_from_slice(&row[r..r + width]);
    }
    Image::from_vec(width, height, out).expect("one output cell per input cell")
}

/// Opening with `open_radius`, then closing with `close_radius`.
/// A radius of `0` skips its step.
pub fn clean_mask(mask: &BinaryMask, open_radius: usize, close_radius: usize) -> BinaryMask {
    let before = mask.count_ones();
    let mut grid = mask.grid().clone();

    if open_radius > 0 {
        grid = open_disk_u8(&grid.as_view(), &DiskElement::new(open_radius));
    }
    if close_radius > 0 {
        grid = close_disk_u8(&grid.as_view(), &DiskElement::new(close_radius));
    }

    let cleaned = BinaryMask::from_image(grid, *mask.transform(), *mask.crs());
    tracing::debug!(
        open_radius,
        close_radius,
        before,
        after = cleaned.count_ones(),
        "morphological cleaning"
    );
    cleaned
}
