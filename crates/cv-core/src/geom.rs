use serde::{Deserialize, Serialize};

/// Affine pixel-to-world mapping, coefficient order `(a, b, c, d, e, f)`:
///
/// ```text
/// x = a * col + b * row + c
/// y = d * col + e * row + f
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 6]", into = "[f64; 6]")]
pub struct GeoTransform {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl GeoTransform {
    pub const IDENTITY: Self = Self::new(1.0, 0.0, 0.0, 0.0, 1.0, 0.0);

    pub const fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    /// North-up transform with the top-left corner at `(origin_x, origin_y)`.
    /// `res_y` is the (positive) cell height; rows grow southwards.
    pub fn north_up(origin_x: f64, origin_y: f64, res_x: f64, res_y: f64) -> Self {
        Self::new(res_x, 0.0, origin_x, 0.0, -res_y, origin_y)
    }

    /// Maps a lattice point (pixel corner for integer inputs) to world coordinates.
    #[inline]
    pub fn apply(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.a * col + self.b * row + self.c,
            self.d * col + self.e * row + self.f,
        )
    }

    /// Cell area in squared CRS units, `|a| * |e|`.
    pub fn pixel_area(&self) -> f64 {
        self.a.abs() * self.e.abs()
    }

    /// Coefficient-wise comparison with a tolerance relative to the pixel size.
    pub fn approx_eq(&self, other: &Self) -> bool {
        let scale = self
            .a
            .abs()
            .max(self.e.abs())
            .max(other.a.abs())
            .max(other.e.abs())
            .max(f64::MIN_POSITIVE);
        let tol = scale * 1e-9;
        self.to_array()
            .iter()
            .zip(other.to_array())
            .all(|(x, y)| (x - y).abs() <= tol)
    }

    pub fn to_array(&self) -> [f64; 6] {
        [self.a, self.b, self.c, self.d, self.e, self.f]
    }
}

impl Default for GeoTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl From<[f64; 6]> for GeoTransform {
    fn from(v: [f64; 6]) -> Self {
        Self::new(v[0], v[1], v[2], v[3], v[4], v[5])
    }
}

impl From<GeoTransform> for [f64; 6] {
    fn from(t: GeoTransform) -> Self {
        t.to_array()
    }
}
