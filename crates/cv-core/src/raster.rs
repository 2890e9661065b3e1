use crate::{Crs, Error, GeoTransform, Image};

/// Single-band real-valued raster with its georeferencing.
///
/// Transform and CRS are fixed at construction; every mask derived from the
/// layer copies them.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterLayer {
    grid: Image<f32>,
    transform: GeoTransform,
    crs: Crs,
}

impl RasterLayer {
    pub fn new(grid: Image<f32>, transform: GeoTransform, crs: Crs) -> Self {
        Self {
            grid,
            transform,
            crs,
        }
    }

    pub fn from_vec(
        width: usize,
        height: usize,
        data: Vec<f32>,
        transform: GeoTransform,
        crs: Crs,
    ) -> Result<Self, Error> {
        Ok(Self::new(Image::from_vec(width, height, data)?, transform, crs))
    }

    pub fn grid(&self) -> &Image<f32> {
        &self.grid
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn crs(&self) -> &Crs {
        &self.crs
    }

    pub fn width(&self) -> usize {
        self.grid.width()
    }

    pub fn height(&self) -> usize {
        self.grid.height()
    }

    pub fn shape(&self) -> (usize, usize) {
        self.grid.shape()
    }

    /// Minimum and maximum over finite samples, `None` when there are none.
    pub fn finite_range(&self) -> Option<(f32, f32)> {
        self.grid
            .data()
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }
}

/// Grid of `0`/`1` cells sharing the georeferencing of its source layer.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryMask {
    grid: Image<u8>,
    transform: GeoTransform,
    crs: Crs,
}

impl BinaryMask {
    /// Wraps a grid; any non-zero cell becomes `1`.
    pub fn from_image(mut grid: Image<u8>, transform: GeoTransform, crs: Crs) -> Self {
        for v in grid.data_mut() {
            *v = u8::from(*v != 0);
        }
        Self {
            grid,
            transform,
            crs,
        }
    }

    pub fn from_vec(
        width: usize,
        height: usize,
        data: Vec<u8>,
        transform: GeoTransform,
        crs: Crs,
    ) -> Result<Self, Error> {
        Ok(Self::from_image(
            Image::from_vec(width, height, data)?,
            transform,
            crs,
        ))
    }

    pub fn grid(&self) -> &Image<u8> {
        &self.grid
    }

    pub fn data(&self) -> &[u8] {
        self.grid.data()
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn crs(&self) -> &Crs {
        &self.crs
    }

    pub fn width(&self) -> usize {
        self.grid.width()
    }

    pub fn height(&self) -> usize {
        self.grid.height()
    }

    pub fn shape(&self) -> (usize, usize) {
        self.grid.shape()
    }

    pub fn is_set(&self, x: usize, y: usize) -> bool {
        self.grid.get(x, y).is_some_and(|&v| v != 0)
    }

    pub fn count_ones(&self) -> usize {
        self.grid.data().iter().filter(|&&v| v != 0).count()
    }

    /// Elementwise logical AND with `other`, in place.
    pub fn and_assign(&mut self, other: &BinaryMask) -> Result<(), Error> {
        if other.shape() != self.shape() {
            return Err(Error::ShapeMismatch {
                expected: self.shape(),
                actual: other.shape(),
            });
        }
        for (a, &b) in self.grid.data_mut().iter_mut().zip(other.data()) {
            *a &= b;
        }
        Ok(())
    }
}
