//! Real-world polygon areas in hectares.
//!
//! Projected feature sets are measured directly in their CRS (metres).
//! Geographic feature sets (`x` = longitude, `y` = latitude, degrees) are
//! measured on a projected working copy in the UTM zone of the set's bounding
//! box centre; output geometries stay in degrees.

mod error;
mod utm;

pub use error::AreaError;
pub use utm::{UtmProjection, UtmZone};

use cv_core::{Crs, GeoTransform};
use cv_polygon::PolygonSet;
use geo::{Area, BoundingRect, Coord, MapCoords, Polygon, Rect};
use serde::Serialize;

pub const SQ_M_PER_HA: f64 = 10_000.0;

/// Slack applied to inclusive area-range comparisons.
pub const AREA_TOLERANCE_HA: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub geometry: Polygon<f64>,
    pub area_ha: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSet {
    pub features: Vec<Feature>,
    pub crs: Crs,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureSetSummary {
    pub crs: String,
    pub features: usize,
    pub total_area_ha: f64,
    pub min_area_ha: Option<f64>,
    pub max_area_ha: Option<f64>,
}

impl FeatureSet {
    pub fn empty(crs: Crs) -> Self {
        Self {
            features: Vec::new(),
            crs,
        }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn total_area_ha(&self) -> f64 {
        self.features.iter().map(|f| f.area_ha).sum()
    }

    /// Keeps features with `min_ha <= area_ha <= max_ha`, preserving order.
    pub fn retain_area_range(mut self, min_ha: f64, max_ha: f64) -> Self {
        self.features.retain(|f| {
            f.area_ha >= min_ha - AREA_TOLERANCE_HA && f.area_ha <= max_ha + AREA_TOLERANCE_HA
        });
        self
    }

    pub fn summary(&self) -> FeatureSetSummary {
        let areas = self.features.iter().map(|f| f.area_ha);
        FeatureSetSummary {
            crs: self.crs.to_string(),
            features: self.len(),
            total_area_ha: self.total_area_ha(),
            min_area_ha: areas.clone().reduce(f64::min),
            max_area_ha: areas.reduce(f64::max),
        }
    }
}

/// Attaches `area_ha` to every polygon.
pub fn compute_areas(set: PolygonSet) -> Result<FeatureSet, AreaError> {
    let PolygonSet { polygons, crs } = set;
    if polygons.is_empty() {
        return Ok(FeatureSet::empty(crs));
    }

    let projection = match bounds_center(&polygons) {
        Some(center) if crs.is_geographic() => {
            let zone = UtmZone::for_lon_lat(center.x, center.y);
            tracing::debug!(%crs, utm_epsg = zone.epsg(), "measuring areas in local UTM zone");
            Some(UtmProjection::new(zone)?)
        }
        _ => None,
    };

    let features = polygons
        .into_iter()
        .map(|geometry| -> Result<Feature, AreaError> {
            let area_m2 = match &projection {
                Some(projection) => projected_area_m2(&geometry, projection)?,
                None => geometry.unsigned_area(),
            };
            Ok(Feature {
                geometry,
                area_ha: area_m2 / SQ_M_PER_HA,
            })
        })
        .collect::<Result<_, _>>()?;

    Ok(FeatureSet { features, crs })
}

fn projected_area_m2(
    polygon: &Polygon<f64>,
    projection: &UtmProjection,
) -> Result<f64, AreaError> {
    let projected = polygon.try_map_coords(|Coord { x, y }| {
        let (e, n) = projection.project(x, y)?;
        Ok::<_, AreaError>(Coord { x: e, y: n })
    })?;
    Ok(projected.unsigned_area())
}

fn bounds_center(polygons: &[Polygon<f64>]) -> Option<Coord<f64>> {
    polygons
        .iter()
        .filter_map(|p| p.bounding_rect())
        .reduce(|a, b| {
            Rect::new(
                Coord {
                    x: a.min().x.min(b.min().x),
                    y: a.min().y.min(b.min().y),
                },
                Coord {
                    x: a.max().x.max(b.max().x),
                    y: a.max().y.max(b.max().y),
                },
            )
        })
        .map(|r| r.center())
}

/// Area of one grid cell in square metres.
///
/// Projected CRSs use `|a| * |e|`. For geographic CRSs the cell footprint is
/// projected to the UTM zone of the raster centre at the four corners and the
/// middle of the top and bottom rows; the largest value is returned, so a
/// pixel-count threshold derived from it never exceeds the true one.
pub fn pixel_area_m2(
    transform: &GeoTransform,
    crs: &Crs,
    width: usize,
    height: usize,
) -> Result<f64, AreaError> {
    if !crs.is_geographic() {
        return Ok(transform.pixel_area());
    }

    let (cx, cy) = transform.apply(width as f64 / 2.0, height as f64 / 2.0);
    let projection = UtmProjection::new(UtmZone::for_lon_lat(cx, cy))?;

    let cols = [0, width / 2, width.saturating_sub(1)];
    let rows = [0, height.saturating_sub(1)];
    let mut largest = 0.0_f64;
    for row in rows {
        for col in cols {
            let (col, row) = (col as f64, row as f64);
            let cell = Polygon::new(
                vec![
                    transform.apply(col, row),
                    transform.apply(col + 1.0, row),
                    transform.apply(col + 1.0, row + 1.0),
                    transform.apply(col, row + 1.0),
                    transform.apply(col, row),
                ]
                .into(),
                Vec::new(),
            );
            largest = largest.max(projected_area_m2(&cell, &projection)?);
        }
    }
    Ok(largest)
}
