//! Local UTM zones on WGS84 and the `proj4rs` projection into them.

use proj4rs::proj::Proj;
use proj4rs::transform::transform;

use crate::AreaError;

const WGS84_LONLAT: &str = "+proj=longlat +datum=WGS84 +no_defs";

/// A UTM zone on the WGS84 ellipsoid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UtmZone {
    pub number: u8,
    pub north: bool,
}

impl UtmZone {
    /// Zone containing `(lon, lat)` in degrees. Longitudes wrap.
    pub fn for_lon_lat(lon: f64, lat: f64) -> Self {
        let lon = (lon + 180.0).rem_euclid(360.0) - 180.0;
        let number = (((lon + 180.0) / 6.0).floor() as i64).rem_euclid(60) as u8 + 1;
        Self {
            number,
            north: lat >= 0.0,
        }
    }

    /// `326xx` (north) or `327xx` (south).
    pub fn epsg(&self) -> u32 {
        let base = if self.north { 32_600 } else { 32_700 };
        base + u32::from(self.number)
    }

    pub fn central_meridian(&self) -> f64 {
        f64::from(self.number) * 6.0 - 183.0
    }

    /// PROJ definition of the zone.
    pub fn proj_string(&self) -> String {
        let south = if self.north { "" } else { " +south" };
        format!(
            "+proj=utm +zone={}{south} +datum=WGS84 +units=m +no_defs",
            self.number
        )
    }
}

/// WGS84 longitude/latitude to one UTM zone.
pub struct UtmProjection {
    zone: UtmZone,
    lonlat: Proj,
    utm: Proj,
}

impl UtmProjection {
    pub fn new(zone: UtmZone) -> Result<Self, AreaError> {
        Ok(Self {
            zone,
            lonlat: parse_definition(WGS84_LONLAT)?,
            utm: parse_definition(&zone.proj_string())?,
        })
    }

    pub fn zone(&self) -> UtmZone {
        self.zone
    }

    /// Projects `(lon, lat)` degrees to `(easting, northing)` metres.
    pub fn project(&self, lon: f64, lat: f64) -> Result<(f64, f64), AreaError> {
        let mut point = (lon.to_radians(), lat.to_radians(), 0.0);
        transform(&self.lonlat, &self.utm, &mut point).map_err(|err| AreaError::Transform {
            epsg: self.zone.epsg(),
            lon,
            lat,
            message: err.to_string(),
        })?;
        Ok((point.0, point.1))
    }
}

fn parse_definition(definition: &str) -> Result<Proj, AreaError> {
    Proj::from_proj_string(definition).map_err(|err| AreaError::Definition {
        definition: definition.to_owned(),
        message: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::{UtmProjection, UtmZone};

    fn projection(number: u8, north: bool) -> UtmProjection {
        UtmProjection::new(UtmZone { number, north }).expect("valid zone")
    }

    #[test]
    fn zone_selection() {
        assert_eq!(UtmZone::for_lon_lat(3.0, 0.0).epsg(), 32631);
        assert_eq!(UtmZone::for_lon_lat(-0.1, -1.0).epsg(), 32730);
        assert_eq!(UtmZone::for_lon_lat(101.5, 2.9).epsg(), 32647);
        assert_eq!(UtmZone::for_lon_lat(180.0, 10.0).number, 1);
        assert_eq!(UtmZone::for_lon_lat(-180.0, 10.0).number, 1);
        assert_eq!(UtmZone::for_lon_lat(179.9, 10.0).number, 60);
        assert_eq!(UtmZone::for_lon_lat(3.0, 0.0).central_meridian(), 3.0);
    }

    #[test]
    fn proj_definitions() {
        assert_eq!(
            UtmZone::for_lon_lat(101.5, 2.9).proj_string(),
            "+proj=utm +zone=47 +datum=WGS84 +units=m +no_defs"
        );
        assert_eq!(
            UtmZone::for_lon_lat(-47.0, -15.0).proj_string(),
            "+proj=utm +zone=23 +south +datum=WGS84 +units=m +no_defs"
        );
    }

    #[test]
    fn central_meridian_on_equator_is_false_origin() {
        let (e, n) = projection(31, true).project(3.0, 0.0).expect("in range");
        assert!((e - 500_000.0).abs() < 1e-3, "easting {e}");
        assert!(n.abs() < 1e-3, "northing {n}");

        let (_, n) = projection(31, false).project(3.0, 0.0).expect("in range");
        assert!((n - 10_000_000.0).abs() < 1e-3, "northing {n}");
    }

    #[test]
    fn reference_point_origin_in_zone_31() {
        // (0°E, 0°N) in UTM 31N
        let (e, n) = projection(31, true).project(0.0, 0.0).expect("in range");
        assert!((e - 166_021.443).abs() < 0.01, "easting {e}");
        assert!(n.abs() < 1e-3, "northing {n}");
    }

    #[test]
    fn symmetric_about_central_meridian() {
        let utm = projection(32, true);
        assert_eq!(utm.zone().epsg(), 32632);
        let (e1, n1) = utm.project(8.0, 45.0).expect("in range");
        let (e2, n2) = utm.project(10.0, 45.0).expect("in range");
        assert!((e1 + e2 - 1_000_000.0).abs() < 1e-3);
        assert!((n1 - n2).abs() < 1e-3);
    }
}
