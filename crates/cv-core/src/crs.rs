use std::fmt;
use std::str::FromStr;

use proj4rs::proj::Proj;
use serde::{Deserialize, Serialize};

use crate::Error;

/// Angular (degrees) or linear (metres) axis units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrsKind {
    Geographic,
    Projected,
}

/// Coordinate reference system of a raster or feature set.
///
/// Only the EPSG code and the unit kind are tracked; the engine never
/// reprojects its inputs and only needs to know whether coordinates are
/// degrees (area must be computed in a local projection) or metres.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Crs {
    pub epsg: Option<u32>,
    pub kind: CrsKind,
}

impl Crs {
    pub const WGS84: Self = Self::geographic(4326);

    pub const fn geographic(epsg: u32) -> Self {
        Self {
            epsg: Some(epsg),
            kind: CrsKind::Geographic,
        }
    }

    pub const fn projected(epsg: u32) -> Self {
        Self {
            epsg: Some(epsg),
            kind: CrsKind::Projected,
        }
    }

    /// Projected CRS without an EPSG code (local engineering grid in metres).
    pub const fn local_metric() -> Self {
        Self {
            epsg: None,
            kind: CrsKind::Projected,
        }
    }

    /// Classifies an EPSG code by looking up its PROJ definition; `longlat`
    /// definitions are geographic.
    pub fn from_epsg(epsg: u32) -> Result<Self, Error> {
        let proj = u16::try_from(epsg)
            .ok()
            .and_then(|code| Proj::from_epsg_code(code).ok())
            .ok_or(Error::UnknownEpsg(epsg))?;
        Ok(if proj.is_latlong() {
            Self::geographic(epsg)
        } else {
            Self::projected(epsg)
        })
    }

    pub fn is_geographic(&self) -> bool {
        self.kind == CrsKind::Geographic
    }

    /// OGC URN used by legacy GeoJSON `crs` members.
    pub fn ogc_urn(&self) -> Option<String> {
        self.epsg.map(|code| format!("urn:ogc:def:crs:EPSG::{code}"))
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.epsg {
            Some(code) => write!(f, "EPSG:{code}"),
            None => write!(f, "LOCAL_CS"),
        }
    }
}

impl FromStr for Crs {
    type Err = Error;

    /// Accepts `EPSG:<code>` (case-insensitive) or a bare code.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let code = match trimmed.split_once(':') {
            Some((authority, code)) if authority.eq_ignore_ascii_case("epsg") => code,
            Some(_) => return Err(Error::InvalidCrs(s.to_owned())),
            None => trimmed,
        };
        let code = code
            .trim()
            .parse::<u32>()
            .map_err(|_| Error::InvalidCrs(s.to_owned()))?;
        Self::from_epsg(code)
    }
}
