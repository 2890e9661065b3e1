//! Mask-to-polygon vectorization.
//!
//! Every maximal foreground region becomes one [`geo::Polygon`] whose rings
//! run along pixel edges. Enclosed background becomes interior rings.
//!
//! Tracing works on the pixel-corner lattice: each foreground cell edge that
//! faces background is a directed boundary edge with the foreground on its
//! right. Linking the edges into cycles is unambiguous except at a vertex
//! where two foreground cells touch only diagonally; there the configured
//! [`Connectivity`](cv_core::Connectivity) decides whether the ring joins the
//! two cells (`C8`) or keeps them apart (`C4`), which is what makes one traced
//! exterior ring correspond to exactly one labeled region.
//!
//! Output rings are closed and oriented with exteriors counter-clockwise and
//! interiors clockwise in world coordinates.

mod trace;

pub use trace::{PixelRing, trace_rings};

use cv_core::{BinaryMask, Connectivity, Crs, GeoTransform};
use cv_label::label_regions;
use geo::orient::Direction;
use geo::{Coord, LineString, Orient, Polygon};

/// Polygons traced from one mask, in the mask's CRS.
#[derive(Debug, Clone, PartialEq)]
pub struct PolygonSet {
    pub polygons: Vec<Polygon<f64>>,
    pub crs: Crs,
}

impl PolygonSet {
    pub fn empty(crs: Crs) -> Self {
        Self {
            polygons: Vec::new(),
            crs,
        }
    }

    pub fn len(&self) -> usize {
        self.polygons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }
}

/// One polygon per region, ordered by the raster-scan position of each
/// region's first pixel.
pub fn vectorize(mask: &BinaryMask, connectivity: Connectivity) -> PolygonSet {
    let regions = label_regions(mask, connectivity);
    if regions.num_regions() == 0 {
        return PolygonSet::empty(*mask.crs());
    }

    let mut exteriors: Vec<Option<PixelRing>> = vec![None; regions.num_regions()];
    let mut holes: Vec<Vec<PixelRing>> = vec![Vec::new(); regions.num_regions()];

    for ring in trace_rings(mask, connectivity) {
        let (x, y) = ring.inside_pixel;
        let label = regions.label_at(x, y);
        debug_assert!(label > 0, "ring must border a labeled pixel");
        let slot = label as usize - 1;
        if ring.is_exterior() {
            debug_assert!(exteriors[slot].is_none(), "one exterior ring per region");
            exteriors[slot] = Some(ring);
        } else {
            holes[slot].push(ring);
        }
    }

    let transform = mask.transform();
    let polygons: Vec<Polygon<f64>> = exteriors
        .into_iter()
        .zip(holes)
        .filter_map(|(exterior, interiors)| {
            let exterior = exterior?;
            let polygon = Polygon::new(
                to_world(&exterior, transform),
                interiors.iter().map(|r| to_world(r, transform)).collect(),
            );
            Some(polygon.orient(Direction::Default))
        })
        .collect();

    tracing::debug!(
        regions = regions.num_regions(),
        polygons = polygons.len(),
        "vectorized mask"
    );

    PolygonSet {
        polygons,
        crs: *mask.crs(),
    }
}

fn to_world(ring: &PixelRing, transform: &GeoTransform) -> LineString<f64> {
    let mut coords: Vec<Coord<f64>> = ring
        .vertices
        .iter()
        .map(|&(x, y)| {
            let (wx, wy) = transform.apply(x as f64, y as f64);
            Coord { x: wx, y: wy }
        })
        .collect();
    if let Some(&first) = coords.first() {
        coords.push(first);
    }
    LineString::new(coords)
}
