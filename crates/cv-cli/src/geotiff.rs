//! Single-band GeoTIFF reading.
//!
//! Georeferencing comes from `ModelTransformationTag`, or from
//! `ModelPixelScaleTag` + `ModelTiepointTag`. The CRS is read from the GeoKey
//! directory; only inline (short) key values are used.

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use anyhow::{Context, Result, bail};
use canopy_vector::{Crs, CrsKind, GeoTransform, RasterLayer};
use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;

const GDAL_NODATA_TAG: u16 = 42113;

const GT_MODEL_TYPE: u16 = 1024;
const GT_RASTER_TYPE: u16 = 1025;
const GEOGRAPHIC_TYPE: u16 = 2048;
const PROJECTED_CS_TYPE: u16 = 3072;

const MODEL_TYPE_PROJECTED: u16 = 1;
const MODEL_TYPE_GEOGRAPHIC: u16 = 2;
const RASTER_PIXEL_IS_POINT: u16 = 2;
const USER_DEFINED: u16 = 32767;

#[derive(Debug, Clone)]
pub struct GeoTiff {
    pub layer: RasterLayer,
    pub nodata: Option<f64>,
    pub bands: usize,
}

pub fn read_geotiff(path: &Path, crs_override: Option<Crs>) -> Result<GeoTiff> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    read_geotiff_from(BufReader::new(file), crs_override)
        .with_context(|| format!("reading GeoTIFF {}", path.display()))
}

pub fn read_geotiff_from<R: Read + Seek>(reader: R, crs_override: Option<Crs>) -> Result<GeoTiff> {
    let mut decoder = Decoder::new(reader).context("decoding TIFF header")?;
    let (width, height) = decoder.dimensions().context("reading dimensions")?;
    let (width, height) = (width as usize, height as usize);

    let geokeys = match decoder.find_tag(Tag::GeoKeyDirectoryTag)? {
        Some(v) => parse_geokeys(&v.into_u16_vec()?),
        None => Vec::new(),
    };

    let transform = match decoder.find_tag(Tag::ModelTransformationTag)? {
        Some(v) => transform_from_matrix(&v.into_f64_vec()?)?,
        None => {
            let scale = decoder
                .find_tag(Tag::ModelPixelScaleTag)?
                .context("missing ModelPixelScaleTag and ModelTransformationTag")?
                .into_f64_vec()?;
            let tiepoint = decoder
                .find_tag(Tag::ModelTiepointTag)?
                .context("missing ModelTiepointTag")?
                .into_f64_vec()?;
            transform_from_tiepoint(&scale, &tiepoint)?
        }
    };
    let transform = if geokey(&geokeys, GT_RASTER_TYPE) == Some(RASTER_PIXEL_IS_POINT) {
        shift_half_pixel(transform)
    } else {
        transform
    };

    let crs = match crs_override.or_else(|| crs_from_geokeys(&geokeys)) {
        Some(crs) => crs,
        None => bail!("no CRS in GeoKey directory; pass --crs"),
    };

    let nodata = match decoder.find_tag(Tag::from_u16_exhaustive(GDAL_NODATA_TAG))? {
        Some(v) => parse_nodata(&v.into_string()?),
        None => None,
    };

    let samples = match decoder.read_image().context("decoding samples")? {
        DecodingResult::U8(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::U16(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::I16(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::U32(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::I32(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::F32(v) => v,
        DecodingResult::F64(v) => v.into_iter().map(|x| x as f32).collect(),
        _ => bail!("unsupported sample format"),
    };

    let pixels = width * height;
    if pixels == 0 || samples.len() % pixels != 0 {
        bail!(
            "{} samples do not fill a {width}x{height} grid",
            samples.len()
        );
    }
    let bands = samples.len() / pixels;
    let mut data: Vec<f32> = if bands > 1 {
        tracing::warn!(bands, "multi-band raster, using band 1");
        samples.into_iter().step_by(bands).collect()
    } else {
        samples
    };

    if let Some(nd) = nodata {
        let nd = nd as f32;
        for v in data.iter_mut().filter(|v| **v == nd) {
            *v = f32::NAN;
        }
    }

    let layer = RasterLayer::from_vec(width, height, data, transform, crs)?;
    Ok(GeoTiff {
        layer,
        nodata,
        bands,
    })
}

/// Row-major 4x4 model transformation matrix.
fn transform_from_matrix(m: &[f64]) -> Result<GeoTransform> {
    if m.len() < 16 {
        bail!("ModelTransformationTag has {} values, expected 16", m.len());
    }
    Ok(GeoTransform::new(m[0], m[1], m[3], m[4], m[5], m[7]))
}

/// North-up transform from pixel scale `(sx, sy, sz)` and the first tiepoint
/// `(i, j, k, x, y, z)`.
fn transform_from_tiepoint(scale: &[f64], tiepoint: &[f64]) -> Result<GeoTransform> {
    if scale.len() < 2 || tiepoint.len() < 6 {
        bail!("malformed ModelPixelScaleTag / ModelTiepointTag");
    }
    let (sx, sy) = (scale[0], scale[1]);
    let (i, j, x, y) = (tiepoint[0], tiepoint[1], tiepoint[3], tiepoint[4]);
    Ok(GeoTransform::new(sx, 0.0, x - i * sx, 0.0, -sy, y + j * sy))
}

/// PixelIsPoint rasters reference pixel centres; move the origin to the corner.
fn shift_half_pixel(t: GeoTransform) -> GeoTransform {
    let (c, f) = t.apply(-0.5, -0.5);
    GeoTransform { c, f, ..t }
}

/// `(key id, value)` pairs for keys stored inline in the directory.
fn parse_geokeys(dir: &[u16]) -> Vec<(u16, u16)> {
    let Some(&count) = dir.get(3) else {
        return Vec::new();
    };
    dir[4..]
        .chunks_exact(4)
        .take(count as usize)
        .filter(|entry| entry[1] == 0)
        .map(|entry| (entry[0], entry[3]))
        .collect()
}

fn geokey(keys: &[(u16, u16)], id: u16) -> Option<u16> {
    keys.iter().find(|(k, _)| *k == id).map(|&(_, v)| v)
}

fn crs_from_geokeys(keys: &[(u16, u16)]) -> Option<Crs> {
    let code = |id| geokey(keys, id).filter(|&c| c != USER_DEFINED);

    if let Some(epsg) = code(PROJECTED_CS_TYPE) {
        return Some(Crs::projected(epsg.into()));
    }
    match geokey(keys, GT_MODEL_TYPE) {
        Some(MODEL_TYPE_PROJECTED) => Some(Crs::local_metric()),
        Some(MODEL_TYPE_GEOGRAPHIC) => Some(match code(GEOGRAPHIC_TYPE) {
            Some(epsg) => Crs::geographic(epsg.into()),
            None => Crs {
                epsg: None,
                kind: CrsKind::Geographic,
            },
        }),
        _ => code(GEOGRAPHIC_TYPE).map(|epsg| Crs::geographic(epsg.into())),
    }
}

fn parse_nodata(s: &str) -> Option<f64> {
    s.trim_matches(|c: char| c == '\0' || c.is_whitespace())
        .parse()
        .ok()
}
