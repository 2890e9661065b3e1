use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use canopy_vector::{BinaryMask, FeatureSet, FeatureSetSummary};
use geojson::{Feature, FeatureCollection, Geometry, JsonObject};
use image::GrayImage;
use serde::Serialize;
use serde_json::json;

#[derive(Debug, Clone, Serialize)]
pub struct OutputSummary {
    pub file: Option<String>,
    #[serde(flatten)]
    pub summary: FeatureSetSummary,
}

pub fn feature_collection(set: &FeatureSet) -> FeatureCollection {
    let features = set
        .features
        .iter()
        .enumerate()
        .map(|(id, f)| {
            let mut properties = JsonObject::new();
            properties.insert("id".to_string(), json!(id));
            properties.insert("area_ha".to_string(), json!(f.area_ha));
            Feature {
                bbox: None,
                geometry: Some(Geometry::new(geojson::Value::from(&f.geometry))),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();

    let foreign_members = set.crs.ogc_urn().map(|urn| {
        let mut members = JsonObject::new();
        members.insert(
            "crs".to_string(),
            json!({ "type": "name", "properties": { "name": urn } }),
        );
        members
    });

    FeatureCollection {
        bbox: None,
        features,
        foreign_members,
    }
}

pub fn write_geojson(path: &Path, set: &FeatureSet) -> Result<()> {
    write_json(path, &feature_collection(set))
}

pub fn save_mask_png(path: &Path, mask: &BinaryMask) -> Result<()> {
    let (width, height) = mask.shape();
    let data: Vec<u8> = mask.data().iter().map(|&v| v * 255).collect();
    let img = GrayImage::from_raw(width as u32, height as u32, data)
        .context("constructing GrayImage from mask")?;
    img.save(path)
        .with_context(|| format!("saving image {}", path.display()))
}

pub fn write_json(path: &Path, value: &impl Serialize) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(value).context("serializing json")?;
    fs::write(path, bytes).with_context(|| format!("writing json {}", path.display()))
}

pub fn read_json<T: for<'de> serde::Deserialize<'de>>(path: &Path) -> Result<T> {
    let data = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_slice(&data).with_context(|| format!("parsing json {}", path.display()))
}

#[cfg(test)]
mod tests {
    use canopy_vector::{Crs, Feature, FeatureSet};
    use geo::polygon;

    use super::feature_collection;

    #[test]
    fn features_carry_id_area_and_crs() {
        let set = FeatureSet {
            features: vec![Feature {
                geometry: polygon![
                    (x: 0.0, y: 0.0),
                    (x: 30.0, y: 0.0),
                    (x: 30.0, y: 30.0),
                    (x: 0.0, y: 30.0),
                    (x: 0.0, y: 0.0),
                ],
                area_ha: 0.09,
            }],
            crs: Crs::projected(32633),
        };

        let fc = feature_collection(&set);
        assert_eq!(fc.features.len(), 1);
        let props = fc.features[0].properties.as_ref().expect("properties");
        assert_eq!(props["id"], 0);
        assert_eq!(props["area_ha"], 0.09);

        let json = serde_json::to_value(&fc).expect("serialize");
        assert_eq!(json["type"], "FeatureCollection");
        assert_eq!(
            json["crs"]["properties"]["name"],
            "urn:ogc:def:crs:EPSG::32633"
        );
        assert_eq!(json["features"][0]["geometry"]["type"], "Polygon");
        assert_eq!(
            json["features"][0]["geometry"]["coordinates"][0]
                .as_array()
                .map(Vec::len),
            Some(5)
        );
    }

    #[test]
    fn local_crs_has_no_crs_member() {
        let fc = feature_collection(&FeatureSet::empty(Crs::local_metric()));
        assert!(fc.foreign_members.is_none());
        assert!(fc.features.is_empty());
    }
}
