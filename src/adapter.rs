//! Conversion between GeoJSON features and planar `geo` polygons.
//!
//! Only Polygon and MultiPolygon features are usable. Anything else (points,
//! lines, geometry collections, features without geometry) is dropped
//! without error; a collection left with no usable features is rejected.

use geo::{Coord, LineString, MultiPolygon, Polygon};
use geojson::{Feature, FeatureCollection, GeoJson, Geometry as GeoJsonGeometry, Value as GeoJsonValue};
use log::{debug, warn};

use crate::error::{GridError, Result};

/// A feature whose geometry was converted to a planar MultiPolygon.
///
/// Keeps a borrow of the source feature so callers can reach its properties.
pub struct PolygonFeature<'a> {
    pub source: &'a Feature,
    pub geometry: MultiPolygon<f64>,
    pub has_z: bool,
}

/// Parse a GeoJSON FeatureCollection from text.
pub fn parse_feature_collection(text: &str) -> Result<FeatureCollection> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    if value.get("features").is_none() {
        return Err(GridError::invalid("FeatureCollection has no 'features' member"));
    }
    match GeoJson::from_json_value(value)? {
        GeoJson::FeatureCollection(fc) => Ok(fc),
        _ => Err(GridError::invalid("expected a FeatureCollection")),
    }
}

/// Convert every polygonal feature in the collection, in order.
pub fn adapt_features(fc: &FeatureCollection) -> Result<Vec<PolygonFeature<'_>>> {
    let mut adapted = Vec::with_capacity(fc.features.len());
    let mut dropped = 0usize;

    for feature in &fc.features {
        let Some(geometry) = &feature.geometry else {
            dropped += 1;
            continue;
        };
        let (polygons, has_z) = match &geometry.value {
            GeoJsonValue::Polygon(rings) => (vec![to_polygon(rings)?], has_z_ordinate(rings)),
            GeoJsonValue::MultiPolygon(polygons) => {
                let has_z = polygons.iter().any(|rings| has_z_ordinate(rings));
                let polygons = polygons.iter()
                    .map(|rings| to_polygon(rings))
                    .collect::<Result<Vec<_>>>()?;
                (polygons, has_z)
            },
            _ => {
                dropped += 1;
                continue;
            },
        };
        adapted.push(PolygonFeature {
            source: feature,
            geometry: MultiPolygon(polygons),
            has_z,
        });
    }

    if dropped > 0 {
        warn!("Dropped {} feature(s) without Polygon or MultiPolygon geometry", dropped);
    }
    if adapted.is_empty() {
        return Err(GridError::invalid(
            "FeatureCollection contains no Polygon or MultiPolygon features",
        ));
    }
    debug!("Adapted {} of {} features", adapted.len(), fc.features.len());
    Ok(adapted)
}

fn has_z_ordinate(rings: &[Vec<Vec<f64>>]) -> bool {
    rings.iter().flatten().any(|position| position.len() > 2)
}

fn to_coord(position: &[f64]) -> Result<Coord<f64>> {
    match position {
        [x, y, ..] if x.is_finite() && y.is_finite() => Ok(Coord { x: *x, y: *y }),
        [_, _, ..] => Err(GridError::invalid(format!(
            "position {:?} has a non-finite ordinate", position
        ))),
        _ => Err(GridError::invalid(format!(
            "position must have at least two ordinates, found {}", position.len()
        ))),
    }
}

fn to_ring(ring: &[Vec<f64>]) -> Result<LineString<f64>> {
    ring.iter()
        .map(|position| to_coord(position))
        .collect::<Result<Vec<_>>>()
        .map(LineString::new)
}

/// Any z ordinate is discarded here; the planar model is strictly 2D.
fn to_polygon(rings: &[Vec<Vec<f64>>]) -> Result<Polygon<f64>> {
    let (exterior, holes) = rings.split_first()
        .ok_or_else(|| GridError::invalid("Polygon has no exterior ring"))?;
    let holes = holes.iter()
        .map(|ring| to_ring(ring))
        .collect::<Result<Vec<_>>>()?;
    Ok(Polygon::new(to_ring(exterior)?, holes))
}

fn polygon_rings(polygon: &Polygon<f64>) -> Vec<Vec<Vec<f64>>> {
    std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .map(|ring| ring.coords().map(|c| vec![c.x, c.y]).collect())
        .collect()
}

/// Serialize a MultiPolygon as a 2D GeoJSON MultiPolygon geometry.
pub fn multi_polygon_to_geojson(multi_polygon: &MultiPolygon<f64>) -> GeoJsonGeometry {
    GeoJsonGeometry::new(GeoJsonValue::MultiPolygon(
        multi_polygon.0.iter().map(polygon_rings).collect(),
    ))
}

/// Wrap a geometry in a feature collection, e.g. to feed a merge result back in.
pub fn multi_polygon_to_feature_collection(multi_polygon: &MultiPolygon<f64>) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features: vec![Feature {
            bbox: None,
            geometry: Some(multi_polygon_to_geojson(multi_polygon)),
            id: None,
            properties: Some(serde_json::Map::new()),
            foreign_members: None,
        }],
        foreign_members: None,
    }
}

/// Read the SRID declared by a legacy `crs` member, if any.
pub fn declared_srid(fc: &FeatureCollection) -> Result<Option<u32>> {
    let Some(crs) = fc.foreign_members.as_ref().and_then(|members| members.get("crs")) else {
        return Ok(None);
    };
    let name = crs.pointer("/properties/name")
        .and_then(|name| name.as_str())
        .ok_or_else(|| GridError::invalid("'crs' member has no properties.name"))?;

    if name.ends_with("CRS84") {
        return Ok(Some(4326));
    }
    name.rsplit(':')
        .next()
        .and_then(|code| code.parse::<u32>().ok())
        .map(Some)
        .ok_or_else(|| GridError::invalid(format!("unrecognised crs name '{}'", name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn collection(value: serde_json::Value) -> FeatureCollection {
        parse_feature_collection(&value.to_string()).unwrap()
    }

    #[test]
    fn missing_features_member_is_rejected() {
        let err = parse_feature_collection(r#"{"type": "FeatureCollection"}"#).unwrap_err();
        assert!(err.message().contains("features"));
    }

    #[test]
    fn garbage_text_is_invalid_geojson() {
        assert!(matches!(
            parse_feature_collection("not json"),
            Err(GridError::InvalidGeoJson(_))
        ));
    }

    #[test]
    fn non_polygonal_features_are_dropped() {
        let fc = collection(json!({
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "properties": {},
                 "geometry": {"type": "Point", "coordinates": [1.0, 2.0]}},
                {"type": "Feature", "properties": {"name": "square"},
                 "geometry": {"type": "Polygon",
                              "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [0.0, 0.0]]]}}
            ]
        }));
        let adapted = adapt_features(&fc).unwrap();
        assert_eq!(adapted.len(), 1);
        assert_eq!(adapted[0].geometry.0.len(), 1);
        assert!(!adapted[0].has_z);
        assert_eq!(adapted[0].source.property("name"), Some(&json!("square")));
    }

    #[test]
    fn z_ordinates_are_detected_and_dropped() {
        let fc = collection(json!({
            "type": "FeatureCollection",
            "features": [{"type": "Feature", "properties": {},
                "geometry": {"type": "MultiPolygon", "coordinates": [
                    [[[0.0, 0.0, 5.0], [1.0, 0.0, 5.0], [1.0, 1.0, 5.0], [0.0, 0.0, 5.0]]]
                ]}}]
        }));
        let adapted = adapt_features(&fc).unwrap();
        assert!(adapted[0].has_z);
        match multi_polygon_to_geojson(&adapted[0].geometry).value {
            GeoJsonValue::MultiPolygon(polygons) => {
                assert!(polygons.iter().flatten().flatten().all(|p| p.len() == 2));
            },
            other => panic!("unexpected geometry {:?}", other),
        }
    }

    #[test]
    fn polygon_without_rings_is_rejected() {
        let fc = collection(json!({
            "type": "FeatureCollection",
            "features": [{"type": "Feature", "properties": {},
                "geometry": {"type": "Polygon", "coordinates": []}}]
        }));
        assert!(adapt_features(&fc).is_err());
    }

    #[test]
    fn crs_names_are_recognised() {
        let mut fc = collection(json!({
            "type": "FeatureCollection",
            "crs": {"type": "name", "properties": {"name": "urn:ogc:def:crs:EPSG::3857"}},
            "features": []
        }));
        assert_eq!(declared_srid(&fc).unwrap(), Some(3857));

        fc.foreign_members = None;
        assert_eq!(declared_srid(&fc).unwrap(), None);

        let fc = collection(json!({
            "type": "FeatureCollection",
            "crs": {"type": "name", "properties": {"name": "urn:ogc:def:crs:OGC:1.3:CRS84"}},
            "features": []
        }));
        assert_eq!(declared_srid(&fc).unwrap(), Some(4326));
    }
}
