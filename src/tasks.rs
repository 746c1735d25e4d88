//! Arbitrary tasks: one task per supplied AOI feature, no grid involved.

use geojson::{Feature, FeatureCollection, JsonObject, JsonValue};
use log::debug;

use crate::adapter::{adapt_features, multi_polygon_to_geojson};
use crate::error::Result;
use crate::validate::validate_multi_polygon;

/// Property keys owned by the task model.
const TASK_KEYS: [&str; 4] = ["x", "y", "zoom", "splittable"];

/// Turn each polygonal feature of `fc` into one task feature.
///
/// Geometries become MultiPolygons; nothing is merged or dissolved. Tasks are
/// unaddressed and never splittable. Caller properties other than the task
/// keys are kept under `extra_properties`.
pub fn tasks_from_aoi_features(fc: &FeatureCollection) -> Result<FeatureCollection> {
    let features = adapt_features(fc)?;
    let mut tasks = Vec::with_capacity(features.len());

    for feature in features {
        let geometry = multi_polygon_to_geojson(&feature.geometry);
        validate_multi_polygon(&geometry)?;

        tasks.push(Feature {
            bbox: None,
            geometry: Some(geometry),
            id: feature.source.id.clone(),
            properties: Some(task_properties(feature.source.properties.as_ref())),
            foreign_members: None,
        });
    }

    debug!("Built {} arbitrary task(s)", tasks.len());
    Ok(FeatureCollection {
        bbox: None,
        features: tasks,
        foreign_members: None,
    })
}

fn task_properties(original: Option<&JsonObject>) -> JsonObject {
    let extra: JsonObject = original
        .into_iter()
        .flatten()
        .filter(|(key, _)| !TASK_KEYS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    let mut properties = JsonObject::new();
    properties.insert("x".to_string(), JsonValue::Null);
    properties.insert("y".to_string(), JsonValue::Null);
    properties.insert("zoom".to_string(), JsonValue::Null);
    properties.insert("splittable".to_string(), JsonValue::Bool(false));
    properties.insert("extra_properties".to_string(), JsonValue::Object(extra));
    properties
}
