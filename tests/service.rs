use serde_json::json;
use tasking_grid::{
    generate_grid, parse_feature_collection, GridConfig, GridError, GridService, DEFAULT_SRID,
};

fn square_aoi(crs: Option<&str>) -> geojson::FeatureCollection {
    let mut value = json!({
        "type": "FeatureCollection",
        "features": [{
            "type": "Feature",
            "properties": {"name": "park"},
            "geometry": {"type": "Polygon", "coordinates": [
                [[0.1, 0.1], [0.9, 0.1], [0.9, 0.9], [0.1, 0.9], [0.1, 0.1]]
            ]}
        }]
    });
    if let Some(name) = crs {
        value["crs"] = json!({"type": "name", "properties": {"name": name}});
    }
    parse_feature_collection(&value.to_string()).unwrap()
}

#[test]
fn default_config_uses_wgs84() {
    let service = GridService::default();
    assert_eq!(service.config().srid, DEFAULT_SRID);
    assert!(service.merge_to_multi_polygon(&square_aoi(Some("EPSG:4326")), true).is_ok());
    assert!(service.merge_to_multi_polygon(&square_aoi(None), true).is_ok());
}

#[test]
fn mismatched_crs_is_rejected() {
    let service = GridService::default();
    let err = service
        .tasks_from_aoi_features(&square_aoi(Some("urn:ogc:def:crs:EPSG::3857")))
        .unwrap_err();
    assert_eq!(
        err,
        GridError::InvalidGeoJson("collection declares EPSG:3857 but EPSG:4326 is configured".into())
    );
}

#[test]
fn configured_srid_is_honoured() {
    let service = GridService::new(GridConfig { srid: 3857 });
    assert!(service.merge_to_multi_polygon(&square_aoi(Some("EPSG:3857")), false).is_ok());
    assert!(service.merge_to_multi_polygon(&square_aoi(Some("EPSG:4326")), false).is_err());
}

#[test]
fn generated_grid_trims_to_the_aoi() {
    let service = GridService::default();
    let aoi = square_aoi(None);
    let merged = service.merge_to_multi_polygon(&aoi, true).unwrap();

    let grid = generate_grid(&merged, 9).unwrap();
    let trimmed = service.trim_grid_to_aoi(&grid, &aoi, false).unwrap();
    assert!(!trimmed.features.is_empty());
    assert!(trimmed.features.len() <= grid.features.len());
    for feature in &trimmed.features {
        assert_eq!(feature.property("zoom"), Some(&json!(9)));
    }
}

#[test]
fn empty_grid_trims_to_nothing() {
    let grid = parse_feature_collection(r#"{"type": "FeatureCollection", "features": []}"#).unwrap();
    let trimmed = GridService::default()
        .trim_grid_to_aoi(&grid, &square_aoi(None), true)
        .unwrap();
    assert!(trimmed.features.is_empty());
}

#[test]
fn unmergeable_aoi_fails_the_trim() {
    let grid = parse_feature_collection(r#"{"type": "FeatureCollection", "features": []}"#).unwrap();
    let aoi = parse_feature_collection(r#"{"type": "FeatureCollection", "features": []}"#).unwrap();
    assert!(matches!(
        GridService::default().trim_grid_to_aoi(&grid, &aoi, true),
        Err(GridError::InvalidGeoJson(_))
    ));
}
