//! Merging feature collections into a single MultiPolygon.

use geo::{Area, BooleanOps, Geometry, MultiPolygon, Polygon};
use geojson::FeatureCollection;
use log::debug;

use crate::adapter::{adapt_features, multi_polygon_to_geojson};
use crate::error::{GridError, Result};
use crate::validate::validate_multi_polygon;

/// Normalize any geometry-library result to a MultiPolygon.
///
/// Polygons are wrapped, polygonal members of collections are gathered and
/// zero-area parts are discarded. Returns `None` when nothing polygonal with
/// positive area remains (points, lines, empty results).
pub fn into_multi_polygon(geometry: Geometry<f64>) -> Option<MultiPolygon<f64>> {
    let polygons: Vec<Polygon<f64>> = match geometry {
        Geometry::Polygon(polygon) => vec![polygon],
        Geometry::MultiPolygon(multi_polygon) => multi_polygon.0,
        Geometry::Rect(rect) => vec![rect.to_polygon()],
        Geometry::Triangle(triangle) => vec![triangle.to_polygon()],
        Geometry::GeometryCollection(collection) => collection.0.into_iter()
            .filter_map(into_multi_polygon)
            .flat_map(|multi_polygon| multi_polygon.0)
            .collect(),
        _ => return None,
    };
    let polygons: Vec<Polygon<f64>> = polygons.into_iter()
        .filter(|polygon| polygon.unsigned_area() > 0.0)
        .collect();

    if polygons.is_empty() {
        None
    } else {
        Some(MultiPolygon(polygons))
    }
}

/// Merge every polygonal feature of `fc` into a single validated MultiPolygon.
///
/// MultiPolygon features are unwrapped into their member polygons. The
/// result is always 2D. With `dissolve`, the polygons are unioned so shared
/// internal boundaries disappear.
pub fn merge_to_multi_polygon(fc: &FeatureCollection, dissolve: bool) -> Result<MultiPolygon<f64>> {
    let features = adapt_features(fc)?;
    let has_z = features.iter().any(|feature| feature.has_z);
    let polygons: Vec<Polygon<f64>> = features.into_iter()
        .flat_map(|feature| feature.geometry.0)
        .collect();

    if polygons.is_empty() {
        return Err(GridError::invalid("no polygons to merge"));
    }
    if has_z {
        debug!("Reduced {} polygon(s) with z ordinates to 2D", polygons.len());
    }

    let mut merged = MultiPolygon(polygons);
    validate_multi_polygon(&multi_polygon_to_geojson(&merged))?;

    if dissolve {
        let count = merged.0.len();
        merged = dissolve_polygons(merged)?;
        debug!("Dissolved {} polygon(s) into {}", count, merged.0.len());
        validate_multi_polygon(&multi_polygon_to_geojson(&merged))?;
    }
    Ok(merged)
}

fn dissolve_polygons(multi_polygon: MultiPolygon<f64>) -> Result<MultiPolygon<f64>> {
    multi_polygon.0.into_iter()
        .map(|polygon| MultiPolygon(vec![polygon]))
        .reduce(|a, b| a.union(&b))
        .map(Geometry::MultiPolygon)
        .and_then(into_multi_polygon)
        .ok_or_else(|| GridError::invalid("dissolve produced an empty geometry"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, GeometryCollection, LineString, Point};

    fn unit_square() -> Polygon<f64> {
        polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0), (x: 0.0, y: 1.0)]
    }

    #[test]
    fn bare_polygon_is_wrapped() {
        let wrapped = into_multi_polygon(Geometry::Polygon(unit_square())).unwrap();
        assert_eq!(wrapped, MultiPolygon(vec![unit_square()]));
    }

    #[test]
    fn non_polygonal_results_are_rejected() {
        let line = LineString::from(vec![(0.0, 0.0), (1.0, 1.0)]);
        assert!(into_multi_polygon(Geometry::LineString(line)).is_none());
        assert!(into_multi_polygon(Geometry::Point(Point::new(0.0, 0.0))).is_none());
        assert!(into_multi_polygon(Geometry::MultiPolygon(MultiPolygon(vec![]))).is_none());
    }

    #[test]
    fn zero_area_parts_are_discarded() {
        let sliver = polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 2.0, y: 0.0)];
        let wrapped = into_multi_polygon(Geometry::MultiPolygon(MultiPolygon(vec![
            sliver.clone(),
            unit_square(),
        ])))
        .unwrap();
        assert_eq!(wrapped.0.len(), 1);
        assert!(into_multi_polygon(Geometry::Polygon(sliver)).is_none());
    }

    #[test]
    fn collections_keep_only_polygonal_members() {
        let collection = GeometryCollection(vec![
            Geometry::Point(Point::new(5.0, 5.0)),
            Geometry::Polygon(unit_square()),
        ]);
        let wrapped = into_multi_polygon(Geometry::GeometryCollection(collection)).unwrap();
        assert_eq!(wrapped.0, vec![unit_square()]);
    }

    #[test]
    fn dissolving_adjacent_squares_removes_shared_edge() {
        let right = polygon![(x: 1.0, y: 0.0), (x: 2.0, y: 0.0), (x: 2.0, y: 1.0), (x: 1.0, y: 1.0)];
        let dissolved = dissolve_polygons(MultiPolygon(vec![unit_square(), right])).unwrap();
        assert_eq!(dissolved.0.len(), 1);
        assert!((dissolved.unsigned_area() - 2.0).abs() < 1e-9);
    }
}
