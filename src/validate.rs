//! Structural validation of GeoJSON MultiPolygons.
//!
//! Polygons are never repaired: a geometry that fails here is rejected with
//! an explanation of the first problem found.

use geo::algorithm::line_intersection::{line_intersection, LineIntersection};
use geo::{Contains, Coord, Line, LineString, Point, Polygon};
use geojson::{Geometry as GeoJsonGeometry, Value as GeoJsonValue};
use rstar::{RTree, RTreeObject, AABB};

use crate::error::{GridError, Result};

#[derive(Debug, Clone)]
struct Segment {
    ring: usize,
    index: usize, // Position of the segment along its ring
    line: Line<f64>,
}

impl RTreeObject for Segment {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(
            [self.line.start.x, self.line.start.y],
            [self.line.end.x, self.line.end.y],
        )
    }
}

fn type_name(value: &GeoJsonValue) -> &'static str {
    match value {
        GeoJsonValue::Point(_) => "Point",
        GeoJsonValue::MultiPoint(_) => "MultiPoint",
        GeoJsonValue::LineString(_) => "LineString",
        GeoJsonValue::MultiLineString(_) => "MultiLineString",
        GeoJsonValue::Polygon(_) => "Polygon",
        GeoJsonValue::MultiPolygon(_) => "MultiPolygon",
        GeoJsonValue::GeometryCollection(_) => "GeometryCollection",
    }
}

/// Check that `geometry` is a structurally valid GeoJSON MultiPolygon.
///
/// Rings must be closed, hold at least four positions with finite 2D (or
/// higher) ordinates, and must not cross or touch themselves except where
/// consecutive segments share a vertex. Rings of the same polygon must not
/// meet at all, every hole must lie inside the exterior ring and no hole may
/// lie inside another. Member polygons are checked independently of each
/// other.
pub fn validate_multi_polygon(geometry: &GeoJsonGeometry) -> Result<()> {
    let GeoJsonValue::MultiPolygon(polygons) = &geometry.value else {
        return Err(GridError::invalid(format!(
            "expected MultiPolygon, found {}", type_name(&geometry.value)
        )));
    };
    if polygons.is_empty() {
        return Err(GridError::invalid("MultiPolygon has no polygons"));
    }

    for (p, rings) in polygons.iter().enumerate() {
        if rings.is_empty() {
            return Err(GridError::invalid(format!("polygon {} has no rings", p)));
        }
        let mut coords = Vec::with_capacity(rings.len());
        for (r, ring) in rings.iter().enumerate() {
            let ring_coords = ring_coords(ring).map_err(|reason| {
                GridError::invalid(format!("polygon {} ring {}: {}", p, r, reason))
            })?;
            coords.push(ring_coords);
        }
        validate_ring_layout(&coords).map_err(|(r, reason)| {
            GridError::invalid(format!("polygon {} ring {}: {}", p, r, reason))
        })?;
    }
    Ok(())
}

/// Closed ring positions as 2D coordinates with consecutive duplicates removed.
fn ring_coords(ring: &[Vec<f64>]) -> std::result::Result<Vec<Coord<f64>>, String> {
    if ring.len() < 4 {
        return Err(format!("a LinearRing needs at least 4 positions, found {}", ring.len()));
    }
    let mut coords: Vec<Coord<f64>> = Vec::with_capacity(ring.len());
    for position in ring {
        match position.as_slice() {
            [x, y, ..] if x.is_finite() && y.is_finite() => {
                let coord = Coord { x: *x, y: *y };
                // Repeated vertices are legal but form zero-length segments.
                if coords.last() != Some(&coord) {
                    coords.push(coord);
                }
            },
            _ => return Err(format!("invalid position {:?}", position)),
        }
    }
    if ring.first() != ring.last() {
        return Err("LinearRing is not closed".to_string());
    }
    if coords.len() < 4 {
        return Err("LinearRing has fewer than 3 distinct vertices".to_string());
    }
    Ok(coords)
}

/// Checks how the rings of one polygon sit relative to themselves and each other.
///
/// The first ring is the exterior. Errors carry the index of the offending ring.
fn validate_ring_layout(rings: &[Vec<Coord<f64>>]) -> std::result::Result<(), (usize, String)> {
    find_ring_intersection(rings)?;

    let Some((exterior, holes)) = rings.split_first() else { return Ok(()) };
    let exterior = Polygon::new(LineString::new(exterior.clone()), vec![]);
    let holes: Vec<Polygon<f64>> = holes.iter()
        .map(|hole| Polygon::new(LineString::new(hole.clone()), vec![]))
        .collect();

    for (h, hole) in holes.iter().enumerate() {
        // Rings do not touch, so any vertex decides the position of the whole ring.
        let first = Point::from(hole.exterior().0[0]);
        if !exterior.contains(&first) {
            return Err((h + 1, "hole lies outside the exterior ring".to_string()));
        }
        let enclosing = holes.iter()
            .enumerate()
            .find(|(o, other)| *o != h && other.contains(&first));
        if let Some((o, _)) = enclosing {
            return Err((h + 1, format!("hole lies inside ring {}", o + 1)));
        }
    }
    Ok(())
}

/// Finds the first illegal meeting of two segments, within a ring or across rings.
fn find_ring_intersection(rings: &[Vec<Coord<f64>>]) -> std::result::Result<(), (usize, String)> {
    let segments: Vec<Segment> = rings.iter()
        .enumerate()
        .flat_map(|(ring, coords)| {
            coords.windows(2)
                .enumerate()
                .map(move |(index, pair)| Segment { ring, index, line: Line::new(pair[0], pair[1]) })
        })
        .collect();
    let tree = RTree::bulk_load(segments.clone());

    for segment in &segments {
        for other in tree.locate_in_envelope_intersecting(&segment.envelope()) {
            if (other.ring, other.index) <= (segment.ring, segment.index) {
                continue; // check each unordered pair once
            }
            let Some(intersection) = line_intersection(segment.line, other.line) else { continue };
            let at = match &intersection {
                LineIntersection::SinglePoint { intersection, .. } => *intersection,
                LineIntersection::Collinear { intersection } => intersection.start,
            };

            if other.ring != segment.ring {
                return Err((other.ring, format!(
                    "meets ring {} at [{}, {}]", segment.ring, at.x, at.y
                )));
            }
            let count = rings[segment.ring].len() - 1;
            let adjacent = other.index == segment.index + 1
                || (segment.index == 0 && other.index == count - 1);
            if !(adjacent && matches!(intersection, LineIntersection::SinglePoint { .. })) {
                return Err((segment.ring, format!("self-intersection at [{}, {}]", at.x, at.y)));
            }
        }
    }
    Ok(())
}
