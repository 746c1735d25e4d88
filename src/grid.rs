//! Trimming a pre-generated tile grid to an area of interest.
//!
//! The AOI is dissolved once and indexed by polygon extent; each tile is then
//! kept whole, clipped, or dropped depending on how it overlaps the AOI.

use geo::{BooleanOps, BoundingRect, Geometry, MultiPolygon, Polygon, Rect, Relate};
use geojson::{Feature, FeatureCollection, JsonObject, JsonValue};
use log::{debug, info};
use rstar::{RTree, RTreeObject, AABB};

use crate::adapter::{adapt_features, multi_polygon_to_geojson};
use crate::error::Result;
use crate::merge::{into_multi_polygon, merge_to_multi_polygon};
use crate::validate::validate_multi_polygon;

#[derive(Debug, Clone)]
struct AoiPart {
    idx: usize, // Index of the polygon in AoiIndex::polygons
    bbox: Rect<f64>,
}

impl RTreeObject for AoiPart {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(self.bbox.min().into(), self.bbox.max().into())
    }
}

/// Dissolved AOI polygons with an R-tree over their bounding boxes.
struct AoiIndex {
    polygons: Vec<Polygon<f64>>,
    rtree: RTree<AoiPart>,
}

impl AoiIndex {
    fn new(aoi: MultiPolygon<f64>) -> Self {
        let parts = aoi.0.iter().enumerate()
            .filter_map(|(idx, polygon)| polygon.bounding_rect().map(|bbox| AoiPart { idx, bbox }))
            .collect();
        Self {
            rtree: RTree::bulk_load(parts),
            polygons: aoi.0,
        }
    }

    /// The AOI polygons whose extent overlaps `bbox`, or `None` if there are none.
    fn near(&self, bbox: Rect<f64>) -> Option<MultiPolygon<f64>> {
        let search = AABB::from_corners(bbox.min().into(), bbox.max().into());
        let mut idxs: Vec<usize> = self.rtree.locate_in_envelope_intersecting(&search)
            .map(|part| part.idx)
            .collect();
        if idxs.is_empty() {
            return None;
        }
        idxs.sort_unstable();
        Some(MultiPolygon(idxs.into_iter().map(|idx| self.polygons[idx].clone()).collect()))
    }
}

/// How a tile relates to the AOI.
#[derive(Debug, Clone, PartialEq)]
pub enum TileOverlap {
    /// The AOI contains the whole tile.
    Contained,
    /// The tile overlaps the AOI; holds the positive-area intersection.
    Partial(MultiPolygon<f64>),
    /// No positive-area overlap.
    Outside,
}

/// Classify `tile` against `aoi`. Both are expected to be valid polygonal geometries.
pub fn classify_tile(aoi: &MultiPolygon<f64>, tile: &MultiPolygon<f64>) -> TileOverlap {
    if aoi.relate(tile).is_contains() {
        return TileOverlap::Contained;
    }
    match into_multi_polygon(Geometry::MultiPolygon(aoi.intersection(tile))) {
        Some(intersection) => TileOverlap::Partial(intersection),
        None => TileOverlap::Outside,
    }
}

/// Keep the tiles of `grid` that overlap the AOI.
///
/// Tiles inside the AOI are kept as they are. Tiles straddling its boundary
/// are kept but marked unsplittable; with `clip_to_aoi` their geometry is
/// replaced by the overlap and their x/y/zoom address is nulled. Tiles with
/// no positive-area overlap are dropped. Output geometries are MultiPolygons
/// and the output preserves grid order.
pub fn trim_grid_to_aoi(
    grid: &FeatureCollection,
    area_of_interest: &FeatureCollection,
    clip_to_aoi: bool,
) -> Result<FeatureCollection> {
    let aoi = AoiIndex::new(merge_to_multi_polygon(area_of_interest, true)?);

    if grid.features.is_empty() {
        return Ok(feature_collection(Vec::new()));
    }
    let tiles = adapt_features(grid)?;
    let total_tiles = tiles.len();

    let mut features = Vec::new();
    let mut clipped = 0usize;

    for tile in tiles {
        validate_multi_polygon(&multi_polygon_to_geojson(&tile.geometry))?;
        let Some(bbox) = tile.geometry.bounding_rect() else { continue };
        let Some(nearby) = aoi.near(bbox) else { continue };

        match classify_tile(&nearby, &tile.geometry) {
            TileOverlap::Contained => {
                features.push(tile_feature(tile.source, &tile.geometry, tile.source.properties.clone()));
            },
            TileOverlap::Partial(intersection) => {
                let mut properties = tile.source.properties.clone().unwrap_or_default();
                properties.insert("splittable".to_string(), JsonValue::Bool(false));

                if clip_to_aoi {
                    for key in ["x", "y", "zoom"] {
                        properties.insert(key.to_string(), JsonValue::Null);
                    }
                    clipped += 1;
                    features.push(tile_feature(tile.source, &intersection, Some(properties)));
                } else {
                    features.push(tile_feature(tile.source, &tile.geometry, Some(properties)));
                }
            },
            TileOverlap::Outside => {},
        }
    }

    info!("Kept {} of {} tiles ({} clipped to the AOI)", features.len(), total_tiles, clipped);
    debug!("AOI has {} polygon(s) after dissolve", aoi.polygons.len());
    Ok(feature_collection(features))
}

fn tile_feature(source: &Feature, geometry: &MultiPolygon<f64>, properties: Option<JsonObject>) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(multi_polygon_to_geojson(geometry)),
        id: source.id.clone(),
        properties,
        foreign_members: source.foreign_members.clone(),
    }
}

fn feature_collection(features: Vec<Feature>) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}
