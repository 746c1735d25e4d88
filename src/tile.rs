//! Slippy-map tile addressing and regular grid generation.

use std::f64::consts::PI;

use geo::{BoundingRect, Coord, MultiPolygon, Rect};
use geojson::{Feature, FeatureCollection};
use log::{debug, info};
use serde_json::json;

use crate::adapter::multi_polygon_to_geojson;
use crate::error::{GridError, Result};

/// Deepest zoom level a grid can be generated for.
pub const MAX_ZOOM: u8 = 24;

/// Latitude limit of the Web Mercator tiling.
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

/// A tile in the XYZ scheme: x grows eastwards, y grows southwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileId {
    pub x: u32,
    pub y: u32,
    pub zoom: u8,
}

impl TileId {
    pub fn new(x: u32, y: u32, zoom: u8) -> Self {
        Self { x, y, zoom }
    }

    /// The tile covering a longitude/latitude at `zoom`.
    pub fn containing(lon: f64, lat: f64, zoom: u8) -> Self {
        let n = tiles_per_axis(zoom);
        let lat = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
        let x = ((lon + 180.0) / 360.0 * n).floor();
        let y = ((1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / PI) / 2.0 * n).floor();
        Self {
            x: x.clamp(0.0, n - 1.0) as u32,
            y: y.clamp(0.0, n - 1.0) as u32,
            zoom,
        }
    }

    /// Geographic extent of the tile in degrees.
    pub fn bounds(&self) -> Rect<f64> {
        let n = tiles_per_axis(self.zoom);
        let lon = |x: f64| x / n * 360.0 - 180.0;
        let lat = |y: f64| (PI * (1.0 - 2.0 * y / n)).sinh().atan().to_degrees();
        Rect::new(
            Coord { x: lon(self.x as f64), y: lat(self.y as f64 + 1.0) },
            Coord { x: lon(self.x as f64 + 1.0), y: lat(self.y as f64) },
        )
    }

    /// Task feature for this tile: MultiPolygon geometry, addressed and splittable.
    pub fn to_feature(&self) -> Feature {
        let geometry = MultiPolygon(vec![self.bounds().to_polygon()]);
        let properties = json!({
            "x": self.x,
            "y": self.y,
            "zoom": self.zoom,
            "splittable": true,
        });
        Feature {
            bbox: None,
            geometry: Some(multi_polygon_to_geojson(&geometry)),
            id: None,
            properties: properties.as_object().cloned(),
            foreign_members: None,
        }
    }
}

fn tiles_per_axis(zoom: u8) -> f64 {
    2f64.powi(zoom as i32)
}

/// Create the grid of tiles at `zoom` covering the extent of `aoi`.
///
/// Tiles are emitted row by row from north to south. Tiles that only share
/// the extent's bounding box are included; trimming against the AOI removes
/// them.
pub fn generate_grid(aoi: &MultiPolygon<f64>, zoom: u8) -> Result<FeatureCollection> {
    if zoom > MAX_ZOOM {
        return Err(GridError::invalid(format!(
            "zoom {} is deeper than the maximum of {}", zoom, MAX_ZOOM
        )));
    }
    let extent = aoi.bounding_rect()
        .ok_or_else(|| GridError::invalid("cannot build a grid for an empty AOI"))?;

    let north_west = TileId::containing(extent.min().x, extent.max().y, zoom);
    let south_east = TileId::containing(extent.max().x, extent.min().y, zoom);
    let num_cols = (south_east.x - north_west.x + 1) as usize;
    let num_rows = (south_east.y - north_west.y + 1) as usize;

    info!("Creating {}x{} grid of tiles at zoom {}", num_rows, num_cols, zoom);
    debug!(
        "Extent bounds: ({:.6}, {:.6}) to ({:.6}, {:.6})",
        extent.min().x, extent.min().y, extent.max().x, extent.max().y
    );

    let mut features = Vec::with_capacity(num_rows * num_cols);
    for y in north_west.y..=south_east.y {
        for x in north_west.x..=south_east.x {
            features.push(TileId::new(x, y, zoom).to_feature());
        }
    }

    Ok(FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    })
}
