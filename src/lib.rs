//! Turns a project's area of interest into the tasks a mapping project is split into.
//!
//! The engine is a pipeline of pure functions over GeoJSON:
//! features are adapted to planar polygons, merged (and optionally dissolved)
//! into a single MultiPolygon, then either used to trim a pre-generated tile
//! grid or mapped one-to-one onto arbitrary tasks.

use geo::MultiPolygon;
use geojson::FeatureCollection;

pub mod adapter;
pub mod error;
pub mod grid;
pub mod merge;
pub mod tasks;
pub mod tile;
pub mod validate;

pub use adapter::{multi_polygon_to_feature_collection, multi_polygon_to_geojson, parse_feature_collection};
pub use error::{GridError, Result};
pub use tile::{generate_grid, TileId};
pub use validate::validate_multi_polygon;

/// SRID of WGS 84 longitude/latitude.
pub const DEFAULT_SRID: u32 = 4326;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridConfig {
    /// Spatial reference every input collection is expected to use.
    pub srid: u32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self { srid: DEFAULT_SRID }
    }
}

/// Entry point for the grid operations under an explicit configuration.
#[derive(Debug, Clone, Default)]
pub struct GridService {
    config: GridConfig,
}

impl GridService {
    pub fn new(config: GridConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    /// Reject collections that declare a CRS other than the configured one.
    fn check_crs(&self, fc: &FeatureCollection) -> Result<()> {
        match adapter::declared_srid(fc)? {
            Some(srid) if srid != self.config.srid => Err(GridError::invalid(format!(
                "collection declares EPSG:{} but EPSG:{} is configured", srid, self.config.srid
            ))),
            _ => Ok(()),
        }
    }

    pub fn merge_to_multi_polygon(&self, fc: &FeatureCollection, dissolve: bool) -> Result<MultiPolygon<f64>> {
        self.check_crs(fc)?;
        merge::merge_to_multi_polygon(fc, dissolve)
    }

    pub fn trim_grid_to_aoi(
        &self,
        grid: &FeatureCollection,
        area_of_interest: &FeatureCollection,
        clip_to_aoi: bool,
    ) -> Result<FeatureCollection> {
        self.check_crs(grid)?;
        self.check_crs(area_of_interest)?;
        grid::trim_grid_to_aoi(grid, area_of_interest, clip_to_aoi)
    }

    pub fn tasks_from_aoi_features(&self, fc: &FeatureCollection) -> Result<FeatureCollection> {
        self.check_crs(fc)?;
        tasks::tasks_from_aoi_features(fc)
    }
}

/// Merge a collection into one MultiPolygon using the default configuration.
pub fn merge_to_multi_polygon(fc: &FeatureCollection, dissolve: bool) -> Result<MultiPolygon<f64>> {
    GridService::default().merge_to_multi_polygon(fc, dissolve)
}

/// Trim a tile grid to an AOI using the default configuration.
pub fn trim_grid_to_aoi(
    grid: &FeatureCollection,
    area_of_interest: &FeatureCollection,
    clip_to_aoi: bool,
) -> Result<FeatureCollection> {
    GridService::default().trim_grid_to_aoi(grid, area_of_interest, clip_to_aoi)
}

/// Build arbitrary tasks from AOI features using the default configuration.
pub fn tasks_from_aoi_features(fc: &FeatureCollection) -> Result<FeatureCollection> {
    GridService::default().tasks_from_aoi_features(fc)
}
