use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::{Error, Time, spatial::Projection};

/// Layout of the network dataset file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetFormat {
    /// A single GeoJSON `FeatureCollection` object
    #[default]
    FeatureCollection,
    /// GeoJSON features written one after another (newline delimited)
    FeatureSequence,
}

/// How spatial indexes are scoped
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexMode {
    /// One index per (basetype, tile) built around the stops of a request
    #[default]
    Tiled,
    /// One index per basetype covering the whole dataset
    Global,
}

/// Configuration of the network dataset, its indexing and stop snapping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpatialConfig {
    pub dataset_path: PathBuf,
    pub dataset_format: DatasetFormat,
    pub mode: IndexMode,
    /// Tile edge length in degrees
    pub cell_size_deg: f64,
    /// Padding around a tile when selecting edges
    pub buffer_km: f64,
    /// Maximum number of cached indexes
    pub capacity: usize,
    pub search_radius_m: f64,
    /// Coordinate system of the dataset
    pub projection: Projection,
}

impl Default for SpatialConfig {
    fn default() -> Self {
        Self {
            dataset_path: PathBuf::from("data/network/bn_edge.json"),
            dataset_format: DatasetFormat::default(),
            mode: IndexMode::default(),
            cell_size_deg: 0.25,
            buffer_km: 2.0,
            capacity: 12,
            search_radius_m: 200.0,
            projection: Projection::default(),
        }
    }
}

impl SpatialConfig {
    /// # Errors
    ///
    /// Returns an error if a size parameter is zero, negative or not finite
    pub fn validate(&self) -> Result<(), Error> {
        if self.capacity == 0 {
            return Err(Error::InvalidData(
                "Spatial index cache capacity must be at least 1".to_string(),
            ));
        }
        if !(self.cell_size_deg.is_finite() && self.cell_size_deg > 0.0) {
            return Err(Error::InvalidData(format!(
                "Invalid tile cell size: {}",
                self.cell_size_deg
            )));
        }
        if !(self.buffer_km.is_finite() && self.buffer_km >= 0.0) {
            return Err(Error::InvalidData(format!(
                "Invalid tile buffer: {} km",
                self.buffer_km
            )));
        }
        if !(self.search_radius_m.is_finite() && self.search_radius_m > 0.0) {
            return Err(Error::InvalidData(format!(
                "Invalid search radius: {} m",
                self.search_radius_m
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RealtimeConfig {
    /// Slack around the scheduled start and end of a trip in which it counts as active
    pub activity_slack_secs: Time,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            activity_slack_secs: crate::realtime::DEFAULT_ACTIVITY_SLACK,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Length of the stop-time window considered after the departure time
    pub window_secs: Time,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            window_secs: crate::routing::DEFAULT_WINDOW,
        }
    }
}
