//! Static schedule records supplied per query

use geo::Point;
use serde::{Deserialize, Serialize};

/// Seconds since service-day midnight.
///
/// Values above 86400 are valid and denote trips running past midnight.
pub type Time = u32;

/// One scheduled visit of a trip to a stop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopTimeRecord {
    pub trip_id: String,
    pub stop_id: String,
    pub arrival_time: Time,
    pub departure_time: Time,
    pub stop_sequence: u32,
}

/// Walking or interchange connection between two stops
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRecord {
    pub from_stop_id: String,
    pub to_stop_id: String,
    pub min_transfer_time: Option<Time>,
}

impl TransferRecord {
    /// Transfer duration, a missing minimum counts as an immediate transfer
    pub fn duration(&self) -> Time {
        self.min_transfer_time.unwrap_or(0)
    }
}

/// Stop location in geographic coordinates (longitude, latitude)
#[derive(Debug, Clone, PartialEq)]
pub struct Stop {
    pub stop_id: String,
    pub geometry: Point<f64>,
}

impl Stop {
    pub fn new(stop_id: impl Into<String>, lon: f64, lat: f64) -> Self {
        Self {
            stop_id: stop_id.into(),
            geometry: Point::new(lon, lat),
        }
    }
}

/// All scheduled stop times of one trip
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledTrip {
    pub trip_id: String,
    pub stop_times: Vec<StopTimeRecord>,
}
