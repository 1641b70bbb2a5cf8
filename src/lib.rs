//! `RailQuest` engine facade.
//!
//! Wraps the core crate behind a single [`Engine`] configured from a TOML
//! file: earliest-arrival routing over windowed schedules, live stop-times
//! from decoded real-time updates, and route geometry reconstruction with
//! `GeoJSON` output.

mod config;
mod engine;
mod error;
mod feature;

pub use config::EngineConfig;
pub use engine::{Engine, RouteStops};
pub use error::EngineError;
pub use feature::{route_feature, routes_feature_collection, to_geojson_string};

pub use railquest_core::geometry::{GeometrySource, RouteGeometry};
pub use railquest_core::realtime::{LiveTrip, ServiceCalendar, ServiceDay};
pub use railquest_core::routing::{Journey, JourneyStep, Leg};
pub use railquest_core::spatial::Cancellation;
pub use railquest_core::model::ScheduledTrip;
pub use railquest_core::{
    RealtimeUpdate, Stop, StopTimeEvent, StopTimeRecord, StopTimeUpdate, Time, TransferRecord,
};
