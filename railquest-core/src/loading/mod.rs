//! This module turns caller-supplied raw records and the network dataset
//! into the typed inputs of the routing and geometry components.

mod config;
mod network;
mod parser;
mod raw_types;

pub use config::{DatasetFormat, IndexMode, RealtimeConfig, RoutingConfig, SpatialConfig};
pub use network::{GeoJsonFileSource, NetworkSource, StreamStats, open_source};
pub use parser::{
    Parsed, format_time, parse_stop_times, parse_stops, parse_time, parse_transfers,
};
pub use raw_types::{
    RawEdgeProperties, RawGeometry, RawNetworkFeature, RawStop, RawStopTime, RawTransfer,
};
