//! Data model for schedule routing, real-time merging and network geometry
//!
//! Contains the records callers hand to the engine and the network edges
//! produced from the transport network dataset.

pub mod network;
pub mod realtime;
pub mod schedule;

pub use network::{Basetype, EdgeKey, NetworkEdge};
pub use realtime::{RealtimeUpdate, StopTimeEvent, StopTimeUpdate};
pub use schedule::{ScheduledTrip, Stop, StopTimeRecord, Time, TransferRecord};
