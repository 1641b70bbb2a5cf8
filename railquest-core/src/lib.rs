//! Core of the `RailQuest` engine.
//!
//! Answers earliest-arrival queries over a caller-supplied window of the
//! static schedule, adjusts scheduled stop times with decoded real-time
//! updates, and reconstructs route geometry by snapping ordered stops onto
//! a transport network dataset indexed per geographic tile.

pub mod error;
pub mod geometry;
pub mod loading;
pub mod model;
pub mod prelude;
pub mod realtime;
pub mod routing;
pub mod spatial;

pub use error::Error;
pub use model::{
    Basetype, NetworkEdge, RealtimeUpdate, Stop, StopTimeEvent, StopTimeRecord, StopTimeUpdate,
    Time, TransferRecord,
};
