//! Earliest-arrival routing over a window of the static schedule.
//!
//! [`ScheduleGraphIndex`] turns stop-times and transfers into per-stop
//! adjacency lists; [`find_earliest_arrival`] runs a label-setting search
//! over them with a binary-heap frontier.

mod earliest_arrival;
mod schedule_graph;
mod state;
mod window;

pub use earliest_arrival::{Journey, JourneyStep, Leg, find_earliest_arrival};
pub use schedule_graph::{Departure, ScheduleGraphIndex, StopIdx, Transfer, TripIdx};
pub use window::{DEFAULT_WINDOW, window_stop_times};
