//! Real-time adjustment of scheduled stop-times.
//!
//! Decoded trip updates are merged into a trip's scheduled stop-times with
//! [`merge`]; [`merge_active_trips`] combines that with a service calendar
//! and an activity window for the live view of a route.

mod activity;
mod clock;
mod live;
mod merge;

pub use activity::{DEFAULT_ACTIVITY_SLACK, ServiceCalendar, TripBounds};
pub use clock::ServiceDay;
pub use live::{LiveTrip, merge_active_trips, merge_running_trips};
pub use merge::{MatchKey, merge};
