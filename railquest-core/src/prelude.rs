// Re-export key components
pub use crate::geometry::{GeometryReconstructor, GeometrySource, RouteGeometry};
pub use crate::loading::{
    NetworkSource, Parsed, RealtimeConfig, RoutingConfig, SpatialConfig, parse_stop_times,
    parse_stops, parse_transfers,
};
pub use crate::realtime::{
    LiveTrip, ServiceCalendar, ServiceDay, merge, merge_active_trips, merge_running_trips,
};
pub use crate::routing::{
    Journey, JourneyStep, Leg, ScheduleGraphIndex, find_earliest_arrival, window_stop_times,
};
pub use crate::spatial::{Cancellation, Projection, TileIndexCache};

// Core record types
pub use crate::Basetype;
pub use crate::Error;
pub use crate::Stop;
pub use crate::Time; // seconds since service midnight
pub use crate::{RealtimeUpdate, StopTimeRecord, TransferRecord};
