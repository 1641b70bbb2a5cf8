use std::path::Path;
use std::sync::Arc;

use log::info;
use rayon::prelude::*;

use railquest_core::geometry::{GeometryReconstructor, RouteGeometry};
use railquest_core::loading::NetworkSource;
use railquest_core::realtime::{
    LiveTrip, ServiceCalendar, merge_active_trips, merge_running_trips,
};
use railquest_core::routing::{
    Journey, ScheduleGraphIndex, find_earliest_arrival, window_stop_times,
};
use railquest_core::spatial::{Cancellation, IndexKey, TileIndexCache};
use railquest_core::{Basetype, RealtimeUpdate, Stop, StopTimeRecord, Time, TransferRecord};
use railquest_core::model::ScheduledTrip;

use crate::{EngineConfig, EngineError};

/// Ordered stops of one route, as passed to [`Engine::build_geometries`]
#[derive(Debug, Clone)]
pub struct RouteStops {
    pub route_id: String,
    /// GTFS or extended route type
    pub route_type: u16,
    pub stops: Vec<Stop>,
}

/// Long-lived engine owning the spatial index cache.
///
/// Routing and real-time requests are stateless; only the cache persists
/// between calls and is shared by concurrent geometry requests.
pub struct Engine {
    config: EngineConfig,
    reconstructor: GeometryReconstructor,
}

impl Engine {
    /// # Errors
    ///
    /// Returns an error if the spatial configuration is invalid
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        let cache = TileIndexCache::from_config(config.spatial.clone())?;
        info!(
            "Engine ready: network dataset {}, {:?} indexes, capacity {}",
            config.spatial.dataset_path.display(),
            config.spatial.mode,
            config.spatial.capacity
        );
        Ok(Self::with_cache(config, cache))
    }

    /// Engine reading the network from `source` instead of the configured file
    ///
    /// # Errors
    ///
    /// Returns an error if the spatial configuration is invalid
    pub fn with_source(
        config: EngineConfig,
        source: Arc<dyn NetworkSource>,
    ) -> Result<Self, EngineError> {
        let cache = TileIndexCache::new(config.spatial.clone(), source)?;
        Ok(Self::with_cache(config, cache))
    }

    fn with_cache(config: EngineConfig, cache: TileIndexCache) -> Self {
        Self {
            config,
            reconstructor: GeometryReconstructor::new(Arc::new(cache)),
        }
    }

    /// # Errors
    ///
    /// Returns an error if the file cannot be read or the configuration is invalid
    pub fn from_config_file(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let path = path.as_ref();
        info!("Loading engine configuration from {}", path.display());
        Self::new(EngineConfig::load(path)?)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Earliest arrival over the configured window of the given stop-times
    pub fn find_earliest_arrival(
        &self,
        stop_times: &[StopTimeRecord],
        transfers: &[TransferRecord],
        origin: &str,
        destination: &str,
        departure_time: Time,
    ) -> Option<Journey> {
        let window = window_stop_times(stop_times, departure_time, self.config.routing.window_secs);
        let index = ScheduleGraphIndex::new(&window, transfers);
        find_earliest_arrival(&index, origin, destination, departure_time)
    }

    /// Trips running today that are active at `now`, with real-time updates applied
    pub fn live_stop_times<C>(
        &self,
        trips: &[ScheduledTrip],
        updates: &[RealtimeUpdate],
        calendar: &C,
        now: Time,
    ) -> Vec<LiveTrip>
    where
        C: ServiceCalendar + Sync + ?Sized,
    {
        merge_active_trips(
            trips,
            updates,
            calendar,
            now,
            self.config.realtime.activity_slack_secs,
        )
    }

    /// Earliest arrival over the trips running today with their updates applied.
    ///
    /// Trips are not filtered by activity; the routing window decides which
    /// departures are reachable, judged on the live times.
    #[allow(clippy::too_many_arguments)]
    pub fn find_live_earliest_arrival<C>(
        &self,
        trips: &[ScheduledTrip],
        updates: &[RealtimeUpdate],
        calendar: &C,
        transfers: &[TransferRecord],
        origin: &str,
        destination: &str,
        departure_time: Time,
    ) -> Option<Journey>
    where
        C: ServiceCalendar + Sync + ?Sized,
    {
        let live: Vec<StopTimeRecord> = merge_running_trips(trips, updates, calendar)
            .into_iter()
            .flat_map(|trip| trip.stop_times)
            .collect();
        self.find_earliest_arrival(&live, transfers, origin, destination, departure_time)
    }

    /// Geometry of a route of GTFS `route_type` through `stops`
    ///
    /// # Errors
    ///
    /// Returns an error only if `cancel` fires while a spatial index is built
    pub fn build_geometry(
        &self,
        stops: &[Stop],
        route_type: u16,
        cancel: &Cancellation,
    ) -> Result<RouteGeometry, EngineError> {
        let basetype = Basetype::for_route_type(route_type);
        Ok(self.reconstructor.build_geometry(stops, basetype, cancel)?)
    }

    /// Geometries of several routes, built in parallel
    pub fn build_geometries(
        &self,
        routes: &[RouteStops],
        cancel: &Cancellation,
    ) -> Vec<Result<RouteGeometry, EngineError>> {
        routes
            .par_iter()
            .map(|route| self.build_geometry(&route.stops, route.route_type, cancel))
            .collect()
    }

    /// Spatial indexes currently cached, most recently used first
    pub fn cached_indexes(&self) -> Vec<IndexKey> {
        self.reconstructor.cache().cached_keys()
    }
}
