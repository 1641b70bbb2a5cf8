//! Bounded cache of per-tile edge indexes built from the network dataset.

use std::ops::ControlFlow;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use geo::{Intersects, LineString, Point, Rect};
use hashbrown::{HashMap, HashSet};
use log::{debug, info};

use super::cancel::Cancellation;
use super::index::EdgeIndex;
use super::lru::LruCache;
use super::projection::Reprojector;
use super::tile::IndexKey;
use crate::loading::{NetworkSource, RawNetworkFeature, SpatialConfig, open_source};
use crate::model::{Basetype, NetworkEdge};
use crate::Error;

/// How often a request waiting for another thread's build rechecks its cancellation
const WAIT_SLICE: Duration = Duration::from_millis(100);

struct CacheState {
    entries: LruCache<IndexKey, Arc<EdgeIndex>>,
    /// Keys currently being built by some thread
    building: HashSet<IndexKey>,
}

/// Spatial indexes keyed by basetype and tile, at most `capacity` of them.
///
/// A missing index is built by exactly one caller while concurrent callers
/// asking for the same key wait for it. Indexes are never modified after
/// they are built; eviction only drops the cache's reference.
pub struct TileIndexCache {
    config: SpatialConfig,
    source: Arc<dyn NetworkSource>,
    reprojector: Reprojector,
    state: Mutex<CacheState>,
    built: Condvar,
}

/// Releases a key's build slot however the build ends
struct BuildGuard<'a> {
    cache: &'a TileIndexCache,
    key: IndexKey,
}

impl Drop for BuildGuard<'_> {
    fn drop(&mut self) {
        self.cache.lock().building.remove(&self.key);
        self.cache.built.notify_all();
    }
}

impl TileIndexCache {
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid
    pub fn new(config: SpatialConfig, source: Arc<dyn NetworkSource>) -> Result<Self, Error> {
        config.validate()?;
        Ok(Self {
            reprojector: config.projection.reprojector(),
            state: Mutex::new(CacheState {
                entries: LruCache::new(config.capacity),
                building: HashSet::new(),
            }),
            built: Condvar::new(),
            config,
            source,
        })
    }

    /// Cache over the dataset file named in the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid
    pub fn from_config(config: SpatialConfig) -> Result<Self, Error> {
        let source = open_source(&config);
        Self::new(config, source)
    }

    pub fn config(&self) -> &SpatialConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Index for a route of `basetype` through `stops`
    ///
    /// # Errors
    ///
    /// [`Error::InvalidData`] without stops, otherwise as [`Self::get_index_for_key`]
    pub fn get_index(
        &self,
        basetype: Basetype,
        stops: &[Point<f64>],
        cancel: &Cancellation,
    ) -> Result<Arc<EdgeIndex>, Error> {
        let key = IndexKey::for_stops(basetype, stops, &self.config).ok_or_else(|| {
            Error::InvalidData("Cannot select a spatial index without stops".to_string())
        })?;
        self.get_index_for_key(key, cancel)
    }

    /// Index each of `stops` is snapped against, in stop order.
    ///
    /// Stops in the same tile share one index, and each distinct key is
    /// fetched once. With a single global index per basetype every stop
    /// gets the same one.
    ///
    /// # Errors
    ///
    /// The first error of [`Self::get_index_for_key`]
    pub fn indexes_for_stops(
        &self,
        basetype: Basetype,
        stops: &[Point<f64>],
        cancel: &Cancellation,
    ) -> Result<Vec<Arc<EdgeIndex>>, Error> {
        let mut fetched: HashMap<IndexKey, Arc<EdgeIndex>> = HashMap::new();
        stops
            .iter()
            .map(|&stop| {
                let key = IndexKey::for_stop(basetype, stop, &self.config);
                if let Some(index) = fetched.get(&key) {
                    return Ok(Arc::clone(index));
                }
                let index = self.get_index_for_key(key, cancel)?;
                fetched.insert(key, Arc::clone(&index));
                Ok(index)
            })
            .collect()
    }

    /// Cached index for `key`, building it on a miss.
    ///
    /// # Errors
    ///
    /// [`Error::IndexUnavailable`] or [`Error::CacheBuildFailure`] if the
    /// dataset cannot be read, [`Error::Cancelled`] if `cancel` fires first.
    /// Nothing is cached on failure, the next request builds from scratch.
    pub fn get_index_for_key(
        &self,
        key: IndexKey,
        cancel: &Cancellation,
    ) -> Result<Arc<EdgeIndex>, Error> {
        let mut state = self.lock();
        loop {
            if let Some(index) = state.entries.get(&key) {
                debug!("Spatial index cache hit for {key:?}");
                return Ok(Arc::clone(index));
            }
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            if state.building.insert(key) {
                break;
            }
            state = self
                .built
                .wait_timeout(state, WAIT_SLICE)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        drop(state);

        let _guard = BuildGuard { cache: self, key };
        let index = Arc::new(self.build(key, cancel)?);

        let evicted = self.lock().entries.insert(key, Arc::clone(&index));
        if let Some(evicted) = evicted {
            debug!("Evicted spatial index {evicted:?}");
        }
        Ok(index)
    }

    /// Cached keys from most to least recently used
    pub fn cached_keys(&self) -> Vec<IndexKey> {
        self.lock().entries.keys_by_recency()
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn build(&self, key: IndexKey, cancel: &Cancellation) -> Result<EdgeIndex, Error> {
        let started = Instant::now();
        let basetype = key.basetype();
        let source_area = key
            .bounds()
            .map(|bounds| self.reprojector.source_envelope(bounds));

        let mut edges = Vec::new();
        let stats = self.source.stream(&mut |feature| {
            if cancel.is_cancelled() {
                return ControlFlow::Break(());
            }
            if let Some(edge) = self.accept(&feature, basetype, source_area.as_ref()) {
                edges.push(edge);
            }
            ControlFlow::Continue(())
        })?;

        if stats.stopped_early {
            info!("Spatial index build for {key:?} cancelled after {} features", stats.read);
            return Err(Error::Cancelled);
        }

        info!(
            "Built spatial index {:?}: {} edges from {} features ({} malformed) in {:?}",
            key,
            edges.len(),
            stats.read,
            stats.malformed,
            started.elapsed()
        );
        let index = EdgeIndex::new(key, edges);
        release_memory();
        Ok(index)
    }

    /// Turns a streamed feature into an edge if it belongs to the index being built
    fn accept(
        &self,
        feature: &RawNetworkFeature,
        basetype: Basetype,
        source_area: Option<&Rect<f64>>,
    ) -> Option<NetworkEdge> {
        if feature.basetype_code() != basetype.code() {
            return None;
        }
        let coords = feature.source_coords()?;
        let line = LineString::new(coords);
        if let Some(area) = source_area {
            if !area.intersects(&line) {
                return None;
            }
        }
        let geographic = line
            .0
            .into_iter()
            .map(|c| self.reprojector.to_geographic(c))
            .collect::<LineString<f64>>();
        Some(NetworkEdge::new(feature.object_id(), basetype, geographic))
    }
}

fn release_memory() {
    // Safety: malloc_trim only returns unused heap pages to the OS
    #[cfg(all(target_os = "linux", target_env = "gnu"))]
    unsafe {
        if libc::malloc_trim(0) == 0 {
            debug!("No heap memory released after index build");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loading::{DatasetFormat, GeoJsonFileSource, IndexMode, StreamStats};
    use crate::spatial::Projection;
    use std::sync::Barrier;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        features: Vec<RawNetworkFeature>,
        streams: AtomicUsize,
        delay: Duration,
        cancel_after_first: Option<Cancellation>,
        /// Every stream after the first meets this barrier once on start
        /// and once more before reading
        hold_later_streams: Option<Barrier>,
    }

    impl CountingSource {
        fn new(features: Vec<RawNetworkFeature>) -> Self {
            Self {
                features,
                streams: AtomicUsize::new(0),
                delay: Duration::ZERO,
                cancel_after_first: None,
                hold_later_streams: None,
            }
        }
    }

    impl NetworkSource for CountingSource {
        fn stream(
            &self,
            visit: &mut dyn FnMut(RawNetworkFeature) -> ControlFlow<()>,
        ) -> Result<StreamStats, Error> {
            let earlier = self.streams.fetch_add(1, Ordering::SeqCst);
            if let (Some(barrier), true) = (&self.hold_later_streams, earlier > 0) {
                barrier.wait();
                barrier.wait();
            }
            std::thread::sleep(self.delay);
            let mut stats = StreamStats::default();
            for feature in &self.features {
                stats.read += 1;
                if visit(feature.clone()).is_break() {
                    stats.stopped_early = true;
                    break;
                }
                if let Some(token) = &self.cancel_after_first {
                    token.cancel();
                }
            }
            Ok(stats)
        }
    }

    fn network() -> Vec<RawNetworkFeature> {
        vec![
            RawNetworkFeature::line_string(2, Some("rail-near"), &[[7.40, 46.90], [7.45, 46.95]]),
            RawNetworkFeature::line_string(2, Some("rail-far"), &[[9.00, 45.00], [9.05, 45.05]]),
            RawNetworkFeature::line_string(1, Some("road-near"), &[[7.40, 46.90], [7.41, 46.91]]),
            RawNetworkFeature::line_string(3, Some("cable"), &[[7.40, 46.90], [7.41, 46.91]]),
            RawNetworkFeature::line_string(4, Some("ferry"), &[[7.40, 46.90], [7.41, 46.91]]),
        ]
    }

    fn global_config(capacity: usize) -> SpatialConfig {
        SpatialConfig {
            mode: IndexMode::Global,
            capacity,
            ..SpatialConfig::default()
        }
    }

    fn global(basetype: Basetype) -> IndexKey {
        IndexKey::Global { basetype }
    }

    #[test]
    fn tiled_index_keeps_matching_edges_near_the_tile() {
        let cache =
            TileIndexCache::new(SpatialConfig::default(), Arc::new(network())).unwrap();
        let index = cache
            .get_index(Basetype::Rail, &[Point::new(7.42, 46.92)], &Cancellation::new())
            .unwrap();
        let keys: Vec<_> = index
            .edges_in(&Rect::new(
                geo::coord! { x: -180.0, y: -90.0 },
                geo::coord! { x: 180.0, y: 90.0 },
            ))
            .map(|e| e.key.clone())
            .collect();
        assert_eq!(keys, vec!["rail-near".to_string()]);
    }

    #[test]
    fn repeated_requests_hit_the_cache() {
        let source = Arc::new(CountingSource::new(network()));
        let cache = TileIndexCache::new(global_config(2), source.clone()).unwrap();
        let cancel = Cancellation::new();

        let first = cache.get_index_for_key(global(Basetype::Rail), &cancel).unwrap();
        let second = cache.get_index_for_key(global(Basetype::Rail), &cancel).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.len(), 2);
        assert_eq!(source.streams.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn evicts_least_recently_used_index() {
        let cache = TileIndexCache::new(global_config(2), Arc::new(network())).unwrap();
        let cancel = Cancellation::new();
        let k1 = global(Basetype::Road);
        let k2 = global(Basetype::Rail);
        let k3 = global(Basetype::Cableway);
        let k4 = global(Basetype::Ferry);

        cache.get_index_for_key(k1, &cancel).unwrap();
        cache.get_index_for_key(k2, &cancel).unwrap();
        cache.get_index_for_key(k3, &cancel).unwrap();
        assert_eq!(cache.cached_keys(), vec![k3, k2]);

        cache.get_index_for_key(k2, &cancel).unwrap();
        cache.get_index_for_key(k4, &cancel).unwrap();
        assert_eq!(cache.cached_keys(), vec![k4, k2]);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn concurrent_misses_build_once() {
        let mut source = CountingSource::new(network());
        source.delay = Duration::from_millis(50);
        let source = Arc::new(source);
        let cache = TileIndexCache::new(global_config(4), source.clone()).unwrap();

        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    cache
                        .get_index_for_key(global(Basetype::Rail), &Cancellation::new())
                        .unwrap();
                });
            }
        });
        assert_eq!(source.streams.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn cached_index_is_served_while_another_builds() {
        let mut source = CountingSource::new(network());
        source.hold_later_streams = Some(Barrier::new(2));
        let source = Arc::new(source);
        let cache = TileIndexCache::new(global_config(4), source.clone()).unwrap();
        let cancel = Cancellation::new();
        let rail = cache.get_index_for_key(global(Basetype::Rail), &cancel).unwrap();

        std::thread::scope(|scope| {
            let builder = scope.spawn(|| {
                cache
                    .get_index_for_key(global(Basetype::Road), &Cancellation::new())
                    .unwrap()
            });
            let barrier = source.hold_later_streams.as_ref().unwrap();
            // Road build has started and is parked inside the stream
            barrier.wait();
            let again = cache.get_index_for_key(global(Basetype::Rail), &cancel).unwrap();
            assert!(Arc::ptr_eq(&rail, &again));
            assert_eq!(cache.cached_keys(), vec![global(Basetype::Rail)]);
            barrier.wait();
            assert_eq!(builder.join().unwrap().len(), 1);
        });
        assert_eq!(cache.len(), 2);
        assert_eq!(source.streams.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn stops_in_different_tiles_get_their_own_index() {
        let source = Arc::new(CountingSource::new(network()));
        let cache = TileIndexCache::new(SpatialConfig::default(), source.clone()).unwrap();
        let stops = [
            Point::new(7.42, 46.92),
            Point::new(9.02, 45.02),
            Point::new(7.43, 46.93),
        ];
        let indexes = cache
            .indexes_for_stops(Basetype::Rail, &stops, &Cancellation::new())
            .unwrap();

        assert_eq!(indexes.len(), 3);
        assert!(Arc::ptr_eq(&indexes[0], &indexes[2]));
        assert!(!Arc::ptr_eq(&indexes[0], &indexes[1]));
        assert_eq!(source.streams.load(Ordering::SeqCst), 2);

        let world = Rect::new(
            geo::coord! { x: -180.0, y: -90.0 },
            geo::coord! { x: 180.0, y: 90.0 },
        );
        let far: Vec<_> = indexes[1].edges_in(&world).map(|e| e.key.clone()).collect();
        assert_eq!(far, vec!["rail-far".to_string()]);
    }

    #[test]
    fn global_mode_serves_every_stop_from_one_index() {
        let cache = TileIndexCache::new(global_config(2), Arc::new(network())).unwrap();
        let stops = [Point::new(7.42, 46.92), Point::new(9.02, 45.02)];
        let indexes = cache
            .indexes_for_stops(Basetype::Rail, &stops, &Cancellation::new())
            .unwrap();
        assert!(Arc::ptr_eq(&indexes[0], &indexes[1]));
        assert_eq!(indexes[0].len(), 2);
    }

    #[test]
    fn cancelled_build_caches_nothing() {
        let cancel = Cancellation::new();
        let mut source = CountingSource::new(network());
        source.cancel_after_first = Some(cancel.clone());
        let cache = TileIndexCache::new(global_config(2), Arc::new(source)).unwrap();

        let result = cache.get_index_for_key(global(Basetype::Rail), &cancel);
        assert!(matches!(result, Err(Error::Cancelled)));
        assert!(cache.is_empty());

        let retry = cache.get_index_for_key(global(Basetype::Rail), &Cancellation::new());
        assert!(retry.is_ok());
    }

    #[test]
    fn unreadable_dataset_is_reported_and_not_cached() {
        let source = GeoJsonFileSource::new(
            "/nonexistent/railquest/bn_edge.json",
            DatasetFormat::FeatureCollection,
        );
        let cache = TileIndexCache::new(global_config(2), Arc::new(source)).unwrap();
        let result = cache.get_index_for_key(global(Basetype::Rail), &Cancellation::new());
        assert!(matches!(result, Err(Error::IndexUnavailable(_))));
        assert!(result.is_err_and(|e| e.is_recoverable()));
        assert!(cache.is_empty());
    }

    #[test]
    fn projected_dataset_is_reprojected_once() {
        let features = vec![RawNetworkFeature::line_string(
            2,
            Some("bern"),
            &[[2_600_000.0, 1_200_000.0], [2_600_500.0, 1_200_300.0]],
        )];
        let config = SpatialConfig {
            projection: Projection::swiss_lv95(),
            ..SpatialConfig::default()
        };
        let cache = TileIndexCache::new(config, Arc::new(features)).unwrap();
        let index = cache
            .get_index(
                Basetype::Rail,
                &[Point::new(7.4396, 46.9524)],
                &Cancellation::new(),
            )
            .unwrap();
        let area = Rect::new(geo::coord! { x: 7.0, y: 46.5 }, geo::coord! { x: 8.0, y: 47.5 });
        let edge = index.edges_in(&area).next().unwrap();
        let first = edge.geometry.0[0];
        assert!((first.x - 7.439_583).abs() < 1e-5);
        assert!((first.y - 46.952_406).abs() < 1e-5);
    }

    #[test]
    fn invalid_configuration_is_rejected() {
        let config = SpatialConfig {
            capacity: 0,
            ..SpatialConfig::default()
        };
        assert!(TileIndexCache::new(config, Arc::new(network())).is_err());
    }
}
