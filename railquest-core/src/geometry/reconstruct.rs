use std::sync::Arc;

use geo::{BoundingRect, Coord, LineString, MultiPoint, Rect};
use itertools::Itertools;
use log::{debug, warn};
use rayon::prelude::*;
use serde::Serialize;

use crate::Error;
use crate::model::{Basetype, EdgeKey, NetworkEdge, Stop};
use crate::spatial::{Cancellation, SnappedEdge, TileIndexCache, nearest_edge};

/// Where a route geometry came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GeometrySource {
    /// Every stop pair was joined along network edges
    Network,
    /// Some stop pairs had no nearby edge and were joined by straight segments
    Degraded { fallback_pairs: usize },
    /// The network could not be used at all
    StraightLine { reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RouteGeometry {
    /// (longitude, latitude) polyline
    pub coordinates: Vec<Coord<f64>>,
    pub source: GeometrySource,
    /// Extent of the stops
    pub bounds: Option<Rect<f64>>,
}

impl RouteGeometry {
    fn empty() -> Self {
        Self {
            coordinates: Vec::new(),
            source: GeometrySource::Network,
            bounds: None,
        }
    }

    /// Polyline through the stops themselves
    pub fn straight_line(stops: &[Stop], reason: impl Into<String>) -> Self {
        let mut coordinates = Vec::with_capacity(stops.len());
        for stop in stops {
            push_coord(&mut coordinates, stop.geometry.0);
        }
        Self {
            coordinates,
            source: GeometrySource::StraightLine {
                reason: reason.into(),
            },
            bounds: stop_bounds(stops),
        }
    }

    pub fn is_straight_line(&self) -> bool {
        matches!(self.source, GeometrySource::StraightLine { .. })
    }

    pub fn fallback_pairs(&self) -> usize {
        match self.source {
            GeometrySource::Degraded { fallback_pairs } => fallback_pairs,
            _ => 0,
        }
    }

    pub fn line_string(&self) -> LineString<f64> {
        LineString::new(self.coordinates.clone())
    }
}

fn stop_bounds(stops: &[Stop]) -> Option<Rect<f64>> {
    stops
        .iter()
        .map(|stop| stop.geometry)
        .collect::<MultiPoint<f64>>()
        .bounding_rect()
}

/// Appends `c` unless it repeats the last coordinate
fn push_coord(coords: &mut Vec<Coord<f64>>, c: Coord<f64>) {
    if coords.last() != Some(&c) {
        coords.push(c);
    }
}

fn distance_sq(a: Coord<f64>, b: Coord<f64>) -> f64 {
    let d = a - b;
    d.x * d.x + d.y * d.y
}

/// Appends an edge oriented so it continues from `anchor`, the current end
/// of the polyline or the stop it starts from
fn push_edge(coords: &mut Vec<Coord<f64>>, edge: &NetworkEdge, anchor: Coord<f64>) {
    let points = &edge.geometry.0;
    let (Some(&first), Some(&last)) = (points.first(), points.last()) else {
        return;
    };
    let anchor = coords.last().copied().unwrap_or(anchor);
    if distance_sq(anchor, last) < distance_sq(anchor, first) {
        for &c in points.iter().rev() {
            push_coord(coords, c);
        }
    } else {
        for &c in points {
            push_coord(coords, c);
        }
    }
}

/// Joins the snapped edges of consecutive stop pairs into one polyline.
///
/// An edge already used by the previous pair is not inserted again. A pair
/// with a stop lacking an edge is joined by a straight segment between the
/// two stops. Returns the polyline and the number of such pairs.
pub(crate) fn merge_snapped(stops: &[Stop], snapped: &[Option<SnappedEdge>]) -> (Vec<Coord<f64>>, usize) {
    let mut coords = Vec::new();
    let mut previous_pair: Vec<&EdgeKey> = Vec::new();
    let mut fallback_pairs = 0;

    for ((from_stop, from), (to_stop, to)) in stops.iter().zip(snapped).tuple_windows() {
        match (from, to) {
            (Some(from), Some(to)) => {
                let pair = [&from.edge, &to.edge];
                for (i, edge) in pair.iter().enumerate() {
                    let repeated = previous_pair.contains(&&edge.key)
                        || pair[..i].iter().any(|e| e.key == edge.key);
                    if !repeated {
                        push_edge(&mut coords, edge, from_stop.geometry.0);
                    }
                }
                previous_pair = vec![&from.edge.key, &to.edge.key];
            }
            _ => {
                push_coord(&mut coords, from_stop.geometry.0);
                push_coord(&mut coords, to_stop.geometry.0);
                fallback_pairs += 1;
                previous_pair.clear();
            }
        }
    }
    (coords, fallback_pairs)
}

/// Draws routes by snapping their stops onto the transport network
pub struct GeometryReconstructor {
    cache: Arc<TileIndexCache>,
}

impl GeometryReconstructor {
    pub fn new(cache: Arc<TileIndexCache>) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &TileIndexCache {
        &self.cache
    }

    /// Polyline of a route of `basetype` through `stops` in order.
    ///
    /// Each stop is snapped against the index of its own tile, so a route
    /// spanning several tiles draws the same as with a global index. Fewer
    /// than two stops give an empty geometry. If no spatial index can be
    /// obtained the route degrades to a straight line through its stops.
    ///
    /// # Errors
    ///
    /// [`Error::Cancelled`] if `cancel` fires while the index is built.
    pub fn build_geometry(
        &self,
        stops: &[Stop],
        basetype: Basetype,
        cancel: &Cancellation,
    ) -> Result<RouteGeometry, Error> {
        if stops.len() < 2 {
            return Ok(RouteGeometry::empty());
        }

        let points: Vec<_> = stops.iter().map(|stop| stop.geometry).collect();
        let indexes = match self.cache.indexes_for_stops(basetype, &points, cancel) {
            Ok(indexes) => indexes,
            Err(e) if e.is_recoverable() => {
                warn!("Drawing {basetype:?} route as a straight line: {e}");
                return Ok(RouteGeometry::straight_line(stops, e.to_string()));
            }
            Err(e) => return Err(e),
        };

        let radius = self.cache.config().search_radius_m;
        let snapped: Vec<Option<SnappedEdge>> = points
            .par_iter()
            .zip(&indexes)
            .map(|(point, index)| nearest_edge(*point, index, radius))
            .collect();
        let (coordinates, fallback_pairs) = merge_snapped(stops, &snapped);

        let source = if fallback_pairs == 0 {
            GeometrySource::Network
        } else {
            debug!(
                "{} of {} stop pairs drawn straight, no {:?} edge within {} m",
                fallback_pairs,
                stops.len() - 1,
                basetype,
                radius
            );
            GeometrySource::Degraded { fallback_pairs }
        };
        Ok(RouteGeometry {
            coordinates,
            source,
            bounds: stop_bounds(stops),
        })
    }
}
