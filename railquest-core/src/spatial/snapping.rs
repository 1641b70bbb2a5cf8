use std::sync::Arc;

use geo::{Closest, ClosestPoint, Coord, LineString, Point, Rect, coord};

use super::index::EdgeIndex;
use crate::model::NetworkEdge;

/// Metres per degree of latitude, also used for longitude at the equator
pub const METERS_PER_DEGREE: f64 = 111_320.0;
/// Lower bound for `cos(latitude)` so boxes near the poles stay finite
const MIN_COS_LAT: f64 = 0.01;

/// The network edge closest to a stop
#[derive(Debug, Clone)]
pub struct SnappedEdge {
    pub edge: Arc<NetworkEdge>,
    pub distance_m: f64,
    /// Point on the edge nearest to the stop
    pub closest: Point<f64>,
}

/// Square search box of half-width `radius_m` around `point`
pub fn search_box(point: Point<f64>, radius_m: f64) -> Rect<f64> {
    let dlat = radius_m / METERS_PER_DEGREE;
    let dlon = dlat / point.y().to_radians().cos().max(MIN_COS_LAT);
    Rect::new(
        coord! { x: point.x() - dlon, y: point.y() - dlat },
        coord! { x: point.x() + dlon, y: point.y() + dlat },
    )
}

/// Equirectangular metres around an origin, accurate over a search box
struct LocalFrame {
    origin: Coord<f64>,
    meters_per_lon: f64,
}

impl LocalFrame {
    fn at(origin: Point<f64>) -> Self {
        Self {
            origin: origin.0,
            meters_per_lon: METERS_PER_DEGREE * origin.y().to_radians().cos().max(MIN_COS_LAT),
        }
    }

    fn to_local(&self, c: Coord<f64>) -> Coord<f64> {
        coord! {
            x: (c.x - self.origin.x) * self.meters_per_lon,
            y: (c.y - self.origin.y) * METERS_PER_DEGREE,
        }
    }

    fn to_geographic(&self, c: Coord<f64>) -> Coord<f64> {
        coord! {
            x: self.origin.x + c.x / self.meters_per_lon,
            y: self.origin.y + c.y / METERS_PER_DEGREE,
        }
    }
}

/// Nearest edge to `point` within `radius_m`.
///
/// Candidates are the edges intersecting the search box; the one with the
/// smallest point-to-line distance wins, even if it lies in a box corner
/// slightly beyond `radius_m`.
pub fn nearest_edge(point: Point<f64>, index: &EdgeIndex, radius_m: f64) -> Option<SnappedEdge> {
    let frame = LocalFrame::at(point);
    let origin = Point::new(0.0, 0.0);

    index
        .edges_in(&search_box(point, radius_m))
        .filter_map(|edge| {
            let local: LineString<f64> = edge.geometry.coords().map(|c| frame.to_local(*c)).collect();
            let closest = match local.closest_point(&origin) {
                Closest::Intersection(p) | Closest::SinglePoint(p) => p,
                Closest::Indeterminate => return None,
            };
            Some(SnappedEdge {
                edge: Arc::clone(edge),
                distance_m: closest.x().hypot(closest.y()),
                closest: Point(frame.to_geographic(closest.0)),
            })
        })
        .min_by(|a, b| a.distance_m.total_cmp(&b.distance_m))
}
