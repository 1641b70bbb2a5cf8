use geo::{Centroid, MultiPoint, Point, Rect, coord};

use crate::loading::{IndexMode, SpatialConfig};
use crate::model::Basetype;

/// Kilometres per degree used to turn the tile buffer into degrees.
///
/// Applied to longitude as well, so the buffer is narrower east-west than
/// north-south away from the equator.
pub const KM_PER_DEGREE: f64 = 111.0;

/// Identity of a cached spatial index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexKey {
    Tile {
        basetype: Basetype,
        x: i32,
        y: i32,
        /// Tile edge length in micro-degrees
        cell_size_udeg: u32,
        buffer_m: u32,
    },
    /// Whole dataset for one basetype
    Global { basetype: Basetype },
}

impl IndexKey {
    /// Key of the index serving a route through `stops`.
    ///
    /// The tile is chosen by the centroid of the stops. Returns `None`
    /// when there are no stops to place.
    pub fn for_stops(basetype: Basetype, stops: &[Point<f64>], config: &SpatialConfig) -> Option<Self> {
        if config.mode == IndexMode::Global {
            return Some(IndexKey::Global { basetype });
        }
        let centroid = MultiPoint::new(stops.to_vec()).centroid()?;
        Some(Self::tile_containing(basetype, centroid, config))
    }

    /// Key of the index a single stop is snapped against: the tile the
    /// stop lies in, or the global index of `basetype`
    pub fn for_stop(basetype: Basetype, stop: Point<f64>, config: &SpatialConfig) -> Self {
        match config.mode {
            IndexMode::Tiled => Self::tile_containing(basetype, stop, config),
            IndexMode::Global => IndexKey::Global { basetype },
        }
    }

    pub fn tile_containing(basetype: Basetype, point: Point<f64>, config: &SpatialConfig) -> Self {
        IndexKey::Tile {
            basetype,
            x: (point.x() / config.cell_size_deg).floor() as i32,
            y: (point.y() / config.cell_size_deg).floor() as i32,
            cell_size_udeg: (config.cell_size_deg * 1e6).round() as u32,
            buffer_m: (config.buffer_km * 1000.0).round() as u32,
        }
    }

    pub fn basetype(&self) -> Basetype {
        match self {
            IndexKey::Tile { basetype, .. } | IndexKey::Global { basetype } => *basetype,
        }
    }

    /// Geographic area the index covers, tile plus buffer. `None` for global indexes.
    pub fn bounds(&self) -> Option<Rect<f64>> {
        match *self {
            IndexKey::Tile {
                x,
                y,
                cell_size_udeg,
                buffer_m,
                ..
            } => {
                let cell = f64::from(cell_size_udeg) / 1e6;
                let pad = f64::from(buffer_m) / 1000.0 / KM_PER_DEGREE;
                Some(Rect::new(
                    coord! { x: f64::from(x) * cell - pad, y: f64::from(y) * cell - pad },
                    coord! { x: f64::from(x + 1) * cell + pad, y: f64::from(y + 1) * cell + pad },
                ))
            }
            IndexKey::Global { .. } => None,
        }
    }
}
