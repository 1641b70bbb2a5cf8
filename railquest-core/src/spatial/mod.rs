//! Spatial indexing of the transport network.
//!
//! Edges of one basetype around a geographic tile are streamed from the
//! network dataset into an R-tree, and a bounded LRU cache keeps the most
//! recently used indexes. Stops are snapped to the nearest indexed edge.

mod cache;
mod cancel;
mod index;
mod lru;
mod projection;
mod snapping;
mod tile;

pub use cache::TileIndexCache;
pub use cancel::Cancellation;
pub use index::{EdgeEntry, EdgeIndex};
pub use projection::{ObliqueMercatorParams, Projection};
pub use snapping::{METERS_PER_DEGREE, SnappedEdge, nearest_edge, search_box};
pub use tile::{IndexKey, KM_PER_DEGREE};
