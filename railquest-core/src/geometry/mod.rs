//! Route geometry reconstruction from ordered stops.

mod reconstruct;

pub use reconstruct::{GeometryReconstructor, GeometrySource, RouteGeometry};
