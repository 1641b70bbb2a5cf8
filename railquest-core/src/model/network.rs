//! Transport network edges and their mode classes

use geo::LineString;
use serde::{Deserialize, Serialize};

use crate::Error;

/// Identity of a network edge, used when merging edges into a route
pub type EdgeKey = String;

/// Mode class of a network edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Basetype {
    Road,
    Rail,
    /// Cable cars, gondolas and funiculars
    Cableway,
    Ferry,
}

impl Basetype {
    pub const ALL: [Basetype; 4] = [
        Basetype::Road,
        Basetype::Rail,
        Basetype::Cableway,
        Basetype::Ferry,
    ];

    /// Network class a route of the given GTFS (or extended) `route_type` runs on
    pub fn for_route_type(route_type: u16) -> Self {
        match route_type {
            2 | 101 | 102 | 103 | 105 | 106 | 107 | 109 | 116 | 117 => Basetype::Rail,
            4 => Basetype::Ferry,
            5 | 6 | 7 | 1400 => Basetype::Cableway,
            _ => Basetype::Road,
        }
    }

    /// Code used by the network dataset
    pub fn code(self) -> u8 {
        match self {
            Basetype::Road => 1,
            Basetype::Rail => 2,
            Basetype::Cableway => 3,
            Basetype::Ferry => 4,
        }
    }
}

impl TryFrom<u8> for Basetype {
    type Error = Error;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(Basetype::Road),
            2 => Ok(Basetype::Rail),
            3 => Ok(Basetype::Cableway),
            4 => Ok(Basetype::Ferry),
            other => Err(Error::InvalidBasetype(other)),
        }
    }
}

/// One segment of the physical network, in geographic coordinates
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkEdge {
    pub key: EdgeKey,
    pub basetype: Basetype,
    pub geometry: LineString<f64>,
}

impl NetworkEdge {
    /// Creates an edge, deriving its key from the end points when the
    /// dataset carries no object id
    pub fn new(object_id: Option<String>, basetype: Basetype, geometry: LineString<f64>) -> Self {
        let key = object_id.unwrap_or_else(|| endpoint_key(&geometry));
        Self {
            key,
            basetype,
            geometry,
        }
    }
}

fn endpoint_key(geometry: &LineString<f64>) -> EdgeKey {
    match (geometry.0.first(), geometry.0.last()) {
        (Some(first), Some(last)) => {
            format!("{},{}-{},{}", first.x, first.y, last.x, last.y)
        }
        _ => String::new(),
    }
}
