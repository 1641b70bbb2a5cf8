use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawStopTime {
    pub trip_id: String,
    pub arrival_time: String,
    pub departure_time: String,
    pub stop_id: String,
    pub stop_sequence: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawTransfer {
    pub from_stop_id: String,
    pub to_stop_id: String,
    pub min_transfer_time: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawStop {
    pub stop_id: String,
    pub stop_lat: String,
    pub stop_lon: String,
}

/// One feature of the network dataset as it appears in the file
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawNetworkFeature {
    #[serde(default)]
    pub properties: Option<RawEdgeProperties>,
    #[serde(default)]
    pub geometry: Option<RawGeometry>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RawEdgeProperties {
    pub basetype: Option<u8>,
    /// Either a number or a string depending on the dataset export
    pub object_id: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum RawGeometry {
    LineString(Vec<Vec<f64>>),
}

impl RawNetworkFeature {
    pub fn line_string(basetype: u8, object_id: Option<&str>, coordinates: &[[f64; 2]]) -> Self {
        Self {
            properties: Some(RawEdgeProperties {
                basetype: Some(basetype),
                object_id: object_id.map(|id| serde_json::Value::String(id.to_string())),
            }),
            geometry: Some(RawGeometry::LineString(
                coordinates.iter().map(|c| c.to_vec()).collect(),
            )),
        }
    }

    /// Basetype code, features without one are roads
    pub fn basetype_code(&self) -> u8 {
        self.properties
            .as_ref()
            .and_then(|p| p.basetype)
            .unwrap_or(1)
    }

    pub fn object_id(&self) -> Option<String> {
        match self.properties.as_ref()?.object_id.as_ref()? {
            serde_json::Value::String(id) => Some(id.clone()),
            serde_json::Value::Null => None,
            other => Some(other.to_string()),
        }
    }

    /// Planar source coordinates, `None` if the geometry is missing or
    /// has fewer than two usable positions
    pub fn source_coords(&self) -> Option<Vec<geo::Coord<f64>>> {
        let RawGeometry::LineString(positions) = self.geometry.as_ref()?;
        let coords = positions
            .iter()
            .map(|position| match position.as_slice() {
                [x, y, ..] if x.is_finite() && y.is_finite() => Some(geo::coord! { x: *x, y: *y }),
                _ => None,
            })
            .collect::<Option<Vec<_>>>()?;
        (coords.len() >= 2).then_some(coords)
    }
}
