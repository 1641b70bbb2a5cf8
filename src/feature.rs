use geo::LineString;
use geojson::{Feature, FeatureCollection, Geometry, Value as GeoJsonValue};
use serde_json::{Value, json};

use railquest_core::geometry::RouteGeometry;

use crate::EngineError;

/// Converts a route geometry to a `GeoJSON` `Feature`.
///
/// The geometry is `null` when fewer than two coordinates were produced.
pub fn route_feature(route_id: &str, geometry: &RouteGeometry) -> Result<Feature, EngineError> {
    let line = if geometry.coordinates.len() >= 2 {
        let line = LineString::new(geometry.coordinates.clone());
        Some(Geometry::new(GeoJsonValue::from(&line)))
    } else {
        None
    };

    let mut value = json!({
        "type": "Feature",
        "geometry": line,
        "properties": {
            "route_id": route_id,
            "straight_line": geometry.is_straight_line(),
            "fallback_pairs": geometry.fallback_pairs(),
            "source": geometry.source,
        }
    });
    if let (Some(bounds), Value::Object(object)) = (geometry.bounds, &mut value) {
        object.insert(
            "bbox".to_string(),
            json!([bounds.min().x, bounds.min().y, bounds.max().x, bounds.max().y]),
        );
    }

    serde_json::from_value::<Feature>(value).map_err(|e| EngineError::GeoJsonError(e.to_string()))
}

/// Collects route geometries into one `FeatureCollection`
pub fn routes_feature_collection<'a>(
    routes: impl IntoIterator<Item = (&'a str, &'a RouteGeometry)>,
) -> Result<FeatureCollection, EngineError> {
    let features = routes
        .into_iter()
        .map(|(route_id, geometry)| route_feature(route_id, geometry))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(FeatureCollection {
        features,
        bbox: None,
        foreign_members: None,
    })
}

pub fn to_geojson_string(collection: &FeatureCollection) -> Result<String, EngineError> {
    serde_json::to_string(collection).map_err(|e| EngineError::GeoJsonError(e.to_string()))
}
