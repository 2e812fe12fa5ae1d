//! GeoJSON input parsing and waypoint feature collection output.

use crate::error::{FlightPlanError, Result};
use crate::models::{Waypath, Waypoint};
use geo::{Coord, LineString, Polygon};
use serde_json::{json, Map, Value};

/// Outer rings of every polygon found in a GeoJSON value.
///
/// Accepts a bare geometry, a Feature, a FeatureCollection or a
/// GeometryCollection. Holes are dropped: multipolygons reduce to their
/// outer rings.
pub fn parse_polygons(value: &Value) -> Result<Vec<Polygon<f64>>> {
    let mut polygons = Vec::new();
    collect_polygons(value, &mut polygons)?;
    Ok(polygons)
}

/// The single polygon bounding the survey.
pub fn parse_area_of_interest(value: &Value) -> Result<Polygon<f64>> {
    let mut polygons = parse_polygons(value)?;
    if polygons.is_empty() {
        return Err(FlightPlanError::invalid_geometry(
            "project area contains no polygon",
        ));
    }
    if polygons.len() > 1 {
        tracing::warn!(
            "project area has {} polygons; using the first one",
            polygons.len()
        );
    }
    Ok(polygons.swap_remove(0))
}

fn collect_polygons(value: &Value, out: &mut Vec<Polygon<f64>>) -> Result<()> {
    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| FlightPlanError::invalid_geometry("GeoJSON object without a type"))?;

    match kind {
        "FeatureCollection" => {
            let features = value
                .get("features")
                .and_then(Value::as_array)
                .ok_or_else(|| FlightPlanError::invalid_geometry("FeatureCollection without features"))?;
            for feature in features {
                collect_polygons(feature, out)?;
            }
        }
        "Feature" => match value.get("geometry") {
            Some(geometry) if !geometry.is_null() => collect_polygons(geometry, out)?,
            _ => {}
        },
        "GeometryCollection" => {
            if let Some(geometries) = value.get("geometries").and_then(Value::as_array) {
                for geometry in geometries {
                    collect_polygons(geometry, out)?;
                }
            }
        }
        "Polygon" => {
            let rings = coordinates(value)?;
            out.push(polygon_from_rings(rings)?);
        }
        "MultiPolygon" => {
            let polygons = coordinates(value)?
                .as_array()
                .ok_or_else(|| FlightPlanError::invalid_geometry("MultiPolygon coordinates must be an array"))?;
            for rings in polygons {
                out.push(polygon_from_rings(rings)?);
            }
        }
        other => {
            tracing::debug!("ignoring non-polygon geometry {}", other);
        }
    }
    Ok(())
}

fn coordinates(value: &Value) -> Result<&Value> {
    value
        .get("coordinates")
        .ok_or_else(|| FlightPlanError::invalid_geometry("geometry without coordinates"))
}

fn polygon_from_rings(rings: &Value) -> Result<Polygon<f64>> {
    let outer = rings
        .as_array()
        .and_then(|rings| rings.first())
        .ok_or_else(|| FlightPlanError::invalid_geometry("polygon without an outer ring"))?;
    let positions = outer
        .as_array()
        .ok_or_else(|| FlightPlanError::invalid_geometry("ring must be an array of positions"))?;

    let mut coords = Vec::with_capacity(positions.len());
    for position in positions {
        let pair = position.as_array().filter(|p| p.len() >= 2).ok_or_else(|| {
            FlightPlanError::invalid_geometry("position must have longitude and latitude")
        })?;
        let (Some(x), Some(y)) = (pair[0].as_f64(), pair[1].as_f64()) else {
            return Err(FlightPlanError::invalid_geometry("position values must be numbers"));
        };
        coords.push(Coord { x, y });
    }
    Ok(Polygon::new(LineString::from(coords), Vec::new()))
}

/// Waypath as a FeatureCollection: Point features in point mode,
/// LineString features in line mode.
pub fn waypath_to_feature_collection(path: &Waypath) -> Value {
    let features: Vec<Value> = match path {
        Waypath::Points(points) => points.iter().map(point_feature).collect(),
        Waypath::Lines(lines) => lines
            .iter()
            .enumerate()
            .map(|(index, line)| {
                let mut properties = waypoint_properties(&line.start);
                properties.insert("sequence_index".into(), json!(index));
                properties.insert("speed".into(), json!(line.speed));
                properties.insert("row".into(), json!(line.row));
                properties.insert(
                    "action".into(),
                    json!(line.actions.first().map(|a| a.name()).unwrap_or("none")),
                );
                properties.insert("end_altitude".into(), json!(line.end.altitude));
                json!({
                    "type": "Feature",
                    "geometry": {
                        "type": "LineString",
                        "coordinates": [
                            position(&line.start),
                            position(&line.end),
                        ],
                    },
                    "properties": Value::Object(properties),
                })
            })
            .collect(),
    };
    json!({
        "type": "FeatureCollection",
        "features": features,
    })
}

fn point_feature(waypoint: &Waypoint) -> Value {
    json!({
        "type": "Feature",
        "geometry": {
            "type": "Point",
            "coordinates": position(waypoint),
        },
        "properties": Value::Object(waypoint_properties(waypoint)),
    })
}

fn position(waypoint: &Waypoint) -> Value {
    match waypoint.altitude {
        Some(altitude) => json!([waypoint.lon, waypoint.lat, altitude]),
        None => json!([waypoint.lon, waypoint.lat]),
    }
}

fn waypoint_properties(waypoint: &Waypoint) -> Map<String, Value> {
    let mut properties = Map::new();
    properties.insert("index".into(), json!(waypoint.sequence_index));
    properties.insert("sequence_index".into(), json!(waypoint.sequence_index));
    properties.insert("altitude".into(), json!(waypoint.altitude));
    properties.insert("altitude_agl".into(), json!(waypoint.altitude_agl));
    properties.insert("heading".into(), json!(waypoint.heading));
    properties.insert("gimbal_angle".into(), json!(waypoint.gimbal_angle));
    properties.insert("speed".into(), json!(waypoint.speed));
    properties.insert("action".into(), json!(waypoint.primary_action()));
    properties.insert("row".into(), json!(waypoint.row));
    if let Some(status) = waypoint.terrain {
        properties.insert("terrain".into(), json!(status));
    }
    properties
}
