//! Core data models for trip planning and route geometry.
//!
//! Wire names follow the planner service contract (camelCase).

use std::fmt;

use geojson::{Feature, Geometry, JsonObject, Value};
use serde::{Deserialize, Serialize};

use crate::spatial::path_length_m;

/// Assumed average speed for straight-line fallback routes (~80 km/h).
const FALLBACK_SPEED_MPS: f64 = 22.2;

/// A geographic coordinate in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatLon {
    pub latitude: f64,
    pub longitude: f64,
}

impl LatLon {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// `[longitude, latitude]`, the order used by GeoJSON and the directions provider.
    pub fn position(&self) -> [f64; 2] {
        [self.longitude, self.latitude]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointKind {
    Start,
    Charging,
    Destination,
    Waypoint,
}

/// Identifier of a charging station in the catalog. The planner may send
/// either numeric or string keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StationRef {
    Numeric(i64),
    Key(String),
}

impl fmt::Display for StationRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StationRef::Numeric(id) => write!(f, "{}", id),
            StationRef::Key(key) => write!(f, "{}", key),
        }
    }
}

/// A point along the trip. Order within a route is the trip sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutePoint {
    pub latitude: f64,
    pub longitude: f64,
    pub kind: PointKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub station_ref: Option<StationRef>,
    #[serde(
        default,
        rename = "powerKW",
        skip_serializing_if = "Option::is_none"
    )]
    pub power_kw: Option<f64>,
}

impl RoutePoint {
    pub fn new(location: LatLon, kind: PointKind) -> Self {
        Self {
            latitude: location.latitude,
            longitude: location.longitude,
            kind,
            station_ref: None,
            power_kw: None,
        }
    }

    pub fn charging(location: LatLon, station_ref: StationRef, power_kw: Option<f64>) -> Self {
        Self {
            station_ref: Some(station_ref),
            power_kw,
            ..Self::new(location, PointKind::Charging)
        }
    }

    pub fn location(&self) -> LatLon {
        LatLon::new(self.latitude, self.longitude)
    }

    pub fn position(&self) -> [f64; 2] {
        [self.longitude, self.latitude]
    }
}

/// Road geometry plus totals for an ordered list of points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub points: Vec<RoutePoint>,
    /// `[longitude, latitude]` pairs.
    pub polyline: Vec<[f64; 2]>,
    pub distance_meters: f64,
    pub duration_seconds: f64,
}

impl Route {
    /// Approximate route drawn directly between the raw points.
    ///
    /// Used when no road geometry could be fetched; distance is the
    /// great-circle length and duration assumes a constant cruising speed.
    pub fn straight_line(points: &[RoutePoint]) -> Self {
        let locations: Vec<LatLon> = points.iter().map(RoutePoint::location).collect();
        let distance_meters = path_length_m(&locations);
        Self {
            points: points.to_vec(),
            polyline: points.iter().map(RoutePoint::position).collect(),
            distance_meters,
            duration_seconds: distance_meters / FALLBACK_SPEED_MPS,
        }
    }

    /// The geometry handed to the map layer.
    pub fn line_string(&self) -> Geometry {
        Geometry::new(Value::LineString(
            self.polyline.iter().map(|p| p.to_vec()).collect(),
        ))
    }

    pub fn feature(&self) -> Feature {
        let mut properties = JsonObject::new();
        properties.insert(
            "distanceMeters".to_string(),
            serde_json::json!(self.distance_meters),
        );
        properties.insert(
            "durationSeconds".to_string(),
            serde_json::json!(self.duration_seconds),
        );
        Feature {
            bbox: None,
            geometry: Some(self.line_string()),
            id: None,
            properties: Some(properties),
            foreign_members: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    pub max_range_km: f64,
}

/// Trip parameters sent to the planner service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanRequest {
    pub start: LatLon,
    pub end: LatLon,
    pub vehicle: Vehicle,
    pub current_soc_percent: f64,
    pub reserve_percent: f64,
    pub corridor_km: f64,
    pub max_stops: u32,
    pub charge_after_stop_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanSummary {
    pub distance_km: f64,
    pub duration_min: f64,
    pub charging_stops: u32,
    pub reserve_percent: f64,
}

/// Ordered stops chosen by the planner, from `start` to `destination`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanResponse {
    pub points: Vec<RoutePoint>,
    pub summary: PlanSummary,
}

impl PlanResponse {
    pub fn charging_points(&self) -> impl Iterator<Item = &RoutePoint> {
        self.points
            .iter()
            .filter(|point| point.kind == PointKind::Charging)
    }

    pub fn charging_stop_count(&self) -> u32 {
        self.charging_points().count() as u32
    }

    /// Marker features for the map layer, one per point, tagged with `kind`.
    pub fn point_features(&self) -> Vec<Feature> {
        self.points
            .iter()
            .map(|point| {
                let mut properties = JsonObject::new();
                properties.insert("kind".to_string(), serde_json::json!(point.kind));
                if let Some(station_ref) = &point.station_ref {
                    properties.insert("stationRef".to_string(), serde_json::json!(station_ref));
                }
                if let Some(power_kw) = point.power_kw {
                    properties.insert("powerKW".to_string(), serde_json::json!(power_kw));
                }
                Feature {
                    bbox: None,
                    geometry: Some(Geometry::new(Value::Point(point.position().to_vec()))),
                    id: None,
                    properties: Some(properties),
                    foreign_members: None,
                }
            })
            .collect()
    }
}
