//! Directions provider HTTP client.

use std::fmt::Display;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use evroute_core::{LatLon, RouteError};
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// Waypoints accepted per request by the hosted Mapbox directions API.
pub const DEFAULT_PROVIDER_LIMIT: usize = 25;

pub const DEFAULT_DIRECTIONS_URL: &str = "https://api.mapbox.com/directions/v5";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DirectionsProfile {
    #[default]
    Driving,
    Walking,
    Cycling,
}

impl Display for DirectionsProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                DirectionsProfile::Driving => "mapbox/driving",
                DirectionsProfile::Walking => "mapbox/walking",
                DirectionsProfile::Cycling => "mapbox/cycling",
            }
        )
    }
}

impl FromStr for DirectionsProfile {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().trim_start_matches("mapbox/") {
            "driving" => Ok(DirectionsProfile::Driving),
            "walking" => Ok(DirectionsProfile::Walking),
            "cycling" => Ok(DirectionsProfile::Cycling),
            other => Err(format!("unknown directions profile: {}", other)),
        }
    }
}

#[derive(Debug, Error)]
pub enum DirectionsError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("request timed out")]
    Timeout,

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("response contained no routes")]
    NoRoutes,

    #[error("route geometry is empty")]
    EmptyGeometry,

    #[error("expected 2..={limit} waypoints, got {count}")]
    WaypointCount { count: usize, limit: usize },
}

impl From<DirectionsError> for RouteError {
    fn from(err: DirectionsError) -> Self {
        RouteError::Provider(err.to_string())
    }
}

/// Geometry and totals of the first candidate route for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    /// `[longitude, latitude]` pairs.
    pub coordinates: Vec<[f64; 2]>,
    pub distance_meters: f64,
    pub duration_seconds: f64,
}

/// A directions backend that routes through a bounded number of waypoints.
#[async_trait]
pub trait DirectionsProvider: Send + Sync {
    /// Maximum waypoints accepted by a single [`fetch_segment`](Self::fetch_segment) call.
    fn max_waypoints(&self) -> usize;

    async fn fetch_segment(
        &self,
        waypoints: &[LatLon],
        profile: DirectionsProfile,
    ) -> Result<Segment, DirectionsError>;
}

#[async_trait]
impl<T: DirectionsProvider + ?Sized> DirectionsProvider for Arc<T> {
    fn max_waypoints(&self) -> usize {
        (**self).max_waypoints()
    }

    async fn fetch_segment(
        &self,
        waypoints: &[LatLon],
        profile: DirectionsProfile,
    ) -> Result<Segment, DirectionsError> {
        (**self).fetch_segment(waypoints, profile).await
    }
}

#[derive(Debug, Clone)]
pub struct DirectionsClientParams {
    pub base_url: String,
    pub access_token: String,
    pub max_waypoints: usize,
    pub timeout: Duration,
}

impl Default for DirectionsClientParams {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_DIRECTIONS_URL.to_string(),
            access_token: String::new(),
            max_waypoints: DEFAULT_PROVIDER_LIMIT,
            timeout: Duration::from_secs(8),
        }
    }
}

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    #[serde(default)]
    routes: Vec<DirectionsRoute>,
}

#[derive(Debug, Deserialize)]
struct DirectionsRoute {
    geometry: LineGeometry,
    distance: f64,
    duration: f64,
}

#[derive(Debug, Deserialize)]
struct LineGeometry {
    coordinates: Vec<[f64; 2]>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// HTTP client for a Mapbox-compatible `/directions/{profile}/{coordinates}` API.
pub struct MapboxDirectionsClient {
    params: DirectionsClientParams,
    client: Client,
}

impl MapboxDirectionsClient {
    pub fn new(params: DirectionsClientParams) -> Result<Self, DirectionsError> {
        let client = Client::builder().timeout(params.timeout).build()?;
        Ok(Self { params, client })
    }

    fn segment_url(&self, waypoints: &[LatLon], profile: DirectionsProfile) -> String {
        let coordinates = waypoints
            .iter()
            .map(|point| format!("{},{}", point.longitude, point.latitude))
            .collect::<Vec<_>>()
            .join(";");
        format!(
            "{}/{}/{}",
            self.params.base_url.trim_end_matches('/'),
            profile,
            coordinates
        )
    }
}

#[async_trait]
impl DirectionsProvider for MapboxDirectionsClient {
    fn max_waypoints(&self) -> usize {
        self.params.max_waypoints
    }

    async fn fetch_segment(
        &self,
        waypoints: &[LatLon],
        profile: DirectionsProfile,
    ) -> Result<Segment, DirectionsError> {
        let limit = self.params.max_waypoints;
        if waypoints.len() < 2 || waypoints.len() > limit {
            return Err(DirectionsError::WaypointCount {
                count: waypoints.len(),
                limit,
            });
        }

        let url = self.segment_url(waypoints, profile);
        debug!(waypoints = waypoints.len(), %profile, "Requesting directions");

        let response = self
            .client
            .get(url)
            .query(&[
                ("geometries", "geojson"),
                ("overview", "full"),
                ("steps", "true"),
                ("annotations", "distance,duration"),
                ("access_token", self.params.access_token.as_str()),
            ])
            .send()
            .await
            .map_err(map_transport_error)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&text)
                .ok()
                .and_then(|body| body.message)
                .unwrap_or(text);
            return Err(DirectionsError::Api { status, message });
        }

        let body: DirectionsResponse = response.json().await.map_err(map_transport_error)?;
        let route = body
            .routes
            .into_iter()
            .next()
            .ok_or(DirectionsError::NoRoutes)?;

        if route.geometry.coordinates.is_empty() {
            return Err(DirectionsError::EmptyGeometry);
        }

        Ok(Segment {
            coordinates: route.geometry.coordinates,
            distance_meters: route.distance.max(0.0),
            duration_seconds: route.duration.max(0.0),
        })
    }
}

fn map_transport_error(err: reqwest::Error) -> DirectionsError {
    if err.is_timeout() {
        DirectionsError::Timeout
    } else {
        DirectionsError::Request(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_round_trips_through_config_strings() {
        assert_eq!(
            "driving".parse::<DirectionsProfile>().unwrap(),
            DirectionsProfile::Driving
        );
        assert_eq!(
            "mapbox/cycling".parse::<DirectionsProfile>().unwrap(),
            DirectionsProfile::Cycling
        );
        assert!("driving-traffic".parse::<DirectionsProfile>().is_err());
        assert_eq!(DirectionsProfile::Walking.to_string(), "mapbox/walking");
    }

    #[test]
    fn segment_url_joins_lon_lat_pairs() {
        let client = MapboxDirectionsClient::new(DirectionsClientParams {
            base_url: "http://localhost:9000/directions/v5/".to_string(),
            ..DirectionsClientParams::default()
        })
        .unwrap();
        let url = client.segment_url(
            &[LatLon::new(52.5, 13.4), LatLon::new(48.1, 11.5)],
            DirectionsProfile::Driving,
        );
        assert_eq!(
            url,
            "http://localhost:9000/directions/v5/mapbox/driving/13.4,52.5;11.5,48.1"
        );
    }

    #[tokio::test]
    async fn rejects_too_many_waypoints_without_a_request() {
        let client = MapboxDirectionsClient::new(DirectionsClientParams {
            base_url: "http://127.0.0.1:9".to_string(),
            max_waypoints: 3,
            ..DirectionsClientParams::default()
        })
        .unwrap();
        let waypoints = vec![LatLon::new(0.0, 0.0); 4];
        let err = client
            .fetch_segment(&waypoints, DirectionsProfile::Driving)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DirectionsError::WaypointCount { count: 4, limit: 3 }
        ));
    }
}
