//! evroute CLI - helpers shared by the `evroute` binary.
//!
//! Parses coordinates from the command line, drives a [`RouteFlow`] to a
//! finished preview and renders results as GeoJSON.

use std::future::Future;
use std::io;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use evroute_core::spatial::is_valid_coordinate;
use evroute_core::{LatLon, PointKind, Route, RoutePoint};
use evroute_directions::DirectionsProvider;
use evroute_flow::{FlowOutcome, Preview, RouteFlow, TripForm};
use evroute_planner::PlannerService;
use geojson::{Feature, FeatureCollection};

/// Parse `LAT,LON` as typed on the command line.
pub fn parse_lat_lon(value: &str) -> Result<LatLon, String> {
    let (lat, lon) = value
        .split_once(',')
        .ok_or_else(|| format!("expected LAT,LON, got '{}'", value))?;
    let latitude: f64 = lat
        .trim()
        .parse()
        .map_err(|_| format!("invalid latitude '{}'", lat.trim()))?;
    let longitude: f64 = lon
        .trim()
        .parse()
        .map_err(|_| format!("invalid longitude '{}'", lon.trim()))?;

    let point = LatLon::new(latitude, longitude);
    if !is_valid_coordinate(&point) {
        return Err(format!("coordinate out of range: {}", value));
    }
    Ok(point)
}

/// Tag raw waypoints as start, intermediate and destination points.
pub fn waypoints_to_points(waypoints: &[LatLon]) -> Vec<RoutePoint> {
    let last = waypoints.len().saturating_sub(1);
    waypoints
        .iter()
        .enumerate()
        .map(|(i, location)| {
            let kind = match i {
                0 => PointKind::Start,
                i if i == last => PointKind::Destination,
                _ => PointKind::Waypoint,
            };
            RoutePoint::new(*location, kind)
        })
        .collect()
}

/// Message shown when a calculation is abandoned before it finishes.
pub const CANCELLED_MESSAGE: &str = "Route calculation cancelled";

/// Run one calculation to completion. Errors carry the user-facing message.
pub async fn plan_trip<S, D>(flow: &RouteFlow<S, D>, form: &TripForm) -> Result<Arc<Preview>>
where
    S: PlannerService,
    D: DirectionsProvider,
{
    match flow.calculate(form).await {
        FlowOutcome::Applied(preview) => Ok(preview),
        FlowOutcome::Failed(err) => Err(anyhow!(err.user_message())),
        FlowOutcome::Superseded => Err(anyhow!(CANCELLED_MESSAGE)),
    }
}

/// Run [`plan_trip`] until `interrupt` resolves with `Ok(())`, then cancel
/// the flow. An interrupt that fails (for example a signal handler that
/// could not be installed) is ignored and the calculation runs on.
pub async fn plan_trip_until<S, D, I>(
    flow: &RouteFlow<S, D>,
    form: &TripForm,
    interrupt: I,
) -> Result<Arc<Preview>>
where
    S: PlannerService,
    D: DirectionsProvider,
    I: Future<Output = io::Result<()>>,
{
    let calculation = plan_trip(flow, form);
    tokio::pin!(calculation);
    tokio::select! {
        result = &mut calculation => result,
        Ok(()) = interrupt => {
            flow.cancel();
            calculation.await
        }
    }
}

/// Route line followed by one marker per plan point.
pub fn preview_collection(preview: &Preview) -> FeatureCollection {
    let mut line = preview.geometry.route().feature();
    line.set_property("approximate", preview.geometry.is_approximate());
    line.set_property("chargingStops", preview.plan.summary.charging_stops);
    line.set_property("reservePercent", preview.plan.summary.reserve_percent);

    let mut features = vec![line];
    features.extend(preview.plan.point_features());
    collection(features)
}

pub fn route_collection(route: &Route) -> FeatureCollection {
    collection(vec![route.feature()])
}

fn collection(features: Vec<Feature>) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}
