//! Validating facade over a [`PlannerService`].

use evroute_core::validation::clamp_percent;
use evroute_core::{
    validate_plan_request, PlanLimits, PlanRequest, PlanResponse, PointKind, RouteError,
};
use tracing::{debug, warn};

use crate::client::{PlanEnvelope, PlannerService};

pub struct RoutePlanner<S> {
    service: S,
    limits: PlanLimits,
}

impl<S: PlannerService> RoutePlanner<S> {
    pub fn new(service: S) -> Self {
        Self::with_limits(service, PlanLimits::default())
    }

    pub fn with_limits(service: S, limits: PlanLimits) -> Self {
        Self { service, limits }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    /// Check a request without contacting the planner. Returns the clamped
    /// copy that [`plan`](Self::plan) would send.
    pub fn validate(&self, request: &PlanRequest) -> Result<PlanRequest, RouteError> {
        validate_plan_request(request, &self.limits)
    }

    /// Validate `request`, send it to the planner service and normalize the answer.
    pub async fn plan(&self, request: &PlanRequest) -> Result<PlanResponse, RouteError> {
        let request = self.validate(request)?;
        debug!(
            max_range_km = request.vehicle.max_range_km,
            soc = request.current_soc_percent,
            reserve = request.reserve_percent,
            corridor_km = request.corridor_km,
            "Planning trip"
        );

        let envelope = self.service.request_plan(&request).await.map_err(|err| {
            warn!(error = %err, "Planner request failed");
            RouteError::from(err)
        })?;
        normalize_response(envelope, &self.limits)
    }
}

/// Turn a planner envelope into a complete [`PlanResponse`] or a
/// `PlanningFailed` error.
pub fn normalize_response(
    envelope: PlanEnvelope,
    limits: &PlanLimits,
) -> Result<PlanResponse, RouteError> {
    if !envelope.success {
        return Err(RouteError::PlanningFailed {
            reason: "planner reported failure".to_string(),
            service_message: envelope.error,
        });
    }
    let Some(mut plan) = envelope.data else {
        return Err(RouteError::PlanningFailed {
            reason: "planner response has no data".to_string(),
            service_message: envelope.error,
        });
    };

    match (plan.points.first(), plan.points.last()) {
        (Some(first), Some(last))
            if plan.points.len() >= 2
                && first.kind == PointKind::Start
                && last.kind == PointKind::Destination => {}
        _ => {
            return Err(RouteError::planning_failed(
                "plan must run from a start point to a destination point",
            ))
        }
    }

    if plan
        .points
        .iter()
        .any(|point| !point.latitude.is_finite() || !point.longitude.is_finite())
    {
        return Err(RouteError::planning_failed("plan contains invalid coordinates"));
    }

    let summary = &mut plan.summary;
    if !summary.distance_km.is_finite()
        || summary.distance_km < 0.0
        || !summary.duration_min.is_finite()
        || summary.duration_min < 0.0
    {
        return Err(RouteError::planning_failed("plan summary is malformed"));
    }
    summary.reserve_percent = clamp_percent(summary.reserve_percent, limits.max_reserve_percent);

    let charging_stops = plan
        .points
        .iter()
        .filter(|point| point.kind == PointKind::Charging)
        .count() as u32;
    if plan.summary.charging_stops != charging_stops {
        warn!(
            reported = plan.summary.charging_stops,
            counted = charging_stops,
            "Planner summary disagrees with charging points; using counted value"
        );
        plan.summary.charging_stops = charging_stops;
    }

    Ok(plan)
}
