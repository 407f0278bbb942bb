//! Range checks and clamping for planner requests.

use serde::{Deserialize, Serialize};

use crate::error::RouteError;
use crate::models::PlanRequest;
use crate::spatial::is_valid_coordinate;

/// Documented ranges for trip parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanLimits {
    /// Upper bound for state of charge (percent)
    pub max_soc_percent: f64,
    /// Upper bound for the destination reserve (percent)
    pub max_reserve_percent: f64,
    /// Upper bound for the post-stop charge target (percent)
    pub max_charge_after_stop_percent: f64,
}

impl Default for PlanLimits {
    fn default() -> Self {
        Self {
            max_soc_percent: 100.0,
            max_reserve_percent: 50.0,
            max_charge_after_stop_percent: 100.0,
        }
    }
}

/// Validate a request and return the copy that is safe to put on the wire.
///
/// Range, state of charge, reserve and endpoints are rejected when out of
/// range; the remaining fields are clamped.
pub fn validate_plan_request(
    request: &PlanRequest,
    limits: &PlanLimits,
) -> Result<PlanRequest, RouteError> {
    if !is_valid_coordinate(&request.start) {
        return Err(RouteError::invalid_input("start coordinate out of range"));
    }
    if !is_valid_coordinate(&request.end) {
        return Err(RouteError::invalid_input(
            "destination coordinate out of range",
        ));
    }

    let range = request.vehicle.max_range_km;
    if !range.is_finite() || range <= 0.0 {
        return Err(RouteError::invalid_input(
            "vehicle range must be greater than 0 km",
        ));
    }

    let soc = request.current_soc_percent;
    if !soc.is_finite() || !(0.0..=limits.max_soc_percent).contains(&soc) {
        return Err(RouteError::invalid_input(format!(
            "state of charge must be between 0 and {}%",
            limits.max_soc_percent
        )));
    }

    let reserve = request.reserve_percent;
    if !reserve.is_finite() || !(0.0..=limits.max_reserve_percent).contains(&reserve) {
        return Err(RouteError::invalid_input(format!(
            "reserve must be between 0 and {}%",
            limits.max_reserve_percent
        )));
    }

    if !request.corridor_km.is_finite() {
        return Err(RouteError::invalid_input("corridor must be a number"));
    }
    if !request.charge_after_stop_percent.is_finite() {
        return Err(RouteError::invalid_input(
            "charge-after-stop target must be a number",
        ));
    }

    let mut clamped = request.clone();
    clamped.corridor_km = request.corridor_km.max(0.0);
    clamped.charge_after_stop_percent = clamp_percent(
        request.charge_after_stop_percent,
        limits.max_charge_after_stop_percent,
    );
    Ok(clamped)
}

/// Clamp a percentage into `0..=max`. Non-finite input maps to 0.
pub fn clamp_percent(value: f64, max: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, max)
    } else {
        0.0
    }
}
