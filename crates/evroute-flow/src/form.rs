//! Raw trip input as typed by the user.

use evroute_core::{LatLon, PlanRequest, RouteError, Vehicle};
use serde::{Deserialize, Serialize};

/// Values used when an optional form field is left blank.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormDefaults {
    pub corridor_km: f64,
    pub max_stops: u32,
    pub charge_after_stop_percent: f64,
}

impl Default for FormDefaults {
    fn default() -> Self {
        Self {
            corridor_km: 5.0,
            max_stops: 5,
            charge_after_stop_percent: 80.0,
        }
    }
}

/// Trip form state. Numeric fields hold the text the user entered.
#[derive(Debug, Clone, Default)]
pub struct TripForm {
    pub start: Option<LatLon>,
    pub destination: Option<LatLon>,
    pub max_range_km: String,
    pub current_soc_percent: String,
    pub reserve_percent: String,
    pub corridor_km: String,
    pub max_stops: String,
    pub charge_after_stop_percent: String,
}

impl TripForm {
    pub fn endpoints(&self) -> Result<(LatLon, LatLon), RouteError> {
        match (self.start, self.destination) {
            (Some(start), Some(destination)) => Ok((start, destination)),
            _ => Err(RouteError::invalid_input("missing endpoints")),
        }
    }

    /// Parse the numeric fields into a request. Range checks happen in the planner facade.
    pub fn to_plan_request(&self, defaults: &FormDefaults) -> Result<PlanRequest, RouteError> {
        let (start, end) = self.endpoints()?;

        let max_range_km = parse_number(&self.max_range_km, "vehicle range")?;
        let current_soc_percent = parse_number(&self.current_soc_percent, "state of charge")?;
        let reserve_percent = parse_number(&self.reserve_percent, "reserve")?;

        let corridor_km =
            parse_optional(&self.corridor_km, "corridor")?.unwrap_or(defaults.corridor_km);
        let charge_after_stop_percent =
            parse_optional(&self.charge_after_stop_percent, "charge-after-stop target")?
                .unwrap_or(defaults.charge_after_stop_percent);
        let max_stops = match self.max_stops.trim() {
            "" => defaults.max_stops,
            text => text
                .parse::<u32>()
                .map_err(|_| RouteError::invalid_input("maximum stops must be a whole number"))?,
        };

        Ok(PlanRequest {
            start,
            end,
            vehicle: Vehicle { max_range_km },
            current_soc_percent,
            reserve_percent,
            corridor_km,
            max_stops,
            charge_after_stop_percent,
        })
    }
}

fn parse_number(text: &str, label: &str) -> Result<f64, RouteError> {
    parse_optional(text, label)?
        .ok_or_else(|| RouteError::invalid_input(format!("{} is required", label)))
}

fn parse_optional(text: &str, label: &str) -> Result<Option<f64>, RouteError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let invalid = || RouteError::invalid_input(format!("{} must be a number", label));
    let normalized = normalize_decimal_comma(trimmed).ok_or_else(invalid)?;
    match normalized.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(Some(value)),
        _ => Err(invalid()),
    }
}

/// Accept a single decimal comma ("72,5") from localized keyboards.
///
/// A comma next to a dot, more than one comma, or a comma followed by
/// exactly three digits reads as a thousands separator and is rejected
/// rather than guessed at.
fn normalize_decimal_comma(text: &str) -> Option<String> {
    let Some((whole, fraction)) = text.split_once(',') else {
        return Some(text.to_string());
    };
    let grouped = fraction.len() == 3 && fraction.bytes().all(|b| b.is_ascii_digit());
    if text.contains('.') || fraction.contains(',') || grouped {
        return None;
    }
    Some(format!("{}.{}", whole, fraction))
}
