//! Flow configuration from environment.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use evroute_directions::client::DEFAULT_DIRECTIONS_URL;
use evroute_directions::{
    DirectionsClientParams, DirectionsError, DirectionsProfile, MapboxDirectionsClient,
    SegmentStitcher, StitchParams, DEFAULT_PROVIDER_LIMIT, DEFAULT_WINDOW_SIZE,
};
use evroute_planner::{HttpPlannerClient, PlannerClientParams, PlannerError, RoutePlanner};
use thiserror::Error;

use crate::flow::{FlowOptions, RouteFlow};
use crate::form::FormDefaults;

#[derive(Debug, Clone)]
pub struct Config {
    pub directions_url: String,
    pub directions_token: String,
    pub directions_profile: DirectionsProfile,
    pub provider_limit: usize,
    pub window_size: usize,
    pub directions_timeout: Duration,
    pub planner_url: String,
    pub planner_timeout: Duration,
    pub stitch_road_geometry: bool,
    pub form_defaults: FormDefaults,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_vars(|_| None)
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary variable source. Unset or
    /// unparsable values fall back to defaults.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let millis = |key: &str, default: u64| {
            Duration::from_millis(parse_var(&var, key).unwrap_or(default))
        };
        let defaults = FormDefaults::default();

        Self {
            directions_url: var("EVROUTE_DIRECTIONS_URL")
                .unwrap_or_else(|| DEFAULT_DIRECTIONS_URL.to_string()),
            directions_token: var("EVROUTE_DIRECTIONS_TOKEN").unwrap_or_default(),
            directions_profile: var("EVROUTE_DIRECTIONS_PROFILE")
                .and_then(|value| DirectionsProfile::from_str(&value).ok())
                .unwrap_or_default(),
            provider_limit: parse_var(&var, "EVROUTE_PROVIDER_LIMIT")
                .filter(|limit: &usize| *limit >= 2)
                .unwrap_or(DEFAULT_PROVIDER_LIMIT),
            window_size: parse_var(&var, "EVROUTE_WINDOW_SIZE")
                .filter(|size: &usize| *size >= 2)
                .unwrap_or(DEFAULT_WINDOW_SIZE),
            directions_timeout: millis("EVROUTE_DIRECTIONS_TIMEOUT_MS", 8_000),
            planner_url: var("EVROUTE_PLANNER_URL")
                .unwrap_or_else(|| "http://localhost:3000".to_string()),
            planner_timeout: millis("EVROUTE_PLANNER_TIMEOUT_MS", 15_000),
            stitch_road_geometry: var("EVROUTE_STITCH_ROAD_GEOMETRY")
                .and_then(|value| parse_flag(&value))
                .unwrap_or(true),
            form_defaults: FormDefaults {
                corridor_km: parse_var(&var, "EVROUTE_DEFAULT_CORRIDOR_KM")
                    .filter(|km: &f64| km.is_finite() && *km >= 0.0)
                    .unwrap_or(defaults.corridor_km),
                max_stops: parse_var(&var, "EVROUTE_DEFAULT_MAX_STOPS")
                    .unwrap_or(defaults.max_stops),
                charge_after_stop_percent: parse_var(
                    &var,
                    "EVROUTE_DEFAULT_CHARGE_AFTER_STOP_PERCENT",
                )
                .filter(|percent: &f64| (0.0..=100.0).contains(percent))
                .unwrap_or(defaults.charge_after_stop_percent),
            },
        }
    }

    pub fn directions_params(&self) -> DirectionsClientParams {
        DirectionsClientParams {
            base_url: self.directions_url.clone(),
            access_token: self.directions_token.clone(),
            max_waypoints: self.provider_limit,
            timeout: self.directions_timeout,
        }
    }

    pub fn stitch_params(&self) -> StitchParams {
        StitchParams {
            window_size: self.window_size,
            profile: self.directions_profile,
        }
    }

    pub fn planner_params(&self) -> PlannerClientParams {
        PlannerClientParams {
            base_url: self.planner_url.clone(),
            timeout: self.planner_timeout,
        }
    }

    pub fn flow_options(&self) -> FlowOptions {
        FlowOptions {
            form_defaults: self.form_defaults.clone(),
            stitch_road_geometry: self.stitch_road_geometry,
        }
    }
}

fn parse_var<T: FromStr>(var: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    var(key).and_then(|value| value.trim().parse().ok())
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("directions client: {0}")]
    Directions(#[from] DirectionsError),

    #[error("planner client: {0}")]
    Planner(#[from] PlannerError),
}

/// Wire the HTTP planner and directions clients into a [`RouteFlow`].
pub fn build_flow(
    config: &Config,
) -> Result<RouteFlow<HttpPlannerClient, MapboxDirectionsClient>, BuildError> {
    let planner = RoutePlanner::new(HttpPlannerClient::new(config.planner_params())?);
    let directions = MapboxDirectionsClient::new(config.directions_params())?;
    let stitcher = SegmentStitcher::new(directions, config.stitch_params());
    Ok(RouteFlow::new(planner, stitcher, config.flow_options()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        Config::from_vars(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let config = Config::default();
        assert_eq!(config.provider_limit, 25);
        assert_eq!(config.window_size, 20);
        assert_eq!(config.planner_url, "http://localhost:3000");
        assert_eq!(config.directions_timeout, Duration::from_secs(8));
        assert!(config.stitch_road_geometry);
        assert_eq!(config.form_defaults.max_stops, 5);
    }

    #[test]
    fn reads_overrides() {
        let config = config_from(&[
            ("EVROUTE_PLANNER_URL", "http://planner.internal:8080"),
            ("EVROUTE_DIRECTIONS_PROFILE", "mapbox/cycling"),
            ("EVROUTE_WINDOW_SIZE", "10"),
            ("EVROUTE_PLANNER_TIMEOUT_MS", "2500"),
            ("EVROUTE_STITCH_ROAD_GEOMETRY", "off"),
            ("EVROUTE_DEFAULT_CORRIDOR_KM", "1.5"),
        ]);
        assert_eq!(config.planner_url, "http://planner.internal:8080");
        assert_eq!(config.directions_profile, DirectionsProfile::Cycling);
        assert_eq!(config.stitch_params().window_size, 10);
        assert_eq!(config.planner_params().timeout, Duration::from_millis(2500));
        assert!(!config.flow_options().stitch_road_geometry);
        assert_eq!(config.form_defaults.corridor_km, 1.5);
    }

    #[test]
    fn invalid_values_fall_back() {
        let config = config_from(&[
            ("EVROUTE_PROVIDER_LIMIT", "1"),
            ("EVROUTE_WINDOW_SIZE", "many"),
            ("EVROUTE_DEFAULT_CHARGE_AFTER_STOP_PERCENT", "140"),
            ("EVROUTE_STITCH_ROAD_GEOMETRY", "maybe"),
        ]);
        assert_eq!(config.provider_limit, 25);
        assert_eq!(config.window_size, 20);
        assert_eq!(config.form_defaults.charge_after_stop_percent, 80.0);
        assert!(config.stitch_road_geometry);
    }

    #[test]
    fn builds_http_flow() {
        let flow = build_flow(&Config::default()).unwrap();
        assert_eq!(flow.generation(), 0);
    }
}
