//! Offline reference planner.
//!
//! Answers every request with the direct start to destination trip and no
//! charging stops. It makes no attempt at range or corridor reasoning; that
//! belongs to the production planner service.

use async_trait::async_trait;
use evroute_core::{
    haversine_distance, PlanRequest, PlanResponse, PlanSummary, PointKind, RoutePoint,
};

use crate::client::{PlanEnvelope, PlannerError, PlannerService};

#[derive(Debug, Clone)]
pub struct ReferencePlanner {
    /// Average speed used for the duration estimate
    pub average_speed_kmh: f64,
}

impl Default for ReferencePlanner {
    fn default() -> Self {
        Self {
            average_speed_kmh: 80.0,
        }
    }
}

#[async_trait]
impl PlannerService for ReferencePlanner {
    async fn request_plan(&self, request: &PlanRequest) -> Result<PlanEnvelope, PlannerError> {
        let distance_km = haversine_distance(
            request.start.latitude,
            request.start.longitude,
            request.end.latitude,
            request.end.longitude,
        ) / 1000.0;
        let duration_min = if self.average_speed_kmh > 0.0 {
            distance_km / self.average_speed_kmh * 60.0
        } else {
            0.0
        };

        Ok(PlanEnvelope::ok(PlanResponse {
            points: vec![
                RoutePoint::new(request.start, PointKind::Start),
                RoutePoint::new(request.end, PointKind::Destination),
            ],
            summary: PlanSummary {
                distance_km,
                duration_min,
                charging_stops: 0,
                reserve_percent: request.reserve_percent,
            },
        }))
    }
}
