pub mod error;
pub mod models;
pub mod spatial;
pub mod validation;

pub use error::{ErrorKind, RouteError};
pub use models::{
    LatLon, PlanRequest, PlanResponse, PlanSummary, PointKind, Route, RoutePoint, StationRef,
    Vehicle,
};
pub use spatial::{haversine_distance, path_length_m};
pub use validation::{validate_plan_request, PlanLimits};
