//! Route Planner facade.
//!
//! The stop selection itself runs in an external service; this crate
//! validates trip parameters, talks to that service through a
//! [`PlannerService`] and normalizes its answers into [`PlanResponse`]s.
//!
//! [`PlanResponse`]: evroute_core::PlanResponse

pub mod client;
pub mod facade;
pub mod reference;

pub use client::{
    HttpPlannerClient, PlanEnvelope, PlannerClientParams, PlannerError, PlannerService,
    PLAN_API_PATH,
};
pub use facade::RoutePlanner;
pub use reference::ReferencePlanner;
