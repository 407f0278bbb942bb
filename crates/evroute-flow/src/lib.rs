//! Route flow: validate, plan, preview.
//!
//! [`RouteFlow`] owns the current preview and makes sure only the most
//! recent calculation can replace it.

pub mod config;
pub mod flow;
pub mod form;
pub mod state;

pub use config::{build_flow, BuildError, Config};
pub use flow::{FlowOptions, FlowOutcome, FlowTicket, PlannedTrip, RouteFlow};
pub use form::{FormDefaults, TripForm};
pub use state::{FlowState, Preview, PreviewGeometry};
