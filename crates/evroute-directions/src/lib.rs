//! Directions provider access and route stitching.
//!
//! [`MapboxDirectionsClient`] issues one bounded request per call;
//! [`SegmentStitcher`] turns arbitrarily long waypoint lists into one
//! continuous route by chaining overlapping windows.

pub mod client;
pub mod stitch;

pub use client::{
    DirectionsClientParams, DirectionsError, DirectionsProfile, DirectionsProvider,
    MapboxDirectionsClient, Segment, DEFAULT_PROVIDER_LIMIT,
};
pub use stitch::{plan_windows, SegmentStitcher, StitchParams, DEFAULT_WINDOW_SIZE};
