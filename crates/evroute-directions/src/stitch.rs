//! Multi-window route stitching.
//!
//! A trip with more waypoints than the provider accepts is split into
//! overlapping windows. Each window after the first starts at the last
//! waypoint of the previous one, so the geometries join end to start and
//! the shared vertex is dropped once when concatenating.

use std::ops::Range;

use evroute_core::{LatLon, Route, RouteError, RoutePoint};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::client::{DirectionsError, DirectionsProfile, DirectionsProvider, Segment};

pub const DEFAULT_WINDOW_SIZE: usize = 20;

#[derive(Debug, Clone)]
pub struct StitchParams {
    /// Waypoints per window when the trip exceeds the provider limit.
    /// Capped at the provider limit.
    pub window_size: usize,
    pub profile: DirectionsProfile,
}

impl Default for StitchParams {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            profile: DirectionsProfile::Driving,
        }
    }
}

/// Index ranges of the windows covering `len` waypoints.
///
/// Window `k` covers `k*(W-1) ..= k*(W-1) + W-1`, truncated at the last
/// waypoint. Consecutive windows share exactly one waypoint.
pub fn plan_windows(len: usize, window_size: usize) -> Vec<Range<usize>> {
    if len < 2 {
        return Vec::new();
    }
    let size = window_size.max(2);
    let step = size - 1;

    let mut windows = Vec::with_capacity((len - 1).div_ceil(step));
    let mut start = 0;
    while start < len - 1 {
        let end = (start + size).min(len);
        windows.push(start..end);
        start += step;
    }
    windows
}

/// Builds one continuous [`Route`] from any number of waypoints.
pub struct SegmentStitcher<D> {
    provider: D,
    params: StitchParams,
}

impl<D: DirectionsProvider> SegmentStitcher<D> {
    pub fn new(provider: D, params: StitchParams) -> Self {
        Self { provider, params }
    }

    pub fn provider(&self) -> &D {
        &self.provider
    }

    fn window_size(&self) -> usize {
        self.params
            .window_size
            .min(self.provider.max_waypoints())
            .max(2)
    }

    /// Stitch road geometry through `points` in order.
    pub async fn stitch(&self, points: &[RoutePoint]) -> Result<Route, RouteError> {
        let token = CancellationToken::new();
        match self.stitch_cancellable(points, &token).await? {
            Some(route) => Ok(route),
            // the token is local and never cancelled
            None => Err(RouteError::RouteUnavailable {
                window: 0,
                windows: 0,
                reason: "cancelled".to_string(),
            }),
        }
    }

    /// Like [`stitch`](Self::stitch), but returns `Ok(None)` as soon as
    /// `token` is cancelled, dropping any in-flight provider request.
    pub async fn stitch_cancellable(
        &self,
        points: &[RoutePoint],
        token: &CancellationToken,
    ) -> Result<Option<Route>, RouteError> {
        if points.len() < 2 {
            return Err(RouteError::invalid_input(
                "at least 2 waypoints are required to build a route",
            ));
        }

        let waypoints: Vec<LatLon> = points.iter().map(RoutePoint::location).collect();

        if waypoints.len() <= self.provider.max_waypoints() {
            let segment = match self.fetch(&waypoints, token).await {
                Ok(Some(segment)) => segment,
                Ok(None) => return Ok(None),
                Err(err) => return Err(window_failed(1, 1, err)),
            };
            return Ok(Some(Route {
                points: points.to_vec(),
                polyline: segment.coordinates,
                distance_meters: segment.distance_meters,
                duration_seconds: segment.duration_seconds,
            }));
        }

        let windows = plan_windows(waypoints.len(), self.window_size());
        let total = windows.len();
        debug!(
            waypoints = waypoints.len(),
            windows = total,
            "Stitching route from windows"
        );

        let mut polyline: Vec<[f64; 2]> = Vec::new();
        let mut distance_meters = 0.0;
        let mut duration_seconds = 0.0;

        // Windows are fetched one after another; never in parallel.
        for (index, range) in windows.into_iter().enumerate() {
            let segment = match self.fetch(&waypoints[range.clone()], token).await {
                Ok(Some(segment)) => segment,
                Ok(None) => return Ok(None),
                Err(err) => return Err(window_failed(index + 1, total, err)),
            };
            debug!(
                window = index + 1,
                of = total,
                from = range.start,
                to = range.end - 1,
                coordinates = segment.coordinates.len(),
                "Fetched window"
            );

            let skip = if index == 0 { 0 } else { 1 };
            polyline.extend(segment.coordinates.into_iter().skip(skip));
            distance_meters += segment.distance_meters;
            duration_seconds += segment.duration_seconds;
        }

        Ok(Some(Route {
            points: points.to_vec(),
            polyline,
            distance_meters,
            duration_seconds,
        }))
    }

    async fn fetch(
        &self,
        waypoints: &[LatLon],
        token: &CancellationToken,
    ) -> Result<Option<Segment>, DirectionsError> {
        tokio::select! {
            biased;
            _ = token.cancelled() => Ok(None),
            result = self.provider.fetch_segment(waypoints, self.params.profile) => result.map(Some),
        }
    }
}

fn window_failed(window: usize, windows: usize, err: DirectionsError) -> RouteError {
    warn!(window, windows, error = %err, "Directions window failed");
    RouteError::RouteUnavailable {
        window,
        windows,
        reason: err.to_string(),
    }
}
