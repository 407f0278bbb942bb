//! Segment stitching against an in-memory directions provider.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use evroute_core::{ErrorKind, LatLon, PointKind, RouteError, RoutePoint};
use evroute_directions::{
    DirectionsError, DirectionsProfile, DirectionsProvider, SegmentStitcher, Segment, StitchParams,
};
use tokio_util::sync::CancellationToken;

/// Routes through every waypoint, inserting a midpoint between each pair so
/// geometry sizes differ from waypoint counts.
struct FakeDirections {
    limit: usize,
    fail_on_call: Option<usize>,
    calls: Mutex<Vec<Vec<LatLon>>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeDirections {
    fn new(limit: usize) -> Self {
        Self {
            limit,
            fail_on_call: None,
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    fn failing_on(limit: usize, call: usize) -> Self {
        Self {
            fail_on_call: Some(call),
            ..Self::new(limit)
        }
    }

    fn calls(&self) -> Vec<Vec<LatLon>> {
        self.calls.lock().unwrap().clone()
    }

    fn segment_for(waypoints: &[LatLon]) -> Segment {
        let mut coordinates = Vec::new();
        for (i, point) in waypoints.iter().enumerate() {
            if i > 0 {
                let prev = waypoints[i - 1];
                coordinates.push([
                    (prev.longitude + point.longitude) / 2.0,
                    (prev.latitude + point.latitude) / 2.0,
                ]);
            }
            coordinates.push(point.position());
        }
        let legs = (waypoints.len() - 1) as f64;
        Segment {
            coordinates,
            distance_meters: 1_000.0 * legs,
            duration_seconds: 60.0 * legs,
        }
    }
}

#[async_trait]
impl DirectionsProvider for FakeDirections {
    fn max_waypoints(&self) -> usize {
        self.limit
    }

    async fn fetch_segment(
        &self,
        waypoints: &[LatLon],
        _profile: DirectionsProfile,
    ) -> Result<Segment, DirectionsError> {
        let call = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(waypoints.to_vec());
            calls.len()
        };
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::task::yield_now().await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        assert!(waypoints.len() >= 2 && waypoints.len() <= self.limit);
        if self.fail_on_call == Some(call) {
            return Err(DirectionsError::Api {
                status: 503,
                message: "upstream unavailable".to_string(),
            });
        }
        Ok(Self::segment_for(waypoints))
    }
}

fn trip(len: usize) -> Vec<RoutePoint> {
    (0..len)
        .map(|i| {
            let kind = match i {
                0 => PointKind::Start,
                i if i == len - 1 => PointKind::Destination,
                _ => PointKind::Charging,
            };
            RoutePoint::new(LatLon::new(45.0 + i as f64 * 0.1, 7.0 + i as f64 * 0.05), kind)
        })
        .collect()
}

fn stitcher(provider: Arc<FakeDirections>, window_size: usize) -> SegmentStitcher<Arc<FakeDirections>> {
    SegmentStitcher::new(
        provider,
        StitchParams {
            window_size,
            ..StitchParams::default()
        },
    )
}

#[tokio::test]
async fn two_points_use_a_single_call_and_raw_geometry() {
    let provider = Arc::new(FakeDirections::new(25));
    let points = trip(2);

    let route = stitcher(provider.clone(), 20).stitch(&points).await.unwrap();

    let calls = provider.calls();
    assert_eq!(calls.len(), 1);
    let expected = FakeDirections::segment_for(&calls[0]);
    assert_eq!(route.polyline, expected.coordinates);
    assert_eq!(route.distance_meters, expected.distance_meters);
    assert_eq!(route.duration_seconds, expected.duration_seconds);
    assert_eq!(route.points, points);
}

#[tokio::test]
async fn up_to_provider_limit_is_one_call() {
    for len in 2..=25 {
        let provider = Arc::new(FakeDirections::new(25));
        let points = trip(len);
        let route = stitcher(provider.clone(), 20).stitch(&points).await.unwrap();
        assert_eq!(provider.calls().len(), 1, "len {len}");
        assert_eq!(provider.calls()[0].len(), len);
        assert_eq!(route.polyline, FakeDirections::segment_for(&provider.calls()[0]).coordinates);
    }
}

#[tokio::test]
async fn forty_seven_points_take_three_windows() {
    let provider = Arc::new(FakeDirections::new(25));
    let points = trip(47);

    let route = stitcher(provider.clone(), 20).stitch(&points).await.unwrap();

    let calls = provider.calls();
    assert_eq!(calls.len(), 3);
    let locations: Vec<LatLon> = points.iter().map(RoutePoint::location).collect();
    assert_eq!(calls[0], locations[0..=19].to_vec());
    assert_eq!(calls[1], locations[19..=38].to_vec());
    assert_eq!(calls[2], locations[38..=46].to_vec());

    for pair in route.polyline.windows(2) {
        assert_ne!(pair[0], pair[1], "duplicate vertex in stitched polyline");
    }
}

#[tokio::test]
async fn stitched_totals_and_counts_match_windows() {
    for len in [26usize, 39, 40, 47, 58, 100, 133] {
        let provider = Arc::new(FakeDirections::new(25));
        let points = trip(len);
        let route = stitcher(provider.clone(), 20).stitch(&points).await.unwrap();

        let calls = provider.calls();
        assert_eq!(calls.len(), (len - 1).div_ceil(19), "len {len}");

        let segments: Vec<Segment> = calls.iter().map(|c| FakeDirections::segment_for(c)).collect();
        let coordinate_sum: usize = segments.iter().map(|s| s.coordinates.len()).sum();
        assert_eq!(route.polyline.len(), coordinate_sum - (segments.len() - 1));

        let distance: f64 = segments.iter().map(|s| s.distance_meters).sum();
        let duration: f64 = segments.iter().map(|s| s.duration_seconds).sum();
        assert_eq!(route.distance_meters, distance);
        assert_eq!(route.duration_seconds, duration);
        assert!(route.distance_meters >= 0.0 && route.duration_seconds >= 0.0);

        assert_eq!(route.polyline.first().copied(), Some(points[0].position()));
        assert_eq!(route.polyline.last().copied(), Some(points[len - 1].position()));
    }
}

#[tokio::test]
async fn window_size_is_capped_at_provider_limit() {
    let provider = Arc::new(FakeDirections::new(10));
    let points = trip(30);

    stitcher(provider.clone(), 20).stitch(&points).await.unwrap();

    // effective window of 10 waypoints: ceil(29 / 9) = 4 calls
    let calls = provider.calls();
    assert_eq!(calls.len(), 4);
    assert!(calls.iter().all(|c| c.len() <= 10));
}

#[tokio::test]
async fn windows_are_requested_sequentially() {
    let provider = Arc::new(FakeDirections::new(25));
    stitcher(provider.clone(), 20).stitch(&trip(120)).await.unwrap();
    assert_eq!(provider.max_in_flight.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failing_window_aborts_without_partial_geometry() {
    let provider = Arc::new(FakeDirections::failing_on(25, 2));
    let err = stitcher(provider.clone(), 20)
        .stitch(&trip(47))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::RouteUnavailable);
    assert!(matches!(
        err,
        RouteError::RouteUnavailable {
            window: 2,
            windows: 3,
            ..
        }
    ));
    // the third window is never requested
    assert_eq!(provider.calls().len(), 2);
}

#[tokio::test]
async fn single_call_failure_is_route_unavailable() {
    let provider = Arc::new(FakeDirections::failing_on(25, 1));
    let err = stitcher(provider, 20).stitch(&trip(5)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RouteUnavailable);
}

#[tokio::test]
async fn fewer_than_two_points_is_invalid_input() {
    let provider = Arc::new(FakeDirections::new(25));
    let err = stitcher(provider.clone(), 20)
        .stitch(&trip(2)[..1])
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert!(provider.calls().is_empty());
}

#[tokio::test]
async fn co_located_points_pass_through_unchanged() {
    let provider = Arc::new(FakeDirections::new(25));
    let mut points = trip(3);
    points[1].latitude = points[2].latitude;
    points[1].longitude = points[2].longitude;

    stitcher(provider.clone(), 20).stitch(&points).await.unwrap();

    assert_eq!(provider.calls()[0].len(), 3);
}

#[tokio::test]
async fn cancelled_token_stops_before_any_request() {
    let provider = Arc::new(FakeDirections::new(25));
    let token = CancellationToken::new();
    token.cancel();

    let result = stitcher(provider.clone(), 20)
        .stitch_cancellable(&trip(47), &token)
        .await
        .unwrap();

    assert!(result.is_none());
    assert!(provider.calls().is_empty());
}

/// Answers the first window, then cancels the shared token from inside the
/// second request and never completes it.
struct CancellingDirections {
    inner: FakeDirections,
    token: CancellationToken,
}

#[async_trait]
impl DirectionsProvider for CancellingDirections {
    fn max_waypoints(&self) -> usize {
        self.inner.limit
    }

    async fn fetch_segment(
        &self,
        waypoints: &[LatLon],
        profile: DirectionsProfile,
    ) -> Result<Segment, DirectionsError> {
        if self.inner.calls().len() == 1 {
            self.inner.calls.lock().unwrap().push(waypoints.to_vec());
            self.token.cancel();
            return std::future::pending().await;
        }
        self.inner.fetch_segment(waypoints, profile).await
    }
}

#[tokio::test]
async fn cancelling_mid_window_drops_pending_request() {
    let token = CancellationToken::new();
    let provider = Arc::new(CancellingDirections {
        inner: FakeDirections::new(25),
        token: token.clone(),
    });
    let stitcher = SegmentStitcher::new(
        provider.clone(),
        StitchParams {
            window_size: 20,
            ..StitchParams::default()
        },
    );

    let result = tokio::time::timeout(
        std::time::Duration::from_secs(5),
        stitcher.stitch_cancellable(&trip(47), &token),
    )
    .await
    .expect("stitch must return once cancelled")
    .unwrap();

    assert!(result.is_none());
    // the third window is never requested
    assert_eq!(provider.inner.calls().len(), 2);
}
