//! Route flow state machine.
//!
//! Every calculation takes a generation number when it starts. Its result
//! is only applied if no newer calculation (or cancel) has started since,
//! so the preview always reflects the last request made.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use evroute_core::{PlanRequest, PlanResponse, Route, RouteError};
use evroute_directions::{DirectionsProvider, SegmentStitcher};
use evroute_planner::{PlannerService, RoutePlanner};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::form::{FormDefaults, TripForm};
use crate::state::{FlowState, Preview, PreviewGeometry};

#[derive(Debug, Clone)]
pub struct FlowOptions {
    pub form_defaults: FormDefaults,
    /// Fetch road geometry for the plan points. When off, or when the
    /// directions provider fails, the preview uses straight segments.
    pub stitch_road_geometry: bool,
}

impl Default for FlowOptions {
    fn default() -> Self {
        Self {
            form_defaults: FormDefaults::default(),
            stitch_road_geometry: true,
        }
    }
}

/// A started calculation.
#[derive(Debug, Clone)]
pub struct FlowTicket {
    pub generation: u64,
    pub request: PlanRequest,
    token: CancellationToken,
}

impl FlowTicket {
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Result of a completed calculation, before it is applied.
#[derive(Debug, Clone)]
pub struct PlannedTrip {
    pub plan: PlanResponse,
    pub geometry: PreviewGeometry,
}

#[derive(Debug)]
pub enum FlowOutcome {
    /// The result became the current preview.
    Applied(Arc<Preview>),
    /// The calculation failed; any earlier preview is kept.
    Failed(RouteError),
    /// A newer calculation or a cancel started first; the result was dropped.
    Superseded,
}

impl FlowOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, FlowOutcome::Applied(_))
    }
}

struct FlowInner {
    state: FlowState,
    preview: Option<Arc<Preview>>,
    generation: u64,
    active: Option<CancellationToken>,
}

pub struct RouteFlow<S, D> {
    planner: RoutePlanner<S>,
    stitcher: SegmentStitcher<D>,
    options: FlowOptions,
    inner: Mutex<FlowInner>,
}

impl<S: PlannerService, D: DirectionsProvider> RouteFlow<S, D> {
    pub fn new(
        planner: RoutePlanner<S>,
        stitcher: SegmentStitcher<D>,
        options: FlowOptions,
    ) -> Self {
        Self {
            planner,
            stitcher,
            options,
            inner: Mutex::new(FlowInner {
                state: FlowState::Idle,
                preview: None,
                generation: 0,
                active: None,
            }),
        }
    }

    pub fn planner(&self) -> &RoutePlanner<S> {
        &self.planner
    }

    pub fn stitcher(&self) -> &SegmentStitcher<D> {
        &self.stitcher
    }

    pub fn state(&self) -> FlowState {
        self.lock().state.clone()
    }

    pub fn preview(&self) -> Option<Arc<Preview>> {
        self.lock().preview.clone()
    }

    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    /// Validate, plan and apply in one go.
    pub async fn calculate(&self, form: &TripForm) -> FlowOutcome {
        let ticket = match self.begin(form) {
            Ok(ticket) => ticket,
            Err(err) => return FlowOutcome::Failed(err),
        };
        match self.execute(&ticket).await {
            Some(result) => self.commit(&ticket, result),
            None => {
                debug!(generation = ticket.generation, "Calculation cancelled");
                FlowOutcome::Superseded
            }
        }
    }

    /// Start a calculation.
    ///
    /// Any calculation still in flight is superseded, even if this one
    /// fails validation. Invalid input moves the flow to `Error` without
    /// touching the network.
    pub fn begin(&self, form: &TripForm) -> Result<FlowTicket, RouteError> {
        // Parsing and validation are synchronous, so the whole transition
        // happens under one lock.
        let mut inner = self.lock();
        inner.generation += 1;
        let generation = inner.generation;
        if let Some(token) = inner.active.take() {
            token.cancel();
        }
        inner.state = FlowState::Validating;

        let request = form
            .to_plan_request(&self.options.form_defaults)
            .and_then(|request| self.planner.validate(&request));

        match request {
            Ok(request) => {
                let token = CancellationToken::new();
                inner.active = Some(token.clone());
                inner.state = FlowState::Planning { generation };
                debug!(generation, "Calculation started");
                Ok(FlowTicket {
                    generation,
                    request,
                    token,
                })
            }
            Err(err) => {
                debug!(generation, error = %err, "Trip input rejected");
                inner.state = FlowState::Error(err.user_message());
                Err(err)
            }
        }
    }

    /// Run the planner and stitcher for `ticket`. Returns `None` if the
    /// ticket was cancelled before the work finished.
    pub async fn execute(&self, ticket: &FlowTicket) -> Option<Result<PlannedTrip, RouteError>> {
        let planned = tokio::select! {
            biased;
            _ = ticket.token.cancelled() => return None,
            planned = self.planner.plan(&ticket.request) => planned,
        };
        let plan = match planned {
            Ok(plan) => plan,
            Err(err) => return Some(Err(err)),
        };

        let geometry = if self.options.stitch_road_geometry {
            match self
                .stitcher
                .stitch_cancellable(&plan.points, &ticket.token)
                .await
            {
                Ok(Some(route)) => PreviewGeometry::Road(route),
                Ok(None) => return None,
                Err(err) => {
                    warn!(
                        generation = ticket.generation,
                        error = %err,
                        "Road geometry unavailable; drawing straight segments"
                    );
                    PreviewGeometry::StraightLine(Route::straight_line(&plan.points))
                }
            }
        } else {
            PreviewGeometry::StraightLine(Route::straight_line(&plan.points))
        };

        Some(Ok(PlannedTrip { plan, geometry }))
    }

    /// Apply a finished calculation if it is still the latest one.
    pub fn commit(
        &self,
        ticket: &FlowTicket,
        result: Result<PlannedTrip, RouteError>,
    ) -> FlowOutcome {
        let mut inner = self.lock();
        if inner.generation != ticket.generation {
            debug!(
                generation = ticket.generation,
                current = inner.generation,
                "Discarding stale calculation"
            );
            return FlowOutcome::Superseded;
        }
        inner.active = None;

        match result {
            Ok(trip) => {
                let preview = Arc::new(Preview {
                    generation: ticket.generation,
                    plan: trip.plan,
                    geometry: trip.geometry,
                    created_at: Utc::now(),
                });
                info!(
                    generation = ticket.generation,
                    charging_stops = preview.plan.summary.charging_stops,
                    distance_km = preview.plan.summary.distance_km,
                    approximate = preview.geometry.is_approximate(),
                    "Route preview ready"
                );
                inner.preview = Some(preview.clone());
                inner.state = FlowState::Previewing;
                FlowOutcome::Applied(preview)
            }
            Err(err) => {
                warn!(generation = ticket.generation, error = %err, "Route calculation failed");
                inner.state = FlowState::Error(err.user_message());
                FlowOutcome::Failed(err)
            }
        }
    }

    /// Abandon any calculation in flight. The current preview stays.
    pub fn cancel(&self) {
        let mut inner = self.lock();
        inner.generation += 1;
        if let Some(token) = inner.active.take() {
            token.cancel();
        }
        inner.state = FlowState::Idle;
        debug!(generation = inner.generation, "Flow cancelled");
    }

    fn lock(&self) -> MutexGuard<'_, FlowInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
