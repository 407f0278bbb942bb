//! Flow states and the preview they expose.

use std::fmt;

use chrono::{DateTime, Utc};
use evroute_core::{PlanResponse, Route};

#[derive(Debug, Clone, PartialEq)]
pub enum FlowState {
    Idle,
    Validating,
    Planning { generation: u64 },
    Previewing,
    /// Idle after a failure, carrying the message shown to the user.
    Error(String),
}

impl FlowState {
    pub fn is_planning(&self) -> bool {
        matches!(self, FlowState::Planning { .. })
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            FlowState::Error(message) => Some(message),
            _ => None,
        }
    }
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlowState::Idle => write!(f, "idle"),
            FlowState::Validating => write!(f, "validating"),
            FlowState::Planning { generation } => write!(f, "planning#{}", generation),
            FlowState::Previewing => write!(f, "previewing"),
            FlowState::Error(_) => write!(f, "error"),
        }
    }
}

/// Line geometry for a preview.
#[derive(Debug, Clone, PartialEq)]
pub enum PreviewGeometry {
    /// Road geometry from the directions provider.
    Road(Route),
    /// Straight segments between the plan points; drawn when no road
    /// geometry is available.
    StraightLine(Route),
}

impl PreviewGeometry {
    pub fn route(&self) -> &Route {
        match self {
            PreviewGeometry::Road(route) | PreviewGeometry::StraightLine(route) => route,
        }
    }

    pub fn is_approximate(&self) -> bool {
        matches!(self, PreviewGeometry::StraightLine(_))
    }
}

/// The planned trip currently shown to the user.
#[derive(Debug, Clone)]
pub struct Preview {
    pub generation: u64,
    pub plan: PlanResponse,
    pub geometry: PreviewGeometry,
    pub created_at: DateTime<Utc>,
}
