//! Error taxonomy shared by the directions, planner and flow crates.

use thiserror::Error;

/// Coarse classification of a [`RouteError`], used for logging and UI mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    ProviderError,
    RouteUnavailable,
    PlanningFailed,
}

/// Terminal failure of a single route construction operation.
///
/// None of these carry partial results.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RouteError {
    /// Client-side validation failed; nothing was sent over the network.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The directions provider failed for a single request.
    #[error("directions provider error: {0}")]
    Provider(String),

    /// One window of a stitched route could not be fetched.
    #[error("route unavailable: window {window} of {windows} failed: {reason}")]
    RouteUnavailable {
        window: usize,
        windows: usize,
        reason: String,
    },

    /// The planner service failed or answered with an unusable body.
    /// `service_message` is the planner's own `error` text, if it sent one.
    #[error("planning failed: {reason}")]
    PlanningFailed {
        reason: String,
        service_message: Option<String>,
    },
}

impl RouteError {
    pub fn invalid_input(detail: impl Into<String>) -> Self {
        Self::InvalidInput(detail.into())
    }

    pub fn planning_failed(reason: impl Into<String>) -> Self {
        Self::PlanningFailed {
            reason: reason.into(),
            service_message: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::Provider(_) => ErrorKind::ProviderError,
            Self::RouteUnavailable { .. } => ErrorKind::RouteUnavailable,
            Self::PlanningFailed { .. } => ErrorKind::PlanningFailed,
        }
    }

    /// Short message suitable for showing to the driver.
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidInput(detail) => format!("Invalid trip parameters: {}", detail),
            Self::Provider(_) => "Could not reach the directions service".to_string(),
            Self::RouteUnavailable { .. } => {
                "Could not build a road route for this trip".to_string()
            }
            Self::PlanningFailed {
                service_message: Some(message),
                ..
            } if !message.trim().is_empty() => message.trim().to_string(),
            Self::PlanningFailed { .. } => "Could not reach the routing service".to_string(),
        }
    }
}
