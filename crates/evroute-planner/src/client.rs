//! Planner service HTTP client.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use evroute_core::{PlanRequest, PlanResponse, RouteError};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub const PLAN_API_PATH: &str = "/api/routes/plan";

#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("request timed out")]
    Timeout,

    #[error("API error: {status}")]
    Api {
        status: u16,
        message: Option<String>,
    },

    #[error("invalid response body: {0}")]
    Decode(String),
}

impl From<PlannerError> for RouteError {
    fn from(err: PlannerError) -> Self {
        let service_message = match &err {
            PlannerError::Api { message, .. } => message.clone(),
            _ => None,
        };
        RouteError::PlanningFailed {
            reason: err.to_string(),
            service_message,
        }
    }
}

/// Body returned by the planner service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanEnvelope {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: Option<PlanResponse>,
    #[serde(default)]
    pub error: Option<String>,
}

impl PlanEnvelope {
    pub fn ok(data: PlanResponse) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

/// Raw exchange with a stop planner. Implementations are stateless and
/// safe to call again with the same request.
#[async_trait]
pub trait PlannerService: Send + Sync {
    async fn request_plan(&self, request: &PlanRequest) -> Result<PlanEnvelope, PlannerError>;
}

#[async_trait]
impl<T: PlannerService + ?Sized> PlannerService for Arc<T> {
    async fn request_plan(&self, request: &PlanRequest) -> Result<PlanEnvelope, PlannerError> {
        (**self).request_plan(request).await
    }
}

#[derive(Debug, Clone)]
pub struct PlannerClientParams {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for PlannerClientParams {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            timeout: Duration::from_secs(15),
        }
    }
}

/// Posts [`PlanRequest`]s to `{base_url}/api/routes/plan`.
pub struct HttpPlannerClient {
    params: PlannerClientParams,
    client: Client,
}

impl HttpPlannerClient {
    pub fn new(params: PlannerClientParams) -> Result<Self, PlannerError> {
        let client = Client::builder().timeout(params.timeout).build()?;
        Ok(Self { params, client })
    }
}

#[async_trait]
impl PlannerService for HttpPlannerClient {
    async fn request_plan(&self, request: &PlanRequest) -> Result<PlanEnvelope, PlannerError> {
        let url = format!(
            "{}{}",
            self.params.base_url.trim_end_matches('/'),
            PLAN_API_PATH
        );
        let request_id = uuid::Uuid::new_v4().to_string();
        debug!(%request_id, "Requesting trip plan");

        let response = self
            .client
            .post(&url)
            .header("X-Request-ID", &request_id)
            .json(request)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let text = response.text().await.map_err(map_transport_error)?;

        if !status.is_success() {
            let message = serde_json::from_str::<PlanEnvelope>(&text)
                .ok()
                .and_then(|body| body.error);
            return Err(PlannerError::Api {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&text).map_err(|err| PlannerError::Decode(err.to_string()))
    }
}

fn map_transport_error(err: reqwest::Error) -> PlannerError {
    if err.is_timeout() {
        PlannerError::Timeout
    } else {
        PlannerError::Request(err)
    }
}
