//! # Research API
//!
//! Endpoints for starting, observing, and resetting research runs.

use axum::{
    extract::State,
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Json, Router,
};
use futures::stream::{self, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio_stream::wrappers::WatchStream;
use utoipa::ToSchema;

use stardust_core::research::{PipelineError, ProgressSnapshot};

use crate::{ApiResponse, SharedState};

const HEARTBEAT: Duration = Duration::from_secs(15);

/// Request to start a research run
#[derive(Debug, Deserialize, ToSchema)]
pub struct StartResearchRequest {
    /// Free-form research topic
    pub topic: String,
}

/// Response after a start request
#[derive(Debug, Serialize, ToSchema)]
pub struct StartResearchResponse {
    pub success: bool,
    pub message: String,
    /// Id of the accepted run
    pub run_id: Option<String>,
}

pub fn research_routes() -> Router<SharedState> {
    Router::new()
        .route("/status", get(get_status))
        .route("/start", post(start_research))
        .route("/reset", post(reset_research))
        .route("/progress", get(progress))
        .route("/events", get(events))
}

/// Get the current progress snapshot
#[utoipa::path(
    get,
    path = "/api/v1/research/status",
    tag = "research",
    responses(
        (status = 200, description = "Current progress snapshot of the research run")
    )
)]
pub async fn get_status(State(state): State<SharedState>) -> Json<ProgressSnapshot> {
    Json(state.controller.snapshot())
}

/// Start a research run on a topic
#[utoipa::path(
    post,
    path = "/api/v1/research/start",
    tag = "research",
    request_body = StartResearchRequest,
    responses(
        (status = 202, description = "Research run started", body = StartResearchResponse),
        (status = 400, description = "Topic is blank", body = StartResearchResponse),
        (status = 409, description = "A run is already in progress", body = StartResearchResponse)
    )
)]
pub async fn start_research(
    State(state): State<SharedState>,
    Json(req): Json<StartResearchRequest>,
) -> (StatusCode, Json<StartResearchResponse>) {
    match state.controller.start(&req.topic).await {
        Ok(handle) => {
            tracing::info!(run_id = %handle.run_id, "Research run accepted");
            (
                StatusCode::ACCEPTED,
                Json(StartResearchResponse {
                    success: true,
                    message: "Research started".to_string(),
                    run_id: Some(handle.run_id.to_string()),
                }),
            )
        }
        Err(e) => {
            let status = match e {
                PipelineError::EmptyTopic => StatusCode::BAD_REQUEST,
                PipelineError::RunInProgress { .. } => StatusCode::CONFLICT,
            };
            (
                status,
                Json(StartResearchResponse {
                    success: false,
                    message: e.to_string(),
                    run_id: None,
                }),
            )
        }
    }
}

/// Reset to idle, discarding the current run
#[utoipa::path(
    post,
    path = "/api/v1/research/reset",
    tag = "research",
    responses(
        (status = 200, description = "Controller reset", body = ApiResponse)
    )
)]
pub async fn reset_research(State(state): State<SharedState>) -> Json<ApiResponse> {
    state.controller.reset().await;
    Json(ApiResponse {
        success: true,
        message: "Research reset".to_string(),
    })
}

/// SSE stream of progress snapshots, one per change
async fn progress(
    State(state): State<SharedState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = WatchStream::new(state.controller.subscribe()).map(|snapshot| {
        let json = serde_json::to_string(&snapshot).unwrap_or_default();
        Ok(Event::default().event("progress").data(json))
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// SSE stream of lifecycle events with heartbeat
async fn events(
    State(state): State<SharedState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.event_tx.subscribe();

    let stream = stream::unfold(rx, |mut rx| async move {
        match tokio::time::timeout(HEARTBEAT, rx.recv()).await {
            Ok(Ok(event)) => {
                let json = serde_json::to_string(&event).unwrap_or_default();
                Some((Ok(Event::default().data(json)), rx))
            }
            Ok(Err(RecvError::Lagged(skipped))) => {
                tracing::debug!(skipped, "Event subscriber lagged");
                Some((Ok(Event::default().comment("lagged")), rx))
            }
            Ok(Err(RecvError::Closed)) => None,
            // Timeout - send heartbeat comment
            Err(_) => Some((Ok(Event::default().comment("heartbeat")), rx)),
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AppState;
    use stardust_core::research::{ResearchConfig, ResearchController, RunState};
    use std::sync::Arc;
    use tokio::sync::broadcast;

    fn state() -> SharedState {
        let (event_tx, _) = broadcast::channel(16);
        Arc::new(AppState {
            controller: ResearchController::with_llm(ResearchConfig::default()),
            event_tx,
        })
    }

    #[tokio::test]
    async fn test_blank_topic_is_bad_request() {
        let state = state();
        let (status, Json(body)) = start_research(
            State(state.clone()),
            Json(StartResearchRequest {
                topic: "  ".to_string(),
            }),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!body.success);
        assert!(body.run_id.is_none());
        assert_eq!(state.controller.snapshot().state, RunState::Idle);
    }

    #[tokio::test]
    async fn test_status_and_reset_when_idle() {
        let state = state();
        let Json(snapshot) = get_status(State(state.clone())).await;
        assert_eq!(snapshot.state, RunState::Idle);

        let Json(body) = reset_research(State(state.clone())).await;
        assert!(body.success);
        assert_eq!(state.controller.snapshot().state, RunState::Idle);
    }
}
