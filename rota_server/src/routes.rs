//! Route handlers and the error-to-status mapping.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use rota_core::{solve_request, Event, ScheduleError, ScheduleRequest, SolveConfig};

pub fn router(config: SolveConfig) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/schedule", post(schedule))
        .with_state(config)
}

/// Liveness probe.
async fn index() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "rota-server",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Builds and solves one schedule. The solve blocks on the MILP backend,
/// so it runs off the async workers.
async fn schedule(
    State(config): State<SolveConfig>,
    Json(request): Json<ScheduleRequest>,
) -> Result<Json<Vec<Event>>, ApiError> {
    let events = tokio::task::spawn_blocking(move || solve_request(request, &config))
        .await
        .map_err(|e| ApiError(ScheduleError::Solver(format!("solve task failed: {e}"))))??;
    Ok(Json(events))
}

#[derive(Debug)]
pub struct ApiError(pub ScheduleError);

impl From<ScheduleError> for ApiError {
    fn from(err: ScheduleError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            ScheduleError::Validation { .. } => StatusCode::BAD_REQUEST,
            ScheduleError::ResourceExceeded { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ScheduleError::Infeasible => StatusCode::CONFLICT,
            ScheduleError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            ScheduleError::Solver(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %self.0, "schedule request failed");
        } else {
            tracing::info!(kind = self.0.kind(), error = %self.0, "schedule request refused");
        }
        let body = Json(serde_json::json!({
            "error": {
                "kind": self.0.kind(),
                "message": self.0.to_string(),
            }
        }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(json: serde_json::Value) -> Json<ScheduleRequest> {
        Json(serde_json::from_value(json).unwrap())
    }

    #[tokio::test]
    async fn index_acknowledges() {
        let Json(body) = index().await;
        assert_eq!(body["status"], "ok");
        assert!(body["version"].is_string());
    }

    #[tokio::test]
    async fn schedule_returns_every_instance() {
        let request = payload(serde_json::json!({
            "nurses": [{"id": 1, "name": "John Doe"}],
            "patients": [{"id": 1, "name": "Joe Schmoe"}],
            "tasks": [{
                "id": 1,
                "name": "Check vitals",
                "patient_id": 1,
                "number_of_times": 3,
                "duration": 1,
                "activity_type": "1",
                "minimum_separation": 40,
                "maximum_separation": 120,
                "earliest_start_time": 0
            }]
        }));
        let Json(events) = schedule(State(SolveConfig::default()), request)
            .await
            .unwrap();
        assert_eq!(events.len(), 3);
        assert!(events.iter().all(|e| e.task_id == 1));
    }

    #[tokio::test]
    async fn invalid_input_maps_to_bad_request() {
        let request = payload(serde_json::json!({
            "patients": [{"id": 1}],
            "tasks": [{
                "id": 1,
                "patient_id": 1,
                "number_of_times": 2,
                "activity_type": "1",
                "minimum_separation": 120,
                "maximum_separation": 40
            }]
        }));
        let err = schedule(State(SolveConfig::default()), request)
            .await
            .err()
            .expect("inverted separation must be refused");
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn infeasible_maps_to_conflict() {
        let request = payload(serde_json::json!({
            "patients": [{"id": 1}],
            "tasks": [{
                "id": 1,
                "patient_id": 1,
                "number_of_times": 2,
                "activity_type": "1",
                "minimum_separation": 200,
                "maximum_separation": 300
            }],
            "already_completed_tasks": [
                {"task_id": 1, "task_instance_id": 0, "start_time": 1340}
            ]
        }));
        let err = schedule(State(SolveConfig::default()), request)
            .await
            .err()
            .expect("over-the-horizon pin must be infeasible");
        assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
    }

    #[test]
    fn error_body_names_the_kind() {
        let body = serde_json::json!({
            "error": {
                "kind": ScheduleError::Infeasible.kind(),
                "message": ScheduleError::Infeasible.to_string(),
            }
        });
        assert_eq!(body["error"]["kind"], "Infeasible");
    }
}
