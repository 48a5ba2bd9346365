//! Health and readiness endpoint handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::json;

use super::AppState;
use crate::network::HealthState;

/// Returns health information as JSON.
///
/// Always returns 200; the `state` field tells whether the server is ready,
/// still starting, or draining after a remote shutdown request.
pub async fn health_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    let health = state.shutdown.health_state();
    let library = state.service.library();
    let uptime_secs = state.start_time.elapsed().as_secs();

    Json(json!({
        "state": health.as_str(),
        "library": library.type_name(),
        "keywords": library.len(),
        "uptime_secs": uptime_secs,
    }))
}

/// Readiness probe: 200 when ready, 503 otherwise.
pub async fn readiness_handler(State(state): State<AppState>) -> StatusCode {
    if state.shutdown.health_state() == HealthState::Ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use super::*;
    use crate::library::hyperv::testing::FakeHost;
    use crate::library::HyperVMgmtLibrary;
    use crate::network::shutdown::testing::RecordingTerminator;
    use crate::network::ShutdownCoordinator;
    use crate::service::{DocumentationResolver, RemoteLibraryService, ShutdownPolicy};

    fn test_state() -> AppState {
        let library = Arc::new(HyperVMgmtLibrary::build(Arc::new(FakeHost::default())).unwrap());
        let (terminator, _rx) = RecordingTerminator::new();
        let shutdown = Arc::new(ShutdownCoordinator::with_terminator(Arc::new(terminator)));
        let service = RemoteLibraryService::new(
            library,
            DocumentationResolver::new("RobotFramework.HyperVMgmtLibrary", None),
            Arc::clone(&shutdown),
            ShutdownPolicy::default(),
        );
        AppState {
            service,
            shutdown,
            start_time: Instant::now(),
        }
    }

    #[tokio::test]
    async fn health_handler_returns_json_with_all_fields() {
        let state = test_state();
        state.shutdown.set_ready();

        let json = health_handler(State(state)).await.0;

        assert_eq!(json["state"], "ready");
        assert_eq!(json["library"], "RobotFramework.HyperVMgmtLibrary");
        assert_eq!(json["keywords"], 5);
        assert!(json["uptime_secs"].is_number());
    }

    #[tokio::test]
    async fn health_handler_reports_starting_state() {
        let state = test_state();
        let response = health_handler(State(state)).await;
        assert_eq!(response.0["state"], "starting");
    }

    #[tokio::test]
    async fn readiness_handler_returns_200_when_ready() {
        let state = test_state();
        state.shutdown.set_ready();
        assert_eq!(readiness_handler(State(state)).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn readiness_handler_returns_503_when_starting() {
        let state = test_state();
        assert_eq!(
            readiness_handler(State(state)).await,
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[tokio::test]
    async fn readiness_handler_returns_503_after_remote_shutdown() {
        let state = test_state();
        state.shutdown.set_ready();
        state
            .shutdown
            .schedule_shutdown(Duration::from_secs(60))
            .unwrap();

        assert_eq!(
            readiness_handler(State(state.clone())).await,
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(health_handler(State(state)).await.0["state"], "draining");
    }
}
