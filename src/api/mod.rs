//! HTTP surface for toggling switches from a phone or home automation hub.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use log::error;
use serde::{Deserialize, Serialize};

use crate::{
    controller::ControllerStatus,
    runtime::ControllerHandle,
    switch::{HaltSwitch, Switch, SwitchState},
    GateId,
};

#[derive(Clone)]
pub struct ApiState {
    switches: Arc<Vec<Arc<Switch>>>,
    halt: Arc<HaltSwitch>,
    controller: ControllerHandle,
}

impl ApiState {
    pub fn new(switches: Vec<Arc<Switch>>, halt: HaltSwitch, controller: ControllerHandle) -> Self {
        Self {
            switches: Arc::new(switches),
            halt: Arc::new(halt),
            controller,
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct SetSwitch {
    pub on: bool,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
        .into_response()
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/switches", get(list_switches))
        .route("/switches/:id", get(get_switch).put(set_switch))
        .route("/status", get(status))
        .route("/halt", post(halt))
        .with_state(state)
}

async fn list_switches(State(state): State<ApiState>) -> Json<Vec<SwitchState>> {
    Json(state.switches.iter().map(|switch| switch.state()).collect())
}

async fn get_switch(State(state): State<ApiState>, Path(id): Path<GateId>) -> Response {
    match state.switches.get(id) {
        Some(switch) => Json(switch.state()).into_response(),
        None => error_response(StatusCode::NOT_FOUND, format!("no switch {}", id)),
    }
}

async fn set_switch(
    State(state): State<ApiState>,
    Path(id): Path<GateId>,
    Json(request): Json<SetSwitch>,
) -> Response {
    let Some(switch) = state.switches.get(id) else {
        return error_response(StatusCode::NOT_FOUND, format!("no switch {}", id));
    };

    // Applied by the control loop; GET shows the result
    switch.set_state(request.on).await;
    StatusCode::ACCEPTED.into_response()
}

async fn status(State(state): State<ApiState>) -> Result<Json<ControllerStatus>, Response> {
    state.controller.status().await.map(Json).map_err(|e| {
        error!("Status request failed: {}", e);
        error_response(StatusCode::SERVICE_UNAVAILABLE, e.to_string())
    })
}

async fn halt(State(state): State<ApiState>) -> Response {
    match state.halt.set_state(true).await {
        Ok(()) => StatusCode::ACCEPTED.into_response(),
        Err(e) => {
            error!("Halt failed: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::HaltConfig,
        controller::Controller,
        runtime::{control_channel, ControlLoop},
        testing::{EventLog, RecordingGates, RecordingPower},
        ControlMessage,
    };
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request};
    use tower::ServiceExt;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn put(id: usize, on: bool) -> Request<Body> {
        Request::builder()
            .method(Method::PUT)
            .uri(format!("/switches/{}", id))
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&SetSwitch { on }).unwrap()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_list_switches() {
        let (handle, _receiver) = control_channel(8);
        let app = router(ApiState::new(Switch::bank(2, &handle), HaltSwitch::new(None), handle));

        let response = app.oneshot(get("/switches")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            serde_json::json!([
                { "id": 0, "name": "Dusty Switch #0", "on": false },
                { "id": 1, "name": "Dusty Switch #1", "on": false },
            ])
        );
    }

    #[tokio::test]
    async fn test_set_switch_reaches_controller() {
        let (handle, mut receiver) = control_channel(8);
        let app = router(ApiState::new(Switch::bank(2, &handle), HaltSwitch::new(None), handle));

        let response = app.clone().oneshot(put(1, true)).await.unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert!(matches!(receiver.try_recv(), Some(ControlMessage::Activate(1))));

        let response = app.oneshot(put(1, false)).await.unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert!(matches!(
            receiver.try_recv(),
            Some(ControlMessage::Deactivate { gate: 1, .. })
        ));
    }

    #[tokio::test]
    async fn test_unknown_switch() {
        let (handle, mut receiver) = control_channel(8);
        let app = router(ApiState::new(Switch::bank(2, &handle), HaltSwitch::new(None), handle));

        let response = app.clone().oneshot(put(2, true)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(receiver.try_recv().is_none());

        let response = app.oneshot(get("/switches/7")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_status() {
        let log = EventLog::default();
        let (handle, receiver) = control_channel(8);
        let switches = Switch::bank(2, &handle);
        let controller = Controller::new(
            RecordingGates::new(&log),
            RecordingPower::new(&log),
            switches.clone(),
            2,
        );
        let join = ControlLoop::new(controller, receiver).spawn();
        let app = router(ApiState::new(switches, HaltSwitch::new(None), handle.clone()));

        app.clone().oneshot(put(0, true)).await.unwrap();
        // Queued behind the toggle, so the loop has applied it
        handle.status().await.unwrap();
        let response = app.clone().oneshot(get("/switches/0")).await.unwrap();
        assert_eq!(body_json(response).await["on"], true);
        app.clone().oneshot(put(0, false)).await.unwrap();

        let response = app.oneshot(get("/status")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({
                "active": null,
                "pending_close_gate": 0,
                "countdown": 2,
                "collector_powered": false,
            })
        );

        handle.shutdown().await;
        join.await.unwrap();
    }

    #[tokio::test]
    async fn test_status_without_controller() {
        let (handle, receiver) = control_channel(8);
        drop(receiver);
        let app = router(ApiState::new(Vec::new(), HaltSwitch::new(None), handle));

        let response = app.oneshot(get("/status")).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_halt() {
        let (handle, _receiver) = control_channel(8);
        let halt = HaltSwitch::new(Some(HaltConfig {
            command: vec!["true".to_string()],
        }));
        let app = router(ApiState::new(Vec::new(), halt, handle));

        let request = Request::builder()
            .method(Method::POST)
            .uri("/halt")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }
}
