use crate::device_farm::DeviceFarmClient;
use crate::error::OrchestratorError;
use crate::routes::{health, trigger_run};
use crate::storage::AppStore;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tower_http::LatencyUnit;
use tracing::Level;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<DeviceFarmClient>,
    pub source: Arc<AppStore>,
}

pub async fn build_api() -> Router {
    tracing_subscriber::fmt::init();

    let app_state = AppState {
        service: Arc::new(DeviceFarmClient::new().await),
        source: Arc::new(AppStore::new().await),
    };

    Router::new()
        .route("/runs", post(trigger_run))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http()
            .make_span_with(
                DefaultMakeSpan::new().include_headers(true))
            .on_request(
                DefaultOnRequest::new()
                    .level(Level::INFO))
            .on_response(
                DefaultOnResponse::new()
                    .level(Level::INFO)
                    .latency_unit(LatencyUnit::Micros)
            ))
        .with_state(app_state)
}

pub struct ApiResponse<T>(pub T);

impl<T> IntoResponse for ApiResponse<T>
where
    T: Serialize,
{
    fn into_response(self) -> Response {
        match serde_json::to_string(&self.0) {
            Ok(json) => Response::builder()
                .status(StatusCode::OK)
                .header("Content-Type", "application/json")
                .body(json.into())
                .unwrap(),
            Err(_) => Response::builder()
                .status(StatusCode::INTERNAL_SERVER_ERROR)
                .body("Failed to serialize response".into())
                .unwrap(),
        }
    }
}

#[derive(Deserialize, Serialize, Clone)]
pub struct ErrorBody {
    pub error: String,
}

/// Single conversion point: any workflow failure becomes a 500 carrying the
/// error message. Every other layer propagates the error unchanged.
impl IntoResponse for OrchestratorError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        tracing::error!("test execution failed: {}", message);
        Response::builder()
            .status(StatusCode::INTERNAL_SERVER_ERROR)
            .header("Content-Type", "application/json")
            .body(
                serde_json::to_string(&ErrorBody { error: message })
                    .unwrap_or_default()
                    .into(),
            )
            .unwrap()
    }
}
