use crate::api::{ApiResponse, AppState};
use crate::config::RunConfiguration;
use crate::device_farm::model::RunDescriptor;
use crate::error::OrchestratorError;
use crate::orchestration::{execute, ArtifactPlan};
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::Value;
use tracing::info;

/// Trigger endpoint. The event payload only carries routing information for
/// the upstream trigger and is ignored here.
pub async fn trigger_run(
    State(app_state): State<AppState>,
    event: Option<Json<Value>>,
) -> Result<ApiResponse<RunDescriptor>, OrchestratorError> {
    if let Some(Json(event)) = event {
        info!("trigger event: {}", event);
    }
    info!("starting device farm test execution");
    let config = RunConfiguration::from_env()?;
    let plan = ArtifactPlan::default();
    let descriptor = execute(
        app_state.service.as_ref(),
        app_state.source.as_ref(),
        &config,
        &plan,
        &std::env::temp_dir(),
    )
    .await?;
    info!("test execution completed successfully");
    Ok(ApiResponse(descriptor))
}

pub async fn health() -> StatusCode {
    StatusCode::OK
}
