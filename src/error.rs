use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Every failure the run workflow can surface. Each step produces exactly one
/// of these kinds and propagates it unchanged; only the HTTP layer turns an
/// error into a response.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("required environment variables not set: {}", missing.join(", "))]
    Configuration { missing: Vec<String> },

    #[error("test package build failed: {stderr}")]
    Build { stderr: String },

    #[error("artifact {name} not found, tried: {}", tried.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", "))]
    ArtifactNotFound { name: String, tried: Vec<PathBuf> },

    #[error("failed to download application: {0}")]
    Download(String),

    #[error("downloaded artifact is empty: {}", .0.display())]
    EmptyArtifact(PathBuf),

    #[error("unknown app type: {0}, must be 'ios' or 'android'")]
    UnsupportedPlatform(String),

    #[error("failed to register upload slot: {0}")]
    Registration(String),

    #[error("artifact transfer failed: {0}")]
    Transfer(String),

    #[error("upload processing failed: {0}")]
    ProcessingFailed(String),

    #[error("upload processing timed out after {} seconds", .0.as_secs())]
    ProcessingTimeout(Duration),

    #[error("failed to list device pools: {0}")]
    DeviceGroupLookup(String),

    #[error("no device pools found for project {0}")]
    NoDeviceGroup(String),

    #[error("failed to schedule test run: {0}")]
    Schedule(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_error_lists_every_missing_name() {
        let err = OrchestratorError::Configuration {
            missing: vec!["S3_BUCKET".to_string(), "APP_TYPE".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "required environment variables not set: S3_BUCKET, APP_TYPE"
        );
    }

    #[test]
    fn device_pool_lookup_failure_names_the_failing_step() {
        let err = OrchestratorError::DeviceGroupLookup("request timed out".to_string());
        assert_eq!(
            err.to_string(),
            "failed to list device pools: request timed out"
        );
    }

    #[test]
    fn timeout_error_reports_seconds() {
        let err = OrchestratorError::ProcessingTimeout(Duration::from_secs(300));
        assert_eq!(
            err.to_string(),
            "upload processing timed out after 300 seconds"
        );
    }
}
