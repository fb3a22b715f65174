use crate::error::OrchestratorError;
use aws_config::BehaviorVersion;
use aws_sdk_s3::Client;
use std::path::{Path, PathBuf};
use tracing::info;

/// Where application binaries come from. The production implementation is S3;
/// tests substitute a local one.
#[allow(async_fn_in_trait)]
pub trait ApplicationSource {
    /// Copies the object to `dest_dir`, preserving the object's file name,
    /// and returns the local path.
    async fn fetch(
        &self,
        bucket: &str,
        key: &str,
        dest_dir: &Path,
    ) -> Result<PathBuf, OrchestratorError>;
}

#[derive(Clone)]
pub struct AppStore {
    client: Client,
}

impl AppStore {
    pub async fn new() -> Self {
        let config = aws_config::load_defaults(BehaviorVersion::latest()).await;
        AppStore {
            client: Client::new(&config),
        }
    }
}

impl ApplicationSource for AppStore {
    async fn fetch(
        &self,
        bucket: &str,
        key: &str,
        dest_dir: &Path,
    ) -> Result<PathBuf, OrchestratorError> {
        let file_name = key.rsplit('/').next().unwrap_or(key);
        let local_path = dest_dir.join(file_name);
        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| OrchestratorError::Download(err.into_service_error().to_string()))?;
        let bytes = output
            .body
            .collect()
            .await
            .map_err(|err| OrchestratorError::Download(err.to_string()))?
            .into_bytes();
        tokio::fs::create_dir_all(dest_dir)
            .await
            .map_err(|err| OrchestratorError::Download(err.to_string()))?;
        tokio::fs::write(&local_path, &bytes)
            .await
            .map_err(|err| OrchestratorError::Download(err.to_string()))?;
        info!(
            "downloaded s3://{}/{} to {} ({} bytes)",
            bucket,
            key,
            local_path.display(),
            bytes.len()
        );
        Ok(local_path)
    }
}
