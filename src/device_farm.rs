use crate::device_farm::model::{
    DeviceGroup, ScheduleRunRequest, ScheduledRun, UploadObservation, UploadSlot, UploadStatus,
};
use crate::error::OrchestratorError;
use aws_config::BehaviorVersion;
use aws_sdk_devicefarm::types::{ScheduleRunTest, TestType, UploadStatus as ServiceStatus, UploadType};
use aws_sdk_devicefarm::Client;
use reqwest::header::CONTENT_DISPOSITION;
use std::path::Path;
use tracing::info;

pub mod model;

/// The remote device-testing service as the workflow sees it. Implemented
/// against the real service below; tests substitute their own.
#[allow(async_fn_in_trait)]
pub trait TestService {
    async fn create_upload(
        &self,
        project_arn: &str,
        name: &str,
        upload_type: &str,
    ) -> Result<UploadSlot, OrchestratorError>;

    async fn get_upload(&self, upload_arn: &str) -> Result<UploadObservation, OrchestratorError>;

    async fn put_artifact(
        &self,
        upload_url: &str,
        local_path: &Path,
        file_name: &str,
    ) -> Result<(), OrchestratorError>;

    async fn list_device_pools(
        &self,
        project_arn: &str,
    ) -> Result<Vec<DeviceGroup>, OrchestratorError>;

    async fn schedule_run(
        &self,
        request: ScheduleRunRequest,
    ) -> Result<ScheduledRun, OrchestratorError>;
}

#[derive(Clone)]
pub struct DeviceFarmClient {
    client: Client,
    http: reqwest::Client,
}

impl DeviceFarmClient {
    pub async fn new() -> Self {
        let config = aws_config::load_defaults(BehaviorVersion::latest()).await;
        DeviceFarmClient {
            client: Client::new(&config),
            http: reqwest::Client::new(),
        }
    }

    // no credential chain lookup, for tests that only exercise the raw PUT
    #[cfg(test)]
    fn detached() -> Self {
        let config = aws_sdk_devicefarm::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .build();
        DeviceFarmClient {
            client: Client::from_conf(config),
            http: reqwest::Client::new(),
        }
    }
}

impl TestService for DeviceFarmClient {
    async fn create_upload(
        &self,
        project_arn: &str,
        name: &str,
        upload_type: &str,
    ) -> Result<UploadSlot, OrchestratorError> {
        let output = self
            .client
            .create_upload()
            .project_arn(project_arn)
            .name(name)
            .r#type(UploadType::from(upload_type))
            .send()
            .await
            .map_err(|err| OrchestratorError::Registration(err.into_service_error().to_string()))?;
        let upload = output.upload().ok_or_else(|| {
            OrchestratorError::Registration("service returned no upload record".to_string())
        })?;
        let arn = upload.arn().ok_or_else(|| {
            OrchestratorError::Registration("upload record is missing an arn".to_string())
        })?;
        let url = upload.url().ok_or_else(|| {
            OrchestratorError::Registration("upload record is missing a write url".to_string())
        })?;
        info!("created {} upload with arn: {}", upload_type, arn);
        Ok(UploadSlot {
            arn: arn.to_string(),
            url: url.to_string(),
        })
    }

    async fn get_upload(&self, upload_arn: &str) -> Result<UploadObservation, OrchestratorError> {
        let output = self
            .client
            .get_upload()
            .arn(upload_arn)
            .send()
            .await
            .map_err(|err| {
                OrchestratorError::ProcessingFailed(format!(
                    "error checking upload status: {}",
                    err.into_service_error()
                ))
            })?;
        let upload = output.upload().ok_or_else(|| {
            OrchestratorError::ProcessingFailed("service returned no upload record".to_string())
        })?;
        let status = match upload.status() {
            Some(ServiceStatus::Succeeded) => UploadStatus::Succeeded,
            Some(ServiceStatus::Failed) => UploadStatus::Failed,
            _ => UploadStatus::Pending,
        };
        Ok(UploadObservation {
            status,
            message: upload.message().map(str::to_string),
            metadata: upload.metadata().map(str::to_string),
        })
    }

    async fn put_artifact(
        &self,
        upload_url: &str,
        local_path: &Path,
        file_name: &str,
    ) -> Result<(), OrchestratorError> {
        let bytes = tokio::fs::read(local_path)
            .await
            .map_err(|err| OrchestratorError::Transfer(err.to_string()))?;
        info!("transferring {} bytes for {}", bytes.len(), file_name);
        let response = self
            .http
            .put(upload_url)
            .header(
                CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            )
            .body(bytes)
            .send()
            .await
            .map_err(|err| OrchestratorError::Transfer(err.to_string()))?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let text = response.text().await.unwrap_or_default();
            Err(OrchestratorError::Transfer(format!(
                "upload endpoint returned {}: {}",
                status, text
            )))
        }
    }

    async fn list_device_pools(
        &self,
        project_arn: &str,
    ) -> Result<Vec<DeviceGroup>, OrchestratorError> {
        let output = self
            .client
            .list_device_pools()
            .arn(project_arn)
            .send()
            .await
            .map_err(|err| {
                OrchestratorError::DeviceGroupLookup(err.into_service_error().to_string())
            })?;
        Ok(output
            .device_pools()
            .iter()
            .map(|pool| DeviceGroup {
                arn: pool.arn().unwrap_or_default().to_string(),
                name: pool.name().map(str::to_string),
            })
            .collect())
    }

    async fn schedule_run(
        &self,
        request: ScheduleRunRequest,
    ) -> Result<ScheduledRun, OrchestratorError> {
        let test = ScheduleRunTest::builder()
            .r#type(TestType::AppiumNode)
            .test_package_arn(request.test_package_upload_arn)
            .test_spec_arn(request.test_spec_upload_arn)
            .build()
            .map_err(|err| OrchestratorError::Schedule(err.to_string()))?;
        let output = self
            .client
            .schedule_run()
            .project_arn(request.project_arn)
            .app_arn(request.app_upload_arn)
            .device_pool_arn(request.device_pool_arn)
            .name(&request.run_name)
            .test(test)
            .send()
            .await
            .map_err(|err| OrchestratorError::Schedule(err.into_service_error().to_string()))?;
        let run = output.run().ok_or_else(|| {
            OrchestratorError::Schedule("service returned no run record".to_string())
        })?;
        let arn = run.arn().ok_or_else(|| {
            OrchestratorError::Schedule("run record is missing an arn".to_string())
        })?;
        Ok(ScheduledRun {
            arn: arn.to_string(),
            name: run.name().unwrap_or(&request.run_name).to_string(),
        })
    }
}
