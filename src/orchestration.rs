use crate::config::RunConfiguration;
use crate::device_farm::model::{
    ArtifactKind, DeviceGroup, RunDescriptor, ScheduleRunRequest, UploadStatus,
};
use crate::device_farm::TestService;
use crate::error::OrchestratorError;
use crate::package::{locate_test_spec, obtain_test_package, test_spec_defaults, TestPackageStrategy};
use crate::poll::{poll_until, PollSchedule};
use crate::storage::ApplicationSource;
use chrono::Local;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

const RUN_NAME_PREFIX: &str = "SystemTest";

// the timestamp token has second granularity, so concurrent invocations in
// one process need an extra component to keep their working directories apart
static RUN_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Where the test package and test spec come from for this deployment.
#[derive(Clone, Debug)]
pub struct ArtifactPlan {
    pub package: TestPackageStrategy,
    pub test_spec_candidates: Vec<PathBuf>,
}

impl Default for ArtifactPlan {
    fn default() -> Self {
        ArtifactPlan {
            package: TestPackageStrategy::build_script_defaults(),
            test_spec_candidates: test_spec_defaults(),
        }
    }
}

/// Runs the whole workflow: obtain the test package, fetch the app binary,
/// upload all three artifacts to the device-testing service, pick a device
/// pool and schedule the run. Strictly sequential; the first failure aborts
/// everything after it, nothing is retried.
pub async fn execute<S, A>(
    service: &S,
    source: &A,
    config: &RunConfiguration,
    plan: &ArtifactPlan,
    work_dir: &Path,
) -> Result<RunDescriptor, OrchestratorError>
where
    S: TestService,
    A: ApplicationSource,
{
    let timestamp = Local::now().format("%Y%m%d-%H%M%S").to_string();
    let schedule = PollSchedule::default();
    info!("starting test execution workflow, timestamp: {}", timestamp);

    info!("step 1: building test package");
    let test_package_path = obtain_test_package(&plan.package).await?;

    info!("step 2: downloading app from s3://{}/{}", config.s3_bucket, config.app_file_path);
    let run_dir = work_dir.join(format!(
        "run-{}-{}",
        timestamp,
        RUN_SEQUENCE.fetch_add(1, Ordering::Relaxed)
    ));
    let app_path = fetch_application(source, config, &run_dir).await?;

    let project_arn = config.project_arn()?.to_string();
    info!("using project: {}", project_arn);

    info!("step 3: uploading app");
    let app_arn = upload_artifact(
        service,
        config,
        &project_arn,
        &app_path,
        ArtifactKind::App,
        config.app_file_name(),
        schedule,
    )
    .await?;

    info!("step 4: uploading test package");
    let package_name = format!("tests-{}.zip", timestamp);
    let package_arn = upload_artifact(
        service,
        config,
        &project_arn,
        &test_package_path,
        ArtifactKind::TestPackage,
        &package_name,
        schedule,
    )
    .await?;

    info!("step 5: uploading test spec");
    let test_spec_path = locate_test_spec(&plan.test_spec_candidates).await?;
    let spec_name = format!("appium-test-spec-{}.yml", timestamp);
    let test_spec_arn = upload_artifact(
        service,
        config,
        &project_arn,
        &test_spec_path,
        ArtifactKind::TestSpec,
        &spec_name,
        schedule,
    )
    .await?;

    info!("step 6: selecting device pool");
    let device_pool = select_device_group(service, &project_arn).await?;

    info!("step 7: scheduling test run");
    let run = service
        .schedule_run(ScheduleRunRequest {
            project_arn: project_arn.clone(),
            app_upload_arn: app_arn,
            test_package_upload_arn: package_arn,
            test_spec_upload_arn: test_spec_arn.clone(),
            device_pool_arn: device_pool.arn.clone(),
            run_name: format!("{}-{}", RUN_NAME_PREFIX, timestamp),
        })
        .await?;
    info!("test run scheduled: {} ({})", run.name, run.arn);

    Ok(RunDescriptor {
        run_arn: run.arn,
        run_name: run.name,
        project_arn,
        device_pool_arn: device_pool.arn,
        test_spec_arn,
        timestamp,
    })
}

/// Downloads the configured application object and rejects empty results
/// before anything is uploaded.
async fn fetch_application<A: ApplicationSource>(
    source: &A,
    config: &RunConfiguration,
    run_dir: &Path,
) -> Result<PathBuf, OrchestratorError> {
    let app_path = source
        .fetch(&config.s3_bucket, &config.app_file_path, run_dir)
        .await?;
    let size = tokio::fs::metadata(&app_path)
        .await
        .map_err(|err| OrchestratorError::Download(err.to_string()))?
        .len();
    if size == 0 {
        return Err(OrchestratorError::EmptyArtifact(app_path));
    }
    info!("app file size: {} bytes", size);
    Ok(app_path)
}

/// Registers an upload slot, streams the file to it and waits for the
/// service to finish processing. Returns the upload arn for the run request.
async fn upload_artifact<S: TestService>(
    service: &S,
    config: &RunConfiguration,
    project_arn: &str,
    local_path: &Path,
    kind: ArtifactKind,
    upload_name: &str,
    schedule: PollSchedule,
) -> Result<String, OrchestratorError> {
    info!("uploading {:?} file: {}", kind, local_path.display());
    let upload_type = kind.upload_type(config.platform()?);
    let slot = service
        .create_upload(project_arn, upload_name, upload_type)
        .await?;
    let file_name = local_path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| upload_name.to_string());
    service.put_artifact(&slot.url, local_path, &file_name).await?;
    await_processing(service, &slot.arn, schedule).await?;
    info!("{:?} uploaded and processed: {}", kind, slot.arn);
    Ok(slot.arn)
}

/// Polls the upload's processing state until it is terminal or the deadline
/// passes. Pending is the only non-terminal state.
async fn await_processing<S: TestService>(
    service: &S,
    upload_arn: &str,
    schedule: PollSchedule,
) -> Result<(), OrchestratorError> {
    info!("waiting for upload {} to be processed", upload_arn);
    let outcome = poll_until(
        schedule,
        || async move {
            let observation = service.get_upload(upload_arn).await?;
            info!("upload status: {:?}", observation.status);
            if let Some(message) = &observation.message {
                info!("upload message: {}", message);
            }
            if let Some(metadata) = &observation.metadata {
                info!("upload metadata: {}", metadata);
            }
            Ok(observation)
        },
        |observation| observation.status.is_terminal(),
    )
    .await?;
    match outcome {
        None => Err(OrchestratorError::ProcessingTimeout(schedule.timeout)),
        Some(observation) => match observation.status {
            UploadStatus::Succeeded => Ok(()),
            _ => Err(OrchestratorError::ProcessingFailed(
                observation
                    .message
                    .unwrap_or_else(|| "no message from service".to_string()),
            )),
        },
    }
}

/// First device pool in the order the service returns them.
async fn select_device_group<S: TestService>(
    service: &S,
    project_arn: &str,
) -> Result<DeviceGroup, OrchestratorError> {
    let pools = service.list_device_pools(project_arn).await?;
    match pools.into_iter().next() {
        Some(pool) => {
            info!(
                "using device pool: {} ({})",
                pool.arn,
                pool.name.as_deref().unwrap_or("unnamed")
            );
            Ok(pool)
        }
        None => Err(OrchestratorError::NoDeviceGroup(project_arn.to_string())),
    }
}
