use crate::config::Platform;
use serde::{Deserialize, Serialize};

/// What an uploaded artifact is, which decides its Device Farm type tag and
/// its upload name.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ArtifactKind {
    App,
    TestPackage,
    TestSpec,
}

impl ArtifactKind {
    pub fn upload_type(&self, platform: Platform) -> &'static str {
        match self {
            ArtifactKind::App => platform.app_upload_type(),
            ArtifactKind::TestPackage => "APPIUM_NODE_TEST_PACKAGE",
            ArtifactKind::TestSpec => "APPIUM_NODE_TEST_SPEC",
        }
    }
}

/// One-time-writable destination registered with the remote service. The url
/// is consumed by a single PUT; the arn is kept for the run request.
#[derive(Clone, Debug)]
pub struct UploadSlot {
    pub arn: String,
    pub url: String,
}

/// Processing state the service attaches to an upload. The service reports
/// several pre-terminal states (initialized, processing); all of them count
/// as pending here.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum UploadStatus {
    Pending,
    Succeeded,
    Failed,
}

impl UploadStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, UploadStatus::Pending)
    }
}

/// One poll of an upload's processing state.
#[derive(Clone, Debug)]
pub struct UploadObservation {
    pub status: UploadStatus,
    pub message: Option<String>,
    pub metadata: Option<String>,
}

#[derive(Clone, Debug)]
pub struct DeviceGroup {
    pub arn: String,
    pub name: Option<String>,
}

#[derive(Clone, Debug)]
pub struct ScheduleRunRequest {
    pub project_arn: String,
    pub app_upload_arn: String,
    pub test_package_upload_arn: String,
    pub test_spec_upload_arn: String,
    pub device_pool_arn: String,
    pub run_name: String,
}

#[derive(Clone, Debug)]
pub struct ScheduledRun {
    pub arn: String,
    pub name: String,
}

/// Final output of one invocation.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct RunDescriptor {
    pub run_arn: String,
    pub run_name: String,
    pub project_arn: String,
    pub device_pool_arn: String,
    pub test_spec_arn: String,
    pub timestamp: String,
}
