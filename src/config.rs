use crate::error::OrchestratorError;
use std::str::FromStr;
use tracing::info;

const REQUIRED_VARS: [&str; 5] = [
    "ANDROID_PROJECT_ARN",
    "IOS_PROJECT_ARN",
    "S3_BUCKET",
    "APP_FILE_PATH",
    "APP_TYPE",
];

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Platform {
    Ios,
    Android,
}

impl Platform {
    pub fn app_upload_type(&self) -> &'static str {
        match self {
            Platform::Ios => "IOS_APP",
            Platform::Android => "ANDROID_APP",
        }
    }
}

impl FromStr for Platform {
    type Err = OrchestratorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ios" => Ok(Platform::Ios),
            "android" => Ok(Platform::Android),
            _ => Err(OrchestratorError::UnsupportedPlatform(s.to_string())),
        }
    }
}

/// Immutable per-invocation configuration, built once from the environment
/// before any remote call and passed by parameter through every step.
#[derive(Clone, Debug)]
pub struct RunConfiguration {
    pub android_project_arn: String,
    pub ios_project_arn: String,
    pub s3_bucket: String,
    pub app_file_path: String,
    pub app_type: String,
}

impl RunConfiguration {
    pub fn from_env() -> Result<Self, OrchestratorError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Collects every missing or empty variable before failing, so one
    /// invocation reports the full set instead of the first hit.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, OrchestratorError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut values = Vec::with_capacity(REQUIRED_VARS.len());
        let mut missing = Vec::new();
        for name in REQUIRED_VARS {
            match lookup(name).filter(|value| !value.is_empty()) {
                Some(value) => values.push(value),
                None => missing.push(name.to_string()),
            }
        }
        if !missing.is_empty() {
            return Err(OrchestratorError::Configuration { missing });
        }
        let mut values = values.into_iter();
        let config = RunConfiguration {
            android_project_arn: values.next().unwrap(),
            ios_project_arn: values.next().unwrap(),
            s3_bucket: values.next().unwrap(),
            app_file_path: values.next().unwrap(),
            app_type: values.next().unwrap(),
        };
        info!("configuration loaded for app type: {}", config.app_type);
        Ok(config)
    }

    pub fn platform(&self) -> Result<Platform, OrchestratorError> {
        Platform::from_str(&self.app_type)
    }

    /// Maps the platform tag to the configured Device Farm project.
    pub fn project_arn(&self) -> Result<&str, OrchestratorError> {
        match self.platform()? {
            Platform::Ios => Ok(&self.ios_project_arn),
            Platform::Android => Ok(&self.android_project_arn),
        }
    }

    /// File name of the configured S3 object, kept for upload naming.
    pub fn app_file_name(&self) -> &str {
        self.app_file_path
            .rsplit('/')
            .next()
            .unwrap_or(&self.app_file_path)
    }
}
