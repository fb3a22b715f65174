use crate::error::OrchestratorError;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{error, info};

const BUILD_SCRIPT: &str = "scripts/build-and-zip.sh";
const ARCHIVE_NAME: &str = "system_tests.zip";
pub const TEST_SPEC_FILE: &str = "appium-test-spec.yml";

/// How the test package archive is produced. Picked per deployment variant
/// when the workflow is wired up, never branched on at runtime.
#[derive(Clone, Debug)]
pub enum TestPackageStrategy {
    /// Run the suite's build script in the first candidate directory that
    /// carries it and take the archive it leaves behind.
    BuildScript { candidate_dirs: Vec<PathBuf> },
    /// Take the first existing non-empty archive from an ordered list.
    Prebuilt { candidates: Vec<PathBuf> },
}

impl TestPackageStrategy {
    /// The directories the containerized build environments mount the suite
    /// into, in probe order.
    pub fn build_script_defaults() -> Self {
        TestPackageStrategy::BuildScript {
            candidate_dirs: vec![
                PathBuf::from("/workspace/test-suite"),
                PathBuf::from("/tmp/codebuild-workspace/test-suite"),
                PathBuf::from("."),
            ],
        }
    }
}

pub async fn obtain_test_package(
    strategy: &TestPackageStrategy,
) -> Result<PathBuf, OrchestratorError> {
    match strategy {
        TestPackageStrategy::BuildScript { candidate_dirs } => {
            build_test_package(candidate_dirs).await
        }
        TestPackageStrategy::Prebuilt { candidates } => {
            locate_first_non_empty("test package archive", candidates).await
        }
    }
}

/// Finds the fixed test-specification document shipped alongside the suite.
pub async fn locate_test_spec(candidates: &[PathBuf]) -> Result<PathBuf, OrchestratorError> {
    locate_first_non_empty(TEST_SPEC_FILE, candidates).await
}

pub fn test_spec_defaults() -> Vec<PathBuf> {
    vec![
        PathBuf::from(TEST_SPEC_FILE),
        PathBuf::from("/workspace/test-suite").join(TEST_SPEC_FILE),
    ]
}

async fn build_test_package(candidate_dirs: &[PathBuf]) -> Result<PathBuf, OrchestratorError> {
    let suite_dir = locate_suite_dir(candidate_dirs).await?;
    info!("building test suite in {}", suite_dir.display());
    let output = Command::new("bash")
        .arg(BUILD_SCRIPT)
        .current_dir(&suite_dir)
        .output()
        .await
        .map_err(|err| OrchestratorError::Build {
            stderr: format!("could not start build script: {}", err),
        })?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        error!("build script failed with {}", output.status);
        error!("stdout: {}", String::from_utf8_lossy(&output.stdout));
        error!("stderr: {}", stderr);
        return Err(OrchestratorError::Build { stderr });
    }
    let archive = suite_dir.join(ARCHIVE_NAME);
    if file_size(&archive).await.unwrap_or(0) == 0 {
        return Err(OrchestratorError::Build {
            stderr: format!("{} missing or empty after build", archive.display()),
        });
    }
    info!("test suite built successfully: {}", archive.display());
    Ok(archive)
}

async fn locate_suite_dir(candidate_dirs: &[PathBuf]) -> Result<PathBuf, OrchestratorError> {
    for dir in candidate_dirs {
        if tokio::fs::try_exists(dir.join(BUILD_SCRIPT)).await.unwrap_or(false) {
            info!("found test suite directory at: {}", dir.display());
            return Ok(dir.clone());
        }
    }
    Err(OrchestratorError::ArtifactNotFound {
        name: BUILD_SCRIPT.to_string(),
        tried: candidate_dirs.to_vec(),
    })
}

async fn locate_first_non_empty(
    name: &str,
    candidates: &[PathBuf],
) -> Result<PathBuf, OrchestratorError> {
    for candidate in candidates {
        if file_size(candidate).await.unwrap_or(0) > 0 {
            info!("found {} at: {}", name, candidate.display());
            return Ok(candidate.clone());
        }
    }
    Err(OrchestratorError::ArtifactNotFound {
        name: name.to_string(),
        tried: candidates.to_vec(),
    })
}

async fn file_size(path: &Path) -> Option<u64> {
    tokio::fs::metadata(path).await.ok().map(|meta| meta.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[tokio::test]
    async fn prebuilt_takes_first_existing_non_empty_candidate() {
        let dir = TempDir::new().unwrap();
        let empty = dir.path().join("empty.zip");
        let good = dir.path().join("tests.zip");
        fs::write(&empty, b"").unwrap();
        fs::write(&good, b"archive-bytes").unwrap();
        let strategy = TestPackageStrategy::Prebuilt {
            candidates: vec![
                dir.path().join("missing.zip"),
                empty,
                good.clone(),
                dir.path().join("later.zip"),
            ],
        };
        let found = obtain_test_package(&strategy).await.unwrap();
        assert_eq!(found, good);
    }

    #[tokio::test]
    async fn prebuilt_reports_every_tried_candidate() {
        let dir = TempDir::new().unwrap();
        let candidates = vec![dir.path().join("a.zip"), dir.path().join("b.zip")];
        let strategy = TestPackageStrategy::Prebuilt {
            candidates: candidates.clone(),
        };
        match obtain_test_package(&strategy).await {
            Err(OrchestratorError::ArtifactNotFound { tried, .. }) => {
                assert_eq!(tried, candidates);
            }
            other => panic!("expected artifact not found, got {:?}", other.err()),
        }
    }

    #[tokio::test]
    async fn build_script_output_is_returned() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("scripts")).unwrap();
        fs::write(
            dir.path().join(BUILD_SCRIPT),
            "#!/bin/bash\necho archive-bytes > system_tests.zip\n",
        )
        .unwrap();
        let strategy = TestPackageStrategy::BuildScript {
            candidate_dirs: vec![dir.path().to_path_buf()],
        };
        let archive = obtain_test_package(&strategy).await.unwrap();
        assert_eq!(archive, dir.path().join(ARCHIVE_NAME));
    }

    #[tokio::test]
    async fn failing_build_script_captures_stderr() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("scripts")).unwrap();
        fs::write(
            dir.path().join(BUILD_SCRIPT),
            "#!/bin/bash\necho broken dependency >&2\nexit 1\n",
        )
        .unwrap();
        let strategy = TestPackageStrategy::BuildScript {
            candidate_dirs: vec![dir.path().to_path_buf()],
        };
        match obtain_test_package(&strategy).await {
            Err(OrchestratorError::Build { stderr }) => {
                assert!(stderr.contains("broken dependency"));
            }
            other => panic!("expected build error, got {:?}", other.err()),
        }
    }

    #[tokio::test]
    async fn build_without_archive_is_an_error() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("scripts")).unwrap();
        fs::write(dir.path().join(BUILD_SCRIPT), "#!/bin/bash\nexit 0\n").unwrap();
        let strategy = TestPackageStrategy::BuildScript {
            candidate_dirs: vec![dir.path().to_path_buf()],
        };
        match obtain_test_package(&strategy).await {
            Err(OrchestratorError::Build { stderr }) => {
                assert!(stderr.contains("missing or empty"));
            }
            other => panic!("expected build error, got {:?}", other.err()),
        }
    }

    #[tokio::test]
    async fn missing_suite_dir_lists_candidates() {
        let strategy = TestPackageStrategy::BuildScript {
            candidate_dirs: vec![PathBuf::from("/nonexistent/suite")],
        };
        match obtain_test_package(&strategy).await {
            Err(OrchestratorError::ArtifactNotFound { name, tried }) => {
                assert_eq!(name, BUILD_SCRIPT);
                assert_eq!(tried, vec![PathBuf::from("/nonexistent/suite")]);
            }
            other => panic!("expected artifact not found, got {:?}", other.err()),
        }
    }
}
