//! Build driver against a fake build tool
#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use pxpl_harness::{BuildDriver, BuildError, BuildProfile, HarnessConfig};

fn fake_cmake(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("fake-cmake");
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn config_for(project: &Path, program: &Path) -> HarnessConfig {
    let mut config = HarnessConfig::new().with_project_root(project);
    config.build.program = program.to_string_lossy().into_owned();
    config
}

#[tokio::test]
async fn build_produces_both_executables() {
    let tools = tempfile::tempdir().unwrap();
    let project = tempfile::tempdir().unwrap();
    let cmake = fake_cmake(
        tools.path(),
        r#"if [ "$1" = "--build" ]; then
  mkdir -p ../release && touch ../release/pxpl ../release/pxpl-gui
fi
echo "ran $*""#,
    );

    let report = BuildDriver::new(config_for(project.path(), &cmake))
        .build(BuildProfile::Both)
        .await
        .unwrap();

    assert_eq!(report.executables.len(), 2);
    assert!(report.configure_stdout.contains("-DBUILD_BOTH=ON"));
    assert!(report.build_stdout.contains("--build . --config Release"));
    assert!(project.path().join("build").is_dir());
}

#[tokio::test]
async fn configure_failure_carries_stderr() {
    let tools = tempfile::tempdir().unwrap();
    let project = tempfile::tempdir().unwrap();
    let cmake = fake_cmake(tools.path(), "echo 'no CMakeLists.txt' >&2; exit 1");

    let err = BuildDriver::new(config_for(project.path(), &cmake))
        .build(BuildProfile::CliOnly)
        .await
        .unwrap_err();

    match err {
        BuildError::ConfigureFailed { code, stderr } => {
            assert_eq!(code, Some(1));
            assert_eq!(stderr, "no CMakeLists.txt");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn successful_steps_without_executable_fail() {
    let tools = tempfile::tempdir().unwrap();
    let project = tempfile::tempdir().unwrap();
    let cmake = fake_cmake(tools.path(), "exit 0");

    let err = BuildDriver::new(config_for(project.path(), &cmake))
        .build(BuildProfile::CliOnly)
        .await
        .unwrap_err();

    assert!(matches!(err, BuildError::MissingExecutable(_)));
}
