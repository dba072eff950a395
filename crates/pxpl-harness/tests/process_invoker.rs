//! Subprocess invoker against small shell-script tools
#![cfg(unix)]

use std::ffi::OsString;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use pxpl_harness::{InvocationStatus, ProcessInvoker, ToolExit, ToolInvoker};

fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

#[tokio::test]
async fn captures_streams_and_argv() {
    let dir = tempfile::tempdir().unwrap();
    let tool = script(dir.path(), "echo_tool", r#"echo "$@"; echo oops >&2; exit 0"#);
    let invoker = ProcessInvoker::new(tool, Duration::from_secs(5));

    let result = invoker
        .invoke("embed", &[OsString::from("a.png"), OsString::from("b.txt")])
        .await;

    assert!(result.succeeded());
    assert_eq!(result.stdout.trim(), "embed a.png b.txt");
    assert_eq!(result.stderr.trim(), "oops");
}

#[tokio::test]
async fn exit_codes_are_classified() {
    let dir = tempfile::tempdir().unwrap();
    let cases = [
        (1, ToolExit::BadArguments),
        (2, ToolExit::UnsupportedImage),
        (3, ToolExit::CapacityExceeded),
        (4, ToolExit::Io),
        (5, ToolExit::Encoding),
        (9, ToolExit::Other(9)),
    ];

    for (code, expected) in cases {
        let tool = script(dir.path(), &format!("exit_{code}"), &format!("exit {code}"));
        let result = ProcessInvoker::new(tool, Duration::from_secs(5))
            .invoke("embed", &[])
            .await;

        assert!(!result.succeeded());
        assert_eq!(result.exit_code, Some(code));
        assert_eq!(result.status(), InvocationStatus::ToolFailure(expected));
    }
}

#[tokio::test]
async fn slow_tool_times_out() {
    let dir = tempfile::tempdir().unwrap();
    let tool = script(dir.path(), "slow_tool", "sleep 10");
    let invoker = ProcessInvoker::new(tool, Duration::from_millis(200));

    let started = Instant::now();
    let result = invoker.invoke("extract", &[]).await;

    assert!(result.timed_out);
    assert!(result.exit_code.is_none());
    assert_eq!(result.status(), InvocationStatus::TimedOut);
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn working_dir_applies_to_child() {
    let dir = tempfile::tempdir().unwrap();
    let tool = script(dir.path(), "pwd_tool", "pwd");
    let invoker = ProcessInvoker::new(tool, Duration::from_secs(5)).with_working_dir(dir.path());

    let result = invoker.invoke("embed", &[]).await;

    let reported = PathBuf::from(result.stdout.trim());
    assert_eq!(
        reported.canonicalize().unwrap(),
        dir.path().canonicalize().unwrap()
    );
}
