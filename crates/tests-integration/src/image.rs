//! End-to-end image builds; these need mock, sudo and a container runtime.

use anyhow::Result;
use fn_error_context::context;
use libtest_mimic::Trial;
use scopeguard::defer;
use xshell::{cmd, Shell};

use crate::new_test;

/// Mock profile to build from; the build tests are skipped without it.
const PROFILE_VAR: &str = "MOCKIMAGE_TEST_PROFILE";
const RUNTIME_VAR: &str = "MOCKIMAGE_TEST_RUNTIME";
const IMAGE: &str = "localhost/mockimage-integration";

fn runtime() -> String {
    std::env::var(RUNTIME_VAR).unwrap_or_else(|_| "docker".into())
}

#[context("Building {IMAGE}")]
fn build(sh: &Shell, profile: &str, runtime: &str) -> Result<()> {
    cmd!(
        sh,
        "mockimage build --mock-config {profile} --image {IMAGE} --runtime {runtime}"
    )
    .run()?;
    Ok(())
}

fn test_create_image() -> Result<()> {
    let Ok(profile) = std::env::var(PROFILE_VAR) else {
        return Ok(());
    };
    let runtime = runtime();
    let sh = Shell::new()?;
    build(&sh, &profile, &runtime)?;
    defer! {
        let _ = sh.cmd(&runtime).args(["rmi", "-f", IMAGE]).quiet().ignore_stderr().run();
    }

    let repo = sh
        .cmd(&runtime)
        .args(["run", "--rm", IMAGE, "cat", "/etc/yum.repos.d/build.repo"])
        .read()?;
    assert!(!repo.contains("[main]"), "build.repo: {repo}");
    assert!(repo.starts_with('['), "build.repo: {repo}");
    assert!(!repo.contains(" =") && !repo.contains("= "), "build.repo: {repo}");

    let mode = sh
        .cmd(&runtime)
        .args(["run", "--rm", IMAGE, "stat", "-c", "%a"])
        .args(["/etc/yum.repos.d/build.repo", "/etc/pki/rpm-gpg"])
        .read()?;
    assert_eq!(mode.split_whitespace().collect::<Vec<_>>(), ["644", "755"]);
    Ok(())
}

fn test_rebuild_replaces_image() -> Result<()> {
    let Ok(profile) = std::env::var(PROFILE_VAR) else {
        return Ok(());
    };
    let runtime = runtime();
    let sh = Shell::new()?;
    build(&sh, &profile, &runtime)?;
    defer! {
        let _ = sh.cmd(&runtime).args(["rmi", "-f", IMAGE]).quiet().ignore_stderr().run();
    }
    // A leftover container must not prevent the next build from removing the image
    sh.cmd(&runtime)
        .args(["create", IMAGE, "/bin/true"])
        .ignore_stdout()
        .run()?;
    build(&sh, &profile, &runtime)?;
    let filter = format!("ancestor={IMAGE}");
    let containers = sh
        .cmd(&runtime)
        .args(["ps", "-a", "-q", "--filter", filter.as_str()])
        .read()?;
    assert_eq!(containers.trim(), "");
    Ok(())
}

pub(crate) fn tests() -> Vec<Trial> {
    let skip = std::env::var_os(PROFILE_VAR).is_none();
    [
        new_test("create image", test_create_image),
        new_test("rebuild replaces image", test_rebuild_replaces_image),
    ]
    .into_iter()
    .map(|t| t.with_ignored_flag(skip))
    .collect()
}
