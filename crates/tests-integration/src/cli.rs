//! Tests of the installed `mockimage` binary that need no build root.

use anyhow::Result;
use camino::Utf8PathBuf;
use indoc::indoc;
use libtest_mimic::Trial;
use xshell::{cmd, Shell};

use crate::new_test;

fn tempdir() -> Result<(tempfile::TempDir, Utf8PathBuf)> {
    let td = tempfile::tempdir()?;
    let path = Utf8PathBuf::try_from(td.path().to_owned())?;
    Ok((td, path))
}

fn test_root_id() -> Result<()> {
    let (_td, dir) = tempdir()?;
    let profile = dir.join("brt.cfg");
    std::fs::write(
        &profile,
        indoc! { r#"
            include('templates/almalinux-9.tpl')
            config_opts['root'] = 'brt-el9-x86_64'
            config_opts['root'] = 'ignored'
        "# },
    )?;
    let sh = Shell::new()?;
    let root = cmd!(sh, "mockimage root-id {profile}").read()?;
    assert_eq!(root.trim(), "brt-el9-x86_64");
    Ok(())
}

fn test_root_id_missing() -> Result<()> {
    let (_td, dir) = tempdir()?;
    let profile = dir.join("brt.cfg");
    std::fs::write(&profile, "config_opts['target_arch'] = 'x86_64'\n")?;
    let sh = Shell::new()?;
    let o = cmd!(sh, "mockimage root-id {profile}")
        .ignore_status()
        .output()?;
    assert!(!o.status.success());
    let stderr = String::from_utf8(o.stderr)?;
    assert!(stderr.contains("does not specify mock root"), "stderr: {stderr}");
    Ok(())
}

fn test_rewrite_repo() -> Result<()> {
    let (_td, dir) = tempdir()?;
    let input = dir.join("dnf.conf");
    std::fs::write(
        &input,
        indoc! { "
            [main]
            keepcache = 1
            install_weak_deps=0

            [baseos]
            name = BaseOS
            baseurl = http://example.com/baseos/$basearch
        " },
    )?;
    let sh = Shell::new()?;
    let out = cmd!(sh, "mockimage rewrite-repo {input}").read()?;
    // Every section is followed by a blank line
    assert_eq!(
        out.trim_end(),
        "[baseos]\nname=BaseOS\nbaseurl=http://example.com/baseos/$basearch"
    );
    Ok(())
}

fn test_print_config() -> Result<()> {
    let (_td, dir) = tempdir()?;
    let config = dir.join("config.toml");
    std::fs::write(
        &config,
        indoc! { r#"
            mock-config = "brt.cfg"
            runtime = "podman"
        "# },
    )?;
    let sh = Shell::new()?;
    let out = cmd!(sh, "mockimage print-config --config {config} --no-elevate")
        .env("MOCKIMAGE_IMAGE", "from-env")
        .read()?;
    let v: serde_json::Value = serde_json::from_str(&out)?;
    assert_eq!(v["mock-config"], "brt.cfg");
    assert_eq!(v["image-name"], "from-env");
    assert_eq!(v["runtime"], "podman");
    assert_eq!(v["elevate"], false);
    Ok(())
}

fn test_build_without_profile() -> Result<()> {
    let (_td, dir) = tempdir()?;
    let profile = dir.join("nonexistent.cfg");
    let sh = Shell::new()?;
    let o = cmd!(sh, "mockimage build --mock-config {profile}")
        .ignore_status()
        .output()?;
    assert!(!o.status.success());
    let stderr = String::from_utf8(o.stderr)?;
    assert!(stderr.contains("nonexistent.cfg"), "stderr: {stderr}");
    Ok(())
}

pub(crate) fn tests() -> Vec<Trial> {
    vec![
        new_test("root-id", test_root_id),
        new_test("root-id missing", test_root_id_missing),
        new_test("rewrite-repo", test_rewrite_repo),
        new_test("print-config", test_print_config),
        new_test("build without profile", test_build_without_profile),
    ]
}
