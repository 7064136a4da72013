//! Build a container base image from a mock build root.

use camino::Utf8Path;
use mockimage_utils::CommandRunner;
use serde::Serialize;

use crate::cleanup::ArtifactCleaner;
use crate::config::BuildConfig;
use crate::error::Result;
use crate::profile::BuildRootProfile;
use crate::repoconf::RepoConfigRewriter;
use crate::tools::{self, Mock, Runtime};

/// The outcome of a successful build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct BuildReport {
    /// The image that was created
    pub image_name: String,
    /// The mock root the image was made from
    pub root_id: String,
    /// Whether the root filesystem was archived with elevated privileges.
    /// If not, files unreadable by the current user are missing from the image.
    pub privileged_archive: bool,
}

/// Runs the whole build: cleanup, init, repository setup, archive, import.
///
/// Every step blocks until its command completes; the first failure
/// aborts the build.
#[derive(Debug)]
pub struct ImageBuilder<'a, R> {
    runner: &'a R,
    config: &'a BuildConfig,
}

impl<'a, R: CommandRunner> ImageBuilder<'a, R> {
    /// Build according to `config`.
    pub fn new(runner: &'a R, config: &'a BuildConfig) -> Self {
        Self { runner, config }
    }

    /// Build the image from the build root described by `profile`.
    pub fn build(&self, profile: &BuildRootProfile) -> Result<BuildReport> {
        let config = self.config;
        let mock = Mock::new(&config.mock_config)?;
        let runtime = Runtime::new(config.runtime, &config.image_name)?;

        ArtifactCleaner::new(self.runner, config).run()?;

        tracing::info!("Initializing build root {}", profile.root_id);
        self.runner.run(&mock.init())?;

        RepoConfigRewriter::new(self.runner, &config.mock_config)?.run()?;

        let rootfs = config.rootfs(&profile.root_id);
        let (tar, privileged_archive) = self.archive_command(&rootfs)?;

        tracing::info!("Importing {rootfs} as {}", config.image_name);
        self.runner
            .run(&format!("{tar} | {}", runtime.import_stdin()))?;

        Ok(BuildReport {
            image_name: config.image_name.clone(),
            root_id: profile.root_id.clone(),
            privileged_archive,
        })
    }

    /// Pick the command that archives `rootfs` to stdout.
    ///
    /// Files in the build root are owned by root, so `sudo -n` is tried
    /// first; without it the archive may silently miss content.
    fn archive_command(&self, rootfs: &Utf8Path) -> Result<(String, bool)> {
        let tar = tools::tar_rootfs(rootfs)?;
        if self.config.elevate {
            let privileged = tools::sudo_noninteractive(&tar);
            match self.runner.run(&format!("{privileged} >/dev/null")) {
                Ok(_) => return Ok((privileged, true)),
                Err(e) => {
                    tracing::info!("{e}");
                    tracing::warn!("No sudo rights to run command '{tar}' as root");
                }
            }
        } else {
            tracing::warn!("Privilege elevation disabled; archiving as the current user");
        }
        tracing::warn!(
            "Generated image '{}' may be incomplete!",
            self.config.image_name
        );
        Ok((tar, false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::testutil::FakeRunner;

    const DNF_CONF: &str = "[main]\ngpgcheck=1\n[base]\nname=Base\nbaseurl=http://x\n";
    const TAR: &str = "tar -C /var/lib/mock/el9-x86_64/root -c .";

    fn profile() -> BuildRootProfile {
        BuildRootProfile {
            path: "brt.cfg".into(),
            root_id: "el9-x86_64".into(),
        }
    }

    fn config() -> BuildConfig {
        BuildConfig::new("brt.cfg")
    }

    #[test]
    fn test_full_sequence() {
        let runner = FakeRunner::new().with_copyout(DNF_CONF);
        let config = config();
        let report = ImageBuilder::new(&runner, &config)
            .build(&profile())
            .unwrap();
        assert_eq!(
            report,
            BuildReport {
                image_name: "base-runtime-smoke".into(),
                root_id: "el9-x86_64".into(),
                privileged_archive: true,
            }
        );

        let cmds = runner.commands();
        assert_eq!(cmds.len(), 10, "{cmds:#?}");
        assert_eq!(cmds[2], "mock -r brt.cfg --scrub=all");
        assert_eq!(cmds[3], "mock -r brt.cfg --init");
        assert!(cmds[4].contains("--copyout /etc/dnf/dnf.conf"));
        assert!(cmds[7].contains("mkdir -p -m=755 /etc/pki/rpm-gpg"));
        assert_eq!(cmds[8], format!("sudo -n {TAR} >/dev/null"));
        assert_eq!(
            cmds[9],
            format!("sudo -n {TAR} | docker import - base-runtime-smoke")
        );
        assert_eq!(runner.copied_in(), ["[base]\nname=Base\nbaseurl=http://x\n\n"]);
    }

    #[test]
    fn test_unprivileged_fallback() {
        let runner = FakeRunner::new()
            .with_copyout(DNF_CONF)
            .fail_on("sudo -n", 1);
        let config = config();
        let report = ImageBuilder::new(&runner, &config)
            .build(&profile())
            .unwrap();
        assert!(!report.privileged_archive);
        let cmds = runner.commands();
        assert_eq!(
            cmds.last().unwrap(),
            &format!("{TAR} | docker import - base-runtime-smoke")
        );
    }

    #[test]
    fn test_elevation_disabled() {
        let runner = FakeRunner::new().with_copyout(DNF_CONF);
        let mut config = config();
        config.elevate = false;
        config.runtime = crate::config::ContainerRuntime::Podman;
        let report = ImageBuilder::new(&runner, &config)
            .build(&profile())
            .unwrap();
        assert!(!report.privileged_archive);
        let cmds = runner.commands();
        assert!(!cmds.iter().any(|c| c.contains("sudo")));
        assert_eq!(
            cmds.last().unwrap(),
            &format!("{TAR} | podman import - base-runtime-smoke")
        );
    }

    #[test]
    fn test_cleanup_failure_aborts() {
        let runner = FakeRunner::new()
            .with_copyout(DNF_CONF)
            .fail_on("images -q", 125);
        let config = config();
        let e = ImageBuilder::new(&runner, &config)
            .build(&profile())
            .unwrap_err();
        assert!(matches!(e, Error::Cleanup(_)), "{e:?}");
        assert!(!runner.commands().iter().any(|c| c.contains("--init")));
    }

    #[test]
    fn test_command_failure_aborts() {
        let runner = FakeRunner::new().with_copyout(DNF_CONF).fail_on("--init", 2);
        let config = config();
        let e = ImageBuilder::new(&runner, &config)
            .build(&profile())
            .unwrap_err();
        let Error::Execution(inner) = &e else {
            panic!("unexpected error {e:?}");
        };
        assert_eq!(inner.command(), "mock -r brt.cfg --init");
        assert_eq!(inner.exit_code(), Some(2));
        assert!(e.to_string().contains("returned exit status 2"));
        assert_eq!(
            runner.commands().last().unwrap(),
            "mock -r brt.cfg --init"
        );
    }

    #[test]
    fn test_import_failure() {
        let runner = FakeRunner::new()
            .with_copyout(DNF_CONF)
            .fail_on("import -", 1);
        let config = config();
        let e = ImageBuilder::new(&runner, &config)
            .build(&profile())
            .unwrap_err();
        assert!(e.execution().unwrap().command().ends_with("import - base-runtime-smoke"));
    }
}
