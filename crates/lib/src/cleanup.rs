//! Remove what a previous run left behind.

use mockimage_utils::CommandRunner;

use crate::config::BuildConfig;
use crate::error::{Error, Result};
use crate::tools::{Mock, Runtime};

/// Removes containers, the image, and the build root of a previous run.
#[derive(Debug)]
pub struct ArtifactCleaner<'a, R> {
    runner: &'a R,
    config: &'a BuildConfig,
}

impl<'a, R: CommandRunner> ArtifactCleaner<'a, R> {
    /// Clean up after `config`.
    pub fn new(runner: &'a R, config: &'a BuildConfig) -> Self {
        Self { runner, config }
    }

    /// Remove all artifacts; any command failure is reported as [`Error::Cleanup`].
    pub fn run(&self) -> Result<()> {
        let runtime = Runtime::new(self.config.runtime, &self.config.image_name)?;
        let mock = Mock::new(&self.config.mock_config)?;
        let run = |cmd: &str| self.runner.run(cmd).map_err(Error::Cleanup);

        // Containers first, otherwise the image cannot be removed
        let containers = run(&runtime.list_containers())?;
        for id in containers.split_whitespace() {
            tracing::debug!("Removing container {id}");
            run(&runtime.remove_container(id)?)?;
        }

        let images = run(&runtime.list_images())?;
        if images.trim().is_empty() {
            tracing::debug!("No image {} to remove", self.config.image_name);
        } else {
            run(&runtime.remove_image())?;
        }

        run(&mock.scrub_all())?;
        tracing::info!("artifact cleanup successful");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::FakeRunner;

    fn config() -> BuildConfig {
        BuildConfig::new("brt.cfg")
    }

    #[test]
    fn test_clean_slate() {
        let runner = FakeRunner::new();
        let config = config();
        ArtifactCleaner::new(&runner, &config).run().unwrap();
        assert_eq!(
            runner.commands(),
            [
                "docker ps -a -q --filter ancestor=base-runtime-smoke",
                "docker images -q base-runtime-smoke",
                "mock -r brt.cfg --scrub=all",
            ]
        );
    }

    #[test]
    fn test_removes_containers_and_image() {
        let runner = FakeRunner::new()
            .output_for("ps -a -q", "0123abcd\n4567ef01\n")
            .output_for("images -q", "89ab\n");
        let config = config();
        ArtifactCleaner::new(&runner, &config).run().unwrap();
        assert_eq!(
            runner.commands(),
            [
                "docker ps -a -q --filter ancestor=base-runtime-smoke",
                "docker rm -f 0123abcd",
                "docker rm -f 4567ef01",
                "docker images -q base-runtime-smoke",
                "docker rmi -f base-runtime-smoke",
                "mock -r brt.cfg --scrub=all",
            ]
        );
    }

    #[test]
    fn test_failure_is_cleanup_error() {
        let runner = FakeRunner::new().fail_on("--scrub", 30);
        let config = config();
        let e = ArtifactCleaner::new(&runner, &config).run().unwrap_err();
        let Error::Cleanup(inner) = &e else {
            panic!("unexpected error {e:?}");
        };
        assert_eq!(inner.exit_code(), Some(30));
        assert_eq!(e.to_string(), "artifact cleanup failed");
    }
}
