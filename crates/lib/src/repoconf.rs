//! Carry the build root's repository configuration into the image.
//!
//! mock generates `/etc/dnf/dnf.conf` inside the build root from the
//! `yum.conf` value of the profile. That file holds a `[main]` section
//! tuned for mock plus the repositories. We pull it out, drop `[main]`,
//! and install the remainder as a plain `.repo` file so the package
//! manager in the final image can still find the repositories.

use std::fmt::Write as _;
use std::io::Write as _;

use camino::Utf8Path;
use ini::{Ini, ParseOption};
use mockimage_utils::CommandRunner;

use crate::error::{Error, Result};
use crate::tools::Mock;

/// The generated configuration inside the build root.
pub const DNF_CONF: &str = "/etc/dnf/dnf.conf";
/// Where the repository-only configuration is installed.
pub const BUILD_REPO: &str = "/etc/yum.repos.d/build.repo";
/// Must exist or microdnf fails to start.
pub const RPM_GPG_DIR: &str = "/etc/pki/rpm-gpg";
/// The section holding global package manager options.
pub const MAIN_SECTION: &str = "main";

/// Package manager configuration, parsed from INI text.
///
/// Section order and key order are preserved, as are key case and
/// the raw value text.
#[derive(Debug)]
pub struct PackageRepoConfig {
    ini: Ini,
}

impl PackageRepoConfig {
    /// Parse INI text.
    pub fn parse(text: &str) -> std::result::Result<Self, ini::ParseError> {
        let opt = ParseOption {
            enabled_quote: false,
            enabled_escape: false,
            enabled_indented_mutiline_value: true,
            ..ParseOption::default()
        };
        let ini = Ini::load_from_str_opt(text, opt)?;
        Ok(Self { ini })
    }

    /// Names of all sections, in document order.
    pub fn sections(&self) -> Vec<&str> {
        self.ini.sections().flatten().collect()
    }

    /// Look up a value.
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.ini.get_from(Some(section), key)
    }

    /// Drop the `[main]` section; returns whether one was present.
    pub fn remove_main(&mut self) -> bool {
        let mut found = false;
        while self.ini.delete(Some(MAIN_SECTION)).is_some() {
            found = true;
        }
        found
    }

    /// Serialize in `.repo` file form: `key=value` with no padding
    /// around the delimiter, a blank line after every section.
    /// Multi-line values are written as tab-indented continuation lines.
    ///
    /// Entries that precede the first section header are not part of
    /// any repository and are omitted.
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        for (section, props) in self.ini.iter() {
            let Some(section) = section else {
                if !props.is_empty() {
                    tracing::warn!("Dropping {} entries outside of any section", props.len());
                }
                continue;
            };
            // Writing to a String cannot fail
            let _ = writeln!(out, "[{section}]");
            for (k, v) in props.iter() {
                let v = v.replace('\n', "\n\t");
                let _ = writeln!(out, "{k}={v}");
            }
            out.push('\n');
        }
        out
    }
}

/// Parse `text`, remove `[main]`, and serialize the remainder.
///
/// `origin` names the source of the text for error messages.
pub fn rewrite_repo_config(origin: &str, text: &str) -> Result<String> {
    let mut config = PackageRepoConfig::parse(text).map_err(|source| Error::Ini {
        path: origin.to_owned(),
        source,
    })?;
    tracing::info!(
        "Found the following configuration section(s): {}",
        config.sections().join(" ")
    );
    if config.remove_main() {
        tracing::debug!("Removed [{MAIN_SECTION}]");
    }
    Ok(config.serialize())
}

fn named_tempfile(purpose: &str) -> Result<tempfile::NamedTempFile> {
    tempfile::Builder::new()
        .prefix("mockimage-")
        .suffix(".conf")
        .tempfile()
        .map_err(|e| Error::io(format!("creating temporary file for {purpose}"), e))
}

fn utf8_path(p: &std::path::Path) -> Result<&Utf8Path> {
    Utf8Path::from_path(p).ok_or_else(|| {
        Error::InvalidConfig(format!("non-UTF-8 temporary path {}", p.display()))
    })
}

/// Rewrites the repository configuration inside a build root.
#[derive(Debug)]
pub struct RepoConfigRewriter<'a, R> {
    runner: &'a R,
    mock: Mock<'a>,
}

impl<'a, R: CommandRunner> RepoConfigRewriter<'a, R> {
    /// Operate on the build root of the mock profile `mock_config`.
    pub fn new(runner: &'a R, mock_config: &'a str) -> Result<Self> {
        Ok(Self {
            runner,
            mock: Mock::new(mock_config)?,
        })
    }

    /// Replace the build root's repository configuration with a
    /// repository-only `.repo` file.
    ///
    /// Temporary files are removed on every return path.
    pub fn run(&self) -> Result<()> {
        let generated = named_tempfile(DNF_CONF)?;
        let generated_path = utf8_path(generated.path())?;
        self.runner
            .run(&self.mock.copyout(DNF_CONF, generated_path)?)?;

        let contents = std::fs::read_to_string(generated_path)
            .map_err(|e| Error::io(format!("reading {generated_path}"), e))?;
        tracing::info!("Contents of original {DNF_CONF} generated by mock:\n{contents}");

        let revised = rewrite_repo_config(DNF_CONF, &contents)?;
        tracing::info!("Contents of revised repo config:\n{revised}");

        let mut repofile = named_tempfile(BUILD_REPO)?;
        repofile
            .write_all(revised.as_bytes())
            .and_then(|_| repofile.flush())
            .map_err(|e| Error::io(format!("writing {}", repofile.path().display()), e))?;
        let repofile_path = utf8_path(repofile.path())?;

        self.runner
            .run(&self.mock.copyin(repofile_path, BUILD_REPO)?)?;
        self.runner
            .run(&self.mock.chroot(&format!("chmod 644 {BUILD_REPO}"))?)?;
        self.runner
            .run(&self.mock.chroot(&format!("mkdir -p -m=755 {RPM_GPG_DIR}"))?)?;
        Ok(())
    }
}
