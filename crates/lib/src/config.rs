//! Build configuration.
//!
//! Values come from an optional TOML file and are then overridden by
//! command line options; the result is immutable and handed to every step.

use std::fmt;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Environment variable naming a TOML configuration file.
pub const CONFIG_VAR: &str = "MOCKIMAGE_CONFIG";
/// Image name used when none is configured.
pub const DEFAULT_IMAGE_NAME: &str = "base-runtime-smoke";
/// Where mock keeps its build roots unless told otherwise.
pub const DEFAULT_MOCK_BASEDIR: &str = "/var/lib/mock";

/// The container engine used to create and remove images.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ContainerRuntime {
    /// docker
    #[default]
    Docker,
    /// podman
    Podman,
}

impl ContainerRuntime {
    /// The binary name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Docker => "docker",
            Self::Podman => "podman",
        }
    }
}

impl fmt::Display for ContainerRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// On-disk configuration; every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct ConfigFile {
    /// Path or name of the mock profile
    pub mock_config: Option<String>,
    /// Name of the image to create
    pub image_name: Option<String>,
    /// Container runtime
    pub runtime: Option<ContainerRuntime>,
    /// mock's `basedir`
    pub mock_basedir: Option<Utf8PathBuf>,
    /// Whether to try `sudo -n` for archiving
    pub elevate: Option<bool>,
}

impl ConfigFile {
    /// Parse TOML text.
    pub fn parse(path: &Utf8Path, s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| Error::InvalidConfig(format!("{path}: {e}")))
    }

    /// Load from `path`.
    pub fn load(path: &Utf8Path) -> Result<Self> {
        let s = std::fs::read_to_string(path)
            .map_err(|e| Error::io(format!("reading {path}"), e))?;
        Self::parse(path, &s)
    }

    /// Load from the file named by [`CONFIG_VAR`], if set.
    pub fn load_from_env() -> Result<Option<Self>> {
        let Some(path) = std::env::var_os(CONFIG_VAR) else {
            return Ok(None);
        };
        let path = Utf8PathBuf::from_path_buf(path.into())
            .map_err(|p| Error::InvalidConfig(format!("non-UTF-8 path {p:?}")))?;
        tracing::debug!("Loading configuration from {path}");
        Self::load(&path).map(Some)
    }
}

/// The resolved configuration for one build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct BuildConfig {
    /// Path or name of the mock profile, passed verbatim to `mock -r`
    pub mock_config: String,
    /// Name of the image to create
    pub image_name: String,
    /// Container runtime
    pub runtime: ContainerRuntime,
    /// mock's `basedir`; build roots live in `<basedir>/<root>/root`
    pub mock_basedir: Utf8PathBuf,
    /// Whether to try `sudo -n` for archiving
    pub elevate: bool,
}

impl BuildConfig {
    /// A configuration with defaults for everything but the profile.
    pub fn new(mock_config: impl Into<String>) -> Self {
        Self {
            mock_config: mock_config.into(),
            image_name: DEFAULT_IMAGE_NAME.to_owned(),
            runtime: ContainerRuntime::default(),
            mock_basedir: DEFAULT_MOCK_BASEDIR.into(),
            elevate: true,
        }
    }

    /// Merge a config file with overrides; overrides win.
    pub fn resolve(file: ConfigFile, overrides: ConfigFile) -> Result<Self> {
        let mock_config = overrides
            .mock_config
            .or(file.mock_config)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::InvalidConfig("no mock configuration specified".into()))?;
        let mut r = Self::new(mock_config);
        if let Some(v) = overrides.image_name.or(file.image_name) {
            r.image_name = v;
        }
        if let Some(v) = overrides.runtime.or(file.runtime) {
            r.runtime = v;
        }
        if let Some(v) = overrides.mock_basedir.or(file.mock_basedir) {
            r.mock_basedir = v;
        }
        if let Some(v) = overrides.elevate.or(file.elevate) {
            r.elevate = v;
        }
        if r.image_name.is_empty() {
            return Err(Error::InvalidConfig("image name must not be empty".into()));
        }
        Ok(r)
    }

    /// The filesystem root of the build root named `root_id`.
    pub fn rootfs(&self, root_id: &str) -> Utf8PathBuf {
        self.mock_basedir.join(root_id).join("root")
    }
}
