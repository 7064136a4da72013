//! Reading the build root identifier out of a mock profile.

use std::sync::LazyLock;

use camino::{Utf8Path, Utf8PathBuf};
use regex::Regex;

use crate::error::{Error, Result};

/// Where mock looks up profiles given by name.
pub const MOCK_CONFIG_DIR: &str = "/etc/mock";

static ROOT_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^config_opts\s*\[\s*'root'\s*\]").unwrap());
static QUOTED_VALUE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[^']*'([^']*)'").unwrap());

/// A mock profile and the build root it describes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRootProfile {
    /// The file the profile was read from
    pub path: Utf8PathBuf,
    /// The `config_opts['root']` value; never empty
    pub root_id: String,
}

impl BuildRootProfile {
    /// Read the profile named by `mock_config`, which may be a path or
    /// a bare mock profile name.
    pub fn load(mock_config: &str) -> Result<Self> {
        let path = profile_path(mock_config);
        let text = std::fs::read_to_string(&path)
            .map_err(|e| Error::io(format!("reading mock configuration {path}"), e))?;
        let root_id = extract_root_id(&path, &text)?.to_owned();
        tracing::info!("mock root: {root_id}");
        Ok(Self { path, root_id })
    }
}

/// Map a `mock -r` argument to the file containing the profile.
pub fn profile_path(mock_config: &str) -> Utf8PathBuf {
    if mock_config.contains('/') || mock_config.ends_with(".cfg") {
        mock_config.into()
    } else {
        Utf8Path::new(MOCK_CONFIG_DIR).join(format!("{mock_config}.cfg"))
    }
}

/// Find the `config_opts['root']` assignment in profile text.
///
/// Only the first assignment is considered, even if it is unusable.
pub fn extract_root_id<'t>(path: &Utf8Path, text: &'t str) -> Result<&'t str> {
    let missing = || Error::Configuration {
        path: path.to_owned(),
        what: "mock root",
    };
    let line = text
        .lines()
        .find(|line| ROOT_KEY.is_match(line))
        .ok_or_else(missing)?;
    let value = line
        .split_once('=')
        .and_then(|(_, rhs)| QUOTED_VALUE.captures(rhs))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .filter(|v| !v.is_empty())
        .ok_or_else(missing)?;
    Ok(value)
}
