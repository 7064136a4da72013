//! Error types for image builds.

use camino::Utf8PathBuf;
use mockimage_utils::ExecutionError;

/// Result alias used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong while building an image.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required value is missing from a configuration file.
    #[error("mock configuration file {path} does not specify {what}")]
    Configuration {
        /// The file that was consulted
        path: Utf8PathBuf,
        /// What was expected in it
        what: &'static str,
    },
    /// The build configuration itself is unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// An external command exited unsuccessfully.
    #[error(transparent)]
    Execution(#[from] ExecutionError),
    /// Removing artifacts from a previous run failed.
    #[error("artifact cleanup failed")]
    Cleanup(#[source] ExecutionError),
    /// The generated package manager configuration could not be parsed.
    #[error("parsing {path}")]
    Ini {
        /// The file being parsed
        path: String,
        /// The underlying parse error
        #[source]
        source: ini::ParseError,
    },
    /// Local file access failed.
    #[error("{context}")]
    Io {
        /// What we were doing
        context: String,
        /// The underlying error
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// The external command failure behind this error, if any.
    pub fn execution(&self) -> Option<&ExecutionError> {
        match self {
            Self::Execution(e) | Self::Cleanup(e) => Some(e),
            _ => None,
        }
    }
}
