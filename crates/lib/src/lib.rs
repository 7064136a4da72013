//! # Container base images from mock build roots
//!
//! This crate drives `mock`, `tar` and a container runtime to turn a
//! freshly initialized build root into a container image whose package
//! manager still knows the build's repositories.

pub mod builder;
pub mod cleanup;
pub mod cli;
pub mod config;
pub mod error;
pub mod profile;
pub mod repoconf;
mod tools;

#[cfg(test)]
mod testutil;

pub use builder::{BuildReport, ImageBuilder};
pub use cleanup::ArtifactCleaner;
pub use config::{BuildConfig, ContainerRuntime};
pub use error::{Error, Result};
pub use profile::BuildRootProfile;
pub use repoconf::{rewrite_repo_config, PackageRepoConfig, RepoConfigRewriter};
