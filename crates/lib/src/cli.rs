//! # mockimage command line interface
//!
//! Command line tool to build container base images from mock build roots.

use std::ffi::OsString;
use std::io::Write as _;

use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use clap::Parser;
use fn_error_context::context;
use mockimage_utils::{CommandRunner, ShellRunner};

use crate::builder::ImageBuilder;
use crate::cleanup::ArtifactCleaner;
use crate::config::{BuildConfig, ConfigFile, ContainerRuntime};
use crate::profile::BuildRootProfile;
use crate::repoconf::rewrite_repo_config;

/// Options shared by every subcommand that touches a build.
#[derive(Debug, clap::Args, PartialEq, Eq, Default)]
pub(crate) struct BuildOpts {
    /// Load configuration from this TOML file
    #[clap(long, env = crate::config::CONFIG_VAR)]
    pub(crate) config: Option<Utf8PathBuf>,

    /// Path or name of the mock profile
    #[clap(long, env = "MOCKIMAGE_MOCK_CONFIG")]
    pub(crate) mock_config: Option<String>,

    /// Name of the image to create
    #[clap(long, env = "MOCKIMAGE_IMAGE")]
    pub(crate) image: Option<String>,

    /// Container runtime used to import the image
    #[clap(long, value_enum)]
    pub(crate) runtime: Option<ContainerRuntime>,

    /// mock's basedir, where build roots are kept
    #[clap(long)]
    pub(crate) mock_basedir: Option<Utf8PathBuf>,

    /// Never try `sudo -n` when archiving the build root
    #[clap(long)]
    pub(crate) no_elevate: bool,
}

impl BuildOpts {
    /// Resolve the effective configuration.
    #[context("Loading configuration")]
    pub(crate) fn resolve(&self) -> Result<BuildConfig> {
        let file = match self.config.as_deref() {
            Some(path) => ConfigFile::load(path)?,
            None => ConfigFile::default(),
        };
        let overrides = ConfigFile {
            mock_config: self.mock_config.clone(),
            image_name: self.image.clone(),
            runtime: self.runtime,
            mock_basedir: self.mock_basedir.clone(),
            elevate: self.no_elevate.then_some(false),
        };
        Ok(BuildConfig::resolve(file, overrides)?)
    }
}

/// Options for `rewrite-repo`.
#[derive(Debug, clap::Args, PartialEq, Eq)]
pub(crate) struct RewriteRepoOpts {
    /// A package manager configuration such as dnf.conf
    pub(crate) input: Utf8PathBuf,

    /// Write the result here instead of stdout
    #[clap(long, short = 'o')]
    pub(crate) output: Option<Utf8PathBuf>,
}

/// Build container base images from mock build roots.
#[derive(Debug, Parser, PartialEq, Eq)]
#[clap(name = "mockimage")]
#[clap(rename_all = "kebab-case")]
#[clap(version, long_version = clap::crate_version!())]
pub(crate) enum Opt {
    /// Build the image: clean up, initialize the build root, configure
    /// repositories, archive the root filesystem and import it.
    Build(BuildOpts),
    /// Remove containers, the image, and the build root of a previous build.
    Cleanup(BuildOpts),
    /// Print the build root identifier from a mock profile.
    RootId {
        /// Path or name of the mock profile
        profile: String,
    },
    /// Strip the `[main]` section from a package manager configuration,
    /// leaving only repository sections.
    RewriteRepo(RewriteRepoOpts),
    /// Print the resolved configuration as JSON.
    PrintConfig(BuildOpts),
}

/// Parse the provided arguments and execute.
/// Calls [`clap::Error::exit`] on failure, printing the error message and aborting the program.
pub fn run_from_iter<I>(args: I) -> Result<()>
where
    I: IntoIterator,
    I::Item: Into<OsString> + Clone,
{
    run_from_opt(Opt::parse_from(args), &ShellRunner::new())
}

#[context("Building image")]
fn build(runner: &impl CommandRunner, opts: &BuildOpts) -> Result<()> {
    let config = opts.resolve()?;
    let profile = BuildRootProfile::load(&config.mock_config)?;
    let report = ImageBuilder::new(runner, &config).build(&profile)?;
    if report.privileged_archive {
        println!("Created image {}", report.image_name);
    } else {
        println!(
            "Created image {} (archived without elevated privileges; may be incomplete)",
            report.image_name
        );
    }
    Ok(())
}

#[context("Rewriting repository configuration")]
fn rewrite_repo(opts: &RewriteRepoOpts) -> Result<()> {
    let input = &opts.input;
    let text = std::fs::read_to_string(input).with_context(|| format!("Reading {input}"))?;
    let revised = rewrite_repo_config(input.as_str(), &text)?;
    match opts.output.as_deref() {
        Some(output) => {
            std::fs::write(output, revised).with_context(|| format!("Writing {output}"))?
        }
        None => std::io::stdout()
            .lock()
            .write_all(revised.as_bytes())
            .context("Writing to stdout")?,
    }
    Ok(())
}

fn run_from_opt(opt: Opt, runner: &impl CommandRunner) -> Result<()> {
    match opt {
        Opt::Build(opts) => build(runner, &opts),
        Opt::Cleanup(opts) => {
            let config = opts.resolve()?;
            ArtifactCleaner::new(runner, &config).run()?;
            Ok(())
        }
        Opt::RootId { profile } => {
            let profile = BuildRootProfile::load(&profile)?;
            println!("{}", profile.root_id);
            Ok(())
        }
        Opt::RewriteRepo(opts) => rewrite_repo(&opts),
        Opt::PrintConfig(opts) => {
            let config = opts.resolve()?;
            let mut stdout = std::io::stdout().lock();
            serde_json::to_writer_pretty(&mut stdout, &config)?;
            writeln!(stdout)?;
            Ok(())
        }
    }
}
