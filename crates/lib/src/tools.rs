//! Command lines for the external tools we drive.
//!
//! Everything here only builds strings; running them is the job of a
//! [`mockimage_utils::CommandRunner`].

use std::borrow::Cow;

use camino::Utf8Path;

use crate::config::ContainerRuntime;
use crate::error::{Error, Result};

/// Quote a single shell word.
pub(crate) fn quote(s: &str) -> Result<Cow<'_, str>> {
    shlex::try_quote(s).map_err(|e| Error::InvalidConfig(format!("cannot quote {s:?}: {e}")))
}

/// Invocations of `mock` against one profile.
#[derive(Debug)]
pub(crate) struct Mock<'a> {
    profile: Cow<'a, str>,
}

impl<'a> Mock<'a> {
    pub(crate) fn new(profile: &'a str) -> Result<Self> {
        Ok(Self {
            profile: quote(profile)?,
        })
    }

    fn cmd(&self, rest: &str) -> String {
        format!("mock -r {} {rest}", self.profile)
    }

    pub(crate) fn init(&self) -> String {
        self.cmd("--init")
    }

    pub(crate) fn scrub_all(&self) -> String {
        self.cmd("--scrub=all")
    }

    pub(crate) fn copyout(&self, src: &str, dest: &Utf8Path) -> Result<String> {
        Ok(self.cmd(&format!("--copyout {} {}", quote(src)?, quote(dest.as_str())?)))
    }

    pub(crate) fn copyin(&self, src: &Utf8Path, dest: &str) -> Result<String> {
        Ok(self.cmd(&format!("--copyin {} {}", quote(src.as_str())?, quote(dest)?)))
    }

    /// Run a shell command line inside the chroot.
    pub(crate) fn chroot(&self, script: &str) -> Result<String> {
        Ok(self.cmd(&format!("--chroot {}", quote(script)?)))
    }
}

/// `tar` streaming the whole tree under `root` to stdout.
pub(crate) fn tar_rootfs(root: &Utf8Path) -> Result<String> {
    Ok(format!("tar -C {} -c .", quote(root.as_str())?))
}

/// Run `cmd` through `sudo` without ever prompting for a password.
pub(crate) fn sudo_noninteractive(cmd: &str) -> String {
    format!("sudo -n {cmd}")
}

/// Invocations of the container runtime.
#[derive(Debug)]
pub(crate) struct Runtime<'a> {
    bin: &'static str,
    image: Cow<'a, str>,
}

impl<'a> Runtime<'a> {
    pub(crate) fn new(runtime: ContainerRuntime, image: &'a str) -> Result<Self> {
        Ok(Self {
            bin: runtime.as_str(),
            image: quote(image)?,
        })
    }

    /// IDs of all containers (running or not) created from the image.
    pub(crate) fn list_containers(&self) -> String {
        format!("{} ps -a -q --filter ancestor={}", self.bin, self.image)
    }

    pub(crate) fn remove_container(&self, id: &str) -> Result<String> {
        Ok(format!("{} rm -f {}", self.bin, quote(id)?))
    }

    /// IDs of the image, empty if it does not exist.
    pub(crate) fn list_images(&self) -> String {
        format!("{} images -q {}", self.bin, self.image)
    }

    pub(crate) fn remove_image(&self) -> String {
        format!("{} rmi -f {}", self.bin, self.image)
    }

    /// Import an archive read from stdin as the image.
    pub(crate) fn import_stdin(&self) -> String {
        format!("{} import - {}", self.bin, self.image)
    }
}
