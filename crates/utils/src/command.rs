//! Running external command lines through the shell.

use std::process::{Command, Stdio};

/// The shell used to interpret command lines.
const SHELL: &str = "/bin/sh";

/// An external command failed.
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    /// The command ran but exited unsuccessfully.
    #[error("command '{command}' returned exit status {code}; output:\n{output}")]
    Failed {
        /// The command line as given to the shell
        command: String,
        /// The exit code, or -1 if the process was killed by a signal
        code: i32,
        /// Combined stdout and stderr
        output: String,
    },
    /// The shell itself could not be started.
    #[error("failed to spawn command '{command}'")]
    Spawn {
        /// The command line as given to the shell
        command: String,
        /// The underlying error
        #[source]
        source: std::io::Error,
    },
}

impl ExecutionError {
    /// The command line that failed.
    pub fn command(&self) -> &str {
        match self {
            Self::Failed { command, .. } | Self::Spawn { command, .. } => command,
        }
    }

    /// The exit code, if the command got far enough to have one.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Failed { code, .. } => Some(*code),
            Self::Spawn { .. } => None,
        }
    }

    /// Captured output of the failed command; empty if it never ran.
    pub fn output(&self) -> &str {
        match self {
            Self::Failed { output, .. } => output,
            Self::Spawn { .. } => "",
        }
    }
}

/// Executes command lines, returning their combined output.
///
/// Every external tool invocation goes through this trait so that
/// the orchestration logic can be driven without touching the host.
pub trait CommandRunner {
    /// Run `cmdline` in a shell; stdout and stderr are merged.
    ///
    /// A non-zero exit is always an error.
    fn run(&self, cmdline: &str) -> Result<String, ExecutionError>;
}

impl<T: CommandRunner + ?Sized> CommandRunner for &T {
    fn run(&self, cmdline: &str) -> Result<String, ExecutionError> {
        (**self).run(cmdline)
    }
}

/// The real [`CommandRunner`], using `/bin/sh -c`.
#[derive(Debug, Clone, Copy)]
pub struct ShellRunner {
    shell: &'static str,
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self { shell: SHELL }
    }
}

impl ShellRunner {
    /// Create a new runner.
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    fn with_shell(shell: &'static str) -> Self {
        Self { shell }
    }
}

impl CommandRunner for ShellRunner {
    fn run(&self, cmdline: &str) -> Result<String, ExecutionError> {
        tracing::debug!("exec: {cmdline}");
        // Redirect stderr for the whole script so pipelines are covered too
        let script = format!("exec 2>&1\n{cmdline}");
        let o = Command::new(self.shell)
            .args(["-c", &script])
            .stdin(Stdio::null())
            .output()
            .map_err(|source| ExecutionError::Spawn {
                command: cmdline.to_owned(),
                source,
            })?;
        let output = String::from_utf8_lossy(&o.stdout).into_owned();
        if !o.status.success() {
            return Err(ExecutionError::Failed {
                command: cmdline.to_owned(),
                code: o.status.code().unwrap_or(-1),
                output,
            });
        }
        tracing::info!("command '{cmdline}' succeeded with output:\n{output}");
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_output() {
        let out = ShellRunner::new().run("echo hello").unwrap();
        assert_eq!(out, "hello\n");
    }

    #[test]
    fn test_stderr_merged() {
        let out = ShellRunner::new()
            .run("echo out; echo err >&2; echo more")
            .unwrap();
        similar_asserts::assert_eq!(out, "out\nerr\nmore\n");
    }

    #[test]
    fn test_pipeline() {
        let out = ShellRunner::new().run("printf 'a\\nb\\n' | wc -l").unwrap();
        assert_eq!(out.trim(), "2");
    }

    #[test]
    fn test_failure() {
        let err = ShellRunner::new()
            .run("echo oops >&2; exit 3")
            .unwrap_err();
        assert_eq!(err.command(), "echo oops >&2; exit 3");
        assert_eq!(err.exit_code(), Some(3));
        assert_eq!(err.output(), "oops\n");
        let msg = err.to_string();
        assert!(msg.contains("returned exit status 3"), "{msg}");
        assert!(msg.contains("oops"), "{msg}");
    }

    #[test]
    fn test_spawn_failure() {
        let err = ShellRunner::with_shell("/nonexistent/sh")
            .run("true")
            .unwrap_err();
        assert!(matches!(err, ExecutionError::Spawn { .. }), "{err:?}");
        assert_eq!(err.command(), "true");
        assert_eq!(err.exit_code(), None);
        assert_eq!(err.output(), "");
        assert_eq!(err.to_string(), "failed to spawn command 'true'");
    }

    #[test]
    fn test_by_reference() {
        fn run_it(r: impl CommandRunner) -> String {
            r.run("true").unwrap()
        }
        let runner = ShellRunner::new();
        assert_eq!(run_it(&runner), "");
    }
}
