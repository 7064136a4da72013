//! A scripted [`CommandRunner`] for unit tests.

use std::cell::RefCell;

use camino::Utf8PathBuf;
use mockimage_utils::{CommandRunner, ExecutionError};

#[derive(Debug, Default)]
pub(crate) struct FakeRunner {
    commands: RefCell<Vec<String>>,
    failures: Vec<(String, i32)>,
    outputs: Vec<(String, String)>,
    copyout: Option<String>,
    copied_in: RefCell<Vec<String>>,
    temp_paths: RefCell<Vec<Utf8PathBuf>>,
}

impl FakeRunner {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Content that `mock --copyout` "copies" to its destination.
    pub(crate) fn with_copyout(mut self, content: &str) -> Self {
        self.copyout = Some(content.to_owned());
        self
    }

    /// Any command containing `pattern` exits with `code`.
    pub(crate) fn fail_on(mut self, pattern: &str, code: i32) -> Self {
        self.failures.push((pattern.to_owned(), code));
        self
    }

    /// Any command containing `pattern` prints `output`.
    pub(crate) fn output_for(mut self, pattern: &str, output: &str) -> Self {
        self.outputs.push((pattern.to_owned(), output.to_owned()));
        self
    }

    pub(crate) fn commands(&self) -> Vec<String> {
        self.commands.borrow().clone()
    }

    pub(crate) fn copied_in(&self) -> Vec<String> {
        self.copied_in.borrow().clone()
    }

    pub(crate) fn temp_paths(&self) -> Vec<Utf8PathBuf> {
        self.temp_paths.borrow().clone()
    }

    fn simulate_mock(&self, cmdline: &str) {
        let words: Vec<&str> = cmdline.split_whitespace().collect();
        if let Some(i) = words.iter().position(|w| *w == "--copyout") {
            let dest = Utf8PathBuf::from(words[i + 2]);
            std::fs::write(&dest, self.copyout.as_deref().unwrap_or_default()).unwrap();
            self.temp_paths.borrow_mut().push(dest);
        } else if let Some(i) = words.iter().position(|w| *w == "--copyin") {
            let src = Utf8PathBuf::from(words[i + 1]);
            let content = std::fs::read_to_string(&src).unwrap();
            self.copied_in.borrow_mut().push(content);
            self.temp_paths.borrow_mut().push(src);
        }
    }
}

impl CommandRunner for FakeRunner {
    fn run(&self, cmdline: &str) -> Result<String, ExecutionError> {
        self.commands.borrow_mut().push(cmdline.to_owned());
        if let Some((_, code)) = self.failures.iter().find(|(p, _)| cmdline.contains(p)) {
            return Err(ExecutionError::Failed {
                command: cmdline.to_owned(),
                code: *code,
                output: "simulated failure\n".into(),
            });
        }
        if cmdline.starts_with("mock ") {
            self.simulate_mock(cmdline);
        }
        let output = self
            .outputs
            .iter()
            .find(|(p, _)| cmdline.contains(p))
            .map(|(_, o)| o.clone())
            .unwrap_or_default();
        Ok(output)
    }
}
