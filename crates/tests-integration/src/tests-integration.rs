//! Integration tests for mockimage.
//!
//! These run against the `mockimage` binary found in `$PATH`. Tests
//! that build real images are ignored unless `MOCKIMAGE_TEST_PROFILE`
//! names a mock profile to build from.

mod cli;
mod image;

use libtest_mimic::{Arguments, Trial};

pub(crate) fn new_test(description: &'static str, f: fn() -> anyhow::Result<()>) -> Trial {
    Trial::test(description, move || f().map_err(Into::into))
}

fn main() {
    let args = Arguments::from_args();
    let mut tests = cli::tests();
    tests.extend(image::tests());
    libtest_mimic::run(&args, tests).exit()
}
