//! The main entrypoint for mockimage, which just performs global initialization, and then
//! calls out into the library.
use anyhow::Result;
use mockimage_utils::LevelFilter;

fn run() -> Result<()> {
    mockimage_utils::initialize_tracing(LevelFilter::INFO);
    tracing::trace!("starting {}", mockimage_utils::NAME);
    mockimage_lib::cli::run_from_iter(std::env::args())
}

fn main() {
    mockimage_utils::run_main(run)
}
