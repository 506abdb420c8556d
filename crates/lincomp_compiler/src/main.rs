// When 'lib.rs' exists, cargo treats 'main.rs' as a separate crate
use lincomp_common::file_cache::FileCache;
use lincomp_common::report_error::Reportable;
use lincomp_compiler::cli::Config;
use lincomp_compiler::handle_config;

use std::io;

fn main() {
    better_panic::install();

    let (config, verbosity) = Config::from_args();
    // Warnings are always shown; each '-v' adds a level.
    let _ = stderrlog::new().verbosity(1 + verbosity).init();

    let mut files = FileCache::new();
    let result = handle_config(config, &mut files);
    if let Err(err) = result {
        let _ = err.report(&mut io::stderr().lock(), &files);
        std::process::exit(err.exit_status());
    }
}
