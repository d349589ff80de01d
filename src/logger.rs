use log::LevelFilter;

/// Initializes the process-wide logger; `--verbose` shows debug output,
/// otherwise only warnings and errors are printed.
pub fn init_logger(verbose: bool) {
    env_logger::Builder::new()
        .filter_level(if verbose { LevelFilter::Debug } else { LevelFilter::Warn })
        .format_timestamp(None)
        .init();
}
