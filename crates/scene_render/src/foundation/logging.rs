//! Logging utilities and structured logging support

pub use log::{debug, info, warn, error, trace, LevelFilter};

/// Initialize the logging system from `RUST_LOG`
pub fn init() {
    env_logger::init();
}

/// Initialize logging with an explicit level, ignoring repeated calls.
///
/// Useful for tools and tests that want cluster statistics without
/// setting `RUST_LOG`.
pub fn init_with_level(level: LevelFilter) {
    let _ = env_logger::Builder::new()
        .filter_level(level)
        .is_test(cfg!(test))
        .try_init();
}
