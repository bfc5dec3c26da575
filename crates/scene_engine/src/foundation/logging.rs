//! Logging utilities and structured logging support

pub use log::{debug, error, info, trace, warn};

/// Initialize the logging system from `RUST_LOG`
///
/// Safe to call more than once; later calls are ignored.
pub fn init() {
    if env_logger::try_init().is_err() {
        log::debug!("Logger already initialized");
    }
}

/// Initialize the logging system with a default filter
///
/// `RUST_LOG` still wins when it is set. `level` uses the `env_logger`
/// filter syntax, e.g. `"info"` or `"scene_engine=debug,warn"`.
pub fn init_with_level(level: &str) {
    let env = env_logger::Env::default().default_filter_or(level.to_string());
    if env_logger::Builder::from_env(env).try_init().is_err() {
        log::debug!("Logger already initialized, ignoring level '{}'", level);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_init_is_harmless() {
        init_with_level("debug");
        init();
        init_with_level("warn");
        info!("logger still usable");
    }
}
