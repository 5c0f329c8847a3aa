//! Log subscriber setup.

use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter
pub const LOG_ENV: &str = "CADENCE_LOG";

/// Install a stderr `fmt` subscriber filtered by `CADENCE_LOG` (default `info`).
///
/// Returns `false` if a global subscriber was already installed; the existing
/// one is kept.
pub fn init_logging() -> bool {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_harmless() {
        let _ = init_logging();
        assert!(!init_logging());
    }
}
