//! Log output for the command-line tool
//!
//! Logs go to stderr so stdout only carries the run report. `RUST_LOG`
//! overrides the level passed on the command line.

use tracing_subscriber::EnvFilter;

/// Install the global subscriber.
///
/// Calling this twice is harmless; the second call is ignored.
pub fn init(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(level)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init();
}

/// Scope the requested level to this tool's crates so dependencies stay quiet.
fn default_directive(level: &str) -> String {
    format!(
        "warn,diskcache_gc={level},diskcache_collector={level}",
        level = level
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive() {
        assert_eq!(
            default_directive("debug"),
            "warn,diskcache_gc=debug,diskcache_collector=debug"
        );
        assert!(EnvFilter::try_new(default_directive("info")).is_ok());
    }

    #[test]
    fn test_init_twice() {
        init("info");
        init("debug");
    }
}
