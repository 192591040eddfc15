use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is not set
pub(crate) fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else {
        "warn"
    }
}

/// Initialize logging with tracing-subscriber.
///
/// Uses the `RUST_LOG` env var if set. Records emitted through the `log`
/// facade by the library crates are forwarded to the subscriber.
pub fn init(verbose: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    // A second init (tests) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
#[path = "logging_test.rs"]
mod tests;
