use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize logging with tracing
///
/// This function sets up the tracing subscriber with the following configuration:
/// - Reads filter from RUST_LOG environment variable if available
/// - Falls back to "micscribe=info,warn" if RUST_LOG is not set
/// - Writes to stderr so stdout carries only transcripts
///
/// Calling it more than once is harmless; later calls keep the first subscriber.
///
/// # Example
///
/// ```no_run
/// use micscribe_lib::utils::logging::init_logging;
///
/// init_logging();
/// ```
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("micscribe=info,micscribe_lib=info,warn"));

    let installed = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init()
        .is_ok();

    if installed {
        tracing::debug!("micscribe logging initialized");
    }
}
