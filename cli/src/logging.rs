use tracing_subscriber::EnvFilter;

/// Log to stderr, so diagnostics never mix with a document written to stdout.
/// `RUST_LOG` overrides `default_level`.
pub fn init(default_level: &str, no_color: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .with_ansi(!no_color)
        .init();
}
