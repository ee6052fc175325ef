use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// `RUST_LOG` takes precedence over the crate default.
fn resolver_filter(verbose: bool) -> EnvFilter {
    let default_directive = if verbose {
        "meal_resolver=debug,info"
    } else {
        "meal_resolver=info"
    };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive))
}

/// Human-readable logs on stderr, keeping stdout for the meal breakdown.
pub fn init_cli_logger(verbose: bool) {
    tracing_subscriber::registry()
        .with(resolver_filter(verbose))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .init();
}

/// JSON lines on stderr, for hosts that ship logs to a collector.
pub fn init_json_logger(verbose: bool) {
    tracing_subscriber::registry()
        .with(resolver_filter(verbose))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .json(),
        )
        .init();
}
