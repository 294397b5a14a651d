use tracing_subscriber::{
    filter::Directive, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

/// Initialize JSON logging to stderr.
///
/// When `quiet` is true, only error-level events are emitted; otherwise
/// info-level and above. `RUST_LOG` directives are layered on top.
pub fn init_logging(quiet: bool) {
    let directive = if quiet {
        "mini_os_helper=error"
    } else {
        "mini_os_helper=info"
    };

    let filter = match directive.parse::<Directive>() {
        Ok(directive) => EnvFilter::from_default_env().add_directive(directive),
        Err(_) => EnvFilter::from_default_env(),
    };

    // A second call (e.g. from tests) leaves the first subscriber in place.
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_current_span(false)
                .with_span_list(false),
        )
        .with(filter)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_logging_is_idempotent() {
        init_logging(true);
        init_logging(false);
        tracing::error!(event = "logging.test", "still usable after double init");
    }
}
