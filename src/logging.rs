use std::sync::Once;

use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

static INIT: Once = Once::new();

/// Install a global subscriber printing courier events to stderr
///
/// Filtering follows the `RUST_LOG` environment variable, e.g. `RUST_LOG=courier=debug`.
/// Subsequent calls, or calls after another global subscriber was installed, do nothing.
pub fn init() {
    INIT.call_once(|| {
        tracing_subscriber::registry()
            .with(EnvFilter::from_default_env())
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_span_events(FmtSpan::CLOSE)
                    .event_format(fmt::format().compact().with_target(false)),
            )
            .try_init()
            .unwrap_or(())
    });
}
