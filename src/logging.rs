//! Tracing initialization

use std::sync::Once;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Environment variable holding the log filter
pub const LOG_ENV: &str = "VITALWATCH_LOG";

const DEFAULT_FILTER: &str = "vitalwatch=info";

static INIT: Once = Once::new();

/// Install the global subscriber.
///
/// `level` (e.g. `"debug"` or `"vitalwatch=trace"`) takes precedence over
/// `VITALWATCH_LOG`; both fall back to `vitalwatch=info`. Calling this more
/// than once is a no-op.
pub fn init_tracing(level: Option<&str>) {
    INIT.call_once(|| {
        let filter = level
            .and_then(|l| EnvFilter::try_new(l).ok())
            .or_else(|| EnvFilter::try_from_env(LOG_ENV).ok())
            .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER));

        let _ = tracing_subscriber::registry()
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .with(filter)
            .try_init();
    });
}
