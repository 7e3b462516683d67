//! Log output configuration.

use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LogFormat;

/// Directives used when `RUST_LOG` is not set.
const DEFAULT_DIRECTIVES: &str = "info,server=debug,tower_http=debug";

/// Initialize the global tracing subscriber.
///
/// Events are filtered with `RUST_LOG` (falling back to [`DEFAULT_DIRECTIVES`]) and written to
/// stdout in the requested format.
pub fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));

    let fmt_layer = match format {
        LogFormat::Compact => {
            let format = tracing_subscriber::fmt::format()
                .with_level(true)
                .with_target(true)
                .with_thread_ids(false)
                .with_thread_names(false)
                .compact();
            tracing_subscriber::fmt::layer().event_format(format).boxed()
        }
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(fmt_layer.with_filter(filter))
        .init();
}
