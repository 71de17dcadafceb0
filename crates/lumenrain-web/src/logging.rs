use tracing_subscriber::fmt::format::Pretty;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;
use tracing_web::{performance_layer, MakeWebConsoleWriter};

/// Routes `tracing` events to the browser console at their own level, with
/// spans mirrored to the Performance timeline.
pub fn init() {
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .without_time()
        .with_writer(MakeWebConsoleWriter::new());
    let perf_layer = performance_layer().with_details_from_fields(Pretty::default());
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::new("info"))
        .with(fmt_layer)
        .with(perf_layer)
        .try_init();
}
