//! Logging initialization for the athanor CLI
//!
//! Structured logging via `tracing`. The default format is compact and
//! human-readable; `--verbose` switches to a structured format with
//! targets and span close events for debugging pipeline timing.

use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Initialize the tracing subscriber.
///
/// Respects `RUST_LOG` when set; otherwise `athanor=info` by default and
/// `athanor=debug` with `verbose`.
///
/// # Errors
///
/// Returns an error when a subscriber is already installed.
pub fn init_tracing(verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| {
            if verbose {
                EnvFilter::try_new("athanor=debug,info")
            } else {
                EnvFilter::try_new("athanor=info,warn")
            }
        })
        .unwrap_or_else(|_| EnvFilter::new("info"));

    if verbose {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .compact(),
            )
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(false).compact())
            .try_init()?;
    }

    Ok(())
}
