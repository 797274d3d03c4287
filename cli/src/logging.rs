//! Stderr logging for the binary.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::log_format::TurnFormat;

/// `RUST_LOG` wins when set; otherwise `warn`, or `insight=debug` with `--verbose`.
pub fn filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("warn,insight=debug,insight_cli=debug")
        } else {
            EnvFilter::new("warn")
        }
    })
}

pub fn init(verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .event_format(TurnFormat::new())
                .with_writer(std::io::stderr)
                .with_ansi(false)
                .with_filter(filter(verbose)),
        )
        .try_init()?;
    Ok(())
}
