//! Plain-text event formatter that prefixes each line with the enclosing spans and their
//! fields, e.g. `2024-05-01T10:00:00Z  INFO turn{thread_id="t-1"}: insight::graph: ...`.
//!
//! Used by `logging::init()` so every graph log line carries the thread it belongs to.

use std::fmt;

use tracing_core::Subscriber;
use tracing_subscriber::fmt::format::{FormatEvent, FormatFields, Writer};
use tracing_subscriber::fmt::time::{FormatTime, SystemTime};
use tracing_subscriber::fmt::{FmtContext, FormattedFields};
use tracing_subscriber::registry::LookupSpan;

pub struct TurnFormat {
    timer: SystemTime,
    with_target: bool,
}

impl Default for TurnFormat {
    fn default() -> Self {
        Self {
            timer: SystemTime,
            with_target: true,
        }
    }
}

impl TurnFormat {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop the module path from each line.
    #[allow(dead_code)]
    pub fn with_target(mut self, on: bool) -> Self {
        self.with_target = on;
        self
    }
}

impl<S, N> FormatEvent<S, N> for TurnFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing_core::Event<'_>,
    ) -> fmt::Result {
        self.timer.format_time(&mut writer)?;
        write!(writer, " {:>5} ", event.metadata().level())?;

        if let Some(scope) = ctx.event_scope() {
            for span in scope.from_root() {
                write!(writer, "{}", span.name())?;
                let extensions = span.extensions();
                if let Some(fields) = extensions.get::<FormattedFields<N>>() {
                    if !fields.is_empty() {
                        write!(writer, "{{{}}}", fields)?;
                    }
                }
                write!(writer, ": ")?;
            }
        }

        if self.with_target {
            write!(writer, "{}: ", event.metadata().target())?;
        }
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::layer::SubscriberExt;

    #[derive(Clone)]
    struct VecWriter(Arc<Mutex<Vec<u8>>>);

    impl Write for VecWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn capture(format: TurnFormat, emit: impl FnOnce()) -> String {
        let sink = Arc::new(Mutex::new(Vec::<u8>::new()));
        let writer = {
            let sink = Arc::clone(&sink);
            move || VecWriter(Arc::clone(&sink))
        };
        let subscriber = tracing_subscriber::registry().with(
            tracing_subscriber::fmt::layer()
                .event_format(format)
                .with_writer(writer)
                .with_ansi(false),
        );
        tracing::subscriber::with_default(subscriber, emit);
        let bytes = sink.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    /// **Scenario**: An event inside the turn span is prefixed with the span name and its thread id.
    #[test]
    fn line_carries_turn_span_fields() {
        let output = capture(TurnFormat::new(), || {
            let span = tracing::info_span!("turn", thread_id = "t-1");
            let _guard = span.enter();
            tracing::info!(node_id = "root", "Starting node execution");
        });
        assert!(output.contains("INFO"), "{}", output);
        assert!(output.contains("turn{thread_id=\"t-1\"}: "), "{}", output);
        assert!(output.contains("node_id=\"root\""), "{}", output);
        assert!(output.contains("Starting node execution"));
    }

    /// **Scenario**: Outside any span and with targets off, the line is just level and message.
    #[test]
    fn without_span_or_target() {
        let output = capture(TurnFormat::new().with_target(false), || {
            tracing::warn!("bare");
        });
        assert!(output.contains(" WARN bare"), "{}", output);
        assert!(!output.contains("log_format"));
    }
}
