//! Tracing layer that forwards events to the log forwarder

use crate::forwarder::LogForwarder;
use crate::reload::{ReloadHandle, level_filter};
use msgbridge_core::LogLevel;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;

/// Tracing layer handing events to a [`LogForwarder`]
///
/// Level filtering happens in the forwarder so the layer never disables
/// events for the other layers of the subscriber.
pub struct BridgeLoggingLayer {
    forwarder: &'static LogForwarder,
}

impl BridgeLoggingLayer {
    /// Create a layer using the global forwarder
    pub fn new() -> Self {
        Self {
            forwarder: LogForwarder::global(),
        }
    }

    /// Create a layer with a specific forwarder
    pub fn with_forwarder(forwarder: &'static LogForwarder) -> Self {
        Self { forwarder }
    }

    fn convert_level(level: &Level) -> LogLevel {
        match *level {
            Level::TRACE => LogLevel::Trace,
            Level::DEBUG => LogLevel::Debug,
            Level::INFO => LogLevel::Info,
            Level::WARN => LogLevel::Warn,
            Level::ERROR => LogLevel::Error,
        }
    }
}

impl Default for BridgeLoggingLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Layer<S> for BridgeLoggingLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let level = Self::convert_level(metadata.level());
        if !self.forwarder.is_enabled(level) || LogForwarder::is_internal_target(metadata.target())
        {
            return;
        }

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        let message = visitor.finish();

        self.forwarder.forward(level, metadata.target(), &message);
    }
}

/// Collects the message of an event, followed by its other fields
#[derive(Default)]
struct MessageVisitor {
    message: Option<String>,
    fields: Vec<String>,
}

impl MessageVisitor {
    fn finish(self) -> String {
        let mut out = self.message.unwrap_or_default();
        for field in self.fields {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(&field);
        }
        out
    }
}

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = Some(format!("{:?}", value));
        } else {
            self.fields.push(format!("{}={:?}", field.name(), value));
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.fields.push(format!("{}={}", field.name(), value));
        }
    }
}

/// Initialize logging at `level`
///
/// Installs a registry with a reloadable level filter, a fmt layer writing to
/// stderr and a [`BridgeLoggingLayer`]. The global forwarder starts at the
/// same level. Does nothing if a global subscriber is already set.
pub fn init_logging(level: LogLevel) {
    use tracing_subscriber::prelude::*;

    let (filter, handle) = tracing_subscriber::reload::Layer::new(level_filter(level));
    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(BridgeLoggingLayer::new());

    if tracing::subscriber::set_global_default(subscriber).is_ok() {
        ReloadHandle::global().set_handle(handle);
        LogForwarder::global().set_level(level);
    }
}
