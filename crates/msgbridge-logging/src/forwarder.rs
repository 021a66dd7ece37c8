//! Log forwarding to a host-provided sink

use msgbridge_core::LogLevel;
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use std::cell::Cell;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

/// Sink receiving forwarded log records
///
/// # Parameters
/// - `level`: Level of the record
/// - `target`: Log target (module path)
/// - `message`: Formatted message
pub type LogSink = Arc<dyn Fn(LogLevel, &str, &str) + Send + Sync>;

/// Wrap a closure as a [`LogSink`]
pub fn log_sink<F>(f: F) -> LogSink
where
    F: Fn(LogLevel, &str, &str) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Target prefix of the bridge crates; their records are never forwarded
pub const INTERNAL_TARGET_PREFIX: &str = "msgbridge";

/// Global forwarder
static FORWARDER: OnceCell<LogForwarder> = OnceCell::new();

thread_local! {
    static FORWARDING: Cell<bool> = const { Cell::new(false) };
}

/// Forwards log records at or above a level to a registered sink
///
/// A sink typically ships records to the remote side as `log` messages. The
/// bridge logs about the traffic that causes, so records from the bridge
/// crates are skipped, as is anything logged by the sink itself.
pub struct LogForwarder {
    sink: RwLock<Option<LogSink>>,
    level: AtomicU8,
}

impl LogForwarder {
    pub fn new() -> Self {
        Self {
            sink: RwLock::new(None),
            level: AtomicU8::new(LogLevel::Info as u8),
        }
    }

    /// Get the global forwarder instance
    pub fn global() -> &'static LogForwarder {
        FORWARDER.get_or_init(LogForwarder::new)
    }

    /// Set or clear the sink
    pub fn set_sink(&self, sink: Option<LogSink>) {
        *self.sink.write() = sink;
    }

    pub fn has_sink(&self) -> bool {
        self.sink.read().is_some()
    }

    pub fn set_level(&self, level: LogLevel) {
        self.level.store(level as u8, Ordering::SeqCst);
    }

    pub fn level(&self) -> LogLevel {
        LogLevel::from_u8(self.level.load(Ordering::SeqCst))
    }

    /// Check if records at `level` are forwarded
    pub fn is_enabled(&self, level: LogLevel) -> bool {
        level != LogLevel::Off && level >= self.level()
    }

    /// Check if `target` belongs to the bridge crates
    pub fn is_internal_target(target: &str) -> bool {
        target.starts_with(INTERNAL_TARGET_PREFIX)
    }

    /// Hand one record to the sink; returns whether it was forwarded
    pub fn forward(&self, level: LogLevel, target: &str, message: &str) -> bool {
        if !self.is_enabled(level) || Self::is_internal_target(target) {
            return false;
        }
        // Clone out of the lock so the sink may replace itself
        let Some(sink) = self.sink.read().clone() else {
            return false;
        };
        if FORWARDING.with(|forwarding| forwarding.replace(true)) {
            return false;
        }
        let _reset = ForwardingReset;
        sink(level, target, message);
        true
    }
}

/// Clears the re-entrancy flag, also when the sink panics
struct ForwardingReset;

impl Drop for ForwardingReset {
    fn drop(&mut self) {
        FORWARDING.with(|forwarding| forwarding.set(false));
    }
}

impl Default for LogForwarder {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LogForwarder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogForwarder")
            .field("level", &self.level())
            .field("has_sink", &self.has_sink())
            .finish()
    }
}
