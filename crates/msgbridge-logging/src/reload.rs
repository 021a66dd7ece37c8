//! Dynamic log level reloading

use crate::forwarder::LogForwarder;
use msgbridge_core::{BridgeError, BridgeResult, LogLevel};
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::reload;

/// Handle for changing the level filter installed by [`init_logging`](crate::init_logging)
pub struct ReloadHandle {
    handle: Mutex<Option<reload::Handle<LevelFilter, tracing_subscriber::Registry>>>,
}

impl ReloadHandle {
    pub fn new() -> Self {
        Self {
            handle: Mutex::new(None),
        }
    }

    /// Get the global reload handle
    pub fn global() -> &'static ReloadHandle {
        static INSTANCE: OnceCell<ReloadHandle> = OnceCell::new();
        INSTANCE.get_or_init(ReloadHandle::new)
    }

    pub fn set_handle(&self, handle: reload::Handle<LevelFilter, tracing_subscriber::Registry>) {
        *self.handle.lock() = Some(handle);
    }

    pub fn is_initialized(&self) -> bool {
        self.handle.lock().is_some()
    }

    /// Reload the filter to use a new log level
    pub fn reload_level(&self, level: LogLevel) -> BridgeResult<()> {
        let guard = self.handle.lock();
        let handle = guard.as_ref().ok_or_else(|| BridgeError::InvalidState {
            expected: "logging initialized".to_string(),
            actual: "reload handle not set".to_string(),
        })?;
        handle
            .reload(level_filter(level))
            .map_err(|e| BridgeError::InvalidArgument(format!("failed to reload filter: {}", e)))
    }
}

impl Default for ReloadHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Change the level of both the subscriber filter and the global forwarder
pub fn set_log_level(level: LogLevel) -> BridgeResult<()> {
    ReloadHandle::global().reload_level(level)?;
    LogForwarder::global().set_level(level);
    tracing::info!(?level, "Log level changed");
    Ok(())
}

pub(crate) fn level_filter(level: LogLevel) -> LevelFilter {
    match level {
        LogLevel::Trace => LevelFilter::TRACE,
        LogLevel::Debug => LevelFilter::DEBUG,
        LogLevel::Info => LevelFilter::INFO,
        LogLevel::Warn => LevelFilter::WARN,
        LogLevel::Error => LevelFilter::ERROR,
        LogLevel::Off => LevelFilter::OFF,
    }
}
