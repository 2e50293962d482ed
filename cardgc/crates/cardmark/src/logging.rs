//! Barrier Logging and Tracing
//!
//! Structured event log for the rare barrier events: policy setup, deferred
//! flushes, thread detach and collector flush-all passes. Per-store work is
//! never logged here; it goes to `log::trace!` at most.
//!
//! Log Levels:
//! - INFO: Policy initialization, statistics
//! - DEBUG: Thread detach, flush-all passes
//! - TRACE: Individual deferred flushes

use crate::barrier::stats::BarrierStats;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// Log level for barrier events
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
    Trace = 4,
}

/// Barrier event types
#[derive(Debug, Clone)]
pub enum BarrierEvent {
    /// Card-mark policy constructed
    PolicyInitialized {
        card_store: String,
        deferral_enabled: bool,
        strict_ordering: bool,
        card_size: usize,
    },

    /// A deferred card mark reached the card store
    DeferredFlush {
        start: usize,
        end: usize,
        reason: String,
    },

    /// Mutator detached from the barrier
    ThreadDetached { flushed: bool },

    /// Collector drained every mutator's deferred mark
    FlushAll { threads: usize, flushed: usize },

    /// Statistics snapshot
    Stats(BarrierStats),
}

/// Barrier logger configuration
#[derive(Debug, Clone)]
pub struct BarrierLoggerConfig {
    /// Minimum log level
    pub level: LogLevel,

    /// Enable console output
    pub console: bool,

    /// Enable JSON format
    pub json: bool,

    /// Enable timestamps
    pub timestamps: bool,
}

impl Default for BarrierLoggerConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            console: true,
            json: false,
            timestamps: true,
        }
    }
}

/// Barrier Logger - centralized event log
pub struct BarrierLogger {
    config: BarrierLoggerConfig,
    events: Mutex<Vec<(Instant, BarrierEvent)>>,
    enabled: AtomicBool,
}

impl BarrierLogger {
    /// Create new barrier logger
    pub fn new(config: BarrierLoggerConfig) -> Self {
        Self {
            config,
            events: Mutex::new(Vec::new()),
            enabled: AtomicBool::new(true),
        }
    }

    /// Enable logging
    pub fn enable(&self) {
        self.enabled.store(true, Ordering::Relaxed);
    }

    /// Disable logging
    pub fn disable(&self) {
        self.enabled.store(false, Ordering::Relaxed);
    }

    /// Check if logging is enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Log a barrier event
    pub fn log(&self, event: BarrierEvent) {
        if !self.is_enabled() {
            return;
        }

        if Self::event_level(&event) > self.config.level {
            return;
        }

        if self.config.console {
            self.output_console(&event);
        }

        self.events.lock().push((Instant::now(), event));
    }

    fn event_level(event: &BarrierEvent) -> LogLevel {
        match event {
            BarrierEvent::PolicyInitialized { .. } | BarrierEvent::Stats(_) => LogLevel::Info,
            BarrierEvent::ThreadDetached { .. } | BarrierEvent::FlushAll { .. } => LogLevel::Debug,
            BarrierEvent::DeferredFlush { .. } => LogLevel::Trace,
        }
    }

    fn output_console(&self, event: &BarrierEvent) {
        let line = if self.config.json {
            Self::format_json(event)
        } else {
            Self::format_human(event)
        };

        if self.config.timestamps {
            let now = chrono::Local::now();
            println!("[{}] {}", now.format("%Y-%m-%d %H:%M:%S%.3f"), line);
        } else {
            println!("{}", line);
        }
    }

    /// Human-readable rendering of an event
    pub fn format_human(event: &BarrierEvent) -> String {
        match event {
            BarrierEvent::PolicyInitialized {
                card_store,
                deferral_enabled,
                strict_ordering,
                card_size,
            } => format!(
                "[Barrier] Card marking over {} ({} byte cards, deferral={}, strict_ordering={})",
                card_store, card_size, deferral_enabled, strict_ordering
            ),
            BarrierEvent::DeferredFlush { start, end, reason } => format!(
                "[Barrier] Flushed deferred mark [{:#x}, {:#x}) on {}",
                start, end, reason
            ),
            BarrierEvent::ThreadDetached { flushed } => {
                format!("[Barrier] Thread detached (flushed pending mark: {})", flushed)
            }
            BarrierEvent::FlushAll { threads, flushed } => format!(
                "[Barrier] Flush-all: {} threads visited, {} deferred marks flushed",
                threads, flushed
            ),
            BarrierEvent::Stats(stats) => format!(
                "[Barrier] Stats: {} array writes, {} immediate, {} deferred, {} flushed, {} skipped",
                stats.array_writes,
                stats.immediate_marks,
                stats.deferred_marks,
                stats.deferred_flushes,
                stats.skipped_reference_free + stats.skipped_young
            ),
        }
    }

    /// JSON rendering of an event
    pub fn format_json(event: &BarrierEvent) -> String {
        let json = match event {
            BarrierEvent::PolicyInitialized {
                card_store,
                deferral_enabled,
                strict_ordering,
                card_size,
            } => serde_json::json!({
                "type": "policy_initialized",
                "card_store": card_store,
                "deferral_enabled": deferral_enabled,
                "strict_ordering": strict_ordering,
                "card_size": card_size
            }),
            BarrierEvent::DeferredFlush { start, end, reason } => serde_json::json!({
                "type": "deferred_flush",
                "start": start,
                "end": end,
                "reason": reason
            }),
            BarrierEvent::ThreadDetached { flushed } => serde_json::json!({
                "type": "thread_detached",
                "flushed": flushed
            }),
            BarrierEvent::FlushAll { threads, flushed } => serde_json::json!({
                "type": "flush_all",
                "threads": threads,
                "flushed": flushed
            }),
            BarrierEvent::Stats(stats) => serde_json::json!({
                "type": "stats",
                "stats": stats
            }),
        };

        json.to_string()
    }

    /// Get all events
    pub fn get_events(&self) -> Vec<(Instant, BarrierEvent)> {
        self.events.lock().clone()
    }

    /// Clear all events
    pub fn clear_events(&self) {
        self.events.lock().clear();
    }

    /// Get event count
    pub fn event_count(&self) -> usize {
        self.events.lock().len()
    }
}

impl Default for BarrierLogger {
    fn default() -> Self {
        Self::new(BarrierLoggerConfig::default())
    }
}

lazy_static::lazy_static! {
    static ref GLOBAL_LOGGER: Mutex<BarrierLogger> = Mutex::new(BarrierLogger::default());
}

/// Log a barrier event to the global logger
pub fn log_event(event: BarrierEvent) {
    GLOBAL_LOGGER.lock().log(event);
}

/// Configure global logger
pub fn configure_logger(config: BarrierLoggerConfig) {
    *GLOBAL_LOGGER.lock() = BarrierLogger::new(config);
}

/// Get global logger event count
pub fn get_event_count() -> usize {
    GLOBAL_LOGGER.lock().event_count()
}
