//! Health counters of the logging system
//!
//! A [`Manager`](super::Manager) keeps one [`LoggerMetrics`] shared by all of
//! its loggers; every [`QueueHandler`](crate::handlers::QueueHandler) keeps
//! its own for overflow accounting.

use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic counters updated on the logging hot path
///
/// # Example
///
/// ```
/// use dicomjson_logging::LoggerMetrics;
///
/// let metrics = LoggerMetrics::new();
/// metrics.record_written();
/// metrics.record_handler_error();
///
/// let snapshot = metrics.snapshot();
/// assert_eq!(snapshot.written, 1);
/// assert_eq!(snapshot.handler_errors, 1);
/// ```
#[derive(Debug, Default)]
pub struct LoggerMetrics {
    written: AtomicU64,
    handler_errors: AtomicU64,
    dropped: AtomicU64,
    queue_full: AtomicU64,
    waited_for_space: AtomicU64,
    last_resort: AtomicU64,
}

/// Point-in-time copy of [`LoggerMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Records every accepting handler wrote without error
    pub written: u64,
    /// `emit` calls that failed or panicked
    pub handler_errors: u64,
    /// Records a full queue discarded
    pub dropped: u64,
    /// Times a bounded queue was found full
    pub queue_full: u64,
    /// ERROR/CRITICAL records that waited for queue space
    pub waited_for_space: u64,
    /// Records sent to stderr because no handler existed
    pub last_resort: u64,
}

impl MetricsSnapshot {
    /// Share of records lost to queue overflow, in percent
    pub fn drop_rate(&self) -> f64 {
        let seen = self.written + self.dropped;
        if seen == 0 {
            return 0.0;
        }
        self.dropped as f64 * 100.0 / seen as f64
    }
}

fn bump(counter: &AtomicU64) -> u64 {
    counter.fetch_add(1, Ordering::Relaxed)
}

impl LoggerMetrics {
    pub const fn new() -> Self {
        Self {
            written: AtomicU64::new(0),
            handler_errors: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            queue_full: AtomicU64::new(0),
            waited_for_space: AtomicU64::new(0),
            last_resort: AtomicU64::new(0),
        }
    }

    // Each `record_*` returns the count before the increment.

    #[inline]
    pub fn record_written(&self) -> u64 {
        bump(&self.written)
    }

    #[inline]
    pub fn record_handler_error(&self) -> u64 {
        bump(&self.handler_errors)
    }

    #[inline]
    pub fn record_dropped(&self) -> u64 {
        bump(&self.dropped)
    }

    #[inline]
    pub fn record_queue_full(&self) -> u64 {
        bump(&self.queue_full)
    }

    #[inline]
    pub fn record_waited_for_space(&self) -> u64 {
        bump(&self.waited_for_space)
    }

    #[inline]
    pub fn record_last_resort(&self) -> u64 {
        bump(&self.last_resort)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            written: self.written.load(Ordering::Relaxed),
            handler_errors: self.handler_errors.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            queue_full: self.queue_full.load(Ordering::Relaxed),
            waited_for_space: self.waited_for_space.load(Ordering::Relaxed),
            last_resort: self.last_resort.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        for counter in [
            &self.written,
            &self.handler_errors,
            &self.dropped,
            &self.queue_full,
            &self.waited_for_space,
            &self.last_resort,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}
