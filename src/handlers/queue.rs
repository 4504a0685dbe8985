//! Queue handler: hands records to a background worker thread
//!
//! The calling thread only clones the record into a channel; a dedicated
//! worker drains the channel in batches and forwards each record to the
//! target handlers. A bounded queue that fills up drops DEBUG, INFO and
//! WARNING records (counted in [`LoggerMetrics`]) but makes ERROR and
//! CRITICAL records wait for space.

use crate::core::{
    handler::{dispatch, flush_isolated},
    Handler, LogLevel, LogRecord, LoggerError, LoggerMetrics, Result, SharedHandler,
};
use crossbeam_channel::{bounded, unbounded, Receiver, SendTimeoutError, Sender, TrySendError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// How long flush and close wait for the worker
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

const BATCH_SIZE: usize = 50;

enum Message {
    Record(Box<LogRecord>),
    Flush(Sender<()>),
}

pub struct QueueHandler {
    name: String,
    level: Option<LogLevel>,
    capacity: Option<usize>,
    sender: Option<Sender<Message>>,
    worker: Option<JoinHandle<()>>,
    targets: Vec<SharedHandler>,
    metrics: Arc<LoggerMetrics>,
}

impl QueueHandler {
    /// Start a worker forwarding to `targets`. A `maxsize` of zero means an
    /// unbounded queue.
    ///
    /// # Errors
    ///
    /// Fails if the worker thread cannot be spawned.
    pub fn spawn(targets: Vec<SharedHandler>, maxsize: usize) -> Result<Self> {
        let (sender, receiver) = if maxsize == 0 {
            unbounded()
        } else {
            bounded(maxsize)
        };
        let metrics = Arc::new(LoggerMetrics::new());

        let worker_targets = targets.clone();
        let worker_metrics = Arc::clone(&metrics);
        let worker = thread::Builder::new()
            .name("dicomjson-log-queue".to_string())
            .spawn(move || run_worker(receiver, worker_targets, worker_metrics))
            .map_err(|e| {
                LoggerError::io_operation("spawn queue worker", "Failed to start thread", e)
            })?;

        Ok(Self {
            name: "queue".to_string(),
            level: None,
            capacity: (maxsize > 0).then_some(maxsize),
            sender: Some(sender),
            worker: Some(worker),
            targets,
            metrics,
        })
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn with_level(mut self, level: Option<LogLevel>) -> Self {
        self.level = level;
        self
    }

    /// Queue bound; `None` when unbounded
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    pub fn targets(&self) -> &[SharedHandler] {
        &self.targets
    }

    /// Drop, overflow and target-failure counters for this queue
    pub fn metrics(&self) -> &LoggerMetrics {
        &self.metrics
    }

    fn alert_and_drop(&self) {
        let dropped_count = self.metrics.record_dropped();

        if dropped_count == 0 || (dropped_count + 1).is_multiple_of(1000) {
            eprintln!(
                "[LOGGER WARNING] Queue '{}' full, {} records dropped. \
                 Consider increasing maxsize.",
                self.name,
                dropped_count + 1
            );
        }
    }

    /// Stop accepting records and wait up to `timeout` for the worker to
    /// drain. Returns `false` if the worker did not finish in time.
    pub fn shutdown(&mut self, timeout: Duration) -> bool {
        drop(self.sender.take());

        let Some(handle) = self.worker.take() else {
            return true;
        };

        let start = Instant::now();
        loop {
            if handle.is_finished() {
                if let Err(e) = handle.join() {
                    eprintln!("[LOGGER ERROR] Queue worker panicked during shutdown: {:?}", e);
                    return false;
                }
                return true;
            }
            if start.elapsed() >= timeout {
                eprintln!(
                    "[LOGGER WARNING] Queue worker did not finish within {:?}. \
                     Some records may be lost.",
                    timeout
                );
                return false;
            }
            thread::sleep(Duration::from_millis(10));
        }
    }
}

fn run_worker(receiver: Receiver<Message>, targets: Vec<SharedHandler>, metrics: Arc<LoggerMetrics>) {
    let mut batch = Vec::with_capacity(BATCH_SIZE);

    // recv fails only once every sender is gone and the channel is empty
    while let Ok(first) = receiver.recv() {
        batch.push(first);
        while batch.len() < BATCH_SIZE {
            match receiver.try_recv() {
                Ok(message) => batch.push(message),
                Err(_) => break,
            }
        }

        for message in batch.drain(..) {
            match message {
                Message::Record(record) => {
                    let mut wrote = false;
                    let mut has_error = false;
                    for target in &targets {
                        match dispatch(target, &record, &metrics) {
                            Some(true) => wrote = true,
                            Some(false) => has_error = true,
                            None => {}
                        }
                    }
                    if wrote && !has_error {
                        metrics.record_written();
                    }
                }
                Message::Flush(ack) => {
                    flush_targets(&targets);
                    let _ = ack.send(());
                }
            }
        }
    }

    flush_targets(&targets);
}

fn flush_targets(targets: &[SharedHandler]) {
    for target in targets {
        if let Err(e) = flush_isolated(target) {
            eprintln!("[LOGGER ERROR] Failed to flush queue target: {}", e);
        }
    }
}

impl Handler for QueueHandler {
    fn name(&self) -> &str {
        &self.name
    }

    fn level(&self) -> Option<LogLevel> {
        self.level
    }

    fn emit(&mut self, record: &LogRecord) -> Result<()> {
        let sender = self.sender.as_ref().ok_or(LoggerError::ChannelSendError)?;

        match sender.try_send(Message::Record(Box::new(record.clone()))) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(message)) => {
                self.metrics.record_queue_full();
                if record.level >= LogLevel::Error {
                    self.metrics.record_waited_for_space();
                    sender.send(message).map_err(|_| LoggerError::ChannelSendError)
                } else {
                    self.alert_and_drop();
                    Ok(())
                }
            }
            Err(TrySendError::Disconnected(_)) => Err(LoggerError::ChannelSendError),
        }
    }

    /// Wait until every record queued before this call reached the targets
    fn flush(&mut self) -> Result<()> {
        let Some(ref sender) = self.sender else {
            return Ok(());
        };

        let (ack_sender, ack_receiver) = bounded(1);
        match sender.send_timeout(Message::Flush(ack_sender), DEFAULT_SHUTDOWN_TIMEOUT) {
            Ok(()) => {}
            Err(SendTimeoutError::Timeout(_)) => {
                return Err(LoggerError::other("Timed out queueing flush request"));
            }
            Err(SendTimeoutError::Disconnected(_)) => return Err(LoggerError::ChannelSendError),
        }

        ack_receiver
            .recv_timeout(DEFAULT_SHUTDOWN_TIMEOUT)
            .map_err(|_| LoggerError::other("Timed out waiting for queue worker to flush"))
    }

    fn close(&mut self) -> Result<()> {
        if self.shutdown(DEFAULT_SHUTDOWN_TIMEOUT) {
            Ok(())
        } else {
            Err(LoggerError::other(format!(
                "Queue '{}' did not drain before shutdown",
                self.name
            )))
        }
    }
}

impl Drop for QueueHandler {
    fn drop(&mut self) {
        self.shutdown(DEFAULT_SHUTDOWN_TIMEOUT);

        let dropped = self.metrics.snapshot().dropped;
        if dropped > 0 {
            eprintln!(
                "[LOGGER WARNING] Queue '{}' dropped {} records during its lifetime.",
                self.name, dropped
            );
        }
    }
}
