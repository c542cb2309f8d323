//! Polling loop shared by every sensor
//!
//! ```text
//! loop {
//!     shutdown requested?  -> exit
//!     read source
//!       Some(payload)      -> timestamp, push to channel, wait poll interval
//!       None               -> wait poll interval
//!       Err(fault)         -> count, maybe warn, wait fault backoff
//! }
//! ```
//!
//! Waits go through [`ShutdownSignal::wait_timeout`], so a stop request is
//! observed within one wait. A read already in progress is never abandoned
//! half-way; the loop only exits between reads.

use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, info, warn};

use crate::channel::SampleSender;
use crate::constants::time::{DEFAULT_FAULT_BACKOFF_MS, FAULT_WARN_EVERY};
use crate::sample::{RawSample, SensorClass};
use crate::shutdown::ShutdownSignal;
use crate::time::{SystemTime, TimeSource};

use super::SensorSource;

/// Outcome of a single poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// A sample was pushed
    Sample,
    /// The source had nothing new
    Absent,
    /// The read failed
    Fault,
}

/// Live counters of one task
#[derive(Debug, Default)]
pub struct TaskStats {
    /// Reads attempted
    pub reads: AtomicU64,
    /// Samples pushed
    pub samples: AtomicU64,
    /// Reads that returned nothing
    pub absent: AtomicU64,
    /// Failed reads
    pub faults: AtomicU64,
}

impl TaskStats {
    /// Point-in-time copy
    pub fn summary(&self, sensor: &str, class: SensorClass) -> TaskSummary {
        TaskSummary {
            sensor: sensor.to_owned(),
            class,
            reads: self.reads.load(Ordering::Relaxed),
            samples: self.samples.load(Ordering::Relaxed),
            absent: self.absent.load(Ordering::Relaxed),
            faults: self.faults.load(Ordering::Relaxed),
        }
    }
}

/// Counters of a finished (or running) task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSummary {
    /// Source name
    pub sensor: String,
    /// Source class
    pub class: SensorClass,
    /// Reads attempted
    pub reads: u64,
    /// Samples pushed
    pub samples: u64,
    /// Reads that returned nothing
    pub absent: u64,
    /// Failed reads
    pub faults: u64,
}

/// One sensor, its channel, and the loop driving them
pub struct SensorTask<S> {
    source: S,
    sender: SampleSender,
    shutdown: ShutdownSignal,
    clock: Arc<dyn TimeSource>,
    poll_interval: Duration,
    fault_backoff: Duration,
    stats: Arc<TaskStats>,
    consecutive_faults: u64,
}

impl<S: SensorSource> SensorTask<S> {
    /// Task pushing samples of `source` into `sender`
    pub fn new(source: S, sender: SampleSender, shutdown: ShutdownSignal) -> Self {
        Self {
            source,
            sender,
            shutdown,
            clock: Arc::new(SystemTime),
            poll_interval: Duration::ZERO,
            fault_backoff: Duration::from_millis(DEFAULT_FAULT_BACKOFF_MS),
            stats: Arc::new(TaskStats::default()),
            consecutive_faults: 0,
        }
    }

    /// Clock used to stamp samples
    pub fn with_clock(mut self, clock: Arc<dyn TimeSource>) -> Self {
        self.clock = clock;
        self
    }

    /// Pause after every successful or empty read
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Pause after a failed read
    pub fn with_fault_backoff(mut self, backoff: Duration) -> Self {
        self.fault_backoff = backoff;
        self
    }

    /// Shared handle on the counters
    pub fn stats(&self) -> Arc<TaskStats> {
        Arc::clone(&self.stats)
    }

    /// Source name
    pub fn name(&self) -> &str {
        self.source.name()
    }

    /// Perform one read and push its sample, if any
    pub fn poll_once(&mut self) -> PollOutcome {
        self.stats.reads.fetch_add(1, Ordering::Relaxed);

        match self.source.read() {
            Ok(Some(payload)) => {
                self.recovered();
                let sample = RawSample::new(payload, self.clock.now());
                self.sender.push(sample);
                self.stats.samples.fetch_add(1, Ordering::Relaxed);
                PollOutcome::Sample
            }
            Ok(None) => {
                self.recovered();
                self.stats.absent.fetch_add(1, Ordering::Relaxed);
                PollOutcome::Absent
            }
            Err(error) => {
                self.consecutive_faults += 1;
                self.stats.faults.fetch_add(1, Ordering::Relaxed);
                if self.consecutive_faults == 1 || self.consecutive_faults % FAULT_WARN_EVERY == 0 {
                    warn!(
                        "{}: read failed ({} in a row): {}",
                        self.source.name(),
                        self.consecutive_faults,
                        error
                    );
                }
                PollOutcome::Fault
            }
        }
    }

    fn recovered(&mut self) {
        if self.consecutive_faults > 0 {
            info!(
                "{}: recovered after {} failed reads",
                self.source.name(),
                self.consecutive_faults
            );
            self.consecutive_faults = 0;
        }
    }

    /// Poll until shutdown, then hand the source back
    pub fn run(mut self) -> S {
        info!("{}: sensor task started", self.source.name());

        while !self.shutdown.is_triggered() {
            let pause = match self.poll_once() {
                PollOutcome::Fault => self.fault_backoff,
                PollOutcome::Sample | PollOutcome::Absent => self.poll_interval,
            };
            if pause.is_zero() {
                thread::yield_now();
            } else if self.shutdown.wait_timeout(pause) {
                break;
            }
        }

        let summary = self.stats.summary(self.source.name(), self.source.class());
        info!(
            "{}: sensor task stopped after {} reads ({} samples, {} faults)",
            summary.sensor, summary.reads, summary.samples, summary.faults
        );
        debug!("{}: {} reads returned nothing", summary.sensor, summary.absent);
        self.source
    }
}

impl<S: SensorSource + 'static> SensorTask<S> {
    /// Run the task on its own named thread
    pub fn spawn(self) -> io::Result<SensorHandle> {
        let name = self.source.name().to_owned();
        let class = self.source.class();
        let stats = self.stats();

        let thread_stats = Arc::clone(&stats);
        let thread_name = name.clone();
        let handle = thread::Builder::new()
            .name(format!("sensor-{name}"))
            .spawn(move || {
                let source = self.run();
                thread_stats.summary(&thread_name, source.class())
            })?;

        Ok(SensorHandle {
            name,
            class,
            stats,
            handle,
        })
    }
}

/// Type-erased task, so differently typed sources can share one list
pub trait SpawnTask: Send {
    /// Source name
    fn task_name(&self) -> &str;

    /// Start the task on its own thread
    fn spawn_boxed(self: Box<Self>) -> io::Result<SensorHandle>;
}

impl<S: SensorSource + 'static> SpawnTask for SensorTask<S> {
    fn task_name(&self) -> &str {
        self.name()
    }

    fn spawn_boxed(self: Box<Self>) -> io::Result<SensorHandle> {
        (*self).spawn()
    }
}

/// Running sensor thread
#[derive(Debug)]
pub struct SensorHandle {
    name: String,
    class: SensorClass,
    stats: Arc<TaskStats>,
    handle: JoinHandle<TaskSummary>,
}

impl SensorHandle {
    /// Source name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Source class
    pub fn class(&self) -> SensorClass {
        self.class
    }

    /// Counters so far
    pub fn summary(&self) -> TaskSummary {
        self.stats.summary(&self.name, self.class)
    }

    /// Whether the thread has exited
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the thread; `Err` carries the name of a task that panicked
    pub fn join(self) -> Result<TaskSummary, String> {
        self.handle.join().map_err(|_| self.name)
    }
}
