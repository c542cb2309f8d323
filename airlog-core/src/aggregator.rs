//! Aggregator: the single consumer of every channel
//!
//! ## Tick
//!
//! ```text
//! wait tick interval (wakes early on shutdown)
//!   ↓
//! try_pop() each channel down to its backlog   never blocks
//!   ↓                                         keeps the newest sample
//!   ↓
//! convert humidity samples first            their RH feeds air density
//!   ↓
//! convert the rest
//!   ↓
//! write one row (missing slots as placeholder)
//! ```
//!
//! A row is written every tick, even when no channel had data, so the log
//! doubles as a liveness trace. Logger failures are fatal and returned to
//! the caller; nothing else can stop the loop except shutdown.

use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info, trace, warn};

use crate::channel::{SampleReceiver, TryPop};
use crate::config::AggregatorConfig;
use crate::constants::sensors::FL808_COUNTS_PER_LITRE;
use crate::conversion::{convert_sample, ConversionContext};
use crate::errors::LoggerResult;
use crate::logger::Logger;
use crate::record::{LogRecord, Slot};
use crate::sample::{RawSample, SensorClass};
use crate::shutdown::ShutdownSignal;
use crate::time::{SystemTime, TimeSource};

/// Aggregator counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregatorStats {
    /// Ticks completed
    pub ticks: u64,
    /// Rows handed to the logger
    pub rows_written: u64,
    /// Samples converted into a record
    pub samples_converted: u64,
    /// Samples whose class did not match their channel's slot
    pub samples_rejected: u64,
    /// Older samples discarded because a newer one arrived in the same tick
    pub samples_superseded: u64,
}

/// Ticking consumer that owns the logger
pub struct Aggregator {
    logger: Logger,
    shutdown: ShutdownSignal,
    clock: Arc<dyn TimeSource>,
    tick_interval: Duration,
    default_humidity_pct: f64,
    counts_per_litre: f64,
    channels: Vec<(Slot, SampleReceiver)>,
    stats: AggregatorStats,
}

impl Aggregator {
    /// Aggregator writing to `logger` until `shutdown` triggers
    pub fn new(logger: Logger, shutdown: ShutdownSignal, config: &AggregatorConfig) -> Self {
        Self {
            logger,
            shutdown,
            clock: Arc::new(SystemTime),
            tick_interval: config.tick_interval(),
            default_humidity_pct: config.default_humidity_pct,
            counts_per_litre: FL808_COUNTS_PER_LITRE,
            channels: Vec::new(),
            stats: AggregatorStats::default(),
        }
    }

    /// Clock used to stamp rows
    pub fn with_clock(mut self, clock: Arc<dyn TimeSource>) -> Self {
        self.clock = clock;
        self
    }

    /// Flow meter pulse constant
    pub fn with_counts_per_litre(mut self, counts_per_litre: f64) -> Self {
        self.counts_per_litre = counts_per_litre;
        self
    }

    /// Consume `receiver` into `slot` from the next tick on
    pub fn register(&mut self, slot: Slot, receiver: SampleReceiver) {
        debug!("aggregator: channel registered for {slot}");
        self.channels.push((slot, receiver));
    }

    /// Slots with a registered channel, in registration order
    pub fn slots(&self) -> impl Iterator<Item = Slot> + '_ {
        self.channels.iter().map(|(slot, _)| *slot)
    }

    /// Counters so far
    pub fn stats(&self) -> AggregatorStats {
        self.stats
    }

    /// Output logger
    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    /// Take the newest sample of every channel and write one row
    ///
    /// Each channel is drained down to the backlog it had when the tick
    /// started, so a producer pushing faster than the pops cannot hold the
    /// tick.
    pub fn tick(&mut self) -> LoggerResult<LogRecord> {
        let mut record = LogRecord::new(self.clock.now());

        let mut pending: Vec<(Slot, RawSample)> = Vec::with_capacity(self.channels.len());
        for (slot, receiver) in &mut self.channels {
            if let Some((sample, superseded)) = newest(receiver) {
                trace!(
                    "aggregator: {} sample from {:.6} ({} older skipped)",
                    slot,
                    sample.captured_at(),
                    superseded
                );
                self.stats.samples_superseded += superseded;
                pending.push((*slot, sample));
            }
        }

        // Humidity first: this tick's RH feeds the airspeed density model
        pending.sort_by_key(|(_, sample)| sample.class() != SensorClass::Humidity);

        for (slot, sample) in pending {
            let ctx = ConversionContext {
                humidity_pct: record.humidity_pct().unwrap_or(self.default_humidity_pct),
                counts_per_litre: self.counts_per_litre,
            };
            let class = sample.class();
            if record.apply(slot, convert_sample(sample, &ctx)) {
                self.stats.samples_converted += 1;
            } else {
                self.stats.samples_rejected += 1;
                warn!("aggregator: dropped {class} sample delivered to {slot} channel");
            }
        }

        self.logger.write(&record)?;
        self.stats.rows_written += 1;
        self.stats.ticks += 1;
        debug!("{record}");
        Ok(record)
    }

    /// Tick until shutdown, then close the logger
    pub fn run(&mut self) -> LoggerResult<AggregatorStats> {
        self.run_until(None)
    }

    /// Tick until shutdown or until `duration` has elapsed
    pub fn run_for(&mut self, duration: Duration) -> LoggerResult<AggregatorStats> {
        self.run_until(Some(Instant::now() + duration))
    }

    fn run_until(&mut self, deadline: Option<Instant>) -> LoggerResult<AggregatorStats> {
        info!(
            "aggregator: started with {} channels, tick {:?}",
            self.channels.len(),
            self.tick_interval
        );

        let outcome = self.tick_loop(deadline);
        let closed = self.logger.close();

        match (&outcome, closed) {
            (Ok(()), Err(error)) => return Err(error),
            (Err(_), Err(error)) => warn!("aggregator: close after failure also failed: {error}"),
            _ => {}
        }
        outcome?;

        info!(
            "aggregator: stopped after {} ticks ({} samples)",
            self.stats.ticks, self.stats.samples_converted
        );
        Ok(self.stats)
    }

    fn tick_loop(&mut self, deadline: Option<Instant>) -> LoggerResult<()> {
        loop {
            if self.shutdown.is_triggered() {
                return Ok(());
            }

            let wait = match deadline {
                Some(deadline) => {
                    let left = deadline.saturating_duration_since(Instant::now());
                    if left.is_zero() {
                        return Ok(());
                    }
                    self.tick_interval.min(left)
                }
                None => self.tick_interval,
            };
            if self.shutdown.wait_timeout(wait) {
                return Ok(());
            }

            self.tick()?;
        }
    }
}

/// Newest sample among the current backlog, with the count of older ones
fn newest(receiver: &mut SampleReceiver) -> Option<(RawSample, u64)> {
    let backlog = receiver.len().max(1);
    let mut latest = None;
    let mut superseded = 0;

    for _ in 0..backlog {
        match receiver.try_pop() {
            TryPop::Data(sample) => {
                if latest.replace(sample).is_some() {
                    superseded += 1;
                }
            }
            TryPop::Empty => break,
        }
    }
    latest.map(|sample| (sample, superseded))
}

impl core::fmt::Debug for Aggregator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Aggregator")
            .field("logger", &self.logger)
            .field("tick_interval", &self.tick_interval)
            .field("slots", &self.slots().collect::<Vec<_>>())
            .field("stats", &self.stats)
            .finish()
    }
}
