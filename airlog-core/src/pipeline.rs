//! Pipeline wiring: channels, sensor threads, aggregator
//!
//! ## Overview
//!
//! ```text
//! PipelineBuilder ──build()──→ Pipeline ──start()──→ RunningPipeline
//!   with_* per sensor             │                      │
//!   (one channel each)            └──run()/run_for()     └──stop()/wait()
//! ```
//!
//! Every `with_*` call takes ownership of one collaborator handle and
//! creates one channel, so two tasks can never share a bus. The builder
//! reads per-sensor settings (addresses, windows, poll intervals) from the
//! [`PipelineConfig`] it was created with.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use airlog_core::config::PipelineConfig;
//! use airlog_core::hardware::{Script, SimulatedFlowMeter};
//! use airlog_core::pipeline::PipelineBuilder;
//! use std::time::Duration;
//!
//! let pipeline = PipelineBuilder::new(PipelineConfig::default())
//!     .with_fl808(SimulatedFlowMeter::new(Script::constant(668)))
//!     .build()?;
//! let report = pipeline.run_for(Duration::from_secs(5))?;
//! println!("{} rows", report.aggregator.rows_written);
//! # Ok::<(), airlog_core::errors::PipelineError>(())
//! ```
//!
//! ## Shutdown
//!
//! One [`ShutdownSignal`] is shared by every thread. Triggering it (from a
//! signal handler, a supervisor, or [`RunningPipeline::stop`]) makes each
//! sensor task exit after its current read and the aggregator close the
//! log. When the aggregator ends for any reason it triggers the signal
//! itself, so sensor threads never outlive the log.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, error, info};

use crate::aggregator::{Aggregator, AggregatorStats};
use crate::channel::{channel, SampleReceiver};
use crate::config::PipelineConfig;
use crate::errors::{LoggerResult, PipelineError, PipelineResult};
use crate::hardware::{GpioEdgeWatcher, I2cBus, OneWireBus, W1SysfsBus};
use crate::logger::Logger;
use crate::record::Slot;
use crate::sensors::{
    Ds18b20Source, Fl808Source, Ms4525Source, SensorHandle, SensorSource, SensorTask, Sht30Source,
    SpawnTask, TaskSummary,
};
use crate::shutdown::ShutdownSignal;
use crate::time::{SystemTime, TimeSource};

/// Counters of a finished pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineReport {
    /// Aggregator counters
    pub aggregator: AggregatorStats,
    /// One entry per sensor task
    pub sensors: Vec<TaskSummary>,
}

/// Collects sensors and their channels
pub struct PipelineBuilder {
    config: PipelineConfig,
    shutdown: ShutdownSignal,
    clock: Arc<dyn TimeSource>,
    tasks: Vec<Box<dyn SpawnTask>>,
    receivers: Vec<(Slot, SampleReceiver)>,
    logger: Option<Logger>,
}

impl PipelineBuilder {
    /// Builder using `config` for every sensor and the logger
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            shutdown: ShutdownSignal::new(),
            clock: Arc::new(SystemTime),
            tasks: Vec::new(),
            receivers: Vec::new(),
            logger: None,
        }
    }

    /// Share an existing shutdown signal (e.g. one wired to SIGINT)
    pub fn with_shutdown(mut self, shutdown: ShutdownSignal) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Log through `logger` instead of creating a file from the config
    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Clock for sample and row timestamps, applied to sensors added after
    pub fn with_clock(mut self, clock: Arc<dyn TimeSource>) -> Self {
        self.clock = clock;
        self
    }

    /// Add any source feeding `slot`, polled every `poll_interval`
    ///
    /// Unlike the per-sensor methods this ignores the `enabled` flags.
    pub fn with_source<S: SensorSource + 'static>(
        mut self,
        slot: Slot,
        source: S,
        poll_interval: Duration,
    ) -> Self {
        let (sender, receiver) = channel(self.config.channel.policy);
        let task = SensorTask::new(source, sender, self.shutdown.clone())
            .with_clock(Arc::clone(&self.clock))
            .with_poll_interval(poll_interval)
            .with_fault_backoff(self.config.fault_backoff());

        self.tasks.push(Box::new(task));
        self.receivers.push((slot, receiver));
        self
    }

    fn skip(self, sensor: &str) -> Self {
        debug!("{sensor} disabled in config, not started");
        self
    }

    /// DS18B20 probes on `bus`
    pub fn with_ds18b20<B: OneWireBus + 'static>(self, bus: B) -> Self {
        if !self.config.ds18b20.enabled {
            return self.skip("ds18b20");
        }
        let poll = Duration::from_millis(self.config.ds18b20.poll_interval_ms);
        self.with_source(Slot::OneWire, Ds18b20Source::new(bus), poll)
    }

    /// DS18B20 probes on the kernel one-wire bus at the configured directory
    pub fn with_w1_sysfs(self) -> Self {
        let bus = W1SysfsBus::new(self.config.ds18b20.devices_dir.clone());
        self.with_ds18b20(bus)
    }

    /// Primary SHT30 on `bus`
    pub fn with_sht30_primary<B: I2cBus + 'static>(self, bus: B) -> Self {
        self.with_sht30(Slot::HumidityPrimary, bus)
    }

    /// Secondary SHT30 on `bus`
    pub fn with_sht30_secondary<B: I2cBus + 'static>(self, bus: B) -> Self {
        self.with_sht30(Slot::HumiditySecondary, bus)
    }

    fn with_sht30<B: I2cBus + 'static>(self, slot: Slot, bus: B) -> Self {
        let cfg = match slot {
            Slot::HumiditySecondary => &self.config.sht30_secondary,
            _ => &self.config.sht30_primary,
        };
        if !cfg.enabled {
            return self.skip(slot.as_str());
        }
        let source = Sht30Source::new(bus, cfg.address)
            .with_name(format!("sht30@i2c-{}:0x{:02x}", cfg.i2c_bus, cfg.address))
            .with_crc_check(cfg.verify_crc)
            .with_measurement_wait(Duration::from_millis(cfg.measurement_wait_ms));
        let poll = Duration::from_millis(cfg.poll_interval_ms);
        self.with_source(slot, source, poll)
    }

    /// MS4525DO on `bus`
    pub fn with_ms4525<B: I2cBus + 'static>(self, bus: B) -> Self {
        if !self.config.ms4525.enabled {
            return self.skip("ms4525");
        }
        let cfg = &self.config.ms4525;
        let source = Ms4525Source::new(bus, cfg.address)
            .with_name(format!("ms4525@i2c-{}:0x{:02x}", cfg.i2c_bus, cfg.address));
        let poll = Duration::from_millis(cfg.poll_interval_ms);
        self.with_source(Slot::Pressure, source, poll)
    }

    /// FL808 on `watcher`; the counting window paces the task
    pub fn with_fl808<G: GpioEdgeWatcher + 'static>(self, watcher: G) -> Self {
        if !self.config.fl808.enabled {
            return self.skip("fl808");
        }
        let source = Fl808Source::new(watcher).with_window(self.config.fl808.window());
        self.with_source(Slot::Flow, source, Duration::ZERO)
    }

    /// Sensors added so far
    pub fn task_names(&self) -> Vec<&str> {
        self.tasks.iter().map(|task| task.task_name()).collect()
    }

    /// Validate the configuration and open the log file
    pub fn build(self) -> PipelineResult<Pipeline> {
        self.config.validate()?;

        let logger = match self.logger {
            Some(logger) => logger,
            None => Logger::create(&self.config.logger)?,
        };
        let mut aggregator = Aggregator::new(logger, self.shutdown.clone(), &self.config.aggregator)
            .with_clock(Arc::clone(&self.clock))
            .with_counts_per_litre(self.config.fl808.counts_per_litre);
        for (slot, receiver) in self.receivers {
            aggregator.register(slot, receiver);
        }

        Ok(Pipeline {
            aggregator,
            tasks: self.tasks,
            shutdown: self.shutdown,
        })
    }
}

/// Fully wired pipeline, not yet running
pub struct Pipeline {
    aggregator: Aggregator,
    tasks: Vec<Box<dyn SpawnTask>>,
    shutdown: ShutdownSignal,
}

impl Pipeline {
    /// Signal that stops every thread of this pipeline
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    /// Output logger
    pub fn logger(&self) -> &Logger {
        self.aggregator.logger()
    }

    /// Spawn the sensor threads and the aggregator thread
    pub fn start(self) -> PipelineResult<RunningPipeline> {
        let Self { mut aggregator, tasks, shutdown } = self;
        let sensors = spawn_all(tasks, &shutdown)?;

        let agg_shutdown = shutdown.clone();
        let spawned = thread::Builder::new()
            .name("aggregator".to_owned())
            .spawn(move || {
                let outcome = aggregator.run();
                agg_shutdown.trigger();
                outcome
            });
        let aggregator = match spawned {
            Ok(handle) => handle,
            Err(error) => {
                shutdown.trigger();
                join_sensors(sensors)?;
                return Err(PipelineError::Spawn(error));
            }
        };

        info!("pipeline started with {} sensors", sensors.len());
        Ok(RunningPipeline {
            shutdown,
            sensors,
            aggregator,
        })
    }

    /// Run on the calling thread until shutdown
    pub fn run(self) -> PipelineResult<PipelineReport> {
        self.run_inner(None)
    }

    /// Run on the calling thread until shutdown or until `duration` elapses
    pub fn run_for(self, duration: Duration) -> PipelineResult<PipelineReport> {
        self.run_inner(Some(duration))
    }

    fn run_inner(self, duration: Option<Duration>) -> PipelineResult<PipelineReport> {
        let Self { mut aggregator, tasks, shutdown } = self;
        let sensors = spawn_all(tasks, &shutdown)?;

        let outcome = match duration {
            Some(duration) => aggregator.run_for(duration),
            None => aggregator.run(),
        };
        shutdown.trigger();
        finish(outcome, sensors)
    }
}

/// Pipeline whose threads are running
#[derive(Debug)]
pub struct RunningPipeline {
    shutdown: ShutdownSignal,
    sensors: Vec<SensorHandle>,
    aggregator: JoinHandle<LoggerResult<AggregatorStats>>,
}

impl RunningPipeline {
    /// Signal that stops every thread of this pipeline
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    /// Live counters of every sensor task
    pub fn sensor_summaries(&self) -> Vec<TaskSummary> {
        self.sensors.iter().map(SensorHandle::summary).collect()
    }

    /// Whether the aggregator has exited (shutdown or logger failure)
    pub fn is_finished(&self) -> bool {
        self.aggregator.is_finished()
    }

    /// Request shutdown and wait for every thread
    pub fn stop(self) -> PipelineResult<PipelineReport> {
        self.shutdown.trigger();
        self.wait()
    }

    /// Wait for the pipeline to stop on its own or through its signal
    pub fn wait(self) -> PipelineResult<PipelineReport> {
        let outcome = self.aggregator.join();
        self.shutdown.trigger();

        match outcome {
            Ok(outcome) => finish(outcome, self.sensors),
            Err(_) => {
                join_sensors(self.sensors)?;
                Err(PipelineError::TaskPanicked {
                    sensor: "aggregator".to_owned(),
                })
            }
        }
    }
}

fn spawn_all(
    tasks: Vec<Box<dyn SpawnTask>>,
    shutdown: &ShutdownSignal,
) -> PipelineResult<Vec<SensorHandle>> {
    let mut handles = Vec::with_capacity(tasks.len());
    for task in tasks {
        match task.spawn_boxed() {
            Ok(handle) => handles.push(handle),
            Err(error) => {
                shutdown.trigger();
                join_sensors(handles)?;
                return Err(PipelineError::Spawn(error));
            }
        }
    }
    Ok(handles)
}

fn join_sensors(sensors: Vec<SensorHandle>) -> PipelineResult<Vec<TaskSummary>> {
    let mut summaries = Vec::with_capacity(sensors.len());
    let mut panicked = None;
    for handle in sensors {
        match handle.join() {
            Ok(summary) => summaries.push(summary),
            Err(sensor) => {
                error!("sensor task `{sensor}` panicked");
                panicked.get_or_insert(sensor);
            }
        }
    }
    match panicked {
        Some(sensor) => Err(PipelineError::TaskPanicked { sensor }),
        None => Ok(summaries),
    }
}

fn finish(
    outcome: LoggerResult<AggregatorStats>,
    sensors: Vec<SensorHandle>,
) -> PipelineResult<PipelineReport> {
    let joined = join_sensors(sensors);
    let aggregator = outcome.map_err(|e| {
        error!("pipeline stopped: {e}");
        PipelineError::Logger(e)
    })?;
    let sensors = joined?;

    info!("pipeline stopped after {} rows", aggregator.rows_written);
    Ok(PipelineReport { aggregator, sensors })
}
