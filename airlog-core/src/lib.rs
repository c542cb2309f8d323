//! Multi-sensor acquisition and logging for airlog
//!
//! Polls DS18B20 probes, SHT30 humidity sensors, an MS4525DO airspeed
//! sensor and an FL808 flow meter on independent threads, converts their
//! raw words into physical units, and appends one correlated CSV row per
//! aggregator tick.
//!
//! Key constraints:
//! - One thread per sensor, each owning its bus handle exclusively
//! - Channel hand-off never blocks either side
//! - Every row is flushed before the next tick
//!
//! ```no_run
//! use airlog_core::{PipelineBuilder, PipelineConfig, ShutdownSignal};
//! use airlog_core::hardware::{Script, SimulatedSht30};
//!
//! let shutdown = ShutdownSignal::new();
//! let pipeline = PipelineBuilder::new(PipelineConfig::default())
//!     .with_shutdown(shutdown.clone())
//!     .with_w1_sysfs()
//!     .with_sht30_primary(SimulatedSht30::new(0x44, Script::constant((0x6666, 0x8000))))
//!     .build()?;
//!
//! let running = pipeline.start()?;
//! // ... later, e.g. from a signal handler
//! shutdown.trigger();
//! let report = running.wait()?;
//! # Ok::<(), airlog_core::PipelineError>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod aggregator;
pub mod channel;
pub mod config;
pub mod constants;
pub mod conversion;
pub mod errors;
pub mod hardware;
pub mod logger;
pub mod pipeline;
pub mod reading;
pub mod record;
pub mod sample;
pub mod sensors;
pub mod shutdown;
pub mod time;

// Public API
pub use aggregator::{Aggregator, AggregatorStats};
pub use channel::{channel, CapacityPolicy, SampleReceiver, SampleSender, TryPop};
pub use config::PipelineConfig;
pub use conversion::{convert_humidity_temp, convert_pressure_airspeed, edges_to_flow_rate};
pub use errors::{ConfigError, HardwareError, LoggerError, PipelineError};
pub use logger::{LogSink, Logger};
pub use pipeline::{Pipeline, PipelineBuilder, PipelineReport, RunningPipeline};
pub use reading::PhysicalReading;
pub use record::{LogRecord, Slot};
pub use sample::{RawPayload, RawSample, SensorClass};
pub use sensors::{SensorSource, SensorTask};
pub use shutdown::ShutdownSignal;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
