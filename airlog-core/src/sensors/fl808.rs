//! FL808 hall-effect flow meter

use std::time::Duration;

use crate::constants::time::DEFAULT_FLOW_WINDOW_S;
use crate::errors::HardwareResult;
use crate::hardware::GpioEdgeWatcher;
use crate::sample::{RawPayload, SensorClass};

use super::SensorSource;

/// Flow meter counted over fixed windows
///
/// Each read blocks for one counting window, so the window also paces the
/// task; a zero-edge window is still a sample (no flow).
#[derive(Debug)]
pub struct Fl808Source<G> {
    watcher: G,
    window: Duration,
    name: String,
}

impl<G: GpioEdgeWatcher> Fl808Source<G> {
    /// Meter on `watcher`, counted over the default window
    pub fn new(watcher: G) -> Self {
        Self {
            watcher,
            window: Duration::from_secs_f64(DEFAULT_FLOW_WINDOW_S),
            name: "fl808@gpio".to_owned(),
        }
    }

    /// Counting window
    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// Override the diagnostic name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Counting window in use
    pub fn window(&self) -> Duration {
        self.window
    }
}

impl<G: GpioEdgeWatcher> SensorSource for Fl808Source<G> {
    fn name(&self) -> &str {
        &self.name
    }

    fn class(&self) -> SensorClass {
        SensorClass::Flow
    }

    fn read(&mut self) -> HardwareResult<Option<RawPayload>> {
        let count = self.watcher.count_rising_edges(self.window)?;
        Ok(Some(RawPayload::EdgeCount {
            count,
            window_s: self.window.as_secs_f64(),
        }))
    }
}
