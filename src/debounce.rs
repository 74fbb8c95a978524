//! Sensor line debouncing

use crate::config::DEBOUNCE_WINDOW_MS;
use crate::error::InitError;

/// Result of sampling a sensor channel once
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    /// Stable level went LOW -> HIGH
    Rising,
    /// Stable level went HIGH -> LOW
    Falling,
    NoChange,
}

/// Debounce state for one digital sensor line
///
/// Active HIGH: a HIGH level means the ball is present at the gate.
#[derive(Debug, Clone, Copy)]
pub struct SensorChannel {
    /// Current raw level being observed
    raw_level: bool,
    /// Last level accepted as genuine
    stable_level: bool,
    /// Timestamp (ms) when the current raw level first appeared
    last_change_ms: u32,
    window_ms: u32,
}

impl SensorChannel {
    pub const fn new() -> Self {
        Self::with_window(DEBOUNCE_WINDOW_MS)
    }

    pub const fn with_window(window_ms: u32) -> Self {
        Self {
            raw_level: false,
            stable_level: false,
            last_change_ms: 0,
            window_ms,
        }
    }

    /// Feed one raw reading. Returns at most one edge per call.
    pub fn sample(&mut self, is_high: bool, now_ms: u32) -> Edge {
        if is_high != self.raw_level {
            // Level changed - restart the dwell timer
            self.raw_level = is_high;
            self.last_change_ms = now_ms;
            return Edge::NoChange;
        }

        if is_high == self.stable_level {
            return Edge::NoChange;
        }

        let held = now_ms.wrapping_sub(self.last_change_ms);
        if held < self.window_ms {
            return Edge::NoChange;
        }

        self.stable_level = is_high;
        if is_high { Edge::Rising } else { Edge::Falling }
    }

    pub fn stable_level(&self) -> bool {
        self.stable_level
    }

    /// Last unfiltered reading
    pub fn raw_level(&self) -> bool {
        self.raw_level
    }
}

impl Default for SensorChannel {
    fn default() -> Self {
        Self::new()
    }
}

/// Boot check over both gates after they have been sampled for a window
///
/// The ball can only sit at one gate, so both lines settled HIGH means a
/// shorted or stuck sensor. Neither gate could then produce a rising edge.
pub fn self_check(start: &SensorChannel, finish: &SensorChannel) -> Result<(), InitError> {
    if start.stable_level() && finish.stable_level() {
        return Err(InitError::Sensors);
    }
    Ok(())
}
