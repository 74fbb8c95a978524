//! Fixed timing and identity constants

/// Minimum time a sensor line must hold a new level (milliseconds)
pub const DEBOUNCE_WINDOW_MS: u32 = 50;

/// An attempt that has not finished after this long is abandoned (5 minutes)
pub const SESSION_TIMEOUT_MS: u32 = 300_000;

/// Display refresh period (10 FPS)
pub const DISPLAY_REFRESH_MS: u32 = 100;

/// Status report period
pub const REPORT_INTERVAL_MS: u32 = 5_000;

/// Battery sampling period
pub const BATTERY_CHECK_MS: u32 = 60_000;

/// Poll loop delay between ticks (milliseconds)
pub const POLL_INTERVAL_MS: u32 = 10;

/// Hardware identifier sent with every status report
pub const DEVICE_ID: &str = "ESP32_MAZE_001";

/// Timing parameters for one controller instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub debounce_window_ms: u32,
    pub session_timeout_ms: u32,
    pub display_refresh_ms: u32,
    pub report_interval_ms: u32,
    pub battery_check_ms: u32,
}

impl Timing {
    pub const fn new() -> Self {
        Self {
            debounce_window_ms: DEBOUNCE_WINDOW_MS,
            session_timeout_ms: SESSION_TIMEOUT_MS,
            display_refresh_ms: DISPLAY_REFRESH_MS,
            report_interval_ms: REPORT_INTERVAL_MS,
            battery_check_ms: BATTERY_CHECK_MS,
        }
    }
}

impl Default for Timing {
    fn default() -> Self {
        Self::new()
    }
}
