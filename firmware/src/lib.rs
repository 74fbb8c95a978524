//! ESP32 board support for the maze controller
//!
//! Implements [`maze_controller::Device`] on top of esp-hal GPIO/ADC and the
//! esp-wifi + smoltcp network stack.

#![no_std]

pub mod board;
pub mod http;
pub mod net;
pub mod wifi;

use esp_hal::time::Instant;

/// Monotonic milliseconds since boot (wraps after ~49 days)
pub fn uptime_ms() -> u32 {
    Instant::now().duration_since_epoch().as_millis() as u32
}

/// Current time for the smoltcp interface
pub fn smoltcp_now() -> smoltcp::time::Instant {
    smoltcp::time::Instant::from_millis(Instant::now().duration_since_epoch().as_millis() as i64)
}
