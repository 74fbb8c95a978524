//! Boundary between the controller and the board
//!
//! Every call is made synchronously from the poll loop and must return well
//! within the debounce window. A call that blocks longer delays sensor
//! sampling, so a gate pulse can be missed or timestamped late. Work that
//! takes longer (a network exchange, a tone) is started by one call and
//! carried forward by [`Device::service`], one bounded step per tick.

use crate::cue::Cue;
use crate::display::Frame;
use crate::error::TransmissionError;
use crate::report::StatusSnapshot;

/// Link flags, refreshed once per tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Connectivity {
    pub wifi: bool,
    pub ble: bool,
}

pub trait Device {
    /// Current link state
    fn connectivity(&mut self) -> Connectivity;

    /// Show the given frame
    fn render(&mut self, frame: &Frame);

    /// Hand a status snapshot over for delivery. `Ok` means accepted; an
    /// exchange that finishes later reports its outcome through `service`.
    fn report(&mut self, snapshot: &StatusSnapshot) -> Result<(), TransmissionError>;

    /// Sample the battery, 0-100 %
    fn battery_percent(&mut self) -> u8;

    /// Start the feedback for a transition. Must not wait for the tone.
    fn play(&mut self, cue: &Cue);

    /// Advance background work by one non-blocking step. Returns the outcome
    /// of a report delivery that finished during this step.
    fn service(&mut self, _now_ms: u32) -> Option<Result<(), TransmissionError>> {
        None
    }
}
