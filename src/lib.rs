//! Timed maze game controller core
//!
//! Turns two noisy Hall sensor lines (start gate, finish gate) into clean
//! session transitions and fans the derived state out to the display,
//! status reporter and battery gauge at their own cadences.
//!
//! Everything here is hardware independent. The firmware crate implements
//! [`device::Device`] for the ESP32 board and calls [`Controller::tick`]
//! from its poll loop.

#![cfg_attr(not(test), no_std)]

pub mod battery;
pub mod clock;
pub mod config;
pub mod controller;
pub mod cue;
pub mod debounce;
pub mod device;
pub mod display;
pub mod error;
pub mod report;
pub mod scheduler;
pub mod session;
pub mod upload;

pub use config::Timing;
pub use controller::{Controller, TickInput, TickSummary};
pub use debounce::{Edge, SensorChannel};
pub use device::{Connectivity, Device};
pub use error::{InitError, TransmissionError};
pub use report::StatusSnapshot;
pub use scheduler::{Consumer, Scheduler};
pub use session::{GameState, Session, Transition};
