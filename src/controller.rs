//! Per-tick orchestration
//!
//! One call to [`Controller::tick`] is one pass of the poll loop:
//!
//! 1. connectivity flags are refreshed from the device
//! 2. both sensor lines are sampled through their debouncers
//! 3. the state machine runs: reset, start edge, finish edge, then timeout
//! 4. due consumers run in table order: display, report, battery
//! 5. the device gets one service step for its background work
//!
//! The finish edge is applied before the timeout check, so a finish seen in
//! the same tick the deadline expires still counts as a completion. Reset is
//! applied first and only when the tick began in `Completed`, so a run that
//! completes in this tick is always reported before it can be reset.

use heapless::Vec;
use log::{debug, info, warn};

use crate::config::{DEVICE_ID, Timing};
use crate::cue::Cue;
use crate::debounce::{Edge, SensorChannel};
use crate::device::{Connectivity, Device};
use crate::display::Frame;
use crate::error::{InitError, TransmissionError};
use crate::report::StatusSnapshot;
use crate::scheduler::{CONSUMER_COUNT, Consumer, Scheduler};
use crate::session::{GameState, Session, Transition};

/// At most reset, start, finish and timeout can fire in one tick
pub const MAX_TRANSITIONS_PER_TICK: usize = 4;

/// Raw inputs for one pass of the loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickInput {
    pub now_ms: u32,
    pub start_high: bool,
    pub finish_high: bool,
    pub reset_requested: bool,
}

/// What happened during one tick, in order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub transitions: Vec<Transition, MAX_TRANSITIONS_PER_TICK>,
    pub consumers: Vec<Consumer, CONSUMER_COUNT>,
}

pub struct Controller {
    session: Session,
    start_gate: SensorChannel,
    finish_gate: SensorChannel,
    scheduler: Scheduler,
    link: Connectivity,
    battery_percent: u8,
    failed_reports: u32,
}

impl Controller {
    pub fn new(timing: Timing, now_ms: u32) -> Self {
        Self {
            session: Session::with_timeout(timing.session_timeout_ms),
            start_gate: SensorChannel::with_window(timing.debounce_window_ms),
            finish_gate: SensorChannel::with_window(timing.debounce_window_ms),
            scheduler: Scheduler::new(&timing, now_ms),
            link: Connectivity::default(),
            battery_percent: 100,
            failed_reports: 0,
        }
    }

    /// Apply the peripheral bring-up outcome and play its cue
    pub fn bring_up<D: Device>(
        &mut self,
        outcome: Result<(), InitError>,
        battery_percent: u8,
        device: &mut D,
    ) -> Option<Transition> {
        self.battery_percent = battery_percent;
        let transition = self.session.bring_up(outcome)?;
        device.play(&Cue::for_transition(&transition));
        device.render(&self.frame());
        Some(transition)
    }

    pub fn tick<D: Device>(&mut self, input: TickInput, device: &mut D) -> TickSummary {
        let now = input.now_ms;
        let mut summary = TickSummary::default();

        self.link = device.connectivity();

        let start_edge = self.start_gate.sample(input.start_high, now);
        let finish_edge = self.finish_gate.sample(input.finish_high, now);

        if input.reset_requested {
            let transition = self.session.reset();
            self.apply(transition, now, device, &mut summary);
        }
        if start_edge == Edge::Rising {
            let transition = self.session.start_edge(now);
            self.apply(transition, now, device, &mut summary);
        }
        if finish_edge == Edge::Rising {
            let transition = self.session.finish_edge(now);
            self.apply(transition, now, device, &mut summary);
        }
        let transition = self.session.tick(now);
        self.apply(transition, now, device, &mut summary);

        for consumer in self.scheduler.take_due(now) {
            self.run(consumer, now, device);
            let _ = summary.consumers.push(consumer);
        }

        if let Some(outcome) = device.service(now) {
            self.record_delivery(outcome);
        }

        summary
    }

    fn apply<D: Device>(
        &mut self,
        transition: Option<Transition>,
        now: u32,
        device: &mut D,
        summary: &mut TickSummary,
    ) {
        let Some(transition) = transition else {
            return;
        };

        device.play(&Cue::for_transition(&transition));
        if let Transition::Completed { .. } = transition {
            self.scheduler.trigger(Consumer::Report, now);
        }
        let _ = summary.transitions.push(transition);
    }

    fn run<D: Device>(&mut self, consumer: Consumer, now: u32, device: &mut D) {
        match consumer {
            Consumer::Display => device.render(&self.frame()),
            Consumer::Report => {
                let snapshot = self.snapshot(now);
                match device.report(&snapshot) {
                    Ok(()) => debug!("Report: accepted"),
                    Err(e) => self.record_delivery(Err(e)),
                }
            }
            Consumer::Battery => {
                self.battery_percent = device.battery_percent().min(100);
                info!("Battery: {}%", self.battery_percent);
            }
        }
    }

    fn record_delivery(&mut self, outcome: Result<(), TransmissionError>) {
        match outcome {
            Ok(()) => debug!("Report: delivered"),
            Err(e) => {
                self.failed_reports = self.failed_reports.saturating_add(1);
                warn!("Report: {} ({} failed so far)", e, self.failed_reports);
            }
        }
    }

    pub fn frame(&self) -> Frame {
        Frame {
            state: self.session.state(),
            elapsed_ms: self.session.elapsed_ms(),
            completed: self.session.is_completed(),
            battery_percent: self.battery_percent,
            link: self.link,
        }
    }

    pub fn snapshot(&self, now_ms: u32) -> StatusSnapshot {
        StatusSnapshot {
            device_id: DEVICE_ID,
            alarm_active: self.session.is_alarm_active(),
            maze_completed: self.session.is_completed(),
            hall_sensor_value: self.finish_gate.raw_level(),
            battery_level: self.battery_percent,
            uptime_ms: now_ms,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn state(&self) -> GameState {
        self.session.state()
    }

    pub fn failed_reports(&self) -> u32 {
        self.failed_reports
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }
}
