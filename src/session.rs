//! Session state machine
//!
//! Owns the single game session. Every method takes the current monotonic
//! time and returns the transition it caused, if any. Triggers that have no
//! outgoing edge from the current state are ignored.
//!
//! ```text
//!   Idle ──bring-up ok──► Ready ──start──► Playing ──finish──► Completed
//!    │                     ▲                  │                    │
//!    │ bring-up failed     │                  │ timeout            │
//!    ▼                     │                  ▼                    │
//!   Error                  │                 Idle                  │
//!                          └────────────── reset ──────────────────┘
//! ```

use log::{debug, error, info};

use crate::config::SESSION_TIMEOUT_MS;
use crate::error::InitError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameState {
    Idle,
    Ready,
    Playing,
    Completed,
    Error,
}

impl GameState {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameState::Idle => "IDLE",
            GameState::Ready => "READY",
            GameState::Playing => "PLAYING",
            GameState::Completed => "COMPLETED",
            GameState::Error => "ERROR",
        }
    }
}

/// A state change, reported at the instant it happens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Idle -> Ready after peripheral bring-up
    Armed,
    /// Idle -> Error after peripheral bring-up failed
    Faulted(InitError),
    /// Ready -> Playing
    Started,
    /// Playing -> Completed with the frozen run time
    Completed { elapsed_ms: u32 },
    /// Playing -> Idle, deadline passed without a finish
    TimedOut,
    /// Completed -> Ready
    Reset,
}

/// The one live game session
#[derive(Debug, Clone)]
pub struct Session {
    state: GameState,
    start_ms: u32,
    elapsed_ms: u32,
    completed: bool,
    alarm_active: bool,
    timeout_ms: u32,
}

impl Session {
    pub const fn new() -> Self {
        Self::with_timeout(SESSION_TIMEOUT_MS)
    }

    pub const fn with_timeout(timeout_ms: u32) -> Self {
        Self {
            state: GameState::Idle,
            start_ms: 0,
            elapsed_ms: 0,
            completed: false,
            alarm_active: false,
            timeout_ms,
        }
    }

    /// Apply the peripheral bring-up outcome. Only meaningful once, from Idle.
    pub fn bring_up(&mut self, outcome: Result<(), InitError>) -> Option<Transition> {
        if self.state != GameState::Idle {
            debug!("Session: bring-up outcome ignored in {}", self.state.as_str());
            return None;
        }

        match outcome {
            Ok(()) => {
                self.state = GameState::Ready;
                info!("Session: ready");
                Some(Transition::Armed)
            }
            Err(e) => {
                self.state = GameState::Error;
                error!("Session: {}", e);
                Some(Transition::Faulted(e))
            }
        }
    }

    /// Debounced rising edge on the start gate
    pub fn start_edge(&mut self, now_ms: u32) -> Option<Transition> {
        if self.state != GameState::Ready {
            debug!("Session: start edge ignored in {}", self.state.as_str());
            return None;
        }

        self.state = GameState::Playing;
        self.start_ms = now_ms;
        self.elapsed_ms = 0;
        self.alarm_active = true;
        self.completed = false;
        info!("Session: started at {} ms", now_ms);
        Some(Transition::Started)
    }

    /// Debounced rising edge on the finish gate
    pub fn finish_edge(&mut self, now_ms: u32) -> Option<Transition> {
        if self.state != GameState::Playing {
            debug!("Session: finish edge ignored in {}", self.state.as_str());
            return None;
        }

        let elapsed_ms = now_ms.wrapping_sub(self.start_ms);
        self.state = GameState::Completed;
        self.elapsed_ms = elapsed_ms;
        self.completed = true;
        self.alarm_active = false;
        info!("Session: completed in {} ms", elapsed_ms);
        Some(Transition::Completed { elapsed_ms })
    }

    /// Advance the running time and enforce the deadline
    pub fn tick(&mut self, now_ms: u32) -> Option<Transition> {
        if self.state != GameState::Playing {
            return None;
        }

        let elapsed_ms = now_ms.wrapping_sub(self.start_ms);
        // Never let the running value go backwards
        if elapsed_ms > self.elapsed_ms {
            self.elapsed_ms = elapsed_ms;
        }

        if self.elapsed_ms < self.timeout_ms {
            return None;
        }

        self.state = GameState::Idle;
        self.alarm_active = false;
        info!("Session: timed out after {} ms", self.elapsed_ms);
        Some(Transition::TimedOut)
    }

    /// Reset request, honoured only after a completed run
    pub fn reset(&mut self) -> Option<Transition> {
        if self.state != GameState::Completed {
            debug!("Session: reset ignored in {}", self.state.as_str());
            return None;
        }

        self.state = GameState::Ready;
        self.elapsed_ms = 0;
        self.completed = false;
        info!("Session: reset");
        Some(Transition::Reset)
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn start_ms(&self) -> u32 {
        self.start_ms
    }

    /// Running value while playing, frozen value once completed
    pub fn elapsed_ms(&self) -> u32 {
        self.elapsed_ms
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn is_alarm_active(&self) -> bool {
        self.alarm_active
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ready() -> Session {
        let mut s = Session::new();
        assert_eq!(s.bring_up(Ok(())), Some(Transition::Armed));
        s
    }

    #[test]
    fn boots_idle_then_ready() {
        let mut s = Session::new();
        assert_eq!(s.state(), GameState::Idle);
        s.bring_up(Ok(()));
        assert_eq!(s.state(), GameState::Ready);
        assert!(!s.is_alarm_active());
        assert!(!s.is_completed());
    }

    #[test]
    fn failed_bring_up_is_terminal() {
        let mut s = Session::new();
        assert_eq!(
            s.bring_up(Err(InitError::Radio)),
            Some(Transition::Faulted(InitError::Radio))
        );
        assert_eq!(s.state(), GameState::Error);

        assert_eq!(s.start_edge(10), None);
        assert_eq!(s.finish_edge(20), None);
        assert_eq!(s.tick(400_000), None);
        assert_eq!(s.reset(), None);
        assert_eq!(s.bring_up(Ok(())), None);
        assert_eq!(s.state(), GameState::Error);
    }

    #[test]
    fn start_edge_from_ready() {
        let mut s = ready();
        assert_eq!(s.start_edge(1_234), Some(Transition::Started));
        assert_eq!(s.state(), GameState::Playing);
        assert_eq!(s.start_ms(), 1_234);
        assert!(s.is_alarm_active());
        assert!(!s.is_completed());
    }

    #[test]
    fn repeated_start_edge_is_ignored() {
        let mut s = ready();
        s.start_edge(0);
        assert_eq!(s.start_edge(500), None);
        assert_eq!(s.start_ms(), 0);
        assert_eq!(s.state(), GameState::Playing);
    }

    #[test]
    fn finish_while_ready_is_ignored() {
        let mut s = ready();
        assert_eq!(s.finish_edge(100), None);
        assert_eq!(s.state(), GameState::Ready);
        assert!(!s.is_completed());
    }

    #[test]
    fn completion_freezes_elapsed_time() {
        let mut s = ready();
        s.start_edge(0);
        s.tick(1_000);
        assert_eq!(s.elapsed_ms(), 1_000);
        assert_eq!(
            s.finish_edge(4_235),
            Some(Transition::Completed { elapsed_ms: 4_235 })
        );
        assert_eq!(s.state(), GameState::Completed);
        assert!(s.is_completed());
        assert!(!s.is_alarm_active());

        // Nothing moves the frozen value
        s.tick(10_000);
        s.tick(SESSION_TIMEOUT_MS + 1);
        assert_eq!(s.start_edge(11_000), None);
        assert_eq!(s.finish_edge(12_000), None);
        assert_eq!(s.elapsed_ms(), 4_235);
        assert_eq!(s.state(), GameState::Completed);
    }

    #[test]
    fn elapsed_is_monotonic_while_playing() {
        let mut s = ready();
        s.start_edge(100);
        let mut last = 0;
        for now in (100..5_000).step_by(37) {
            s.tick(now);
            assert!(s.elapsed_ms() >= last);
            last = s.elapsed_ms();
        }
        // A stale timestamp does not rewind the running value
        s.tick(200);
        assert_eq!(s.elapsed_ms(), last);
    }

    #[test]
    fn timeout_fires_exactly_once() {
        let mut s = ready();
        s.start_edge(0);
        assert_eq!(s.tick(SESSION_TIMEOUT_MS - 1), None);
        assert_eq!(s.tick(SESSION_TIMEOUT_MS), Some(Transition::TimedOut));
        assert_eq!(s.state(), GameState::Idle);
        assert!(!s.is_completed());
        assert!(!s.is_alarm_active());
        assert_eq!(s.tick(SESSION_TIMEOUT_MS + 10), None);
        assert_eq!(s.finish_edge(SESSION_TIMEOUT_MS + 20), None);
        assert!(!s.is_completed());
    }

    #[test]
    fn idle_after_timeout_ignores_everything() {
        let mut s = ready();
        s.start_edge(0);
        s.tick(SESSION_TIMEOUT_MS);
        assert_eq!(s.start_edge(SESSION_TIMEOUT_MS + 100), None);
        assert_eq!(s.reset(), None);
        assert_eq!(s.state(), GameState::Idle);
    }

    #[test]
    fn reset_only_from_completed() {
        let mut s = ready();
        assert_eq!(s.reset(), None);
        assert_eq!(s.state(), GameState::Ready);

        s.start_edge(0);
        assert_eq!(s.reset(), None);
        assert_eq!(s.state(), GameState::Playing);

        s.finish_edge(4_235);
        assert_eq!(s.reset(), Some(Transition::Reset));
        assert_eq!(s.state(), GameState::Ready);
        assert_eq!(s.elapsed_ms(), 0);
        assert!(!s.is_completed());
    }

    #[test]
    fn new_attempt_after_reset() {
        let mut s = ready();
        s.start_edge(0);
        s.finish_edge(3_000);
        s.reset();
        assert_eq!(s.start_edge(10_000), Some(Transition::Started));
        assert_eq!(
            s.finish_edge(12_500),
            Some(Transition::Completed { elapsed_ms: 2_500 })
        );
    }

    #[test]
    fn custom_timeout() {
        let mut s = Session::with_timeout(1_000);
        s.bring_up(Ok(()));
        s.start_edge(500);
        assert_eq!(s.tick(1_499), None);
        assert_eq!(s.tick(1_500), Some(Transition::TimedOut));
    }
}
