//! Audio/visual feedback cues
//!
//! Each session transition maps to a [`Cue`]: a buzzer tone plus the level
//! the alarm LED should take. [`CueTimer`] lets the firmware play a tone
//! without blocking the poll loop: arm it when the cue fires, then check for
//! expiry on every tick.

use crate::session::Transition;

/// Buzzer tone request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tone {
    pub frequency_hz: u16,
    pub duration_ms: u16,
}

impl Tone {
    pub const fn new(frequency_hz: u16, duration_ms: u16) -> Self {
        Self {
            frequency_hz,
            duration_ms,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CueKind {
    Boot,
    Fault,
    Start,
    Complete,
    Timeout,
    Reset,
}

/// Feedback emitted at a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cue {
    pub kind: CueKind,
    pub tone: Option<Tone>,
    /// New alarm LED level, `None` leaves it unchanged
    pub alarm_led: Option<bool>,
}

impl Cue {
    pub fn for_transition(transition: &Transition) -> Self {
        match transition {
            Transition::Armed => Self {
                kind: CueKind::Boot,
                tone: Some(Tone::new(1000, 100)),
                alarm_led: Some(false),
            },
            Transition::Faulted(_) => Self {
                kind: CueKind::Fault,
                tone: Some(Tone::new(300, 800)),
                alarm_led: Some(false),
            },
            Transition::Started => Self {
                kind: CueKind::Start,
                tone: Some(Tone::new(1500, 200)),
                alarm_led: Some(true),
            },
            Transition::Completed { .. } => Self {
                kind: CueKind::Complete,
                tone: Some(Tone::new(2000, 500)),
                alarm_led: Some(false),
            },
            Transition::TimedOut => Self {
                kind: CueKind::Timeout,
                tone: Some(Tone::new(400, 600)),
                alarm_led: Some(false),
            },
            Transition::Reset => Self {
                kind: CueKind::Reset,
                tone: Some(Tone::new(1000, 100)),
                alarm_led: None,
            },
        }
    }
}

/// Tracks how long the buzzer has left to sound
pub struct CueTimer {
    /// Is a tone currently playing?
    active: bool,
    tone: Tone,
    /// When the tone started (ms timestamp)
    started_ms: u32,
}

impl CueTimer {
    pub const fn new() -> Self {
        Self {
            active: false,
            tone: Tone::new(0, 0),
            started_ms: 0,
        }
    }

    /// Start a tone (restarts the timer if one is already playing)
    pub fn activate(&mut self, tone: Tone, now_ms: u32) {
        self.active = true;
        self.tone = tone;
        self.started_ms = now_ms;
    }

    /// Returns true once the active tone has played for its full duration
    pub fn check_expired(&self, now_ms: u32) -> bool {
        if self.active {
            let elapsed = now_ms.wrapping_sub(self.started_ms);
            return elapsed >= u32::from(self.tone.duration_ms);
        }
        false
    }

    pub fn deactivate(&mut self) {
        self.active = false;
    }
}

impl Default for CueTimer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InitError;

    #[test]
    fn start_turns_alarm_led_on() {
        let cue = Cue::for_transition(&Transition::Started);
        assert_eq!(cue.kind, CueKind::Start);
        assert_eq!(cue.tone, Some(Tone::new(1500, 200)));
        assert_eq!(cue.alarm_led, Some(true));
    }

    #[test]
    fn leaving_playing_turns_alarm_led_off() {
        for t in [Transition::Completed { elapsed_ms: 1 }, Transition::TimedOut] {
            assert_eq!(Cue::for_transition(&t).alarm_led, Some(false));
        }
    }

    #[test]
    fn every_transition_has_a_distinct_kind() {
        let kinds = [
            Transition::Armed,
            Transition::Faulted(InitError::Sensors),
            Transition::Started,
            Transition::Completed { elapsed_ms: 10 },
            Transition::TimedOut,
            Transition::Reset,
        ]
        .map(|t| Cue::for_transition(&t).kind);
        for (i, a) in kinds.iter().enumerate() {
            for b in &kinds[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn timer_expires_after_tone_duration() {
        let mut timer = CueTimer::new();
        assert!(!timer.check_expired(0));

        timer.activate(Tone::new(2000, 500), 1_000);
        assert!(!timer.check_expired(1_499));
        assert!(timer.check_expired(1_500));

        timer.deactivate();
        assert!(!timer.check_expired(2_000));
    }

    #[test]
    fn reactivation_restarts_timer() {
        let mut timer = CueTimer::new();
        timer.activate(Tone::new(1500, 200), 0);
        timer.activate(Tone::new(2000, 500), 150);
        assert!(!timer.check_expired(400));
        assert!(timer.check_expired(650));
    }
}
