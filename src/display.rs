//! Text layout for the status display
//!
//! The board renders these lines however it can (OLED, serial console).

use core::fmt::Write;

use heapless::{String, Vec};

use crate::device::Connectivity;
use crate::session::GameState;

/// Longest line the 128 px wide display fits at text size 1
pub const LINE_LEN: usize = 21;
pub const MAX_LINES: usize = 5;

pub type Line = String<LINE_LEN>;

/// Everything the display shows, copied out of the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    pub state: GameState,
    pub elapsed_ms: u32,
    pub completed: bool,
    pub battery_percent: u8,
    pub link: Connectivity,
}

impl Frame {
    pub fn lines(&self) -> Vec<Line, MAX_LINES> {
        let mut lines = Vec::new();
        let mut push = |line: Line| {
            let _ = lines.push(line);
        };

        push(line(format_args!("MAZE CHALLENGE")));
        match self.state {
            GameState::Idle => push(line(format_args!("Status: IDLE"))),
            GameState::Ready => {
                push(line(format_args!("Status: READY")));
                push(line(format_args!("Place ball at START")));
            }
            GameState::Playing => {
                push(line(format_args!("Status: PLAYING")));
                push(clock_line(self.elapsed_ms));
            }
            GameState::Completed => {
                push(line(format_args!("Status: COMPLETED!")));
                push(line(format_args!(
                    "Time: {}.{:03} s",
                    self.elapsed_ms / 1000,
                    self.elapsed_ms % 1000
                )));
                push(line(format_args!("Press button to reset")));
            }
            GameState::Error => push(line(format_args!("Status: ERROR"))),
        }
        push(self.footer());

        lines
    }

    fn footer(&self) -> Line {
        let mut footer = line(format_args!("Bat:{}% ", self.battery_percent));
        if self.link.wifi {
            let _ = footer.push_str("WiFi");
        }
        if self.link.ble {
            let _ = footer.push_str(" BLE");
        }
        footer
    }
}

/// Running time as MM:SS
pub fn clock_line(elapsed_ms: u32) -> Line {
    line(format_args!(
        "{:02}:{:02}",
        elapsed_ms / 60_000,
        (elapsed_ms / 1000) % 60
    ))
}

// Output past LINE_LEN is cut off, same as the panel would
fn line(args: core::fmt::Arguments<'_>) -> Line {
    let mut out = Line::new();
    let _ = out.write_fmt(args);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(state: GameState, elapsed_ms: u32) -> Frame {
        Frame {
            state,
            elapsed_ms,
            completed: state == GameState::Completed,
            battery_percent: 87,
            link: Connectivity { wifi: true, ble: false },
        }
    }

    fn text(f: &Frame) -> std::vec::Vec<std::string::String> {
        f.lines().iter().map(|l| l.as_str().to_owned()).collect()
    }

    #[test]
    fn ready_screen() {
        assert_eq!(
            text(&frame(GameState::Ready, 0)),
            ["MAZE CHALLENGE", "Status: READY", "Place ball at START", "Bat:87% WiFi"]
        );
    }

    #[test]
    fn playing_shows_minutes_and_seconds() {
        let lines = text(&frame(GameState::Playing, 125_900));
        assert_eq!(lines[1], "Status: PLAYING");
        assert_eq!(lines[2], "02:05");
    }

    #[test]
    fn completed_shows_millisecond_time() {
        let lines = text(&frame(GameState::Completed, 4_235));
        assert_eq!(lines[1], "Status: COMPLETED!");
        assert_eq!(lines[2], "Time: 4.235 s");
        assert_eq!(lines[3], "Press button to reset");
    }

    #[test]
    fn completed_pads_milliseconds() {
        let lines = text(&frame(GameState::Completed, 61_007));
        assert_eq!(lines[2], "Time: 61.007 s");
    }

    #[test]
    fn footer_lists_links() {
        let mut f = frame(GameState::Idle, 0);
        f.link = Connectivity { wifi: true, ble: true };
        f.battery_percent = 100;
        assert_eq!(text(&f).last().map(|s| s.as_str()), Some("Bat:100% WiFi BLE"));

        f.link = Connectivity::default();
        assert_eq!(text(&f).last().map(|s| s.as_str()), Some("Bat:100% "));
    }

    #[test]
    fn error_screen() {
        assert_eq!(text(&frame(GameState::Error, 0))[1], "Status: ERROR");
    }
}
