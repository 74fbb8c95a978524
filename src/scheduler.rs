//! Deadline table for the low-frequency consumers
//!
//! Each consumer has an interval and a next-due timestamp. The poll loop asks
//! which consumers are due on every pass; a due consumer is rescheduled one
//! interval after the moment it ran, so a long stall never causes a burst of
//! catch-up runs.

use heapless::Vec;

use crate::config::Timing;

/// Periodic work driven from the poll loop, in run order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Consumer {
    Display,
    Report,
    Battery,
}

pub const CONSUMER_COUNT: usize = 3;

#[derive(Debug, Clone, Copy)]
struct Deadline {
    consumer: Consumer,
    interval_ms: u32,
    next_due_ms: u32,
}

impl Deadline {
    fn is_due(&self, now_ms: u32) -> bool {
        // Signed distance keeps the comparison correct across timer wraparound
        now_ms.wrapping_sub(self.next_due_ms) as i32 >= 0
    }
}

#[derive(Debug, Clone)]
pub struct Scheduler {
    table: [Deadline; CONSUMER_COUNT],
}

impl Scheduler {
    /// Build the table with every consumer first due one interval after `now_ms`
    pub fn new(timing: &Timing, now_ms: u32) -> Self {
        let entry = |consumer, interval_ms: u32| Deadline {
            consumer,
            interval_ms,
            next_due_ms: now_ms.wrapping_add(interval_ms),
        };

        Self {
            table: [
                entry(Consumer::Display, timing.display_refresh_ms),
                entry(Consumer::Report, timing.report_interval_ms),
                entry(Consumer::Battery, timing.battery_check_ms),
            ],
        }
    }

    /// Consumers due at `now_ms`, in table order. Each returned consumer is
    /// rescheduled for `now_ms + interval`.
    pub fn take_due(&mut self, now_ms: u32) -> Vec<Consumer, CONSUMER_COUNT> {
        let mut due = Vec::new();
        for deadline in self.table.iter_mut() {
            if deadline.is_due(now_ms) {
                deadline.next_due_ms = now_ms.wrapping_add(deadline.interval_ms);
                // Capacity equals table length
                let _ = due.push(deadline.consumer);
            }
        }
        due
    }

    /// Make `consumer` due immediately
    pub fn trigger(&mut self, consumer: Consumer, now_ms: u32) {
        if let Some(deadline) = self.table.iter_mut().find(|d| d.consumer == consumer) {
            deadline.next_due_ms = now_ms;
        }
    }

    pub fn next_due_ms(&self, consumer: Consumer) -> Option<u32> {
        self.table
            .iter()
            .find(|d| d.consumer == consumer)
            .map(|d| d.next_due_ms)
    }
}
