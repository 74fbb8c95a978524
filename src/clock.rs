//! Wall-clock time for status reports
//!
//! The device only has a monotonic millisecond counter. One SNTP exchange at
//! boot anchors it to Unix time; reports then carry `anchor + uptime` as a
//! UTC ISO-8601 string. Without an anchor the count starts at the epoch.

use core::fmt::Write;

use heapless::String;

/// Seconds between 1900-01-01 (NTP era 0) and 1970-01-01
pub const NTP_TO_UNIX_OFFSET: u64 = 2_208_988_800;

/// SNTP packet size
pub const SNTP_PACKET_LEN: usize = 48;

/// "YYYY-MM-DDTHH:MM:SSZ"
pub type Timestamp = String<20>;

/// Time returned by an SNTP server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NtpTime {
    /// Seconds since Unix epoch (1970-01-01 00:00:00 UTC)
    pub unix_timestamp: u64,
    /// Microseconds part
    pub microseconds: u32,
}

/// SNTPv4 client request: LI = 0, VN = 4, Mode = 3
pub fn sntp_request() -> [u8; SNTP_PACKET_LEN] {
    let mut packet = [0u8; SNTP_PACKET_LEN];
    packet[0] = 0b00_100_011;
    packet
}

/// Extract the transmit timestamp (bytes 40-47) from a server reply
pub fn parse_sntp_response(packet: &[u8]) -> Option<NtpTime> {
    if packet.len() < SNTP_PACKET_LEN {
        return None;
    }
    // Mode 4 = server
    if packet[0] & 0b111 != 4 {
        return None;
    }

    let seconds = u32::from_be_bytes([packet[40], packet[41], packet[42], packet[43]]);
    let fraction = u32::from_be_bytes([packet[44], packet[45], packet[46], packet[47]]);
    if seconds == 0 {
        return None;
    }

    Some(NtpTime {
        unix_timestamp: u64::from(seconds).saturating_sub(NTP_TO_UNIX_OFFSET),
        microseconds: ((u64::from(fraction) * 1_000_000) >> 32) as u32,
    })
}

/// Maps the monotonic counter onto Unix time
///
/// The counter wraps after about 49.7 days. [`WallClock::advance`] moves the
/// anchor forward to the latest reading, so any caller that observes the
/// counter more often than once per wrap period keeps correct time.
#[derive(Debug, Clone, Copy, Default)]
pub struct WallClock {
    base_secs: u64,
    base_ms: u32,
    synced: bool,
}

impl WallClock {
    pub const fn unsynced() -> Self {
        Self {
            base_secs: 0,
            base_ms: 0,
            synced: false,
        }
    }

    /// Record that `time` was current when the counter read `now_ms`
    pub fn sync(&mut self, time: NtpTime, now_ms: u32) {
        self.base_secs = time.unix_timestamp;
        self.base_ms = now_ms;
        self.synced = true;
    }

    pub fn is_synced(&self) -> bool {
        self.synced
    }

    /// Fold the whole seconds elapsed since the anchor into it
    pub fn advance(&mut self, now_ms: u32) {
        let whole_secs = now_ms.wrapping_sub(self.base_ms) / 1000;
        self.base_secs += u64::from(whole_secs);
        self.base_ms = self.base_ms.wrapping_add(whole_secs * 1000);
    }

    /// Unix seconds at counter value `now_ms`, less than one wrap past the anchor
    pub fn unix_at(&self, now_ms: u32) -> u64 {
        self.base_secs + u64::from(now_ms.wrapping_sub(self.base_ms) / 1000)
    }

    pub fn timestamp_at(&mut self, now_ms: u32) -> Timestamp {
        self.advance(now_ms);
        format_iso8601(self.unix_at(now_ms))
    }
}

/// Format Unix seconds as "YYYY-MM-DDTHH:MM:SSZ"
pub fn format_iso8601(unix_timestamp: u64) -> Timestamp {
    let days_since_epoch = unix_timestamp / 86_400;

    let mut year = 1970u32;
    let mut remaining_days = days_since_epoch;
    loop {
        let days_in_year = if is_leap_year(year) { 366 } else { 365 };
        if remaining_days < days_in_year {
            break;
        }
        remaining_days -= days_in_year;
        year += 1;
    }

    let (month, day) = days_to_month_day(remaining_days as u32, is_leap_year(year));

    let time_of_day = unix_timestamp % 86_400;
    let hours = time_of_day / 3600;
    let minutes = (time_of_day % 3600) / 60;
    let seconds = time_of_day % 60;

    let mut out = Timestamp::new();
    let _ = write!(
        &mut out,
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z",
        year, month, day, hours, minutes, seconds
    );
    out
}

fn is_leap_year(year: u32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || (year % 400 == 0)
}

/// Convert zero-based day of year to (month, day), both one-based
fn days_to_month_day(day_of_year: u32, is_leap: bool) -> (u8, u8) {
    let days_in_months = if is_leap {
        [31, 29, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31]
    } else {
        [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31]
    };

    let mut remaining = day_of_year;
    for (month_idx, &days) in days_in_months.iter().enumerate() {
        if remaining < days {
            return ((month_idx + 1) as u8, (remaining + 1) as u8);
        }
        remaining -= days;
    }

    (12, 31)
}
