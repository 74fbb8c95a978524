//! Status reports for the collector
//!
//! # Wire format
//! - HTTP/1.1 `POST /device/status` over plain TCP
//! - Basic authentication with the collector's static credentials
//! - JSON body matching the collector's `maze_device_status` record
//!
//! Everything is built into fixed-size buffers; an oversized field is a
//! [`TransmissionError::BufferTooSmall`], never a panic.

use core::fmt::Write;
use core::net::Ipv4Addr;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use heapless::String;

use crate::error::TransmissionError;

pub const PAYLOAD_LEN: usize = 256;
pub const REQUEST_LEN: usize = 640;
const AUTH_LEN: usize = 96;

/// Read-only copy of the session fields the collector stores
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub device_id: &'static str,
    pub alarm_active: bool,
    pub maze_completed: bool,
    /// Raw finish sensor level (true = ball at the finish gate)
    pub hall_sensor_value: bool,
    /// 0-100
    pub battery_level: u8,
    /// Monotonic time the snapshot was taken
    pub uptime_ms: u32,
}

/// Collector endpoint configuration
#[derive(Debug, Clone)]
pub struct ReporterConfig {
    pub ip: Ipv4Addr,
    pub port: u16,
    pub path: &'static str,
    pub username: &'static str,
    pub password: &'static str,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            ip: Ipv4Addr::new(192, 168, 1, 100),
            port: 8080,
            path: "/device/status",
            username: "admin",
            password: "password",
        }
    }
}

/// JSON body for one snapshot. `timestamp` is the UTC ISO-8601 string.
pub fn encode_json(
    snapshot: &StatusSnapshot,
    timestamp: &str,
) -> Result<String<PAYLOAD_LEN>, TransmissionError> {
    let mut payload = String::new();
    write!(
        &mut payload,
        "{{\"device_id\":\"{}\",\"alarm_active\":{},\"maze_completed\":{},\"hall_sensor_value\":{},\"battery_level\":{},\"timestamp\":\"{}\"}}",
        snapshot.device_id,
        snapshot.alarm_active,
        snapshot.maze_completed,
        snapshot.hall_sensor_value,
        snapshot.battery_level,
        timestamp
    )
    .map_err(|_| TransmissionError::BufferTooSmall)?;
    Ok(payload)
}

/// base64("username:password")
pub fn basic_auth_token(
    username: &str,
    password: &str,
) -> Result<String<AUTH_LEN>, TransmissionError> {
    let mut credentials: String<64> = String::new();
    write!(&mut credentials, "{}:{}", username, password)
        .map_err(|_| TransmissionError::BufferTooSmall)?;

    let mut encoded = [0u8; AUTH_LEN];
    let len = STANDARD
        .encode_slice(credentials.as_bytes(), &mut encoded)
        .map_err(|_| TransmissionError::BufferTooSmall)?;

    let mut token = String::new();
    let text =
        core::str::from_utf8(&encoded[..len]).map_err(|_| TransmissionError::BufferTooSmall)?;
    token
        .push_str(text)
        .map_err(|_| TransmissionError::BufferTooSmall)?;
    Ok(token)
}

/// Full HTTP request (headers and body) posting `body` to the collector
pub fn build_request(
    config: &ReporterConfig,
    body: &str,
) -> Result<String<REQUEST_LEN>, TransmissionError> {
    let token = basic_auth_token(config.username, config.password)?;

    let mut request = String::new();
    write!(
        &mut request,
        "POST {} HTTP/1.1\r\n\
         Host: {}:{}\r\n\
         Authorization: Basic {}\r\n\
         Content-Type: application/json\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\
         \r\n\
         {}",
        config.path,
        config.ip,
        config.port,
        token,
        body.len(),
        body
    )
    .map_err(|_| TransmissionError::BufferTooSmall)?;
    Ok(request)
}

/// Status code from an HTTP/1.x status line
pub fn parse_status_code(response: &[u8]) -> Option<u16> {
    let line_end = response
        .iter()
        .position(|&b| b == b'\r' || b == b'\n')
        .unwrap_or(response.len());
    let line = core::str::from_utf8(&response[..line_end]).ok()?;

    let mut parts = line.split(' ');
    let version = parts.next()?;
    if !version.starts_with("HTTP/1.") {
        return None;
    }
    let code = parts.next()?;
    if code.len() != 3 {
        return None;
    }
    code.parse().ok()
}

/// Accept any 2xx reply
pub fn check_response(response: &[u8]) -> Result<u16, TransmissionError> {
    match parse_status_code(response) {
        Some(code) if (200..300).contains(&code) => Ok(code),
        Some(code) => Err(TransmissionError::Rejected(code)),
        None => Err(TransmissionError::Rejected(0)),
    }
}
