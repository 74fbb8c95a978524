//! Error types

/// A required peripheral failed during bring-up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitError {
    /// Radio controller could not be created
    Radio,
    /// Both gate sensors read active at boot
    Sensors,
}

impl core::fmt::Display for InitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            InitError::Radio => write!(f, "Radio initialization failed"),
            InitError::Sensors => write!(f, "Sensor self-check failed"),
        }
    }
}

/// A status report could not be delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransmissionError {
    /// No network link
    Offline,
    /// TCP connection to the collector failed
    ConnectionFailed,
    /// Failed to write the request
    SendFailed,
    /// Timeout waiting for the collector
    Timeout,
    /// Collector answered with a non-2xx status (0 when unparseable)
    Rejected(u16),
    /// Buffer too small
    BufferTooSmall,
}

impl core::fmt::Display for TransmissionError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            TransmissionError::Offline => write!(f, "No network connection"),
            TransmissionError::ConnectionFailed => write!(f, "Connection failed"),
            TransmissionError::SendFailed => write!(f, "Send failed"),
            TransmissionError::Timeout => write!(f, "Timeout"),
            TransmissionError::Rejected(status) => write!(f, "Rejected with status {}", status),
            TransmissionError::BufferTooSmall => write!(f, "Buffer too small"),
        }
    }
}
