//! Non-blocking status upload
//!
//! An [`Upload`] carries one HTTP exchange across loop ticks. Every call to
//! [`Upload::step`] polls the network stack exactly once and returns without
//! waiting, so the exchange never holds up sensor sampling. The whole
//! exchange is abandoned after its timeout.

use heapless::String;

use crate::error::TransmissionError;
use crate::report::{self, REQUEST_LEN};

/// Give up on an exchange after this long
pub const UPLOAD_TIMEOUT_MS: u32 = 2_000;

/// Enough for the status line of any sane reply
const RESPONSE_LEN: usize = 64;

/// One TCP connection to the collector, driven without blocking
pub trait Transport {
    /// Move pending packets in and out once
    fn poll(&mut self);

    /// Begin connecting. Any previous connection is dropped first.
    fn connect(&mut self) -> Result<(), TransmissionError>;

    /// Handshake finished and the connection accepts data
    fn may_send(&mut self) -> bool;

    /// False once the connection has closed or was reset
    fn is_open(&mut self) -> bool;

    /// Queue as much of `data` as fits, returning the byte count
    fn send(&mut self, data: &[u8]) -> Result<usize, TransmissionError>;

    /// Copy out whatever has arrived
    fn recv(&mut self, buf: &mut [u8]) -> usize;

    fn close(&mut self);

    fn abort(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Connecting,
    Sending { sent: usize },
    Awaiting,
}

pub struct Upload {
    request: String<REQUEST_LEN>,
    phase: Phase,
    response: [u8; RESPONSE_LEN],
    received: usize,
    started_ms: u32,
    timeout_ms: u32,
}

impl Upload {
    /// Open the connection for `request`; nothing is sent until the first step
    pub fn begin<T: Transport>(
        transport: &mut T,
        request: String<REQUEST_LEN>,
        now_ms: u32,
        timeout_ms: u32,
    ) -> Result<Self, TransmissionError> {
        transport.connect()?;
        Ok(Self {
            request,
            phase: Phase::Connecting,
            response: [0; RESPONSE_LEN],
            received: 0,
            started_ms: now_ms,
            timeout_ms,
        })
    }

    /// Advance by one poll. Returns the status code or error once finished,
    /// `None` while the exchange is still in flight.
    pub fn step<T: Transport>(
        &mut self,
        transport: &mut T,
        now_ms: u32,
    ) -> Option<Result<u16, TransmissionError>> {
        transport.poll();

        let outcome = match self.phase {
            Phase::Connecting => {
                if transport.may_send() {
                    self.phase = Phase::Sending { sent: 0 };
                    None
                } else if !transport.is_open() {
                    Some(Err(TransmissionError::ConnectionFailed))
                } else {
                    None
                }
            }
            Phase::Sending { sent } => {
                let bytes = self.request.as_bytes();
                match transport.send(&bytes[sent..]) {
                    Ok(n) if sent + n >= bytes.len() => {
                        self.phase = Phase::Awaiting;
                        None
                    }
                    Ok(n) => {
                        self.phase = Phase::Sending { sent: sent + n };
                        None
                    }
                    Err(e) => Some(Err(e)),
                }
            }
            Phase::Awaiting => {
                let n = transport.recv(&mut self.response[self.received..]);
                self.received += n;
                let head = &self.response[..self.received];
                if head.contains(&b'\n') || self.received == RESPONSE_LEN {
                    transport.close();
                    return Some(report::check_response(head));
                }
                if !transport.is_open() {
                    Some(Err(TransmissionError::ConnectionFailed))
                } else {
                    None
                }
            }
        };

        let outcome = match outcome {
            None if now_ms.wrapping_sub(self.started_ms) >= self.timeout_ms => {
                Some(Err(TransmissionError::Timeout))
            }
            other => other,
        };
        if outcome.is_some() {
            transport.abort();
        }
        outcome
    }

    /// Drop the exchange without waiting for the collector
    pub fn cancel<T: Transport>(self, transport: &mut T) {
        transport.abort();
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Scripted collector: the handshake takes `connect_after` polls, each
    /// poll accepts `chunk` bytes and the reply lands `reply_after` polls
    /// after the request is complete
    struct ScriptedLink {
        polls: u32,
        connect_after: u32,
        chunk: usize,
        reply: &'static [u8],
        reply_after: u32,
        sent: Vec<u8>,
        request_done_at: Option<u32>,
        delivered: bool,
        open: bool,
        closed: bool,
        aborted: bool,
    }

    impl ScriptedLink {
        fn new(reply: &'static [u8]) -> Self {
            Self {
                polls: 0,
                connect_after: 3,
                chunk: 128,
                reply,
                reply_after: 4,
                sent: Vec::new(),
                request_done_at: None,
                delivered: false,
                open: false,
                closed: false,
                aborted: false,
            }
        }
    }

    impl Transport for ScriptedLink {
        fn poll(&mut self) {
            self.polls += 1;
        }

        fn connect(&mut self) -> Result<(), TransmissionError> {
            self.open = true;
            Ok(())
        }

        fn may_send(&mut self) -> bool {
            self.open && self.polls >= self.connect_after
        }

        fn is_open(&mut self) -> bool {
            self.open
        }

        fn send(&mut self, data: &[u8]) -> Result<usize, TransmissionError> {
            let n = data.len().min(self.chunk);
            self.sent.extend_from_slice(&data[..n]);
            if n == data.len() {
                self.request_done_at = Some(self.polls);
            }
            Ok(n)
        }

        fn recv(&mut self, buf: &mut [u8]) -> usize {
            match self.request_done_at {
                Some(done) if !self.delivered && self.polls >= done + self.reply_after => {
                    self.delivered = true;
                    let n = self.reply.len().min(buf.len());
                    buf[..n].copy_from_slice(&self.reply[..n]);
                    n
                }
                _ => 0,
            }
        }

        fn close(&mut self) {
            self.closed = true;
        }

        fn abort(&mut self) {
            self.aborted = true;
            self.open = false;
        }
    }

    fn request() -> String<REQUEST_LEN> {
        let mut req = String::new();
        for _ in 0..5 {
            req.push_str("POST /device/status HTTP/1.1\r\nX-Padding: ......................\r\n")
                .unwrap();
        }
        req
    }

    /// Step every 10 ms until done, returning (outcome, steps taken)
    fn drive(
        upload: &mut Upload,
        link: &mut ScriptedLink,
        mut now: u32,
    ) -> (Result<u16, TransmissionError>, u32) {
        let mut steps = 0;
        loop {
            now += 10;
            steps += 1;
            if let Some(outcome) = upload.step(link, now) {
                return (outcome, steps);
            }
        }
    }

    #[test]
    fn exchange_spans_many_steps_with_one_poll_each() {
        let mut link = ScriptedLink::new(b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n");
        let mut upload = Upload::begin(&mut link, request(), 0, UPLOAD_TIMEOUT_MS).unwrap();
        assert_eq!(upload.phase(), Phase::Connecting);

        let (outcome, steps) = drive(&mut upload, &mut link, 0);
        assert_eq!(outcome, Ok(200));
        assert!(steps > 5);
        assert_eq!(link.polls, steps);
        assert_eq!(link.sent, request().as_bytes());
        assert!(link.closed);
    }

    #[test]
    fn request_goes_out_in_chunks() {
        let mut link = ScriptedLink::new(b"HTTP/1.1 204 No Content\r\n");
        link.chunk = 40;
        let mut upload = Upload::begin(&mut link, request(), 0, UPLOAD_TIMEOUT_MS).unwrap();

        for now in [10, 20, 30] {
            assert_eq!(upload.step(&mut link, now), None);
        }
        assert_eq!(upload.step(&mut link, 40), None);
        assert_eq!(upload.phase(), Phase::Sending { sent: 40 });

        let (outcome, _) = drive(&mut upload, &mut link, 40);
        assert_eq!(outcome, Ok(204));
        assert_eq!(link.sent, request().as_bytes());
    }

    #[test]
    fn non_2xx_reply_is_rejected() {
        let mut link = ScriptedLink::new(b"HTTP/1.1 401 Unauthorized\r\n");
        let mut upload = Upload::begin(&mut link, request(), 0, UPLOAD_TIMEOUT_MS).unwrap();
        let (outcome, _) = drive(&mut upload, &mut link, 0);
        assert_eq!(outcome, Err(TransmissionError::Rejected(401)));
    }

    #[test]
    fn silent_collector_times_out() {
        let mut link = ScriptedLink::new(b"");
        link.connect_after = u32::MAX;
        let mut upload = Upload::begin(&mut link, request(), 1_000, UPLOAD_TIMEOUT_MS).unwrap();

        let (outcome, steps) = drive(&mut upload, &mut link, 1_000);
        assert_eq!(outcome, Err(TransmissionError::Timeout));
        assert_eq!(steps, UPLOAD_TIMEOUT_MS / 10);
        assert!(link.aborted);
    }

    #[test]
    fn refused_connection_fails_fast() {
        let mut link = ScriptedLink::new(b"");
        link.connect_after = u32::MAX;
        let mut upload = Upload::begin(&mut link, request(), 0, UPLOAD_TIMEOUT_MS).unwrap();
        assert_eq!(upload.step(&mut link, 10), None);

        link.open = false;
        assert_eq!(
            upload.step(&mut link, 20),
            Some(Err(TransmissionError::ConnectionFailed))
        );
    }

    #[test]
    fn timeout_survives_counter_wrap() {
        let mut link = ScriptedLink::new(b"");
        link.connect_after = u32::MAX;
        let start = u32::MAX - 500;
        let mut upload = Upload::begin(&mut link, request(), start, UPLOAD_TIMEOUT_MS).unwrap();
        assert_eq!(upload.step(&mut link, start.wrapping_add(1_000)), None);
        assert_eq!(
            upload.step(&mut link, start.wrapping_add(2_000)),
            Some(Err(TransmissionError::Timeout))
        );
    }

    #[test]
    fn cancel_aborts_the_connection() {
        let mut link = ScriptedLink::new(b"");
        let upload = Upload::begin(&mut link, request(), 0, UPLOAD_TIMEOUT_MS).unwrap();
        upload.cancel(&mut link);
        assert!(link.aborted);
    }
}
