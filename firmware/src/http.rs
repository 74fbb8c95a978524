//! TCP link to the collector
//!
//! Implements [`Transport`] on one smoltcp TCP socket. Nothing here waits:
//! each call touches the socket or polls the interface once, and the report
//! exchange itself is carried across loop ticks by
//! [`maze_controller::upload::Upload`].

use esp_wifi::wifi::WifiDevice;
use maze_controller::TransmissionError;
use maze_controller::upload::Transport;
use smoltcp::iface::{Interface, SocketHandle, SocketSet};
use smoltcp::socket::tcp;
use smoltcp::wire::IpEndpoint;

use crate::smoltcp_now;

pub const LOCAL_PORT_BASE: u16 = 49152;

/// Ephemeral port for the `n`th report, so a lingering connection from the
/// previous one never collides with the next
pub fn local_port(n: u16) -> u16 {
    LOCAL_PORT_BASE + n % 1024
}

/// Borrowed view of the network stack for one upload step
pub struct TcpLink<'n, 'a, 'd> {
    pub iface: &'n mut Interface,
    pub device: &'n mut WifiDevice<'d>,
    pub sockets: &'n mut SocketSet<'a>,
    pub handle: SocketHandle,
    pub endpoint: IpEndpoint,
    pub local_port: u16,
}

impl<'a> TcpLink<'_, 'a, '_> {
    fn socket(&mut self) -> &mut tcp::Socket<'a> {
        self.sockets.get_mut::<tcp::Socket<'a>>(self.handle)
    }
}

impl Transport for TcpLink<'_, '_, '_> {
    fn poll(&mut self) {
        self.iface.poll(smoltcp_now(), self.device, self.sockets);
    }

    fn connect(&mut self) -> Result<(), TransmissionError> {
        let socket = self.sockets.get_mut::<tcp::Socket>(self.handle);
        if socket.is_open() {
            socket.abort();
        }
        socket
            .connect(self.iface.context(), self.endpoint, self.local_port)
            .map_err(|_| TransmissionError::ConnectionFailed)
    }

    fn may_send(&mut self) -> bool {
        self.socket().may_send()
    }

    fn is_open(&mut self) -> bool {
        self.socket().is_open()
    }

    fn send(&mut self, data: &[u8]) -> Result<usize, TransmissionError> {
        let socket = self.socket();
        if !socket.can_send() {
            return Ok(0);
        }
        socket
            .send_slice(data)
            .map_err(|_| TransmissionError::SendFailed)
    }

    fn recv(&mut self, buf: &mut [u8]) -> usize {
        let socket = self.socket();
        if !socket.can_recv() {
            return 0;
        }
        socket.recv_slice(buf).unwrap_or(0)
    }

    fn close(&mut self) {
        self.socket().close();
    }

    fn abort(&mut self) {
        self.socket().abort();
    }
}
