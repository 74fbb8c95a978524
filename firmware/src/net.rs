//! Network interface setup and SNTP time anchor
//!
//! DHCP runs once after the WiFi join; a single SNTP exchange then anchors
//! the report clock. Both are boot-time steps and may block for a few seconds.

extern crate alloc;
use alloc::vec;
use core::net::Ipv4Addr;

use esp_hal::delay::Delay;
use esp_wifi::wifi::WifiDevice;
use log::info;
use maze_controller::clock::{self, NtpTime, SNTP_PACKET_LEN};
use smoltcp::iface::{Interface, SocketSet};
use smoltcp::socket::{dhcpv4, udp};
use smoltcp::wire::{IpCidr, IpEndpoint, Ipv4Address};

use crate::smoltcp_now;

/// NTP server (pool.ntp.org member)
pub const NTP_SERVER_IP: Ipv4Addr = Ipv4Addr::new(162, 159, 200, 1);

/// NTP port
pub const NTP_PORT: u16 = 123;

const NTP_LOCAL_PORT: u16 = 12345;
const DHCP_ATTEMPTS: u32 = 100;
const NTP_ATTEMPTS: u32 = 100;

/// Obtain an address with DHCP and install it on the interface
pub fn setup_network_interface(
    iface: &mut Interface,
    device: &mut WifiDevice<'_>,
    sockets: &mut SocketSet<'_>,
) -> Result<Ipv4Address, &'static str> {
    info!("Network: Starting DHCP configuration...");
    let delay = Delay::new();

    let dhcp_handle = sockets.add(dhcpv4::Socket::new());

    let mut our_ip = None;
    for _ in 0..DHCP_ATTEMPTS {
        iface.poll(smoltcp_now(), device, sockets);

        let dhcp_socket = sockets.get_mut::<dhcpv4::Socket>(dhcp_handle);
        if let Some(dhcpv4::Event::Configured(config)) = dhcp_socket.poll() {
            info!("Network: DHCP configured: {:?}", config.address);
            iface.update_ip_addrs(|addrs| {
                addrs.clear();
                let _ = addrs.push(IpCidr::Ipv4(config.address));
            });
            if let Some(router) = config.router {
                iface.routes_mut().add_default_ipv4_route(router).ok();
            }
            our_ip = Some(config.address.address());
            break;
        }

        delay.delay_millis(100);
    }

    sockets.remove(dhcp_handle);

    let our_ip = our_ip.ok_or("DHCP timeout - failed to obtain IP address")?;
    info!("Network: Got IP address: {}", our_ip);
    Ok(our_ip)
}

/// One SNTP request/response against [`NTP_SERVER_IP`]
pub fn sync_time(
    iface: &mut Interface,
    device: &mut WifiDevice<'_>,
    sockets: &mut SocketSet<'_>,
) -> Result<NtpTime, &'static str> {
    info!("NTP: Starting time synchronization with {}", NTP_SERVER_IP);
    let delay = Delay::new();

    let our_ip = iface
        .ip_addrs()
        .iter()
        .find_map(|addr| match addr {
            IpCidr::Ipv4(ipv4) => Some(ipv4.address()),
            #[allow(unreachable_patterns)]
            _ => None,
        })
        .ok_or("No IPv4 address configured on interface")?;

    let rx_buffer = udp::PacketBuffer::new(vec![udp::PacketMetadata::EMPTY; 4], vec![0u8; 256]);
    let tx_buffer = udp::PacketBuffer::new(vec![udp::PacketMetadata::EMPTY; 4], vec![0u8; 256]);
    let udp_handle = sockets.add(udp::Socket::new(rx_buffer, tx_buffer));

    let server = IpEndpoint::new(NTP_SERVER_IP.into(), NTP_PORT);
    {
        let socket = sockets.get_mut::<udp::Socket>(udp_handle);
        socket
            .bind(IpEndpoint::new(our_ip.into(), NTP_LOCAL_PORT))
            .map_err(|_| "Failed to bind UDP socket")?;
        socket
            .send_slice(&clock::sntp_request(), server)
            .map_err(|_| "Failed to send NTP request")?;
    }

    let mut reply = [0u8; SNTP_PACKET_LEN];
    let mut time = None;
    for _ in 0..NTP_ATTEMPTS {
        iface.poll(smoltcp_now(), device, sockets);

        let socket = sockets.get_mut::<udp::Socket>(udp_handle);
        if socket.can_recv() {
            if let Ok((size, _)) = socket.recv_slice(&mut reply) {
                time = clock::parse_sntp_response(&reply[..size]);
                if time.is_some() {
                    break;
                }
            }
        }

        delay.delay_millis(50);
    }

    sockets.remove(udp_handle);

    let time = time.ok_or("NTP response timeout")?;
    info!("NTP: Sync successful! Unix timestamp: {}", time.unix_timestamp);
    Ok(time)
}
