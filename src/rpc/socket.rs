//! UDP transport layer: one datagram in, one datagram out.

use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};
use std::time::Duration;

use tracing::{debug, trace};

use crate::common::messages::MAX_PACKET;

/// The maximum duration to back off checking the [UdpSocket] buffer after it
/// is empty. Lower values increase CPU usage but drain the buffer faster,
/// reducing the risk of packet loss.
pub const MAX_THREAD_BLOCK_DURATION: Duration = Duration::from_millis(10);

/// A UdpSocket wrapper bound to the node's configured port.
///
/// Send and receive take `&self`, so one socket can be shared between the
/// serving loop and its handler threads.
#[derive(Debug)]
pub struct NodeSocket {
    socket: UdpSocket,
    local_addr: SocketAddrV4,
}

impl NodeSocket {
    pub fn bind(port: u16) -> io::Result<NodeSocket> {
        let socket = UdpSocket::bind(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)))?;

        let local_addr = match socket.local_addr()? {
            SocketAddr::V4(addr) => addr,
            SocketAddr::V6(_) => unimplemented!("NodeSocket does not support Ipv6"),
        };

        socket.set_nonblocking(true)?;

        Ok(NodeSocket { socket, local_addr })
    }

    // === Getters ===

    /// Returns the address the node is listening on.
    #[inline]
    pub fn local_addr(&self) -> SocketAddrV4 {
        self.local_addr
    }

    // === Public Methods ===

    /// Receives a single datagram, returning its text and origin.
    ///
    /// Undecodable bytes are replaced rather than dropped, so even a garbage
    /// datagram reaches the handler and is answered. Backs off briefly when
    /// the buffer is empty.
    pub fn recv_from(&self) -> Option<(String, SocketAddrV4)> {
        let mut buf = [0u8; MAX_PACKET];

        match self.socket.recv_from(&mut buf) {
            Ok((amt, SocketAddr::V4(from))) => {
                if from.port() == 0 {
                    trace!(
                        context = "socket_validation",
                        message = "Datagram from port 0"
                    );
                    return None;
                }

                let text = String::from_utf8_lossy(&buf[..amt]).into_owned();
                trace!(
                    context = "socket_message_receiving",
                    ?from,
                    len = amt,
                    "Received datagram"
                );
                Some((text, from))
            }
            Ok((_, SocketAddr::V6(_))) => {
                trace!(
                    context = "socket_validation",
                    message = "Received IPv6 packet"
                );
                None
            }
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {
                std::thread::sleep(MAX_THREAD_BLOCK_DURATION);
                None
            }
            Err(e) => {
                trace!(
                    context = "socket_error",
                    ?e,
                    "recv_from failed unexpectedly"
                );
                None
            }
        }
    }

    /// Sends a raw protocol message. Transmission failures are logged, not
    /// propagated; datagram delivery was never guaranteed to begin with.
    pub fn send(&self, to: SocketAddrV4, payload: &[u8]) {
        let _ = self.socket.send_to(payload, to).map_err(|e| {
            debug!(?e, ?to, "Error sending message");
        });
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn bind_reports_local_addr() {
        let socket = NodeSocket::bind(0).unwrap();
        assert_ne!(socket.local_addr().port(), 0);
    }

    #[test]
    fn datagrams_round_trip() {
        let server = NodeSocket::bind(0).unwrap();
        let client = NodeSocket::bind(0).unwrap();

        client.send(
            SocketAddrV4::new([127, 0, 0, 1].into(), server.local_addr().port()),
            b"Data: get color",
        );

        let (text, from) = loop {
            if let Some(received) = server.recv_from() {
                break received;
            }
        };
        assert_eq!(text, "Data: get color");
        assert_eq!(from.port(), client.local_addr().port());
    }

    #[test]
    fn non_utf8_payloads_are_replaced_not_dropped() {
        let server = NodeSocket::bind(0).unwrap();
        let client = NodeSocket::bind(0).unwrap();

        client.send(
            SocketAddrV4::new([127, 0, 0, 1].into(), server.local_addr().port()),
            &[0xff, 0xfe, 0xfd],
        );

        let (text, _) = loop {
            if let Some(received) = server.recv_from() {
                break received;
            }
        };
        assert!(!text.is_empty());
    }
}
