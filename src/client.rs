//! One-shot get/put client: one request, one bounded wait, no retries.

use std::io;
use std::net::{Ipv4Addr, SocketAddr, UdpSocket};
use std::time::Duration;

use crate::common::messages::{Request, MAX_PACKET};
use crate::common::PeerAddr;
use crate::rpc::DEFAULT_REQUEST_TIMEOUT;

/// Failures surfaced by the one-shot client.
#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    /// No response arrived within the fixed wait. The request or the answer
    /// was lost; the client does not retry.
    #[error("request timed out")]
    Timeout,

    #[error(transparent)]
    /// Transparent [std::io::Error]
    Io(#[from] io::Error),
}

/// Issues a single request to one known node and waits for whichever ring
/// member ends up answering.
#[derive(Debug, Clone)]
pub struct Client {
    target: PeerAddr,
    timeout: Duration,
}

impl Client {
    pub fn new(host: impl Into<String>, port: u16) -> Client {
        Client {
            target: PeerAddr::new(host, port),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Overrides the fixed wait; mainly useful in tests.
    pub fn with_timeout(mut self, timeout: Duration) -> Client {
        self.timeout = timeout;
        self
    }

    /// Sends one request and returns the raw response text.
    ///
    /// The response may come from any ring member; whichever node owns the
    /// key answers the client directly.
    pub fn send(&self, verb: &str, key: &str, value: Option<&str>) -> Result<String, ClientError> {
        let socket = UdpSocket::bind(SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)))?;
        socket.set_read_timeout(Some(self.timeout))?;

        let mut data = format!("{verb} {key}");
        if let Some(value) = value {
            data.push(' ');
            data.push_str(value);
        }

        let request = Request {
            source: None,
            destination: self.target.clone(),
            nodes_visited: 0,
            data,
        };
        socket.send_to(
            &request.to_bytes(),
            (self.target.host.as_str(), self.target.port),
        )?;

        let mut buf = [0u8; MAX_PACKET];
        match socket.recv_from(&mut buf) {
            Ok((amt, _)) => Ok(String::from_utf8_lossy(&buf[..amt]).into_owned()),
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                Err(ClientError::Timeout)
            }
            Err(e) => Err(ClientError::Io(e)),
        }
    }
}
