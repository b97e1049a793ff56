//! The serving loop: each datagram is handled to completion by a worker and
//! answered or forwarded, never both.

pub(crate) mod config;
mod socket;

pub use config::{Config, DEFAULT_REQUEST_TIMEOUT};
pub use socket::NodeSocket;

use std::net::SocketAddrV4;
use std::sync::Arc;
use std::thread;

use tracing::debug;

use crate::common::{Id, Ring};
use crate::router::Router;
use crate::server::{Reply, Server};
use crate::Result;

/// A running node's I/O side: the bound socket plus the request handler.
#[derive(Debug)]
pub struct Rpc {
    socket: Arc<NodeSocket>,
    server: Server,
}

impl Rpc {
    /// Builds the ring and finger table from the configuration and binds
    /// the local peer's port.
    pub fn new(config: &Config) -> Result<Rpc> {
        let local = config
            .peers
            .get(config.local_index)
            .ok_or(crate::Error::LocalIndexOutOfRange {
                index: config.local_index,
                len: config.peers.len(),
            })?
            .clone();

        let ring = Ring::new(&config.peers, config.local_index)?;
        let router = Arc::new(Router::new(ring));
        let socket = Arc::new(NodeSocket::bind(local.port)?);
        let server = Server::new(router, local);

        Ok(Rpc { socket, server })
    }

    // === Getters ===

    /// Returns the address the node is listening on.
    #[inline]
    pub fn local_addr(&self) -> SocketAddrV4 {
        self.socket.local_addr()
    }

    /// Returns this node's ring identity.
    pub fn id(&self) -> Id {
        self.router().ring().local().id
    }

    pub fn router(&self) -> &Router {
        self.server.router()
    }

    pub fn server(&self) -> &Server {
        &self.server
    }

    // === Public Methods ===

    /// Receives at most one datagram and hands it to a worker thread. The
    /// worker owns the whole request lifecycle: parse, route, reply.
    pub fn tick(&self) {
        if let Some((payload, from)) = self.socket.recv_from() {
            let server = self.server.clone();
            let socket = Arc::clone(&self.socket);

            thread::spawn(move || {
                let reply = server.handle_datagram(&payload, from);
                dispatch(&socket, reply);
            });
        }
    }
}

/// Sends a handled request on its way: responses to the original requester,
/// forwards to the next node. An address that will not resolve is logged and
/// dropped; there is nobody left to answer.
fn dispatch(socket: &NodeSocket, reply: Reply) {
    let (payload, to) = match reply {
        Reply::Respond(response) => (response.to_bytes(), response.destination.clone()),
        Reply::Forward(request) => (request.to_bytes(), request.destination.clone()),
    };

    match to.to_socket_addr() {
        Ok(addr) => socket.send(addr, &payload),
        Err(error) => debug!(%to, %error, "undeliverable reply address"),
    }
}
