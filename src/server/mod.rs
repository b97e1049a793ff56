//! Request handling: the protocol state machine applied to each datagram.
//!
//! Every inbound request resolves to exactly one outcome: a response sent
//! straight to the original requester, or a forwarded request sent to the
//! next node on the path. Forwarding is loose; intermediate hops never see
//! the answer.

mod store;

pub use store::{KeyValueStore, Lookup};

use std::net::SocketAddrV4;
use std::sync::Arc;

use tracing::debug;

use crate::common::messages::{ErrorKind, Request, Response, ResponseKind};
use crate::common::{Id, PeerAddr};
use crate::router::{KeyLocation, Router};

/// What the serving loop should do with a handled request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Answer the requester named in the response's destination.
    Respond(Response),
    /// Pass the request on to the node named in its destination.
    Forward(Request),
}

/// Handles requests against the local store, or hands them to the router
/// for forwarding. Cheap to clone; handler threads share the same store.
#[derive(Debug, Clone)]
pub struct Server {
    router: Arc<Router>,
    store: Arc<KeyValueStore>,
    /// This node's own `host port` pair, stamped into response headers.
    local: PeerAddr,
}

impl Server {
    pub fn new(router: Arc<Router>, local: PeerAddr) -> Server {
        Server {
            router,
            store: Arc::new(KeyValueStore::new()),
            local,
        }
    }

    pub fn store(&self) -> &KeyValueStore {
        &self.store
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Parses and handles one datagram. A payload that does not parse still
    /// gets an answer, addressed to the datagram's sender.
    pub fn handle_datagram(&self, payload: &str, from: SocketAddrV4) -> Reply {
        match Request::parse(payload) {
            Ok(request) => self.handle(request, from),
            Err(error) => {
                debug!(%from, %error, "malformed request");
                Reply::Respond(self.error_response(ErrorKind::Internal, 0, peer_of(from)))
            }
        }
    }

    /// Applies a parsed request: hop-budget check, then verb dispatch.
    pub fn handle(&self, request: Request, from: SocketAddrV4) -> Reply {
        // The original requester: the Source header once the request has
        // been forwarded, the datagram's sender on the first hop.
        let origin = request.source.clone().unwrap_or_else(|| peer_of(from));

        // Ring traversal exhausted; checked before anything else.
        if request.nodes_visited as usize >= self.router.ring().len() {
            debug!(nodes_visited = request.nodes_visited, "hop budget exhausted");
            return Reply::Respond(self.error_response(
                ErrorKind::NotFound,
                request.nodes_visited,
                origin,
            ));
        }

        let data = request.data.trim();
        let (verb, rest) = match data.split_once(' ') {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (data, ""),
        };

        match verb {
            "get" => self.handle_get(rest, &request, origin),
            "put" => self.handle_put(rest, &request, origin),
            _ => Reply::Respond(self.error_response(
                ErrorKind::NotImplemented,
                request.nodes_visited,
                origin,
            )),
        }
    }

    fn handle_get(&self, key: &str, request: &Request, origin: PeerAddr) -> Reply {
        if key.is_empty() {
            return Reply::Respond(self.error_response(
                ErrorKind::BadRequest,
                request.nodes_visited,
                origin,
            ));
        }

        let resolution = self.router.resolve(key);
        match resolution.location {
            KeyLocation::Local => match self.store.get(key) {
                Lookup::Value(value) => Reply::Respond(self.success_response(
                    key,
                    Some(value),
                    resolution.key_hash,
                    request.nodes_visited,
                    origin,
                )),
                // A tombstone reads the same as a key never stored.
                Lookup::Removed | Lookup::Missing => Reply::Respond(self.error_response(
                    ErrorKind::NotFound,
                    request.nodes_visited,
                    origin,
                )),
            },
            KeyLocation::Remote(node) => self.forward(node, request, origin),
        }
    }

    fn handle_put(&self, payload: &str, request: &Request, origin: PeerAddr) -> Reply {
        // Exactly `<key>` (remove) or `<key> <value>`.
        let mut tokens = payload.split_whitespace();
        let (key, value) = match (tokens.next(), tokens.next(), tokens.next()) {
            (Some(key), value, None) => (key, value),
            _ => {
                return Reply::Respond(self.error_response(
                    ErrorKind::BadRequest,
                    request.nodes_visited,
                    origin,
                ))
            }
        };

        let resolution = self.router.resolve(key);
        match resolution.location {
            KeyLocation::Local => {
                let value = value.map(str::to_string);
                self.store.insert(key.to_string(), value.clone());
                debug!(key, removed = value.is_none(), "stored locally");

                Reply::Respond(self.success_response(
                    key,
                    value,
                    resolution.key_hash,
                    request.nodes_visited,
                    origin,
                ))
            }
            KeyLocation::Remote(node) => self.forward(node, request, origin),
        }
    }

    /// Builds the forwarded request: next hop in the destination, hop
    /// counter bumped, the original requester pinned in `Source`, payload
    /// untouched.
    fn forward(&self, node: Id, request: &Request, origin: PeerAddr) -> Reply {
        let Some(next) = self.router.ring().address_of(&node) else {
            // Routing can only name ring members, all of which have
            // addresses; anything else is unanswerable here.
            debug!(%node, "resolved to an unknown identity");
            return Reply::Respond(self.error_response(
                ErrorKind::Internal,
                request.nodes_visited,
                origin,
            ));
        };

        debug!(%node, next = %next, data = %request.data, "forwarding");

        Reply::Forward(Request {
            source: Some(origin),
            destination: next.clone(),
            nodes_visited: request.nodes_visited + 1,
            data: request.data.clone(),
        })
    }

    fn success_response(
        &self,
        key: &str,
        value: Option<String>,
        key_hash: Id,
        nodes_visited: u32,
        origin: PeerAddr,
    ) -> Response {
        Response {
            kind: ResponseKind::Success {
                key: key.to_string(),
                value,
                key_hash,
            },
            source: self.local.clone(),
            node_hash: self.node_hash(),
            destination: origin,
            nodes_visited: nodes_visited + 1,
        }
    }

    fn error_response(&self, kind: ErrorKind, nodes_visited: u32, origin: PeerAddr) -> Response {
        debug!(code = kind.code(), "answering with error");

        Response {
            kind: ResponseKind::Error(kind),
            source: self.local.clone(),
            node_hash: self.node_hash(),
            destination: origin,
            nodes_visited: nodes_visited + 1,
        }
    }

    /// The identity stamped into `Node Hash` headers: the responding node's
    /// successor. On a single-peer ring that is the node itself.
    fn node_hash(&self) -> Id {
        self.router.ring().local().successor
    }
}

fn peer_of(addr: SocketAddrV4) -> PeerAddr {
    PeerAddr::new(addr.ip().to_string(), addr.port())
}
