//! Parsing and formatting of the line-oriented text protocol.
//!
//! Requests carry a `Destination`, a `Nodes Visited` hop counter and a
//! `Data` payload, with a `Source` header added once a node forwards the
//! request on behalf of the original requester. Responses open with
//! `Success!` or `Error` and are terminated by a blank line.

use std::fmt::Write;

use crate::common::{Id, PeerAddr};

/// Largest UDP payload the protocol will send or accept.
pub const MAX_PACKET: usize = 65507;

/// Marker text reported in place of a value that was removed.
pub const EMPTY_VALUE: &str = "<EMPTY>";

/// The protocol's error taxonomy. Every handled request that is not a
/// success maps to exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    BadRequest,
    NotFound,
    Internal,
    NotImplemented,
}

impl ErrorKind {
    pub fn code(&self) -> u16 {
        match self {
            ErrorKind::BadRequest => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::Internal => 500,
            ErrorKind::NotImplemented => 501,
        }
    }

    /// The fixed human-readable message sent on the wire.
    pub fn message(&self) -> &'static str {
        match self {
            ErrorKind::BadRequest => {
                "Bad Request - The request line contained invalid characters following the protocol string."
            }
            ErrorKind::NotFound => "Not Found - The requested resource was not found.",
            ErrorKind::Internal => "Internal Server - Sorry, something went wrong.",
            ErrorKind::NotImplemented => {
                "Not Implemented - Server does not support the functionality required to fulfill the request."
            }
        }
    }
}

/// Failures turning datagram text into a [Request] or [Response].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("missing {0} header")]
    MissingHeader(&'static str),

    #[error("malformed header line: {0:?}")]
    MalformedLine(String),

    #[error("malformed peer address: {0:?}")]
    MalformedAddress(String),

    #[error("invalid hop counter: {0:?}")]
    InvalidHopCount(String),

    #[error("unknown status line: {0:?}")]
    UnknownStatus(String),

    #[error("invalid identity: {0:?}")]
    InvalidIdentity(String),
}

/// An inbound or forwarded request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// The original requester, present once a node has forwarded the
    /// request. On the first hop the datagram's sender is the origin.
    pub source: Option<PeerAddr>,
    /// The node this request is addressed to.
    pub destination: PeerAddr,
    /// How many nodes have already processed this request.
    pub nodes_visited: u32,
    /// The raw payload line: `<verb> <key>[ <value>]`.
    pub data: String,
}

impl Request {
    pub fn parse(text: &str) -> Result<Request, ParseError> {
        let mut source = None;
        let mut destination = None;
        let mut nodes_visited = None;
        let mut data = None;

        for line in text.lines().filter(|line| !line.trim().is_empty()) {
            let (name, value) = line
                .split_once(": ")
                .ok_or_else(|| ParseError::MalformedLine(line.to_string()))?;

            match name {
                "Source" => source = Some(parse_addr(value)?),
                "Destination" => destination = Some(parse_addr(value)?),
                "Nodes Visited" => {
                    let count = value
                        .trim()
                        .parse()
                        .map_err(|_| ParseError::InvalidHopCount(value.to_string()))?;
                    nodes_visited = Some(count);
                }
                "Data" => data = Some(value.trim_end().to_string()),
                _ => return Err(ParseError::MalformedLine(line.to_string())),
            }
        }

        Ok(Request {
            source,
            destination: destination.ok_or(ParseError::MissingHeader("Destination"))?,
            nodes_visited: nodes_visited.ok_or(ParseError::MissingHeader("Nodes Visited"))?,
            data: data.ok_or(ParseError::MissingHeader("Data"))?,
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = String::new();
        if let Some(source) = &self.source {
            let _ = write!(out, "Source: {source}\r\n");
        }
        let _ = write!(out, "Destination: {}\r\n", self.destination);
        let _ = write!(out, "Nodes Visited: {}\r\n", self.nodes_visited);
        let _ = write!(out, "Data: {}", self.data);

        out.into_bytes()
    }
}

/// The outcome reported for a handled request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseKind {
    Success {
        key: String,
        /// `None` echoes the [EMPTY_VALUE] marker of a removal.
        value: Option<String>,
        key_hash: Id,
    },
    Error(ErrorKind),
}

/// A response, always addressed straight to the original requester.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub kind: ResponseKind,
    /// The responding node.
    pub source: PeerAddr,
    /// Ring identity reported by the responding node.
    pub node_hash: Id,
    /// The original requester.
    pub destination: PeerAddr,
    /// Hop counter after this node processed the request.
    pub nodes_visited: u32,
}

impl Response {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = String::new();

        let status = match self.kind {
            ResponseKind::Success { .. } => "Success!",
            ResponseKind::Error(_) => "Error",
        };
        let _ = write!(out, "{status}\r\n");
        let _ = write!(out, "Source: {}\r\n", self.source);
        let _ = write!(out, "Node Hash: {}\r\n", self.node_hash);
        let _ = write!(out, "Destination: {}\r\n", self.destination);
        let _ = write!(out, "Nodes Visited: {}\r\n", self.nodes_visited);

        match &self.kind {
            ResponseKind::Success {
                key,
                value,
                key_hash,
            } => {
                let value = value.as_deref().unwrap_or(EMPTY_VALUE);
                let _ = write!(out, "Key: {key}\nValue: {value}\nKey Hash: {key_hash}\r\n");
            }
            ResponseKind::Error(kind) => {
                let _ = write!(out, "Error Message: {}\r\n", kind.message());
            }
        }
        out.push_str("\r\n");

        out.into_bytes()
    }

    /// Parses a response block. The inverse of [Response::to_bytes]; used by
    /// tests and tooling that need more than the raw text.
    pub fn parse(text: &str) -> Result<Response, ParseError> {
        let mut lines = text.split("\r\n").filter(|line| !line.is_empty());

        let status = lines.next().unwrap_or_default();
        let success = match status {
            "Success!" => true,
            "Error" => false,
            other => return Err(ParseError::UnknownStatus(other.to_string())),
        };

        let mut source = None;
        let mut node_hash = None;
        let mut destination = None;
        let mut nodes_visited = None;
        let mut kind = None;

        for line in lines {
            let (name, value) = line
                .split_once(": ")
                .ok_or_else(|| ParseError::MalformedLine(line.to_string()))?;

            match name {
                "Source" => source = Some(parse_addr(value)?),
                "Destination" => destination = Some(parse_addr(value)?),
                "Node Hash" => node_hash = Some(parse_id(value)?),
                "Nodes Visited" => {
                    let count = value
                        .parse()
                        .map_err(|_| ParseError::InvalidHopCount(value.to_string()))?;
                    nodes_visited = Some(count);
                }
                // `Key: k\nValue: v\nKey Hash: h` is one wire line with
                // inner newlines.
                "Key" => kind = Some(parse_success_payload(value)?),
                "Error Message" => kind = Some(ResponseKind::Error(error_kind_of(value))),
                _ => return Err(ParseError::MalformedLine(line.to_string())),
            }
        }

        let kind = kind.ok_or(ParseError::MissingHeader(if success {
            "Key"
        } else {
            "Error Message"
        }))?;

        Ok(Response {
            kind,
            source: source.ok_or(ParseError::MissingHeader("Source"))?,
            node_hash: node_hash.ok_or(ParseError::MissingHeader("Node Hash"))?,
            destination: destination.ok_or(ParseError::MissingHeader("Destination"))?,
            nodes_visited: nodes_visited.ok_or(ParseError::MissingHeader("Nodes Visited"))?,
        })
    }
}

fn parse_addr(value: &str) -> Result<PeerAddr, ParseError> {
    value
        .parse()
        .map_err(|_| ParseError::MalformedAddress(value.to_string()))
}

fn parse_id(value: &str) -> Result<Id, ParseError> {
    Id::from_decimal(value).ok_or_else(|| ParseError::InvalidIdentity(value.to_string()))
}

fn parse_success_payload(value: &str) -> Result<ResponseKind, ParseError> {
    let mut parts = value.split('\n');

    let key = parts.next().unwrap_or_default().to_string();
    let value_line = parts
        .next()
        .and_then(|line| line.strip_prefix("Value: "))
        .ok_or(ParseError::MissingHeader("Value"))?;
    let key_hash = parts
        .next()
        .and_then(|line| line.strip_prefix("Key Hash: "))
        .ok_or(ParseError::MissingHeader("Key Hash"))?;

    let value = if value_line == EMPTY_VALUE {
        None
    } else {
        Some(value_line.to_string())
    };

    Ok(ResponseKind::Success {
        key,
        value,
        key_hash: parse_id(key_hash)?,
    })
}

fn error_kind_of(message: &str) -> ErrorKind {
    [
        ErrorKind::BadRequest,
        ErrorKind::NotFound,
        ErrorKind::NotImplemented,
    ]
    .into_iter()
    .find(|kind| kind.message() == message)
    .unwrap_or(ErrorKind::Internal)
}
