#![doc = include_str!("../README.md")]

mod client;
mod common;
mod error;
mod node;
pub mod router;
pub mod rpc;
pub mod server;

pub use client::{Client, ClientError};
pub use common::messages;
pub use common::{FingerEntry, FingerTable, Id, LocalNode, PeerAddr, Ring, ID_BITS, ID_SIZE};
pub use error::Error;
pub use node::{Info, Node, NodeWasShutdown};
pub use router::{KeyLocation, Resolution, Router};
pub use rpc::{Config, DEFAULT_REQUEST_TIMEOUT};

/// Alias for the crate's standard result type.
pub type Result<T, E = Error> = core::result::Result<T, E>;
