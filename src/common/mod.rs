//! Types shared across the crate.

mod finger;
mod id;
pub mod messages;
mod ring;

pub use finger::{FingerEntry, FingerTable};
pub use id::{Id, ID_BITS, ID_SIZE};
pub use ring::{LocalNode, PeerAddr, Ring};
