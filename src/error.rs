//! Main crate error

#[derive(thiserror::Error, Debug)]
/// Chord crate error enum.
pub enum Error {
    #[error(transparent)]
    /// Transparent [std::io::Error]
    Io(#[from] std::io::Error),

    /// The membership list has no entries.
    #[error("peer list is empty")]
    EmptyPeerList,

    /// A membership entry was not a `host port` pair.
    #[error("malformed peer entry: {0:?}")]
    InvalidPeerEntry(String),

    /// The configured "this is me" index does not name a peer list line.
    #[error("local index {index} out of range for {len} peers")]
    LocalIndexOutOfRange { index: usize, len: usize },

    /// A peer's host did not resolve to an IPv4 address.
    #[error("could not resolve {0:?} to an IPv4 address")]
    UnresolvableHost(String),

    /// Two configured peers hashed to the same ring identity.
    #[error("identity collision between peers {0:?} and {1:?}")]
    IdentityCollision(String, String),
}
