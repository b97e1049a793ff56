use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::common::PeerAddr;
use crate::{Error, Result};

/// Fixed wait for the client's single outstanding request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(3);

/// Node configuration: the full static membership and which entry is "me".
///
/// Built once at process start; the ring has no join or leave, so nothing
/// here changes afterward.
#[derive(Debug, Clone)]
pub struct Config {
    /// All ring members, in the order they were configured.
    pub peers: Vec<PeerAddr>,
    /// Zero-based position of this node in `peers`.
    pub local_index: usize,
}

impl Config {
    pub fn new(peers: Vec<PeerAddr>, local_index: usize) -> Result<Config> {
        if peers.is_empty() {
            return Err(Error::EmptyPeerList);
        }
        if local_index >= peers.len() {
            return Err(Error::LocalIndexOutOfRange {
                index: local_index,
                len: peers.len(),
            });
        }

        Ok(Config { peers, local_index })
    }

    /// Loads a membership file: one `host port` pair per line, blank lines
    /// ignored.
    pub fn from_peer_file(path: impl AsRef<Path>, local_index: usize) -> Result<Config> {
        let contents = fs::read_to_string(path)?;

        let peers = contents
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(str::parse)
            .collect::<Result<Vec<PeerAddr>>>()?;

        Config::new(peers, local_index)
    }
}
