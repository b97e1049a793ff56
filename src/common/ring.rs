//! Static ring membership, built once from the configured peer list.

use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, ToSocketAddrs};
use std::str::FromStr;

use crate::common::Id;
use crate::{Error, Result};

/// A peer as written in the membership list: the literal `host port` pair
/// used to address it on the wire and in message headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerAddr {
    pub host: String,
    pub port: u16,
}

impl PeerAddr {
    pub fn new(host: impl Into<String>, port: u16) -> PeerAddr {
        PeerAddr {
            host: host.into(),
            port,
        }
    }

    /// Resolves the host to the IPv4 address its identity is hashed from.
    pub fn resolve_ipv4(&self) -> Result<Ipv4Addr> {
        let addrs = (self.host.as_str(), self.port).to_socket_addrs()?;

        for addr in addrs {
            if let SocketAddr::V4(v4) = addr {
                return Ok(*v4.ip());
            }
        }

        Err(Error::UnresolvableHost(self.host.clone()))
    }

    /// Resolves to a sendable socket address.
    pub fn to_socket_addr(&self) -> Result<SocketAddrV4> {
        Ok(SocketAddrV4::new(self.resolve_ipv4()?, self.port))
    }

    /// This peer's position on the ring.
    pub fn identity(&self) -> Result<Id> {
        Ok(Id::from_addr(self.resolve_ipv4()?, self.port))
    }
}

impl Display for PeerAddr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.host, self.port)
    }
}

/// Parses a `host port` pair, the format of membership file lines and of
/// `Source`/`Destination` headers.
impl FromStr for PeerAddr {
    type Err = Error;

    fn from_str(s: &str) -> Result<PeerAddr> {
        let mut tokens = s.split_whitespace();

        match (tokens.next(), tokens.next(), tokens.next()) {
            (Some(host), Some(port), None) => {
                let port = port
                    .parse()
                    .map_err(|_| Error::InvalidPeerEntry(s.to_string()))?;
                Ok(PeerAddr::new(host, port))
            }
            _ => Err(Error::InvalidPeerEntry(s.to_string())),
        }
    }
}

/// The local node's place on the ring, fixed at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalNode {
    pub id: Id,
    pub successor: Id,
    pub predecessor: Id,
}

/// All configured peers hashed onto the ring: the sorted identities, the
/// mapping back to wire addresses, and the local node's successor and
/// predecessor. Immutable after construction; there is no join or leave.
#[derive(Debug, Clone)]
pub struct Ring {
    ids: Vec<Id>,
    addresses: HashMap<Id, PeerAddr>,
    local: LocalNode,
}

impl Ring {
    /// Hashes every peer, sorts the identities, and locates the local node
    /// by its position in the original list order.
    ///
    /// Two peers hashing to the same identity is refused outright; routing
    /// over a ring with colliding members has no meaning.
    pub fn new(peers: &[PeerAddr], local_index: usize) -> Result<Ring> {
        if peers.is_empty() {
            return Err(Error::EmptyPeerList);
        }
        let local = peers.get(local_index).ok_or(Error::LocalIndexOutOfRange {
            index: local_index,
            len: peers.len(),
        })?;
        let local_id = local.identity()?;

        let mut ids = Vec::with_capacity(peers.len());
        let mut addresses = HashMap::with_capacity(peers.len());

        for peer in peers {
            let id = peer.identity()?;
            if let Some(previous) = addresses.insert(id, peer.clone()) {
                return Err(Error::IdentityCollision(
                    previous.to_string(),
                    peer.to_string(),
                ));
            }
            ids.push(id);
        }
        ids.sort_unstable();

        let local = LocalNode {
            id: local_id,
            successor: successor_in(&ids, &local_id),
            predecessor: predecessor_in(&ids, &local_id),
        };

        Ok(Ring {
            ids,
            addresses,
            local,
        })
    }

    // === Getters ===

    /// The local node's identity, successor and predecessor.
    pub fn local(&self) -> &LocalNode {
        &self.local
    }

    /// All member identities, ascending.
    pub fn ids(&self) -> &[Id] {
        &self.ids
    }

    /// Number of ring members, which is also the hop budget.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// The wire address of a member identity.
    pub fn address_of(&self, id: &Id) -> Option<&PeerAddr> {
        self.addresses.get(id)
    }

    // === Public Methods ===

    /// The next identity clockwise from `id`, wrapping from last to first.
    pub fn successor_of(&self, id: &Id) -> Id {
        successor_in(&self.ids, id)
    }

    /// The previous identity counter-clockwise from `id`, wrapping from
    /// first to last.
    pub fn predecessor_of(&self, id: &Id) -> Id {
        predecessor_in(&self.ids, id)
    }

    #[cfg(test)]
    /// Builds a ring from raw identities, bypassing address hashing, so
    /// tests can shape arcs precisely.
    pub(crate) fn with_identities(pairs: Vec<(Id, PeerAddr)>, local_id: Id) -> Ring {
        let mut ids: Vec<Id> = pairs.iter().map(|(id, _)| *id).collect();
        ids.sort_unstable();
        let addresses = pairs.into_iter().collect();

        let local = LocalNode {
            id: local_id,
            successor: successor_in(&ids, &local_id),
            predecessor: predecessor_in(&ids, &local_id),
        };

        Ring {
            ids,
            addresses,
            local,
        }
    }
}

/// `ids` must be sorted and non-empty.
fn successor_in(ids: &[Id], id: &Id) -> Id {
    match ids.binary_search(id) {
        Ok(index) => ids[(index + 1) % ids.len()],
        Err(index) => ids[index % ids.len()],
    }
}

/// `ids` must be sorted and non-empty.
fn predecessor_in(ids: &[Id], id: &Id) -> Id {
    let index = match ids.binary_search(id) {
        Ok(index) => index,
        Err(index) => index,
    };

    if index == 0 {
        ids[ids.len() - 1]
    } else {
        ids[index - 1]
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn localhost_peers(count: usize) -> Vec<PeerAddr> {
        (0..count)
            .map(|i| PeerAddr::new("127.0.0.1", 7400 + i as u16))
            .collect()
    }

    #[test]
    fn parse_peer_addr() {
        let peer: PeerAddr = "127.0.0.1 8000".parse().unwrap();
        assert_eq!(peer, PeerAddr::new("127.0.0.1", 8000));

        // Whitespace-tolerant, as membership file lines are.
        let peer: PeerAddr = "  localhost   9000 ".parse().unwrap();
        assert_eq!(peer, PeerAddr::new("localhost", 9000));

        assert!("127.0.0.1".parse::<PeerAddr>().is_err());
        assert!("127.0.0.1 notaport".parse::<PeerAddr>().is_err());
        assert!("127.0.0.1 8000 extra".parse::<PeerAddr>().is_err());
    }

    #[test]
    fn peer_addr_round_trips_through_display() {
        let peer = PeerAddr::new("10.0.0.7", 4242);
        assert_eq!(peer.to_string().parse::<PeerAddr>().unwrap(), peer);
    }

    #[test]
    fn membership_produces_distinct_sorted_identities() {
        let peers = localhost_peers(8);
        let ring = Ring::new(&peers, 3).unwrap();

        assert_eq!(ring.len(), 8);
        for window in ring.ids().windows(2) {
            assert!(window[0] < window[1]);
        }
        for peer in &peers {
            let id = peer.identity().unwrap();
            assert_eq!(ring.address_of(&id), Some(peer));
        }
    }

    #[test]
    fn ring_closure() {
        let peers = localhost_peers(5);

        for local_index in 0..peers.len() {
            let ring = Ring::new(&peers, local_index).unwrap();
            let start = ring.local().id;

            let mut cursor = start;
            for _ in 0..ring.len() {
                cursor = ring.successor_of(&cursor);
            }
            assert_eq!(cursor, start, "following successors N times returns");

            let mut cursor = start;
            for _ in 0..ring.len() {
                cursor = ring.predecessor_of(&cursor);
            }
            assert_eq!(cursor, start, "following predecessors N times returns");
        }
    }

    #[test]
    fn successor_and_predecessor_are_inverse() {
        let ring = Ring::new(&localhost_peers(6), 0).unwrap();

        for id in ring.ids() {
            assert_eq!(ring.predecessor_of(&ring.successor_of(id)), *id);
            assert_eq!(ring.successor_of(&ring.predecessor_of(id)), *id);
        }
    }

    #[test]
    fn single_member_is_its_own_neighbors() {
        let ring = Ring::new(&localhost_peers(1), 0).unwrap();
        let local = ring.local();

        assert_eq!(local.successor, local.id);
        assert_eq!(local.predecessor, local.id);
    }

    #[test]
    fn rejects_bad_construction() {
        assert!(matches!(Ring::new(&[], 0), Err(Error::EmptyPeerList)));

        let peers = localhost_peers(3);
        assert!(matches!(
            Ring::new(&peers, 3),
            Err(Error::LocalIndexOutOfRange { index: 3, len: 3 })
        ));

        // The same peer twice collides with itself.
        let mut duplicated = localhost_peers(2);
        duplicated.push(duplicated[0].clone());
        assert!(matches!(
            Ring::new(&duplicated, 0),
            Err(Error::IdentityCollision(..))
        ));
    }

    #[test]
    fn synthetic_ring_neighbors() {
        let pairs: Vec<(Id, PeerAddr)> = [100u64, 200, 300]
            .iter()
            .enumerate()
            .map(|(i, raw)| (Id::from_u64(*raw), PeerAddr::new("127.0.0.1", 7400 + i as u16)))
            .collect();
        let ring = Ring::with_identities(pairs, Id::from_u64(200));

        assert_eq!(ring.local().predecessor, Id::from_u64(100));
        assert_eq!(ring.local().successor, Id::from_u64(300));
        assert_eq!(ring.successor_of(&Id::from_u64(300)), Id::from_u64(100));
        assert_eq!(ring.predecessor_of(&Id::from_u64(100)), Id::from_u64(300));
    }
}
