//! Key-to-node resolution over the static ring.

use crate::common::{FingerTable, Id, Ring};

/// Where a key lives relative to this node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyLocation {
    /// This node owns the key.
    Local,
    /// The best known next hop toward the key's owner.
    Remote(Id),
}

/// A resolved key: its placement and its hashed identity, echoed back in
/// responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub location: KeyLocation,
    pub key_hash: Id,
}

/// Pure routing decisions over the immutable ring and finger table.
#[derive(Debug, Clone)]
pub struct Router {
    ring: Ring,
    fingers: FingerTable,
}

impl Router {
    pub fn new(ring: Ring) -> Router {
        let fingers = FingerTable::build(&ring);

        Router { ring, fingers }
    }

    pub fn ring(&self) -> &Ring {
        &self.ring
    }

    pub fn fingers(&self) -> &FingerTable {
        &self.fingers
    }

    /// Resolves which node is responsible for `key`. Deterministic: the same
    /// ring and key always produce the same resolution.
    pub fn resolve(&self, key: &str) -> Resolution {
        let key_hash = Id::from_key(key);

        Resolution {
            location: self.locate(&key_hash),
            key_hash,
        }
    }

    /// Placement of an already-hashed identity.
    pub fn locate(&self, key_hash: &Id) -> KeyLocation {
        let local = self.ring.local();

        // A single-peer ring owns everything. Otherwise ownership is the
        // standard Chord arc (predecessor, local].
        if self.ring.len() == 1 || key_hash.in_interval_oc(&local.predecessor, &local.id) {
            return KeyLocation::Local;
        }

        if key_hash.in_interval_oc(&local.id, &local.successor) {
            return KeyLocation::Remote(local.successor);
        }

        let next = self
            .fingers
            .lookup(key_hash)
            .unwrap_or_else(|| self.fingers.closest_known(key_hash));

        KeyLocation::Remote(next)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::common::PeerAddr;

    fn synthetic_router(ids: &[u64], local: u64) -> Router {
        let pairs = ids
            .iter()
            .enumerate()
            .map(|(i, raw)| (Id::from_u64(*raw), PeerAddr::new("127.0.0.1", 7400 + i as u16)))
            .collect();
        Router::new(Ring::with_identities(pairs, Id::from_u64(local)))
    }

    #[test]
    fn single_peer_ring_owns_everything() {
        let router = synthetic_router(&[500], 500);

        for raw in [0u64, 1, 499, 500, 501, u64::MAX] {
            assert_eq!(router.locate(&Id::from_u64(raw)), KeyLocation::Local);
        }

        // Holds for real hashes too, per the single-peer short circuit.
        for key in ["a", "b", "anything at all"] {
            assert_eq!(router.resolve(key).location, KeyLocation::Local);
        }
    }

    #[test]
    fn three_node_ring_arcs() {
        // Sorted identities [A, B, C] = [100, 200, 300]; local node B.
        let router = synthetic_router(&[100, 200, 300], 200);

        // Keys in (A, B] are owned locally.
        assert_eq!(router.locate(&Id::from_u64(150)), KeyLocation::Local);
        assert_eq!(router.locate(&Id::from_u64(200)), KeyLocation::Local);

        // Keys in (B, C] belong to the immediate successor.
        assert_eq!(
            router.locate(&Id::from_u64(250)),
            KeyLocation::Remote(Id::from_u64(300))
        );
        assert_eq!(
            router.locate(&Id::from_u64(300)),
            KeyLocation::Remote(Id::from_u64(300))
        );

        // A is not local and not the successor; the finger table (or its
        // closest-known fallback) still names a next hop, never Local.
        let location = router.locate(&Id::from_u64(350));
        assert!(matches!(location, KeyLocation::Remote(_)));
        assert_ne!(location, KeyLocation::Remote(Id::from_u64(200)));
    }

    #[test]
    fn wrap_around_ownership() {
        // Local is the smallest identity; it owns the arc wrapping zero.
        let router = synthetic_router(&[100, 200, 300], 100);

        assert_eq!(router.locate(&Id::from_u64(301)), KeyLocation::Local);
        assert_eq!(router.locate(&Id::from_u64(50)), KeyLocation::Local);
        assert_eq!(router.locate(&Id::from_u64(100)), KeyLocation::Local);
        assert_eq!(
            router.locate(&Id::from_u64(150)),
            KeyLocation::Remote(Id::from_u64(200))
        );
    }

    #[test]
    fn resolution_is_deterministic() {
        let router = synthetic_router(&[100, 200, 300], 200);

        for key in ["alpha", "beta", "a key with spaces"] {
            let first = router.resolve(key);
            for _ in 0..3 {
                assert_eq!(router.resolve(key), first);
            }
        }
    }

    #[test]
    fn every_identity_routes_somewhere() {
        let router = synthetic_router(&[8, 12, 17, 48], 12);

        // No identity may fail to resolve; lookup misses fall back to
        // closest_known which always names a node.
        for raw in 0..256u64 {
            match router.locate(&Id::from_u64(raw)) {
                KeyLocation::Local => {}
                KeyLocation::Remote(node) => {
                    assert!(router.ring().address_of(&node).is_some());
                }
            }
        }
    }
}
