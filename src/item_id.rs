//! Identity of a single element ever inserted into an ordered list.

use std::cmp::Ordering;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::peer_id::PeerId;

/// A logical (Lamport) timestamp: a peer's local event counter.
pub type LogicalTimestamp = u64;

/// `(logical_ts, peer_id)`, totally ordered first by timestamp, then by peer.
///
/// Within one peer, ids are strictly increasing in `logical_ts`. Across
/// peers, the order is consistent with causality: if `a` happened-before
/// `b`, then `a < b`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ItemId {
    pub logical_ts: LogicalTimestamp,
    pub peer_id: PeerId,
}

impl ItemId {
    pub fn new(logical_ts: LogicalTimestamp, peer_id: PeerId) -> ItemId {
        return ItemId { logical_ts, peer_id };
    }
}

impl std::fmt::Debug for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        return write!(f, "ItemId({}@{})", self.logical_ts, self.peer_id);
    }
}

impl PartialOrd for ItemId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        return Some(self.cmp(other));
    }
}

impl Ord for ItemId {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.logical_ts.cmp(&other.logical_ts) {
            Ordering::Equal => self.peer_id.cmp(&other.peer_id),
            order => order,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer(n: u8) -> PeerId {
        let mut bytes = [0u8; 32];
        bytes[31] = n;
        PeerId(bytes)
    }

    #[test]
    fn orders_by_timestamp_first() {
        let a = ItemId::new(1, peer(9));
        let b = ItemId::new(2, peer(0));
        assert!(a < b);
    }

    #[test]
    fn ties_broken_by_peer_id() {
        let a = ItemId::new(5, peer(1));
        let b = ItemId::new(5, peer(2));
        assert!(a < b);
        assert_ne!(a, b);
    }

    #[test]
    fn equal_fields_are_equal() {
        let a = ItemId::new(5, peer(1));
        let b = ItemId::new(5, peer(1));
        assert_eq!(a, b);
    }
}
