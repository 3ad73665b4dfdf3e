//! Tracks the vector clocks of every known peer using locally assigned
//! small integer indices rather than exchanging full peer ids.
//!
//! Each peer independently decides how to number the peers it knows about,
//! so translating an index found in an incoming message requires asking
//! *that sender's* index table, not ours. [`PeerMatrix`] keeps one such
//! table per origin it has heard from, plus our own table used when we
//! originate entries.

use rustc_hash::FxHashMap;

use crate::error::Error;
use crate::peer_id::PeerId;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A small integer a peer uses in place of a full [`PeerId`] on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PeerIndex(pub u32);

/// One row of vector-clock knowledge: what some observer believes some
/// subject's locally assigned index and message count are.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PeerVClockEntry {
    pub peer_id: PeerId,
    pub peer_index: PeerIndex,
    pub msg_count: u64,
}

/// An ordered batch of [`PeerVClockEntry`] describing what changed in the
/// local vector clock since the last flush, or (on the receiving side) what
/// a remote peer reported about its own clock.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ClockUpdate(pub Vec<PeerVClockEntry>);

impl ClockUpdate {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn entries(&self) -> &[PeerVClockEntry] {
        &self.0
    }
}

/// Maps a single origin's locally assigned indices back to peer ids.
/// Indices are assigned sequentially starting at 0, mirroring a
/// get-or-insert interning table.
#[derive(Clone, Debug, Default)]
struct IndexTable {
    id_to_idx: FxHashMap<PeerId, PeerIndex>,
    idx_to_id: Vec<PeerId>,
}

impl IndexTable {
    fn get_or_insert(&mut self, peer_id: PeerId) -> PeerIndex {
        if let Some(&idx) = self.id_to_idx.get(&peer_id) {
            return idx;
        }
        let idx = PeerIndex(self.idx_to_id.len() as u32);
        self.idx_to_id.push(peer_id);
        self.id_to_idx.insert(peer_id, idx);
        idx
    }

    fn get_id(&self, idx: PeerIndex) -> Option<PeerId> {
        self.idx_to_id.get(idx.0 as usize).copied()
    }

    fn next_index(&self) -> PeerIndex {
        PeerIndex(self.idx_to_id.len() as u32)
    }
}

/// Tracks, for every peer we know about, how many messages we (or whoever
/// told us) believe that peer has sent.
#[derive(Debug, Default)]
pub struct PeerMatrix {
    own_peer_id: PeerId,
    /// How *we* number the peers we know about, used when authoring entries.
    own_index: IndexTable,
    /// `matrix[observer][subject] = msg_count`, as observed from `observer`.
    /// `matrix[own_peer_id]` is our own vector clock.
    matrix: FxHashMap<PeerId, FxHashMap<PeerId, u64>>,
    /// Per-origin index tables, as learned from that origin's clock updates.
    remote_index: FxHashMap<PeerId, IndexTable>,
    /// Entries changed since the last [`PeerMatrix::reset_clock_update`].
    pending: FxHashMap<PeerId, PeerVClockEntry>,
}

impl PeerMatrix {
    pub fn new(own_peer_id: PeerId) -> PeerMatrix {
        let mut matrix = FxHashMap::default();
        matrix.insert(own_peer_id, FxHashMap::default());
        let mut own_index = IndexTable::default();
        own_index.get_or_insert(own_peer_id);
        PeerMatrix {
            own_peer_id,
            own_index,
            matrix,
            remote_index: FxHashMap::default(),
            pending: FxHashMap::default(),
        }
    }

    pub fn own_peer_id(&self) -> PeerId {
        self.own_peer_id
    }

    /// Return (assigning if necessary) the index *we* use for `peer_id`.
    /// Assigning a new index creates row and column entries for that peer
    /// in the matrix and records the assignment in the pending local clock
    /// update.
    pub fn peer_id_to_index(&mut self, peer_id: PeerId) -> PeerIndex {
        if let Some(&index) = self.own_index.id_to_idx.get(&peer_id) {
            return index;
        }
        let index = self.own_index.get_or_insert(peer_id);
        self.matrix.entry(peer_id).or_default();
        let msg_count = *self
            .matrix
            .entry(self.own_peer_id)
            .or_default()
            .entry(peer_id)
            .or_insert(0);
        self.pending.insert(
            peer_id,
            PeerVClockEntry {
                peer_id,
                peer_index: index,
                msg_count,
            },
        );
        return index;
    }

    /// Translate an index as used by `origin_peer_id` back to a global id.
    pub fn remote_index_to_peer_id(
        &self,
        origin_peer_id: PeerId,
        remote_index: PeerIndex,
    ) -> Result<PeerId, Error> {
        self.remote_index
            .get(&origin_peer_id)
            .and_then(|t| t.get_id(remote_index))
            .ok_or(Error::UnknownRemoteIndex {
                origin: origin_peer_id,
                index: remote_index.0,
            })
    }

    /// Record that `origin` has assigned `subject_index` to `subject_id`.
    pub fn peer_index_mapping(
        &mut self,
        origin: PeerId,
        subject_id: Option<PeerId>,
        subject_index: PeerIndex,
    ) -> Result<(), Error> {
        let table = self.remote_index.entry(origin).or_default();
        if let Some(existing) = table.get_id(subject_index) {
            if let Some(claimed) = subject_id {
                if claimed != existing {
                    return Err(Error::ContradictoryMapping {
                        origin,
                        index: subject_index.0,
                        existing,
                        claimed,
                    });
                }
            }
            return Ok(());
        }
        let expected = table.next_index();
        if subject_index != expected {
            return Err(Error::NonConsecutiveIndex {
                origin,
                index: subject_index.0,
                expected: expected.0,
            });
        }
        let subject_id = subject_id.ok_or(Error::NewIndexMissingId {
            origin,
            index: subject_index.0,
        })?;
        table.get_or_insert(subject_id);
        Ok(())
    }

    /// Apply a batch of clock-knowledge updates received from `origin`.
    pub fn apply_clock_update(
        &mut self,
        origin: PeerId,
        update: &ClockUpdate,
    ) -> Result<(), Error> {
        for entry in &update.0 {
            self.peer_index_mapping(origin, Some(entry.peer_id), entry.peer_index)?;
            let row = self.matrix.entry(origin).or_default();
            let previous = *row.get(&entry.peer_id).unwrap_or(&0);
            if entry.msg_count < previous {
                return Err(Error::ClockWentBackwards {
                    origin,
                    subject: entry.peer_id,
                    previous,
                    attempted: entry.msg_count,
                });
            }
            row.insert(entry.peer_id, entry.msg_count);
        }
        Ok(())
    }

    /// Record that we just sent a message; returns the new send count.
    pub fn increment_sent_messages(&mut self) -> u64 {
        let row = self.matrix.entry(self.own_peer_id).or_default();
        let count = row.entry(self.own_peer_id).or_insert(0);
        *count += 1;
        *count
    }

    /// Record that we finished processing message `msg_count` from `origin`.
    pub fn processed_incoming_msg(&mut self, origin: PeerId, msg_count: u64) -> Result<(), Error> {
        let previous = *self
            .matrix
            .get(&self.own_peer_id)
            .and_then(|row| row.get(&origin))
            .unwrap_or(&0);
        if msg_count <= previous {
            return Err(Error::MsgCountBackwards {
                origin,
                previous,
                attempted: msg_count,
            });
        }
        if msg_count != previous + 1 {
            return Err(Error::MsgCountJumped {
                origin,
                expected: previous + 1,
                attempted: msg_count,
            });
        }
        self.matrix
            .entry(self.own_peer_id)
            .or_default()
            .insert(origin, msg_count);
        self.matrix
            .entry(origin)
            .or_default()
            .insert(origin, msg_count);

        let index = self.peer_id_to_index(origin);
        self.pending.insert(
            origin,
            PeerVClockEntry {
                peer_id: origin,
                peer_index: index,
                msg_count,
            },
        );
        Ok(())
    }

    /// True iff every peer (other than `remote_peer_id` itself) that either
    /// side knows about is at least as far along locally as remotely, i.e.
    /// delivering `remote_peer_id`'s next message would not skip ahead of a
    /// causal dependency we haven't seen yet.
    pub fn causally_ready(&self, remote_peer_id: PeerId) -> bool {
        let local_row = self.matrix.get(&self.own_peer_id);
        let remote_row = self.matrix.get(&remote_peer_id);

        let mut known: rustc_hash::FxHashSet<PeerId> = rustc_hash::FxHashSet::default();
        if let Some(row) = local_row {
            known.extend(row.keys().copied());
        }
        if let Some(row) = remote_row {
            known.extend(row.keys().copied());
        }

        for peer in known {
            if peer == remote_peer_id {
                continue;
            }
            let local_count = local_row.and_then(|r| r.get(&peer)).copied().unwrap_or(0);
            let remote_count = remote_row.and_then(|r| r.get(&peer)).copied().unwrap_or(0);
            if local_count < remote_count {
                return false;
            }
        }
        true
    }

    /// Snapshot the pending clock update without clearing it, so the caller
    /// can package it into an outbound message before discarding it with
    /// [`PeerMatrix::reset_clock_update`].
    pub fn peek_clock_update(&self) -> ClockUpdate {
        let mut entries: Vec<PeerVClockEntry> = self.pending.values().copied().collect();
        entries.sort_by_key(|e| e.peer_index);
        return ClockUpdate(entries);
    }

    /// Snapshot and clear the pending clock update in one step.
    pub fn take_clock_update(&mut self) -> ClockUpdate {
        let update = self.peek_clock_update();
        self.reset_clock_update();
        return update;
    }

    pub fn has_pending_clock_update(&self) -> bool {
        return !self.pending.is_empty();
    }

    /// Clear the pending diff, e.g. after it has already been packaged into
    /// an outbound message by the caller via `peek_clock_update`.
    pub fn reset_clock_update(&mut self) {
        self.pending.clear();
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
    fn own_index_is_sequential() {
        let mut m = PeerMatrix::new(peer(0));
        assert_eq!(m.peer_id_to_index(peer(1)), PeerIndex(1));
        assert_eq!(m.peer_id_to_index(peer(2)), PeerIndex(2));
        assert_eq!(m.peer_id_to_index(peer(1)), PeerIndex(1));
    }

    #[test]
    fn increment_sent_messages_counts_up() {
        let mut m = PeerMatrix::new(peer(0));
        assert_eq!(m.increment_sent_messages(), 1);
        assert_eq!(m.increment_sent_messages(), 2);
    }

    #[test]
    fn processed_incoming_msg_requires_consecutive_count() {
        let mut m = PeerMatrix::new(peer(0));
        assert!(m.processed_incoming_msg(peer(1), 1).is_ok());
        assert_eq!(
            m.processed_incoming_msg(peer(1), 3),
            Err(Error::MsgCountJumped {
                origin: peer(1),
                expected: 2,
                attempted: 3,
            })
        );
    }

    #[test]
    fn processed_incoming_msg_rejects_duplicates() {
        let mut m = PeerMatrix::new(peer(0));
        m.processed_incoming_msg(peer(1), 1).unwrap();
        assert_eq!(
            m.processed_incoming_msg(peer(1), 1),
            Err(Error::MsgCountBackwards {
                origin: peer(1),
                previous: 1,
                attempted: 1,
            })
        );
    }

    #[test]
    fn peer_index_mapping_rejects_non_consecutive() {
        let mut m = PeerMatrix::new(peer(0));
        let err = m
            .peer_index_mapping(peer(1), Some(peer(2)), PeerIndex(1))
            .unwrap_err();
        assert_eq!(
            err,
            Error::NonConsecutiveIndex {
                origin: peer(1),
                index: 1,
                expected: 0,
            }
        );
    }

    #[test]
    fn peer_index_mapping_rejects_contradiction() {
        let mut m = PeerMatrix::new(peer(0));
        m.peer_index_mapping(peer(1), Some(peer(2)), PeerIndex(0))
            .unwrap();
        let err = m
            .peer_index_mapping(peer(1), Some(peer(3)), PeerIndex(0))
            .unwrap_err();
        assert_eq!(
            err,
            Error::ContradictoryMapping {
                origin: peer(1),
                index: 0,
                existing: peer(2),
                claimed: peer(3),
            }
        );
    }

    #[test]
    fn apply_clock_update_rejects_regression() {
        let mut m = PeerMatrix::new(peer(0));
        let update = ClockUpdate(vec![PeerVClockEntry {
            peer_id: peer(2),
            peer_index: PeerIndex(0),
            msg_count: 5,
        }]);
        m.apply_clock_update(peer(1), &update).unwrap();

        let regressed = ClockUpdate(vec![PeerVClockEntry {
            peer_id: peer(2),
            peer_index: PeerIndex(0),
            msg_count: 3,
        }]);
        assert_eq!(
            m.apply_clock_update(peer(1), &regressed),
            Err(Error::ClockWentBackwards {
                origin: peer(1),
                subject: peer(2),
                previous: 5,
                attempted: 3,
            })
        );
    }

    #[test]
    fn causally_ready_when_no_other_dependencies_known() {
        let m = PeerMatrix::new(peer(0));
        assert!(m.causally_ready(peer(1)));
    }

    #[test]
    fn causally_ready_false_when_local_is_behind() {
        let mut m = PeerMatrix::new(peer(0));
        // remote peer 1 claims to know peer 2 is at count 3, we know nothing of peer 2.
        let update = ClockUpdate(vec![PeerVClockEntry {
            peer_id: peer(2),
            peer_index: PeerIndex(0),
            msg_count: 3,
        }]);
        m.apply_clock_update(peer(1), &update).unwrap();
        assert!(!m.causally_ready(peer(1)));
    }

    #[test]
    fn take_clock_update_drains_and_clears() {
        let mut m = PeerMatrix::new(peer(0));
        m.processed_incoming_msg(peer(1), 1).unwrap();
        assert!(m.has_pending_clock_update());
        let update = m.take_clock_update();
        assert_eq!(update.entries().len(), 1);
        assert!(!m.has_pending_clock_update());
    }

    #[test]
    fn remote_index_round_trips() {
        let mut m = PeerMatrix::new(peer(0));
        m.peer_index_mapping(peer(1), Some(peer(5)), PeerIndex(0))
            .unwrap();
        assert_eq!(
            m.remote_index_to_peer_id(peer(1), PeerIndex(0)),
            Ok(peer(5))
        );
        assert_eq!(
            m.remote_index_to_peer_id(peer(1), PeerIndex(1)),
            Err(Error::UnknownRemoteIndex {
                origin: peer(1),
                index: 1,
            })
        );
    }
}
