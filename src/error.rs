//! Typed protocol-violation errors.
//!
//! These are distinct from programmer errors (out-of-range index, reusing a
//! consumed `ClockUpdate`, ...), which remain `panic!`/`assert!` because they
//! indicate a bug in the caller rather than a misbehaving remote peer.

use thiserror::Error;

use crate::peer_id::PeerId;

/// A protocol violation observed while applying a message or clock update
/// from some remote peer. Every variant carries the offending peer and the
/// expected-vs-actual values so the failure is self-describing in logs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// `origin` already mapped `index` to a different peer than the one now claimed.
    #[error("{origin} claims index {index} maps to {claimed}, but it was already mapped to {existing}")]
    ContradictoryMapping {
        origin: PeerId,
        index: u32,
        existing: PeerId,
        claimed: PeerId,
    },

    /// `origin` assigned an index that skips ahead of its next sequential slot.
    #[error("{origin} assigned non-consecutive index {index}, expected {expected}")]
    NonConsecutiveIndex {
        origin: PeerId,
        index: u32,
        expected: u32,
    },

    /// `origin` introduced a new index without supplying the peer id it names.
    #[error("{origin} introduced index {index} without a peer id")]
    NewIndexMissingId { origin: PeerId, index: u32 },

    /// A clock update moved `subject`'s count backwards as observed by `origin`.
    #[error("{origin} reports {subject}'s clock went from {previous} to {attempted}")]
    ClockWentBackwards {
        origin: PeerId,
        subject: PeerId,
        previous: u64,
        attempted: u64,
    },

    /// An inbound message's `msg_count` is less than or equal to one already processed.
    #[error("{origin} sent msg_count {attempted}, but {previous} was already processed")]
    MsgCountBackwards {
        origin: PeerId,
        previous: u64,
        attempted: u64,
    },

    /// An inbound message's `msg_count` skipped ahead of the expected next value.
    #[error("{origin} sent msg_count {attempted}, expected {expected}")]
    MsgCountJumped {
        origin: PeerId,
        expected: u64,
        attempted: u64,
    },

    /// An index used by `origin` has no known mapping to a peer id.
    #[error("{origin} used unknown remote index {index}")]
    UnknownRemoteIndex { origin: PeerId, index: u32 },

    /// An `InsertOp`/`DeleteOp` referenced an item id the local list has not seen.
    #[error("{origin} referenced unknown item {reference:?}")]
    UnknownReference {
        origin: PeerId,
        reference: crate::item_id::ItemId,
    },

    /// The same item id was produced by two distinct insert operations.
    #[error("{origin} reused item id {id:?} which already exists")]
    DuplicateItemId {
        origin: PeerId,
        id: crate::item_id::ItemId,
    },
}
