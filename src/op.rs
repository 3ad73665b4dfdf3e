//! The operation stream exchanged between peers.
//!
//! A [`Message`] carries an ordered sequence of [`Op`]s. Besides the two
//! list-mutating variants (`Insert`/`Delete`), the stream also carries
//! control ops so that clock bookkeeping happens at exactly the right point
//! relative to the data it protects: a `ClockUpdate` always precedes the
//! ops whose causal dependencies it declares, and `Processed` marks the
//! boundary between one inbound message's ops and the next.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::item_id::ItemId;
use crate::peer_id::PeerId;
use crate::peer_matrix::ClockUpdate;

/// A single operation against an [`crate::list::OrderedList`], or a piece of
/// control-plane bookkeeping interleaved into the same stream.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Op<V> {
    /// Insert `value` immediately after `reference_id` (or at the head, if
    /// `reference_id` is `None`), minting identity `new_id`.
    Insert {
        reference_id: Option<ItemId>,
        new_id: ItemId,
        value: V,
    },
    /// Tombstone the element identified by `delete_id`. `delete_ts` is a
    /// fresh id minted at the deleting peer purely to advance its Lamport
    /// clock and give the delete event its own identity.
    Delete {
        delete_id: ItemId,
        delete_ts: ItemId,
    },
    /// A batch of vector-clock knowledge the sender accumulated since its
    /// last message, to be applied before the ops that follow.
    ClockUpdate(ClockUpdate),
    /// Marks that the sender's message numbered `msg_count` has been fully
    /// enqueued; causal bookkeeping for that message happens here.
    MessageProcessed { msg_count: u64 },
}

/// One unit of replication: everything a peer sent in a single flush.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Message<V> {
    pub origin_peer_id: PeerId,
    pub msg_count: u64,
    pub operations: Vec<Op<V>>,
}
