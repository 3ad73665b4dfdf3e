//! Orchestrates one replica: owns the local clocks, the list, the
//! outbound send buffer, and per-origin inbound buffers, and runs the
//! causal delivery loop that drains buffered ops once their dependencies
//! are satisfied.

use std::collections::VecDeque;

use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use crate::error::Error;
use crate::item_id::{ItemId, LogicalTimestamp};
use crate::list::OrderedList;
use crate::op::{Message, Op};
use crate::peer_id::PeerId;
use crate::peer_matrix::PeerMatrix;

/// A single replica of the shared [`OrderedList`].
pub struct Peer<V> {
    peer_id: PeerId,
    logical_ts: LogicalTimestamp,
    matrix: PeerMatrix,
    list: OrderedList<V>,
    outbound: Vec<Op<V>>,
    inbound: FxHashMap<PeerId, VecDeque<Op<V>>>,
}

impl<V> Peer<V> {
    pub fn new(peer_id: PeerId) -> Peer<V> {
        Peer {
            peer_id,
            logical_ts: 0,
            matrix: PeerMatrix::new(peer_id),
            list: OrderedList::new(),
            outbound: Vec::new(),
            inbound: FxHashMap::default(),
        }
    }

    pub fn peer_id(&self) -> PeerId {
        return self.peer_id;
    }

    pub fn list(&self) -> &OrderedList<V> {
        return &self.list;
    }

    /// Advance the local Lamport clock for a new local event and return
    /// this peer's identity for it.
    pub fn next_id(&mut self) -> ItemId {
        self.logical_ts += 1;
        return ItemId::new(self.logical_ts, self.peer_id);
    }

    /// True if a flush (`make_message`) would produce a non-empty message.
    pub fn has_pending_outbound(&self) -> bool {
        return !self.outbound.is_empty() || self.matrix.has_pending_clock_update();
    }

    /// Queue `op` for the next outbound message, first flushing any pending
    /// clock-update diff so it precedes the op whose dependencies it
    /// declares.
    fn send_operation(&mut self, op: Op<V>) {
        self.flush_pending_clock_update();
        self.outbound.push(op);
    }

    fn flush_pending_clock_update(&mut self) {
        if self.matrix.has_pending_clock_update() {
            let update = self.matrix.peek_clock_update();
            self.outbound.push(Op::ClockUpdate(update));
            self.matrix.reset_clock_update();
        }
    }

    /// Package and clear the outbound buffer as a [`Message`] ready to send.
    pub fn make_message(&mut self) -> Message<V> {
        self.flush_pending_clock_update();
        let msg_count = self.matrix.increment_sent_messages();
        let operations = std::mem::take(&mut self.outbound);
        trace!(count = operations.len(), msg_count, "flushed outbound message");
        return Message {
            origin_peer_id: self.peer_id,
            msg_count,
            operations,
        };
    }
}

impl<V: Clone> Peer<V> {
    pub fn to_sequence(&self) -> Vec<V> {
        return self.list.to_sequence();
    }

    /// Insert `value` at visible position `index` and queue the resulting
    /// op for replication.
    pub fn insert(&mut self, index: usize, value: V) {
        let new_id = self.next_id();
        let op = self.list.insert(index, value, new_id);
        self.send_operation(op);
    }

    /// Tombstone the visible element at `index` and queue the resulting op
    /// for replication.
    pub fn delete(&mut self, index: usize) {
        let delete_ts = self.next_id();
        let op = self.list.delete(index, delete_ts);
        self.send_operation(op);
    }

    /// Buffer an inbound message's ops under their origin and drain
    /// whatever is now causally ready.
    pub fn process_message(&mut self, message: Message<V>) -> Result<(), Error> {
        let origin = message.origin_peer_id;
        let queue = self.inbound.entry(origin).or_default();
        queue.extend(message.operations);
        queue.push_back(Op::MessageProcessed {
            msg_count: message.msg_count,
        });
        return self.drain_ready();
    }

    /// Repeatedly dispatch ops from whichever buffered origin is causally
    /// ready, until none are. A `ClockUpdate` may change readiness of other
    /// buffered origins, so the outer scan restarts after every one applied.
    fn drain_ready(&mut self) -> Result<(), Error> {
        loop {
            let ready_origin = self
                .inbound
                .iter()
                .find(|(origin, queue)| !queue.is_empty() && self.matrix.causally_ready(**origin))
                .map(|(origin, _)| *origin);

            let Some(origin) = ready_origin else {
                break;
            };

            let span = tracing::debug_span!("deliver", origin = %origin);
            let _enter = span.enter();

            loop {
                let op = match self.inbound.get_mut(&origin).and_then(|q| q.pop_front()) {
                    Some(op) => op,
                    None => break,
                };
                match &op {
                    Op::ClockUpdate(update) => {
                        self.matrix.apply_clock_update(origin, update)?;
                        trace!("applied clock update, re-checking readiness");
                        break;
                    }
                    Op::MessageProcessed { msg_count } => {
                        self.matrix.processed_incoming_msg(origin, *msg_count)?;
                        debug!(msg_count, "origin queue drained through message boundary");
                    }
                    Op::Insert { new_id, .. } => {
                        self.logical_ts = self.logical_ts.max(new_id.logical_ts);
                        self.list.apply_operation(origin, &op)?;
                    }
                    Op::Delete { delete_ts, .. } => {
                        self.logical_ts = self.logical_ts.max(delete_ts.logical_ts);
                        self.list.apply_operation(origin, &op)?;
                    }
                }
            }
        }
        return Ok(());
    }
}
