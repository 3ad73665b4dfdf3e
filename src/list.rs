//! A replicated growable array: an ordered list where every element carries
//! a stable identity, concurrent inserts at the same anchor resolve
//! deterministically, and deletions are tombstones rather than removals.
//!
//! Nodes live in a flat arena (`Vec<Node<V>>`) linked by `prev`/`next`
//! indices rather than as an owned linked list, so there is no pointer
//! juggling on insert/delete and an `ItemId -> arena index` table gives
//! O(1) lookup by id.

use rustc_hash::FxHashMap;

use crate::error::Error;
use crate::item_id::ItemId;
use crate::op::Op;
use crate::peer_id::PeerId;

#[derive(Clone, Debug)]
struct Node<V> {
    id: ItemId,
    value: V,
    deleted: bool,
    /// The id this node was inserted after, retained so that later
    /// concurrent siblings of the same anchor can be tie-broken against it.
    reference_id: Option<ItemId>,
    prev: Option<usize>,
    next: Option<usize>,
}

/// An RGA-ordered sequence of `V`, addressable by visible position and by
/// stable [`ItemId`].
#[derive(Debug, Default)]
pub struct OrderedList<V> {
    nodes: Vec<Node<V>>,
    head: Option<usize>,
    index: FxHashMap<ItemId, usize>,
    visible_len: usize,
}

impl<V> OrderedList<V> {
    pub fn new() -> OrderedList<V> {
        return OrderedList {
            nodes: Vec::new(),
            head: None,
            index: FxHashMap::default(),
            visible_len: 0,
        };
    }

    /// Number of non-deleted elements.
    pub fn len(&self) -> usize {
        return self.visible_len;
    }

    pub fn is_empty(&self) -> bool {
        return self.visible_len == 0;
    }

    /// True if some node (live or deleted) carries this id.
    pub fn contains_id(&self, id: &ItemId) -> bool {
        return self.index.contains_key(id);
    }

    fn nth_visible(&self, n: usize) -> usize {
        let mut cursor = self.head;
        let mut seen = 0;
        while let Some(c) = cursor {
            if !self.nodes[c].deleted {
                if seen == n {
                    return c;
                }
                seen += 1;
            }
            cursor = self.nodes[c].next;
        }
        panic!("visible index {} out of bounds (len {})", n, self.visible_len);
    }

    /// Insert `value` at visible position `index`, minting its identity as
    /// `new_id`. `index` must be in `[0, len()]`; out of range is a
    /// programmer error.
    pub fn insert(&mut self, index: usize, value: V, new_id: ItemId) -> Op<V>
    where
        V: Clone,
    {
        assert!(
            index <= self.visible_len,
            "insert index {} out of bounds (len {})",
            index,
            self.visible_len
        );
        let reference_id = if index == 0 {
            None
        } else {
            Some(self.nodes[self.nth_visible(index - 1)].id)
        };
        self.splice_after(new_id.peer_id, reference_id, new_id, value.clone())
            .expect("a freshly minted local id cannot violate protocol invariants");
        return Op::Insert {
            reference_id,
            new_id,
            value,
        };
    }

    /// Tombstone the visible element at `index`. `index` must be in
    /// `[0, len())`; out of range is a programmer error. `delete_ts` is a
    /// fresh id minted purely to advance the issuing peer's clock.
    pub fn delete(&mut self, index: usize, delete_ts: ItemId) -> Op<V> {
        assert!(
            index < self.visible_len,
            "delete index {} out of bounds (len {})",
            index,
            self.visible_len
        );
        let arena_idx = self.nth_visible(index);
        let delete_id = self.nodes[arena_idx].id;
        self.nodes[arena_idx].deleted = true;
        self.visible_len -= 1;
        return Op::Delete {
            delete_id,
            delete_ts,
        };
    }

    /// Apply a remote (or already-validated local) insert/delete. Only
    /// `Op::Insert`/`Op::Delete` are meaningful here; routing a control op
    /// through the list is a caller bug, not a protocol violation.
    pub fn apply_operation(&mut self, origin: PeerId, op: &Op<V>) -> Result<(), Error>
    where
        V: Clone,
    {
        match op {
            Op::Insert {
                reference_id,
                new_id,
                value,
            } => {
                self.splice_after(origin, *reference_id, *new_id, value.clone())?;
                return Ok(());
            }
            Op::Delete { delete_id, .. } => {
                let arena_idx = *self
                    .index
                    .get(delete_id)
                    .ok_or(Error::UnknownReference {
                        origin,
                        reference: *delete_id,
                    })?;
                if !self.nodes[arena_idx].deleted {
                    self.nodes[arena_idx].deleted = true;
                    self.visible_len -= 1;
                }
                return Ok(());
            }
            Op::ClockUpdate(_) | Op::MessageProcessed { .. } => {
                panic!("OrderedList::apply_operation received a control op; Peer must dispatch those itself")
            }
        }
    }

    /// Materialize the current visible sequence.
    pub fn to_sequence(&self) -> Vec<V>
    where
        V: Clone,
    {
        let mut out = Vec::with_capacity(self.visible_len);
        let mut cursor = self.head;
        while let Some(c) = cursor {
            if !self.nodes[c].deleted {
                out.push(self.nodes[c].value.clone());
            }
            cursor = self.nodes[c].next;
        }
        return out;
    }

    /// RGA placement: insert a node identified by `new_id` after
    /// `reference_id`, skipping over any existing sibling (same
    /// `reference_id`) whose id sorts higher than `new_id`. This orders
    /// concurrent inserts at the same anchor by descending id, which is
    /// what makes placement deterministic regardless of delivery order.
    fn splice_after(
        &mut self,
        origin: PeerId,
        reference_id: Option<ItemId>,
        new_id: ItemId,
        value: V,
    ) -> Result<(), Error> {
        if self.index.contains_key(&new_id) {
            return Err(Error::DuplicateItemId {
                origin,
                id: new_id,
            });
        }
        let anchor_idx = match reference_id {
            None => None,
            Some(rid) => Some(*self.index.get(&rid).ok_or(Error::UnknownReference {
                origin,
                reference: rid,
            })?),
        };

        let mut prev = anchor_idx;
        let mut cursor = match anchor_idx {
            Some(a) => self.nodes[a].next,
            None => self.head,
        };
        while let Some(c) = cursor {
            let node = &self.nodes[c];
            if node.reference_id == reference_id && node.id > new_id {
                prev = Some(c);
                cursor = node.next;
            } else {
                break;
            }
        }

        let new_idx = self.nodes.len();
        self.nodes.push(Node {
            id: new_id,
            value,
            deleted: false,
            reference_id,
            prev,
            next: cursor,
        });
        match prev {
            Some(p) => self.nodes[p].next = Some(new_idx),
            None => self.head = Some(new_idx),
        }
        if let Some(c) = cursor {
            self.nodes[c].prev = Some(new_idx);
        }
        self.index.insert(new_id, new_idx);
        self.visible_len += 1;
        return Ok(());
    }
}
