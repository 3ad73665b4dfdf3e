//! A replicated ordered list CRDT: an RGA-style sequence, a compact
//! per-peer vector clock matrix, and a causal delivery engine that ties
//! the two together.
//!
//! # Quick Start
//!
//! ```
//! use causal_rga::{Peer, PeerId};
//!
//! let mut alice = Peer::new(PeerId::from_bytes([1; 32]));
//! let mut bob = Peer::new(PeerId::from_bytes([2; 32]));
//!
//! alice.insert(0, 'h');
//! alice.insert(1, 'i');
//! bob.process_message(alice.make_message()).unwrap();
//!
//! assert_eq!(bob.to_sequence(), vec!['h', 'i']);
//! ```
//!
//! Encoding messages onto a wire, transporting them, and persisting state
//! to disk are all left to the embedding application; this crate only
//! defines the replicated data structure and the causal-delivery state
//! machine around it.

pub mod error;
pub mod item_id;
pub mod list;
pub mod op;
pub mod peer;
pub mod peer_id;
pub mod peer_matrix;

pub use error::Error;
pub use item_id::{ItemId, LogicalTimestamp};
pub use list::OrderedList;
pub use op::{Message, Op};
pub use peer::Peer;
pub use peer_id::PeerId;
pub use peer_matrix::{ClockUpdate, PeerIndex, PeerMatrix, PeerVClockEntry};
