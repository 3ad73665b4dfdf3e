//! The globally unique identity of a peer.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A 256-bit opaque peer identifier.
///
/// The core never generates these itself (random generation is an external
/// collaborator's job); it only compares, orders, and hex-formats them.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PeerId(pub [u8; 32]);

impl PeerId {
    /// Build a peer id directly from 32 bytes, e.g. produced by an external
    /// random source or key-derivation step.
    pub const fn from_bytes(bytes: [u8; 32]) -> PeerId {
        return PeerId(bytes);
    }

    /// The raw bytes of this id.
    pub fn as_bytes(&self) -> &[u8; 32] {
        return &self.0;
    }

    fn hex(&self) -> String {
        return self.0.iter().map(|b| format!("{:02x}", b)).collect();
    }
}

impl std::fmt::Debug for PeerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        return write!(f, "PeerId({})", self.hex());
    }
}

impl std::fmt::Display for PeerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        return write!(f, "{}", &self.hex()[..8]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u8) -> PeerId {
        let mut bytes = [0u8; 32];
        bytes[31] = n;
        PeerId(bytes)
    }

    #[test]
    fn orders_by_bytes() {
        assert!(id(1) < id(2));
        assert!(id(2) > id(1));
        assert_eq!(id(5), id(5));
    }

    #[test]
    fn display_is_short_hex_prefix() {
        let s = format!("{}", id(0xab));
        assert_eq!(s.len(), 8);
    }

    #[test]
    fn debug_is_full_hex() {
        let s = format!("{:?}", id(0xab));
        assert!(s.starts_with("PeerId("));
        assert!(s.contains(&"0".repeat(30)));
    }
}
