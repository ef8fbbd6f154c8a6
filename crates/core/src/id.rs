// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Peer identifiers

use serde::{Deserialize, Serialize};

/// Rank of a peer within the coordination group (0..N)
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct PeerId(pub u32);

impl PeerId {
    pub fn new(rank: u32) -> Self {
        Self(rank)
    }

    /// Position of this peer in per-peer tables
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// All peer ids of a group of the given size
    pub fn all(peer_count: u32) -> impl Iterator<Item = PeerId> {
        (0..peer_count).map(PeerId)
    }
}

impl std::fmt::Display for PeerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "peer-{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peer_ids_order_by_rank() {
        assert!(PeerId(0) < PeerId(1));
        assert_eq!(PeerId(7).index(), 7);
    }

    #[test]
    fn all_enumerates_every_rank() {
        let ids: Vec<_> = PeerId::all(3).collect();
        assert_eq!(ids, vec![PeerId(0), PeerId(1), PeerId(2)]);
    }

    #[test]
    fn display_is_prefixed() {
        assert_eq!(PeerId(2).to_string(), "peer-2");
    }
}
