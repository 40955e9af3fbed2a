// Copyright 2026 The Iroha Consensus Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The validator peer set: a fixed, ordered list of `(address, public_key)`
//! pairs agreed upon at genesis, plus the allow-list transport connections
//! are checked against before any consensus traffic is accepted.

use serde_derive::{Deserialize, Serialize};

use std::collections::BTreeMap;
use std::fmt;

use crate::crypto::PublicKey;

/// Data needed to connect to a peer node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ConnectInfo {
    pub address: String,
    pub public_key: PublicKey,
}

impl fmt::Display for ConnectInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.address)
    }
}

/// The genesis-agreed, height-independent ordering of validators. `n =
/// peers.len()`, `f = floor((n-1)/3)`, threshold `T = 2f + 1`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PeerSetConfig {
    pub peers: Vec<ConnectInfo>,
}

impl PeerSetConfig {
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Maximum number of Byzantine peers this set can tolerate.
    pub fn max_faulty(&self) -> usize {
        (self.len().saturating_sub(1)) / 3
    }

    /// Supermajority threshold `T = 2f + 1`.
    pub fn threshold(&self) -> usize {
        2 * self.max_faulty() + 1
    }

    /// The round leader for height `h` at view `v`: `peers[(h + v) mod n]`.
    pub fn leader(&self, height: u64, view: u64) -> Option<&ConnectInfo> {
        if self.peers.is_empty() {
            return None;
        }
        let idx = (height.wrapping_add(view) as usize) % self.peers.len();
        self.peers.get(idx)
    }

    pub fn contains(&self, key: &PublicKey) -> bool {
        self.peers.iter().any(|p| &p.public_key == key)
    }

    pub fn index_of(&self, key: &PublicKey) -> Option<usize> {
        self.peers.iter().position(|p| &p.public_key == key)
    }
}

/// Runtime allow-list built from [`PeerSetConfig`], used by the transport
/// layer to reject connections from unknown keys before any consensus
/// message is processed.
#[derive(Debug, Clone, Default)]
pub struct ConnectList {
    peers: BTreeMap<PublicKey, String>,
}

impl ConnectList {
    pub fn from_config(config: &PeerSetConfig) -> Self {
        let peers = config
            .peers
            .iter()
            .map(|p| (p.public_key, p.address.clone()))
            .collect();
        Self { peers }
    }

    pub fn is_peer_allowed(&self, peer: &PublicKey) -> bool {
        self.peers.contains_key(peer)
    }

    pub fn find_address_by_pubkey(&self, key: &PublicKey) -> Option<&str> {
        self.peers.get(key).map(String::as_str)
    }

    pub fn add(&mut self, peer: ConnectInfo) {
        self.peers.insert(peer.public_key, peer.address);
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;

    fn peer_set(n: usize) -> PeerSetConfig {
        let peers = (0..n)
            .map(|i| ConnectInfo {
                address: format!("127.0.0.1:{}", 7000 + i),
                public_key: KeyPair::generate().public_key(),
            })
            .collect();
        PeerSetConfig { peers }
    }

    #[test]
    fn threshold_for_four_peers_is_three() {
        let set = peer_set(4);
        assert_eq!(set.max_faulty(), 1);
        assert_eq!(set.threshold(), 3);
    }

    #[test]
    fn threshold_for_seven_peers_is_five() {
        let set = peer_set(7);
        assert_eq!(set.max_faulty(), 2);
        assert_eq!(set.threshold(), 5);
    }

    #[test]
    fn leader_rotates_with_view() {
        let set = peer_set(4);
        let l0 = set.leader(10, 0).unwrap().public_key;
        let l1 = set.leader(10, 1).unwrap().public_key;
        assert_ne!(l0, l1);
    }

    #[test]
    fn connect_list_reflects_allow_list() {
        let set = peer_set(3);
        let list = ConnectList::from_config(&set);
        for peer in &set.peers {
            assert!(list.is_peer_allowed(&peer.public_key));
        }
        let stranger = KeyPair::generate().public_key();
        assert!(!list.is_peer_allowed(&stranger));
    }
}
