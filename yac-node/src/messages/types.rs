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

//! Core data model: transactions, proposals, blocks and the YAC vote
//! payloads that travel over the wire and are folded into hashes.
//!
//! Every type here derives `Serialize`/`Deserialize` and is encoded with
//! the canonical `bincode` configuration fixed in
//! [`crate::messages::canonical_encode`]; field order in the struct
//! definition is the wire order.

use serde_derive::{Deserialize, Serialize};

use crate::crypto::{Hash, PublicKey, Signature};

/// Block height, starting at 1 for the first block after genesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Height(pub u64);

impl Height {
    pub fn next(self) -> Self {
        Height(self.0 + 1)
    }

    pub fn prev(self) -> Option<Self> {
        self.0.checked_sub(1).map(Height)
    }
}

impl std::fmt::Display for Height {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// View counter, rotating the round leader within a height on timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct View(pub u64);

/// A client-submitted transaction. The command payload is an opaque,
/// serializable blob; the account/asset command language itself is out of
/// scope for the consensus core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub creator: PublicKey,
    /// Monotonically increasing per-creator counter, used for replay
    /// protection and stateful ordering.
    pub counter: u64,
    pub created_at: i64,
    pub commands: Vec<Vec<u8>>,
    pub signatures: Vec<Signature>,
}

impl Transaction {
    pub fn hash(&self) -> Hash {
        Hash::of(&crate::messages::canonical_encode(self).expect("transaction always encodes"))
    }

    /// Bytes signed by the creator: everything except the accumulated
    /// signatures themselves.
    pub fn signing_payload(&self) -> Vec<u8> {
        let unsigned = UnsignedTransaction {
            creator: self.creator,
            counter: self.counter,
            created_at: self.created_at,
            commands: &self.commands,
        };
        crate::messages::canonical_encode(&unsigned).expect("unsigned transaction always encodes")
    }
}

#[derive(Serialize)]
struct UnsignedTransaction<'a> {
    creator: PublicKey,
    counter: u64,
    created_at: i64,
    commands: &'a Vec<Vec<u8>>,
}

/// An ordered batch of transactions proposed for a specific height.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub height: Height,
    pub created_at: i64,
    pub transactions: Vec<Transaction>,
}

impl Proposal {
    pub fn hash(&self) -> Hash {
        Hash::of(&crate::messages::canonical_encode(self).expect("proposal always encodes"))
    }
}

/// A proposal after simulation: chain-linked, content-hashed, and carrying
/// whatever signatures have accumulated toward a commit certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub height: Height,
    pub prev_hash: Hash,
    pub created_at: i64,
    pub transactions: Vec<Transaction>,
    /// Content hash computed by the simulator; present on every block
    /// regardless of whether it has finalized yet.
    pub block_hash: Hash,
}

impl Block {
    /// Recomputes the content hash from the block's own fields, used to
    /// detect tampering when loading a block from the store.
    pub fn compute_hash(
        prev_hash: Hash,
        height: Height,
        transactions: &[Transaction],
        created_at: i64,
    ) -> Hash {
        let tx_root = merkle_root(transactions.iter().map(Transaction::hash));
        #[derive(Serialize)]
        struct HashInput {
            prev_hash: Hash,
            height: Height,
            tx_root: Hash,
            created_at: i64,
        }
        let bytes = crate::messages::canonical_encode(&HashInput {
            prev_hash,
            height,
            tx_root,
            created_at,
        })
        .expect("hash input always encodes");
        Hash::of(&bytes)
    }
}

/// Folds a sequence of leaf hashes into a single root using a binary
/// pairwise reduction; the empty sequence roots to the zero hash so an
/// empty block still has a well-defined, deterministic hash.
pub fn merkle_root(leaves: impl Iterator<Item = Hash>) -> Hash {
    let mut level: Vec<Hash> = leaves.collect();
    if level.is_empty() {
        return Hash::zero();
    }
    while level.len() > 1 {
        let mut next = Vec::with_capacity((level.len() + 1) / 2);
        for pair in level.chunks(2) {
            let combined = if pair.len() == 2 {
                let mut buf = Vec::with_capacity(64);
                buf.extend_from_slice(pair[0].as_bytes());
                buf.extend_from_slice(pair[1].as_bytes());
                Hash::of(&buf)
            } else {
                pair[0]
            };
            next.push(combined);
        }
        level = next;
    }
    level[0]
}

/// Identifies a consensus round's candidate outcome: the proposal it
/// sprang from, and the block hash every honest peer should agree on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct YacHash {
    pub proposal_hash: Hash,
    pub block_hash: Hash,
}

/// A peer's signed vote for a `YacHash` at a given height.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteMessage {
    pub height: Height,
    pub view: View,
    pub hash: YacHash,
    pub author: PublicKey,
    pub signature: Signature,
}

impl VoteMessage {
    pub fn signing_payload(height: Height, view: View, hash: YacHash) -> Vec<u8> {
        #[derive(Serialize)]
        struct Payload {
            height: Height,
            view: View,
            hash: YacHash,
        }
        crate::messages::canonical_encode(&Payload { height, view, hash })
            .expect("vote payload always encodes")
    }
}

/// A bag of votes proving a supermajority agreed on one `YacHash`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitMessage {
    pub height: Height,
    pub hash: YacHash,
    pub votes: Vec<VoteMessage>,
}

/// A bag of votes proving no `YacHash` can still reach the supermajority
/// threshold for the current view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectMessage {
    pub height: Height,
    pub view: View,
    pub votes: Vec<VoteMessage>,
}

/// A finalized block plus the certificate that proves it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommittedBlock {
    pub block: Block,
    pub certificate: Vec<VoteMessage>,
}

/// Handshake payload exchanged when a transport connection is first
/// established, before any consensus traffic is accepted from the socket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connect {
    pub public_key: PublicKey,
    pub address: String,
    pub created_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tx(counter: u64) -> Transaction {
        Transaction {
            creator: crate::crypto::KeyPair::generate().public_key(),
            counter,
            created_at: 0,
            commands: vec![b"noop".to_vec()],
            signatures: vec![],
        }
    }

    #[test]
    fn merkle_root_of_empty_is_zero() {
        assert_eq!(merkle_root(std::iter::empty()), Hash::zero());
    }

    #[test]
    fn merkle_root_is_order_sensitive() {
        let a = Hash::of(b"a");
        let b = Hash::of(b"b");
        let r1 = merkle_root(vec![a, b].into_iter());
        let r2 = merkle_root(vec![b, a].into_iter());
        assert_ne!(r1, r2);
    }

    #[test]
    fn block_hash_deterministic_for_same_inputs() {
        let txs = vec![sample_tx(1), sample_tx(2)];
        let h1 = Block::compute_hash(Hash::zero(), Height(1), &txs, 1000);
        let h2 = Block::compute_hash(Hash::zero(), Height(1), &txs, 1000);
        assert_eq!(h1, h2);
    }

    #[test]
    fn block_hash_changes_with_timestamp() {
        let txs = vec![sample_tx(1)];
        let h1 = Block::compute_hash(Hash::zero(), Height(1), &txs, 1000);
        let h2 = Block::compute_hash(Hash::zero(), Height(1), &txs, 1001);
        assert_ne!(h1, h2);
    }

    #[test]
    fn empty_block_hash_is_well_defined() {
        let h = Block::compute_hash(Hash::zero(), Height(1), &[], 1000);
        assert_ne!(h, Hash::zero());
    }
}
