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

//! On a YAC commit, either appends the local candidate block (the common
//! case) or fetches the blocks this peer is missing from a peer named in
//! the commit certificate. On a reject, skips the height. Any failure
//! during catch-up is a fatal [`SafetyViolation`]: appending a divergent
//! block is worse than refusing to proceed.

use crate::crypto::PublicKey;
use crate::error::SafetyViolation;
use crate::messages::{Block, CommitMessage, CommittedBlock, Height};
use crate::peers::PeerSetConfig;
use crate::store::BlockStore;
use crate::verifier::{Verifier, WorldState};

/// Work the synchronizer needs the transport to do on its behalf.
pub enum SyncAction {
    /// Append succeeded locally; nothing further required.
    Appended(CommittedBlock),
    /// This peer is behind; fetch blocks starting at `from_height` from
    /// one of the peers that signed the certificate.
    NeedsCatchUp {
        from_height: Height,
        ask: Vec<PublicKey>,
    },
    /// The round rejected; the height was skipped with no committed
    /// content.
    Skipped(Height),
}

pub struct Synchronizer {
    verifier: Box<dyn Verifier>,
}

impl Synchronizer {
    pub fn new(verifier: Box<dyn Verifier>) -> Self {
        Self { verifier }
    }

    /// Handles a resolved commit: if the locally-simulated block is the
    /// one that committed, persist it directly; otherwise request
    /// catch-up from a certificate signer.
    pub fn on_commit(
        &self,
        store: &mut BlockStore,
        peers: &PeerSetConfig,
        commit: CommitMessage,
        local_candidate: Option<Block>,
    ) -> Result<SyncAction, SafetyViolation> {
        match local_candidate {
            Some(block) if block.block_hash == commit.hash.block_hash => {
                let committed = CommittedBlock {
                    block,
                    certificate: commit.votes,
                };
                store.append(committed.clone(), peers)?;
                Ok(SyncAction::Appended(committed))
            }
            _ => {
                let ask = commit.votes.iter().map(|v| v.author).collect();
                let from_height = store.height().map(Height::next).unwrap_or(Height(1));
                Ok(SyncAction::NeedsCatchUp { from_height, ask })
            }
        }
    }

    /// Handles a rejected round: the height advances with no committed
    /// content (reject implies skip, fixed by this spec over the
    /// inconsistent reject-handling in the source material).
    pub fn on_reject(&self, height: Height) -> SyncAction {
        SyncAction::Skipped(height)
    }

    /// Validates and appends one block fetched during catch-up: chain
    /// linkage, certificate threshold, and a stateful transaction replay
    /// against the running world-state are all checked before it lands in
    /// the store.
    pub fn apply_fetched_block(
        &self,
        store: &mut BlockStore,
        peers: &PeerSetConfig,
        world: &mut WorldState,
        committed: CommittedBlock,
    ) -> Result<(), SafetyViolation> {
        for tx in &committed.block.transactions {
            if self.verifier.check_stateful(tx, world).is_err() {
                return Err(SafetyViolation::ChainDiscontinuity {
                    height: committed.block.height.0,
                    expected: "transactions valid against replayed state".into(),
                    actual: format!("transaction {} failed stateful replay", tx.hash()),
                });
            }
            world.apply(tx);
        }
        store.append(committed, peers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{Hash, KeyPair};
    use crate::messages::{VoteMessage, View, YacHash};
    use crate::peers::ConnectInfo;
    use crate::verifier::Ed25519Verifier;

    fn peer_set(n: usize) -> (PeerSetConfig, Vec<KeyPair>) {
        let keys: Vec<_> = (0..n).map(|_| KeyPair::generate()).collect();
        let peers = keys
            .iter()
            .enumerate()
            .map(|(i, k)| ConnectInfo {
                address: format!("127.0.0.1:{}", 7000 + i),
                public_key: k.public_key(),
            })
            .collect();
        (PeerSetConfig { peers }, keys)
    }

    fn commit_for(height: Height, block: &Block, keys: &[KeyPair]) -> CommitMessage {
        let hash = YacHash {
            proposal_hash: Hash::of(b"proposal"),
            block_hash: block.block_hash,
        };
        let votes = keys[..3]
            .iter()
            .map(|k| {
                let payload = VoteMessage::signing_payload(height, View(0), hash);
                VoteMessage {
                    height,
                    view: View(0),
                    hash,
                    author: k.public_key(),
                    signature: k.sign(&payload),
                }
            })
            .collect();
        CommitMessage {
            height,
            hash,
            votes,
        }
    }

    fn tempdir() -> std::path::PathBuf {
        let mut dir = std::env::temp_dir();
        dir.push(format!(
            "yac-sync-test-{}",
            crate::crypto::KeyPair::generate().public_key()
        ));
        dir
    }

    #[test]
    fn matching_candidate_is_appended_directly() {
        let (peers, keys) = peer_set(4);
        let mut store = BlockStore::open(tempdir(), &peers).unwrap();
        let block_hash = Block::compute_hash(Hash::zero(), Height(1), &[], 10);
        let block = Block {
            height: Height(1),
            prev_hash: Hash::zero(),
            created_at: 10,
            transactions: vec![],
            block_hash,
        };
        let commit = commit_for(Height(1), &block, &keys);
        let sync = Synchronizer::new(Box::new(Ed25519Verifier));
        let action = sync
            .on_commit(&mut store, &peers, commit, Some(block))
            .unwrap();
        assert!(matches!(action, SyncAction::Appended(_)));
        assert_eq!(store.height(), Some(Height(1)));
    }

    #[test]
    fn mismatched_candidate_triggers_catch_up() {
        let (peers, keys) = peer_set(4);
        let mut store = BlockStore::open(tempdir(), &peers).unwrap();
        let committed_hash = Hash::of(b"someone else's block");
        let local = Block {
            height: Height(1),
            prev_hash: Hash::zero(),
            created_at: 10,
            transactions: vec![],
            block_hash: Hash::of(b"my own simulated block"),
        };
        let mut commit = commit_for(Height(1), &local, &keys);
        commit.hash.block_hash = committed_hash;
        let sync = Synchronizer::new(Box::new(Ed25519Verifier));
        let action = sync
            .on_commit(&mut store, &peers, commit, Some(local))
            .unwrap();
        assert!(matches!(action, SyncAction::NeedsCatchUp { .. }));
    }

    #[test]
    fn reject_skips_height() {
        let sync = Synchronizer::new(Box::new(Ed25519Verifier));
        let action = sync.on_reject(Height(5));
        assert!(matches!(action, SyncAction::Skipped(Height(5))));
    }
}
