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

//! Append-only block store: one file per height holding a canonical block
//! serialization followed by its commit certificate. Recovery at startup
//! scans every height, verifies chain linkage and the certificate's `T`
//! threshold, and refuses to start on any failure, per the persisted-state
//! layout fixed for this spec (persistent storage schema beyond this
//! layout remains out of scope).

use std::fs;
use std::path::{Path, PathBuf};

use crate::crypto::{self, Hash};
use crate::error::{ConfigError, SafetyViolation};
use crate::messages::{CommittedBlock, Height};
use crate::peers::PeerSetConfig;

/// A file-backed, single-writer, append-only ledger of finalized blocks.
pub struct BlockStore {
    dir: PathBuf,
    /// Cached so callers don't need to re-read the highest file on every
    /// lookup; kept in sync by `append`.
    height: Option<Height>,
}

impl BlockStore {
    /// Opens (creating if absent) the store directory and recovers its
    /// current height by scanning the files present, verifying chain
    /// linkage and certificate thresholds as it goes.
    pub fn open(dir: impl AsRef<Path>, peers: &PeerSetConfig) -> Result<Self, ConfigError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .map_err(|e| ConfigError::CorruptStore(format!("cannot create {:?}: {}", dir, e)))?;

        let mut store = Self { dir, height: None };
        store.recover(peers)?;
        Ok(store)
    }

    fn block_path(&self, height: Height) -> PathBuf {
        self.dir.join(format!("{}.block", height.0))
    }

    fn recover(&mut self, peers: &PeerSetConfig) -> Result<(), ConfigError> {
        let mut height = 1u64;
        let mut prev_hash = Hash::zero();
        loop {
            let path = self.block_path(Height(height));
            if !path.exists() {
                break;
            }
            let committed = self.read_raw(&path)?;
            verify_committed_block(&committed, Height(height), prev_hash, peers)
                .map_err(|e| ConfigError::CorruptStore(e.to_string()))?;
            prev_hash = committed.block.block_hash;
            height += 1;
        }
        self.height = height.checked_sub(1).map(Height);
        Ok(())
    }

    fn read_raw(&self, path: &Path) -> Result<CommittedBlock, ConfigError> {
        let bytes = fs::read(path)
            .map_err(|e| ConfigError::CorruptStore(format!("cannot read {:?}: {}", path, e)))?;
        crate::messages::canonical_decode(&bytes)
            .map_err(|e| ConfigError::CorruptStore(format!("cannot decode {:?}: {}", path, e)))
    }

    /// Current highest finalized height, or `None` before genesis.
    pub fn height(&self) -> Option<Height> {
        self.height
    }

    pub fn hash_of(&self, height: Height) -> Option<Hash> {
        self.get(height).map(|b| b.block.block_hash)
    }

    pub fn get(&self, height: Height) -> Option<CommittedBlock> {
        let path = self.block_path(height);
        if !path.exists() {
            return None;
        }
        let bytes = fs::read(&path).ok()?;
        crate::messages::canonical_decode(&bytes).ok()
    }

    /// Appends a finalized block. The caller must have already validated
    /// the certificate; this performs only the chain-linkage and ordering
    /// checks intrinsic to append-only storage.
    pub fn append(
        &mut self,
        committed: CommittedBlock,
        peers: &PeerSetConfig,
    ) -> Result<(), SafetyViolation> {
        let expected_height = self.height.map(Height::next).unwrap_or(Height(1));
        if committed.block.height != expected_height {
            return Err(SafetyViolation::DuplicateHeight(committed.block.height.0));
        }
        let expected_prev = self
            .height
            .and_then(|h| self.hash_of(h))
            .unwrap_or_else(Hash::zero);
        verify_committed_block(&committed, expected_height, expected_prev, peers)?;

        let path = self.block_path(expected_height);
        let bytes = crate::messages::canonical_encode(&committed)
            .expect("committed block always encodes");
        fs::write(&path, bytes)
            .unwrap_or_else(|e| panic!("failed to persist block {:?}: {}", path, e));
        self.height = Some(expected_height);
        Ok(())
    }
}

fn verify_committed_block(
    committed: &CommittedBlock,
    expected_height: Height,
    expected_prev: Hash,
    peers: &PeerSetConfig,
) -> Result<(), SafetyViolation> {
    if committed.block.height != expected_height {
        return Err(SafetyViolation::ChainDiscontinuity {
            height: committed.block.height.0,
            expected: format!("height {}", expected_height),
            actual: format!("height {}", committed.block.height),
        });
    }
    if committed.block.prev_hash != expected_prev {
        return Err(SafetyViolation::ChainDiscontinuity {
            height: committed.block.height.0,
            expected: expected_prev.to_hex(),
            actual: committed.block.prev_hash.to_hex(),
        });
    }

    let threshold = peers.threshold();
    let mut signers = std::collections::BTreeSet::new();
    for vote in &committed.certificate {
        if vote.hash.block_hash != committed.block.block_hash {
            continue;
        }
        let payload = crate::messages::VoteMessage::signing_payload(
            vote.height,
            vote.view,
            vote.hash,
        );
        if crypto::verify(&vote.author, &payload, &vote.signature) && peers.contains(&vote.author)
        {
            signers.insert(vote.author);
        }
    }
    if signers.len() < threshold {
        return Err(SafetyViolation::CertificateShort {
            height: committed.block.height.0,
            got: signers.len(),
            needed: threshold,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;
    use crate::messages::{Block, VoteMessage, View, YacHash};
    use crate::peers::ConnectInfo;

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

    fn committed_block(
        height: Height,
        prev_hash: Hash,
        keys: &[KeyPair],
        signer_count: usize,
    ) -> CommittedBlock {
        let block_hash = Block::compute_hash(prev_hash, height, &[], 1000);
        let block = Block {
            height,
            prev_hash,
            created_at: 1000,
            transactions: vec![],
            block_hash,
        };
        let proposal_hash = Hash::of(b"proposal");
        let hash = YacHash {
            proposal_hash,
            block_hash,
        };
        let certificate = keys[..signer_count]
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
        CommittedBlock { block, certificate }
    }

    #[test]
    fn append_and_recover_roundtrip() {
        let dir = tempdir();
        let (peers, keys) = peer_set(4);
        let mut store = BlockStore::open(&dir, &peers).unwrap();
        assert_eq!(store.height(), None);

        let b1 = committed_block(Height(1), Hash::zero(), &keys, 3);
        store.append(b1.clone(), &peers).unwrap();
        assert_eq!(store.height(), Some(Height(1)));

        let b2 = committed_block(Height(2), b1.block.block_hash, &keys, 3);
        store.append(b2, &peers).unwrap();

        drop(store);
        let recovered = BlockStore::open(&dir, &peers).unwrap();
        assert_eq!(recovered.height(), Some(Height(2)));
    }

    #[test]
    fn append_rejects_certificate_below_threshold() {
        let dir = tempdir();
        let (peers, keys) = peer_set(4);
        let mut store = BlockStore::open(&dir, &peers).unwrap();
        let short = committed_block(Height(1), Hash::zero(), &keys, 2);
        assert!(store.append(short, &peers).is_err());
    }

    #[test]
    fn append_rejects_wrong_height() {
        let dir = tempdir();
        let (peers, keys) = peer_set(4);
        let mut store = BlockStore::open(&dir, &peers).unwrap();
        let skipped = committed_block(Height(2), Hash::zero(), &keys, 3);
        assert!(store.append(skipped, &peers).is_err());
    }

    fn tempdir() -> PathBuf {
        let mut dir = std::env::temp_dir();
        dir.push(format!("yac-store-test-{}", crypto::KeyPair::generate().public_key()));
        dir
    }
}
