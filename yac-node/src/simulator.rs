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

//! Speculatively applies a proposal against a temporary world-state
//! snapshot, producing a deterministic candidate block. Given the same
//! proposal and the same ledger tip, every honest peer must produce a
//! byte-identical block hash; non-determinism here is a correctness bug,
//! not a performance concern.

use crate::crypto::Hash;
use crate::messages::{Block, Proposal};
use crate::verifier::{Verifier, WorldState};

/// A candidate block plus the world-state delta produced while simulating
/// it, retained until the consensus round resolves.
pub struct SimulationResult {
    pub block: Block,
    pub world: WorldState,
}

pub struct Simulator {
    verifier: Box<dyn Verifier>,
}

impl Simulator {
    pub fn new(verifier: Box<dyn Verifier>) -> Self {
        Self { verifier }
    }

    /// Runs `proposal` against `base_world`, dropping any transaction that
    /// fails stateful validation. Empty blocks (all transactions dropped)
    /// are a legal outcome: the chain still advances.
    pub fn simulate(&self, proposal: &Proposal, prev_hash: Hash, base_world: &WorldState) -> SimulationResult {
        let mut world = base_world.clone();
        let mut accepted = Vec::with_capacity(proposal.transactions.len());
        for tx in &proposal.transactions {
            match self.verifier.check_stateful(tx, &world) {
                Ok(()) => {
                    world.apply(tx);
                    accepted.push(tx.clone());
                }
                Err(reason) => {
                    log::warn!(
                        "dropping transaction {} from proposal at height {}: {}",
                        tx.hash(),
                        proposal.height,
                        reason
                    );
                }
            }
        }

        let block_hash =
            Block::compute_hash(prev_hash, proposal.height, &accepted, proposal.created_at);
        let block = Block {
            height: proposal.height,
            prev_hash,
            created_at: proposal.created_at,
            transactions: accepted,
            block_hash,
        };

        SimulationResult { block, world }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;
    use crate::messages::{Height, Transaction};
    use crate::verifier::Ed25519Verifier;

    fn signed_tx(keys: &KeyPair, counter: u64) -> Transaction {
        let mut tx = Transaction {
            creator: keys.public_key(),
            counter,
            created_at: 0,
            commands: vec![b"cmd".to_vec()],
            signatures: vec![],
        };
        tx.signatures.push(keys.sign(&tx.signing_payload()));
        tx
    }

    #[test]
    fn simulation_is_deterministic() {
        let keys = KeyPair::generate();
        let proposal = Proposal {
            height: Height(1),
            created_at: 100,
            transactions: vec![signed_tx(&keys, 1), signed_tx(&keys, 2)],
        };
        let sim = Simulator::new(Box::new(Ed25519Verifier));
        let r1 = sim.simulate(&proposal, Hash::zero(), &WorldState::new());
        let r2 = sim.simulate(&proposal, Hash::zero(), &WorldState::new());
        assert_eq!(r1.block.block_hash, r2.block.block_hash);
    }

    #[test]
    fn stateful_invalid_transaction_is_dropped_not_fatal() {
        let keys = KeyPair::generate();
        let proposal = Proposal {
            height: Height(1),
            created_at: 100,
            transactions: vec![signed_tx(&keys, 5)], // counter should start at 1
        };
        let sim = Simulator::new(Box::new(Ed25519Verifier));
        let result = sim.simulate(&proposal, Hash::zero(), &WorldState::new());
        assert!(result.block.transactions.is_empty());
    }

    #[test]
    fn empty_block_still_has_a_well_defined_hash() {
        let proposal = Proposal {
            height: Height(1),
            created_at: 100,
            transactions: vec![],
        };
        let sim = Simulator::new(Box::new(Ed25519Verifier));
        let result = sim.simulate(&proposal, Hash::zero(), &WorldState::new());
        assert_ne!(result.block.block_hash, Hash::zero());
    }

    #[test]
    fn valid_transactions_advance_world_state() {
        let keys = KeyPair::generate();
        let proposal = Proposal {
            height: Height(1),
            created_at: 100,
            transactions: vec![signed_tx(&keys, 1)],
        };
        let sim = Simulator::new(Box::new(Ed25519Verifier));
        let result = sim.simulate(&proposal, Hash::zero(), &WorldState::new());
        assert_eq!(result.world.last_counter(&keys.public_key()), 1);
        assert_eq!(result.block.transactions.len(), 1);
    }
}
