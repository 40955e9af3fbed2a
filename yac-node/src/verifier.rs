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

//! The opaque verifier boundary: stateless checks (well-formedness,
//! signatures) run before a transaction enters the ordering FIFO, stateful
//! checks (counter monotonicity, command preconditions) run inside the
//! simulator against a specific world-state snapshot.
//!
//! [`Ed25519Verifier`] is the only production implementation. There is no
//! mock verifier reachable from [`crate::NodeBuilder`]: a node that cannot
//! validate signatures for real is not a node worth starting.

use std::collections::BTreeMap;

use crate::crypto;
use crate::messages::Transaction;

/// Why a transaction failed stateless validation: well-formedness and
/// signature checks that do not depend on ledger state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatelessRejection {
    NoCommands,
    NoSignatures,
    BadSignature,
}

impl std::fmt::Display for StatelessRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msg = match self {
            Self::NoCommands => "transaction has no commands",
            Self::NoSignatures => "transaction has no signatures",
            Self::BadSignature => "signature does not verify against creator key",
        };
        f.write_str(msg)
    }
}

/// Why a transaction failed stateful validation against a particular
/// world-state snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatefulRejection {
    CounterNotMonotonic { expected: u64, got: u64 },
}

impl std::fmt::Display for StatefulRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CounterNotMonotonic { expected, got } => write!(
                f,
                "creator counter not monotonic: expected >= {}, got {}",
                expected, got
            ),
        }
    }
}

/// Validates transactions. Implementations must be deterministic: the
/// simulator relies on every honest peer reaching the same stateful
/// verdict for the same input.
pub trait Verifier: Send + Sync {
    fn check_stateless(&self, tx: &Transaction) -> Result<(), StatelessRejection>;

    fn check_stateful(
        &self,
        tx: &Transaction,
        world: &WorldState,
    ) -> Result<(), StatefulRejection>;
}

/// The minimal state the stateful checks this spec defines require: the
/// last accepted counter per transaction creator. Richer account/asset
/// state is out of scope for the consensus core.
#[derive(Debug, Clone, Default)]
pub struct WorldState {
    last_counter: BTreeMap<crypto::PublicKey, u64>,
}

impl WorldState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_counter(&self, creator: &crypto::PublicKey) -> u64 {
        self.last_counter.get(creator).copied().unwrap_or(0)
    }

    /// Records that `tx` was accepted, advancing the creator's counter.
    pub fn apply(&mut self, tx: &Transaction) {
        self.last_counter.insert(tx.creator, tx.counter);
    }
}

/// The real, Ed25519-backed verifier. Every signature in `tx.signatures` is
/// checked against `tx.signing_payload()`; at least one must verify and
/// come from the creator key.
#[derive(Debug, Default)]
pub struct Ed25519Verifier;

impl Verifier for Ed25519Verifier {
    fn check_stateless(&self, tx: &Transaction) -> Result<(), StatelessRejection> {
        if tx.commands.is_empty() {
            return Err(StatelessRejection::NoCommands);
        }
        if tx.signatures.is_empty() {
            return Err(StatelessRejection::NoSignatures);
        }
        let payload = tx.signing_payload();
        let verified = tx
            .signatures
            .iter()
            .any(|sig| crypto::verify(&tx.creator, &payload, sig));
        if !verified {
            return Err(StatelessRejection::BadSignature);
        }
        Ok(())
    }

    fn check_stateful(
        &self,
        tx: &Transaction,
        world: &WorldState,
    ) -> Result<(), StatefulRejection> {
        let expected = world.last_counter(&tx.creator) + 1;
        if tx.counter != expected {
            return Err(StatefulRejection::CounterNotMonotonic {
                expected,
                got: tx.counter,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;

    fn signed_tx(keys: &KeyPair, counter: u64) -> Transaction {
        let mut tx = Transaction {
            creator: keys.public_key(),
            counter,
            created_at: 0,
            commands: vec![b"create_asset".to_vec()],
            signatures: vec![],
        };
        let sig = keys.sign(&tx.signing_payload());
        tx.signatures.push(sig);
        tx
    }

    #[test]
    fn valid_transaction_passes_stateless_check() {
        let keys = KeyPair::generate();
        let tx = signed_tx(&keys, 1);
        assert!(Ed25519Verifier.check_stateless(&tx).is_ok());
    }

    #[test]
    fn tampered_signature_fails_stateless_check() {
        let keys = KeyPair::generate();
        let mut tx = signed_tx(&keys, 1);
        tx.counter = 2; // payload no longer matches signature
        assert_eq!(
            Ed25519Verifier.check_stateless(&tx),
            Err(StatelessRejection::BadSignature)
        );
    }

    #[test]
    fn stateful_check_enforces_counter_monotonicity() {
        let keys = KeyPair::generate();
        let mut world = WorldState::new();
        let tx1 = signed_tx(&keys, 1);
        assert!(Ed25519Verifier.check_stateful(&tx1, &world).is_ok());
        world.apply(&tx1);

        let tx_replay = signed_tx(&keys, 1);
        assert!(Ed25519Verifier.check_stateful(&tx_replay, &world).is_err());

        let tx2 = signed_tx(&keys, 2);
        assert!(Ed25519Verifier.check_stateful(&tx2, &world).is_ok());
    }
}
