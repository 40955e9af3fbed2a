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

//! Batches stateless-valid transactions into proposals on a time/size
//! trigger. Exactly one peer, the height's ordering leader, emits a
//! proposal; non-leaders use their FIFO only as a local dedup buffer.

use std::collections::{HashSet, VecDeque};
use std::time::{Duration, Instant};

use crate::crypto::Hash;
use crate::messages::{Height, Proposal, Transaction};
use crate::verifier::{StatelessRejection, Verifier};

/// Outcome of submitting a transaction to the ordering service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Accepted,
    Duplicate,
    StatelessInvalid(StatelessRejection),
}

pub struct OrderingService {
    fifo: VecDeque<Transaction>,
    seen: HashSet<Hash>,
    recent_committed: VecDeque<Hash>,
    dedup_window: usize,
    max_proposal_size: usize,
    proposal_delay: Duration,
    last_emit: Instant,
    verifier: Box<dyn Verifier>,
}

impl OrderingService {
    pub fn new(
        max_proposal_size: usize,
        proposal_delay: Duration,
        dedup_window: usize,
        verifier: Box<dyn Verifier>,
    ) -> Self {
        Self {
            fifo: VecDeque::new(),
            seen: HashSet::new(),
            recent_committed: VecDeque::new(),
            dedup_window,
            max_proposal_size,
            proposal_delay,
            last_emit: Instant::now(),
            verifier,
        }
    }

    /// Runs the stateless gate and, if it passes and the transaction is not
    /// a duplicate, enqueues it.
    pub fn submit(&mut self, tx: Transaction) -> SubmitOutcome {
        let hash = tx.hash();
        if self.seen.contains(&hash) || self.recent_committed.contains(&hash) {
            return SubmitOutcome::Duplicate;
        }
        if let Err(reason) = self.verifier.check_stateless(&tx) {
            return SubmitOutcome::StatelessInvalid(reason);
        }
        self.seen.insert(hash);
        self.fifo.push_back(tx);
        SubmitOutcome::Accepted
    }

    /// Marks a batch of transaction hashes as committed, sliding the
    /// dedup window and dropping them from the live FIFO if still present
    /// (they should not be, in the honest path, but a transaction can be
    /// included in a proposal by another peer during catch-up).
    pub fn note_committed(&mut self, hashes: impl IntoIterator<Item = Hash>) {
        for hash in hashes {
            self.fifo.retain(|tx| tx.hash() != hash);
            self.seen.remove(&hash);
            self.recent_committed.push_back(hash);
            while self.recent_committed.len() > self.dedup_window {
                self.recent_committed.pop_front();
            }
        }
    }

    /// True when the size trigger or the time trigger has fired.
    pub fn should_emit(&self) -> bool {
        !self.fifo.is_empty()
            && (self.fifo.len() >= self.max_proposal_size
                || self.last_emit.elapsed() >= self.proposal_delay)
    }

    /// Cuts a proposal for `height`, draining up to `max_proposal_size`
    /// transactions from the FIFO in arrival order. Only the height's
    /// leader should call this; non-leaders just keep buffering.
    pub fn cut_proposal(&mut self, height: Height, created_at: i64) -> Proposal {
        let n = self.max_proposal_size.min(self.fifo.len());
        let transactions = self.fifo.drain(..n).collect();
        self.last_emit = Instant::now();
        Proposal {
            height,
            created_at,
            transactions,
        }
    }

    pub fn pending_count(&self) -> usize {
        self.fifo.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;
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

    fn service(max: usize) -> OrderingService {
        OrderingService::new(
            max,
            Duration::from_secs(3600),
            100,
            Box::new(Ed25519Verifier),
        )
    }

    #[test]
    fn duplicate_submission_is_rejected() {
        let keys = KeyPair::generate();
        let tx = signed_tx(&keys, 1);
        let mut svc = service(10);
        assert_eq!(svc.submit(tx.clone()), SubmitOutcome::Accepted);
        assert_eq!(svc.submit(tx), SubmitOutcome::Duplicate);
    }

    #[test]
    fn emits_on_size_trigger() {
        let keys = KeyPair::generate();
        let mut svc = service(2);
        assert!(!svc.should_emit());
        svc.submit(signed_tx(&keys, 1));
        assert!(!svc.should_emit());
        svc.submit(signed_tx(&keys, 2));
        assert!(svc.should_emit());
        let proposal = svc.cut_proposal(Height(1), 0);
        assert_eq!(proposal.transactions.len(), 2);
        assert_eq!(svc.pending_count(), 0);
    }

    #[test]
    fn malformed_transaction_never_enters_fifo() {
        let keys = KeyPair::generate();
        let mut tx = signed_tx(&keys, 1);
        tx.commands.clear();
        let mut svc = service(10);
        assert!(matches!(svc.submit(tx), SubmitOutcome::StatelessInvalid(_)));
        assert_eq!(svc.pending_count(), 0);
    }

    #[test]
    fn committed_hashes_stay_out_of_dedup_window() {
        let keys = KeyPair::generate();
        let tx = signed_tx(&keys, 1);
        let hash = tx.hash();
        let mut svc = service(10);
        svc.note_committed(vec![hash]);
        assert_eq!(svc.submit(tx), SubmitOutcome::Duplicate);
    }
}
