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

//! The observable-stream abstraction behind `on_proposal()` / `on_commit()`:
//! a single publisher, any number of subscribers, each receiving every
//! event in publication order. `proposal` events use drop-oldest
//! back-pressure since they are explicitly tentative; `commit` events
//! block the publisher instead, since losing one would mean a client
//! silently missing a finalized block.

use tokio::sync::{broadcast, mpsc};

use crate::messages::{CommittedBlock, Proposal};

const PROPOSAL_CHANNEL_CAPACITY: usize = 64;
const COMMIT_CHANNEL_CAPACITY: usize = 256;

/// Publishes proposals seen locally. Fires once per round; a proposal
/// whose round later rejects still fired, so subscribers must treat it as
/// tentative. Back-pressure policy: drop the oldest unread event rather
/// than block the consensus driver.
#[derive(Clone)]
pub struct ProposalBus {
    sender: broadcast::Sender<Proposal>,
}

impl ProposalBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(PROPOSAL_CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Proposal> {
        self.sender.subscribe()
    }

    /// Publishes a proposal; a lagging subscriber simply misses old
    /// entries rather than stalling the publisher (drop-oldest).
    pub fn publish(&self, proposal: Proposal) {
        let _ = self.sender.send(proposal);
    }
}

impl Default for ProposalBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Publishes finalized blocks, strictly in increasing height order. Each
/// subscriber gets its own bounded queue; publishing blocks until there is
/// room, so a slow subscriber never causes a commit to be silently
/// dropped.
pub struct CommitBus {
    subscribers: Vec<mpsc::Sender<CommittedBlock>>,
}

impl CommitBus {
    pub fn new() -> Self {
        Self {
            subscribers: Vec::new(),
        }
    }

    pub fn subscribe(&mut self) -> mpsc::Receiver<CommittedBlock> {
        let (tx, rx) = mpsc::channel(COMMIT_CHANNEL_CAPACITY);
        self.subscribers.push(tx);
        rx
    }

    /// Delivers `block` to every subscriber, waiting for queue room rather
    /// than dropping. A subscriber that has been dropped is pruned.
    pub async fn publish(&mut self, block: CommittedBlock) {
        let mut alive = Vec::with_capacity(self.subscribers.len());
        for sender in self.subscribers.drain(..) {
            if sender.send(block.clone()).await.is_ok() {
                alive.push(sender);
            }
        }
        self.subscribers = alive;
    }
}

impl Default for CommitBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Hash;
    use crate::messages::{Block, Height};

    fn sample_block(height: u64) -> CommittedBlock {
        CommittedBlock {
            block: Block {
                height: Height(height),
                prev_hash: Hash::zero(),
                created_at: 0,
                transactions: vec![],
                block_hash: Hash::of(&height.to_le_bytes()),
            },
            certificate: vec![],
        }
    }

    #[tokio::test]
    async fn commit_bus_delivers_in_order_to_every_subscriber() {
        let mut bus = CommitBus::new();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(sample_block(1)).await;
        bus.publish(sample_block(2)).await;

        assert_eq!(rx1.recv().await.unwrap().block.height, Height(1));
        assert_eq!(rx1.recv().await.unwrap().block.height, Height(2));
        assert_eq!(rx2.recv().await.unwrap().block.height, Height(1));
        assert_eq!(rx2.recv().await.unwrap().block.height, Height(2));
    }

    #[test]
    fn proposal_bus_allows_slow_subscriber_to_lag() {
        let bus = ProposalBus::new();
        let mut rx = bus.subscribe();
        for h in 1..=(PROPOSAL_CHANNEL_CAPACITY as u64 + 10) {
            bus.publish(Proposal {
                height: Height(h),
                created_at: 0,
                transactions: vec![],
            });
        }
        // The channel dropped the oldest entries; the receiver can still
        // read whatever remains without the publisher ever blocking.
        assert!(rx.try_recv().is_ok() || matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Lagged(_))
        ));
    }
}
