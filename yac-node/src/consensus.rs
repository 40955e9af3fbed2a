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

//! YAC: the single-round Byzantine voting protocol that decides, for each
//! height, whether a candidate block commits or the height is skipped.
//!
//! A peer enters `Voting` once it has a local candidate block, casts one
//! vote, and then tallies incoming votes. Two distinct sets of size `T`
//! always intersect in at least one honest peer, and honest peers vote at
//! most once per height, so at most one `YacHash` can ever reach `T` —
//! this is the whole of the safety argument. Liveness comes from the
//! round-timeout view-change: if no hash reaches `T` before the timer
//! fires, the peer rotates leaders and re-votes.

use std::collections::HashMap;
use std::time::Instant;

use crate::config::ConsensusConfig;
use crate::crypto::{self, Hash, KeyPair, PublicKey};
use crate::error::{InvalidInputError, NodeError, SafetyViolation};
use crate::messages::{
    Block, CommitMessage, Height, Message, RejectMessage, VoteMessage, View, YacHash,
};
use crate::peers::PeerSetConfig;

/// Per-height round state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Idle,
    Voting,
    Committed,
    Rejected,
}

/// A message this peer needs to send as a result of a consensus
/// transition. The caller (the node's dispatch loop) is responsible for
/// actually handing these to the transport.
#[derive(Debug, Clone)]
pub enum Outbound {
    Broadcast(Message),
}

/// What a height's round settled on, once it leaves `Voting`.
#[derive(Debug, Clone)]
pub enum RoundOutcome {
    Committed(Block, CommitMessage),
    Rejected(RejectMessage),
}

/// The tally for one `YacHash`: every validated vote received for it,
/// keyed by author so a peer's vote can only occupy one slot.
type Bucket = HashMap<PublicKey, VoteMessage>;

struct Round {
    height: Height,
    view: View,
    status: Status,
    /// This peer's own simulated candidate for the height; fixed once
    /// voting starts and re-broadcast unchanged across view changes.
    candidate: Option<(Block, YacHash)>,
    votes: HashMap<YacHash, Bucket>,
    /// The hash each peer has voted for at this height, so a later
    /// distinct vote from the same author can be caught as equivocation.
    voted: HashMap<PublicKey, YacHash>,
    round_started_at: Instant,
}

impl Round {
    fn new(height: Height) -> Self {
        Self {
            height,
            view: View(0),
            status: Status::Idle,
            candidate: None,
            votes: HashMap::new(),
            voted: HashMap::new(),
            round_started_at: Instant::now(),
        }
    }
}

/// Drives one instance of the voting protocol; owns exactly one height's
/// worth of mutable state at a time, by construction (a new round begins
/// only after the previous one commits or rejects).
pub struct Yac {
    identity: KeyPair,
    peers: PeerSetConfig,
    config: ConsensusConfig,
    round: Round,
}

impl Yac {
    pub fn new(identity: KeyPair, peers: PeerSetConfig, config: ConsensusConfig) -> Self {
        Self {
            round: Round::new(Height(1)),
            identity,
            peers,
            config,
        }
    }

    pub fn height(&self) -> Height {
        self.round.height
    }

    pub fn view(&self) -> View {
        self.round.view
    }

    pub fn status(&self) -> Status {
        self.round.status
    }

    pub fn is_leader(&self) -> bool {
        self.leader()
            .map(|key| key == self.identity.public_key())
            .unwrap_or(false)
    }

    pub fn leader(&self) -> Option<PublicKey> {
        self.peers
            .leader(self.round.height.0, self.round.view.0)
            .map(|p| p.public_key)
    }

    /// Deadline at which `on_round_timeout` should be invoked if the round
    /// has not resolved by then.
    pub fn round_deadline(&self) -> Instant {
        self.round.round_started_at + self.config.round_timeout(self.round.view.0)
    }

    /// Resets state for a fresh height, to be called once the previous
    /// round reaches `Committed` or `Rejected`.
    pub fn start_height(&mut self, height: Height) {
        self.round = Round::new(height);
    }

    /// Called once the simulator has produced this peer's candidate block
    /// for the current height. Casts and broadcasts this peer's own vote.
    pub fn on_local_block(&mut self, block: Block, proposal_hash: Hash) -> Vec<Outbound> {
        if self.round.status != Status::Idle {
            return vec![];
        }
        let hash = YacHash {
            proposal_hash,
            block_hash: block.block_hash,
        };
        self.round.candidate = Some((block, hash));
        self.round.status = Status::Voting;
        self.cast_vote(hash)
    }

    fn cast_vote(&mut self, hash: YacHash) -> Vec<Outbound> {
        let payload = VoteMessage::signing_payload(self.round.height, self.round.view, hash);
        let vote = VoteMessage {
            height: self.round.height,
            view: self.round.view,
            hash,
            author: self.identity.public_key(),
            signature: self.identity.sign(&payload),
        };
        let mut outbound = vec![Outbound::Broadcast(Message::SendVote(vote.clone()))];
        let recorded = self
            .record_vote(vote)
            .expect("a peer's own freshly cast vote can never equivocate against itself");
        outbound.extend(recorded);
        outbound
    }

    /// Validates and tallies an incoming vote, returning any messages this
    /// transition produces (a commit or reject broadcast). A vote that
    /// proves its author equivocated is fatal, not merely invalid input.
    pub fn on_vote(&mut self, vote: VoteMessage) -> Result<Vec<Outbound>, NodeError> {
        if vote.height != self.round.height {
            return Err(InvalidInputError::UnknownHeight(vote.height.0).into());
        }
        if !self.peers.contains(&vote.author) {
            return Err(InvalidInputError::NotAPeer(vote.author).into());
        }
        let payload = VoteMessage::signing_payload(vote.height, vote.view, vote.hash);
        if !crypto::verify(&vote.author, &payload, &vote.signature) {
            return Err(InvalidInputError::BadSignature.into());
        }
        Ok(self.record_vote(vote)?)
    }

    /// Inserts a validated vote into the tally and checks whether the
    /// round has just resolved. A second, distinct vote from an author
    /// already on record is proof of equivocation: `detect_equivocation`
    /// turns the pair into evidence and this halts the node rather than
    /// silently tallying around it.
    fn record_vote(&mut self, vote: VoteMessage) -> Result<Vec<Outbound>, SafetyViolation> {
        if matches!(self.round.status, Status::Committed | Status::Rejected) {
            return Ok(vec![]);
        }
        match self.round.voted.get(&vote.author) {
            Some(existing) if *existing != vote.hash => {
                let original = self
                    .round
                    .votes
                    .get(existing)
                    .and_then(|bucket| bucket.get(&vote.author))
                    .cloned()
                    .expect("an author recorded in `voted` always has a matching bucket entry");
                return Err(self
                    .detect_equivocation(&original, &vote)
                    .expect("same author, same height, different hash is exactly what was just checked"));
            }
            Some(existing) if self.round.votes.get(existing).map_or(false, |b| b.contains_key(&vote.author)) => {
                return Ok(vec![]); // duplicate of the recorded vote, nothing new
            }
            _ => {}
        }
        self.round.voted.insert(vote.author, vote.hash);
        self.round
            .votes
            .entry(vote.hash)
            .or_insert_with(HashMap::new)
            .insert(vote.author, vote);

        Ok(self.check_round_outcome())
    }

    fn check_round_outcome(&mut self) -> Vec<Outbound> {
        let threshold = self.peers.threshold();
        if let Some((hash, bucket)) = self
            .round
            .votes
            .iter()
            .find(|(_, bucket)| bucket.len() >= threshold)
        {
            let hash = *hash;
            let votes: Vec<_> = bucket.values().cloned().collect();
            self.round.status = Status::Committed;
            let commit = CommitMessage {
                height: self.round.height,
                hash,
                votes,
            };
            return vec![Outbound::Broadcast(Message::SendCommit(commit))];
        }

        if self.impossible_to_commit() {
            self.round.status = Status::Rejected;
            let votes: Vec<_> = self
                .round
                .votes
                .values()
                .flat_map(|bucket| bucket.values().cloned())
                .collect();
            let reject = RejectMessage {
                height: self.round.height,
                view: self.round.view,
                votes,
            };
            return vec![Outbound::Broadcast(Message::SendReject(reject))];
        }
        vec![]
    }

    /// True once no `YacHash` can still reach the supermajority threshold:
    /// the leading bucket plus every vote still outstanding would fall
    /// short. This is the standard no-possible-winner test; it subsumes
    /// the spec's "total votes received >= T" precondition, since the
    /// inequality checked here is strictly tighter and evaluating it as
    /// soon as it holds only brings the view-change forward, never delays
    /// it.
    fn impossible_to_commit(&self) -> bool {
        let n = self.peers.len();
        let received: usize = self.round.votes.values().map(HashMap::len).sum();
        let remaining = n.saturating_sub(received);
        let max_bucket = self.round.votes.values().map(HashMap::len).max().unwrap_or(0);
        max_bucket + remaining < self.peers.threshold()
    }

    /// Accepts a commit certificate received from another peer — the path
    /// lagging or differently-voting peers use to converge. Verified
    /// independently of this peer's own tally.
    pub fn on_commit_message(&mut self, commit: CommitMessage) -> Result<(), InvalidInputError> {
        if commit.height != self.round.height {
            return Err(InvalidInputError::UnknownHeight(commit.height.0));
        }
        self.verify_certificate(&commit.votes, commit.hash)?;
        self.round.status = Status::Committed;
        Ok(())
    }

    fn verify_certificate(
        &self,
        votes: &[VoteMessage],
        hash: YacHash,
    ) -> Result<(), InvalidInputError> {
        let mut signers = std::collections::HashSet::new();
        for vote in votes {
            if vote.hash != hash || !self.peers.contains(&vote.author) {
                continue;
            }
            let payload = VoteMessage::signing_payload(vote.height, vote.view, vote.hash);
            if crypto::verify(&vote.author, &payload, &vote.signature) {
                signers.insert(vote.author);
            }
        }
        if signers.len() < self.peers.threshold() {
            return Err(InvalidInputError::Decode(
                "commit certificate below supermajority threshold".into(),
            ));
        }
        Ok(())
    }

    /// Turns two votes from the same author into evidence of equivocation
    /// if they disagree on the hash for the same height: the proof
    /// `record_vote` hands to `SafetyViolation::Equivocation` once it sees
    /// a second, conflicting vote from an author already on record.
    pub fn detect_equivocation(
        &self,
        a: &VoteMessage,
        b: &VoteMessage,
    ) -> Option<SafetyViolation> {
        if a.author == b.author && a.height == b.height && a.hash != b.hash {
            Some(SafetyViolation::Equivocation(a.author, a.height.0))
        } else {
            None
        }
    }

    /// Advances the view, rotating the leader, and re-broadcasts this
    /// peer's existing vote (if any) under the new view. Called by the
    /// caller once `round_deadline()` has elapsed without a resolution.
    pub fn on_round_timeout(&mut self) -> Vec<Outbound> {
        if matches!(self.round.status, Status::Committed | Status::Rejected) {
            return vec![];
        }
        self.round.view = View(self.round.view.0 + 1);
        self.round.round_started_at = Instant::now();

        match self.round.candidate {
            Some((_, hash)) => self.cast_vote(hash),
            None => vec![],
        }
    }

    pub fn outcome(&self) -> Option<RoundOutcome> {
        match self.round.status {
            Status::Committed => {
                let (block, hash) = self.round.candidate.clone()?;
                let bucket = self.round.votes.get(&hash)?;
                let votes: Vec<_> = bucket.values().cloned().collect();
                Some(RoundOutcome::Committed(
                    block,
                    CommitMessage {
                        height: self.round.height,
                        hash,
                        votes,
                    },
                ))
            }
            Status::Rejected => {
                let votes: Vec<_> = self
                    .round
                    .votes
                    .values()
                    .flat_map(|bucket| bucket.values().cloned())
                    .collect();
                Some(RoundOutcome::Rejected(RejectMessage {
                    height: self.round.height,
                    view: self.round.view,
                    votes,
                }))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peers::ConnectInfo;

    fn rebuild_with_identities(n: usize) -> (Vec<KeyPair>, PeerSetConfig, Vec<Yac>) {
        let keys: Vec<KeyPair> = (0..n).map(|_| KeyPair::generate()).collect();
        let pub_keys: Vec<_> = keys.iter().map(KeyPair::public_key).collect();
        let peer_set = PeerSetConfig {
            peers: pub_keys
                .iter()
                .enumerate()
                .map(|(i, k)| ConnectInfo {
                    address: format!("127.0.0.1:{}", 7000 + i),
                    public_key: *k,
                })
                .collect(),
        };
        let nodes = keys
            .iter()
            .cloned()
            .map(|k| Yac::new(k, peer_set.clone(), ConsensusConfig::default()))
            .collect();
        (keys, peer_set, nodes)
    }

    fn sample_block(height: Height, n: u8) -> Block {
        Block {
            height,
            prev_hash: Hash::zero(),
            created_at: n as i64,
            transactions: vec![],
            block_hash: Hash::of(&[n]),
        }
    }

    #[test]
    fn four_peers_agreeing_reach_commit() {
        let (_keys, _peers, mut nodes) = rebuild_with_identities(4);
        let block = sample_block(Height(1), 1);
        let proposal_hash = Hash::of(b"proposal");

        let mut votes = Vec::new();
        for node in &mut nodes {
            let out = node.on_local_block(block.clone(), proposal_hash);
            for o in out {
                let Outbound::Broadcast(Message::SendVote(v)) = o else { continue };
                votes.push(v);
            }
        }

        for node in &mut nodes {
            for v in &votes {
                node.on_vote(v.clone()).unwrap();
            }
        }

        for node in &nodes {
            assert_eq!(node.status(), Status::Committed);
        }
    }

    #[test]
    fn equivocating_vote_halts_with_safety_violation() {
        let (keys, _peers, mut nodes) = rebuild_with_identities(4);
        let block_a = sample_block(Height(1), 1);
        let block_b = sample_block(Height(1), 2);
        let proposal_hash = Hash::of(b"proposal");

        let hash_a = YacHash {
            proposal_hash,
            block_hash: block_a.block_hash,
        };
        let hash_b = YacHash {
            proposal_hash,
            block_hash: block_b.block_hash,
        };

        let equivocator = &keys[0];
        let payload_a = VoteMessage::signing_payload(Height(1), View(0), hash_a);
        let vote_a = VoteMessage {
            height: Height(1),
            view: View(0),
            hash: hash_a,
            author: equivocator.public_key(),
            signature: equivocator.sign(&payload_a),
        };
        let payload_b = VoteMessage::signing_payload(Height(1), View(0), hash_b);
        let vote_b = VoteMessage {
            height: Height(1),
            view: View(0),
            hash: hash_b,
            author: equivocator.public_key(),
            signature: equivocator.sign(&payload_b),
        };

        let observer = &mut nodes[1];
        observer.on_vote(vote_a).unwrap();
        let err = observer.on_vote(vote_b).unwrap_err();
        assert!(matches!(
            err,
            NodeError::Safety(SafetyViolation::Equivocation(author, 1)) if author == equivocator.public_key()
        ));
    }

    #[test]
    fn split_vote_rejects_round() {
        let (keys, _peers, mut nodes) = rebuild_with_identities(4);
        let block_a = sample_block(Height(1), 1);
        let block_b = sample_block(Height(1), 2);
        let proposal_hash = Hash::of(b"proposal");
        let hash_a = YacHash { proposal_hash, block_hash: block_a.block_hash };
        let hash_b = YacHash { proposal_hash, block_hash: block_b.block_hash };

        let observer = &mut nodes[0];
        // two vote for A, two vote for B: with n=4, T=3, neither can reach T.
        for (i, k) in keys.iter().enumerate() {
            let hash = if i % 2 == 0 { hash_a } else { hash_b };
            let payload = VoteMessage::signing_payload(Height(1), View(0), hash);
            let vote = VoteMessage {
                height: Height(1),
                view: View(0),
                hash,
                author: k.public_key(),
                signature: k.sign(&payload),
            };
            observer.on_vote(vote).unwrap();
        }
        assert_eq!(observer.status(), Status::Rejected);
    }

    #[test]
    fn round_timeout_advances_view_and_keeps_candidate() {
        let (_keys, _peers, mut nodes) = rebuild_with_identities(4);
        let block = sample_block(Height(1), 1);
        let proposal_hash = Hash::of(b"proposal");
        let node = &mut nodes[0];
        node.on_local_block(block, proposal_hash);
        assert_eq!(node.view(), View(0));
        node.on_round_timeout();
        assert_eq!(node.view(), View(1));
        assert_eq!(node.status(), Status::Voting);
    }

    #[test]
    fn vote_for_wrong_height_is_rejected() {
        let (keys, _peers, mut nodes) = rebuild_with_identities(4);
        let block = sample_block(Height(2), 1);
        let proposal_hash = Hash::of(b"proposal");
        let hash = YacHash { proposal_hash, block_hash: block.block_hash };
        let payload = VoteMessage::signing_payload(Height(2), View(0), hash);
        let vote = VoteMessage {
            height: Height(2),
            view: View(0),
            hash,
            author: keys[0].public_key(),
            signature: keys[0].sign(&payload),
        };
        let err = nodes[1].on_vote(vote).unwrap_err();
        assert!(matches!(
            err,
            NodeError::InvalidInput(InvalidInputError::UnknownHeight(2))
        ));
    }
}
