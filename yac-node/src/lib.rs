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

//! A permissioned BFT consensus node: orders submitted transactions,
//! simulates them deterministically into candidate blocks, runs a
//! single-round YAC vote over those candidates, and persists whatever the
//! vote settles on.
//!
//! # Overview
//!
//! This crate contains the following APIs:
//!
//! - [`Node`] assembles and runs a full node: transport, timers and the
//!   [`PeerCommunicationService`](pcs::PeerCommunicationService) façade.
//! - [`NodeBuilder`] constructs a [`Node`] from a loaded [`config::NodeConfig`].
//! - [`ShutdownHandle`] lets a caller ask a running node to stop.
//!
//! The consensus algorithm itself lives in [`consensus`]; the pipeline
//! stages that feed it are [`ordering`], [`simulator`] and
//! [`synchronizer`]. [`store`] is the append-only persisted block log.

#![warn(missing_debug_implementations, unsafe_code)]

pub mod bus;
pub mod config;
pub mod consensus;
pub mod crypto;
pub mod error;
pub mod events;
pub mod messages;
pub mod ordering;
pub mod pcs;
pub mod peers;
pub mod simulator;
pub mod store;
pub mod synchronizer;
pub mod verifier;

use std::time::{Duration, Instant};

use tokio::sync::{mpsc, oneshot};

use crate::config::{NodeConfig, ValidateInput};
use crate::error::{ConfigError, InvalidInputError, NodeError};
use crate::events::{InternalEvent, InternalTimer, NetworkEvent, NetworkPart, NetworkRequest};
use crate::messages::{CommittedBlock, Message};
use crate::pcs::{Effect, PeerCommunicationService};
use crate::verifier::{Ed25519Verifier, Verifier};

/// A handle that lets a caller stop a running [`Node`] and wait for it to
/// finish tearing down, mirroring the request/acknowledge shutdown pattern
/// this crate's predecessor used for its reactor.
#[derive(Debug)]
pub struct ShutdownHandle {
    stop_tx: Option<oneshot::Sender<()>>,
}

impl ShutdownHandle {
    /// Signals the node to stop. A second call is a no-op: idempotent
    /// shutdown is relied on by scenario S6.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Constructs a [`Node`] from configuration, wiring a real
/// [`Ed25519Verifier`] into every stage that needs one. There is no mock
/// verifier reachable from this path; tests that need one construct
/// [`PeerCommunicationService`] directly.
pub struct NodeBuilder {
    config: NodeConfig,
}

impl NodeBuilder {
    pub fn new(config: NodeConfig) -> Self {
        Self { config }
    }

    pub fn build(self) -> Result<Node, NodeError> {
        self.config
            .validate()
            .map_err(|e| NodeError::Config(ConfigError::Invalid(e.to_string())))?;
        let pcs = PeerCommunicationService::new(&self.config, || {
            Box::new(Ed25519Verifier) as Box<dyn Verifier>
        })?;
        Ok(Node {
            config: self.config,
            pcs,
        })
    }
}

/// A full node: the [`PeerCommunicationService`] façade driven by network
/// events and two internal timers (round timeout, proposal tick).
pub struct Node {
    config: NodeConfig,
    pcs: PeerCommunicationService,
}

impl Node {
    /// Subscribes to finalized blocks before the node starts running, so
    /// no commit is missed between construction and the first `run` poll.
    pub fn subscribe_commits(&mut self) -> mpsc::Receiver<CommittedBlock> {
        self.pcs.subscribe_commits()
    }

    /// Spawns the node onto the current runtime, returning a handle to
    /// request shutdown and the task that completes once it stops (either
    /// via that handle or SIGINT/SIGTERM).
    pub fn spawn(self) -> (ShutdownHandle, tokio::task::JoinHandle<Result<(), NodeError>>) {
        let (stop_tx, stop_rx) = oneshot::channel();
        let handle = ShutdownHandle {
            stop_tx: Some(stop_tx),
        };
        let join = tokio::spawn(self.run_until(stop_rx));
        (handle, join)
    }

    /// Runs the node until `stop_rx` fires or the process receives
    /// SIGINT/SIGTERM.
    async fn run_until(mut self, mut stop_rx: oneshot::Receiver<()>) -> Result<(), NodeError> {
        let (events_tx, mut events_rx) = mpsc::channel::<NetworkEvent>(1024);
        let (requests_tx, requests_rx) = mpsc::channel::<NetworkRequest>(1024);

        let listen_addr = self
            .config
            .identity
            .listen_address
            .parse()
            .map_err(|_| {
                NodeError::Config(error::ConfigError::Invalid(format!(
                    "invalid listen address: {}",
                    self.config.identity.listen_address
                )))
            })?;
        let local_public_key = self
            .config
            .identity
            .keypair()
            .map_err(|e| NodeError::Config(error::ConfigError::Invalid(e.to_string())))?
            .public_key();

        let network = NetworkPart {
            listen_addr,
            local_public_key,
            peers: self.config.peers.clone(),
            events_tx,
            requests_rx,
        };
        let network_task = tokio::spawn(network.run());

        let mut round_timer = InternalTimer::new(InternalEvent::RoundTimeout, self.pcs.round_deadline());
        let mut proposal_timer = InternalTimer::new(
            InternalEvent::ProposalTick,
            Instant::now() + Duration::from_millis(50),
        );

        loop {
            tokio::select! {
                _ = &mut stop_rx => {
                    log::info!("node shutting down");
                    break;
                }
                _ = tokio::signal::ctrl_c() => {
                    log::info!("received interrupt, shutting down");
                    break;
                }
                event = events_rx.recv() => {
                    match event {
                        Some(NetworkEvent::MessageReceived(peer, msg)) => {
                            self.handle_message(peer, msg, &requests_tx).await;
                            round_timer.rearm(self.pcs.round_deadline());
                        }
                        Some(NetworkEvent::PeerConnected(key, addr)) => {
                            log::debug!("peer {} connected from {}", key, addr);
                        }
                        Some(NetworkEvent::PeerDisconnected(key)) => {
                            log::debug!("peer {} disconnected", key);
                        }
                        Some(NetworkEvent::UnableToConnect(key)) => {
                            crate::error::log_error(error::TransientError::PeerUnreachable(key));
                        }
                        None => break,
                    }
                }
                () = round_timer.sleep() => {
                    let effects = self.pcs.handle_round_timeout();
                    self.dispatch(effects, &requests_tx).await;
                    round_timer.rearm(self.pcs.round_deadline());
                }
                () = proposal_timer.sleep() => {
                    if self.pcs.is_leader() && self.pcs.should_emit_proposal() {
                        let effects = self.pcs.emit_proposal();
                        self.dispatch(effects, &requests_tx).await;
                    }
                    self.pcs.publish_pending_commit().await;
                    proposal_timer.rearm(Instant::now() + Duration::from_millis(50));
                }
            }
        }

        network_task.abort();
        Ok(())
    }

    async fn handle_message(
        &mut self,
        peer: crate::crypto::PublicKey,
        msg: Message,
        requests_tx: &mpsc::Sender<NetworkRequest>,
    ) {
        let effects = match msg {
            Message::SendProposal(proposal) => self.pcs.handle_proposal(proposal),
            // A vote or commit for a height ahead of ours means this peer
            // has missed blocks the sender already has; ask it for them
            // rather than just discarding the message as invalid input.
            Message::SendVote(vote) => match self.pcs.handle_vote(vote) {
                Ok(effects) => effects,
                Err(InvalidInputError::UnknownHeight(h)) if h > self.pcs.height().0 => {
                    self.catch_up_from(peer)
                }
                Err(e) => {
                    crate::error::log_error(e);
                    return;
                }
            },
            Message::SendCommit(commit) => match self.pcs.handle_commit(commit) {
                Ok(effects) => effects,
                Err(InvalidInputError::UnknownHeight(h)) if h > self.pcs.height().0 => {
                    self.catch_up_from(peer)
                }
                Err(e) => {
                    crate::error::log_error(e);
                    return;
                }
            },
            Message::SendReject(_) => vec![],
            Message::SubmitTransaction(tx) => {
                self.pcs.submit_transaction(tx);
                vec![]
            }
            Message::RequestBlocks { from_height } => self
                .pcs
                .handle_request_blocks(from_height)
                .into_iter()
                .map(|block| Effect::Reply(peer, Message::BlockResponse(block)))
                .collect(),
            Message::BlockResponse(committed) => {
                if let Err(violation) = self.pcs.handle_block_response(committed) {
                    log::error!("halting on safety violation: {}", violation);
                    panic!("safety violation: {}", violation);
                }
                vec![]
            }
            Message::Connect(_) => vec![],
        };
        self.dispatch(effects, requests_tx).await;
        self.pcs.publish_pending_commit().await;
    }

    /// Asks `peer` for every block from our current height onward. Used
    /// when a vote or commit reveals we are behind the rest of the network.
    fn catch_up_from(&self, peer: crate::crypto::PublicKey) -> Vec<Effect> {
        vec![Effect::FetchBlocks {
            from_height: self.pcs.height(),
            ask: vec![peer],
        }]
    }

    async fn dispatch(&self, effects: Vec<Effect>, requests_tx: &mpsc::Sender<NetworkRequest>) {
        for effect in effects {
            match effect {
                Effect::Send(msg) => {
                    let _ = requests_tx.send(NetworkRequest::Broadcast(msg)).await;
                }
                Effect::Reply(peer, msg) => {
                    let _ = requests_tx.send(NetworkRequest::SendTo(peer, msg)).await;
                }
                Effect::FetchBlocks { from_height, ask } => {
                    for peer in ask {
                        let _ = requests_tx
                            .send(NetworkRequest::SendTo(
                                peer,
                                Message::RequestBlocks { from_height },
                            ))
                            .await;
                    }
                }
            }
        }
    }
}
