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

//! Peer Transport: a TCP listener plus one outbound connection per peer,
//! each framed with [`MessagesCodec`]. Delivers bytes; it does not
//! authenticate peers itself beyond checking the connect-list allow-list
//! at handshake time, since authentication proper happens inside message
//! signatures, checked by the consumer.

use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_util::codec::Framed;

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

use crate::crypto::PublicKey;
use crate::events::codec::MessagesCodec;
use crate::messages::{Connect, Message};
use crate::peers::{ConnectList, PeerSetConfig};

/// An event the transport layer hands up to the node's dispatch loop.
#[derive(Debug)]
pub enum NetworkEvent {
    MessageReceived(PublicKey, Message),
    PeerConnected(PublicKey, SocketAddr),
    PeerDisconnected(PublicKey),
    UnableToConnect(PublicKey),
}

/// A request the dispatch loop makes of the transport.
#[derive(Debug)]
pub enum NetworkRequest {
    SendTo(PublicKey, Message),
    Broadcast(Message),
    Disconnect(PublicKey),
}

/// Runs the listener and one outbound connector per configured peer,
/// forwarding inbound events to `events_tx` and outbound sends from
/// `requests_rx`.
pub struct NetworkPart {
    pub listen_addr: SocketAddr,
    pub local_public_key: PublicKey,
    pub peers: PeerSetConfig,
    pub events_tx: mpsc::Sender<NetworkEvent>,
    pub requests_rx: mpsc::Receiver<NetworkRequest>,
}

impl NetworkPart {
    pub async fn run(mut self) -> anyhow::Result<()> {
        let listener = TcpListener::bind(self.listen_addr).await?;
        let connect_list = ConnectList::from_config(&self.peers);

        let mut outbound: HashMap<PublicKey, mpsc::Sender<Message>> = HashMap::new();
        for peer in &self.peers.peers {
            if peer.public_key == self.local_public_key {
                continue;
            }
            let tx = self.spawn_connector(peer.public_key, peer.address.clone());
            outbound.insert(peer.public_key, tx);
        }

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (stream, addr) = accepted?;
                    self.spawn_inbound(stream, addr, connect_list.clone());
                }
                request = self.requests_rx.recv() => {
                    match request {
                        Some(NetworkRequest::SendTo(peer, msg)) => {
                            if let Some(tx) = outbound.get(&peer) {
                                let _ = tx.send(msg).await;
                            }
                        }
                        Some(NetworkRequest::Broadcast(msg)) => {
                            for tx in outbound.values() {
                                let _ = tx.send(msg.clone()).await;
                            }
                        }
                        Some(NetworkRequest::Disconnect(peer)) => {
                            outbound.remove(&peer);
                        }
                        None => break,
                    }
                }
            }
        }
        Ok(())
    }

    fn spawn_connector(&self, peer: PublicKey, addr: String) -> mpsc::Sender<Message> {
        let (tx, mut rx) = mpsc::channel::<Message>(256);
        let events_tx = self.events_tx.clone();
        let local_key = self.local_public_key;
        let listen_addr = self.listen_addr;
        tokio::spawn(async move {
            let mut backoff = Duration::from_millis(200);
            loop {
                match TcpStream::connect(&addr).await {
                    Ok(stream) => {
                        backoff = Duration::from_millis(200);
                        let mut framed = Framed::new(stream, MessagesCodec);
                        let hello = Connect {
                            public_key: local_key,
                            address: listen_addr.to_string(),
                            created_at: 0,
                        };
                        if framed.send(Message::Connect(hello)).await.is_err() {
                            tokio::time::sleep(jittered(backoff)).await;
                            backoff = (backoff * 2).min(Duration::from_secs(30));
                            continue;
                        }
                        let _ = events_tx
                            .send(NetworkEvent::PeerConnected(peer, listen_addr))
                            .await;
                        loop {
                            tokio::select! {
                                outgoing = rx.recv() => {
                                    match outgoing {
                                        Some(msg) => {
                                            if framed.send(msg).await.is_err() {
                                                break;
                                            }
                                        }
                                        None => return,
                                    }
                                }
                                incoming = framed.next() => {
                                    match incoming {
                                        Some(Ok(msg)) => {
                                            let _ = events_tx
                                                .send(NetworkEvent::MessageReceived(peer, msg))
                                                .await;
                                        }
                                        _ => break,
                                    }
                                }
                            }
                        }
                        let _ = events_tx.send(NetworkEvent::PeerDisconnected(peer)).await;
                    }
                    Err(_) => {
                        let _ = events_tx.send(NetworkEvent::UnableToConnect(peer)).await;
                    }
                }
                tokio::time::sleep(jittered(backoff)).await;
                backoff = (backoff * 2).min(Duration::from_secs(30));
            }
        });
        tx
    }

    fn spawn_inbound(&self, stream: TcpStream, addr: SocketAddr, connect_list: ConnectList) {
        let events_tx = self.events_tx.clone();
        tokio::spawn(async move {
            let mut framed = Framed::new(stream, MessagesCodec);
            let first = match framed.next().await {
                Some(Ok(Message::Connect(connect))) => connect,
                _ => return,
            };
            if !connect_list.is_peer_allowed(&first.public_key) {
                log::warn!("rejecting connection from {}: not in peer set", addr);
                return;
            }
            let peer = first.public_key;
            let _ = events_tx.send(NetworkEvent::PeerConnected(peer, addr)).await;
            while let Some(frame) = framed.next().await {
                match frame {
                    Ok(msg) => {
                        let _ = events_tx.send(NetworkEvent::MessageReceived(peer, msg)).await;
                    }
                    Err(e) => {
                        log::debug!("connection from {} closed: {}", addr, e);
                        break;
                    }
                }
            }
            let _ = events_tx.send(NetworkEvent::PeerDisconnected(peer)).await;
        });
    }
}

/// Adds up to 20% random jitter to a backoff duration, so a burst of peers
/// reconnecting after a partition does not retry in lockstep.
fn jittered(base: Duration) -> Duration {
    use rand::Rng;
    let jitter_ms = rand::thread_rng().gen_range(0..=(base.as_millis() as u64 / 5).max(1));
    base + Duration::from_millis(jitter_ms)
}
