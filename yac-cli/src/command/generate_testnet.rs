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

//! Generates a consistent set of configs for an `n`-node local testnet: one
//! keypair per node, a shared genesis peer set built from all of them, and
//! one config file per node under its own subdirectory of `output_dir`.

use anyhow::{ensure, Error};
use structopt::StructOpt;

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use yac_node::config::{ConsensusConfig, NodeConfig, NodeIdentity, OrderingConfig};
use yac_node::crypto::KeyPair;
use yac_node::peers::{ConnectInfo, PeerSetConfig};

use crate::command::{NodeCommand, StandardResult};
use crate::io::save_config_file;

#[derive(StructOpt, Debug)]
pub struct GenerateTestnet {
    /// Number of validator nodes in the testnet.
    #[structopt(long, short = "n")]
    pub nodes: usize,
    /// Directory the generated configs and per-node block stores are
    /// written under (one subdirectory per node).
    #[structopt(long, short = "o")]
    pub output_dir: PathBuf,
    /// Base TCP port; node `i` listens on `base_port + i`.
    #[structopt(long, default_value = "7000")]
    pub base_port: u16,
}

impl NodeCommand for GenerateTestnet {
    fn execute(self) -> Result<StandardResult, Error> {
        ensure!(self.nodes > 0, "a testnet needs at least one node");

        let keys: Vec<KeyPair> = (0..self.nodes).map(|_| KeyPair::generate()).collect();
        let peers: Vec<ConnectInfo> = keys
            .iter()
            .enumerate()
            .map(|(i, k)| ConnectInfo {
                address: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), self.base_port + i as u16)
                    .to_string(),
                public_key: k.public_key(),
            })
            .collect();
        let peer_set = PeerSetConfig { peers };

        let mut config_paths = Vec::with_capacity(self.nodes);
        for (i, key) in keys.iter().enumerate() {
            let node_dir = self.output_dir.join(format!("node-{}", i));
            let config_path = node_dir.join("node.toml");
            let config = NodeConfig {
                identity: NodeIdentity {
                    listen_address: peer_set.peers[i].address.clone(),
                    secret_key_hex: yac_node::config::hex_encode(&key.secret_bytes()),
                },
                peers: peer_set.clone(),
                ordering: OrderingConfig::default(),
                consensus: ConsensusConfig::default(),
                db_path: node_dir.join("db"),
            };
            save_config_file(&config, &config_path)?;
            config_paths.push(config_path);
        }

        Ok(StandardResult::GenerateTestnet { config_paths })
    }
}
