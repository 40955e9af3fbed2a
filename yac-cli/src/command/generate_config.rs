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

//! Generates a fresh keypair and a single-peer genesis config for one
//! node. Useful for a one-node sandbox; joining an existing network means
//! hand-editing the `peers` list this writes, or using `generate-testnet`
//! to produce a whole consistent set up front.

use anyhow::Error;
use structopt::StructOpt;

use std::net::SocketAddr;
use std::path::PathBuf;

use yac_node::config::{ConsensusConfig, NodeConfig, NodeIdentity, OrderingConfig};
use yac_node::crypto::KeyPair;
use yac_node::peers::{ConnectInfo, PeerSetConfig};

use crate::command::{NodeCommand, StandardResult};
use crate::io::save_config_file;

#[derive(StructOpt, Debug)]
pub struct GenerateConfig {
    /// Address other peers will use to reach this node.
    #[structopt(long, short = "a")]
    pub peer_address: SocketAddr,
    /// Where to write the generated node configuration.
    #[structopt(long, short = "o")]
    pub output: PathBuf,
    /// Directory the node will use for its block store.
    #[structopt(long, short = "d")]
    pub db_path: PathBuf,
}

impl NodeCommand for GenerateConfig {
    fn execute(self) -> Result<StandardResult, Error> {
        let keys = KeyPair::generate();
        let identity = NodeIdentity {
            listen_address: self.peer_address.to_string(),
            secret_key_hex: yac_node::config::hex_encode(&keys.secret_bytes()),
        };
        let config = NodeConfig {
            identity,
            peers: PeerSetConfig {
                peers: vec![ConnectInfo {
                    address: self.peer_address.to_string(),
                    public_key: keys.public_key(),
                }],
            },
            ordering: OrderingConfig::default(),
            consensus: ConsensusConfig::default(),
            db_path: self.db_path,
        };

        save_config_file(&config, &self.output)?;
        Ok(StandardResult::GenerateConfig {
            config_path: self.output,
        })
    }
}
