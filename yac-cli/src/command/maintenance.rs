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

//! Read-only inspection of an on-disk block store: current height and the
//! hash of the most recently finalized block. Opening the store still
//! runs full recovery (chain linkage and certificate threshold checks),
//! so a corrupted store is reported here rather than only failing at
//! `run` time.

use anyhow::Error;
use structopt::StructOpt;

use std::path::PathBuf;

use yac_node::store::BlockStore;

use crate::command::{NodeCommand, StandardResult};
use crate::io::load_config_file;

#[derive(StructOpt, Debug)]
pub struct Maintenance {
    /// Path to a node configuration file (used for its peer set, to
    /// verify commit certificates during recovery).
    #[structopt(long, short = "c")]
    pub node_config: PathBuf,
    /// Path to a database directory.
    #[structopt(long, short = "d")]
    pub db_path: PathBuf,
}

impl NodeCommand for Maintenance {
    fn execute(self) -> Result<StandardResult, Error> {
        let config: yac_node::config::NodeConfig = load_config_file(&self.node_config)?;
        let store = BlockStore::open(&self.db_path, &config.peers)?;
        let height = store.height();
        let last_block_hash = height.and_then(|h| store.hash_of(h)).map(|h| h.to_hex());
        Ok(StandardResult::Maintenance {
            height: height.map(|h| h.0),
            last_block_hash,
        })
    }
}
