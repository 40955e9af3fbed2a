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

//! The node launcher's subcommands: generating configuration, running a
//! node, and read-only maintenance inspection of a block store.

pub mod generate_config;
pub mod generate_testnet;
pub mod maintenance;
pub mod run;

use anyhow::Error;
use structopt::StructOpt;

use crate::command::{
    generate_config::GenerateConfig, generate_testnet::GenerateTestnet, maintenance::Maintenance,
    run::Run,
};

/// A subcommand of the `yac-cli` launcher.
pub trait NodeCommand {
    fn execute(self) -> Result<StandardResult, Error>;
}

#[derive(StructOpt, Debug)]
#[structopt(author, about)]
pub enum Command {
    /// Generate a single node's keypair and a single-peer genesis config.
    #[structopt(name = "generate-config")]
    GenerateConfig(GenerateConfig),
    /// Generate a full set of configs for an n-node local testnet.
    #[structopt(name = "generate-testnet")]
    GenerateTestnet(GenerateTestnet),
    /// Run the node with a prepared configuration file.
    #[structopt(name = "run")]
    Run(Run),
    /// Read-only inspection of an on-disk block store.
    #[structopt(name = "maintenance")]
    Maintenance(Maintenance),
}

impl Command {
    pub fn from_args() -> Self {
        <Self as StructOpt>::from_args()
    }
}

impl NodeCommand for Command {
    fn execute(self) -> Result<StandardResult, Error> {
        match self {
            Command::GenerateConfig(cmd) => cmd.execute(),
            Command::GenerateTestnet(cmd) => cmd.execute(),
            Command::Run(cmd) => cmd.execute(),
            Command::Maintenance(cmd) => cmd.execute(),
        }
    }
}

/// Output of a subcommand, used by `main` to decide what to print and
/// which exit code to return.
pub enum StandardResult {
    GenerateConfig { config_path: std::path::PathBuf },
    GenerateTestnet { config_paths: Vec<std::path::PathBuf> },
    /// The configuration a `run` invocation resolved; `main` hands this to
    /// `yac_node::NodeBuilder` and blocks on the result.
    Run(Box<yac_node::config::NodeConfig>),
    Maintenance { height: Option<u64>, last_block_hash: Option<String> },
}
