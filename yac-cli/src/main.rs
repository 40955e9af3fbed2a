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

//! `yac-cli`: generates node configuration and launches the node.
//!
//! Exit codes for `run`: `0` on a clean shutdown, `1` on a fatal runtime
//! error, `2` on a configuration problem caught before the node starts
//! accepting connections.

use yac_node::NodeBuilder;

use command::{Command, NodeCommand, StandardResult};

mod command;
mod io;

const EXIT_OK: i32 = 0;
const EXIT_RUNTIME_ERROR: i32 = 1;
const EXIT_CONFIG_ERROR: i32 = 2;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let command = Command::from_args();
    let is_run = matches!(command, Command::Run(_));

    match command.execute() {
        Ok(StandardResult::GenerateConfig { config_path }) => {
            println!("wrote node configuration to {}", config_path.display());
        }
        Ok(StandardResult::GenerateTestnet { config_paths }) => {
            println!("wrote {} node configurations:", config_paths.len());
            for path in config_paths {
                println!("  {}", path.display());
            }
        }
        Ok(StandardResult::Maintenance { height, last_block_hash }) => match height {
            Some(h) => println!(
                "height: {}, last block hash: {}",
                h,
                last_block_hash.unwrap_or_default()
            ),
            None => println!("store is empty (no blocks committed yet)"),
        },
        Ok(StandardResult::Run(config)) => run_node(*config),
        Err(e) => {
            log::error!("{:#}", e);
            std::process::exit(if is_run { EXIT_CONFIG_ERROR } else { EXIT_RUNTIME_ERROR });
        }
    }
}

fn run_node(config: yac_node::config::NodeConfig) {
    let node = match NodeBuilder::new(config).build() {
        Ok(node) => node,
        Err(e) => {
            log::error!("failed to start node: {}", e);
            std::process::exit(EXIT_CONFIG_ERROR);
        }
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            log::error!("failed to start async runtime: {}", e);
            std::process::exit(EXIT_RUNTIME_ERROR);
        }
    };

    let exit_code = runtime.block_on(async move {
        let (_handle, join) = node.spawn();
        match join.await {
            Ok(Ok(())) => EXIT_OK,
            Ok(Err(e)) => {
                log::error!("node exited with an error: {}", e);
                EXIT_RUNTIME_ERROR
            }
            Err(e) => {
                log::error!("node task panicked: {}", e);
                EXIT_RUNTIME_ERROR
            }
        }
    });
    std::process::exit(exit_code);
}
