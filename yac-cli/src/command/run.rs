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

//! Runs the node with a prepared configuration file. Validation happens
//! here, before `main` ever touches the network, so a bad config is
//! reported as a configuration error (exit code 2) rather than surfacing
//! mid-run as a generic failure.

use anyhow::Error;
use structopt::StructOpt;

use std::path::PathBuf;

use yac_node::config::ValidateInput;

use crate::command::{NodeCommand, StandardResult};
use crate::io::load_config_file;

#[derive(StructOpt, Debug)]
pub struct Run {
    /// Path to a node configuration file.
    #[structopt(long, short = "c")]
    pub node_config: PathBuf,
    /// Path to a database directory; overrides the `db_path` in the
    /// configuration file.
    #[structopt(long, short = "d")]
    pub db_path: Option<PathBuf>,
}

impl NodeCommand for Run {
    fn execute(self) -> Result<StandardResult, Error> {
        let mut config: yac_node::config::NodeConfig = load_config_file(&self.node_config)?;
        if let Some(db_path) = self.db_path {
            config.db_path = db_path;
        }
        config.validate()?;
        Ok(StandardResult::Run(Box::new(config)))
    }
}
