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

//! Node configuration: the genesis peer set, this node's identity, and the
//! timing parameters that drive ordering and view-change. Loaded from a
//! TOML file by `yac-cli`; validated once at startup so a bad config fails
//! fast rather than surfacing as a runtime error later.

use anyhow::{ensure, Context, Result};
use hex::{FromHex, ToHex};
use serde_derive::{Deserialize, Serialize};

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::crypto::KeyPair;
use crate::peers::PeerSetConfig;

/// Validates a configuration value, failing fast with a descriptive error
/// rather than producing a node that misbehaves at runtime.
pub trait ValidateInput {
    fn validate(&self) -> Result<()>;
}

/// Ordering-service timing: when to cut a proposal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderingConfig {
    pub max_proposal_size: usize,
    pub proposal_delay_ms: u64,
    /// Number of recent committed blocks checked for duplicate transaction
    /// hashes before admitting a new one into the FIFO.
    pub dedup_window: usize,
}

impl Default for OrderingConfig {
    fn default() -> Self {
        Self {
            max_proposal_size: 10,
            proposal_delay_ms: 5000,
            dedup_window: 100,
        }
    }
}

impl OrderingConfig {
    pub fn proposal_delay(&self) -> Duration {
        Duration::from_millis(self.proposal_delay_ms)
    }
}

impl ValidateInput for OrderingConfig {
    fn validate(&self) -> Result<()> {
        ensure!(self.max_proposal_size > 0, "max_proposal_size must be > 0");
        ensure!(self.proposal_delay_ms > 0, "proposal_delay_ms must be > 0");
        Ok(())
    }
}

/// YAC round-timeout schedule: `first_round_timeout_ms * 2^view`, capped at
/// `max_round_timeout_ms`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsensusConfig {
    pub first_round_timeout_ms: u64,
    pub max_round_timeout_ms: u64,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            first_round_timeout_ms: 3000,
            max_round_timeout_ms: 60_000,
        }
    }
}

impl ConsensusConfig {
    pub fn round_timeout(&self, view: u64) -> Duration {
        let shift = view.min(20) as u32;
        let scaled = self.first_round_timeout_ms.saturating_mul(1u64 << shift);
        Duration::from_millis(scaled.min(self.max_round_timeout_ms))
    }
}

impl ValidateInput for ConsensusConfig {
    fn validate(&self) -> Result<()> {
        ensure!(
            self.first_round_timeout_ms > 0,
            "first_round_timeout_ms must be > 0"
        );
        ensure!(
            self.max_round_timeout_ms >= self.first_round_timeout_ms,
            "max_round_timeout_ms must be >= first_round_timeout_ms"
        );
        Ok(())
    }
}

/// This node's network identity: listen address and keypair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeIdentity {
    pub listen_address: String,
    /// 32-byte Ed25519 seed, hex-encoded. Read from the config file; in a
    /// production deployment this would live behind a passphrase-encrypted
    /// master key, handled by `yac-cli`'s `password` module.
    pub secret_key_hex: String,
}

impl NodeIdentity {
    pub fn keypair(&self) -> Result<KeyPair> {
        let bytes = hex_decode(&self.secret_key_hex)
            .context("secret_key_hex is not valid hex")?;
        ensure!(bytes.len() == 32, "secret key must decode to 32 bytes");
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(KeyPair::from_bytes(&arr))
    }
}

/// Full node configuration as loaded from disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    pub identity: NodeIdentity,
    pub peers: PeerSetConfig,
    #[serde(default)]
    pub ordering: OrderingConfig,
    #[serde(default)]
    pub consensus: ConsensusConfig,
    /// Directory holding the append-only block store.
    pub db_path: PathBuf,
}

impl ValidateInput for NodeConfig {
    fn validate(&self) -> Result<()> {
        ensure!(!self.peers.is_empty(), "peer set must not be empty");
        let keys = self
            .identity
            .keypair()
            .context("invalid node identity")?;
        ensure!(
            self.peers.contains(&keys.public_key()),
            "this node's public key is not present in the configured peer set"
        );
        self.ordering.validate()?;
        self.consensus.validate()?;
        Ok(())
    }
}

impl NodeConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("failed to read node config at {:?}", path.as_ref()))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("failed to parse node config at {:?}", path.as_ref()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}

fn hex_decode(s: &str) -> Result<Vec<u8>> {
    Vec::from_hex(s).context("invalid hex")
}

pub fn hex_encode(bytes: &[u8]) -> String {
    bytes.encode_hex()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peers::ConnectInfo;

    fn sample_config() -> NodeConfig {
        let keys = KeyPair::generate();
        NodeConfig {
            identity: NodeIdentity {
                listen_address: "127.0.0.1:7000".to_owned(),
                secret_key_hex: hex_encode(&keys.secret_bytes()),
            },
            peers: PeerSetConfig {
                peers: vec![ConnectInfo {
                    address: "127.0.0.1:7000".to_owned(),
                    public_key: keys.public_key(),
                }],
            },
            ordering: OrderingConfig::default(),
            consensus: ConsensusConfig::default(),
            db_path: PathBuf::from("/tmp/yac-db"),
        }
    }

    #[test]
    fn valid_config_passes_validation() {
        assert!(sample_config().validate().is_ok());
    }

    #[test]
    fn config_rejects_identity_not_in_peer_set() {
        let mut config = sample_config();
        config.identity.secret_key_hex = hex_encode(&KeyPair::generate().secret_bytes());
        assert!(config.validate().is_err());
    }

    #[test]
    fn config_rejects_empty_peer_set() {
        let mut config = sample_config();
        config.peers.peers.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn round_timeout_grows_exponentially_and_caps() {
        let consensus = ConsensusConfig {
            first_round_timeout_ms: 1000,
            max_round_timeout_ms: 5000,
        };
        assert_eq!(consensus.round_timeout(0), Duration::from_millis(1000));
        assert_eq!(consensus.round_timeout(1), Duration::from_millis(2000));
        assert_eq!(consensus.round_timeout(2), Duration::from_millis(4000));
        assert_eq!(consensus.round_timeout(3), Duration::from_millis(5000));
    }
}
