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

//! Wire envelope carried by the peer transport, and the canonical encoding
//! every hashed or transmitted type is serialized with.

pub mod types;

pub use types::{
    Block, CommitMessage, CommittedBlock, Connect, Height, Proposal, RejectMessage, Transaction,
    VoteMessage, View, YacHash,
};

use serde::{de::DeserializeOwned, Serialize};
use serde_derive::{Deserialize, Serialize as SerializeDerive};

/// Returns the `bincode` configuration every wire type is encoded with:
/// fixed-width little-endian integers, so that identical logical content
/// always produces identical bytes (required since hashes are computed
/// over serialized forms).
fn bincode_config() -> bincode::Config {
    let mut config = bincode::config();
    config.little_endian();
    config
}

pub fn canonical_encode<T: Serialize>(value: &T) -> Result<Vec<u8>, bincode::Error> {
    bincode_config().serialize(value)
}

pub fn canonical_decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, bincode::Error> {
    bincode_config().deserialize(bytes)
}

/// Top-level message carried over a peer connection, per §4.A of the wire
/// contract: proposal broadcast, YAC voting traffic, catch-up requests and
/// client transaction submission all multiplex over one framed stream.
#[derive(Debug, Clone, SerializeDerive, Deserialize)]
pub enum Message {
    Connect(Connect),
    SendProposal(Proposal),
    SendVote(VoteMessage),
    SendCommit(CommitMessage),
    SendReject(RejectMessage),
    RequestBlocks { from_height: Height },
    BlockResponse(CommittedBlock),
    SubmitTransaction(Transaction),
}

impl Message {
    pub fn into_bytes(&self) -> Vec<u8> {
        canonical_encode(self).expect("message always encodes")
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, bincode::Error> {
        canonical_decode(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;

    #[test]
    fn message_roundtrips_through_canonical_encoding() {
        let keys = KeyPair::generate();
        let connect = Connect {
            public_key: keys.public_key(),
            address: "127.0.0.1:7000".to_owned(),
            created_at: 42,
        };
        let msg = Message::Connect(connect);
        let bytes = msg.into_bytes();
        let decoded = Message::from_bytes(&bytes).unwrap();
        assert_eq!(decoded.into_bytes(), bytes);
    }

    #[test]
    fn proposal_hash_is_stable_across_reencoding() {
        let proposal = Proposal {
            height: Height(1),
            created_at: 1,
            transactions: vec![],
        };
        let bytes = canonical_encode(&proposal).unwrap();
        let decoded: Proposal = canonical_decode(&bytes).unwrap();
        assert_eq!(decoded.hash(), proposal.hash());
        assert_eq!(canonical_encode(&decoded).unwrap(), bytes);
    }
}
