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

//! Error taxonomy of the node: transient, invalid-input, safety-violation
//! and configuration errors, matching the handling rules each kind is
//! subject to.

use thiserror::Error;

use crate::crypto::PublicKey;

/// A transient condition; the caller should retry or let the consensus
/// view-change mechanism recover.
#[derive(Debug, Error)]
pub enum TransientError {
    #[error("peer {0} unreachable")]
    PeerUnreachable(PublicKey),
    #[error("request to peer {0} timed out")]
    Timeout(PublicKey),
    #[error("connection closed before a complete message was read")]
    PartialRead,
}

/// A malformed or unauthorized message. Always logged and dropped, never
/// fatal.
#[derive(Debug, Error)]
pub enum InvalidInputError {
    #[error("failed to decode message: {0}")]
    Decode(String),
    #[error("signature does not verify")]
    BadSignature,
    #[error("vote received from non-peer {0}")]
    NotAPeer(PublicKey),
    #[error("vote references unknown height {0}")]
    UnknownHeight(u64),
    #[error("transaction rejected by stateless validation: {0}")]
    StatelessInvalid(String),
}

/// Evidence of a broken safety property. Fatal: the node halts and
/// preserves the evidence rather than attempting to continue.
#[derive(Debug, Error)]
pub enum SafetyViolation {
    #[error("duplicate block proposed for height {0}")]
    DuplicateHeight(u64),
    #[error("chain discontinuity at height {height}: expected prev_hash {expected}, got {actual}")]
    ChainDiscontinuity {
        height: u64,
        expected: String,
        actual: String,
    },
    #[error("commit certificate for height {height} has {got} signatures, needed {needed}")]
    CertificateShort { height: u64, got: usize, needed: usize },
    #[error("peer {0} equivocated: signed two votes for height {1} on different hashes")]
    Equivocation(PublicKey, u64),
}

/// An error in the node's configuration, detected before the node begins
/// accepting connections.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown peer referenced in configuration: {0}")]
    UnknownPeer(String),
    #[error("could not read keypair: {0}")]
    UnreadableKeypair(String),
    #[error("block store is corrupted: {0}")]
    CorruptStore(String),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level error type returned by fallible node operations; mirrors the
/// four-way taxonomy above so callers can match on kind without downcasting.
#[derive(Debug, Error)]
pub enum NodeError {
    #[error(transparent)]
    Transient(#[from] TransientError),
    #[error(transparent)]
    InvalidInput(#[from] InvalidInputError),
    #[error(transparent)]
    Safety(#[from] SafetyViolation),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub fn log_error<E: std::fmt::Display>(error: E) {
    log::error!("an error occurred: {}", error)
}
