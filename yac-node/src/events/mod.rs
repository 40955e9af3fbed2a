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

//! The event sources the node's dispatch loop selects over: the network
//! part (inbound messages, connect/disconnect notifications) and the
//! internal timers (round timeout, proposal tick). Kept as two small
//! modules rather than one combined `Stream`, since the network part owns
//! a background task while the timers are driven inline by the loop.

pub mod codec;
pub mod internal;
pub mod network;

pub use codec::MessagesCodec;
pub use internal::{InternalEvent, InternalTimer};
pub use network::{NetworkEvent, NetworkPart, NetworkRequest};
