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

//! Internal, time-driven events: the round-timeout deadline that drives
//! YAC view changes, and the proposal-cut tick that the leader uses to
//! decide when to emit a proposal. Both are plain `tokio::time::sleep`
//! futures re-armed by the dispatch loop after each firing, rather than a
//! standing timer task, since the deadline can move (a view change resets
//! it) between one firing and the next.

use std::time::Instant;

use tokio::time::{sleep_until, Sleep};

/// An internal, locally-generated event (as opposed to one arriving over
/// the network).
#[derive(Debug, Clone, Copy)]
pub enum InternalEvent {
    RoundTimeout,
    ProposalTick,
}

/// A single re-armable deadline. The dispatch loop polls `sleep()` each
/// iteration and calls `rearm` with the next deadline once it fires or
/// once some other event changes when it should next fire (e.g. a round
/// advancing resets the round-timeout deadline).
pub struct InternalTimer {
    kind: InternalEvent,
    deadline: Instant,
}

impl InternalTimer {
    pub fn new(kind: InternalEvent, deadline: Instant) -> Self {
        Self { kind, deadline }
    }

    pub fn kind(&self) -> InternalEvent {
        self.kind
    }

    pub fn rearm(&mut self, deadline: Instant) {
        self.deadline = deadline;
    }

    pub fn sleep(&self) -> Sleep {
        sleep_until(self.deadline.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn timer_fires_no_earlier_than_its_deadline() {
        let deadline = Instant::now() + Duration::from_millis(20);
        let timer = InternalTimer::new(InternalEvent::RoundTimeout, deadline);
        let started = Instant::now();
        timer.sleep().await;
        assert!(started.elapsed() >= Duration::from_millis(15));
    }

    #[tokio::test]
    async fn rearm_moves_the_deadline_forward() {
        let mut timer = InternalTimer::new(InternalEvent::ProposalTick, Instant::now());
        let later = Instant::now() + Duration::from_millis(30);
        timer.rearm(later);
        let started = Instant::now();
        timer.sleep().await;
        assert!(started.elapsed() >= Duration::from_millis(25));
    }
}
