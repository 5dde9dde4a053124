// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::error::LoadFailure;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// The lifecycle state of a deferred unit.
///
/// The only legal transitions are `Pending -> Resolved` and
/// `Pending -> Rejected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitState {
    /// The load has been scheduled but has not completed.
    Pending,
    /// The load succeeded and the result is available.
    Resolved,
    /// The load failed and the error is available.
    Rejected,
}

impl UnitState {
    /// Returns `true` for `Resolved` and `Rejected`.
    pub fn is_settled(self) -> bool {
        !matches!(self, UnitState::Pending)
    }

    /// Returns `true` if moving from `self` to `next` is a legal transition.
    pub fn can_transition_to(self, next: UnitState) -> bool {
        self == UnitState::Pending && next.is_settled()
    }
}

impl fmt::Display for UnitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            UnitState::Pending => "pending",
            UnitState::Resolved => "resolved",
            UnitState::Rejected => "rejected",
        };
        f.write_str(label)
    }
}

/// A point-in-time view of a unit, carrying the payload of its state.
#[derive(Debug)]
pub enum UnitSnapshot<R> {
    /// Still loading.
    Pending,
    /// Loaded. The value is shared with every other observer.
    Resolved(Arc<R>),
    /// Failed.
    Rejected(LoadFailure),
}

impl<R> UnitSnapshot<R> {
    /// The state this snapshot was taken in.
    pub fn state(&self) -> UnitState {
        match self {
            UnitSnapshot::Pending => UnitState::Pending,
            UnitSnapshot::Resolved(_) => UnitState::Resolved,
            UnitSnapshot::Rejected(_) => UnitState::Rejected,
        }
    }
}

impl<R> Clone for UnitSnapshot<R> {
    fn clone(&self) -> Self {
        match self {
            UnitSnapshot::Pending => UnitSnapshot::Pending,
            UnitSnapshot::Resolved(value) => UnitSnapshot::Resolved(value.clone()),
            UnitSnapshot::Rejected(failure) => UnitSnapshot::Rejected(failure.clone()),
        }
    }
}

/// A random identifier attached to each unit, used to correlate log lines and events.
///
/// Two requests for the same specifier that are not deduplicated get
/// different tickets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitTicket(Uuid);

impl UnitTicket {
    /// Creates a new, random (version 4) ticket.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for UnitTicket {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UnitTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_pending_can_transition() {
        use UnitState::*;
        assert!(Pending.can_transition_to(Resolved));
        assert!(Pending.can_transition_to(Rejected));
        assert!(!Pending.can_transition_to(Pending));
        for settled in [Resolved, Rejected] {
            for next in [Pending, Resolved, Rejected] {
                assert!(!settled.can_transition_to(next));
            }
        }
    }

    #[test]
    fn tickets_are_unique() {
        assert_ne!(UnitTicket::new(), UnitTicket::new());
    }
}
