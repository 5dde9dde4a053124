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

//! Event plumbing between loaders and hosts that poll instead of awaiting.
//!
//! [`EventBus`] is a generic multi-producer channel. [`UnitEvent`] is the
//! record a loader publishes whenever one of its units changes state, so a
//! host render loop can drain the bus once per frame and re-render only the
//! units that moved.

mod bus;

pub use self::bus::EventBus;

use crate::module::ModuleSpecifier;
use crate::unit::{UnitState, UnitTicket};

/// A state change of a deferred unit, as published by a loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitEvent {
    /// The specifier the unit was requested with.
    pub specifier: ModuleSpecifier,
    /// The ticket of the unit that changed.
    pub ticket: UnitTicket,
    /// The state the unit entered.
    pub state: UnitState,
}
