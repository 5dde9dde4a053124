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

//! # Deferload Core
//!
//! Foundational crate containing the deferred unit state machine, module
//! identifiers, and the interface contracts shared by sources, decoders,
//! loaders and host renderers.

#![warn(missing_docs)]

pub mod error;
pub mod event;
pub mod module;
pub mod telemetry;
pub mod unit;
pub mod utils;
pub mod view;

pub use error::LoadFailure;
pub use module::{ModuleDecoder, ModuleSpecifier, Renderable, DEFAULT_EXPORT};
pub use unit::{DeferredUnit, UnitCompleter, UnitSnapshot, UnitState, UnitTicket, WeakUnit};
pub use utils::timer::Stopwatch;
