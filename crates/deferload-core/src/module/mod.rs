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

//! Provides the foundational traits and identifiers for deferred modules.
//!
//! This module defines the "common language" shared by everything that
//! produces or consumes deferred content. It has no knowledge of where module
//! bytes come from or how they are scheduled.
//!
//! The key components are:
//! - The [`Renderable`] trait: a marker for all types a deferred unit can resolve to.
//! - [`ModuleSpecifier`]: the opaque key naming a module and one of its exports.
//! - [`ModuleDecoder`]: the contract turning raw module bytes into a renderable value.

mod decoder;
mod specifier;

pub use decoder::*;
pub use specifier::*;

/// A marker trait for types that a deferred unit can resolve to.
///
/// The supertraits are required because resolution happens on a background
/// task and the result is shared with every observer of the unit:
/// - `Send` + `Sync`: the value can be moved off the loading task and shared.
/// - `'static`: the value outlives the task that produced it.
///
/// # Examples
///
/// ```
/// use deferload_core::Renderable;
///
/// // A pre-rendered fragment of markup.
/// struct Fragment {
///     html: String,
/// }
///
/// impl Renderable for Fragment {}
/// ```
pub trait Renderable: Send + Sync + 'static {}

impl Renderable for String {}
impl Renderable for Vec<u8> {}
