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

//! I/O side of deferred loading: where module bytes come from.
//!
//! A [`ModuleSource`] maps a [`ModuleSpecifier`](deferload_core::ModuleSpecifier)
//! to raw bytes plus a kind name. It does no decoding. Two sources ship here:
//! - [`MemorySource`]: an in-memory table, optionally with artificial latency.
//! - [`DirectorySource`]: files under a root directory, addressed through a
//!   [`ModuleIndex`] read from `index.bin` (bincode) or `index.ron`.

#![warn(missing_docs)]

pub mod directory;
pub mod index;
pub mod memory;
pub mod source;

pub use directory::DirectorySource;
pub use index::{IndexError, ModuleIndex, ModuleMetadata, BINARY_INDEX_FILE, MANIFEST_INDEX_FILE};
pub use memory::MemorySource;
pub use source::{FetchedModule, ModuleSource};
