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

//! The deferred module loader.
//!
//! [`DeferredModuleLoader::request`] hands out a [`DeferredUnit`] in the
//! `Pending` state and schedules its resolution on the host's tokio runtime.
//! The loader delegates the I/O to a [`ModuleSource`](deferload_io::ModuleSource)
//! and the parsing to the [`DecoderRegistry`], then settles the unit exactly once.
//!
//! [`ConditionalTrigger`] layers a gate on top: the request is only issued
//! once a predicate (a user action, a visibility signal...) holds.
//!
//! ```no_run
//! use deferload_core::module::Utf8Decoder;
//! use deferload_io::MemorySource;
//! use deferload_loader::DeferredModuleLoader;
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let loader = DeferredModuleLoader::<String>::builder(tokio::runtime::Handle::current())
//!     .source(MemorySource::new().with_module("components/Carousel", "html", "<Carousel/>"))
//!     .decoder("html", Utf8Decoder)
//!     .build()?;
//!
//! let unit = loader.request("components/Carousel");
//! unit.settled().await;
//! assert_eq!(unit.result().as_deref().map(String::as_str), Some("<Carousel/>"));
//! # Ok(())
//! # }
//! ```
//!
//! [`DeferredUnit`]: deferload_core::DeferredUnit

#![warn(missing_docs)]

pub mod config;
pub mod decoder;
pub mod gate;
pub mod loader;
mod metrics;

pub use config::LoaderConfig;
pub use deferload_core::event::UnitEvent;
pub use decoder::DecoderRegistry;
pub use gate::{ConditionalTrigger, TriggerSignal};
pub use loader::{DeferredModuleLoader, LoaderBuilder};
