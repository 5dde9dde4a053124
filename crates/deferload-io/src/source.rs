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

use async_trait::async_trait;
use deferload_core::{LoadFailure, ModuleSpecifier};
use std::sync::Arc;

/// The raw result of fetching one export of a module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedModule {
    /// The kind of content, used to pick a decoder (e.g. `"html"`, `"text"`).
    pub kind: String,
    /// The export's bytes.
    pub bytes: Vec<u8>,
}

/// A trait for anything that can produce the bytes behind a module specifier.
///
/// Fetching is the I/O half of a load and is asynchronous. Implementations
/// report problems as a [`LoadFailure`] so the loader can attach them to the
/// unit unchanged.
#[async_trait]
pub trait ModuleSource: Send + Sync {
    /// Fetches the bytes of `specifier`'s export.
    ///
    /// # Errors
    /// - [`LoadFailure::NotFound`] if the module is unknown.
    /// - [`LoadFailure::MissingExport`] if the module lacks the export.
    /// - [`LoadFailure::Io`] if reading the bytes failed.
    async fn fetch(&self, specifier: &ModuleSpecifier) -> Result<FetchedModule, LoadFailure>;

    /// Returns `true` if the source knows `module`, without fetching it.
    fn contains(&self, module: &str) -> bool;
}

#[async_trait]
impl<S: ModuleSource + ?Sized> ModuleSource for Arc<S> {
    async fn fetch(&self, specifier: &ModuleSpecifier) -> Result<FetchedModule, LoadFailure> {
        (**self).fetch(specifier).await
    }

    fn contains(&self, module: &str) -> bool {
        (**self).contains(module)
    }
}
