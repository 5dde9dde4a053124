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

//! An in-memory module table.

use crate::source::{FetchedModule, ModuleSource};
use async_trait::async_trait;
use deferload_core::{LoadFailure, ModuleSpecifier, DEFAULT_EXPORT};
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

#[derive(Debug, Clone, Default)]
struct MemoryModule {
    kind: String,
    exports: HashMap<String, Vec<u8>>,
    latency: Option<Duration>,
}

/// A [`ModuleSource`] backed by a table held in memory.
///
/// Modules can be added while the source is shared, which lets a host
/// register content lazily. A per-module latency can be configured to
/// simulate slow resources.
#[derive(Debug, Default)]
pub struct MemorySource {
    modules: RwLock<HashMap<String, MemoryModule>>,
}

impl MemorySource {
    /// Creates an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`insert`](Self::insert) for the default export.
    pub fn with_module(self, module: &str, kind: &str, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(module, DEFAULT_EXPORT, kind, bytes);
        self
    }

    /// Builder form of [`insert`](Self::insert) for a named export.
    pub fn with_export(
        self,
        module: &str,
        export: &str,
        kind: &str,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        self.insert(module, export, kind, bytes);
        self
    }

    /// Builder form of [`set_latency`](Self::set_latency).
    pub fn with_latency(self, module: &str, latency: Duration) -> Self {
        self.set_latency(module, latency);
        self
    }

    /// Adds or replaces one export of a module.
    ///
    /// The kind applies to the whole module; the last insert wins.
    pub fn insert(&self, module: &str, export: &str, kind: &str, bytes: impl Into<Vec<u8>>) {
        let mut modules = self.modules.write().unwrap_or_else(|e| e.into_inner());
        let entry = modules.entry(module.to_string()).or_default();
        entry.kind = kind.to_string();
        entry.exports.insert(export.to_string(), bytes.into());
    }

    /// Delays every fetch of `module` by `latency`.
    ///
    /// Has no effect on modules that have not been inserted yet.
    pub fn set_latency(&self, module: &str, latency: Duration) {
        let mut modules = self.modules.write().unwrap_or_else(|e| e.into_inner());
        match modules.get_mut(module) {
            Some(entry) => entry.latency = Some(latency),
            None => log::warn!("MemorySource: latency set for unknown module '{module}'"),
        }
    }

    /// Removes a module. Returns `true` if it was present.
    pub fn remove(&self, module: &str) -> bool {
        let mut modules = self.modules.write().unwrap_or_else(|e| e.into_inner());
        modules.remove(module).is_some()
    }

    /// The number of modules in the table.
    pub fn len(&self) -> usize {
        self.modules.read().map(|m| m.len()).unwrap_or(0)
    }

    /// Returns `true` if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lookup(&self, specifier: &ModuleSpecifier) -> Result<(FetchedModule, Option<Duration>), LoadFailure> {
        let modules = self.modules.read().unwrap_or_else(|e| e.into_inner());
        let entry = modules
            .get(specifier.module())
            .ok_or_else(|| LoadFailure::NotFound {
                module: specifier.module().to_string(),
            })?;
        let bytes = entry
            .exports
            .get(specifier.export())
            .ok_or_else(|| LoadFailure::MissingExport {
                module: specifier.module().to_string(),
                export: specifier.export().to_string(),
            })?;

        let fetched = FetchedModule {
            kind: entry.kind.clone(),
            bytes: bytes.clone(),
        };
        Ok((fetched, entry.latency))
    }
}

#[async_trait]
impl ModuleSource for MemorySource {
    async fn fetch(&self, specifier: &ModuleSpecifier) -> Result<FetchedModule, LoadFailure> {
        // The lock guard is dropped inside `lookup`, before any await point.
        let (fetched, latency) = self.lookup(specifier)?;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        log::trace!(
            "MemorySource: fetched '{specifier}' ({} bytes)",
            fetched.bytes.len()
        );
        Ok(fetched)
    }

    fn contains(&self, module: &str) -> bool {
        self.modules
            .read()
            .map(|m| m.contains_key(module))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fetches_default_and_named_exports() {
        let source = MemorySource::new()
            .with_module("components/Carousel", "html", "<Carousel/>")
            .with_export("components/Carousel", "CarouselClient", "html", "<CarouselClient/>");

        let default = source.fetch(&"components/Carousel".into()).await.unwrap();
        assert_eq!(default.kind, "html");
        assert_eq!(default.bytes, b"<Carousel/>");

        let named = source
            .fetch(&"components/Carousel#CarouselClient".into())
            .await
            .unwrap();
        assert_eq!(named.bytes, b"<CarouselClient/>");
    }

    #[tokio::test]
    async fn unknown_module_and_export_fail() {
        let source = MemorySource::new().with_module("unit-a", "text", "a");

        let missing = source.fetch(&"unit-missing".into()).await.unwrap_err();
        assert!(matches!(missing, LoadFailure::NotFound { .. }));

        let export = source.fetch(&"unit-a#Other".into()).await.unwrap_err();
        assert!(matches!(export, LoadFailure::MissingExport { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn latency_delays_fetch() {
        let source = MemorySource::new()
            .with_module("slow", "text", "s")
            .with_latency("slow", Duration::from_secs(5));

        let started = tokio::time::Instant::now();
        source.fetch(&"slow".into()).await.unwrap();
        assert!(started.elapsed() >= Duration::from_secs(5));
    }

    #[test]
    fn insert_and_remove() {
        let source = MemorySource::new();
        assert!(source.is_empty());
        source.insert("late", DEFAULT_EXPORT, "text", "added later");
        assert!(source.contains("late"));
        assert!(source.remove("late"));
        assert!(!source.contains("late"));
    }
}
