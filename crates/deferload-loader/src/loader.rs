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

//! The loader that turns module specifiers into deferred units.

use crate::config::LoaderConfig;
use crate::decoder::DecoderRegistry;
use crate::metrics::LoaderMetrics;
use anyhow::{Context, Result};
use deferload_core::event::{EventBus, UnitEvent};
use deferload_core::{
    DeferredUnit, LoadFailure, ModuleDecoder, ModuleSpecifier, Renderable, UnitCompleter,
    UnitState, UnitTicket, WeakUnit,
};
use deferload_io::ModuleSource;
use deferload_telemetry::{MetricsRegistry, ScopedMetricTimer};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::runtime::Handle;
use tokio::sync::Semaphore;

/// Hands out [`DeferredUnit`]s and resolves them in the background.
///
/// `request` never blocks and never fails: the returned unit starts
/// `Pending`, and every problem met while loading ends up as the unit's
/// `Rejected` outcome. Resolution tasks run on the runtime behind the
/// [`Handle`] given at construction; a current-thread runtime gives the
/// single-threaded cooperative model, a multi-thread one lets decodes run in
/// parallel.
///
/// Loads are fire-and-forget. Dropping every clone of a unit does not cancel
/// its load; the result is simply discarded when it arrives. The
/// deduplication cache only holds weak references, so it never keeps a unit
/// alive on its own.
pub struct DeferredModuleLoader<R: Renderable> {
    runtime: Handle,
    shared: Arc<LoaderShared<R>>,
    metrics_registry: MetricsRegistry,
}

/// State shared between the loader and its in-flight resolution tasks.
struct LoaderShared<R: Renderable> {
    source: Arc<dyn ModuleSource>,
    decoders: DecoderRegistry<R>,
    config: LoaderConfig,
    permits: Semaphore,
    cache: Mutex<HashMap<ModuleSpecifier, WeakUnit<R>>>,
    events: EventBus<UnitEvent>,
    metrics: LoaderMetrics,
}

impl<R: Renderable> DeferredModuleLoader<R> {
    /// Creates a loader reporting into a fresh metrics registry.
    pub fn new(
        runtime: Handle,
        source: Arc<dyn ModuleSource>,
        decoders: DecoderRegistry<R>,
        config: LoaderConfig,
    ) -> Result<Self> {
        Self::with_metrics(runtime, source, decoders, config, MetricsRegistry::new())
    }

    /// Creates a loader reporting into `metrics_registry`, under the `loader` namespace.
    pub fn with_metrics(
        runtime: Handle,
        source: Arc<dyn ModuleSource>,
        decoders: DecoderRegistry<R>,
        config: LoaderConfig,
        metrics_registry: MetricsRegistry,
    ) -> Result<Self> {
        config.validate().context("Invalid loader configuration")?;
        let metrics =
            LoaderMetrics::new(&metrics_registry).context("Failed to register loader metrics")?;
        log::debug!(
            "DeferredModuleLoader: created with decoders {:?}, {} concurrent load(s)",
            decoders.kinds(),
            config.max_concurrent_loads
        );

        let shared = Arc::new(LoaderShared {
            source,
            permits: Semaphore::new(config.max_concurrent_loads),
            decoders,
            config,
            cache: Mutex::new(HashMap::new()),
            events: EventBus::new(),
            metrics,
        });

        Ok(Self {
            runtime,
            shared,
            metrics_registry,
        })
    }

    /// Starts building a loader that spawns its tasks on `runtime`.
    pub fn builder(runtime: Handle) -> LoaderBuilder<R> {
        LoaderBuilder::new(runtime)
    }

    /// Requests a module.
    ///
    /// Returns immediately with a `Pending` unit and schedules its resolution.
    /// With deduplication on, a specifier whose unit is still observed and
    /// pending or resolved yields a clone of that unit instead.
    pub fn request(&self, identifier: impl Into<ModuleSpecifier>) -> DeferredUnit<R> {
        let specifier = identifier.into();

        if !self.shared.config.dedupe_requests {
            self.shared.metrics.on_request(false);
            let (unit, completer) = DeferredUnit::new(specifier);
            self.schedule(&unit, completer);
            return unit;
        }

        let mut cache = self.shared.lock_cache();
        if let Some(existing) = cache.get(&specifier).and_then(WeakUnit::upgrade) {
            log::debug!(
                "Request for '{specifier}' reuses unit {} ({})",
                existing.ticket(),
                existing.state()
            );
            self.shared.metrics.on_request(true);
            return existing;
        }

        self.shared.metrics.on_request(false);
        let (unit, completer) = DeferredUnit::new(specifier.clone());
        cache.retain(|_, cached| !cached.is_released());
        // Cached before the task exists, so a fast rejection finds the entry to evict.
        cache.insert(specifier, unit.downgrade());
        drop(cache);

        self.schedule(&unit, completer);
        unit
    }

    /// Requests every identifier, in order.
    pub fn request_all<I, S>(&self, identifiers: I) -> Vec<DeferredUnit<R>>
    where
        I: IntoIterator<Item = S>,
        S: Into<ModuleSpecifier>,
    {
        identifiers.into_iter().map(|id| self.request(id)).collect()
    }

    /// Drops the cached unit for `specifier`, so the next request loads it again.
    ///
    /// Units already handed out are unaffected. Returns `true` if an entry was removed.
    pub fn forget(&self, specifier: impl Into<ModuleSpecifier>) -> bool {
        let specifier = specifier.into();
        let removed = self.shared.lock_cache().remove(&specifier).is_some();
        if removed {
            log::debug!("Forgot cached unit for '{specifier}'");
        }
        removed
    }

    /// The number of cached units that are still observed somewhere.
    pub fn cached_units(&self) -> usize {
        let mut cache = self.shared.lock_cache();
        cache.retain(|_, cached| !cached.is_released());
        cache.len()
    }

    /// A receiver for the state changes of every unit this loader creates.
    ///
    /// All receivers share one queue: each event is delivered to one of them.
    pub fn events(&self) -> flume::Receiver<UnitEvent> {
        self.shared.events.receiver()
    }

    /// Takes every event published so far.
    pub fn drain_events(&self) -> Vec<UnitEvent> {
        self.shared.events.drain()
    }

    /// The registry the loader reports its metrics into.
    pub fn metrics(&self) -> &MetricsRegistry {
        &self.metrics_registry
    }

    /// The configuration in use.
    pub fn config(&self) -> &LoaderConfig {
        &self.shared.config
    }

    /// The decoders in use.
    pub fn decoders(&self) -> &DecoderRegistry<R> {
        &self.shared.decoders
    }

    fn schedule(&self, unit: &DeferredUnit<R>, completer: UnitCompleter<R>) {
        log::debug!("Scheduling load of '{}' ({})", unit.identifier(), unit.ticket());
        self.shared.publish(unit.identifier(), unit.ticket(), UnitState::Pending);
        self.shared.metrics.on_scheduled();

        // If the runtime is shutting down the future is dropped unpolled, and
        // the completer inside it rejects the unit as abandoned.
        let shared = Arc::clone(&self.shared);
        let in_flight = InFlight {
            shared: Arc::clone(&shared),
            specifier: unit.identifier().clone(),
            ticket: unit.ticket(),
        };
        self.runtime.spawn(async move {
            shared.resolve(completer).await;
            drop(in_flight);
        });
    }
}

impl<R: Renderable> fmt::Debug for DeferredModuleLoader<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredModuleLoader")
            .field("config", &self.shared.config)
            .field("decoders", &self.shared.decoders)
            .field("cached_units", &self.cached_units())
            .finish()
    }
}

impl<R: Renderable> LoaderShared<R> {
    fn lock_cache(&self) -> MutexGuard<'_, HashMap<ModuleSpecifier, WeakUnit<R>>> {
        // The map stays consistent even if a holder panicked.
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn publish(&self, specifier: &ModuleSpecifier, ticket: UnitTicket, state: UnitState) {
        self.events.publish(UnitEvent {
            specifier: specifier.clone(),
            ticket,
            state,
        });
    }

    /// Removes the cache entry for `specifier` if it still belongs to `ticket`.
    fn evict(&self, specifier: &ModuleSpecifier, ticket: UnitTicket) {
        let mut cache = self.lock_cache();
        if cache.get(specifier).is_some_and(|cached| cached.ticket() == ticket) {
            cache.remove(specifier);
        }
    }

    async fn resolve(&self, completer: UnitCompleter<R>) {
        let specifier = completer.identifier().clone();
        let ticket = completer.ticket();
        let timer = ScopedMetricTimer::new(&self.metrics.load_time_ms);

        let outcome = match self.config.load_timeout() {
            Some(limit) => tokio::time::timeout(limit, self.load(&specifier))
                .await
                .unwrap_or_else(|_| {
                    Err(LoadFailure::TimedOut {
                        module: specifier.module().to_string(),
                        after: limit,
                    })
                }),
            None => self.load(&specifier).await,
        };
        drop(timer);

        let (state, delivered) = match outcome {
            Ok(value) => (UnitState::Resolved, completer.resolve(value)),
            Err(failure) => {
                log::warn!("Failed to load '{specifier}' ({ticket}): {failure}");
                self.evict(&specifier, ticket);
                (UnitState::Rejected, completer.reject(failure))
            }
        };

        if !delivered {
            // Every handle was dropped while loading: no transition took place.
            log::trace!("Discarded {state} outcome of '{specifier}' ({ticket})");
            self.evict(&specifier, ticket);
            self.metrics.on_discarded();
            return;
        }

        if state == UnitState::Resolved {
            log::info!("Resolved '{specifier}' ({ticket})");
        }
        self.metrics.on_settled(state);
        self.publish(&specifier, ticket, state);
    }

    async fn load(&self, specifier: &ModuleSpecifier) -> Result<R, LoadFailure> {
        // The semaphore is never closed.
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| LoadFailure::Abandoned {
                module: specifier.module().to_string(),
            })?;

        let fetched = self.source.fetch(specifier).await?;
        log::trace!(
            "Fetched '{specifier}': {} byte(s) of kind '{}'",
            fetched.bytes.len(),
            fetched.kind
        );
        self.decoders.decode(specifier, &fetched)
    }
}

/// Lives as long as a resolution task. Dropping it releases the pending gauge,
/// and evicts the unit if the task died without resolving it or every handle
/// is gone.
struct InFlight<R: Renderable> {
    shared: Arc<LoaderShared<R>>,
    specifier: ModuleSpecifier,
    ticket: UnitTicket,
}

impl<R: Renderable> Drop for InFlight<R> {
    fn drop(&mut self) {
        self.shared.metrics.on_finished();

        let mut cache = self.shared.lock_cache();
        let stale = cache.get(&self.specifier).is_some_and(|cached| {
            cached.ticket() == self.ticket
                && cached
                    .upgrade()
                    .map_or(true, |unit| unit.state() != UnitState::Resolved)
        });
        if stale {
            cache.remove(&self.specifier);
        }
    }
}

/// Assembles a [`DeferredModuleLoader`].
pub struct LoaderBuilder<R: Renderable> {
    runtime: Handle,
    source: Option<Arc<dyn ModuleSource>>,
    decoders: DecoderRegistry<R>,
    config: LoaderConfig,
    metrics: Option<MetricsRegistry>,
}

impl<R: Renderable> LoaderBuilder<R> {
    fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            source: None,
            decoders: DecoderRegistry::new(),
            config: LoaderConfig::default(),
            metrics: None,
        }
    }

    /// Sets the module source. Required.
    pub fn source(mut self, source: impl ModuleSource + 'static) -> Self {
        self.source = Some(Arc::new(source));
        self
    }

    /// Sets an already shared module source.
    pub fn shared_source(mut self, source: Arc<dyn ModuleSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Registers a decoder for `kind`.
    pub fn decoder(mut self, kind: &str, decoder: impl ModuleDecoder<R> + 'static) -> Self {
        self.decoders.register(kind, decoder);
        self
    }

    /// Replaces the configuration.
    pub fn config(mut self, config: LoaderConfig) -> Self {
        self.config = config;
        self
    }

    /// Reports metrics into `registry` instead of a private one.
    pub fn metrics(mut self, registry: MetricsRegistry) -> Self {
        self.metrics = Some(registry);
        self
    }

    /// Builds the loader.
    pub fn build(self) -> Result<DeferredModuleLoader<R>> {
        let source = self
            .source
            .context("A module source is required to build a loader")?;
        DeferredModuleLoader::with_metrics(
            self.runtime,
            source,
            self.decoders,
            self.config,
            self.metrics.unwrap_or_default(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deferload_core::module::Utf8Decoder;
    use deferload_io::MemorySource;

    fn loader(source: MemorySource, config: LoaderConfig) -> DeferredModuleLoader<String> {
        DeferredModuleLoader::builder(Handle::current())
            .source(source)
            .decoder("html", Utf8Decoder)
            .config(config)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_request_starts_pending() {
        let l = loader(
            MemorySource::new().with_module("unit-a", "html", "<a/>"),
            LoaderConfig::default(),
        );
        let unit = l.request("unit-a");
        // Nothing ran yet: the test task has not yielded.
        assert_eq!(unit.state(), UnitState::Pending);
        assert_eq!(unit.settled().await, UnitState::Resolved);
    }

    #[tokio::test]
    async fn test_builder_requires_source() {
        let result = DeferredModuleLoader::<String>::builder(Handle::current()).build();
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_rejected_unit_is_evicted() {
        let l = loader(MemorySource::new(), LoaderConfig::default());
        let first = l.request("unit-missing");
        assert_eq!(l.cached_units(), 1);
        first.settled().await;
        assert_eq!(l.cached_units(), 0);

        let second = l.request("unit-missing");
        assert!(!first.ptr_eq(&second));
    }

    #[tokio::test]
    async fn test_forget_drops_cache_entry() {
        let l = loader(
            MemorySource::new().with_module("unit-a", "html", "<a/>"),
            LoaderConfig::default(),
        );
        let unit = l.request("unit-a");
        unit.settled().await;

        assert!(l.forget("unit-a"));
        assert!(!l.forget("unit-a"));
        assert!(!unit.ptr_eq(&l.request("unit-a")));
    }

    #[tokio::test]
    async fn test_cache_does_not_keep_units_alive() {
        let l = loader(
            MemorySource::new().with_module("unit-a", "html", "<a/>"),
            LoaderConfig::default(),
        );
        let unit = l.request("unit-a");
        assert_eq!(unit.observer_count(), 1);
        unit.settled().await;

        let ticket = unit.ticket();
        drop(unit);
        assert_eq!(l.cached_units(), 0);

        let again = l.request("unit-a");
        assert_ne!(again.ticket(), ticket);
        assert_eq!(again.settled().await, UnitState::Resolved);
    }

    #[tokio::test]
    async fn test_oversized_concurrency_fails_to_build() {
        let config = LoaderConfig {
            max_concurrent_loads: usize::MAX,
            ..LoaderConfig::default()
        };
        let result = DeferredModuleLoader::<String>::builder(Handle::current())
            .source(MemorySource::new())
            .config(config)
            .build();
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_without_dedupe_nothing_is_cached() {
        let l = loader(
            MemorySource::new().with_module("unit-a", "html", "<a/>"),
            LoaderConfig::default().with_dedupe_requests(false),
        );
        let a = l.request("unit-a");
        let b = l.request("unit-a");
        assert!(!a.ptr_eq(&b));
        assert_eq!(l.cached_units(), 0);
    }
}
