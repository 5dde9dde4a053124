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

//! Deferring a request until something external happens.

use crate::loader::DeferredModuleLoader;
use deferload_core::{DeferredUnit, ModuleSpecifier, Renderable};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A cloneable latch. Once fired it stays fired.
///
/// Hand one clone to whatever detects the condition (an input handler, a
/// visibility check) and the other to a [`ConditionalTrigger`].
#[derive(Debug, Clone, Default)]
pub struct TriggerSignal {
    fired: Arc<AtomicBool>,
}

impl TriggerSignal {
    /// Creates an unfired signal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fires the signal.
    pub fn fire(&self) {
        self.fired.store(true, Ordering::Release);
    }

    /// Returns `true` once any clone has fired.
    pub fn is_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }
}

/// Issues a request for one specifier the first time a predicate holds.
///
/// The host calls [`poll`](Self::poll) from its update loop. Before the
/// predicate holds nothing is requested; afterwards every poll returns the
/// same unit. The unit's own state machine is untouched.
pub struct ConditionalTrigger<R: Renderable> {
    specifier: ModuleSpecifier,
    predicate: Box<dyn Fn() -> bool + Send + Sync>,
    unit: Option<DeferredUnit<R>>,
}

impl<R: Renderable> ConditionalTrigger<R> {
    /// Gates `specifier` behind `predicate`.
    pub fn new(
        specifier: impl Into<ModuleSpecifier>,
        predicate: impl Fn() -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            specifier: specifier.into(),
            predicate: Box::new(predicate),
            unit: None,
        }
    }

    /// Gates `specifier` behind `signal`.
    pub fn on_signal(specifier: impl Into<ModuleSpecifier>, signal: &TriggerSignal) -> Self {
        let signal = signal.clone();
        Self::new(specifier, move || signal.is_fired())
    }

    /// The gated specifier.
    pub fn specifier(&self) -> &ModuleSpecifier {
        &self.specifier
    }

    /// Returns `true` while the request has not been issued.
    pub fn is_armed(&self) -> bool {
        self.unit.is_none()
    }

    /// The unit, once requested.
    pub fn unit(&self) -> Option<&DeferredUnit<R>> {
        self.unit.as_ref()
    }

    /// Checks the predicate and requests the module the first time it holds.
    pub fn poll(&mut self, loader: &DeferredModuleLoader<R>) -> Option<&DeferredUnit<R>> {
        if self.unit.is_none() && (self.predicate)() {
            log::debug!("Trigger fired for '{}'", self.specifier);
            self.unit = Some(loader.request(self.specifier.clone()));
        }
        self.unit.as_ref()
    }
}

impl<R: Renderable> fmt::Debug for ConditionalTrigger<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConditionalTrigger")
            .field("specifier", &self.specifier)
            .field("unit", &self.unit)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_latches_across_clones() {
        let signal = TriggerSignal::new();
        let other = signal.clone();
        assert!(!other.is_fired());
        signal.fire();
        assert!(other.is_fired());
        signal.fire();
        assert!(other.is_fired());
    }

    #[test]
    fn trigger_starts_armed() {
        let trigger = ConditionalTrigger::<String>::new("components/Carousel", || false);
        assert!(trigger.is_armed());
        assert!(trigger.unit().is_none());
        assert_eq!(trigger.specifier().module(), "components/Carousel");
    }
}
