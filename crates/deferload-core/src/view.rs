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

//! The contract between a deferred unit and the host that displays it.
//!
//! Loaders never render. A host implements [`UnitPresenter`] and calls
//! [`present`] on each render pass; the unit's current state picks which of
//! the three views is produced.

use crate::error::LoadFailure;
use crate::module::{ModuleSpecifier, Renderable};
use crate::unit::{DeferredUnit, UnitSnapshot};
use std::fmt::Display;

/// A host-side renderer for the three states of a deferred unit.
pub trait UnitPresenter<R: Renderable> {
    /// What a render pass produces (markup, a widget tree, draw commands...).
    type Output;

    /// Renders the placeholder shown while the unit is `Pending`.
    fn placeholder(&mut self, specifier: &ModuleSpecifier) -> Self::Output;

    /// Renders the loaded content of a `Resolved` unit.
    fn resolved(&mut self, specifier: &ModuleSpecifier, value: &R) -> Self::Output;

    /// Renders the fallback view of a `Rejected` unit.
    fn failed(&mut self, specifier: &ModuleSpecifier, failure: &LoadFailure) -> Self::Output;
}

/// Runs one render pass of `unit` through `presenter`.
///
/// The unit is read once, so a transition racing with the render pass
/// cannot produce a mixed view.
pub fn present<R, P>(unit: &DeferredUnit<R>, presenter: &mut P) -> P::Output
where
    R: Renderable,
    P: UnitPresenter<R>,
{
    let specifier = unit.identifier();
    match unit.snapshot() {
        UnitSnapshot::Pending => presenter.placeholder(specifier),
        UnitSnapshot::Resolved(value) => presenter.resolved(specifier, &value),
        UnitSnapshot::Rejected(failure) => presenter.failed(specifier, &failure),
    }
}

/// A text presenter that wraps a unit in both a loading and a failure boundary.
///
/// `loading` is shown while pending and `failure` when rejected. The
/// failure text may contain `{cause}`, which is replaced with the load
/// failure's message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackBoundary {
    loading: String,
    failure: String,
}

impl FallbackBoundary {
    /// Creates a boundary with explicit loading and failure messages.
    pub fn new(loading: impl Into<String>, failure: impl Into<String>) -> Self {
        Self {
            loading: loading.into(),
            failure: failure.into(),
        }
    }

    /// The message shown while the unit is pending.
    pub fn loading_message(&self) -> &str {
        &self.loading
    }

    /// The message template shown when the unit is rejected.
    pub fn failure_message(&self) -> &str {
        &self.failure
    }
}

impl Default for FallbackBoundary {
    fn default() -> Self {
        Self::new("Loading...", "Failed to load component")
    }
}

impl<R: Renderable + Display> UnitPresenter<R> for FallbackBoundary {
    type Output = String;

    fn placeholder(&mut self, _specifier: &ModuleSpecifier) -> String {
        self.loading.clone()
    }

    fn resolved(&mut self, _specifier: &ModuleSpecifier, value: &R) -> String {
        value.to_string()
    }

    fn failed(&mut self, _specifier: &ModuleSpecifier, failure: &LoadFailure) -> String {
        self.failure.replace("{cause}", &failure.cause())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::DeferredUnit;

    #[test]
    fn boundary_shows_placeholder_then_content() {
        let mut boundary = FallbackBoundary::new("Loading carousel...", "Failed");
        let (unit, completer) = DeferredUnit::<String>::new("components/Carousel");

        assert_eq!(present(&unit, &mut boundary), "Loading carousel...");
        completer.resolve("<Carousel/>".to_string());
        assert_eq!(present(&unit, &mut boundary), "<Carousel/>");
    }

    #[test]
    fn boundary_interpolates_cause() {
        let mut boundary = FallbackBoundary::new("...", "Failed to load component: {cause}");
        let (unit, completer) = DeferredUnit::<String>::new("unit-missing");
        completer.reject(LoadFailure::NotFound {
            module: "unit-missing".into(),
        });

        let view = present(&unit, &mut boundary);
        assert!(view.starts_with("Failed to load component: "));
        assert!(view.contains("unit-missing"));
    }

    struct CountingPresenter {
        placeholders: usize,
    }

    impl UnitPresenter<String> for CountingPresenter {
        type Output = ();

        fn placeholder(&mut self, _specifier: &ModuleSpecifier) {
            self.placeholders += 1;
        }

        fn resolved(&mut self, _specifier: &ModuleSpecifier, _value: &String) {}

        fn failed(&mut self, _specifier: &ModuleSpecifier, _failure: &LoadFailure) {}
    }

    #[test]
    fn custom_presenter_receives_pending_passes() {
        let mut presenter = CountingPresenter { placeholders: 0 };
        let (unit, _completer) = DeferredUnit::<String>::new("slow");

        present(&unit, &mut presenter);
        present(&unit, &mut presenter);
        assert_eq!(presenter.placeholders, 2);
    }
}
