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

//! Defines the single error kind attached to a rejected deferred unit.

use std::time::Duration;
use thiserror::Error;

/// The reason a deferred unit ended in the `Rejected` state.
///
/// A `LoadFailure` is never returned from `request`. It is captured inside the
/// resolution task and stored on the unit, where every observer can read it.
/// It is `Clone` so each observer receives its own copy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadFailure {
    /// The source has no module registered under this name.
    #[error("module '{module}' was not found")]
    NotFound {
        /// The module that was requested.
        module: String,
    },
    /// The module exists but does not expose the requested export.
    #[error("module '{module}' has no export named '{export}'")]
    MissingExport {
        /// The module that was requested.
        module: String,
        /// The export that could not be found.
        export: String,
    },
    /// No decoder is registered for the kind of content the source returned.
    #[error("no decoder registered for module kind '{kind}' (module '{module}')")]
    NoDecoder {
        /// The module that was requested.
        module: String,
        /// The kind reported by the source.
        kind: String,
    },
    /// The decoder rejected the module's bytes.
    #[error("failed to decode module '{module}': {reason}")]
    Decode {
        /// The module that was requested.
        module: String,
        /// The decoder's error message.
        reason: String,
    },
    /// Reading the module's bytes failed.
    #[error("I/O error while loading module '{module}': {reason}")]
    Io {
        /// The module that was requested.
        module: String,
        /// The underlying I/O error message.
        reason: String,
    },
    /// The load did not complete within the configured deadline.
    #[error("loading module '{module}' timed out after {after:?}")]
    TimedOut {
        /// The module that was requested.
        module: String,
        /// The deadline that expired.
        after: Duration,
    },
    /// The producer went away without settling the unit (task panicked or was aborted).
    #[error("the load task for module '{module}' ended without settling it")]
    Abandoned {
        /// The module that was requested.
        module: String,
    },
}

impl LoadFailure {
    /// Returns the human-readable cause of the failure.
    pub fn cause(&self) -> String {
        self.to_string()
    }

    /// Returns the module this failure refers to.
    pub fn module(&self) -> &str {
        match self {
            LoadFailure::NotFound { module }
            | LoadFailure::MissingExport { module, .. }
            | LoadFailure::NoDecoder { module, .. }
            | LoadFailure::Decode { module, .. }
            | LoadFailure::Io { module, .. }
            | LoadFailure::TimedOut { module, .. }
            | LoadFailure::Abandoned { module } => module,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cause_is_never_empty() {
        let failures = [
            LoadFailure::NotFound {
                module: "unit-missing".into(),
            },
            LoadFailure::MissingExport {
                module: "carousel".into(),
                export: "CarouselClient".into(),
            },
            LoadFailure::TimedOut {
                module: "slow".into(),
                after: Duration::from_millis(10),
            },
            LoadFailure::Abandoned {
                module: "gone".into(),
            },
        ];

        for failure in failures {
            assert!(!failure.cause().is_empty());
        }
    }

    #[test]
    fn module_accessor_matches_variant() {
        let failure = LoadFailure::Decode {
            module: "charts/Line".into(),
            reason: "bad utf-8".into(),
        };
        assert_eq!(failure.module(), "charts/Line");
        assert!(failure.cause().contains("bad utf-8"));
    }
}
