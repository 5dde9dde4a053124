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

//! Loader configuration, readable from a RON file.
//!
//! Every field is optional in the file; missing fields take their defaults:
//!
//! ```text
//! (
//!     max_concurrent_loads: 4,
//!     load_timeout_ms: Some(2000),
//!     dedupe_requests: true,
//! )
//! ```

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::sync::Semaphore;

/// Tuning knobs for a [`DeferredModuleLoader`](crate::DeferredModuleLoader).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// How many loads may fetch and decode at the same time. Further loads
    /// stay `Pending` until a slot frees up.
    pub max_concurrent_loads: usize,
    /// Deadline for a single load, in milliseconds. `None` waits forever.
    pub load_timeout_ms: Option<u64>,
    /// Hand out the same unit for repeated requests of the same specifier.
    /// Rejected units are never reused.
    pub dedupe_requests: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            max_concurrent_loads: 8,
            load_timeout_ms: None,
            dedupe_requests: true,
        }
    }
}

impl LoaderConfig {
    /// Parses a RON config.
    pub fn from_ron_str(text: &str) -> Result<Self> {
        let config: Self = ron::from_str(text).context("Failed to parse loader config")?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a RON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read loader config '{}'", path.display()))?;
        Self::from_ron_str(&text).with_context(|| format!("In '{}'", path.display()))
    }

    /// Checks the values are usable.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.max_concurrent_loads >= 1,
            "max_concurrent_loads must be at least 1"
        );
        ensure!(
            self.max_concurrent_loads <= Semaphore::MAX_PERMITS,
            "max_concurrent_loads must not exceed {}",
            Semaphore::MAX_PERMITS
        );
        ensure!(
            self.load_timeout_ms != Some(0),
            "load_timeout_ms must be positive when set"
        );
        Ok(())
    }

    /// Sets [`max_concurrent_loads`](Self::max_concurrent_loads), clamped to
    /// the range a semaphore accepts.
    pub fn with_max_concurrent_loads(mut self, limit: usize) -> Self {
        self.max_concurrent_loads = limit.clamp(1, Semaphore::MAX_PERMITS);
        self
    }

    /// Sets the per-load deadline.
    pub fn with_load_timeout(mut self, timeout: Duration) -> Self {
        self.load_timeout_ms = Some((timeout.as_millis() as u64).max(1));
        self
    }

    /// Enables or disables request deduplication.
    pub fn with_dedupe_requests(mut self, dedupe: bool) -> Self {
        self.dedupe_requests = dedupe;
        self
    }

    /// The per-load deadline, if any.
    pub fn load_timeout(&self) -> Option<Duration> {
        self.load_timeout_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        assert_eq!(LoaderConfig::from_ron_str("()").unwrap(), LoaderConfig::default());
    }

    #[test]
    fn partial_config_overrides_fields() {
        let config = LoaderConfig::from_ron_str("(load_timeout_ms: Some(250))").unwrap();
        assert_eq!(config.load_timeout(), Some(Duration::from_millis(250)));
        assert_eq!(config.max_concurrent_loads, 8);
        assert!(config.dedupe_requests);
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        assert!(LoaderConfig::from_ron_str("(max_concurrent_loads: 0)").is_err());
        assert_eq!(
            LoaderConfig::default()
                .with_max_concurrent_loads(0)
                .max_concurrent_loads,
            1
        );
    }

    #[test]
    fn concurrency_above_semaphore_limit_is_rejected() {
        let at_limit = format!("(max_concurrent_loads: {})", Semaphore::MAX_PERMITS);
        assert!(LoaderConfig::from_ron_str(&at_limit).is_ok());

        let over = format!("(max_concurrent_loads: {})", usize::MAX);
        assert!(LoaderConfig::from_ron_str(&over).is_err());

        let clamped = LoaderConfig::default().with_max_concurrent_loads(usize::MAX);
        assert_eq!(clamped.max_concurrent_loads, Semaphore::MAX_PERMITS);
        assert!(clamped.validate().is_ok());
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loader.ron");
        std::fs::write(&path, "(dedupe_requests: false)").unwrap();

        let config = LoaderConfig::load(&path).unwrap();
        assert!(!config.dedupe_requests);

        let missing = LoaderConfig::load(dir.path().join("missing.ron"));
        assert!(missing.is_err());
    }
}
