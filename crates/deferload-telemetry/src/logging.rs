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

//! Logger initialisation for binaries.
//!
//! Libraries in this workspace only talk to the `log` facade. Applications
//! call [`init`] once at startup; `RUST_LOG` overrides the default filter.

use env_logger::{Builder, Env};
use log::LevelFilter;

/// Installs `env_logger` as the global logger.
///
/// `default_filter` applies when `RUST_LOG` is unset (e.g. `"info"` or
/// `"deferload_loader=debug"`). Calling this more than once is harmless; later
/// calls are ignored.
pub fn init(default_filter: &str) {
    let result = Builder::from_env(Env::default().default_filter_or(default_filter))
        .filter_module("mio", LevelFilter::Warn)
        .format_timestamp_millis()
        .try_init();

    if result.is_err() {
        log::debug!("Logger already initialised; keeping the existing one.");
    }
}

/// Installs a logger suitable for tests: captured by the test harness,
/// verbose, and tolerant of repeated initialisation.
pub fn init_for_tests() {
    let _ = Builder::from_env(Env::default().default_filter_or("debug"))
        .is_test(true)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_init_does_not_panic() {
        init_for_tests();
        init("info");
        init("warn");
        log::info!("logging initialised");
    }
}
