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

//! RAII timers that record their lifetime into a histogram.

use crate::metrics::registry::HistogramHandle;
use deferload_core::Stopwatch;

/// Times a scope and records the elapsed milliseconds into a histogram when dropped.
///
/// The timer owns a clone of the handle, so it can be moved into an async
/// task and live across `.await` points.
pub struct ScopedMetricTimer {
    stopwatch: Stopwatch,
    histogram: HistogramHandle,
}

impl ScopedMetricTimer {
    /// Starts a timer for `histogram`.
    pub fn new(histogram: &HistogramHandle) -> Self {
        Self {
            stopwatch: Stopwatch::new(),
            histogram: histogram.clone(),
        }
    }
}

impl Drop for ScopedMetricTimer {
    fn drop(&mut self) {
        if let Err(e) = self.histogram.observe(self.stopwatch.elapsed_ms()) {
            log::warn!("[ScopedMetricTimer] Failed to record metric: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MetricsRegistry;

    #[test]
    fn records_one_sample_on_drop() {
        let registry = MetricsRegistry::new();
        let histogram = registry
            .register_histogram("test", "scope", "Scope time", "ms", vec![1.0, 100.0])
            .unwrap();

        {
            let _timer = ScopedMetricTimer::new(&histogram);
        }
        assert_eq!(histogram.count().unwrap(), 1);
    }
}
