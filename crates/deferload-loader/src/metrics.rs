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

//! Metric handles used by the loader.

use deferload_core::telemetry::MetricsResult;
use deferload_core::UnitState;
use deferload_telemetry::{CounterHandle, GaugeHandle, HistogramHandle, MetricsRegistry};

const NAMESPACE: &str = "loader";

/// The loader's metric handles. Update failures are logged and otherwise ignored.
#[derive(Debug, Clone)]
pub(crate) struct LoaderMetrics {
    requests_total: CounterHandle,
    dedupe_hits_total: CounterHandle,
    resolved_total: CounterHandle,
    rejected_total: CounterHandle,
    discarded_total: CounterHandle,
    pending_units: GaugeHandle,
    /// Histogram of fetch + decode time in milliseconds.
    pub(crate) load_time_ms: HistogramHandle,
}

impl LoaderMetrics {
    pub(crate) fn new(registry: &MetricsRegistry) -> MetricsResult<Self> {
        Ok(Self {
            requests_total: registry.register_counter(
                NAMESPACE,
                "requests_total",
                "Total number of units requested",
            )?,
            dedupe_hits_total: registry.register_counter(
                NAMESPACE,
                "dedupe_hits_total",
                "Requests answered with an existing unit",
            )?,
            resolved_total: registry.register_counter(
                NAMESPACE,
                "resolved_total",
                "Units that reached the Resolved state",
            )?,
            rejected_total: registry.register_counter(
                NAMESPACE,
                "rejected_total",
                "Units that reached the Rejected state",
            )?,
            discarded_total: registry.register_counter(
                NAMESPACE,
                "discarded_total",
                "Loads that finished after every handle to their unit was dropped",
            )?,
            pending_units: registry.register_gauge(
                NAMESPACE,
                "pending_units",
                "Loads scheduled but not yet settled",
                "units",
            )?,
            load_time_ms: registry.register_histogram(
                NAMESPACE,
                "load_time",
                "Time from scheduling to settlement",
                "ms",
                vec![1.0, 5.0, 16.0, 50.0, 100.0, 500.0, 2000.0],
            )?,
        })
    }

    pub(crate) fn on_request(&self, dedupe_hit: bool) {
        log_failure(self.requests_total.increment());
        if dedupe_hit {
            log_failure(self.dedupe_hits_total.increment());
        }
    }

    pub(crate) fn on_scheduled(&self) {
        log_failure(self.pending_units.add(1.0));
    }

    pub(crate) fn on_finished(&self) {
        log_failure(self.pending_units.sub(1.0));
    }

    pub(crate) fn on_discarded(&self) {
        log_failure(self.discarded_total.increment());
    }

    pub(crate) fn on_settled(&self, state: UnitState) {
        match state {
            UnitState::Resolved => log_failure(self.resolved_total.increment()),
            UnitState::Rejected => log_failure(self.rejected_total.increment()),
            UnitState::Pending => {}
        }
    }
}

fn log_failure<T>(result: MetricsResult<T>) {
    if let Err(e) = result {
        log::warn!("Failed to update loader metric: {e}");
    }
}
