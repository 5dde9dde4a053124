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

use deferload_core::telemetry::{Metric, MetricId, MetricValue, MetricsResult};
use std::fmt::Debug;

/// Trait defining the interface for metrics storage backends.
///
/// Backends only store whole metrics and apply in-place updates. Type checks
/// live in the update closure supplied by the registry handles.
pub trait MetricsBackend: Send + Sync + Debug + 'static {
    /// Stores a metric, replacing any metric with the same ID.
    fn put_metric(&self, metric: Metric) -> MetricsResult<()>;

    /// Returns a copy of a metric.
    fn get_metric(&self, id: &MetricId) -> MetricsResult<Metric>;

    /// Applies `update` to the value of a metric while holding the backend's lock.
    fn update_value(
        &self,
        id: &MetricId,
        update: &mut dyn FnMut(&mut MetricValue) -> MetricsResult<()>,
    ) -> MetricsResult<()>;

    /// Returns `true` if a metric with this ID is stored.
    fn contains_metric(&self, id: &MetricId) -> bool;

    /// Returns every stored metric.
    fn list_all_metrics(&self) -> Vec<Metric>;

    /// The number of stored metrics.
    fn metric_count(&self) -> usize;

    /// Removes every metric.
    fn clear_all(&self) -> MetricsResult<()>;
}
