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

//! Registry for managing metrics.

use crate::storage::{backend::MetricsBackend, memory_backend::InMemoryBackend};
use deferload_core::telemetry::{
    Metric, MetricId, MetricType, MetricValue, MetricsError, MetricsResult,
};
use std::sync::Arc;

/// Central registry for metrics.
///
/// Registration returns a typed handle. Handles are cheap to clone and are
/// what hot paths hold on to; the registry itself is only needed again for
/// queries.
#[derive(Debug, Clone)]
pub struct MetricsRegistry {
    backend: Arc<dyn MetricsBackend>,
}

impl MetricsRegistry {
    /// Creates a registry with the default in-memory backend.
    pub fn new() -> Self {
        Self {
            backend: Arc::new(InMemoryBackend::new()),
        }
    }

    /// Creates a registry over a custom backend.
    pub fn with_backend(backend: Arc<dyn MetricsBackend>) -> Self {
        Self { backend }
    }

    /// Registers a counter starting at zero.
    pub fn register_counter(
        &self,
        namespace: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> MetricsResult<CounterHandle> {
        let id = MetricId::new(namespace, name);
        self.backend
            .put_metric(Metric::counter(id.clone(), description))?;
        Ok(CounterHandle {
            id,
            backend: self.backend.clone(),
        })
    }

    /// Registers a gauge starting at zero.
    pub fn register_gauge(
        &self,
        namespace: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        unit: impl Into<String>,
    ) -> MetricsResult<GaugeHandle> {
        let id = MetricId::new(namespace, name);
        self.backend
            .put_metric(Metric::gauge(id.clone(), description, unit))?;
        Ok(GaugeHandle {
            id,
            backend: self.backend.clone(),
        })
    }

    /// Registers an empty histogram with the given bucket bounds.
    pub fn register_histogram(
        &self,
        namespace: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        unit: impl Into<String>,
        buckets: Vec<f64>,
    ) -> MetricsResult<HistogramHandle> {
        let id = MetricId::new(namespace, name);
        self.backend
            .put_metric(Metric::histogram(id.clone(), description, unit, buckets)?)?;
        Ok(HistogramHandle {
            id,
            backend: self.backend.clone(),
        })
    }

    /// Returns a copy of a metric.
    pub fn get_metric(&self, id: &MetricId) -> MetricsResult<Metric> {
        self.backend.get_metric(id)
    }

    /// Returns `true` if the metric is registered.
    pub fn contains_metric(&self, id: &MetricId) -> bool {
        self.backend.contains_metric(id)
    }

    /// Returns every metric registered under `namespace`, sorted by ID.
    pub fn get_namespace_metrics(&self, namespace: &str) -> Vec<Metric> {
        let mut metrics: Vec<Metric> = self
            .backend
            .list_all_metrics()
            .into_iter()
            .filter(|m| m.id.namespace == namespace)
            .collect();
        metrics.sort_by(|a, b| a.id.cmp(&b.id));
        metrics
    }

    /// The number of registered metrics.
    pub fn metric_count(&self) -> usize {
        self.backend.metric_count()
    }

    /// Removes every metric. Outstanding handles start failing with `MetricNotFound`.
    pub fn clear_all(&self) -> MetricsResult<()> {
        self.backend.clear_all()
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn mismatch(expected: MetricType, found: &MetricValue) -> MetricsError {
    MetricsError::TypeMismatch {
        expected,
        found: found.metric_type(),
    }
}

/// Handle for counter operations.
#[derive(Debug, Clone)]
pub struct CounterHandle {
    id: MetricId,
    backend: Arc<dyn MetricsBackend>,
}

impl CounterHandle {
    /// Increments the counter by 1 and returns the new value.
    pub fn increment(&self) -> MetricsResult<u64> {
        self.increment_by(1)
    }

    /// Increments the counter by `amount` and returns the new value.
    pub fn increment_by(&self, amount: u64) -> MetricsResult<u64> {
        let mut current = 0;
        self.backend.update_value(&self.id, &mut |value| match value {
            MetricValue::Counter(v) => {
                *v = v.saturating_add(amount);
                current = *v;
                Ok(())
            }
            other => Err(mismatch(MetricType::Counter, other)),
        })?;
        Ok(current)
    }

    /// Reads the current value.
    pub fn get(&self) -> MetricsResult<u64> {
        let metric = self.backend.get_metric(&self.id)?;
        metric
            .value
            .as_counter()
            .ok_or_else(|| mismatch(MetricType::Counter, &metric.value))
    }

    /// The metric ID.
    pub fn id(&self) -> &MetricId {
        &self.id
    }
}

/// Handle for gauge operations.
#[derive(Debug, Clone)]
pub struct GaugeHandle {
    id: MetricId,
    backend: Arc<dyn MetricsBackend>,
}

impl GaugeHandle {
    /// Sets the gauge.
    pub fn set(&self, value: f64) -> MetricsResult<()> {
        self.apply(|_| value).map(|_| ())
    }

    /// Adds `delta` (which may be negative) and returns the new value.
    pub fn add(&self, delta: f64) -> MetricsResult<f64> {
        self.apply(|v| v + delta)
    }

    /// Subtracts `delta` and returns the new value.
    pub fn sub(&self, delta: f64) -> MetricsResult<f64> {
        self.add(-delta)
    }

    /// Reads the current value.
    pub fn get(&self) -> MetricsResult<f64> {
        let metric = self.backend.get_metric(&self.id)?;
        metric
            .value
            .as_gauge()
            .ok_or_else(|| mismatch(MetricType::Gauge, &metric.value))
    }

    /// The metric ID.
    pub fn id(&self) -> &MetricId {
        &self.id
    }

    fn apply(&self, f: impl Fn(f64) -> f64) -> MetricsResult<f64> {
        let mut current = 0.0;
        self.backend.update_value(&self.id, &mut |value| match value {
            MetricValue::Gauge(v) => {
                *v = f(*v);
                current = *v;
                Ok(())
            }
            other => Err(mismatch(MetricType::Gauge, other)),
        })?;
        Ok(current)
    }
}

/// Handle for histogram operations.
#[derive(Debug, Clone)]
pub struct HistogramHandle {
    id: MetricId,
    backend: Arc<dyn MetricsBackend>,
}

impl HistogramHandle {
    /// Records one sample.
    pub fn observe(&self, sample: f64) -> MetricsResult<()> {
        self.backend.update_value(&self.id, &mut |value| match value {
            MetricValue::Histogram {
                bucket_bounds,
                bucket_counts,
                count,
                sum,
            } => {
                for (bound, bucket) in bucket_bounds.iter().zip(bucket_counts.iter_mut()) {
                    if sample <= *bound {
                        *bucket += 1;
                    }
                }
                *count += 1;
                *sum += sample;
                Ok(())
            }
            other => Err(mismatch(MetricType::Histogram, other)),
        })
    }

    /// The number of samples recorded so far.
    pub fn count(&self) -> MetricsResult<u64> {
        match self.backend.get_metric(&self.id)?.value {
            MetricValue::Histogram { count, .. } => Ok(count),
            other => Err(mismatch(MetricType::Histogram, &other)),
        }
    }

    /// The metric ID.
    pub fn id(&self) -> &MetricId {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registries_share_a_backend() {
        let backend: Arc<dyn MetricsBackend> = Arc::new(InMemoryBackend::new());
        let writer = MetricsRegistry::with_backend(backend.clone());
        let reader = MetricsRegistry::with_backend(backend);

        let counter = writer
            .register_counter("loader", "resolved_total", "Resolved units")
            .unwrap();
        counter.increment_by(3).unwrap();

        let metric = reader.get_metric(counter.id()).unwrap();
        assert_eq!(metric.value.as_counter(), Some(3));
        assert_eq!(reader.metric_count(), 1);
    }

    #[test]
    fn test_counter_operations() {
        let registry = MetricsRegistry::new();
        let counter = registry
            .register_counter("loader", "requests_total", "Total units requested")
            .unwrap();

        assert_eq!(counter.increment().unwrap(), 1);
        assert_eq!(counter.increment_by(4).unwrap(), 5);
        assert_eq!(counter.get().unwrap(), 5);
        assert!(registry.contains_metric(counter.id()));
    }

    #[test]
    fn test_gauge_operations() {
        let registry = MetricsRegistry::new();
        let gauge = registry
            .register_gauge("loader", "pending_units", "Units still loading", "units")
            .unwrap();

        assert_eq!(gauge.add(3.0).unwrap(), 3.0);
        assert_eq!(gauge.sub(1.0).unwrap(), 2.0);
        gauge.set(10.0).unwrap();
        assert_eq!(gauge.get().unwrap(), 10.0);
    }

    #[test]
    fn test_histogram_buckets() {
        let registry = MetricsRegistry::new();
        let histogram = registry
            .register_histogram("loader", "load_time", "Load time", "ms", vec![1.0, 10.0])
            .unwrap();

        histogram.observe(0.5).unwrap();
        histogram.observe(5.0).unwrap();
        histogram.observe(50.0).unwrap();
        assert_eq!(histogram.count().unwrap(), 3);

        let metric = registry.get_metric(histogram.id()).unwrap();
        match metric.value {
            MetricValue::Histogram {
                bucket_counts, sum, ..
            } => {
                assert_eq!(bucket_counts, vec![1, 2]);
                assert_eq!(sum, 55.5);
            }
            other => panic!("Expected histogram, got {other:?}"),
        }
    }

    #[test]
    fn test_namespace_filtering() {
        let registry = MetricsRegistry::new();
        registry.register_counter("loader", "b", "b").unwrap();
        registry.register_counter("loader", "a", "a").unwrap();
        registry.register_counter("source", "reads", "r").unwrap();

        let loader = registry.get_namespace_metrics("loader");
        assert_eq!(loader.len(), 2);
        assert_eq!(loader[0].id.name, "a");
        assert_eq!(registry.metric_count(), 3);
    }

    #[test]
    fn test_handles_fail_after_clear() {
        let registry = MetricsRegistry::new();
        let counter = registry.register_counter("loader", "c", "c").unwrap();
        registry.clear_all().unwrap();
        assert!(matches!(
            counter.increment(),
            Err(MetricsError::MetricNotFound(_))
        ));
    }
}
