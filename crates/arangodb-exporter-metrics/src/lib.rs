pub mod registry;
pub mod types;

pub use registry::{CounterMetric, GaugeMetric, MetricsRegistry, sanitize_metric_name};
pub use types::{CollectedMetric, MetricDescriptor, MetricSample, MetricType, MetricValue};
