use std::{
    cmp::Ordering as CmpOrdering,
    collections::HashMap,
    sync::{
        Arc, RwLock,
        atomic::{AtomicU64, Ordering},
    },
};

use arangodb_exporter_common::error::{ExporterError, Result};
use tracing::warn;

use crate::types::{CollectedMetric, MetricDescriptor, MetricSample, MetricType, MetricValue};

type LabelValues = Vec<String>;

trait RegisteredMetric: Send + Sync {
    fn descriptor(&self) -> MetricDescriptor;
    fn collect(&self) -> Vec<MetricSample>;
}

/// Process-wide set of metric families, rendered in the Prometheus text
/// exposition format. Every registered name is prefixed with the namespace.
pub struct MetricsRegistry {
    namespace: String,
    metrics: RwLock<HashMap<String, Arc<dyn RegisteredMetric>>>,
}

impl MetricsRegistry {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            metrics: RwLock::new(HashMap::new()),
        }
    }

    /// Fully qualified, sanitized name a metric registered as `name` is
    /// exposed under.
    pub fn qualified_name(&self, name: &str) -> String {
        if self.namespace.is_empty() {
            sanitize_metric_name(name)
        } else {
            sanitize_metric_name(&format!("{}_{name}", self.namespace))
        }
    }

    pub fn register_counter(
        &self,
        name: &str,
        help: &str,
        variable_labels: &[&str],
    ) -> Result<Arc<CounterMetric>> {
        let metric = Arc::new(CounterMetric::new(
            &self.qualified_name(name),
            help,
            variable_labels,
        ));
        self.register(metric.clone())?;
        Ok(metric)
    }

    pub fn register_gauge(
        &self,
        name: &str,
        help: &str,
        variable_labels: &[&str],
    ) -> Result<Arc<GaugeMetric>> {
        let metric = Arc::new(GaugeMetric::new(
            &self.qualified_name(name),
            help,
            variable_labels,
        ));
        self.register(metric.clone())?;
        Ok(metric)
    }

    pub fn contains(&self, name: &str) -> bool {
        let qualified = self.qualified_name(name);
        match self.metrics.read() {
            Ok(guard) => guard.contains_key(&qualified),
            Err(_) => false,
        }
    }

    pub fn len(&self) -> usize {
        match self.metrics.read() {
            Ok(guard) => guard.len(),
            Err(_) => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn collect_all(&self) -> Vec<CollectedMetric> {
        let metrics = match self.metrics.read() {
            Ok(guard) => guard,
            Err(_) => {
                warn!("metrics registry lock poisoned, skipping collection");
                return Vec::new();
            }
        };

        let mut collected = metrics
            .values()
            .map(|metric| {
                let mut samples = metric.collect();
                samples.sort_by(|left, right| compare_labels(&left.labels, &right.labels));
                CollectedMetric {
                    descriptor: metric.descriptor(),
                    samples,
                }
            })
            .collect::<Vec<_>>();

        collected.sort_by(|left, right| left.descriptor.name.cmp(&right.descriptor.name));
        collected
    }

    pub fn render_prometheus(&self) -> String {
        let metrics = self.collect_all();
        let mut output = String::new();

        for metric in metrics {
            output.push_str("# HELP ");
            output.push_str(&metric.descriptor.name);
            output.push(' ');
            output.push_str(&escape_help(&metric.descriptor.help));
            output.push('\n');

            output.push_str("# TYPE ");
            output.push_str(&metric.descriptor.name);
            output.push(' ');
            output.push_str(metric.descriptor.metric_type.as_prometheus_type());
            output.push('\n');

            for sample in metric.samples {
                output.push_str(&render_sample_line(
                    &metric.descriptor.name,
                    &sample.labels,
                    sample.value.as_f64(),
                ));
            }
        }

        output
    }

    fn register<M: RegisteredMetric + 'static>(&self, metric: Arc<M>) -> Result<()> {
        let descriptor = metric.descriptor();
        let name = descriptor.name.clone();
        let mut metrics = self.metrics.write().map_err(|_| {
            ExporterError::InternalError("failed to acquire metrics registry lock".to_string())
        })?;

        if metrics.contains_key(&name) {
            return Err(ExporterError::InvalidArgument(format!(
                "metric already registered: {name}"
            )));
        }

        metrics.insert(name, metric);
        Ok(())
    }
}

pub struct CounterMetric {
    descriptor: MetricDescriptor,
    series: RwLock<HashMap<LabelValues, Arc<AtomicU64>>>,
}

impl CounterMetric {
    fn new(name: &str, help: &str, variable_labels: &[&str]) -> Self {
        let mut series = HashMap::new();
        // An unlabeled counter is exposed at zero before its first increment.
        if variable_labels.is_empty() {
            series.insert(Vec::new(), Arc::new(AtomicU64::new(0)));
        }

        Self {
            descriptor: MetricDescriptor {
                name: name.to_string(),
                help: help.to_string(),
                metric_type: MetricType::Counter,
                variable_labels: variable_labels.iter().map(|label| (*label).to_string()).collect(),
            },
            series: RwLock::new(series),
        }
    }

    pub fn inc(&self, labels: &[&str], value: u64) {
        let series = self.get_or_create_series(labels);
        series.fetch_add(value, Ordering::Relaxed);
    }

    pub fn inc_one(&self, labels: &[&str]) {
        self.inc(labels, 1);
    }

    pub fn get(&self, labels: &[&str]) -> u64 {
        let label_values = normalize_labels(&self.descriptor, labels);
        match self.series.read() {
            Ok(guard) => guard
                .get(&label_values)
                .map(|value| value.load(Ordering::Relaxed))
                .unwrap_or_default(),
            Err(_) => 0,
        }
    }

    fn get_or_create_series(&self, labels: &[&str]) -> Arc<AtomicU64> {
        let label_values = normalize_labels(&self.descriptor, labels);
        if let Ok(guard) = self.series.read()
            && let Some(existing) = guard.get(&label_values)
        {
            return existing.clone();
        }

        match self.series.write() {
            Ok(mut guard) => guard
                .entry(label_values)
                .or_insert_with(|| Arc::new(AtomicU64::new(0)))
                .clone(),
            Err(_) => Arc::new(AtomicU64::new(0)),
        }
    }
}

impl RegisteredMetric for CounterMetric {
    fn descriptor(&self) -> MetricDescriptor {
        self.descriptor.clone()
    }

    fn collect(&self) -> Vec<MetricSample> {
        let series = match self.series.read() {
            Ok(guard) => guard,
            Err(_) => return Vec::new(),
        };

        series
            .iter()
            .map(|(label_values, value)| MetricSample {
                labels: materialize_labels(&self.descriptor, label_values),
                value: MetricValue::Counter(value.load(Ordering::Relaxed) as f64),
            })
            .collect()
    }
}

/// Gauge family holding one `f64` per label combination. A series that was
/// never set is not exposed.
pub struct GaugeMetric {
    descriptor: MetricDescriptor,
    series: RwLock<HashMap<LabelValues, Arc<AtomicU64>>>,
}

impl GaugeMetric {
    fn new(name: &str, help: &str, variable_labels: &[&str]) -> Self {
        Self {
            descriptor: MetricDescriptor {
                name: name.to_string(),
                help: help.to_string(),
                metric_type: MetricType::Gauge,
                variable_labels: variable_labels.iter().map(|label| (*label).to_string()).collect(),
            },
            series: RwLock::new(HashMap::new()),
        }
    }

    pub fn set(&self, labels: &[&str], value: f64) {
        let series = self.get_or_create_series(labels);
        series.store(value.to_bits(), Ordering::Relaxed);
    }

    pub fn get(&self, labels: &[&str]) -> Option<f64> {
        let label_values = normalize_labels(&self.descriptor, labels);
        let guard = self.series.read().ok()?;
        guard
            .get(&label_values)
            .map(|value| f64::from_bits(value.load(Ordering::Relaxed)))
    }

    /// Drops every series. The next `set` starts from an empty family.
    pub fn reset(&self) {
        if let Ok(mut guard) = self.series.write() {
            guard.clear();
        }
    }

    pub fn series_count(&self) -> usize {
        match self.series.read() {
            Ok(guard) => guard.len(),
            Err(_) => 0,
        }
    }

    fn get_or_create_series(&self, labels: &[&str]) -> Arc<AtomicU64> {
        let label_values = normalize_labels(&self.descriptor, labels);
        if let Ok(guard) = self.series.read()
            && let Some(existing) = guard.get(&label_values)
        {
            return existing.clone();
        }

        match self.series.write() {
            Ok(mut guard) => guard
                .entry(label_values)
                .or_insert_with(|| Arc::new(AtomicU64::new(0.0_f64.to_bits())))
                .clone(),
            Err(_) => Arc::new(AtomicU64::new(0.0_f64.to_bits())),
        }
    }
}

impl RegisteredMetric for GaugeMetric {
    fn descriptor(&self) -> MetricDescriptor {
        self.descriptor.clone()
    }

    fn collect(&self) -> Vec<MetricSample> {
        let series = match self.series.read() {
            Ok(guard) => guard,
            Err(_) => return Vec::new(),
        };

        series
            .iter()
            .map(|(label_values, value)| MetricSample {
                labels: materialize_labels(&self.descriptor, label_values),
                value: MetricValue::Gauge(f64::from_bits(value.load(Ordering::Relaxed))),
            })
            .collect()
    }
}

/// Replaces every character that is not valid in a Prometheus metric name
/// with `_`.
pub fn sanitize_metric_name(name: &str) -> String {
    let mut sanitized = name
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '_' || ch == ':' {
                ch
            } else {
                '_'
            }
        })
        .collect::<String>();

    if sanitized.starts_with(|ch: char| ch.is_ascii_digit()) {
        sanitized.insert(0, '_');
    }
    sanitized
}

fn normalize_labels(descriptor: &MetricDescriptor, labels: &[&str]) -> LabelValues {
    let expected = descriptor.variable_labels.len();
    (0..expected)
        .map(|index| labels.get(index).copied().unwrap_or_default().to_string())
        .collect()
}

fn materialize_labels(descriptor: &MetricDescriptor, values: &[String]) -> Vec<(String, String)> {
    descriptor
        .variable_labels
        .iter()
        .zip(values.iter())
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}

// Numeric label values (bucket bounds, "+Inf") order numerically, everything
// else lexically.
fn compare_labels(left: &[(String, String)], right: &[(String, String)]) -> CmpOrdering {
    for ((_, left_value), (_, right_value)) in left.iter().zip(right.iter()) {
        let ordering = match (left_value.parse::<f64>(), right_value.parse::<f64>()) {
            (Ok(left_number), Ok(right_number)) => left_number.total_cmp(&right_number),
            _ => left_value.cmp(right_value),
        };
        if ordering != CmpOrdering::Equal {
            return ordering;
        }
    }
    left.len().cmp(&right.len())
}

fn render_sample_line(name: &str, labels: &[(String, String)], value: f64) -> String {
    let mut rendered = String::new();
    rendered.push_str(name);

    if !labels.is_empty() {
        rendered.push('{');
        for (index, (key, value)) in labels.iter().enumerate() {
            if index > 0 {
                rendered.push(',');
            }
            rendered.push_str(key);
            rendered.push_str("=\"");
            rendered.push_str(&escape_label_value(value));
            rendered.push('"');
        }
        rendered.push('}');
    }

    rendered.push(' ');
    rendered.push_str(&format_metric_value(value));
    rendered.push('\n');
    rendered
}

fn format_metric_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value.is_sign_positive() {
            "+Inf".to_string()
        } else {
            "-Inf".to_string()
        }
    } else if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}

fn escape_help(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\n', "\\n")
}

fn escape_label_value(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('\n', "\\n")
        .replace('"', "\\\"")
}
