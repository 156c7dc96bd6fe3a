use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use arangodb_exporter_common::error::{ExporterError, Result};
use arangodb_exporter_metrics::{GaugeMetric, MetricsRegistry};
use tracing::{debug, warn};

use crate::{
    description::{FigureType, StatisticFigure, StatisticGroup, StatisticsDescription},
    document::{Statistics, StatisticsDocument},
};

pub const SUM_POSTFIX: &str = "_sum";
pub const COUNT_POSTFIX: &str = "_count";
pub const BUCKET_POSTFIX: &str = "_bucket";
pub const INF_BUCKET: &str = "+Inf";

/// Key of the metric a figure is exported as. Pure in its inputs, so an
/// unchanged schema always addresses the same metric objects.
pub fn metric_key(group: &StatisticGroup, figure: &StatisticFigure, postfix: &str) -> String {
    let mut key = format!("{}_{}", group.name, figure.name)
        .to_lowercase()
        .replace(' ', "_");
    key.push_str(postfix);
    if !figure.units.is_empty() {
        key.push('_');
        key.push_str(&figure.units.to_lowercase());
    }
    key
}

/// Metric objects backing one figure.
pub enum FigureMetrics {
    Single(Arc<GaugeMetric>),
    Distribution {
        sum: Arc<GaugeMetric>,
        count: Arc<GaugeMetric>,
        buckets: Arc<GaugeMetric>,
    },
}

impl FigureMetrics {
    fn register(
        registry: &MetricsRegistry,
        group: &StatisticGroup,
        figure: &StatisticFigure,
    ) -> Result<Self> {
        let help = if figure.description.is_empty() {
            figure.name.as_str()
        } else {
            figure.description.as_str()
        };

        match figure.figure_type {
            FigureType::Distribution => {
                let sum_key = metric_key(group, figure, SUM_POSTFIX);
                let count_key = metric_key(group, figure, COUNT_POSTFIX);
                let bucket_key = metric_key(group, figure, BUCKET_POSTFIX);

                // Check all three first so a collision leaves nothing behind.
                for key in [&sum_key, &count_key, &bucket_key] {
                    if registry.contains(key) {
                        return Err(ExporterError::InvalidArgument(format!(
                            "metric already registered: {}",
                            registry.qualified_name(key)
                        )));
                    }
                }

                Ok(Self::Distribution {
                    sum: registry.register_gauge(&sum_key, help, &[])?,
                    count: registry.register_gauge(&count_key, help, &[])?,
                    buckets: registry.register_gauge(&bucket_key, help, &["le"])?,
                })
            }
            _ => Ok(Self::Single(registry.register_gauge(
                &metric_key(group, figure, ""),
                help,
                &[],
            )?)),
        }
    }

    /// Copies the figure's current values out of its group. Returns whether
    /// anything was written.
    fn update(&self, figure: &StatisticFigure, group_stats: Statistics<'_>) -> bool {
        match (figure.figure_type, self) {
            (FigureType::Current | FigureType::Accumulated, Self::Single(gauge)) => {
                match group_stats.get_float(&figure.identifier) {
                    Some(value) => {
                        gauge.set(&[], value);
                        true
                    }
                    None => false,
                }
            }
            (FigureType::Distribution, Self::Distribution { sum, count, buckets }) => {
                let Some(distribution) = group_stats.get_group(&figure.identifier) else {
                    return false;
                };

                let mut updated = false;
                if let Some(value) = distribution.get_float("sum") {
                    sum.set(&[], value);
                    updated = true;
                }
                if let Some(value) = distribution.get_float("count") {
                    count.set(&[], value);
                    updated = true;
                }
                if let Some(counts) = distribution.get_counts("counts") {
                    // Cuts may have changed since the last scrape.
                    buckets.reset();
                    let mut cumulative = 0_i64;
                    for (index, value) in counts.iter().enumerate() {
                        cumulative = cumulative.saturating_add(*value);
                        let le = figure
                            .cuts
                            .get(index)
                            .map(|cut| format_bucket_bound(*cut))
                            .unwrap_or_else(|| INF_BUCKET.to_string());
                        buckets.set(&[&le], cumulative as f64);
                    }
                    updated = true;
                }
                updated
            }
            _ => false,
        }
    }
}

/// `le` label for a cut: the shortest decimal representation, switching to
/// exponent form (`1e-05`, `1e+21`) when the decimal exponent is below -4 or
/// at least 21.
pub fn format_bucket_bound(cut: f64) -> String {
    if cut.is_nan() {
        return "NaN".to_string();
    }
    if cut.is_infinite() {
        return if cut > 0.0 { INF_BUCKET } else { "-Inf" }.to_string();
    }

    let scientific = format!("{cut:e}");
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return cut.to_string();
    };
    let Ok(exponent) = exponent.parse::<i32>() else {
        return cut.to_string();
    };
    if cut == 0.0 || (-4..21).contains(&exponent) {
        return cut.to_string();
    }

    let sign = if exponent < 0 { '-' } else { '+' };
    format!("{mantissa}e{sign}{:02}", exponent.unsigned_abs())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TranslationStats {
    pub updated: usize,
    pub skipped: usize,
}

/// Maps statistics figures onto gauges in the registry. Entries are created
/// on first sight of a key and live for the rest of the process.
pub struct Translator {
    registry: Arc<MetricsRegistry>,
    metrics: HashMap<String, FigureMetrics>,
    rejected: HashSet<String>,
}

impl Translator {
    pub fn new(registry: Arc<MetricsRegistry>) -> Self {
        Self {
            registry,
            metrics: HashMap::new(),
            rejected: HashSet::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&FigureMetrics> {
        self.metrics.get(key)
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    /// Applies one scrape. Schema and value mismatches are skipped per figure
    /// and never fail the whole translation.
    pub fn translate(
        &mut self,
        description: &StatisticsDescription,
        values: &StatisticsDocument,
    ) -> TranslationStats {
        let groups = description.group_index();
        let mut stats = TranslationStats::default();

        for figure in &description.figures {
            if figure.figure_type == FigureType::Unknown || !figure.is_addressable() {
                debug!(group = %figure.group, figure = %figure.identifier, "skipping untranslatable figure");
                stats.skipped += 1;
                continue;
            }
            let Some(group) = groups.get(figure.group.as_str()) else {
                debug!(group = %figure.group, figure = %figure.identifier, "skipping figure with unknown group");
                stats.skipped += 1;
                continue;
            };
            let Some(group_stats) = values.get_group(&figure.group) else {
                stats.skipped += 1;
                continue;
            };
            let Some(metrics) = self.entry(group, figure) else {
                stats.skipped += 1;
                continue;
            };

            if metrics.update(figure, group_stats) {
                stats.updated += 1;
            } else {
                stats.skipped += 1;
            }
        }

        stats
    }

    fn entry(&mut self, group: &StatisticGroup, figure: &StatisticFigure) -> Option<&FigureMetrics> {
        let key = metric_key(group, figure, "");
        if self.rejected.contains(&key) {
            return None;
        }

        if !self.metrics.contains_key(&key) {
            match FigureMetrics::register(&self.registry, group, figure) {
                Ok(metrics) => {
                    self.metrics.insert(key.clone(), metrics);
                }
                Err(err) => {
                    warn!(key = %key, error = %err, "cannot export figure, metric name collides");
                    self.rejected.insert(key);
                    return None;
                }
            }
        }

        self.metrics.get(&key)
    }
}
