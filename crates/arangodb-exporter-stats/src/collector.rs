use std::{future::Future, sync::Arc, time::Duration};

use arangodb_exporter_common::error::{ExporterError, Result};
use arangodb_exporter_metrics::{CounterMetric, GaugeMetric, MetricsRegistry};
use tokio::{
    sync::Mutex,
    time::{Instant, timeout_at},
};
use tracing::{debug, error};

use crate::{
    client::StatisticsClient,
    translator::{TranslationStats, Translator},
};

pub const NAMESPACE: &str = "arangodb";

#[derive(Debug, Clone)]
pub struct BuildInfo {
    pub version: String,
    pub revision: String,
}

/// Runs scrape cycles against the monitored server. Cycles are serialized on
/// one lock, so concurrent `/metrics` requests queue behind each other and
/// never observe a half-applied scrape.
pub struct Collector {
    client: Arc<dyn StatisticsClient>,
    registry: Arc<MetricsRegistry>,
    timeout: Duration,
    translator: Mutex<Translator>,
    up: Arc<GaugeMetric>,
    total_scrapes: Arc<CounterMetric>,
    failed_scrapes: Arc<CounterMetric>,
}

impl Collector {
    pub fn new(
        client: Arc<dyn StatisticsClient>,
        registry: Arc<MetricsRegistry>,
        timeout: Duration,
    ) -> Result<Self> {
        let up = registry.register_gauge("up", "Was the last scrape of ArangoDB successful.", &[])?;
        let total_scrapes = registry.register_counter(
            "exporter_total_scrapes",
            "Current total ArangoDB scrapes.",
            &[],
        )?;
        let failed_scrapes = registry.register_counter(
            "exporter_failed_scrapes",
            "Number of failed ArangoDB scrapes.",
            &[],
        )?;

        Ok(Self {
            client,
            translator: Mutex::new(Translator::new(Arc::clone(&registry))),
            registry,
            timeout,
            up,
            total_scrapes,
            failed_scrapes,
        })
    }

    /// Registers `arangodb_exporter_build_info`, a constant 1 labeled with the
    /// exporter's version.
    pub fn register_build_info(&self, info: &BuildInfo) -> Result<()> {
        let gauge = self.registry.register_gauge(
            "exporter_build_info",
            "A metric with a constant '1' value labeled by version and revision of the exporter.",
            &["version", "revision"],
        )?;
        gauge.set(&[&info.version, &info.revision], 1.0);
        Ok(())
    }

    /// One full scrape cycle followed by rendering every registered metric.
    /// A failed fetch marks the server down and leaves the last translated
    /// values exposed.
    pub async fn collect(&self) -> String {
        let mut translator = self.translator.lock().await;
        self.total_scrapes.inc_one(&[]);

        match self.scrape(&mut translator).await {
            Ok(stats) => {
                debug!(updated = stats.updated, skipped = stats.skipped, "scrape complete");
            }
            Err(err) => {
                self.up.set(&[], 0.0);
                self.failed_scrapes.inc_one(&[]);
                debug!(kind = err.kind(), "scrape failed");
            }
        }

        self.registry.render_prometheus()
    }

    async fn scrape(&self, translator: &mut Translator) -> Result<TranslationStats> {
        let deadline = Instant::now() + self.timeout;

        let description = self
            .before(deadline, self.client.fetch_description())
            .await
            .inspect_err(|err| error!(error = %err, "failed to fetch statistic descriptions"))?;

        let values = self
            .before(deadline, self.client.fetch_values())
            .await
            .inspect_err(|err| error!(error = %err, "failed to fetch statistics"))?;

        self.up.set(&[], 1.0);
        Ok(translator.translate(&description, &values))
    }

    async fn before<T>(
        &self,
        deadline: Instant,
        request: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        match timeout_at(deadline, request).await {
            Ok(result) => result,
            Err(_) => Err(ExporterError::Timeout(self.timeout)),
        }
    }
}
