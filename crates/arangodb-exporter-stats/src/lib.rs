pub mod client;
pub mod collector;
pub mod config;
pub mod description;
pub mod document;
pub mod passthrough;
pub mod translator;

#[cfg(test)]
pub(crate) mod test_support;

pub use client::{HttpStatisticsClient, StatisticsClient};
pub use collector::{BuildInfo, Collector, NAMESPACE};
pub use config::ExporterConfig;
pub use description::{FigureType, StatisticFigure, StatisticGroup, StatisticsDescription};
pub use document::{Statistics, StatisticsDocument};
pub use passthrough::{PassthroughClient, PassthroughResponse};
pub use translator::{FigureMetrics, TranslationStats, Translator, metric_key};
