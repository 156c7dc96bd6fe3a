use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};

/// Body of `GET /_admin/statistics-description`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatisticsDescription {
    #[serde(default, deserialize_with = "null_as_default")]
    pub groups: Vec<StatisticGroup>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub figures: Vec<StatisticFigure>,
}

impl StatisticsDescription {
    /// Groups keyed by id. A duplicate id replaces the earlier group.
    pub fn group_index(&self) -> HashMap<&str, &StatisticGroup> {
        self.groups
            .iter()
            .map(|group| (group.group.as_str(), group))
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatisticGroup {
    #[serde(default, deserialize_with = "null_as_default")]
    pub group: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
}

/// One figure of the description. Missing or `null` fields decode to empty
/// values so a single inconsistent entry never fails the whole document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticFigure {
    #[serde(default, deserialize_with = "null_as_default")]
    pub group: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub identifier: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub figure_type: FigureType,
    #[serde(
        rename = "unit",
        alias = "units",
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "String::is_empty"
    )]
    pub units: String,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub cuts: Vec<f64>,
}

impl StatisticFigure {
    /// Figures without a group or identifier cannot be keyed into the values
    /// document.
    pub fn is_addressable(&self) -> bool {
        !self.group.is_empty() && !self.identifier.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FigureType {
    Accumulated,
    Current,
    Distribution,
    /// A type this exporter does not know how to translate.
    #[serde(other)]
    #[default]
    Unknown,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
