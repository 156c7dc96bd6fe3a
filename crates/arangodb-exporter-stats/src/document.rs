use serde::Deserialize;
use serde_json::{Map, Value};

/// Body of `GET /_admin/statistics`: group ids mapped to loosely typed
/// values. No schema is enforced beyond the top level being an object.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct StatisticsDocument {
    values: Map<String, Value>,
}

impl StatisticsDocument {
    pub fn new(values: Map<String, Value>) -> Self {
        Self { values }
    }

    /// Returns `None` unless `value` is a JSON object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(values) => Some(Self { values }),
            _ => None,
        }
    }

    pub fn view(&self) -> Statistics<'_> {
        Statistics {
            values: &self.values,
        }
    }

    pub fn get_group(&self, key: &str) -> Option<Statistics<'_>> {
        self.view().get_group(key)
    }

    pub fn get_float(&self, key: &str) -> Option<f64> {
        self.view().get_float(key)
    }

    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.view().get_int(key)
    }

    pub fn get_counts(&self, key: &str) -> Option<Vec<i64>> {
        self.view().get_counts(key)
    }
}

/// Borrowed view over one level of a statistics document. Every accessor is
/// total: a missing key or a value of the wrong shape yields `None`.
#[derive(Debug, Clone, Copy)]
pub struct Statistics<'a> {
    values: &'a Map<String, Value>,
}

impl<'a> Statistics<'a> {
    pub fn get_group(&self, key: &str) -> Option<Statistics<'a>> {
        match self.values.get(key)? {
            Value::Object(values) => Some(Statistics { values }),
            _ => None,
        }
    }

    /// Floats as-is, integers widened.
    pub fn get_float(&self, key: &str) -> Option<f64> {
        match self.values.get(key)? {
            Value::Number(number) => number.as_f64(),
            _ => None,
        }
    }

    pub fn get_int(&self, key: &str) -> Option<i64> {
        match self.values.get(key)? {
            Value::Number(number) => number.as_i64(),
            _ => None,
        }
    }

    /// All-or-nothing: one non-numeric element makes the whole array absent.
    /// Float elements are truncated toward zero.
    pub fn get_counts(&self, key: &str) -> Option<Vec<i64>> {
        let Value::Array(raw) = self.values.get(key)? else {
            return None;
        };

        raw.iter()
            .map(|element| match element {
                Value::Number(number) => number
                    .as_i64()
                    .or_else(|| number.as_f64().map(|value| value as i64)),
                _ => None,
            })
            .collect()
    }
}
