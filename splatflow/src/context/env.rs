//! Environment and hyperparameter configuration carried by a run.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::stages::Stage;

/// The environment variables attached verbatim to every stage launch.
///
/// Frozen once the run's context is built: there is no mutation API, only
/// construction. Iteration order is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnvMap(BTreeMap<String, String>);

impl EnvMap {
    /// Creates an empty environment.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a variable.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Iterates the variables in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if no variables are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<BTreeMap<String, String>> for EnvMap {
    fn from(map: BTreeMap<String, String>) -> Self {
        Self(map)
    }
}

impl FromIterator<(String, String)> for EnvMap {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Per-stage hyperparameter slices.
///
/// Values are opaque to the orchestrator and passed through to launches
/// verbatim; only the stage keying is interpreted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HyperparameterMap(BTreeMap<Stage, BTreeMap<String, serde_json::Value>>);

impl HyperparameterMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The slice for one stage; empty when the request configured none.
    #[must_use]
    pub fn for_stage(&self, stage: Stage) -> BTreeMap<String, serde_json::Value> {
        self.0.get(&stage).cloned().unwrap_or_default()
    }

    /// Sets one parameter for a stage.
    pub fn set(&mut self, stage: Stage, key: impl Into<String>, value: serde_json::Value) {
        self.0.entry(stage).or_default().insert(key.into(), value);
    }
}

impl From<BTreeMap<Stage, BTreeMap<String, serde_json::Value>>> for HyperparameterMap {
    fn from(map: BTreeMap<Stage, BTreeMap<String, serde_json::Value>>) -> Self {
        Self(map)
    }
}
