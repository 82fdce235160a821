//! Mediator configuration.

use serde::Deserialize;

/// Join variants available to `dispatch`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinAlgorithm {
    /// Reference-counted hash join.
    #[default]
    Counting,
    /// Symmetric hash join with one memory entry per arrival.
    Symmetric,
    /// Nested-loop join over unindexed memories.
    NestedLoop,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MediatorConfig {
    /// Join used when an operation does not name one.
    pub join_algorithm: JoinAlgorithm,
}

impl MediatorConfig {
    pub fn with_join_algorithm(mut self, join_algorithm: JoinAlgorithm) -> Self {
        self.join_algorithm = join_algorithm;
        self
    }
}
