//! Change detector configuration.

use serde::Deserialize;
use std::time::Duration;

/// Polling schedule settings.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Validity assumed when a resource sends no `cache-control: max-age`.
    pub default_validity_secs: u64,
    /// Floor for any computed polling delay.
    pub min_interval_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            default_validity_secs: 60,
            min_interval_ms: 100,
        }
    }
}

impl PollingConfig {
    pub fn default_validity(&self) -> Duration {
        Duration::from_secs(self.default_validity_secs)
    }

    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_partial() {
        let config: PollingConfig = serde_json::from_str(r#"{"default_validity_secs": 5}"#).unwrap();
        assert_eq!(config.default_validity(), Duration::from_secs(5));
        assert_eq!(config.min_interval(), Duration::from_millis(100));
    }
}
