//! Resource metadata from response headers.
//!
//! Consumes `etag`, `cache-control: max-age=N` and `age` to derive the
//! validator and the polling schedule.

use crate::config::PollingConfig;
use crate::fetch::FetchResponse;
use std::time::Duration;

/// What was last observed about a watched resource.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResourceMetadata {
    /// Opaque validator.
    pub etag: Option<String>,
    /// Validity duration from `cache-control: max-age`.
    pub max_age: Option<Duration>,
    /// Elapsed age when observed.
    pub age: Duration,
}

impl ResourceMetadata {
    /// Extracts metadata from response headers. Malformed values are ignored.
    pub fn from_response(response: &FetchResponse) -> Self {
        let etag = response.header("etag").map(str::to_string);
        let max_age = response.header("cache-control").and_then(parse_max_age);
        let age = response
            .header("age")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or_default();
        Self { etag, max_age, age }
    }

    /// Validity period, falling back to the configured default.
    pub fn validity(&self, config: &PollingConfig) -> Duration {
        self.max_age.unwrap_or_else(|| config.default_validity())
    }

    /// Delay before the first check: `validity - age`, floored.
    pub fn first_check_delay(&self, config: &PollingConfig) -> Duration {
        self.validity(config)
            .saturating_sub(self.age)
            .max(config.min_interval())
    }

    /// Delay between subsequent checks: `validity`, floored.
    pub fn check_interval(&self, config: &PollingConfig) -> Duration {
        self.validity(config).max(config.min_interval())
    }

    /// True when `other` carries a different validator.
    ///
    /// A resource that stops sending a validator is considered changed.
    pub fn validator_changed(&self, other: &ResourceMetadata) -> bool {
        self.etag != other.etag || other.etag.is_none()
    }

    /// Forgets the validator so the next successful check reports a change.
    ///
    /// The schedule fields are kept.
    pub fn invalidate(&mut self) {
        self.etag = None;
    }
}

fn parse_max_age(cache_control: &str) -> Option<Duration> {
    cache_control.split(',').find_map(|directive| {
        let (name, value) = directive.trim().split_once('=')?;
        if name.trim().eq_ignore_ascii_case("max-age") {
            value.trim().trim_matches('"').parse::<u64>().ok().map(Duration::from_secs)
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_response() {
        let response = FetchResponse::new(200)
            .with_header("etag", "\"abc\"")
            .with_header("cache-control", "public, max-age=30")
            .with_header("age", "10");
        let meta = ResourceMetadata::from_response(&response);
        assert_eq!(meta.etag.as_deref(), Some("\"abc\""));
        assert_eq!(meta.max_age, Some(Duration::from_secs(30)));
        assert_eq!(meta.age, Duration::from_secs(10));
    }

    #[test]
    fn test_schedule() {
        let config = PollingConfig::default();
        let meta = ResourceMetadata {
            etag: None,
            max_age: Some(Duration::from_secs(30)),
            age: Duration::from_secs(10),
        };
        assert_eq!(meta.first_check_delay(&config), Duration::from_secs(20));
        assert_eq!(meta.check_interval(&config), Duration::from_secs(30));
    }

    #[test]
    fn test_schedule_floor_and_default() {
        let config = PollingConfig::default();
        let stale = ResourceMetadata {
            etag: None,
            max_age: Some(Duration::from_secs(5)),
            age: Duration::from_secs(50),
        };
        assert_eq!(stale.first_check_delay(&config), config.min_interval());
        let bare = ResourceMetadata::default();
        assert_eq!(bare.check_interval(&config), config.default_validity());
    }

    #[test]
    fn test_malformed_headers_ignored() {
        let response = FetchResponse::new(200)
            .with_header("cache-control", "no-cache")
            .with_header("age", "soon");
        let meta = ResourceMetadata::from_response(&response);
        assert_eq!(meta.max_age, None);
        assert_eq!(meta.age, Duration::ZERO);
    }

    #[test]
    fn test_validator_changed() {
        let v1 = ResourceMetadata { etag: Some("1".into()), ..Default::default() };
        let v2 = ResourceMetadata { etag: Some("2".into()), ..Default::default() };
        assert!(v1.validator_changed(&v2));
        assert!(!v1.validator_changed(&v1.clone()));
        assert!(v1.validator_changed(&ResourceMetadata::default()));
    }

    #[test]
    fn test_invalidate_keeps_schedule() {
        let mut meta = ResourceMetadata {
            etag: Some("1".into()),
            max_age: Some(Duration::from_secs(30)),
            age: Duration::from_secs(3),
        };
        let same = meta.clone();
        meta.invalidate();
        assert_eq!(meta.etag, None);
        assert_eq!(meta.max_age, Some(Duration::from_secs(30)));
        assert!(meta.validator_changed(&same));
    }
}
