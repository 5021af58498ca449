//! Configuration and request types for the dashboard service.

use std::time::Duration;

use retail_ops_aggregate::DisplayTimezone;
use serde::{Deserialize, Serialize};

/// How a status summary groups its records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "by")]
pub enum Grouping {
    /// One row per store.
    Store,
    /// One row per store and calendar day.
    StoreDay {
        /// Restrict to the last `days` days, filling days without records.
        /// `None` returns only the (store, day) pairs that have records.
        #[serde(default)]
        days: Option<u32>,
    },
}

/// Configuration for the dashboard service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// How long fetched rows stay fresh (seconds).
    #[serde(default = "DashboardConfig::default_cache_ttl")]
    pub cache_ttl_seconds: u64,

    /// Timezone every calendar day is computed in.
    #[serde(default)]
    pub timezone: DisplayTimezone,

    /// Default length of trend windows, in days.
    #[serde(default = "DashboardConfig::default_trend_days")]
    pub trend_days: u32,

    /// Default length of stock history windows, in days.
    #[serde(default = "DashboardConfig::default_history_days")]
    pub history_days: u32,

    /// Column written by status updates.
    #[serde(default = "DashboardConfig::default_status_column")]
    pub status_column: String,

    /// Completion timestamp column written by status updates.
    #[serde(default = "DashboardConfig::default_completed_at_column")]
    pub completed_at_column: String,
}

impl DashboardConfig {
    const fn default_cache_ttl() -> u64 {
        30
    }

    const fn default_trend_days() -> u32 {
        7
    }

    const fn default_history_days() -> u32 {
        5
    }

    fn default_status_column() -> String {
        "status".to_string()
    }

    fn default_completed_at_column() -> String {
        "completed_at".to_string()
    }

    /// Get the cache TTL as a `Duration`.
    #[must_use]
    pub const fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            cache_ttl_seconds: Self::default_cache_ttl(),
            timezone: DisplayTimezone::default(),
            trend_days: Self::default_trend_days(),
            history_days: Self::default_history_days(),
            status_column: Self::default_status_column(),
            completed_at_column: Self::default_completed_at_column(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dashboard_config_defaults() {
        let config = DashboardConfig::default();
        assert_eq!(config.cache_ttl(), Duration::from_secs(30));
        assert_eq!(config.timezone, DisplayTimezone::UTC);
        assert_eq!(config.trend_days, 7);
        assert_eq!(config.history_days, 5);
    }

    #[test]
    fn dashboard_config_from_partial_json() {
        let config: DashboardConfig =
            serde_json::from_str(r#"{"timezone": "America/Chicago", "trend_days": 14}"#).unwrap();
        assert_eq!(config.timezone.to_string(), "America/Chicago");
        assert_eq!(config.trend_days, 14);
        assert_eq!(config.cache_ttl_seconds, 30);
        assert_eq!(config.completed_at_column, "completed_at");
    }

    #[test]
    fn unknown_timezone_rejected() {
        let result = serde_json::from_str::<DashboardConfig>(r#"{"timezone": "Mars/Olympus"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn grouping_serde() {
        let grouping: Grouping = serde_json::from_str(r#"{"by": "store_day", "days": 7}"#).unwrap();
        assert_eq!(grouping, Grouping::StoreDay { days: Some(7) });
        let grouping: Grouping = serde_json::from_str(r#"{"by": "store"}"#).unwrap();
        assert_eq!(grouping, Grouping::Store);
    }
}
