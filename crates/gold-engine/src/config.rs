//! `GoldConfig` — the engine's public configuration, spec §6 "Public
//! configuration" and AMBIENT STACK A.3.
//!
//! Loaded by hand from a TOML file, in the `ettlex-store` seed-parser
//! idiom: parse, then validate field-by-field, rather than pulling in a
//! generic layered-config crate.

use std::collections::BTreeMap;

use gold_errors::{GoldError, GoldErrorKind};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct GoldConfig {
    pub window_size: u32,
    #[serde(default)]
    pub corpora_with_materialized_views: Vec<String>,
    pub commit_window_refresh_interval_secs: u64,
    pub materialized_view_refresh_interval_secs: u64,
    pub cl_summary_refresh_interval_secs: u64,
    pub public_params_refresh_interval_secs: u64,
    pub cl_summary_cache_capacity: usize,
    #[serde(default)]
    pub crs_url_templates: BTreeMap<String, String>,
    #[serde(default)]
    pub flaky_trace_threshold: Option<u32>,
    pub database_url: String,
}

impl GoldConfig {
    /// Parse and validate a config from its TOML text.
    pub fn from_toml(text: &str) -> Result<Self, GoldError> {
        let config: GoldConfig = toml::from_str(text).map_err(|e| {
            GoldError::new(GoldErrorKind::Internal)
                .with_op("config_parse")
                .with_message(format!("invalid config TOML: {e}"))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a config file from disk.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, GoldError> {
        let text = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            GoldError::new(GoldErrorKind::Internal)
                .with_op("config_read")
                .with_message(format!("could not read config file: {e}"))
        })?;
        Self::from_toml(&text)
    }

    fn validate(&self) -> Result<(), GoldError> {
        if self.window_size == 0 {
            return Err(GoldError::new(GoldErrorKind::Internal)
                .with_op("config_validate")
                .with_message("window_size must be greater than zero"));
        }
        if self.cl_summary_cache_capacity == 0 {
            return Err(GoldError::new(GoldErrorKind::Internal)
                .with_op("config_validate")
                .with_message("cl_summary_cache_capacity must be greater than zero"));
        }
        if self.database_url.trim().is_empty() {
            return Err(GoldError::new(GoldErrorKind::Internal)
                .with_op("config_validate")
                .with_message("database_url must not be empty"));
        }
        for interval in [
            self.commit_window_refresh_interval_secs,
            self.materialized_view_refresh_interval_secs,
            self.cl_summary_refresh_interval_secs,
            self.public_params_refresh_interval_secs,
        ] {
            if interval == 0 {
                return Err(GoldError::new(GoldErrorKind::Internal)
                    .with_op("config_validate")
                    .with_message("refresh intervals must be greater than zero"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_toml() -> &'static str {
        r#"
        window_size = 40
        corpora_with_materialized_views = ["gm", "canvaskit"]
        commit_window_refresh_interval_secs = 30
        materialized_view_refresh_interval_secs = 60
        cl_summary_refresh_interval_secs = 45
        public_params_refresh_interval_secs = 300
        cl_summary_cache_capacity = 1000
        database_url = "postgres://localhost/gold"

        [crs_url_templates]
        gerrit = "https://chromium-review.googlesource.com/c/{cl_id}"
        "#
    }

    #[test]
    fn test_parses_valid_config() {
        let config = GoldConfig::from_toml(valid_toml()).unwrap();
        assert_eq!(config.window_size, 40);
        assert_eq!(config.corpora_with_materialized_views, vec!["gm", "canvaskit"]);
        assert_eq!(config.flaky_trace_threshold, None);
        assert_eq!(
            config.crs_url_templates.get("gerrit").map(String::as_str),
            Some("https://chromium-review.googlesource.com/c/{cl_id}")
        );
    }

    #[test]
    fn test_rejects_zero_window_size() {
        let toml = valid_toml().replace("window_size = 40", "window_size = 0");
        assert!(GoldConfig::from_toml(&toml).is_err());
    }

    #[test]
    fn test_rejects_empty_database_url() {
        let toml = valid_toml().replace(
            "database_url = \"postgres://localhost/gold\"",
            "database_url = \"\"",
        );
        assert!(GoldConfig::from_toml(&toml).is_err());
    }

    #[test]
    fn test_flaky_trace_threshold_optional() {
        let toml = format!("{}\nflaky_trace_threshold = 5", valid_toml());
        let config = GoldConfig::from_toml(&toml).unwrap();
        assert_eq!(config.flaky_trace_threshold, Some(5));
    }
}
